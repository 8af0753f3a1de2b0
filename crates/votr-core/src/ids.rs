//! Room, session and secret identifiers.

use std::fmt;

use crate::env::Environment;

/// Symbols used for room identifiers and secrets.
pub const ID_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-";

/// Length of a generated room identifier.
pub const ROOM_ID_LEN: usize = 6;

/// Length of a generated room secret.
pub const SECRET_LEN: usize = 10;

/// Random string of `len` symbols from [`ID_ALPHABET`].
///
/// Each byte is reduced modulo the alphabet size. The bias this introduces
/// (256 is not a multiple of 63) is acceptable for short-lived room tokens.
fn random_token<E: Environment>(env: &E, len: usize) -> String {
    let mut bytes = vec![0u8; len];
    env.random_bytes(&mut bytes);
    bytes.iter().map(|b| ID_ALPHABET[*b as usize % ID_ALPHABET.len()] as char).collect()
}

/// Opaque identifier of one member session.
///
/// Used as the membership key instead of connection identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Wrap a raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Fresh random identifier.
    pub fn generate<E: Environment>(env: &E) -> Self {
        Self(env.random_u64())
    }

    /// Raw value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Short identifier of a room, as it appears in `?r=` query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    /// Fresh random identifier of [`ROOM_ID_LEN`] symbols.
    pub fn generate<E: Environment>(env: &E) -> Self {
        Self(random_token(env, ROOM_ID_LEN))
    }

    /// Identifier as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RoomId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for RoomId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-room token that authorizes privileged messages.
///
/// `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Fresh random secret of [`SECRET_LEN`] symbols.
    pub fn generate<E: Environment>(env: &E) -> Self {
        Self(random_token(env, SECRET_LEN))
    }

    /// Whether a presented secret matches. A missing secret never matches.
    pub fn matches(&self, presented: Option<&str>) -> bool {
        presented.is_some_and(|p| p == self.0)
    }

    /// Token text, for handing to the owner.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Secret {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}
