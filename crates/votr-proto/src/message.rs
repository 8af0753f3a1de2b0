//! Room message type and its JSON encoding.

use serde::{Deserialize, Serialize};

use crate::errors::{ProtocolError, Result};

/// Wire codes at or above this value denote privileged (owner-only) kinds.
///
/// Kept for compatibility with existing clients. Inside the server privilege
/// is decided by [`MessageKind::is_privileged`], never by comparing codes.
pub const PRIVILEGED_THRESHOLD: i64 = 100;

/// Kind of a room message.
///
/// Codes outside the known set decode into [`MessageKind::Unknown`] so that
/// the room, not the codec, decides how to reject them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum MessageKind {
    /// A member casts or changes a vote (code 0)
    Vote,
    /// Display-only announcement (code 1)
    Status,
    /// Message that clients must not surface (code 2)
    Ignore,
    /// Owner asks to disclose every vote and start a new round (code 100)
    Reveal,
    /// Any other code seen on the wire
    Unknown(i64),
}

impl MessageKind {
    /// Wire code of this kind.
    pub fn code(self) -> i64 {
        match self {
            Self::Vote => 0,
            Self::Status => 1,
            Self::Ignore => 2,
            Self::Reveal => 100,
            Self::Unknown(code) => code,
        }
    }

    /// Whether the sender must prove ownership of the room.
    pub fn is_privileged(self) -> bool {
        match self {
            Self::Reveal => true,
            Self::Vote | Self::Status | Self::Ignore => false,
            Self::Unknown(code) => code >= PRIVILEGED_THRESHOLD,
        }
    }
}

impl From<i64> for MessageKind {
    fn from(code: i64) -> Self {
        match code {
            0 => Self::Vote,
            1 => Self::Status,
            2 => Self::Ignore,
            100 => Self::Reveal,
            other => Self::Unknown(other),
        }
    }
}

impl From<MessageKind> for i64 {
    fn from(kind: MessageKind) -> Self {
        kind.code()
    }
}

/// A message exchanged between a member and its room.
///
/// The originating member is never part of the wire form; the server pairs
/// each inbound message with its session separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message kind, encoded as the numeric `type` field
    #[serde(rename = "type")]
    pub kind: MessageKind,

    /// Vote value for `Vote`, display text for `Status` and `Reveal`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,

    /// Members in the room when the message was broadcast
    #[serde(default)]
    pub user_count: usize,

    /// Members holding a vote when the message was broadcast
    #[serde(default)]
    pub vote_count: usize,

    /// Room secret, present only on privileged requests and on the owner's
    /// private join message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl Message {
    /// Message of `kind` carrying `value` and nothing else.
    pub fn new(kind: MessageKind, value: impl Into<String>) -> Self {
        Self { kind, value: value.into(), user_count: 0, vote_count: 0, secret: None }
    }

    /// Vote request for `value`.
    pub fn vote(value: impl Into<String>) -> Self {
        Self::new(MessageKind::Vote, value)
    }

    /// Status announcement.
    pub fn status(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Status, text)
    }

    /// Reveal message. Inbound it is a request, outbound it carries the votes.
    pub fn reveal(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Reveal, text)
    }

    /// Message clients must drop.
    pub fn ignore() -> Self {
        Self::new(MessageKind::Ignore, String::new())
    }

    /// Attach a room secret.
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Decode a JSON text frame.
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode a JSON text frame, rejecting frames longer than `max` bytes.
    pub fn decode_limited(text: &str, max: usize) -> Result<Self> {
        if text.len() > max {
            return Err(ProtocolError::TooLarge { size: text.len(), max });
        }
        Self::decode(text)
    }

    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
