//! Production Environment implementation using the OS RNG.
//!
//! `SystemEnv` is the production implementation of the Environment trait.
//! Room identifiers, room secrets and session identifiers all come from it,
//! so it must be backed by cryptographic randomness.

use votr_core::Environment;

/// Production environment using cryptographic RNG.
///
/// # Security
///
/// The RNG uses getrandom which provides OS-level cryptographic randomness
/// (e.g., /dev/urandom on Linux, `BCryptGenRandom` on Windows). Room secrets
/// are the only authorization in the system, so they must not be predictable.
///
/// # Panics
///
/// Panics if the OS RNG fails. A server that cannot generate unpredictable
/// secrets cannot hand out room ownership.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - secrets would be predictable");
    }
}
