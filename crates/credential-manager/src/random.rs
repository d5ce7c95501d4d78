//! CSRF state value generation

use rand::RngExt;

/// Number of random bytes in a generated state value (16 hex characters).
pub const STATE_BYTES: usize = 8;

/// Source of `state` values for authorization redirects.
pub trait StateGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Cryptographically random, hex-encoded state values.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomStateGenerator;

impl StateGenerator for RandomStateGenerator {
    fn generate(&self) -> String {
        let mut bytes = [0u8; STATE_BYTES];
        rand::rng().fill(&mut bytes);
        hex::encode(bytes)
    }
}
