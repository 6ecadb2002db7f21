//! Randomness for vault salts and nonces.

use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::VaultError;

/// Source of cryptographically secure random bytes.
pub trait EntropySource: Send + Sync {
    /// Fill `buf` entirely or fail. Implementations must never hand back
    /// predictable bytes on failure.
    fn fill(&self, buf: &mut [u8]) -> Result<(), VaultError>;
}

/// The operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, buf: &mut [u8]) -> Result<(), VaultError> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| VaultError::EntropyUnavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_entropy_fills_buffer() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        OsEntropy.fill(&mut a).unwrap();
        OsEntropy.fill(&mut b).unwrap();
        assert_ne!(a, b);
    }
}
