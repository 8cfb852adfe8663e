//! Fixed-width digest type.

use std::fmt;

/// A 32-byte digest produced by a finished hashing job.
///
/// Prints as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digest([u8; 32]);

impl Digest {
    /// The all-zero digest held by lanes that have not finished a job.
    pub const ZERO: Self = Self([0u8; 32]);

    /// BLAKE3 of `data` in one shot: what a lane reports for a job fed
    /// exactly these bytes, however they were split.
    pub fn of(data: &[u8]) -> Self {
        blake3::hash(data).into()
    }
}

impl From<blake3::Hash> for Digest {
    fn from(hash: blake3::Hash) -> Self {
        Self(hash.into())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_blake3_hex() {
        let hash = blake3::hash(b"abc");
        let digest = Digest::from(hash);
        assert_eq!(digest.to_string(), hash.to_hex().as_str());
        assert_eq!(digest, Digest::of(b"abc"));
    }

    #[test]
    fn test_zero_prints_zeros() {
        assert_eq!(Digest::ZERO.to_string(), "0".repeat(64));
        assert_ne!(Digest::of(b""), Digest::ZERO);
    }
}
