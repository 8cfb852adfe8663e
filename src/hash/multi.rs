//! Segmented single-stream hash ("multi-hash").
//!
//! Input is laid out in rows of [`ROW_LEN`] bytes. Row bytes
//! `[s * SEGMENT_STRIDE, (s + 1) * SEGMENT_STRIDE)` feed segment `s`, so the
//! segments advance in lock step the way SIMD lanes would. The final digest
//! hashes every segment digest followed by the total input length.
//!
//! The result is not a plain BLAKE3 hash of the input, but it only depends on
//! the bytes, never on how they were split across [`MultiHash::update`] calls.

use super::Digest;
use crate::error::MbError;

/// Number of independent segments.
pub const SEGMENTS: usize = 16;

/// Bytes each segment takes from a row.
pub const SEGMENT_STRIDE: usize = 64;

/// Bytes per row.
pub const ROW_LEN: usize = SEGMENTS * SEGMENT_STRIDE;

/// Incremental multi-hash over one byte sequence.
///
/// # Example
///
/// ```
/// use mbhash::MultiHash;
///
/// let mut hash = MultiHash::new();
/// hash.update(b"hello ")?;
/// hash.update(b"world")?;
/// let digest = hash.finalize();
///
/// let mut other = MultiHash::new();
/// other.update(b"hello world")?;
/// assert_eq!(digest, other.finalize());
/// # Ok::<(), mbhash::MbError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MultiHash {
    segments: [blake3::Hasher; SEGMENTS],
    row: Vec<u8>,
    total: u64,
}

impl MultiHash {
    /// Creates an empty multi-hash.
    pub fn new() -> Self {
        Self {
            segments: std::array::from_fn(|_| blake3::Hasher::new()),
            row: Vec::with_capacity(ROW_LEN),
            total: 0,
        }
    }

    /// Feeds more input.
    ///
    /// Returns [`MbError::ChunkTooLarge`] for slices longer than `u32::MAX`,
    /// leaving the state unchanged.
    pub fn update(&mut self, data: &[u8]) -> Result<(), MbError> {
        if u32::try_from(data.len()).is_err() {
            return Err(MbError::ChunkTooLarge { len: data.len() });
        }
        self.total += data.len() as u64;

        let mut data = data;
        if !self.row.is_empty() {
            let fill = (ROW_LEN - self.row.len()).min(data.len());
            self.row.extend_from_slice(&data[..fill]);
            data = &data[fill..];

            if self.row.len() < ROW_LEN {
                return Ok(());
            }
            absorb_row(&mut self.segments, &self.row);
            self.row.clear();
        }

        let mut rows = data.chunks_exact(ROW_LEN);
        for row in &mut rows {
            absorb_row(&mut self.segments, row);
        }
        self.row.extend_from_slice(rows.remainder());
        Ok(())
    }

    /// Total number of bytes fed so far.
    pub fn total_len(&self) -> u64 {
        self.total
    }

    /// Consumes the state and returns the digest.
    pub fn finalize(mut self) -> Digest {
        absorb_row(&mut self.segments, &self.row);

        let mut outer = blake3::Hasher::new();
        for segment in &self.segments {
            outer.update(segment.finalize().as_bytes());
        }
        outer.update(&self.total.to_le_bytes());
        outer.finalize().into()
    }
}

impl Default for MultiHash {
    fn default() -> Self {
        Self::new()
    }
}

// A short (final) row feeds only the segments its bytes reach.
fn absorb_row(segments: &mut [blake3::Hasher; SEGMENTS], row: &[u8]) {
    for (segment, part) in segments.iter_mut().zip(row.chunks(SEGMENT_STRIDE)) {
        segment.update(part);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multi<T: AsRef<[u8]>>(parts: &[T]) -> Digest {
        let mut hash = MultiHash::new();
        for part in parts {
            hash.update(part.as_ref()).unwrap();
        }
        hash.finalize()
    }

    #[test]
    fn test_empty_is_deterministic() {
        assert_eq!(multi::<&[u8]>(&[]), multi(&[b""]));
    }

    #[test]
    fn test_split_invariance_across_rows() {
        let data: Vec<u8> = (0..(3 * ROW_LEN + 17)).map(|i| (i * 31 % 251) as u8).collect();
        let whole = multi(&[&data]);

        for split in [1, SEGMENT_STRIDE, ROW_LEN - 1, ROW_LEN, ROW_LEN + 5, 2 * ROW_LEN + 1] {
            let (a, b) = data.split_at(split);
            assert_eq!(multi(&[a, b]), whole, "split at {split}");
        }

        let bytewise: Vec<&[u8]> = data.chunks(1).collect();
        assert_eq!(multi(&bytewise), whole);
    }

    #[test]
    fn test_length_is_bound() {
        // Trailing zero bytes change the length, so they change the digest.
        assert_ne!(multi(&[b"abc"]), multi(&[b"abc\0"]));
        assert_ne!(multi(&[&[0u8; ROW_LEN]]), multi(&[&[0u8; 2 * ROW_LEN]]));
    }

    #[test]
    fn test_differs_from_plain_blake3() {
        let data = [0x41u8; 2 * ROW_LEN];
        assert_ne!(multi(&[&data]), Digest::of(&data));
    }

    #[test]
    fn test_total_len() {
        let mut hash = MultiHash::new();
        hash.update(b"ABC").unwrap();
        hash.update(&[0u8; ROW_LEN]).unwrap();
        assert_eq!(hash.total_len(), 3 + ROW_LEN as u64);
    }
}
