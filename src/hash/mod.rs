//! Hash primitives used by the engine and the single-sequence mode.
//!
//! - [`Digest`] - Fixed-width 32-byte digest
//! - [`MultiHash`] - Segmented single-stream hash

mod digest;
mod multi;

pub use digest::Digest;
pub use multi::{MultiHash, ROW_LEN, SEGMENTS, SEGMENT_STRIDE};
