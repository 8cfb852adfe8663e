//! Stream cursors - one logical input sequence per job.
//!
//! - [`StreamId`] - Caller-chosen identifier used in reports and errors
//! - [`StreamCursor`] - Ordered chunks plus how many were handed to the engine

use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::error::MbError;

/// Identifies a stream in completions and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId(u64);

impl StreamId {
    /// Creates a stream identifier.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One logical input: an ordered sequence of chunks hashed into one digest.
///
/// `consumed` only moves forward and never passes the number of chunks.
/// Chunks are [`Bytes`], so building a cursor from shared buffers does not
/// copy them.
///
/// # Example
///
/// ```
/// use mbhash::{StreamCursor, StreamId};
///
/// let stream = StreamCursor::new(StreamId::new(0), ["a", "b", "c"]);
/// assert_eq!(stream.len(), 3);
/// assert_eq!(stream.consumed(), 0);
/// assert_eq!(stream.total_bytes(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct StreamCursor {
    id: StreamId,
    chunks: Vec<Bytes>,
    consumed: usize,
}

impl StreamCursor {
    /// Creates a cursor positioned before the first chunk.
    pub fn new<I>(id: StreamId, chunks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        Self {
            id,
            chunks: chunks.into_iter().map(Into::into).collect(),
            consumed: 0,
        }
    }

    /// Moves the cursor as if `consumed` chunks had already been submitted.
    ///
    /// Schedulers refuse to open a job on such a cursor; this exists to hand
    /// over partially processed input and have that detected.
    pub fn resume_at(mut self, consumed: usize) -> Result<Self, MbError> {
        if consumed > self.chunks.len() {
            return Err(MbError::InvalidInput {
                message: format!(
                    "stream {} has {} chunks, cannot resume at {}",
                    self.id,
                    self.chunks.len(),
                    consumed
                ),
            });
        }
        self.consumed = consumed;
        Ok(self)
    }

    /// Returns the stream identifier.
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Returns the number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true if the stream has no chunks at all.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns how many chunks were handed to the engine.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Returns how many chunks are still waiting.
    pub fn remaining(&self) -> usize {
        self.chunks.len() - self.consumed
    }

    /// Returns true once every chunk was handed to the engine.
    pub fn is_exhausted(&self) -> bool {
        self.consumed == self.chunks.len()
    }

    /// Returns all chunks in order.
    pub fn chunks(&self) -> &[Bytes] {
        &self.chunks
    }

    /// Returns the sum of all chunk lengths.
    pub fn total_bytes(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }

    /// Returns every chunk joined into one buffer.
    pub fn concat(&self) -> Bytes {
        match self.chunks.as_slice() {
            [] => Bytes::new(),
            [only] => only.clone(),
            chunks => {
                let mut joined = BytesMut::with_capacity(self.total_bytes());
                for chunk in chunks {
                    joined.extend_from_slice(chunk);
                }
                joined.freeze()
            }
        }
    }

    /// Takes the next chunk, returning it together with whether it was the last one.
    pub(crate) fn advance(&mut self) -> Option<(Bytes, bool)> {
        let chunk = self.chunks.get(self.consumed)?.clone();
        self.consumed += 1;
        Some((chunk, self.is_exhausted()))
    }
}

impl fmt::Display for StreamCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stream({}: {}/{} chunks, {} bytes)",
            self.id,
            self.consumed,
            self.chunks.len(),
            self.total_bytes()
        )
    }
}
