//! Error types for mbhash.

use thiserror::Error;

use crate::engine::{JobError, LaneId};
use crate::stream::StreamId;

/// Errors that can occur while scheduling or hashing streams.
///
/// Every variant is fatal for the run that raised it. Digests already handed
/// to the completion callback before the error stay valid.
#[derive(Debug, Error)]
pub enum MbError {
    /// Invalid configuration parameter.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// Description of what was invalid.
        message: &'static str,
    },

    /// The set of streams or the engine handed to a scheduler is unusable.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of what was invalid.
        message: String,
    },

    /// The scheduler detected a state it must never reach.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// The engine returned a lane with its error code set.
    #[error("{error}: got a lane with an error for stream {}", display_stream(.stream))]
    Job {
        /// The lane the engine handed back.
        lane: LaneId,
        /// The stream bound to that lane, if any.
        stream: Option<StreamId>,
        /// The engine's error code.
        error: JobError,
    },

    /// A single update exceeded the 32-bit length accepted by the engines.
    #[error("chunk too large: {len} bytes (max {})", u32::MAX)]
    ChunkTooLarge {
        /// The length that was attempted.
        len: usize,
    },
}

/// Scheduling bugs. These are never transient, so nothing retries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// A job was about to be opened on a stream that already gave up chunks.
    #[error("cannot start a job for partially-processed stream {stream} ({consumed} chunks consumed)")]
    FirstOnPartialStream {
        /// The offending stream.
        stream: StreamId,
        /// Its consumed count at the time.
        consumed: usize,
    },

    /// Flush produced nothing while input was still waiting.
    #[error("flush returned no lane while {remaining} chunk(s) remain unsubmitted")]
    FlushStalled {
        /// Chunks not yet submitted across all streams.
        remaining: usize,
    },

    /// A lane came back unfinished in the drain phase for a multi-chunk stream.
    #[error("bad job state for stream {stream}: lane still open at drain with {chunks} chunks")]
    UnexpectedDrainState {
        /// The stream served by the lane.
        stream: StreamId,
        /// Number of chunks in that stream.
        chunks: usize,
    },

    /// The engine handed back a lane that carries no stream tag.
    #[error("lane {lane} is not bound to a stream")]
    UnboundLane {
        /// The lane in question.
        lane: LaneId,
    },

    /// A digest was produced before every chunk of the stream was submitted.
    #[error("stream {stream} completed after {consumed} of {chunks} chunks")]
    PrematureCompletion {
        /// The stream in question.
        stream: StreamId,
        /// Chunks submitted so far.
        consumed: usize,
        /// Chunks in the stream.
        chunks: usize,
    },

    /// A second digest was produced for the same stream.
    #[error("stream {stream} reported more than once")]
    DuplicateCompletion {
        /// The stream in question.
        stream: StreamId,
    },

    /// The run ended without a digest for this stream.
    #[error("stream {stream} finished the run without a digest")]
    MissingCompletion {
        /// The stream in question.
        stream: StreamId,
    },
}

fn display_stream(stream: &Option<StreamId>) -> String {
    match stream {
        Some(id) => id.to_string(),
        None => "<unbound>".to_string(),
    }
}
