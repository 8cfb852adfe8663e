//! mbhash
//!
//! Lane scheduling for multi-buffer incremental hashing.
//!
//! A multi-buffer engine hashes several independent jobs at once, one per
//! lane, and only makes progress once enough lanes have data. `mbhash` feeds
//! such an engine from many byte streams, each split into chunks, and hands
//! back exactly one digest per stream. It is meant for:
//!
//! - hashing many small files or messages in one pass
//! - checksumming records that arrive in pieces
//! - driving SIMD batch hash back ends from plain chunk lists
//!
//! The crate intentionally:
//! - does NOT read files or sockets
//! - does NOT spawn threads
//! - does NOT retry failed jobs
//!
//! It only does one thing: **streams of chunks in → one digest per stream out**
//!
//! # Many streams
//!
//! ```
//! use mbhash::{LaneScheduler, SchedulerConfig, StreamCursor, StreamId};
//!
//! let streams = vec![
//!     StreamCursor::new(StreamId::new(0), ["hello ", "world"]),
//!     StreamCursor::new(StreamId::new(1), ["single"]),
//! ];
//!
//! let mut scheduler = LaneScheduler::new(streams, SchedulerConfig::default())?;
//! for completion in scheduler.run_collect()? {
//!     println!("{}: {}", completion.stream, completion.digest);
//! }
//! # Ok::<(), mbhash::MbError>(())
//! ```
//!
//! # One stream
//!
//! ```
//! use mbhash::{SchedulerConfig, SingleStreamDriver, StreamCursor, StreamId};
//!
//! let stream = StreamCursor::new(StreamId::new(0), ["ABC"]);
//! let completion = SingleStreamDriver::new(stream, SchedulerConfig::default())?.run_collect()?;
//! assert_eq!(completion.consumed, 1);
//! # Ok::<(), mbhash::MbError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod hash;
mod scheduler;
mod stream;

//
// Public surface
//

pub use config::{
    DEFAULT_BATCH_WIDTH, DEFAULT_BLOCK_LEN, EngineConfig, MAX_BATCH_WIDTH, MAX_BLOCK_LEN,
    OpenPolicy, SchedulerConfig,
};
pub use engine::{
    EngineAdapter, HashEngine, JobError, LaneId, LaneState, LaneStatus, SoftManager, SubmitMode,
};
pub use error::{MbError, ProtocolViolation};
pub use hash::{Digest, MultiHash, ROW_LEN, SEGMENT_STRIDE, SEGMENTS};
pub use scheduler::{Completion, LaneScheduler, RunStats, SingleStreamDriver};
pub use stream::{StreamCursor, StreamId};
