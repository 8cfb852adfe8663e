//! Multi-buffer hash engine boundary.
//!
//! An engine owns a fixed array of lanes. Each lane runs one hashing job at a
//! time, and the engine computes the jobs of several lanes together. The
//! protocol has four operations:
//!
//! - [`SoftManager::init`] - allocate the lanes; they start complete and not in flight
//! - [`HashEngine::submit`] - feed a chunk to a lane, tagged with a [`SubmitMode`]
//! - [`HashEngine::flush`] - make progress without new data
//! - [`HashEngine::lane`] - read a lane's [`LaneState`]
//!
//! Submit and flush return a handle that may name *any* lane, not only the
//! one just fed, or nothing at all. The caller must look at the returned lane
//! right away: it is either finished ([`LaneStatus::COMPLETE`]) or waiting for
//! more input from its stream.
//!
//! - [`SoftManager`] - Software batch engine (BLAKE3 per lane)
//! - [`EngineAdapter`] - Pass-through that turns lane errors into [`MbError`](crate::MbError)

mod adapter;
mod soft;

use std::fmt;

use crate::hash::Digest;
use crate::stream::StreamId;

pub use adapter::EngineAdapter;
pub use soft::SoftManager;

/// Index of a lane inside an engine's fixed lane array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LaneId(usize);

impl LaneId {
    /// Creates a lane handle.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the lane's position in the engine.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a chunk in its job's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmitMode {
    /// Opens a job with its first chunk.
    First,
    /// Middle chunk of an open job.
    Update,
    /// Final chunk; the job becomes eligible for finalization.
    Last,
    /// Single-chunk job, opened and closed by one call.
    Entire,
}

impl SubmitMode {
    /// Returns true for modes that start a new job.
    pub const fn opens(self) -> bool {
        matches!(self, Self::First | Self::Entire)
    }

    /// Returns true for modes that close the job.
    pub const fn closes(self) -> bool {
        matches!(self, Self::Last | Self::Entire)
    }
}

/// Lane status as two independent flags.
///
/// An engine may mark a lane complete while still holding it (other lanes of
/// the same batch are in progress). Only the exact value
/// [`LaneStatus::COMPLETE`] means the job is finished and handed back, so
/// callers compare with `==` and never test the `complete` flag alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LaneStatus {
    complete: bool,
    in_flight: bool,
}

impl LaneStatus {
    /// Finished and returned to the caller: nothing else set.
    pub const COMPLETE: Self = Self {
        complete: true,
        in_flight: false,
    };

    /// Open job returned to the caller, waiting for more input.
    pub const IDLE: Self = Self {
        complete: false,
        in_flight: false,
    };

    /// Creates a status from its flags.
    pub const fn new(complete: bool, in_flight: bool) -> Self {
        Self {
            complete,
            in_flight,
        }
    }

    /// Returns the "digest computed" flag.
    pub const fn is_complete(self) -> bool {
        self.complete
    }

    /// Returns the "held by the engine" flag.
    pub const fn is_in_flight(self) -> bool {
        self.in_flight
    }
}

/// Per-lane error code set by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JobError {
    /// No error.
    #[default]
    None,
    /// The lane was submitted to while the engine still held it.
    AlreadyProcessing,
    /// The lane's job is finished and the mode does not open a new one.
    AlreadyCompleted,
    /// The chunk length does not fit the engine's 32-bit length field.
    InvalidLength,
}

impl JobError {
    /// Returns true for [`JobError::None`].
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::None => "no error",
            Self::AlreadyProcessing => "lane already processing",
            Self::AlreadyCompleted => "lane already completed",
            Self::InvalidLength => "invalid chunk length",
        };
        f.write_str(msg)
    }
}

/// What the caller can see of a lane: status, error, digest and user tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneState {
    pub(crate) status: LaneStatus,
    pub(crate) error: JobError,
    pub(crate) digest: Digest,
    pub(crate) tag: Option<StreamId>,
}

impl LaneState {
    /// A freshly initialized lane: complete, not in flight, no error.
    pub const fn new() -> Self {
        Self {
            status: LaneStatus::COMPLETE,
            error: JobError::None,
            digest: Digest::ZERO,
            tag: None,
        }
    }

    /// Returns the status flags.
    pub fn status(&self) -> LaneStatus {
        self.status
    }

    /// Returns the error code of the last submit on this lane.
    pub fn error(&self) -> JobError {
        self.error
    }

    /// Returns true when the job is finished without error.
    pub fn is_done(&self) -> bool {
        self.status == LaneStatus::COMPLETE && self.error.is_none()
    }

    /// Returns the digest if the job is finished without error.
    pub fn digest(&self) -> Option<Digest> {
        self.is_done().then_some(self.digest)
    }

    /// Returns the stream this lane is bound to, if any.
    pub fn tag(&self) -> Option<StreamId> {
        self.tag
    }
}

impl Default for LaneState {
    fn default() -> Self {
        Self::new()
    }
}

/// A multi-buffer hash engine.
///
/// Implementations never block: every call returns at once with a lane handle
/// or `None`. An empty `data` slice stands for "no data".
pub trait HashEngine {
    /// Number of lanes allocated at construction.
    fn lane_count(&self) -> usize;

    /// Reads a lane.
    ///
    /// # Panics
    ///
    /// May panic if `lane` does not belong to this engine.
    fn lane(&self, lane: LaneId) -> &LaneState;

    /// Sets the opaque user tag of a lane.
    fn bind(&mut self, lane: LaneId, tag: Option<StreamId>);

    /// Feeds `data` to `lane` and returns whichever lane is ready, if any.
    ///
    /// A lane with a usage error is returned immediately with
    /// [`LaneState::error`] set.
    fn submit(&mut self, lane: LaneId, data: &[u8], mode: SubmitMode) -> Option<LaneId>;

    /// Advances in-flight jobs and returns a ready lane, or `None` when the
    /// engine holds nothing.
    fn flush(&mut self) -> Option<LaneId>;
}

impl<E: HashEngine + ?Sized> HashEngine for &mut E {
    fn lane_count(&self) -> usize {
        (**self).lane_count()
    }

    fn lane(&self, lane: LaneId) -> &LaneState {
        (**self).lane(lane)
    }

    fn bind(&mut self, lane: LaneId, tag: Option<StreamId>) {
        (**self).bind(lane, tag)
    }

    fn submit(&mut self, lane: LaneId, data: &[u8], mode: SubmitMode) -> Option<LaneId> {
        (**self).submit(lane, data, mode)
    }

    fn flush(&mut self) -> Option<LaneId> {
        (**self).flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_mode_flags() {
        assert!(SubmitMode::First.opens() && !SubmitMode::First.closes());
        assert!(!SubmitMode::Update.opens() && !SubmitMode::Update.closes());
        assert!(!SubmitMode::Last.opens() && SubmitMode::Last.closes());
        assert!(SubmitMode::Entire.opens() && SubmitMode::Entire.closes());
    }

    #[test]
    fn test_complete_needs_exact_match() {
        let held = LaneStatus::new(true, true);
        assert!(held.is_complete());
        assert_ne!(held, LaneStatus::COMPLETE);
        assert_eq!(LaneStatus::new(true, false), LaneStatus::COMPLETE);
    }

    #[test]
    fn test_fresh_lane() {
        let lane = LaneState::new();
        assert_eq!(lane.status(), LaneStatus::COMPLETE);
        assert_eq!(lane.error(), JobError::None);
        assert_eq!(lane.tag(), None);
    }

    #[test]
    fn test_digest_hidden_unless_done() {
        let mut lane = LaneState::new();
        lane.status = LaneStatus::IDLE;
        assert_eq!(lane.digest(), None);

        lane.status = LaneStatus::COMPLETE;
        lane.error = JobError::AlreadyCompleted;
        assert_eq!(lane.digest(), None);

        lane.error = JobError::None;
        assert_eq!(lane.digest(), Some(Digest::ZERO));
    }

    #[test]
    fn test_job_error_display() {
        assert_eq!(JobError::AlreadyCompleted.to_string(), "lane already completed");
        assert!(JobError::None.is_none());
        assert!(!JobError::InvalidLength.is_none());
    }
}
