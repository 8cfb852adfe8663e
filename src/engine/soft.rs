//! Software batch engine.
//!
//! Each lane keeps a partial block. Whole blocks are queued and the lane goes
//! in flight; once `batch_width` lanes are in flight (or on flush) they are
//! computed together, the way a SIMD manager fills its lanes before running.
//! Computed lanes stay in flight in a ready queue until a submit or flush
//! hands them back.

use std::collections::VecDeque;

use tracing::trace;

use super::{HashEngine, JobError, LaneId, LaneState, LaneStatus, SubmitMode};
use crate::config::EngineConfig;
use crate::error::MbError;
use crate::hash::Digest;
use crate::stream::StreamId;

#[derive(Debug)]
struct Slot {
    state: LaneState,
    hasher: blake3::Hasher,
    partial: Vec<u8>,
    queued: Vec<u8>,
    closing: bool,
}

impl Slot {
    fn new(block_len: usize) -> Self {
        Self {
            state: LaneState::new(),
            hasher: blake3::Hasher::new(),
            partial: Vec::with_capacity(block_len),
            queued: Vec::new(),
            closing: false,
        }
    }

    fn open(&mut self) {
        self.hasher.reset();
        self.partial.clear();
        self.queued.clear();
        self.state.digest = Digest::ZERO;
        self.state.status = LaneStatus::IDLE;
    }

    // Absorbs queued blocks; a closing job also takes its tail and finalizes.
    fn compute(&mut self) {
        self.hasher.update(&self.queued);
        self.queued.clear();

        if self.closing {
            self.hasher.update(&self.partial);
            self.partial.clear();
            self.state.digest = self.hasher.finalize().into();
            self.state.status = LaneStatus::new(true, true);
            self.closing = false;
        }
    }
}

/// Software multi-buffer engine hashing every lane with BLAKE3.
///
/// # Example
///
/// ```
/// use mbhash::{EngineConfig, HashEngine, LaneId, LaneStatus, SoftManager, SubmitMode};
///
/// let mut engine = SoftManager::init(EngineConfig::default(), 1)?;
/// let lane = LaneId::new(0);
///
/// // Short input is buffered and the lane comes straight back.
/// assert_eq!(engine.submit(lane, b"ABC", SubmitMode::First), Some(lane));
///
/// // Closing puts it in flight; flush computes and returns it.
/// assert_eq!(engine.submit(lane, b"", SubmitMode::Last), None);
/// assert_eq!(engine.flush(), Some(lane));
/// assert_eq!(engine.lane(lane).status(), LaneStatus::COMPLETE);
/// assert_eq!(engine.flush(), None);
/// # Ok::<(), mbhash::MbError>(())
/// ```
#[derive(Debug)]
pub struct SoftManager {
    config: EngineConfig,
    slots: Vec<Slot>,
    in_flight: Vec<LaneId>,
    ready: VecDeque<LaneId>,
}

impl SoftManager {
    /// Creates an engine with `lanes` lanes.
    pub fn init(config: EngineConfig, lanes: usize) -> Result<Self, MbError> {
        config.validate()?;
        if lanes == 0 {
            return Err(MbError::InvalidConfig {
                message: "engine needs at least one lane",
            });
        }

        Ok(Self {
            config,
            slots: (0..lanes).map(|_| Slot::new(config.block_len())).collect(),
            in_flight: Vec::with_capacity(config.batch_width()),
            ready: VecDeque::with_capacity(lanes),
        })
    }

    /// Number of lanes dispatched but not yet computed.
    pub fn pending_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of computed lanes waiting to be handed back.
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    fn reject(&mut self, lane: LaneId, error: JobError) -> Option<LaneId> {
        trace!(lane = lane.index(), %error, "rejecting submit");
        self.slots[lane.index()].state.error = error;
        Some(lane)
    }

    fn run_batch(&mut self) {
        trace!(lanes = self.in_flight.len(), "computing batch");
        for lane in self.in_flight.drain(..) {
            self.slots[lane.index()].compute();
            self.ready.push_back(lane);
        }
    }

    fn hand_back(&mut self) -> Option<LaneId> {
        let lane = self.ready.pop_front()?;
        let slot = &mut self.slots[lane.index()];
        slot.state.status = LaneStatus::new(slot.state.status.is_complete(), false);
        Some(lane)
    }
}

impl HashEngine for SoftManager {
    fn lane_count(&self) -> usize {
        self.slots.len()
    }

    fn lane(&self, lane: LaneId) -> &LaneState {
        &self.slots[lane.index()].state
    }

    fn bind(&mut self, lane: LaneId, tag: Option<StreamId>) {
        self.slots[lane.index()].state.tag = tag;
    }

    fn submit(&mut self, lane: LaneId, data: &[u8], mode: SubmitMode) -> Option<LaneId> {
        trace!(lane = lane.index(), len = data.len(), ?mode, "submit");
        let block_len = self.config.block_len();
        let status = self.slots[lane.index()].state.status;

        if status.is_in_flight() {
            return self.reject(lane, JobError::AlreadyProcessing);
        }
        if status.is_complete() && !mode.opens() {
            return self.reject(lane, JobError::AlreadyCompleted);
        }
        if u32::try_from(data.len()).is_err() {
            return self.reject(lane, JobError::InvalidLength);
        }

        let slot = &mut self.slots[lane.index()];
        slot.state.error = JobError::None;
        if mode.opens() {
            slot.open();
        }
        slot.closing = mode.closes();

        slot.partial.extend_from_slice(data);
        let whole = slot.partial.len() - slot.partial.len() % block_len;
        slot.queued.extend(slot.partial.drain(..whole));

        if slot.queued.is_empty() && !slot.closing {
            // Nothing to compute yet: the caller keeps the lane.
            return Some(lane);
        }

        slot.state.status = LaneStatus::new(false, true);
        self.in_flight.push(lane);
        if self.in_flight.len() >= self.config.batch_width() {
            self.run_batch();
        }
        self.hand_back()
    }

    fn flush(&mut self) -> Option<LaneId> {
        if self.ready.is_empty() && !self.in_flight.is_empty() {
            self.run_batch();
        }
        let lane = self.hand_back();
        trace!(lane = ?lane.map(LaneId::index), "flush");
        lane
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(batch_width: usize, block_len: usize, lanes: usize) -> SoftManager {
        SoftManager::init(EngineConfig::new(batch_width, block_len).unwrap(), lanes).unwrap()
    }

    #[test]
    fn test_init_rejects_zero_lanes() {
        assert!(SoftManager::init(EngineConfig::default(), 0).is_err());
        assert!(SoftManager::init(EngineConfig::default().with_batch_width(0), 1).is_err());
    }

    #[test]
    fn test_short_input_returns_lane() {
        let mut engine = engine(8, 64, 2);
        let lane = LaneId::new(1);

        assert_eq!(engine.submit(lane, b"ABC", SubmitMode::First), Some(lane));
        assert_eq!(engine.lane(lane).status(), LaneStatus::IDLE);
        assert_eq!(engine.pending_len(), 0);
        assert_eq!(engine.flush(), None);
    }

    #[test]
    fn test_whole_block_goes_in_flight() {
        let mut engine = engine(8, 4, 1);
        let lane = LaneId::new(0);

        assert_eq!(engine.submit(lane, b"ABCDE", SubmitMode::First), None);
        assert!(engine.lane(lane).status().is_in_flight());
        assert_eq!(engine.pending_len(), 1);

        // Flush computes the block and hands back an open job.
        assert_eq!(engine.flush(), Some(lane));
        assert_eq!(engine.lane(lane).status(), LaneStatus::IDLE);

        assert_eq!(engine.submit(lane, b"", SubmitMode::Last), None);
        assert_eq!(engine.flush(), Some(lane));
        assert_eq!(
            engine.lane(lane).digest(),
            Some(Digest::of(b"ABCDE"))
        );
    }

    #[test]
    fn test_entire_completes_after_flush() {
        let mut engine = engine(8, 64, 1);
        let lane = LaneId::new(0);

        assert_eq!(engine.submit(lane, b"abc", SubmitMode::Entire), None);
        assert_eq!(engine.flush(), Some(lane));
        assert_eq!(engine.lane(lane).digest(), Some(Digest::of(b"abc")));
    }

    #[test]
    fn test_full_batch_runs_on_submit() {
        let mut engine = engine(2, 64, 3);
        let (a, b, c) = (LaneId::new(0), LaneId::new(1), LaneId::new(2));

        assert_eq!(engine.submit(a, b"a", SubmitMode::Entire), None);
        // Second in-flight lane fills the batch; the oldest comes back.
        assert_eq!(engine.submit(b, b"b", SubmitMode::Entire), Some(a));
        assert_eq!(engine.lane(a).status(), LaneStatus::COMPLETE);
        assert_eq!(engine.pending_len(), 0);
        assert_eq!(engine.ready_len(), 1);

        // `b` is computed but still held: complete and in flight together.
        let held = engine.lane(b).status();
        assert!(held.is_complete() && held.is_in_flight());
        assert_ne!(held, LaneStatus::COMPLETE);
        assert_eq!(engine.lane(b).digest(), None);

        // Short submit on `c` returns `c` itself, `b` waits for a flush.
        assert_eq!(engine.submit(c, b"c", SubmitMode::First), Some(c));
        assert_eq!(engine.flush(), Some(b));
        assert_eq!(engine.ready_len(), 0);
        assert_eq!(engine.lane(b).digest(), Some(Digest::of(b"b")));
        assert_eq!(engine.flush(), None);
    }

    #[test]
    fn test_errors_are_reported_on_the_lane() {
        let mut engine = engine(8, 4, 1);
        let lane = LaneId::new(0);

        // Fresh lanes are complete: only an opening mode is accepted.
        assert_eq!(engine.submit(lane, b"x", SubmitMode::Update), Some(lane));
        assert_eq!(engine.lane(lane).error(), JobError::AlreadyCompleted);

        assert_eq!(engine.submit(lane, b"long input", SubmitMode::First), None);
        assert_eq!(engine.lane(lane).error(), JobError::None);

        assert_eq!(engine.submit(lane, b"y", SubmitMode::Update), Some(lane));
        assert_eq!(engine.lane(lane).error(), JobError::AlreadyProcessing);
    }

    #[test]
    fn test_first_restarts_an_open_job() {
        let mut engine = engine(8, 64, 1);
        let lane = LaneId::new(0);

        assert_eq!(engine.submit(lane, b"junk", SubmitMode::First), Some(lane));
        assert_eq!(engine.submit(lane, b"abc", SubmitMode::Entire), None);
        assert_eq!(engine.flush(), Some(lane));
        assert_eq!(engine.lane(lane).digest(), Some(Digest::of(b"abc")));
    }

    #[test]
    fn test_bind_sets_tag() {
        let mut engine = engine(8, 64, 2);
        engine.bind(LaneId::new(1), Some(StreamId::new(42)));
        assert_eq!(engine.lane(LaneId::new(1)).tag(), Some(StreamId::new(42)));
        assert_eq!(engine.lane(LaneId::new(0)).tag(), None);
    }
}
