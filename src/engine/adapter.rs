//! Engine adapter: pass-through with error checks on every returned lane.

use tracing::trace;

use super::{HashEngine, LaneId, LaneState, SubmitMode};
use crate::error::MbError;
use crate::stream::StreamId;

/// Wraps a [`HashEngine`] for exclusive use by one scheduler run.
///
/// Every handle coming back from `submit` or `flush` has its error code
/// checked before anything else looks at it. The engine offers no way to
/// recover a job mid-stream, so a set error is returned as
/// [`MbError::Job`] and the run stops.
#[derive(Debug)]
pub struct EngineAdapter<E> {
    engine: E,
    submits: usize,
    flushes: usize,
}

impl<E: HashEngine> EngineAdapter<E> {
    /// Takes ownership of an initialized engine.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            submits: 0,
            flushes: 0,
        }
    }

    /// Submits a chunk, failing if the returned lane carries an error.
    pub fn submit(
        &mut self,
        lane: LaneId,
        data: &[u8],
        mode: SubmitMode,
    ) -> Result<Option<LaneId>, MbError> {
        self.submits += 1;
        let handle = self.engine.submit(lane, data, mode);
        self.check(handle)
    }

    /// Flushes, failing if the returned lane carries an error.
    pub fn flush(&mut self) -> Result<Option<LaneId>, MbError> {
        self.flushes += 1;
        let handle = self.engine.flush();
        self.check(handle)
    }

    /// Reads a lane.
    pub fn lane(&self, lane: LaneId) -> &LaneState {
        self.engine.lane(lane)
    }

    /// Sets a lane's stream tag.
    pub fn bind(&mut self, lane: LaneId, stream: StreamId) {
        self.engine.bind(lane, Some(stream));
    }

    /// Number of lanes in the wrapped engine.
    pub fn lane_count(&self) -> usize {
        self.engine.lane_count()
    }

    /// Number of submits issued so far.
    pub fn submits(&self) -> usize {
        self.submits
    }

    /// Number of flushes issued so far.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Returns the wrapped engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn check(&self, handle: Option<LaneId>) -> Result<Option<LaneId>, MbError> {
        let Some(lane) = handle else {
            return Ok(None);
        };

        let state = self.engine.lane(lane);
        if !state.error().is_none() {
            return Err(MbError::Job {
                lane,
                stream: state.tag(),
                error: state.error(),
            });
        }

        trace!(lane = lane.index(), status = ?state.status(), "lane returned");
        Ok(Some(lane))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::{JobError, SoftManager};

    fn adapter(lanes: usize) -> EngineAdapter<SoftManager> {
        EngineAdapter::new(SoftManager::init(EngineConfig::default(), lanes).unwrap())
    }

    #[test]
    fn test_pass_through() {
        let mut adapter = adapter(1);
        let lane = LaneId::new(0);
        adapter.bind(lane, StreamId::new(9));

        assert_eq!(adapter.submit(lane, b"abc", SubmitMode::First).unwrap(), Some(lane));
        assert_eq!(adapter.submit(lane, b"", SubmitMode::Last).unwrap(), None);
        assert_eq!(adapter.flush().unwrap(), Some(lane));
        assert_eq!(adapter.flush().unwrap(), None);

        assert_eq!(adapter.submits(), 2);
        assert_eq!(adapter.flushes(), 2);
        assert_eq!(adapter.lane(lane).tag(), Some(StreamId::new(9)));
    }

    #[test]
    fn test_lane_error_is_fatal() {
        let mut adapter = adapter(2);
        let lane = LaneId::new(1);
        adapter.bind(lane, StreamId::new(5));

        let err = adapter.submit(lane, b"x", SubmitMode::Last).unwrap_err();
        match err {
            MbError::Job {
                lane: got,
                stream,
                error,
            } => {
                assert_eq!(got, lane);
                assert_eq!(stream, Some(StreamId::new(5)));
                assert_eq!(error, JobError::AlreadyCompleted);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
