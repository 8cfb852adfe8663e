//! Lane scheduling - drives several streams through one multi-buffer engine.
//!
//! - [`LaneScheduler`] - One lane per stream, interleaved submits, final drain
//! - [`SingleStreamDriver`] - The same protocol for exactly one stream
//! - [`Completion`] - A finished digest as handed to the caller
//! - [`RunStats`] - What a run did, for tests and diagnostics
//!
//! # Example
//!
//! ```
//! use mbhash::{LaneScheduler, SchedulerConfig, StreamCursor, StreamId};
//!
//! let streams = vec![
//!     StreamCursor::new(StreamId::new(0), ["a", "b", "c"]),
//!     StreamCursor::new(StreamId::new(1), ["c", "b", "a", "a", "b", "c"]),
//! ];
//!
//! let mut scheduler = LaneScheduler::new(streams, SchedulerConfig::default())?;
//! let mut done = Vec::new();
//! let stats = scheduler.run(|completion| done.push(completion))?;
//!
//! assert_eq!(done.len(), 2);
//! assert_eq!(stats.completions, 2);
//! # Ok::<(), mbhash::MbError>(())
//! ```

mod single;

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::config::{OpenPolicy, SchedulerConfig};
use crate::engine::{EngineAdapter, HashEngine, LaneId, SoftManager, SubmitMode};
use crate::error::{MbError, ProtocolViolation};
use crate::hash::Digest;
use crate::stream::{StreamCursor, StreamId};

pub use single::SingleStreamDriver;

/// A finished job, reported exactly once per stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// The stream the digest belongs to.
    pub stream: StreamId,
    /// The lane that computed it.
    pub lane: LaneId,
    /// The digest over all of the stream's chunks.
    pub digest: Digest,
    /// Chunks the stream had consumed when the digest was reported.
    pub consumed: usize,
}

/// Counters collected over one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    /// Submit calls issued, closing submits included.
    pub submits: usize,
    /// Flush calls issued.
    pub flushes: usize,
    /// Digests reported.
    pub completions: usize,
    /// Zero-length `Last` sent to a lane that came back after its stream ran out.
    pub rotation_closes: usize,
    /// Zero-length `Last` sent right after the data loop to a lane still held
    /// by the caller (a short single-chunk job).
    pub finish_closes: usize,
    /// Zero-length `Last` sent during the drain phase.
    pub drain_closes: usize,
}

/// Schedules one stream per lane of a multi-buffer engine.
///
/// The scheduler owns the engine (through an [`EngineAdapter`]) and the
/// streams for the whole run. It keeps at most one lane handle at a time:
/// whatever the last submit or flush returned. That lane is fed from its own
/// stream, closed if its stream has run out, or reported if finished. With no
/// handle it opens the next unused lane, and once every lane is open it
/// flushes. When all chunks are submitted the engine is flushed until empty.
///
/// A stream is reported only after all of its chunks were submitted, and each
/// stream is reported exactly once. Reporting order across streams follows
/// the engine's batching.
#[derive(Debug)]
pub struct LaneScheduler<E: HashEngine = SoftManager> {
    adapter: EngineAdapter<E>,
    streams: Vec<StreamCursor>,
    reported: Vec<bool>,
    open_policy: OpenPolicy,
    stats: RunStats,
}

impl LaneScheduler<SoftManager> {
    /// Creates a scheduler with a [`SoftManager`] sized to the streams.
    pub fn new(streams: Vec<StreamCursor>, config: SchedulerConfig) -> Result<Self, MbError> {
        validate_streams(&streams)?;
        let engine = SoftManager::init(*config.engine_config(), streams.len())?;
        Self::with_engine(engine, streams, config.open_policy())
    }
}

impl<E: HashEngine> LaneScheduler<E> {
    /// Creates a scheduler over a caller-supplied engine.
    ///
    /// The engine must have exactly one lane per stream; lane `i` serves
    /// stream `i`.
    pub fn with_engine(
        engine: E,
        streams: Vec<StreamCursor>,
        open_policy: OpenPolicy,
    ) -> Result<Self, MbError> {
        validate_streams(&streams)?;
        if engine.lane_count() != streams.len() {
            return Err(MbError::InvalidInput {
                message: format!(
                    "engine has {} lanes for {} streams",
                    engine.lane_count(),
                    streams.len()
                ),
            });
        }

        Ok(Self {
            adapter: EngineAdapter::new(engine),
            reported: vec![false; streams.len()],
            streams,
            open_policy,
            stats: RunStats::default(),
        })
    }

    /// Drives every stream to completion, calling `on_complete` once per stream.
    ///
    /// A scheduler runs once; a second call finds its streams consumed and
    /// fails with [`ProtocolViolation::FirstOnPartialStream`].
    ///
    /// # Errors
    ///
    /// Any [`ProtocolViolation`] or engine job error stops the run at once.
    /// Completions delivered before the error remain valid.
    #[instrument(skip_all, fields(streams = self.streams.len()))]
    pub fn run<F>(&mut self, mut on_complete: F) -> Result<RunStats, MbError>
    where
        F: FnMut(Completion),
    {
        let mut handle: Option<LaneId> = None;
        let mut lanes_in_use = 0;

        while lanes_in_use < self.streams.len() || self.remaining() > 0 {
            if let Some(lane) = handle {
                let index = self.owner(lane)?;
                let stream = &mut self.streams[index];
                handle = match stream.advance() {
                    Some((chunk, is_last)) => {
                        let mode = if is_last {
                            SubmitMode::Last
                        } else {
                            SubmitMode::Update
                        };
                        self.adapter.submit(lane, &chunk, mode)?
                    }
                    None => {
                        // The lane rotated back before its stream was known
                        // to be done: close the job without adding data.
                        debug!(%lane, stream = %stream.id(), "closing lane of exhausted stream");
                        self.stats.rotation_closes += 1;
                        self.adapter.submit(lane, &[], SubmitMode::Last)?
                    }
                };
            } else if lanes_in_use < self.streams.len() {
                handle = self.open(LaneId::new(lanes_in_use), lanes_in_use)?;
                lanes_in_use += 1;
            } else {
                handle = self.adapter.flush()?;
                if handle.is_none() {
                    return Err(ProtocolViolation::FlushStalled {
                        remaining: self.remaining(),
                    }
                    .into());
                }
            }

            if let Some(lane) = handle {
                if let Some(digest) = self.adapter.lane(lane).digest() {
                    self.report(lane, digest, &mut on_complete)?;
                    handle = None;
                }
            }
        }

        let handle = self.close_held(handle)?;
        self.drain(handle, &mut on_complete)?;
        self.finish()
    }

    /// Runs and collects the completions in reporting order.
    pub fn run_collect(&mut self) -> Result<Vec<Completion>, MbError> {
        let mut completions = Vec::with_capacity(self.streams.len());
        self.run(|completion| completions.push(completion))?;
        Ok(completions)
    }

    /// Returns the streams in lane order.
    pub fn streams(&self) -> &[StreamCursor] {
        &self.streams
    }

    /// Returns the counters of the last run.
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Returns the engine.
    pub fn engine(&self) -> &E {
        self.adapter.engine()
    }

    fn remaining(&self) -> usize {
        self.streams.iter().map(StreamCursor::remaining).sum()
    }

    fn open(&mut self, lane: LaneId, index: usize) -> Result<Option<LaneId>, MbError> {
        let stream = &mut self.streams[index];
        if stream.consumed() != 0 {
            return Err(ProtocolViolation::FirstOnPartialStream {
                stream: stream.id(),
                consumed: stream.consumed(),
            }
            .into());
        }

        let mode = match self.open_policy {
            OpenPolicy::EntireForSingleChunk if stream.len() == 1 => SubmitMode::Entire,
            _ => SubmitMode::First,
        };
        let id = stream.id();
        let Some((chunk, _)) = stream.advance() else {
            return Err(empty_stream(id));
        };

        debug!(%lane, stream = %id, ?mode, "opening job");
        self.adapter.bind(lane, id);
        self.adapter.submit(lane, &chunk, mode)
    }

    // The data loop can end holding a lane whose only submit was a short
    // `First`. Close it now; anything else held goes to the drain unchanged.
    fn close_held(&mut self, handle: Option<LaneId>) -> Result<Option<LaneId>, MbError> {
        let Some(lane) = handle else {
            return Ok(None);
        };
        let stream = &self.streams[self.owner(lane)?];
        if self.adapter.lane(lane).digest().is_some() || stream.len() != 1 {
            return Ok(Some(lane));
        }

        debug!(%lane, stream = %stream.id(), "closing held lane after the last chunk");
        self.stats.finish_closes += 1;
        self.adapter.submit(lane, &[], SubmitMode::Last)
    }

    // Flushes until the engine is empty, closing single-chunk jobs that only
    // ever saw their opening submit. `handle` is the lane still held when the
    // data loop ended, if any.
    fn drain<F>(&mut self, mut handle: Option<LaneId>, on_complete: &mut F) -> Result<(), MbError>
    where
        F: FnMut(Completion),
    {
        loop {
            let lane = match handle.take() {
                Some(lane) => lane,
                None => match self.adapter.flush()? {
                    Some(lane) => lane,
                    None => return Ok(()),
                },
            };

            if let Some(digest) = self.adapter.lane(lane).digest() {
                self.report(lane, digest, on_complete)?;
                continue;
            }

            let stream = &self.streams[self.owner(lane)?];
            if stream.len() != 1 {
                return Err(ProtocolViolation::UnexpectedDrainState {
                    stream: stream.id(),
                    chunks: stream.len(),
                }
                .into());
            }

            debug!(%lane, stream = %stream.id(), "closing single-chunk job in drain");
            self.stats.drain_closes += 1;
            handle = self.adapter.submit(lane, &[], SubmitMode::Last)?;
        }
    }

    fn owner(&self, lane: LaneId) -> Result<usize, MbError> {
        let tag = self.adapter.lane(lane).tag();
        tag.and_then(|id| self.streams.iter().position(|s| s.id() == id))
            .ok_or_else(|| ProtocolViolation::UnboundLane { lane }.into())
    }

    fn report<F>(&mut self, lane: LaneId, digest: Digest, on_complete: &mut F) -> Result<(), MbError>
    where
        F: FnMut(Completion),
    {
        let index = self.owner(lane)?;
        let stream = &self.streams[index];
        check_reportable(stream, self.reported[index])?;
        self.reported[index] = true;
        self.stats.completions += 1;

        debug!(%lane, stream = %stream.id(), %digest, "job complete");
        on_complete(Completion {
            stream: stream.id(),
            lane,
            digest,
            consumed: stream.consumed(),
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<RunStats, MbError> {
        self.stats.submits = self.adapter.submits();
        self.stats.flushes = self.adapter.flushes();

        if let Some(index) = self.reported.iter().position(|done| !done) {
            return Err(ProtocolViolation::MissingCompletion {
                stream: self.streams[index].id(),
            }
            .into());
        }
        Ok(self.stats)
    }
}

fn validate_streams(streams: &[StreamCursor]) -> Result<(), MbError> {
    if streams.is_empty() {
        return Err(MbError::InvalidInput {
            message: "no streams to schedule".to_string(),
        });
    }

    let mut seen = HashSet::with_capacity(streams.len());
    for stream in streams {
        if stream.is_empty() {
            return Err(empty_stream(stream.id()));
        }
        if !seen.insert(stream.id()) {
            return Err(MbError::InvalidInput {
                message: format!("stream id {} used more than once", stream.id()),
            });
        }
    }
    Ok(())
}

fn empty_stream(id: StreamId) -> MbError {
    MbError::InvalidInput {
        message: format!("stream {id} has no chunks"),
    }
}

fn check_reportable(stream: &StreamCursor, already_reported: bool) -> Result<(), MbError> {
    if !stream.is_exhausted() {
        return Err(ProtocolViolation::PrematureCompletion {
            stream: stream.id(),
            consumed: stream.consumed(),
            chunks: stream.len(),
        }
        .into());
    }
    if already_reported {
        return Err(ProtocolViolation::DuplicateCompletion {
            stream: stream.id(),
        }
        .into());
    }
    Ok(())
}
