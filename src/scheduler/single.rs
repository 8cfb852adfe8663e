//! Single-stream driver.

use tracing::{debug, instrument};

use super::{Completion, RunStats, check_reportable, empty_stream};
use crate::config::{OpenPolicy, SchedulerConfig};
use crate::engine::{EngineAdapter, HashEngine, LaneId, SoftManager, SubmitMode};
use crate::error::{MbError, ProtocolViolation};
use crate::hash::Digest;
use crate::stream::StreamCursor;

const LANE: LaneId = LaneId::new(0);

/// Hashes one stream on lane 0 of an engine.
///
/// The job is opened with the first chunk and fed every later chunk as
/// `Update`, flushing whenever the engine keeps the lane. The data loop never
/// closes the job; that happens afterwards with a zero-length `Last`, either
/// right away if the lane is still held or while flushing the engine empty.
///
/// # Example
///
/// ```
/// use mbhash::{Digest, SchedulerConfig, SingleStreamDriver, StreamCursor, StreamId};
///
/// let stream = StreamCursor::new(StreamId::new(0), ["ABC"]);
/// let mut driver = SingleStreamDriver::new(stream, SchedulerConfig::default())?;
///
/// let mut digest = None;
/// let stats = driver.run(|completion| digest = Some(completion.digest))?;
///
/// assert_eq!(digest, Some(Digest::of(b"ABC")));
/// assert_eq!(stats.finish_closes, 1);
/// # Ok::<(), mbhash::MbError>(())
/// ```
#[derive(Debug)]
pub struct SingleStreamDriver<E: HashEngine = SoftManager> {
    adapter: EngineAdapter<E>,
    stream: StreamCursor,
    open_policy: OpenPolicy,
    reported: bool,
    stats: RunStats,
}

impl SingleStreamDriver<SoftManager> {
    /// Creates a driver with a one-lane [`SoftManager`].
    pub fn new(stream: StreamCursor, config: SchedulerConfig) -> Result<Self, MbError> {
        let engine = SoftManager::init(*config.engine_config(), 1)?;
        Self::with_engine(engine, stream, config.open_policy())
    }
}

impl<E: HashEngine> SingleStreamDriver<E> {
    /// Creates a driver over a caller-supplied engine. Only lane 0 is used.
    pub fn with_engine(
        engine: E,
        stream: StreamCursor,
        open_policy: OpenPolicy,
    ) -> Result<Self, MbError> {
        if engine.lane_count() == 0 {
            return Err(MbError::InvalidConfig {
                message: "engine needs at least one lane",
            });
        }
        if stream.is_empty() {
            return Err(empty_stream(stream.id()));
        }

        Ok(Self {
            adapter: EngineAdapter::new(engine),
            stream,
            open_policy,
            reported: false,
            stats: RunStats::default(),
        })
    }

    /// Hashes the stream, calling `on_complete` once with its digest.
    #[instrument(skip_all, fields(stream = %self.stream.id(), chunks = self.stream.len()))]
    pub fn run<F>(&mut self, mut on_complete: F) -> Result<RunStats, MbError>
    where
        F: FnMut(Completion),
    {
        let mut handle = self.open()?;

        while !self.stream.is_exhausted() {
            match handle {
                Some(lane) => {
                    let Some((chunk, _)) = self.stream.advance() else {
                        break;
                    };
                    handle = self.adapter.submit(lane, &chunk, SubmitMode::Update)?;
                }
                None => {
                    handle = self.adapter.flush()?;
                    if handle.is_none() {
                        return Err(ProtocolViolation::FlushStalled {
                            remaining: self.stream.remaining(),
                        }
                        .into());
                    }
                }
            }
        }

        let mut handle = match handle {
            Some(lane) if self.adapter.lane(lane).digest().is_none() => {
                debug!(%lane, "closing held lane after the last chunk");
                self.stats.finish_closes += 1;
                self.adapter.submit(lane, &[], SubmitMode::Last)?
            }
            other => other,
        };

        loop {
            let lane = match handle.take() {
                Some(lane) => lane,
                None => match self.adapter.flush()? {
                    Some(lane) => lane,
                    None => break,
                },
            };

            match self.adapter.lane(lane).digest() {
                Some(digest) => self.report(lane, digest, &mut on_complete)?,
                None => {
                    debug!(%lane, "closing lane in drain");
                    self.stats.drain_closes += 1;
                    handle = self.adapter.submit(lane, &[], SubmitMode::Last)?;
                }
            }
        }

        self.stats.submits = self.adapter.submits();
        self.stats.flushes = self.adapter.flushes();
        if !self.reported {
            return Err(ProtocolViolation::MissingCompletion {
                stream: self.stream.id(),
            }
            .into());
        }
        Ok(self.stats)
    }

    /// Runs and returns the single completion.
    pub fn run_collect(&mut self) -> Result<Completion, MbError> {
        let mut completion = None;
        self.run(|c| completion = Some(c))?;
        completion.ok_or_else(|| {
            ProtocolViolation::MissingCompletion {
                stream: self.stream.id(),
            }
            .into()
        })
    }

    /// Returns the stream.
    pub fn stream(&self) -> &StreamCursor {
        &self.stream
    }

    /// Returns the counters of the last run.
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Returns the engine.
    pub fn engine(&self) -> &E {
        self.adapter.engine()
    }

    fn open(&mut self) -> Result<Option<LaneId>, MbError> {
        let id = self.stream.id();
        if self.stream.consumed() != 0 {
            return Err(ProtocolViolation::FirstOnPartialStream {
                stream: id,
                consumed: self.stream.consumed(),
            }
            .into());
        }

        let mode = match self.open_policy {
            OpenPolicy::EntireForSingleChunk if self.stream.len() == 1 => SubmitMode::Entire,
            _ => SubmitMode::First,
        };
        let Some((chunk, _)) = self.stream.advance() else {
            return Err(empty_stream(id));
        };

        debug!(lane = %LANE, stream = %id, ?mode, "opening job");
        self.adapter.bind(LANE, id);
        self.adapter.submit(LANE, &chunk, mode)
    }

    fn report<F>(&mut self, lane: LaneId, digest: Digest, on_complete: &mut F) -> Result<(), MbError>
    where
        F: FnMut(Completion),
    {
        check_reportable(&self.stream, self.reported)?;
        self.reported = true;
        self.stats.completions += 1;

        debug!(%lane, %digest, "job complete");
        on_complete(Completion {
            stream: self.stream.id(),
            lane,
            digest,
            consumed: self.stream.consumed(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::stream::StreamId;

    fn driver(chunks: Vec<String>, config: SchedulerConfig) -> SingleStreamDriver {
        SingleStreamDriver::new(StreamCursor::new(StreamId::new(0), chunks), config).unwrap()
    }

    #[test]
    fn test_short_single_chunk_closes_after_loop() {
        let mut driver = driver(vec!["ABC".to_string()], SchedulerConfig::default());
        let completion = driver.run_collect().unwrap();

        assert_eq!(completion.digest, Digest::of(b"ABC"));
        assert_eq!(completion.consumed, 1);
        assert_eq!(driver.stats().finish_closes, 1);
        assert_eq!(driver.stats().drain_closes, 0);
        assert!(driver.stream().is_exhausted());
        assert_eq!(driver.engine().pending_len(), 0);
    }

    #[test]
    fn test_long_stream_closes_in_drain() {
        let chunks: Vec<String> = (0..30).map(|i| ((b'a' + i % 26) as char).to_string()).collect();
        let expected = Digest::of(chunks.concat().as_bytes());
        let config = SchedulerConfig::new(EngineConfig::default().with_block_len(10));

        let mut driver = driver(chunks, config);
        let completion = driver.run_collect().unwrap();

        assert_eq!(completion.digest, expected);
        assert_eq!(driver.stats().finish_closes, 0);
        assert_eq!(driver.stats().drain_closes, 1);
    }

    #[test]
    fn test_entire_policy() {
        let config = SchedulerConfig::default().with_open_policy(OpenPolicy::EntireForSingleChunk);
        let mut driver = driver(vec!["ABC".to_string()], config);
        driver.run_collect().unwrap();

        let stats = driver.stats();
        assert_eq!(stats.finish_closes + stats.drain_closes, 0);
        assert_eq!(stats.submits, 1);
    }

    #[test]
    fn test_partial_stream_is_refused() {
        let stream = StreamCursor::new(StreamId::new(4), ["a", "b"]).resume_at(1).unwrap();
        let mut driver = SingleStreamDriver::new(stream, SchedulerConfig::default()).unwrap();

        let err = driver.run(|_| {}).unwrap_err();
        assert!(matches!(
            err,
            MbError::Protocol(ProtocolViolation::FirstOnPartialStream { stream, consumed: 1 })
                if stream == StreamId::new(4)
        ));
    }
}
