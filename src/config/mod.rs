//! Configuration for the hash engine and the lane scheduler.
//!
//! - [`EngineConfig`] - Batch width and block length of the software engine
//! - [`SchedulerConfig`] - Engine config plus the job opening policy
//! - [`OpenPolicy`] - How a stream's first chunk opens its job

use crate::error::MbError;

/// Default number of in-flight lanes computed together (AVX2 width for 32-bit words).
pub const DEFAULT_BATCH_WIDTH: usize = 8;

/// Largest batch width accepted (AVX-512 width for 32-bit words).
pub const MAX_BATCH_WIDTH: usize = 16;

/// Default block length in bytes.
pub const DEFAULT_BLOCK_LEN: usize = 64;

/// Largest block length accepted.
pub const MAX_BLOCK_LEN: usize = 4096;

/// Configuration for the software batch engine.
///
/// A lane goes in flight once it holds at least one whole block (or its job
/// is being closed), and in-flight lanes are computed together once
/// `batch_width` of them are waiting or a flush asks for progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineConfig {
    batch_width: usize,
    block_len: usize,
}

impl EngineConfig {
    /// Creates a new configuration.
    ///
    /// Returns error if either value is zero or above its maximum.
    pub fn new(batch_width: usize, block_len: usize) -> Result<Self, MbError> {
        if batch_width == 0 || block_len == 0 {
            return Err(MbError::InvalidConfig {
                message: "batch width and block length must be non-zero",
            });
        }

        if batch_width > MAX_BATCH_WIDTH {
            return Err(MbError::InvalidConfig {
                message: "batch width cannot exceed MAX_BATCH_WIDTH",
            });
        }

        if block_len > MAX_BLOCK_LEN {
            return Err(MbError::InvalidConfig {
                message: "block length cannot exceed MAX_BLOCK_LEN",
            });
        }

        Ok(Self {
            batch_width,
            block_len,
        })
    }

    /// Sets the batch width.
    pub fn with_batch_width(mut self, width: usize) -> Self {
        self.batch_width = width;
        self
    }

    /// Sets the block length.
    pub fn with_block_len(mut self, len: usize) -> Self {
        self.block_len = len;
        self
    }

    /// Returns the batch width.
    pub fn batch_width(&self) -> usize {
        self.batch_width
    }

    /// Returns the block length.
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Validates the current configuration.
    pub fn validate(&self) -> Result<(), MbError> {
        Self::new(self.batch_width, self.block_len).map(|_| ())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_width: DEFAULT_BATCH_WIDTH,
            block_len: DEFAULT_BLOCK_LEN,
        }
    }
}

/// How the scheduler opens a stream's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OpenPolicy {
    /// Always open with `First`; single-chunk jobs are closed later by a
    /// zero-length `Last`.
    #[default]
    AlwaysFirst,
    /// Open single-chunk streams with `Entire`, everything else with `First`.
    EntireForSingleChunk,
}

/// Configuration for [`LaneScheduler`](crate::LaneScheduler) and
/// [`SingleStreamDriver`](crate::SingleStreamDriver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SchedulerConfig {
    engine: EngineConfig,
    open_policy: OpenPolicy,
}

impl SchedulerConfig {
    /// Creates a configuration with the given engine settings.
    pub const fn new(engine: EngineConfig) -> Self {
        Self {
            engine,
            open_policy: OpenPolicy::AlwaysFirst,
        }
    }

    /// Sets the engine configuration.
    pub fn with_engine_config(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Sets the open policy.
    pub fn with_open_policy(mut self, policy: OpenPolicy) -> Self {
        self.open_policy = policy;
        self
    }

    /// Returns the engine configuration.
    pub fn engine_config(&self) -> &EngineConfig {
        &self.engine
    }

    /// Returns the open policy.
    pub fn open_policy(&self) -> OpenPolicy {
        self.open_policy
    }
}
