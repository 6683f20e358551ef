use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;

use crate::eviction::EvictionKind;

/// Settings for a [`ChunkCache`](crate::ChunkCache).
///
/// ```
/// use overview_cache::{ChunkCacheConfig, EvictionKind};
///
/// let config = ChunkCacheConfig::new("saves/world")
///     .with_workers(2)
///     .with_capacity(512)
///     .with_eviction(EvictionKind::Fifo);
///
/// assert_eq!(config.workers, 2);
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ChunkCacheConfig {
    /// World directory. Region files are read from its `region`
    /// subdirectory.
    pub world: PathBuf,
    /// Number of loader threads. At least one is always started.
    pub workers: usize,
    /// Upper bound on cached chunks. `None` derives it from the available
    /// memory.
    pub capacity: Option<usize>,
    pub eviction: EvictionKind,
    /// Capacity of the event channel. `None` is unbounded. Events that do
    /// not fit into a full bounded channel are dropped.
    pub event_bound: Option<usize>,
}

impl Default for ChunkCacheConfig {
    fn default() -> Self {
        Self {
            world: PathBuf::from("."),
            workers: thread::available_parallelism().map_or(1, NonZeroUsize::get),
            capacity: None,
            eviction: EvictionKind::default(),
            event_bound: None,
        }
    }
}

impl ChunkCacheConfig {
    pub fn new<P: Into<PathBuf>>(world: P) -> Self {
        Self {
            world: world.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    #[must_use]
    pub fn with_eviction(mut self, eviction: EvictionKind) -> Self {
        self.eviction = eviction;
        self
    }

    #[must_use]
    pub fn with_event_bound(mut self, bound: usize) -> Self {
        self.event_bound = Some(bound);
        self
    }
}
