use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use flume::{Receiver, Sender, TrySendError};
use overview_anvil::{Chunk, ChunkLoader, ChunkPos, LoadError, RegionFolder};
use overview_registry::BlockRegistry;
use parking_lot::{Condvar, Mutex, MutexGuard};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::capacity::{memory_capacity, window_capacity};
use crate::config::ChunkCacheConfig;
use crate::event::{CacheEvent, ChunkLoadStatus};
use crate::eviction::EvictionPolicy;

/// Shared, read-only reference to a decoded chunk.
pub type ChunkHandle = Arc<Chunk>;

/// State of a cache entry.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ChunkState {
    /// Registered, not yet handed to a worker.
    Empty,
    /// Queued or being decoded.
    Loading,
    /// Loading finished. The entry may or may not hold a chunk.
    Cached,
}

/// How [`ChunkCache::fetch_with`] treats the entry of a position.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub enum FetchBehaviour {
    /// Return what is cached, never schedule a load.
    UseCached,
    /// Return what is cached, schedule a load for unknown positions.
    #[default]
    UseCachedOrUpdate,
    /// Drop whatever is cached and load the chunk again.
    ForceUpdate,
}

/// Result of [`ChunkCache::lookup`].
#[derive(Clone, Debug)]
pub enum Lookup {
    Loaded(ChunkHandle),
    /// Loading finished without a chunk.
    Absent,
    /// A load is queued or running.
    Pending,
    /// Nothing is known and no load was scheduled.
    Unknown,
}

impl Lookup {
    pub fn chunk(self) -> Option<ChunkHandle> {
        match self {
            Self::Loaded(chunk) => Some(chunk),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum Entry {
    Empty,
    Loading,
    /// `None` if the world has no chunk there or it failed to load. Such
    /// entries are not retried until they are dropped.
    Cached(Option<ChunkHandle>),
}

/// A chunk load handed to the workers.
#[derive(Debug)]
struct Job {
    pos: ChunkPos,
    generation: u64,
    world: Arc<PathBuf>,
}

#[derive(Debug)]
struct CacheState {
    entries: FxHashMap<ChunkPos, Entry>,
    eviction: Box<dyn EvictionPolicy>,
    /// Incremented whenever the cache is emptied. Jobs from an older
    /// generation are discarded.
    generation: u64,
    world: Arc<PathBuf>,
    /// Jobs queued or running.
    in_flight: usize,
    /// Entries holding a chunk.
    cached: usize,
    /// Working bound on `cached`.
    bound: usize,
    memory_bound: usize,
    scheduled: u64,
}

impl CacheState {
    fn remove(&mut self, pos: ChunkPos) {
        if let Some(Entry::Cached(Some(_))) = self.entries.remove(&pos) {
            self.cached -= 1;
            self.eviction.on_removed(pos);
        }
    }

    fn evict(&mut self) {
        let mut evicted = 0;

        while self.cached > self.bound {
            let Some(victim) = self.eviction.next_victim() else {
                break;
            };

            if let Some(Entry::Cached(Some(_))) = self.entries.get(&victim) {
                self.entries.remove(&victim);
                self.cached -= 1;
                evicted += 1;
            }
        }

        if evicted > 0 {
            debug!("evicted {evicted} chunks, {} still cached", self.cached);
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<CacheState>,
    /// Signalled when `in_flight` drops to zero.
    idle: Condvar,
    loader: ChunkLoader,
    events: Sender<CacheEvent>,
}

/// A concurrent cache of decoded chunks backed by a pool of loader threads.
///
/// [`ChunkCache::fetch`] never blocks on I/O. Unknown positions are handed to
/// the workers and reported through [`ChunkCache::events`] once loaded.
#[derive(Debug)]
pub struct ChunkCache {
    shared: Arc<Shared>,
    jobs: Sender<Job>,
    events: Receiver<CacheEvent>,
    workers: usize,
}

impl ChunkCache {
    pub fn new(config: ChunkCacheConfig, blocks: Arc<BlockRegistry>) -> Self {
        let eviction = config.eviction.build();
        Self::with_policy(config, blocks, eviction)
    }

    /// Creates a cache evicting chunks with a custom policy.
    pub fn with_policy(
        config: ChunkCacheConfig,
        blocks: Arc<BlockRegistry>,
        eviction: Box<dyn EvictionPolicy>,
    ) -> Self {
        let memory_bound = config.capacity.unwrap_or_else(memory_capacity);

        let (job_sender, job_receiver) = flume::unbounded();
        let (event_sender, event_receiver) = match config.event_bound {
            Some(bound) => flume::bounded(bound),
            None => flume::unbounded(),
        };

        let shared = Arc::new(Shared {
            state: Mutex::new(CacheState {
                entries: FxHashMap::default(),
                eviction,
                generation: 0,
                world: Arc::new(config.world),
                in_flight: 0,
                cached: 0,
                bound: memory_bound,
                memory_bound,
                scheduled: 0,
            }),
            idle: Condvar::new(),
            loader: ChunkLoader::new(blocks),
            events: event_sender,
        });

        let workers = config.workers.max(1);
        for id in 0..workers {
            let shared = shared.clone();
            let jobs = job_receiver.clone();
            thread::spawn(move || chunk_worker(id, &shared, &jobs));
        }

        Self {
            shared,
            jobs: job_sender,
            events: event_receiver,
            workers,
        }
    }

    /// Returns the chunk at `pos` if it is cached, scheduling a load if
    /// nothing is known about the position yet.
    ///
    /// Positions that finished loading without a chunk return `None` and
    /// are not scheduled again.
    pub fn fetch(&self, pos: ChunkPos) -> Option<ChunkHandle> {
        self.fetch_with(pos, FetchBehaviour::UseCachedOrUpdate)
    }

    pub fn fetch_with(&self, pos: ChunkPos, behaviour: FetchBehaviour) -> Option<ChunkHandle> {
        self.lookup_with(pos, behaviour).chunk()
    }

    /// Like [`ChunkCache::fetch`], but tells positions without a chunk
    /// apart from those still loading.
    pub fn lookup(&self, pos: ChunkPos) -> Lookup {
        self.lookup_with(pos, FetchBehaviour::UseCachedOrUpdate)
    }

    pub fn lookup_with(&self, pos: ChunkPos, behaviour: FetchBehaviour) -> Lookup {
        let mut state = self.shared.state.lock();

        match state.entries.get(&pos) {
            Some(Entry::Cached(Some(handle))) if behaviour != FetchBehaviour::ForceUpdate => {
                let handle = handle.clone();
                state.eviction.on_access(pos);
                return Lookup::Loaded(handle);
            }
            Some(Entry::Cached(None)) if behaviour != FetchBehaviour::ForceUpdate => {
                return Lookup::Absent;
            }
            Some(Entry::Cached(_)) => state.remove(pos),
            Some(Entry::Empty | Entry::Loading) => return Lookup::Pending,
            None => {}
        }

        if behaviour == FetchBehaviour::UseCached {
            return Lookup::Unknown;
        }

        self.schedule(&mut state, pos);

        if state.entries.contains_key(&pos) {
            Lookup::Pending
        } else {
            Lookup::Unknown
        }
    }

    fn schedule(&self, state: &mut CacheState, pos: ChunkPos) {
        state.entries.insert(pos, Entry::Empty);

        let job = Job {
            pos,
            generation: state.generation,
            world: state.world.clone(),
        };

        if self.jobs.send(job).is_err() {
            // Only happens if every worker panicked.
            warn!("no chunk workers left, dropping load of {pos:?}");
            state.entries.remove(&pos);
            return;
        }

        state.entries.insert(pos, Entry::Loading);
        state.in_flight += 1;
        state.scheduled += 1;
    }

    /// Returns the chunk at `pos` if it is cached. Never schedules a load.
    pub fn is_loaded(&self, pos: ChunkPos) -> Option<ChunkHandle> {
        match self.shared.state.lock().entries.get(&pos) {
            Some(Entry::Cached(handle)) => handle.clone(),
            _ => None,
        }
    }

    /// Whether the cache has an entry for `pos`, in any state.
    pub fn is_cached(&self, pos: ChunkPos) -> bool {
        self.shared.state.lock().entries.contains_key(&pos)
    }

    pub fn state(&self, pos: ChunkPos) -> Option<ChunkState> {
        self.shared
            .state
            .lock()
            .entries
            .get(&pos)
            .map(|entry| match entry {
                Entry::Empty => ChunkState::Empty,
                Entry::Loading => ChunkState::Loading,
                Entry::Cached(_) => ChunkState::Cached,
            })
    }

    /// Waits for all loads in flight, then drops every entry.
    ///
    /// Consumers keep the handles they already hold.
    pub fn clear(&self) {
        let mut state = self.shared.state.lock();
        self.clear_locked(&mut state);
    }

    /// Changes the world read by loads scheduled from now on.
    ///
    /// Entries already cached are kept. Call [`ChunkCache::clear`] first
    /// when switching to a different world.
    pub fn set_path<P: Into<PathBuf>>(&self, world: P) {
        let world = world.into();
        debug!("chunk cache now reads {}", world.display());
        self.shared.state.lock().world = Arc::new(world);
    }

    /// Clears the cache and switches to `world` without letting a load
    /// of the old world slip in between.
    pub fn switch_world<P: Into<PathBuf>>(&self, world: P) {
        let world = world.into();
        let mut state = self.shared.state.lock();

        self.clear_locked(&mut state);
        debug!("chunk cache now reads {}", world.display());
        state.world = Arc::new(world);
    }

    fn clear_locked(&self, state: &mut MutexGuard<'_, CacheState>) {
        self.wait_idle_locked(state);

        let dropped = state.entries.len();
        state.generation += 1;
        state.entries.clear();
        state.eviction.clear();
        state.cached = 0;

        debug!("cleared {dropped} chunk cache entries");
    }

    pub fn path(&self) -> PathBuf {
        self.shared.state.lock().world.as_ref().clone()
    }

    /// Blocks until no load is queued or running.
    pub fn wait_idle(&self) {
        let mut state = self.shared.state.lock();
        self.wait_idle_locked(&mut state);
    }

    fn wait_idle_locked(&self, state: &mut MutexGuard<'_, CacheState>) {
        while state.in_flight > 0 {
            self.shared.idle.wait(state);
        }
    }

    /// Number of entries in any state.
    pub fn len(&self) -> usize {
        self.shared.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries holding a chunk.
    pub fn cached_chunks(&self) -> usize {
        self.shared.state.lock().cached
    }

    /// Current bound on the number of cached chunks.
    pub fn capacity(&self) -> usize {
        self.shared.state.lock().bound
    }

    /// Bound derived from memory (or the configured capacity).
    pub fn memory_capacity(&self) -> usize {
        self.shared.state.lock().memory_bound
    }

    /// Resizes the working bound for a view of `width` × `height` blocks.
    pub fn adapt_to_window(&self, width: u32, height: u32) {
        let mut state = self.shared.state.lock();
        state.bound = window_capacity(width, height, state.memory_bound);
        state.evict();
    }

    /// Receiver of load notifications. All receivers share one queue.
    pub fn events(&self) -> Receiver<CacheEvent> {
        self.events.clone()
    }

    /// Number of loads handed to the workers so far.
    pub fn scheduled_jobs(&self) -> u64 {
        self.shared.state.lock().scheduled
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Shared {
    fn complete(&self, job: Job, res: Result<Option<Chunk>, LoadError>) {
        let status = match res {
            Ok(Some(chunk)) => ChunkLoadStatus::Success(Arc::new(chunk)),
            Ok(None) => ChunkLoadStatus::Empty,
            Err(e) => {
                warn!("failed to load chunk at {:?}: {e:#}", job.pos);
                ChunkLoadStatus::Failed(e.into())
            }
        };

        let mut state = self.state.lock();

        let current = state.generation == job.generation
            && matches!(state.entries.get(&job.pos), Some(Entry::Loading));

        if current {
            let handle = status.chunk().cloned();
            let has_chunk = handle.is_some();

            state.entries.insert(job.pos, Entry::Cached(handle));

            if has_chunk {
                state.cached += 1;
                state.eviction.on_cached(job.pos);
                state.evict();
            }
        }

        drop(state);

        if current {
            if let ChunkLoadStatus::Success(chunk) = &status {
                for structure in &chunk.structures {
                    self.notify(CacheEvent::StructureFound(structure.clone()));
                }
            }

            self.notify(CacheEvent::ChunkLoaded {
                pos: job.pos,
                status,
            });
        }

        // A job stays in flight until its events are sent.
        let mut state = self.state.lock();
        state.in_flight -= 1;
        if state.in_flight == 0 {
            self.idle.notify_all();
        }
    }

    /// Sends `event` without waiting for room in a bounded channel. Workers
    /// must keep draining the job queue even if nobody receives events.
    fn notify(&self, event: CacheEvent) {
        match self.events.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(CacheEvent::ChunkLoaded { pos, .. })) => {
                warn!("event channel is full, dropping load notification of {pos:?}");
            }
            Err(TrySendError::Full(CacheEvent::StructureFound(structure))) => {
                warn!("event channel is full, dropping {} structure", structure.kind);
            }
        }
    }
}

fn chunk_worker(id: usize, shared: &Shared, jobs: &Receiver<Job>) {
    debug!("chunk worker {id} started");

    let mut folder: Option<(Arc<PathBuf>, RegionFolder)> = None;

    while let Ok(job) = jobs.recv() {
        // Region files are reopened when the world changes.
        if folder.as_ref().map_or(true, |(world, _)| world != &job.world) {
            folder = Some((
                job.world.clone(),
                RegionFolder::for_world(job.world.as_path()),
            ));
        }

        let res = match &mut folder {
            Some((_, regions)) => shared.loader.load_from(regions, job.pos),
            None => Ok(None),
        };

        shared.complete(job, res);
    }

    debug!("chunk worker {id} stopped");
}
