use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use flume::{Receiver, Sender};
use overview_anvil::ChunkPos;
use overview_cache::{ChunkHandle, RenderParams};
use overview_registry::{BiomeRegistry, BlockRegistry};
use tracing::{debug, warn};

use crate::chunk_image::ChunkImage;
use crate::renderer::render_chunk;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RenderPoolConfig {
    /// Number of render threads. At least one is always started.
    pub workers: usize,
}

impl Default for RenderPoolConfig {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().map_or(1, NonZeroUsize::get),
        }
    }
}

#[derive(Debug)]
struct RenderJob {
    pos: ChunkPos,
    chunk: ChunkHandle,
    params: RenderParams,
    generation: u64,
}

/// A finished render.
#[derive(Debug)]
pub struct RenderResult {
    pub pos: ChunkPos,
    /// The parameters the image was rendered for.
    pub params: RenderParams,
    /// [`RenderPool::generation`] at the time the render was submitted.
    pub generation: u64,
    pub image: ChunkImage,
}

/// Renders chunks on background threads.
#[derive(Debug)]
pub struct RenderPool {
    jobs: Sender<RenderJob>,
    results: Receiver<RenderResult>,
    generation: AtomicU64,
    workers: usize,
}

impl RenderPool {
    pub fn new(
        config: RenderPoolConfig,
        blocks: Arc<BlockRegistry>,
        biomes: Arc<BiomeRegistry>,
    ) -> Self {
        let (job_sender, job_receiver) = flume::unbounded::<RenderJob>();
        let (result_sender, result_receiver) = flume::unbounded();

        let workers = config.workers.max(1);
        for id in 0..workers {
            let jobs = job_receiver.clone();
            let results = result_sender.clone();
            let blocks = blocks.clone();
            let biomes = biomes.clone();

            thread::spawn(move || {
                debug!("render worker {id} started");

                while let Ok(job) = jobs.recv() {
                    let image = render_chunk(&job.chunk, job.params, &blocks, &biomes);

                    let res = RenderResult {
                        pos: job.pos,
                        params: job.params,
                        generation: job.generation,
                        image,
                    };

                    if results.send(res).is_err() {
                        break;
                    }
                }

                debug!("render worker {id} stopped");
            });
        }

        Self {
            jobs: job_sender,
            results: result_receiver,
            generation: AtomicU64::new(0),
            workers,
        }
    }

    /// Queues a render of `chunk`. Returns `false` if no worker is left to
    /// run it.
    pub fn submit(&self, pos: ChunkPos, chunk: ChunkHandle, params: RenderParams) -> bool {
        let job = RenderJob {
            pos,
            chunk,
            params,
            generation: self.generation(),
        };

        if self.jobs.send(job).is_err() {
            warn!("no render workers left, dropping render of {pos:?}");
            return false;
        }

        true
    }

    /// Generation stamped on renders submitted from now on.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Marks every render submitted so far as outdated. Their results still
    /// arrive but carry an older [`generation`](Self::generation).
    pub fn invalidate(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Receiver of finished renders. All receivers share one queue.
    pub fn results(&self) -> Receiver<RenderResult> {
        self.results.clone()
    }

    /// Number of queued renders not yet picked up by a worker.
    pub fn queued(&self) -> usize {
        self.jobs.len()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}
