use std::sync::Arc;

use flume::Receiver;
use overview_anvil::{ChunkGroupPos, ChunkPos, GeneratedStructure};
use overview_cache::{CacheEvent, ChunkCache, Lookup, RenderParams, RenderStateCache, Staleness};
use tracing::debug;

use crate::chunk_image::{compose_group, ChunkImage, GroupImage};
use crate::pool::{RenderPool, RenderResult};

/// Answer to a draw request.
#[derive(Clone, Debug)]
pub enum DrawOutcome<I = ChunkImage> {
    /// An image rendered for the requested parameters.
    Ready(Arc<I>),
    /// A load or render is running. The caller is notified through
    /// [`MapRenderer::pump`] and should ask again.
    Pending,
    /// The world has nothing to draw here.
    Placeholder,
}

impl<I> DrawOutcome<I> {
    pub fn image(&self) -> Option<&Arc<I>> {
        match self {
            Self::Ready(image) => Some(image),
            _ => None,
        }
    }
}

/// Something that changed since the previous [`MapRenderer::pump`].
#[derive(Debug)]
pub enum MapUpdate {
    /// Loading the chunk at `pos` finished.
    ChunkLoaded { pos: ChunkPos, success: bool },
    /// A new image of the chunk at `pos` is available.
    ChunkRendered(ChunkPos),
    StructureFound(GeneratedStructure),
}

/// Draws a map from a [`ChunkCache`], rendering chunks in the background.
///
/// The renderer drains the cache's event channel, so nothing else should
/// receive from it.
#[derive(Debug)]
pub struct MapRenderer {
    cache: Arc<ChunkCache>,
    pool: RenderPool,
    chunks: RenderStateCache<ChunkPos, ChunkImage>,
    groups: RenderStateCache<ChunkGroupPos, GroupImage>,
    events: Receiver<CacheEvent>,
    results: Receiver<RenderResult>,
}

impl MapRenderer {
    pub fn new(cache: Arc<ChunkCache>, pool: RenderPool) -> Self {
        Self {
            events: cache.events(),
            results: pool.results(),
            cache,
            pool,
            chunks: RenderStateCache::new(),
            groups: RenderStateCache::new(),
        }
    }

    pub fn cache(&self) -> &Arc<ChunkCache> {
        &self.cache
    }

    pub fn chunk_states(&self) -> &RenderStateCache<ChunkPos, ChunkImage> {
        &self.chunks
    }

    /// Returns the image of the chunk at `pos` if it is rendered for
    /// `params`. Otherwise the chunk is loaded or rendered as needed.
    pub fn draw_chunk(&self, pos: ChunkPos, params: RenderParams) -> DrawOutcome {
        let chunk = match self.cache.lookup(pos) {
            Lookup::Loaded(chunk) => chunk,
            Lookup::Pending => return DrawOutcome::Pending,
            Lookup::Absent | Lookup::Unknown => return DrawOutcome::Placeholder,
        };

        match self.chunks.probe(pos, params) {
            Staleness::Fresh => {
                if let Some(image) = self.chunks.image(pos) {
                    return DrawOutcome::Ready(image);
                }
            }
            Staleness::InFlight => return DrawOutcome::Pending,
            Staleness::Stale | Staleness::Missing => {}
        }

        if self.chunks.request_render(pos, params) && !self.pool.submit(pos, chunk, params) {
            self.chunks.abandon(pos);
            return DrawOutcome::Placeholder;
        }

        DrawOutcome::Pending
    }

    /// Draws all chunks of `group` into one image once every one of them is
    /// rendered for `params`.
    pub fn draw_group(
        &self,
        group: ChunkGroupPos,
        params: RenderParams,
    ) -> DrawOutcome<GroupImage> {
        if self.groups.probe(group, params) == Staleness::Fresh {
            if let Some(image) = self.groups.image(group) {
                return DrawOutcome::Ready(image);
            }
        }

        let mut pending = false;
        let mut any = false;

        for pos in group.chunks() {
            match self.draw_chunk(pos, params) {
                DrawOutcome::Ready(_) => any = true,
                DrawOutcome::Pending => pending = true,
                DrawOutcome::Placeholder => {}
            }
        }

        if pending {
            self.groups.mark_loading(group);
            return DrawOutcome::Pending;
        }

        if !any {
            return DrawOutcome::Placeholder;
        }

        if self.groups.request_render(group, params) {
            let image = compose_group(group, |pos| {
                (self.chunks.probe(pos, params) == Staleness::Fresh)
                    .then(|| self.chunks.image(pos))
                    .flatten()
            });
            self.groups.install(group, params, image);
        }

        match self.groups.image(group) {
            Some(image) => DrawOutcome::Ready(image),
            None => DrawOutcome::Pending,
        }
    }

    /// Handles finished loads and renders. Call this regularly from the
    /// thread that draws.
    pub fn pump(&self) -> Vec<MapUpdate> {
        let mut updates = vec![];

        for event in self.events.try_iter() {
            match event {
                CacheEvent::ChunkLoaded { pos, status } => {
                    self.groups.remove(pos.group());
                    updates.push(MapUpdate::ChunkLoaded {
                        pos,
                        success: status.success(),
                    });
                }
                CacheEvent::StructureFound(structure) => {
                    updates.push(MapUpdate::StructureFound(structure));
                }
            }
        }

        let generation = self.pool.generation();

        for res in self.results.try_iter() {
            if res.generation != generation {
                // Submitted before the last clear.
                continue;
            }

            self.chunks.install(res.pos, res.params, res.image);
            self.groups.remove(res.pos.group());
            updates.push(MapUpdate::ChunkRendered(res.pos));
        }

        updates
    }

    /// Resizes the chunk cache for a view of `width` × `height` blocks.
    pub fn adapt_to_window(&self, width: u32, height: u32) {
        self.cache.adapt_to_window(width, height);
    }

    /// Forgets every chunk and image. Loads and renders started before
    /// are never reported by [`MapRenderer::pump`].
    pub fn clear(&self) {
        // Renders still queued or running finish later and are dropped by
        // `pump`.
        self.pool.invalidate();

        self.cache.clear();
        self.chunks.clear();
        self.groups.clear();

        let events = self.events.try_iter().count();
        let renders = self.results.try_iter().count();
        if events > 0 || renders > 0 {
            debug!("dropped {events} cache events and {renders} renders when clearing the map");
        }
    }
}
