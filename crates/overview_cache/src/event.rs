use overview_anvil::{ChunkPos, GeneratedStructure};

use crate::ChunkHandle;

/// Notifications sent by the chunk workers. Drain them from
/// [`ChunkCache::events`](crate::ChunkCache::events).
#[derive(Debug)]
pub enum CacheEvent {
    /// An attempt to load the chunk at `pos` finished. The cache entry is
    /// already updated when this is received.
    ChunkLoaded {
        pos: ChunkPos,
        status: ChunkLoadStatus,
    },
    /// A structure starting in a freshly loaded chunk. Sent before the
    /// [`CacheEvent::ChunkLoaded`] of that chunk.
    StructureFound(GeneratedStructure),
}

#[derive(Debug)]
pub enum ChunkLoadStatus {
    /// The chunk was loaded and inserted into the cache.
    Success(ChunkHandle),
    /// The world does not have a chunk at the position.
    Empty,
    /// An attempt was made to load the chunk, but something went wrong.
    Failed(anyhow::Error),
}

impl ChunkLoadStatus {
    pub fn success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn chunk(&self) -> Option<&ChunkHandle> {
        match self {
            Self::Success(chunk) => Some(chunk),
            _ => None,
        }
    }
}
