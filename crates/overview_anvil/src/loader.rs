use std::path::Path;
use std::sync::Arc;

use overview_registry::BlockRegistry;
use thiserror::Error;

use crate::chunk::Chunk;
use crate::decode::{ChunkDecoder, DecodeError};
use crate::pos::ChunkPos;
use crate::region::{RegionError, RegionFolder};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error(transparent)]
    Region(#[from] RegionError),
    #[error("failed to decode chunk: {0}")]
    Decode(#[from] DecodeError),
}

/// Reads chunks from region files and decodes them.
///
/// A loader is shared between threads. Each thread passes its own
/// [`RegionFolder`] to [`ChunkLoader::load_from`].
#[derive(Debug)]
pub struct ChunkLoader {
    decoder: ChunkDecoder,
}

impl ChunkLoader {
    pub fn new(blocks: Arc<BlockRegistry>) -> Self {
        Self {
            decoder: ChunkDecoder::new(blocks),
        }
    }

    pub fn decoder(&self) -> &ChunkDecoder {
        &self.decoder
    }

    /// Loads the chunk at `pos` from the world at `world_root`.
    ///
    /// Opens the region file for this call only. Use
    /// [`ChunkLoader::load_from`] to keep region files open between loads.
    pub fn load<P: AsRef<Path>>(
        &self,
        world_root: P,
        pos: ChunkPos,
    ) -> Result<Option<Chunk>, LoadError> {
        self.load_from(&mut RegionFolder::for_world(world_root), pos)
    }

    /// Loads the chunk at `pos` through `folder`. Returns `Ok(None)` if the
    /// region file or the chunk does not exist.
    pub fn load_from(
        &self,
        folder: &mut RegionFolder,
        pos: ChunkPos,
    ) -> Result<Option<Chunk>, LoadError> {
        let Some(raw) = folder.get_chunk(pos)? else {
            return Ok(None);
        };

        Ok(Some(self.decoder.decode(&raw.data)?))
    }
}
