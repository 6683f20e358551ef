use std::fs::{DirEntry, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ReadBytesExt};
use flate2::bufread::{GzDecoder, ZlibDecoder};
use lru::LruCache;
use overview_nbt::Compound;
use thiserror::Error;
use tracing::{trace, warn};

use crate::pos::{ChunkPos, RegionPos};

const LRU_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(64) {
    Some(n) => n,
    None => unreachable!(),
};

const SECTOR_SIZE: usize = 4096;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegionError {
    #[error("an I/O error occurred: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to convert OsString")]
    OsStringConv,
    #[error("chunk is allocated, but stream is missing")]
    MissingChunkStream,
    #[error("invalid chunk sector offset")]
    InvalidChunkSectorOffset,
    #[error("invalid chunk size")]
    InvalidChunkSize,
    #[error("invalid compression scheme number of {0}")]
    InvalidCompressionScheme(u8),
    #[error("failed to parse NBT: {0}")]
    Nbt(#[from] overview_nbt::Error),
    #[error("not all chunk NBT data was read")]
    TrailingNbtData,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
#[non_exhaustive]
pub enum Compression {
    Gzip = 1,
    #[default]
    Zlib = 2,
    None = 3,
}

impl Compression {
    pub fn from_u8(compression: u8) -> Option<Compression> {
        match compression {
            1 => Some(Compression::Gzip),
            2 => Some(Compression::Zlib),
            3 => Some(Compression::None),
            _ => None,
        }
    }
}

/// Read-only access to the region files of one world.
#[derive(Debug)]
pub struct RegionFolder {
    /// Region files. An LRU cache is used to limit the number of open file
    /// handles.
    regions: LruCache<RegionPos, RegionEntry>,
    /// Path to the "region" subdirectory in the world root.
    region_root: PathBuf,
    /// Scratch buffer for decompression.
    decompress_buf: Vec<u8>,
}

impl RegionFolder {
    pub fn new<P: Into<PathBuf>>(region_root: P) -> Self {
        Self {
            regions: LruCache::new(LRU_CACHE_SIZE),
            region_root: region_root.into(),
            decompress_buf: Vec::new(),
        }
    }

    /// Opens the `region` directory of the world at `world_root`.
    pub fn for_world<P: AsRef<Path>>(world_root: P) -> Self {
        Self::new(world_root.as_ref().join("region"))
    }

    pub fn region_root(&self) -> &Path {
        &self.region_root
    }

    fn get_region<'a>(
        regions: &'a mut LruCache<RegionPos, RegionEntry>,
        region_root: &Path,
        pos: RegionPos,
    ) -> Result<Option<&'a mut Region>, RegionError> {
        // Need to double get the entry from the cache to make the borrow checker happy.
        if regions.get_mut(&pos).is_some() {
            match regions.get_mut(&pos) {
                Some(RegionEntry::Occupied(region)) => return Ok(Some(region)),
                Some(RegionEntry::Vacant) => return Ok(None),
                None => unreachable!(),
            }
        }

        let path = region_root.join(pos.file_name());

        let entry = match Region::open(&path) {
            Ok(region) => RegionEntry::Occupied(Box::new(region)),
            Err(RegionError::Io(e)) if e.kind() == ErrorKind::NotFound => RegionEntry::Vacant,
            Err(e) => {
                warn!("failed to open region file {}: {e}", path.display());
                return Err(e);
            }
        };

        if let Some((evicted, _)) = regions.push(pos, entry) {
            if evicted != pos {
                trace!("closed region file {}", evicted.file_name());
            }
        }

        match regions.get_mut(&pos) {
            Some(RegionEntry::Occupied(region)) => Ok(Some(region)),
            _ => Ok(None),
        }
    }

    /// Gets the region file at `pos`, opening it if necessary. Returns
    /// `Ok(None)` if the file does not exist.
    pub fn region(&mut self, pos: RegionPos) -> Result<Option<&mut Region>, RegionError> {
        Self::get_region(&mut self.regions, &self.region_root, pos)
    }

    /// Gets the raw chunk at the given chunk position.
    ///
    /// Returns `Ok(Some(chunk))` if the chunk exists and no errors occurred
    /// loading it. Returns `Ok(None)` if the chunk does not exist and no
    /// errors occurred attempting to load it. Returns `Err(_)` if an error
    /// occurred attempting to load the chunk.
    pub fn get_chunk(&mut self, pos: ChunkPos) -> Result<Option<RawChunk>, RegionError> {
        let Some(region) = Self::get_region(&mut self.regions, &self.region_root, pos.region())?
        else {
            return Ok(None);
        };

        region.get_chunk(pos, &mut self.decompress_buf, &self.region_root)
    }

    /// Forgets every open region file. Files are reopened on the next access.
    pub fn close_all(&mut self) {
        self.regions.clear();
    }

    /// Returns an iterator over all existing chunks in all regions.
    pub fn iter_chunks(
        &mut self,
    ) -> Result<impl Iterator<Item = Result<ChunkPos, RegionError>> + '_, RegionError> {
        fn get_region_coordinates(
            file: std::io::Result<DirEntry>,
        ) -> Result<Option<RegionPos>, RegionError> {
            let file = file?;

            if !file.file_type()?.is_file() {
                return Ok(None);
            }

            let Ok(file_name) = file.file_name().into_string() else {
                return Err(RegionError::OsStringConv);
            };

            // read the file name as r.x.z.mca
            let mut split = file_name.splitn(4, '.');
            if split.next() != Some("r") {
                return Ok(None);
            }
            let Some(Ok(x)) = split.next().map(str::parse) else {
                return Ok(None);
            };
            let Some(Ok(z)) = split.next().map(str::parse) else {
                return Ok(None);
            };
            if split.next() != Some("mca") {
                return Ok(None);
            }

            Ok(Some(RegionPos::new(x, z)))
        }

        fn get_region_chunks(
            this: &mut RegionFolder,
            pos: Result<RegionPos, RegionError>,
        ) -> Vec<Result<ChunkPos, RegionError>> {
            let pos = match pos {
                Ok(pos) => pos,
                Err(e) => return vec![Err(e)],
            };

            match this.region(pos) {
                Ok(Some(region)) => region.chunks(pos).map(Ok).collect(),
                Ok(None) => vec![],
                Err(e) => vec![Err(e)],
            }
        }

        Ok(std::fs::read_dir(&self.region_root)?
            .filter_map(|file| get_region_coordinates(file).transpose())
            .flat_map(|pos| get_region_chunks(self, pos)))
    }
}

/// A chunk represented by the raw compound data.
#[derive(Clone, PartialEq, Debug)]
pub struct RawChunk {
    pub data: Compound,
    pub timestamp: u32,
}

#[derive(Debug)]
enum RegionEntry {
    /// There is a region file loaded here.
    Occupied(Box<Region>),
    /// There is no region file at this position. Don't try to read it from the
    /// filesystem again.
    Vacant,
}

/// An open region file and its header.
#[derive(Debug)]
pub struct Region {
    file: File,
    /// The first 8 KiB in the file: chunk locations, then timestamps.
    header: [u8; SECTOR_SIZE * 2],
}

impl Region {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RegionError> {
        let mut file = File::open(path)?;

        let mut header = [0; SECTOR_SIZE * 2];
        file.read_exact(&mut header)?;

        Ok(Self { file, header })
    }

    fn location(&self, pos: ChunkPos) -> u32 {
        let idx = pos.region_index() * 4;
        u32::from_be_bytes([
            self.header[idx],
            self.header[idx + 1],
            self.header[idx + 2],
            self.header[idx + 3],
        ])
    }

    /// Last modification time of the chunk at `pos` in seconds since the
    /// epoch, or `None` if the chunk is not stored in this region.
    pub fn chunk_timestamp(&self, pos: ChunkPos) -> Option<u32> {
        if self.location(pos) == 0 {
            return None;
        }

        let idx = SECTOR_SIZE + pos.region_index() * 4;
        Some(u32::from_be_bytes([
            self.header[idx],
            self.header[idx + 1],
            self.header[idx + 2],
            self.header[idx + 3],
        ]))
    }

    /// Positions of the chunks stored in this region, which lives at `pos`.
    pub fn chunks(&self, pos: RegionPos) -> impl Iterator<Item = ChunkPos> + '_ {
        self.header[..SECTOR_SIZE]
            .chunks_exact(4)
            .enumerate()
            .filter(|(_, location_bytes)| location_bytes.iter().any(|&b| b != 0))
            .map(move |(index, _)| pos.chunk_at(index))
    }

    fn get_chunk(
        &mut self,
        pos: ChunkPos,
        decompress_buf: &mut Vec<u8>,
        region_root: &Path,
    ) -> Result<Option<RawChunk>, RegionError> {
        let location_bytes = self.location(pos);

        if location_bytes == 0 {
            // No chunk exists at this position.
            return Ok(None);
        }

        let timestamp = self.chunk_timestamp(pos).unwrap_or(0);

        let sector_offset = u64::from(location_bytes >> 8);
        let sector_count = (location_bytes & 0xff) as usize;

        // If the sector offset was <2, then the chunk data would be inside the region
        // header. That doesn't make any sense.
        if sector_offset < 2 {
            return Err(RegionError::InvalidChunkSectorOffset);
        }

        // Seek to the beginning of the chunk's data.
        self.file
            .seek(SeekFrom::Start(sector_offset * SECTOR_SIZE as u64))?;

        let exact_chunk_size = self.file.read_u32::<BigEndian>()? as usize;
        if exact_chunk_size == 0 {
            return Err(RegionError::MissingChunkStream);
        }

        // size of this chunk in sectors must always be >= the exact size.
        if sector_count * SECTOR_SIZE < exact_chunk_size {
            return Err(RegionError::InvalidChunkSize);
        }

        let mut compression = self.file.read_u8()?;

        let data_buf = if compression & 0x80 != 0 {
            compression &= !0x80;
            let path = region_root.join(format!("c.{}.{}.mcc", pos.x, pos.z));
            let mut external_file = File::open(path)?;
            let mut buf = Vec::with_capacity(external_file.metadata()?.len() as usize);
            external_file.read_to_end(&mut buf)?;
            buf.into_boxed_slice()
        } else {
            // the size includes the version of the stream, but we have already read that
            let mut data_buf = vec![0; exact_chunk_size - 1].into_boxed_slice();
            self.file.read_exact(&mut data_buf)?;
            data_buf
        };

        let r = data_buf.as_ref();

        decompress_buf.clear();

        // What compression does the chunk use?
        let mut nbt_slice = match Compression::from_u8(compression) {
            Some(Compression::Gzip) => {
                let mut z = GzDecoder::new(r);
                z.read_to_end(decompress_buf)?;
                decompress_buf.as_slice()
            }
            Some(Compression::Zlib) => {
                let mut z = ZlibDecoder::new(r);
                z.read_to_end(decompress_buf)?;
                decompress_buf.as_slice()
            }
            // Uncompressed
            Some(Compression::None) => r,
            // Unknown
            None => return Err(RegionError::InvalidCompressionScheme(compression)),
        };

        let (data, _) = overview_nbt::from_binary(&mut nbt_slice)?;

        if !nbt_slice.is_empty() {
            return Err(RegionError::TrailingNbtData);
        }

        Ok(Some(RawChunk { data, timestamp }))
    }
}
