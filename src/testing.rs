//! Helpers for writing throwaway worlds in tests.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};
use std::{fs, thread};

use flate2::write::{GzEncoder, ZlibEncoder};
use overview_anvil::{ChunkPos, Compression, RegionPos};
use overview_cache::{CacheEvent, ChunkCache};
use overview_nbt::{compound, Compound, List};
use tempfile::TempDir;

const SECTOR_SIZE: usize = 4096;

/// How long [`wait_for_loads`] waits before giving up.
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(10);

enum StoredChunk {
    /// Compression scheme id and the compressed chunk.
    Payload(u8, Vec<u8>),
    /// A location table entry with nothing behind it.
    Location(u32),
}

/// A world directory in a temporary folder. Region files are written by
/// [`TestWorld::write`].
pub struct TestWorld {
    dir: TempDir,
    regions: BTreeMap<RegionPos, Vec<(ChunkPos, StoredChunk)>>,
}

impl TestWorld {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
            regions: BTreeMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Stores `nbt` as the chunk at `pos`.
    pub fn insert(
        &mut self,
        pos: ChunkPos,
        nbt: &Compound,
        compression: Compression,
    ) -> io::Result<&mut Self> {
        let mut raw = vec![];
        overview_nbt::to_binary(nbt, &mut raw, "").map_err(io::Error::other)?;

        let (scheme, payload) = match compression {
            Compression::Gzip => {
                let mut z = GzEncoder::new(vec![], flate2::Compression::default());
                z.write_all(&raw)?;
                (1, z.finish()?)
            }
            Compression::Zlib => {
                let mut z = ZlibEncoder::new(vec![], flate2::Compression::default());
                z.write_all(&raw)?;
                (2, z.finish()?)
            }
            _ => (3, raw),
        };

        self.push(pos, StoredChunk::Payload(scheme, payload));
        Ok(self)
    }

    /// Writes a raw location table entry for `pos`, e.g. one pointing at
    /// sector 0.
    pub fn insert_location(&mut self, pos: ChunkPos, location: u32) -> &mut Self {
        self.push(pos, StoredChunk::Location(location));
        self
    }

    fn push(&mut self, pos: ChunkPos, chunk: StoredChunk) {
        self.regions
            .entry(pos.region())
            .or_default()
            .push((pos, chunk));
    }

    /// Writes every region file touched so far.
    pub fn write(&self) -> io::Result<()> {
        let region_dir = self.path().join("region");
        fs::create_dir_all(&region_dir)?;

        for (region, chunks) in &self.regions {
            let mut file = vec![0; SECTOR_SIZE * 2];

            for (pos, chunk) in chunks {
                let idx = (pos.x.rem_euclid(32) + pos.z.rem_euclid(32) * 32) as usize * 4;

                let location = match chunk {
                    StoredChunk::Location(location) => *location,
                    StoredChunk::Payload(scheme, payload) => {
                        let offset = file.len() / SECTOR_SIZE;

                        file.extend_from_slice(&(payload.len() as u32 + 1).to_be_bytes());
                        file.push(*scheme);
                        file.extend_from_slice(payload);
                        file.resize(file.len().div_ceil(SECTOR_SIZE) * SECTOR_SIZE, 0);

                        let count = file.len() / SECTOR_SIZE - offset;
                        (offset as u32) << 8 | count as u32
                    }
                };

                file[idx..idx + 4].copy_from_slice(&location.to_be_bytes());
            }

            fs::write(region_dir.join(region.file_name()), file)?;
        }

        Ok(())
    }
}

/// A 1.13+ chunk whose section `section_y` is filled with `block`.
pub fn filled_chunk(pos: ChunkPos, data_version: i32, section_y: i8, block: &str) -> Compound {
    // Four bits per index, index 1 everywhere. Both packed layouts agree on
    // this array.
    let states = vec![0x1111_1111_1111_1111_i64; 256];

    compound! {
        "DataVersion" => data_version,
        "Level" => compound! {
            "xPos" => pos.x,
            "zPos" => pos.z,
            "Sections" => List::Compound(vec![compound! {
                "Y" => section_y,
                "Palette" => List::Compound(vec![
                    compound! { "Name" => "minecraft:air" },
                    compound! { "Name" => block },
                ]),
                "BlockStates" => states,
            }]),
        },
    }
}

/// Receives `count` load notifications from `cache`. Structure
/// notifications are returned too but not counted.
pub fn wait_for_loads(cache: &ChunkCache, count: usize) -> Vec<CacheEvent> {
    let events = cache.events();
    let deadline = Instant::now() + LOAD_TIMEOUT;

    let mut received = vec![];
    let mut loads = 0;

    while loads < count {
        let Ok(event) = events.recv_deadline(deadline) else {
            panic!("received {loads} of {count} loads before timing out");
        };

        if matches!(event, CacheEvent::ChunkLoaded { .. }) {
            loads += 1;
        }
        received.push(event);
    }

    received
}

/// Sleeps until `f` returns `true` or [`LOAD_TIMEOUT`] passes.
pub fn wait_until<F: FnMut() -> bool>(mut f: F) -> bool {
    let deadline = Instant::now() + LOAD_TIMEOUT;

    while !f() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(2));
    }

    true
}
