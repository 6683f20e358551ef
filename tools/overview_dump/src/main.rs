#![doc = include_str!("../README.md")]
#![deny(
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    rustdoc::missing_crate_level_docs,
    rustdoc::invalid_codeblock_attributes,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::bare_urls,
    rustdoc::invalid_html_tags
)]
#![warn(
    trivial_casts,
    trivial_numeric_casts,
    unused_lifetimes,
    unused_import_braces,
    clippy::dbg_macro
)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, ensure, Context};
use clap::{Parser, ValueEnum};
use image::RgbaImage;
use overview_anvil::ChunkPos;
use overview_cache::{CacheEvent, ChunkCache, ChunkCacheConfig, ChunkLoadStatus, RenderFlags, RenderParams};
use overview_registry::{BiomeRegistry, BlockRegistry};
use overview_render::{ChunkImage, RenderPool, RenderPoolConfig, CHUNK_PIXELS};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Chunks rendered at most. Keeps the output image below 8192² pixels.
const MAX_CHUNKS: usize = 512 * 512;

const TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// World directory containing the `region` folder.
    #[clap(short, long)]
    world: PathBuf,
    /// One corner of the rectangle as `x,z` chunk coordinates.
    #[clap(long, value_parser = parse_chunk_pos, allow_hyphen_values = true)]
    from: ChunkPos,
    /// The opposite corner, inclusive.
    #[clap(long, value_parser = parse_chunk_pos, allow_hyphen_values = true)]
    to: ChunkPos,
    /// Highest block Y drawn.
    #[clap(short, long, default_value_t = 255)]
    depth: i32,
    #[clap(short, long, value_enum, value_delimiter = ',')]
    flags: Vec<Flag>,
    /// Block definitions JSON. Defaults to the bundled definitions.
    #[clap(long)]
    blocks: Option<PathBuf>,
    /// Biome definitions JSON. Defaults to the bundled definitions.
    #[clap(long)]
    biomes: Option<PathBuf>,
    /// Loader and render threads each.
    #[clap(long)]
    workers: Option<usize>,
    /// Output PNG path.
    #[clap(short, long, default_value = "map.png")]
    out: PathBuf,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
enum Flag {
    Lighting,
    MobSpawn,
    CaveMode,
    DepthShading,
    ShowEntities,
    BiomeColors,
}

impl Flag {
    fn bits(self) -> u8 {
        match self {
            Flag::Lighting => RenderFlags::LIGHTING,
            Flag::MobSpawn => RenderFlags::MOB_SPAWN,
            Flag::CaveMode => RenderFlags::CAVE_MODE,
            Flag::DepthShading => RenderFlags::DEPTH_SHADING,
            Flag::ShowEntities => RenderFlags::SHOW_ENTITIES,
            Flag::BiomeColors => RenderFlags::BIOME_COLORS,
        }
    }
}

fn parse_chunk_pos(s: &str) -> Result<ChunkPos, String> {
    let Some((x, z)) = s.split_once(',') else {
        return Err(format!("expected `x,z`, got `{s}`"));
    };

    let x = x.trim().parse().map_err(|e| format!("invalid x: {e}"))?;
    let z = z.trim().parse().map_err(|e| format!("invalid z: {e}"))?;

    Ok(ChunkPos::new(x, z))
}

fn load_blocks(path: Option<&Path>) -> anyhow::Result<BlockRegistry> {
    let Some(path) = path else {
        return Ok(BlockRegistry::bundled());
    };

    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read block definitions from {}", path.display()))?;
    Ok(BlockRegistry::from_json(&json)?)
}

fn load_biomes(path: Option<&Path>) -> anyhow::Result<BiomeRegistry> {
    let Some(path) = path else {
        return Ok(BiomeRegistry::bundled());
    };

    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read biome definitions from {}", path.display()))?;
    Ok(BiomeRegistry::from_json(&json)?)
}

#[derive(Default, Debug)]
struct Summary {
    loaded: usize,
    empty: usize,
    failed: usize,
    structures: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let min = ChunkPos::new(cli.from.x.min(cli.to.x), cli.from.z.min(cli.to.z));
    let max = ChunkPos::new(cli.from.x.max(cli.to.x), cli.from.z.max(cli.to.z));
    let width = (max.x - min.x + 1) as usize;
    let height = (max.z - min.z + 1) as usize;
    let count = width * height;

    ensure!(
        count <= MAX_CHUNKS,
        "rectangle of {width}×{height} chunks is too large"
    );

    let blocks = Arc::new(load_blocks(cli.blocks.as_deref())?);
    let biomes = Arc::new(load_biomes(cli.biomes.as_deref())?);

    let flags = cli.flags.iter().fold(0, |bits, flag| bits | flag.bits());
    let params = RenderParams::new(cli.depth, RenderFlags::from_bits(flags));

    let mut config = ChunkCacheConfig::new(&cli.world).with_capacity(count);
    let mut pool_config = RenderPoolConfig::default();
    if let Some(workers) = cli.workers {
        config = config.with_workers(workers);
        pool_config.workers = workers;
    }

    let cache = ChunkCache::new(config, blocks.clone());
    let pool = RenderPool::new(pool_config, blocks, biomes);
    let events = cache.events();
    let results = pool.results();

    info!(
        "loading {count} chunks from {} with {} workers",
        cli.world.display(),
        cache.workers()
    );

    let start = Instant::now();

    for z in min.z..=max.z {
        for x in min.x..=max.x {
            cache.fetch(ChunkPos::new(x, z));
        }
    }

    let mut summary = Summary::default();
    let mut submitted = 0;

    for _ in 0..count {
        let deadline = Instant::now() + TIMEOUT;

        // Structures come before the load of their chunk.
        loop {
            let Ok(event) = events.recv_deadline(deadline) else {
                bail!("timed out waiting for chunk loads");
            };

            match event {
                CacheEvent::StructureFound(structure) => {
                    debug!("found {} at {:?}", structure.kind, structure.bounds);
                    summary.structures += 1;
                }
                CacheEvent::ChunkLoaded { pos, status } => {
                    match status {
                        ChunkLoadStatus::Success(chunk) => {
                            summary.loaded += 1;
                            if pool.submit(pos, chunk, params) {
                                submitted += 1;
                            }
                        }
                        ChunkLoadStatus::Empty => summary.empty += 1,
                        ChunkLoadStatus::Failed(e) => {
                            warn!("failed to load chunk {pos:?}: {e:#}");
                            summary.failed += 1;
                        }
                    }
                    break;
                }
            }
        }
    }

    info!(
        "loaded {} chunks in {:?}: {} empty, {} failed, {} structures",
        summary.loaded,
        start.elapsed(),
        summary.empty,
        summary.failed,
        summary.structures
    );

    let mut images = HashMap::with_capacity(submitted);
    for _ in 0..submitted {
        let Ok(res) = results.recv_timeout(TIMEOUT) else {
            bail!("timed out waiting for renders");
        };
        images.insert(res.pos, res.image);
    }

    let placeholder = ChunkImage::placeholder();
    let mut out = RgbaImage::new(
        (width * CHUNK_PIXELS) as u32,
        (height * CHUNK_PIXELS) as u32,
    );

    for z in min.z..=max.z {
        for x in min.x..=max.x {
            let pos = ChunkPos::new(x, z);
            let image = images.get(&pos).unwrap_or(&placeholder).to_rgba_image();

            let left = ((x - min.x) as usize * CHUNK_PIXELS) as i64;
            let top = ((z - min.z) as usize * CHUNK_PIXELS) as i64;
            image::imageops::replace(&mut out, &image, left, top);
        }
    }

    out.save(&cli.out)
        .with_context(|| format!("failed to write {}", cli.out.display()))?;

    info!("wrote {} in {:?}", cli.out.display(), start.elapsed());

    Ok(())
}
