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
    unreachable_pub,
    clippy::dbg_macro
)]

#[cfg(feature = "testing")]
pub mod testing;

#[cfg(all(test, feature = "testing"))]
mod tests;

pub use overview_anvil as anvil;
pub use overview_cache as cache;
pub use overview_nbt as nbt;
pub use overview_registry as registry;
#[cfg(feature = "render")]
pub use overview_render as render;

/// Contains the most frequently used items.
///
/// ```
/// use overview::prelude::*;
///
/// let pos = ChunkPos::at(-17, 40);
/// assert_eq!(pos, ChunkPos::new(-2, 2));
/// ```
pub mod prelude {
    pub use overview_anvil::{
        Chunk, ChunkGroupPos, ChunkLoader, ChunkPos, GeneratedStructure, RegionFolder, Section,
    };
    pub use overview_cache::{
        CacheEvent, ChunkCache, ChunkCacheConfig, ChunkHandle, ChunkLoadStatus, EvictionKind,
        FetchBehaviour, Lookup, RenderFlags, RenderParams, RenderStateCache, Staleness,
    };
    pub use overview_registry::{BiomeRegistry, BlockRegistry};
    #[cfg(feature = "render")]
    pub use overview_render::{
        render_chunk, ChunkImage, DrawOutcome, MapRenderer, RenderPool, RenderPoolConfig,
    };
}
