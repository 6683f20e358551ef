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

pub mod chunk;
pub mod decode;
pub mod legacy;
mod loader;
pub mod pos;
mod region;

pub use chunk::{Chunk, Entity, GeneratedStructure, Palette, PaletteEntry, Section};
pub use decode::{ChunkDecoder, DecodeError};
pub use loader::{ChunkLoader, LoadError};
pub use pos::{ChunkGroupPos, ChunkPos, RegionPos, GROUP_SIZE};
pub use region::{Compression, RawChunk, Region, RegionError, RegionFolder};
