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

mod chunk_image;
mod map;
mod pool;
mod renderer;

pub use chunk_image::{compose_group, ChunkImage, GroupImage, CHUNK_PIXELS, GROUP_PIXELS};
pub use map::{DrawOutcome, MapRenderer, MapUpdate};
pub use pool::{RenderPool, RenderPoolConfig, RenderResult};
pub use renderer::{render_chunk, CAVE_DEPTH};
