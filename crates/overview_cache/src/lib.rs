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

mod cache;
pub mod capacity;
mod config;
mod event;
pub mod eviction;
pub mod render_state;

pub use cache::{ChunkCache, ChunkHandle, ChunkState, FetchBehaviour, Lookup};
pub use config::ChunkCacheConfig;
pub use event::{CacheEvent, ChunkLoadStatus};
pub use eviction::{EvictionKind, EvictionPolicy};
pub use render_state::{RenderFlags, RenderParams, RenderStateCache, RenderStatus, Staleness};
