//! Lookup tables describing how blocks and biomes look on the map.
//!
//! Both registries are plain values. Build them once at startup (from the
//! bundled definitions, from JSON files, or by hand) and share them by
//! reference with the decoders and renderers that need them.

use std::hash::Hasher;

use rustc_hash::FxHasher;

pub mod biome;
pub mod block;
mod color;
mod error;

pub use biome::{BiomeInfo, BiomeRegistry};
pub use block::{BlockInfo, BlockRegistry, TintKind};
pub use color::{Color, LIGHT_LEVELS};
pub use error::RegistryError;

/// Name of the block every empty cell holds.
pub const AIR: &str = "minecraft:air";

/// Hash reserved for [`AIR`]. Index 0 of every palette built for legacy
/// chunks resolves to this.
pub const AIR_HASH: u32 = 0;

/// Name of the placeholder for blocks no definition covers.
pub const UNKNOWN: &str = "overview:unknown";

/// Hashes a qualified block name (or a `name:property:value` variant key) to
/// the id used for registry lookups.
///
/// The hash has no random state, so ids agree between threads and runs of
/// the same build. They depend on the target's word size and the
/// `rustc-hash` version, so they must never be written to disk. [`AIR`]
/// always hashes to [`AIR_HASH`], and no other name does.
pub fn name_hash(name: &str) -> u32 {
    if name == AIR {
        return AIR_HASH;
    }

    let mut hasher = FxHasher::default();
    hasher.write(name.as_bytes());
    let hash = hasher.finish();

    match (hash ^ (hash >> 32)) as u32 {
        AIR_HASH => 1,
        h => h,
    }
}

/// Hash of a block variant key `name:key:value`.
pub fn variant_hash(name: &str, key: &str, value: &str) -> u32 {
    name_hash(&format!("{name}:{key}:{value}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn air_is_zero() {
        assert_eq!(name_hash(AIR), AIR_HASH);
        assert_ne!(name_hash("minecraft:stone"), AIR_HASH);
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(name_hash("minecraft:stone"), name_hash("minecraft:stone"));
        assert_ne!(name_hash("minecraft:stone"), name_hash("minecraft:dirt"));
        assert_eq!(
            variant_hash("minecraft:oak_log", "axis", "y"),
            name_hash("minecraft:oak_log:axis:y")
        );
    }

    #[test]
    fn hash_agrees_across_threads() {
        let names = ["minecraft:stone", "minecraft:grass_block:snowy:true", "overview:unknown"];
        let here = names.map(name_hash);
        let there = std::thread::spawn(move || names.map(name_hash)).join().unwrap();

        assert_eq!(here, there);
    }
}
