//! Block definitions keyed by [`name_hash`](crate::name_hash).
//!
//! A definition file is a JSON object with a `blocks` array:
//!
//! ```json
//! {
//!   "blocks": [
//!     { "id": "minecraft:stone", "color": "7d7d7d" },
//!     {
//!       "id": "minecraft:grass_block",
//!       "color": "7fb238",
//!       "tint": "grass",
//!       "variants": [
//!         { "property": "snowy", "value": "true", "color": "ffffff", "tint": "none" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Every field except `id` is optional. Variants inherit the fields of their
//! block and are registered under the hash of `name:property:value`.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use tracing::debug;

use crate::{name_hash, variant_hash, Color, RegistryError, AIR, AIR_HASH, LIGHT_LEVELS, UNKNOWN};

const BUNDLED_BLOCKS: &str = include_str!("../data/blocks.json");

/// Which biome colorizer, if any, tints a block.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TintKind {
    #[default]
    None,
    Grass,
    Foliage,
    Water,
}

#[derive(Clone, PartialEq, Debug)]
pub struct BlockInfo {
    /// Qualified block name, or variant key.
    pub name: String,
    pub hash: u32,
    /// Opacity from 0 (invisible) to 1 (hides everything below).
    pub alpha: f64,
    pub transparent: bool,
    pub liquid: bool,
    /// Mobs can stand on top of this block.
    pub solid_top: bool,
    pub normal_cube: bool,
    /// Mobs can spawn inside this block.
    pub spawn_inside: bool,
    pub bedrock: bool,
    pub tint: TintKind,
    /// Base color shaded for each light level. Index 15 is the unshaded
    /// color.
    pub colors: [Color; LIGHT_LEVELS],
}

impl BlockInfo {
    /// Creates an opaque, solid block with the given color.
    pub fn new<N: Into<String>>(name: N, color: Color) -> Self {
        let name = name.into();

        Self {
            hash: name_hash(&name),
            bedrock: name == "minecraft:bedrock",
            name,
            alpha: 1.0,
            transparent: false,
            liquid: false,
            solid_top: true,
            normal_cube: true,
            spawn_inside: false,
            tint: TintKind::None,
            colors: color.light_levels(),
        }
    }

    pub fn air() -> Self {
        Self {
            hash: AIR_HASH,
            alpha: 0.0,
            transparent: true,
            solid_top: false,
            normal_cube: false,
            spawn_inside: true,
            ..Self::new(AIR, Color::BLACK)
        }
    }

    /// Placeholder returned for hashes nothing was registered under.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN, Color::MAGENTA)
    }

    /// The unshaded color.
    pub fn color(&self) -> Color {
        self.colors[LIGHT_LEVELS - 1]
    }

    pub fn set_color(&mut self, color: Color) {
        self.colors = color.light_levels();
    }

    pub fn is_air(&self) -> bool {
        self.alpha == 0.0
    }
}

/// Lookup table from block hash to [`BlockInfo`].
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    blocks: FxHashMap<u32, BlockInfo>,
    /// Hashes of base names that have at least one registered variant.
    with_variants: FxHashSet<u32>,
    unknown: BlockInfo,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockRegistry {
    /// Creates a registry containing only air.
    pub fn new() -> Self {
        let mut blocks = FxHashMap::default();
        blocks.insert(AIR_HASH, BlockInfo::air());

        Self {
            blocks,
            with_variants: FxHashSet::default(),
            unknown: BlockInfo::unknown(),
        }
    }

    /// Creates a registry from the definitions bundled with this crate.
    pub fn bundled() -> Self {
        let mut reg = Self::new();
        // Covered by the `bundled_definitions_parse` test.
        reg.extend_from_json(BUNDLED_BLOCKS)
            .expect("bundled block definitions are valid");
        reg
    }

    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let mut reg = Self::new();
        reg.extend_from_json(json)?;
        Ok(reg)
    }

    /// Adds every definition in `json`, replacing existing entries with the
    /// same name. Returns the number of entries added, variants included.
    pub fn extend_from_json(&mut self, json: &str) -> Result<usize, RegistryError> {
        let file: DefinitionFile = serde_json::from_str(json)?;
        let mut added = 0;

        for def in file.blocks {
            let base = def.look.apply(BlockInfo::new(def.id.as_str(), Color::BLACK));

            for variant in &def.variants {
                let mut info = variant.look.apply(base.clone());
                info.name = format!("{}:{}:{}", def.id, variant.property, variant.value);
                self.insert_variant(&def.id, &variant.property, &variant.value, info);
                added += 1;
            }

            self.insert(base);
            added += 1;
        }

        debug!("loaded {added} block definitions");

        Ok(added)
    }

    /// Registers `info` under its own hash.
    pub fn insert(&mut self, info: BlockInfo) -> Option<BlockInfo> {
        self.blocks.insert(info.hash, info)
    }

    /// Registers `info` as the variant of `base` whose property `key` has
    /// `value`.
    pub fn insert_variant(&mut self, base: &str, key: &str, value: &str, mut info: BlockInfo) {
        info.hash = variant_hash(base, key, value);
        self.with_variants.insert(name_hash(base));
        self.blocks.insert(info.hash, info);
    }

    /// Whether the block `hash` has variants that render differently.
    pub fn has_variant(&self, hash: u32) -> bool {
        self.with_variants.contains(&hash)
    }

    pub fn contains(&self, hash: u32) -> bool {
        self.blocks.contains_key(&hash)
    }

    pub fn get(&self, hash: u32) -> Option<&BlockInfo> {
        self.blocks.get(&hash)
    }

    /// Looks up `hash`, falling back to the unknown-block placeholder.
    pub fn resolve(&self, hash: u32) -> &BlockInfo {
        self.blocks.get(&hash).unwrap_or(&self.unknown)
    }

    pub fn unknown(&self) -> &BlockInfo {
        &self.unknown
    }

    /// Computes the lookup hash for a block state.
    ///
    /// If the base name has variants, properties are tried in key order and
    /// the first `name:key:value` that is registered wins.
    pub fn state_hash(&self, name: &str, properties: &BTreeMap<String, String>) -> u32 {
        let hash = name_hash(name);

        if !self.has_variant(hash) {
            return hash;
        }

        properties
            .iter()
            .map(|(key, value)| variant_hash(name, key, value))
            .find(|vhash| self.contains(*vhash))
            .unwrap_or(hash)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[derive(Deserialize)]
struct DefinitionFile {
    #[serde(default)]
    blocks: Vec<BlockDefinition>,
}

#[derive(Deserialize)]
struct BlockDefinition {
    id: String,
    #[serde(flatten)]
    look: Appearance,
    #[serde(default)]
    variants: Vec<VariantDefinition>,
}

#[derive(Deserialize)]
struct VariantDefinition {
    property: String,
    value: String,
    #[serde(flatten)]
    look: Appearance,
}

/// Optional overrides shared by block and variant definitions.
#[derive(Deserialize, Default)]
#[serde(default)]
struct Appearance {
    color: Option<Color>,
    alpha: Option<f64>,
    transparent: Option<bool>,
    liquid: Option<bool>,
    solid_top: Option<bool>,
    normal_cube: Option<bool>,
    spawn_inside: Option<bool>,
    tint: Option<TintKind>,
}

impl Appearance {
    fn apply(&self, mut info: BlockInfo) -> BlockInfo {
        if let Some(color) = self.color {
            info.set_color(color);
        }
        if let Some(alpha) = self.alpha {
            info.alpha = alpha.clamp(0.0, 1.0);
        }
        if let Some(transparent) = self.transparent {
            info.transparent = transparent;
            // Derived defaults follow transparency unless set explicitly.
            info.solid_top = !transparent;
            info.normal_cube = !transparent;
            info.spawn_inside = transparent;
        }
        if let Some(liquid) = self.liquid {
            info.liquid = liquid;
            if liquid {
                info.solid_top = false;
                info.spawn_inside = false;
            }
        }
        if let Some(solid_top) = self.solid_top {
            info.solid_top = solid_top;
        }
        if let Some(normal_cube) = self.normal_cube {
            info.normal_cube = normal_cube;
        }
        if let Some(spawn_inside) = self.spawn_inside {
            info.spawn_inside = spawn_inside;
        }
        if let Some(tint) = self.tint {
            info.tint = tint;
        }
        info
    }
}
