//! Biome definitions keyed by the numeric biome id stored in chunks.
//!
//! Definition files look like
//! `{"biomes": [{"id": 1, "name": "plains", "color": "8db360", "temperature": 0.8, "humidity": 0.4}]}`
//! with optional `water` (a water color modifier) and `alpha` fields.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::debug;

use crate::{Color, RegistryError, LIGHT_LEVELS};

const BUNDLED_BIOMES: &str = include_str!("../data/biomes.json");

/// Corners of the temperature/humidity triangle, see [`BiomeInfo::grass_color`].
const GRASS_CORNERS: [[f64; 3]; 3] = [[191.0, 183.0, 85.0], [128.0, 180.0, 151.0], [71.0, 205.0, 51.0]];
const FOLIAGE_CORNERS: [[f64; 3]; 3] = [[174.0, 164.0, 42.0], [96.0, 161.0, 123.0], [26.0, 191.0, 41.0]];

#[derive(Clone, PartialEq, Debug)]
pub struct BiomeInfo {
    pub id: i32,
    pub name: String,
    /// Map color shaded for each light level.
    pub colors: [Color; LIGHT_LEVELS],
    pub temperature: f64,
    pub humidity: f64,
    pub water_modifier: Option<Color>,
    pub alpha: f64,
}

impl BiomeInfo {
    pub fn new<N: Into<String>>(id: i32, name: N, color: Color) -> Self {
        Self {
            id,
            name: name.into(),
            colors: color.light_levels(),
            temperature: 0.5,
            humidity: 0.5,
            water_modifier: None,
            alpha: 1.0,
        }
    }

    pub fn unknown() -> Self {
        Self::new(-1, "unknown", Color::new(0x80, 0x80, 0x80))
    }

    /// Tints a grass colored block at `elevation` blocks above sea level.
    pub fn grass_color(&self, block: Color, elevation: i32) -> Color {
        self.colorizer(elevation, &GRASS_CORNERS).mix(block)
    }

    /// Tints a foliage colored block at `elevation` blocks above sea level.
    pub fn foliage_color(&self, block: Color, elevation: i32) -> Color {
        self.colorizer(elevation, &FOLIAGE_CORNERS).mix(block)
    }

    pub fn water_color(&self, water: Color) -> Color {
        match self.water_modifier {
            Some(modifier) => modifier.mix(water),
            None => water,
        }
    }

    /// Interpolates the colorizer triangle at the biome's climate. Temperature
    /// drops with elevation.
    fn colorizer(&self, elevation: i32, corners: &[[f64; 3]; 3]) -> Color {
        let elevation = f64::from(elevation.max(0));
        let temperature = (self.temperature - elevation * 0.001_666_67).clamp(0.0, 1.0);
        let humidity = self.humidity.clamp(0.0, 1.0) * temperature;

        let lambda = [temperature - humidity, 1.0 - temperature, humidity];

        let channel = |c: usize| {
            let v: f64 = (0..3).map(|i| lambda[i] * corners[i][c]).sum();
            v.clamp(0.0, 255.0) as u8
        };

        Color::new(channel(0), channel(1), channel(2))
    }
}

/// Lookup table from biome id to [`BiomeInfo`].
#[derive(Clone, Debug)]
pub struct BiomeRegistry {
    biomes: FxHashMap<i32, BiomeInfo>,
    unknown: BiomeInfo,
}

impl Default for BiomeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BiomeRegistry {
    pub fn new() -> Self {
        Self {
            biomes: FxHashMap::default(),
            unknown: BiomeInfo::unknown(),
        }
    }

    /// Creates a registry from the definitions bundled with this crate.
    pub fn bundled() -> Self {
        let mut reg = Self::new();
        // Covered by the `bundled_definitions_parse` test.
        reg.extend_from_json(BUNDLED_BIOMES)
            .expect("bundled biome definitions are valid");
        reg
    }

    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let mut reg = Self::new();
        reg.extend_from_json(json)?;
        Ok(reg)
    }

    pub fn extend_from_json(&mut self, json: &str) -> Result<usize, RegistryError> {
        let file: DefinitionFile = serde_json::from_str(json)?;
        let added = file.biomes.len();

        for def in file.biomes {
            let mut info = BiomeInfo::new(def.id, def.name, def.color);
            info.temperature = def.temperature;
            info.humidity = def.humidity;
            info.water_modifier = def.water;
            info.alpha = def.alpha;
            self.insert(info);
        }

        debug!("loaded {added} biome definitions");

        Ok(added)
    }

    pub fn insert(&mut self, info: BiomeInfo) -> Option<BiomeInfo> {
        self.biomes.insert(info.id, info)
    }

    pub fn get(&self, id: i32) -> Option<&BiomeInfo> {
        self.biomes.get(&id)
    }

    /// Looks up `id`. The absent marker `-1` and unregistered ids resolve to
    /// a neutral placeholder.
    pub fn resolve(&self, id: i32) -> &BiomeInfo {
        self.biomes.get(&id).unwrap_or(&self.unknown)
    }

    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }
}

#[derive(Deserialize)]
struct DefinitionFile {
    #[serde(default)]
    biomes: Vec<BiomeDefinition>,
}

#[derive(Deserialize)]
struct BiomeDefinition {
    id: i32,
    name: String,
    color: Color,
    #[serde(default = "half")]
    temperature: f64,
    #[serde(default = "half")]
    humidity: f64,
    #[serde(default)]
    water: Option<Color>,
    #[serde(default = "one")]
    alpha: f64,
}

fn half() -> f64 {
    0.5
}

fn one() -> f64 {
    1.0
}
