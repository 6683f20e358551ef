use std::collections::BTreeMap;
use std::sync::Arc;

use overview_nbt::Compound;
use overview_registry::{AIR, AIR_HASH};

use crate::pos::ChunkPos;

/// Number of vertical sections in a chunk.
pub const SECTION_COUNT: usize = 16;

/// Number of block cells in a section.
pub const SECTION_VOLUME: usize = 16 * 16 * 16;

/// Number of block columns in a chunk.
pub const COLUMN_COUNT: usize = 16 * 16;

/// Biome id stored for columns without biome data.
pub const NO_BIOME: i32 = -1;

/// A block state as listed in a section palette.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PaletteEntry {
    pub name: String,
    /// Id used for registry lookups, already refined by any registered
    /// property variant.
    pub hash: u32,
    pub properties: BTreeMap<String, String>,
}

impl PaletteEntry {
    pub fn new<N: Into<String>>(name: N, hash: u32) -> Self {
        Self {
            name: name.into(),
            hash,
            properties: BTreeMap::new(),
        }
    }

    pub fn air() -> Self {
        Self::new(AIR, AIR_HASH)
    }
}

/// Palette of a section. Legacy sections all share the palette produced by
/// the flattening table.
pub type Palette = Arc<[PaletteEntry]>;

/// A 16×16×16 cube of blocks.
#[derive(Clone, PartialEq, Debug)]
pub struct Section {
    /// Palette index of every cell, addressed `x + z * 16 + y * 256`.
    pub blocks: Box<[u16; SECTION_VOLUME]>,
    /// Block light, one nibble per cell.
    pub block_light: Box<[u8; SECTION_VOLUME / 2]>,
    pub palette: Palette,
}

impl Section {
    /// A section filled with index 0 of `palette`.
    pub fn new(palette: Palette) -> Self {
        Self {
            blocks: Box::new([0; SECTION_VOLUME]),
            block_light: Box::new([0; SECTION_VOLUME / 2]),
            palette,
        }
    }

    /// Index of the cell at column `offset` (`x + z * 16`) and height `y`.
    /// Only the low four bits of `y` are used.
    pub const fn index(offset: usize, y: i32) -> usize {
        offset + (((y & 0xf) as usize) << 8)
    }

    pub fn palette_entry(&self, x: usize, y: i32, z: usize) -> &PaletteEntry {
        self.palette_entry_at(x + z * 16, y)
    }

    pub fn palette_entry_at(&self, offset: usize, y: i32) -> &PaletteEntry {
        &self.palette[usize::from(self.blocks[Self::index(offset, y)])]
    }

    pub fn block_light(&self, x: usize, y: i32, z: usize) -> u8 {
        self.block_light_at(x + z * 16, y)
    }

    pub fn block_light_at(&self, offset: usize, y: i32) -> u8 {
        nibble(&self.block_light[..], Self::index(offset, y))
    }

    /// Whether any cell holds a non-zero palette index.
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|&b| b == 0)
    }
}

/// Reads the nibble at `idx` from a nibble array. Even indices use the low
/// half of the byte.
pub(crate) fn nibble<T: Copy + Into<i16>>(arr: &[T], idx: usize) -> u8 {
    let byte = Into::<i16>::into(arr[idx / 2]) as u8;
    if idx & 1 == 0 {
        byte & 0xf
    } else {
        byte >> 4
    }
}

/// An entity stored in the chunk.
#[derive(Clone, PartialEq, Debug)]
pub struct Entity {
    pub id: String,
    pub pos: [f64; 3],
    /// The full compound the entity was read from.
    pub data: Compound,
}

/// A structure that starts in a chunk.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GeneratedStructure {
    pub kind: String,
    /// Bounding box as `[min_x, min_y, min_z, max_x, max_y, max_z]`.
    pub bounds: [i32; 6],
}

/// A decoded chunk column.
#[derive(Clone, PartialEq, Debug)]
pub struct Chunk {
    pub pos: ChunkPos,
    pub data_version: i32,
    /// Biome id per column, addressed `x + z * 16`. [`NO_BIOME`] if unknown.
    pub biomes: [i32; COLUMN_COUNT],
    /// Sections for world Y 0..256, bottom up.
    pub sections: [Option<Section>; SECTION_COUNT],
    /// Y of the highest cell holding a non-zero palette index.
    pub highest: i32,
    pub entities: BTreeMap<String, Vec<Entity>>,
    pub structures: Vec<GeneratedStructure>,
    /// Set once decoding completed.
    pub loaded: bool,
}

impl Chunk {
    pub fn new(pos: ChunkPos, data_version: i32) -> Self {
        Self {
            pos,
            data_version,
            biomes: [NO_BIOME; COLUMN_COUNT],
            sections: std::array::from_fn(|_| None),
            highest: 0,
            entities: BTreeMap::new(),
            structures: Vec::new(),
            loaded: false,
        }
    }

    /// The section containing world height `y`.
    pub fn section(&self, y: i32) -> Option<&Section> {
        let idx = usize::try_from(y >> 4).ok()?;
        self.sections.get(idx)?.as_ref()
    }

    pub fn palette_entry(&self, x: usize, y: i32, z: usize) -> Option<&PaletteEntry> {
        Some(self.section(y)?.palette_entry(x, y, z))
    }

    /// Block light at the given cell, 0 where no section is stored.
    pub fn block_light(&self, x: usize, y: i32, z: usize) -> u8 {
        self.section(y).map_or(0, |s| s.block_light(x, y, z))
    }

    pub fn biome(&self, x: usize, z: usize) -> i32 {
        self.biomes[x + z * 16]
    }

    /// Index of the topmost section holding anything but air.
    pub fn highest_non_empty_section(&self) -> Option<usize> {
        self.sections
            .iter()
            .rposition(|s| s.as_ref().is_some_and(|s| !s.is_empty()))
    }

    pub fn entities_of(&self, kind: &str) -> &[Entity] {
        self.entities.get(kind).map_or(&[], Vec::as_slice)
    }

    /// Recomputes [`Chunk::highest`] by scanning sections and cells top down.
    pub(crate) fn update_highest(&mut self) {
        self.highest = 0;

        for (i, section) in self.sections.iter().enumerate().rev() {
            let Some(section) = section else {
                continue;
            };

            if let Some(cell) = section.blocks.iter().rposition(|&b| b != 0) {
                self.highest = (i * 16 + (cell >> 8)) as i32;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> Palette {
        vec![PaletteEntry::air(), PaletteEntry::new("minecraft:stone", 7)].into()
    }

    #[test]
    fn cell_addressing() {
        let mut section = Section::new(palette());
        section.blocks[Section::index(3 + 5 * 16, 18)] = 1;

        assert_eq!(section.palette_entry(3, 2, 5).name, "minecraft:stone");
        assert_eq!(section.palette_entry(3, 18, 5).name, "minecraft:stone");
        assert_eq!(section.palette_entry(5, 2, 3).name, AIR);
    }

    #[test]
    fn light_nibbles() {
        let mut section = Section::new(palette());
        section.block_light[0] = 0xa5;

        assert_eq!(section.block_light(0, 0, 0), 0x5);
        assert_eq!(section.block_light(1, 0, 0), 0xa);
        assert_eq!(section.block_light(2, 0, 0), 0);
    }

    #[test]
    fn highest_scans_top_down() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0), 0);
        chunk.update_highest();
        assert_eq!(chunk.highest, 0);
        assert_eq!(chunk.highest_non_empty_section(), None);

        let mut low = Section::new(palette());
        low.blocks[Section::index(0, 9)] = 1;
        chunk.sections[2] = Some(low);
        // An all-air section above does not count.
        chunk.sections[5] = Some(Section::new(palette()));

        chunk.update_highest();
        assert_eq!(chunk.highest, 2 * 16 + 9);
        assert_eq!(chunk.highest_non_empty_section(), Some(2));
        assert!(chunk.section(-1).is_none());
        assert!(chunk.section(256).is_none());
        assert_eq!(chunk.palette_entry(0, 41, 0).map(|e| e.hash), Some(7));
        assert!(chunk.palette_entry(0, 200, 0).is_none());
    }
}
