use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use overview_nbt::packed::{self, PackedLayout};
use overview_nbt::{Compound, List, Value};
use overview_registry::BlockRegistry;
use thiserror::Error;

use crate::chunk::{
    nibble, Chunk, Entity, GeneratedStructure, Palette, PaletteEntry, Section, SECTION_COUNT,
    SECTION_VOLUME,
};
use crate::legacy::{self, legacy_index};
use crate::pos::ChunkPos;

/// First DataVersion (1.13) that stores block states with a palette.
pub const PALETTE_DATA_VERSION: i32 = 1519;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("missing {0} field")]
    Missing(&'static str),
    #[error("{0} field has the wrong type")]
    WrongType(&'static str),
    #[error("{field} has length {len}, expected {expected}")]
    BadLength {
        field: &'static str,
        len: usize,
        expected: usize,
    },
    #[error("empty block palette")]
    EmptyPalette,
    #[error("block state array has {found} longs, expected {expected} for {bit_width} bit entries")]
    BadLongCount {
        bit_width: u32,
        expected: usize,
        found: usize,
    },
    #[error("palette index {index} is out of bounds for a palette of {len}")]
    BadPaletteIndex { index: u16, len: usize },
    #[error("failed to unpack block states: {0}")]
    Bits(#[from] overview_nbt::Error),
}

/// Turns chunk compounds into [`Chunk`]s.
///
/// A decoder holds the block registry used to hash palette entries and the
/// palette shared by all legacy sections it decodes, built on first use.
#[derive(Debug)]
pub struct ChunkDecoder {
    blocks: Arc<BlockRegistry>,
    legacy_palette: OnceLock<Palette>,
}

impl ChunkDecoder {
    pub fn new(blocks: Arc<BlockRegistry>) -> Self {
        Self {
            blocks,
            legacy_palette: OnceLock::new(),
        }
    }

    pub fn blocks(&self) -> &Arc<BlockRegistry> {
        &self.blocks
    }

    pub fn legacy_palette(&self) -> &Palette {
        self.legacy_palette
            .get_or_init(|| legacy::flattening_palette(&self.blocks))
    }

    /// Decodes the root compound of a chunk.
    pub fn decode(&self, nbt: &Compound) -> Result<Chunk, DecodeError> {
        let data_version = match nbt.get("DataVersion") {
            Some(v) => v.as_int_like().ok_or(DecodeError::WrongType("DataVersion"))? as i32,
            None => 0,
        };

        // Chunks from 1.18 on keep everything in the root.
        let level = nbt.get_compound("Level").unwrap_or(nbt);

        let x = int_field(level, "xPos")?;
        let z = int_field(level, "zPos")?;

        let mut chunk = Chunk::new(ChunkPos::new(x, z), data_version);

        decode_biomes(level, data_version, &mut chunk.biomes);

        let sections = match level.get("Sections").or_else(|| level.get("sections")) {
            Some(Value::List(list)) => {
                list.as_compounds().ok_or(DecodeError::WrongType("Sections"))?
            }
            Some(_) => return Err(DecodeError::WrongType("Sections")),
            None => &[],
        };

        for section in sections {
            let y = int_field(section, "Y")?;

            // Only sections 0..15 are part of the map.
            let Ok(idx) = usize::try_from(y) else {
                continue;
            };
            if idx >= SECTION_COUNT {
                continue;
            }

            let decoded = if data_version >= PALETTE_DATA_VERSION {
                self.decode_section(section, data_version)?
            } else {
                self.decode_legacy_section(section)?
            };

            chunk.sections[idx] = Some(decoded);
        }

        if data_version >= PALETTE_DATA_VERSION {
            chunk.structures = decode_structures(level);
        }

        chunk.entities = decode_entities(level);
        chunk.update_highest();
        chunk.loaded = true;

        Ok(chunk)
    }

    fn decode_section(
        &self,
        section: &Compound,
        data_version: i32,
    ) -> Result<Section, DecodeError> {
        // 1.18 nests palette and data in a compound.
        let (palette, states) = match section.get_compound("block_states") {
            Some(states) => (states.get("palette"), states.get("data")),
            None => (section.get("Palette"), section.get("BlockStates")),
        };

        let palette: Palette = match palette {
            Some(Value::List(List::Compound(entries))) => entries
                .iter()
                .map(|e| self.palette_entry(e))
                .collect::<Result<Vec<_>, _>>()?
                .into(),
            // An empty list carries the end tag as its element type.
            Some(Value::List(List::End)) => return Err(DecodeError::EmptyPalette),
            Some(_) => return Err(DecodeError::WrongType("Palette")),
            None => vec![PaletteEntry::air()].into(),
        };

        if palette.is_empty() {
            return Err(DecodeError::EmptyPalette);
        }

        let mut out = Section::new(palette);

        match states {
            Some(Value::LongArray(longs)) => {
                unpack_block_states(longs, out.palette.len(), data_version, &mut out.blocks)?
            }
            Some(_) => return Err(DecodeError::WrongType("BlockStates")),
            // A single entry palette needs no data.
            None => {}
        }

        read_block_light(section, &mut out)?;

        Ok(out)
    }

    fn palette_entry(&self, entry: &Compound) -> Result<PaletteEntry, DecodeError> {
        let name = entry.get_string("Name").ok_or(DecodeError::Missing("Name"))?;

        let properties: BTreeMap<String, String> = entry
            .get_compound("Properties")
            .map(|props| {
                props
                    .iter()
                    .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_owned())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(PaletteEntry {
            name: name.to_owned(),
            hash: self.blocks.state_hash(name, &properties),
            properties,
        })
    }

    fn decode_legacy_section(&self, section: &Compound) -> Result<Section, DecodeError> {
        let ids = byte_array(section, "Blocks", SECTION_VOLUME)?;
        let data = byte_array(section, "Data", SECTION_VOLUME / 2)?;
        let add = match section.get("Add") {
            Some(_) => Some(byte_array(section, "Add", SECTION_VOLUME / 2)?),
            None => None,
        };

        let mut out = Section::new(Arc::clone(self.legacy_palette()));

        for (i, slot) in out.blocks.iter_mut().enumerate() {
            let mut id = u16::from(ids[i] as u8);
            if let Some(add) = add {
                id |= u16::from(nibble(add, i)) << 8;
            }

            *slot = legacy_index(id, nibble(data, i));
        }

        read_block_light(section, &mut out)?;

        Ok(out)
    }
}

fn int_field(nbt: &Compound, key: &'static str) -> Result<i32, DecodeError> {
    match nbt.get(key) {
        Some(v) => Ok(v.as_int_like().ok_or(DecodeError::WrongType(key))? as i32),
        None => Err(DecodeError::Missing(key)),
    }
}

fn byte_array<'a>(
    nbt: &'a Compound,
    key: &'static str,
    expected: usize,
) -> Result<&'a [i8], DecodeError> {
    let arr = match nbt.get(key) {
        Some(Value::ByteArray(arr)) => arr,
        Some(_) => return Err(DecodeError::WrongType(key)),
        None => return Err(DecodeError::Missing(key)),
    };

    if arr.len() != expected {
        return Err(DecodeError::BadLength {
            field: key,
            len: arr.len(),
            expected,
        });
    }

    Ok(arr)
}

/// Copies `BlockLight` into `section`. Sections without light data stay
/// dark.
fn read_block_light(nbt: &Compound, section: &mut Section) -> Result<(), DecodeError> {
    if nbt.get("BlockLight").is_none() {
        return Ok(());
    }

    let light = byte_array(nbt, "BlockLight", SECTION_VOLUME / 2)?;
    for (dst, &src) in section.block_light.iter_mut().zip(light) {
        *dst = src as u8;
    }

    Ok(())
}

/// Number of bits per block state index for a palette of `len` entries.
pub const fn block_bit_width(len: usize) -> u32 {
    let bits = usize::BITS - len.saturating_sub(1).leading_zeros();
    if bits < 4 {
        4
    } else {
        bits
    }
}

/// Unpacks a section's block state array into natural cell order, checking
/// every index against the palette.
pub fn unpack_block_states(
    longs: &[i64],
    palette_len: usize,
    data_version: i32,
    out: &mut [u16; SECTION_VOLUME],
) -> Result<(), DecodeError> {
    let bit_width = block_bit_width(palette_len);
    let layout = PackedLayout::for_data_version(data_version);

    let expected = layout.expected_long_count(bit_width, SECTION_VOLUME);
    if longs.len() != expected {
        return Err(DecodeError::BadLongCount {
            bit_width,
            expected,
            found: longs.len(),
        });
    }

    match layout {
        PackedLayout::Spanning => {
            // The reversed byte image yields the values from last to first.
            let stream = packed::longs_to_reversed_bytes(longs);
            for i in 0..SECTION_VOLUME {
                let bit_offset = i * bit_width as usize;
                out[SECTION_VOLUME - 1 - i] =
                    packed::extract_bits(&stream, bit_offset, bit_width)? as u16;
            }
        }
        PackedLayout::Aligned => packed::unpack_aligned(longs, bit_width, out)?,
    }

    if let Some(&index) = out.iter().find(|&&i| usize::from(i) >= palette_len) {
        return Err(DecodeError::BadPaletteIndex {
            index,
            len: palette_len,
        });
    }

    Ok(())
}

fn decode_biomes(level: &Compound, data_version: i32, out: &mut [i32; 256]) {
    match level.get("Biomes") {
        Some(Value::IntArray(ids)) if data_version >= PALETTE_DATA_VERSION => {
            if ids.len() == 1024 {
                // 4×4×4 cells, take the lowest layer.
                for (offset, biome) in out.iter_mut().enumerate() {
                    let (x, z) = (offset % 16, offset / 16);
                    *biome = ids[(z >> 2) * 4 + (x >> 2)];
                }
            } else {
                for (biome, &id) in out.iter_mut().zip(ids) {
                    *biome = id;
                }
            }
        }
        Some(Value::ByteArray(ids)) => {
            for (biome, &id) in out.iter_mut().zip(ids) {
                *biome = i32::from(id as u8);
            }
        }
        _ => {}
    }
}

fn decode_entities(level: &Compound) -> BTreeMap<String, Vec<Entity>> {
    let mut entities: BTreeMap<String, Vec<Entity>> = BTreeMap::new();

    let Some(list) = level.get_list("Entities").and_then(List::as_compounds) else {
        return entities;
    };

    for data in list {
        let Some(id) = data.get_string("id") else {
            continue;
        };
        let Some(&[x, y, z]) = data.get_list("Pos").and_then(List::as_doubles) else {
            continue;
        };

        entities.entry(id.to_owned()).or_default().push(Entity {
            id: id.to_owned(),
            pos: [x, y, z],
            data: data.clone(),
        });
    }

    entities
}

fn decode_structures(level: &Compound) -> Vec<GeneratedStructure> {
    let Some(starts) = level
        .get_compound("Structures")
        .and_then(|s| s.get_compound("Starts"))
    else {
        return vec![];
    };

    starts
        .values()
        .filter_map(Value::as_compound)
        .filter_map(|start| {
            let kind = start.get_string("id")?;
            if kind == "INVALID" {
                return None;
            }

            let bounds: [i32; 6] = start.get_int_array("BB")?.try_into().ok()?;

            Some(GeneratedStructure {
                kind: kind.to_owned(),
                bounds,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests;
