use overview_nbt::packed::{extract_bits, longs_to_reversed_bytes};
use overview_nbt::{compound, List};
use overview_registry::{name_hash, BlockInfo, Color, AIR, UNKNOWN};

use super::*;
use crate::chunk::NO_BIOME;
use crate::legacy::legacy_index;

const SPANNING_VERSION: i32 = 1976;
const ALIGNED_VERSION: i32 = 2586;

fn decoder() -> ChunkDecoder {
    ChunkDecoder::new(Arc::new(BlockRegistry::new()))
}

fn palette_list(names: &[&str]) -> List {
    List::Compound(names.iter().map(|&n| compound! { "Name" => n }).collect())
}

fn numbered_palette(len: usize) -> List {
    List::Compound(
        (0..len)
            .map(|n| compound! { "Name" => format!("test:block_{n}") })
            .collect(),
    )
}

/// Packs `values` back to back from the least significant bit of the first
/// long, as the game writes pre-2529 block states.
fn pack_spanning(values: &[u16], bit_width: u32) -> Vec<i64> {
    let w = bit_width as usize;
    let mut longs = vec![0_u64; (values.len() * w).div_ceil(64)];

    for (n, &v) in values.iter().enumerate() {
        let bit = n * w;
        let (word, shift) = (bit / 64, bit % 64);
        longs[word] |= u64::from(v) << shift;
        if shift + w > 64 {
            longs[word + 1] |= u64::from(v) >> (64 - shift);
        }
    }

    longs.into_iter().map(|l| l as i64).collect()
}

fn pack_aligned(values: &[u16], bit_width: u32) -> Vec<i64> {
    let per_long = 64 / bit_width as usize;
    let mut longs = vec![0_u64; values.len().div_ceil(per_long)];

    for (n, &v) in values.iter().enumerate() {
        longs[n / per_long] |= u64::from(v) << ((n % per_long) * bit_width as usize);
    }

    longs.into_iter().map(|l| l as i64).collect()
}

fn modern_chunk(data_version: i32, sections: Vec<Compound>) -> Compound {
    compound! {
        "DataVersion" => data_version,
        "Level" => compound! {
            "xPos" => 4,
            "zPos" => -7,
            "Sections" => List::Compound(sections),
        },
    }
}

#[test]
fn bit_widths() {
    assert_eq!(block_bit_width(1), 4);
    assert_eq!(block_bit_width(2), 4);
    assert_eq!(block_bit_width(16), 4);
    assert_eq!(block_bit_width(17), 5);
    assert_eq!(block_bit_width(32), 5);
    assert_eq!(block_bit_width(33), 6);
    assert_eq!(block_bit_width(257), 9);
    assert_eq!(block_bit_width(4096), 12);
}

#[test]
fn spanning_states_are_stored_back_to_front() {
    for bit_width in [4_u32, 5, 6, 8, 9, 12] {
        let len = 1_usize << bit_width;
        let values: Vec<u16> = (0..4096).map(|n| ((n * 7 + 3) % len) as u16).collect();
        let longs = pack_spanning(&values, bit_width);

        let nbt = modern_chunk(
            SPANNING_VERSION,
            vec![compound! {
                "Y" => 0_i8,
                "Palette" => numbered_palette(len),
                "BlockStates" => longs.clone(),
            }],
        );

        let chunk = decoder().decode(&nbt).unwrap();
        let section = chunk.sections[0].as_ref().unwrap();

        let stream = longs_to_reversed_bytes(&longs);
        for i in 0..4096 {
            let packed = extract_bits(&stream, i * bit_width as usize, bit_width).unwrap();
            assert_eq!(
                u32::from(section.blocks[4095 - i]),
                packed,
                "width {bit_width}, i {i}"
            );
        }

        // The reversal lands every cell in natural order.
        assert_eq!(&section.blocks[..], &values[..], "width {bit_width}");
    }
}

#[test]
fn alternating_air_and_stone() {
    let values: Vec<u16> = (0..4096).map(|n| n % 2).collect();

    let nbt = modern_chunk(
        SPANNING_VERSION,
        vec![compound! {
            "Y" => 0_i8,
            "Palette" => palette_list(&[AIR, "minecraft:stone"]),
            "BlockStates" => pack_spanning(&values, 4),
        }],
    );

    let chunk = decoder().decode(&nbt).unwrap();
    let section = chunk.sections[0].as_ref().unwrap();

    assert_eq!(section.palette_entry(0, 0, 0).name, AIR);
    assert_eq!(section.palette_entry(1, 0, 0).name, "minecraft:stone");
    assert_eq!(section.palette_entry(2, 0, 0).name, AIR);
    assert_eq!(section.palette_entry(15, 15, 15).name, "minecraft:stone");
    assert_eq!(chunk.highest, 15);
}

#[test]
fn aligned_states() {
    let values: Vec<u16> = (0..4096).map(|n| (n % 20) as u16).collect();

    let nbt = modern_chunk(
        ALIGNED_VERSION,
        vec![compound! {
            "Y" => 3_i8,
            "Palette" => numbered_palette(20),
            "BlockStates" => pack_aligned(&values, 5),
        }],
    );

    let chunk = decoder().decode(&nbt).unwrap();
    let section = chunk.sections[3].as_ref().unwrap();

    assert_eq!(&section.blocks[..], &values[..]);
    assert_eq!(section.palette_entry(0, 0, 0).name, "test:block_0");
    assert_eq!(section.palette_entry(5, 0, 0).name, "test:block_5");
}

#[test]
fn flat_layout_without_level() {
    let values: Vec<u16> = (0..4096).map(|n| u16::from(n >= 256)).collect();

    let nbt = compound! {
        "DataVersion" => 3465,
        "xPos" => 1,
        "zPos" => 2,
        "sections" => List::Compound(vec![
            compound! {
                "Y" => -4_i8,
                "block_states" => compound! {
                    "palette" => palette_list(&["minecraft:stone"]),
                },
            },
            compound! {
                "Y" => 1_i8,
                "block_states" => compound! {
                    "palette" => palette_list(&["minecraft:stone", AIR]),
                    "data" => pack_aligned(&values, 4),
                },
            },
        ]),
    };

    let chunk = decoder().decode(&nbt).unwrap();

    assert_eq!(chunk.pos, ChunkPos::new(1, 2));
    assert!(chunk.sections[0].is_none());

    let section = chunk.sections[1].as_ref().unwrap();
    assert_eq!(section.palette_entry(0, 0, 0).name, "minecraft:stone");
    assert_eq!(section.palette_entry(0, 1, 0).name, AIR);

    // Index 0 is stone here, but only non-zero indices count.
    assert_eq!(chunk.highest, 16 + 15);
}

#[test]
fn missing_palette_is_air() {
    let nbt = modern_chunk(SPANNING_VERSION, vec![compound! { "Y" => 2_i8 }]);

    let chunk = decoder().decode(&nbt).unwrap();
    let section = chunk.sections[2].as_ref().unwrap();

    assert_eq!(section.palette.len(), 1);
    assert_eq!(section.palette_entry(7, 7, 7).name, AIR);
    assert!(section.is_empty());
    assert_eq!(chunk.highest, 0);
}

#[test]
fn wrong_long_count() {
    let nbt = modern_chunk(
        SPANNING_VERSION,
        vec![compound! {
            "Y" => 0_i8,
            "Palette" => palette_list(&[AIR, "minecraft:stone"]),
            "BlockStates" => vec![0_i64; 255],
        }],
    );

    assert!(matches!(
        decoder().decode(&nbt),
        Err(DecodeError::BadLongCount {
            bit_width: 4,
            expected: 256,
            found: 255
        })
    ));
}

#[test]
fn palette_index_out_of_range() {
    let mut values = vec![0_u16; 4096];
    values[100] = 3;

    let nbt = modern_chunk(
        SPANNING_VERSION,
        vec![compound! {
            "Y" => 0_i8,
            "Palette" => palette_list(&[AIR, "minecraft:stone"]),
            "BlockStates" => pack_spanning(&values, 4),
        }],
    );

    assert!(matches!(
        decoder().decode(&nbt),
        Err(DecodeError::BadPaletteIndex { index: 3, len: 2 })
    ));
}

#[test]
fn sections_outside_the_map_are_skipped() {
    let nbt = modern_chunk(
        SPANNING_VERSION,
        vec![
            compound! { "Y" => -1_i8 },
            compound! { "Y" => 16_i8 },
            compound! { "Y" => 15_i8 },
        ],
    );

    let chunk = decoder().decode(&nbt).unwrap();

    assert_eq!(chunk.sections.iter().flatten().count(), 1);
    assert!(chunk.sections[15].is_some());
}

#[test]
fn position_is_required() {
    let nbt = compound! {
        "DataVersion" => SPANNING_VERSION,
        "Level" => compound! { "zPos" => 0 },
    };

    assert!(matches!(
        decoder().decode(&nbt),
        Err(DecodeError::Missing("xPos"))
    ));
}

#[test]
fn palette_properties_pick_variants() {
    let mut blocks = BlockRegistry::new();
    blocks.insert(BlockInfo::new("minecraft:grass_block", Color::new(0, 200, 0)));
    blocks.insert_variant(
        "minecraft:grass_block",
        "snowy",
        "true",
        BlockInfo::new("minecraft:grass_block", Color::new(255, 255, 255)),
    );

    let palette = List::Compound(vec![
        compound! {
            "Name" => "minecraft:grass_block",
            "Properties" => compound! { "snowy" => "true" },
        },
        compound! {
            "Name" => "minecraft:grass_block",
            "Properties" => compound! { "snowy" => "false" },
        },
    ]);

    let nbt = modern_chunk(
        SPANNING_VERSION,
        vec![compound! {
            "Y" => 0_i8,
            "Palette" => palette,
            "BlockStates" => vec![0_i64; 256],
        }],
    );

    let chunk = ChunkDecoder::new(Arc::new(blocks)).decode(&nbt).unwrap();
    let palette = &chunk.sections[0].as_ref().unwrap().palette;

    assert_eq!(
        palette[0].hash,
        overview_registry::variant_hash("minecraft:grass_block", "snowy", "true")
    );
    assert_eq!(palette[0].properties["snowy"], "true");
    assert_eq!(palette[1].hash, name_hash("minecraft:grass_block"));
}

fn legacy_section(y: i8, id: u8, data: u8, add: Option<u8>) -> Compound {
    let mut section = compound! {
        "Y" => y,
        "Blocks" => vec![id as i8; 4096],
        "Data" => vec![(data | data << 4) as i8; 2048],
        "BlockLight" => vec![0x4f_u8 as i8; 2048],
    };

    if let Some(add) = add {
        section.insert("Add", vec![(add | add << 4) as i8; 2048]);
    }

    section
}

#[test]
fn legacy_add_nibble_extends_ids() {
    let nbt = compound! {
        "Level" => compound! {
            "xPos" => 0,
            "zPos" => 0,
            "Sections" => List::Compound(vec![legacy_section(0, 0xbc, 0x3, Some(0xa))]),
        },
    };

    let decoder = decoder();
    let chunk = decoder.decode(&nbt).unwrap();
    let section = chunk.sections[0].as_ref().unwrap();

    assert_eq!(chunk.data_version, 0);
    assert!(section.blocks.iter().all(|&b| b >> 4 == 0xabc && b & 0xf == 0x3));
    assert_eq!(section.blocks[0], legacy_index(0xabc, 0x3));
    assert_eq!(section.palette_entry(0, 0, 0).name, UNKNOWN);
    assert_eq!(section.block_light(0, 0, 0), 0xf);
    assert_eq!(section.block_light(1, 0, 0), 0x4);
}

#[test]
fn legacy_sections_share_one_palette() {
    let nbt = compound! {
        "DataVersion" => 1343,
        "Level" => compound! {
            "xPos" => 0,
            "zPos" => 0,
            "Sections" => List::Compound(vec![
                legacy_section(0, 1, 3, None),
                legacy_section(4, 35, 14, None),
            ]),
        },
    };

    let decoder = decoder();
    let chunk = decoder.decode(&nbt).unwrap();
    let low = chunk.sections[0].as_ref().unwrap();
    let high = chunk.sections[4].as_ref().unwrap();

    assert!(Arc::ptr_eq(&low.palette, &high.palette));
    assert!(Arc::ptr_eq(&low.palette, decoder.legacy_palette()));
    assert_eq!(low.palette_entry(0, 0, 0).name, "minecraft:diorite");
    assert_eq!(high.palette_entry(0, 0, 0).name, "minecraft:red_wool");
    assert_eq!(chunk.highest, 4 * 16 + 15);
}

#[test]
fn legacy_arrays_must_have_full_length() {
    let nbt = compound! {
        "Level" => compound! {
            "xPos" => 0,
            "zPos" => 0,
            "Sections" => List::Compound(vec![compound! {
                "Y" => 0_i8,
                "Blocks" => vec![0_i8; 100],
                "Data" => vec![0_i8; 2048],
            }]),
        },
    };

    assert!(matches!(
        decoder().decode(&nbt),
        Err(DecodeError::BadLength {
            field: "Blocks",
            len: 100,
            expected: 4096
        })
    ));
}

#[test]
fn biomes() {
    let decode = |data_version: i32, biomes: Option<Value>| {
        let mut level = compound! { "xPos" => 0, "zPos" => 0 };
        if let Some(biomes) = biomes {
            level.insert("Biomes", biomes);
        }
        decoder()
            .decode(&compound! { "DataVersion" => data_version, "Level" => level })
            .unwrap()
    };

    let absent = decode(SPANNING_VERSION, None);
    assert!(absent.biomes.iter().all(|&b| b == NO_BIOME));

    let flat = decode(SPANNING_VERSION, Some(Value::IntArray((0..256).collect())));
    assert_eq!(flat.biome(3, 2), 35);

    let short = decode(SPANNING_VERSION, Some(Value::IntArray(vec![7; 10])));
    assert_eq!(short.biomes[9], 7);
    assert_eq!(short.biomes[10], NO_BIOME);

    // Only the lowest 4×4 layer of a volume is used.
    let mut volume: Vec<i32> = vec![99; 1024];
    for (i, b) in volume.iter_mut().take(16).enumerate() {
        *b = i as i32;
    }
    let volume = decode(2230, Some(Value::IntArray(volume)));
    assert_eq!(volume.biome(0, 0), 0);
    assert_eq!(volume.biome(5, 0), 1);
    assert_eq!(volume.biome(15, 15), 15);
    assert_eq!(volume.biome(4, 9), 2 * 4 + 1);

    let bytes = decode(1343, Some(Value::ByteArray(vec![-127; 256])));
    assert_eq!(bytes.biome(0, 0), 129);
}

#[test]
fn entities_and_structures() {
    let nbt = compound! {
        "DataVersion" => SPANNING_VERSION,
        "Level" => compound! {
            "xPos" => 0,
            "zPos" => 0,
            "Entities" => List::Compound(vec![
                compound! {
                    "id" => "minecraft:cow",
                    "Pos" => List::Double(vec![1.5, 64.0, 2.5]),
                },
                compound! {
                    "id" => "minecraft:cow",
                    "Pos" => List::Double(vec![3.5, 65.0, 2.5]),
                },
                compound! {
                    "id" => "minecraft:zombie",
                    "Pos" => List::Double(vec![3.5, 65.0]),
                },
                compound! { "Pos" => List::Double(vec![0.0, 0.0, 0.0]) },
            ]),
            "Structures" => compound! {
                "Starts" => compound! {
                    "Village" => compound! {
                        "id" => "Village",
                        "BB" => vec![0, 60, 0, 40, 80, 40],
                    },
                    "Mineshaft" => compound! { "id" => "INVALID" },
                    "Temple" => compound! { "id" => "Temple", "BB" => vec![1, 2, 3] },
                },
            },
        },
    };

    let chunk = decoder().decode(&nbt).unwrap();

    assert_eq!(chunk.entities.len(), 1);
    assert_eq!(chunk.entities_of("minecraft:cow").len(), 2);
    assert_eq!(chunk.entities_of("minecraft:cow")[1].pos, [3.5, 65.0, 2.5]);
    assert!(chunk.entities_of("minecraft:zombie").is_empty());

    assert_eq!(
        chunk.structures,
        vec![GeneratedStructure {
            kind: "Village".into(),
            bounds: [0, 60, 0, 40, 80, 40],
        }]
    );
}

#[test]
fn legacy_chunks_have_no_structures() {
    let nbt = compound! {
        "DataVersion" => 1343,
        "Level" => compound! {
            "xPos" => 0,
            "zPos" => 0,
            "Structures" => compound! {
                "Starts" => compound! {
                    "Village" => compound! { "id" => "Village", "BB" => vec![0; 6] },
                },
            },
        },
    };

    let chunk = decoder().decode(&nbt).unwrap();

    assert!(chunk.structures.is_empty());
    assert!(chunk.loaded);
}
