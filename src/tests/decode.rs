use std::collections::BTreeSet;
use std::sync::Arc;

use overview_anvil::{ChunkLoader, ChunkPos, Compression, RegionFolder};
use overview_nbt::{compound, List};
use overview_registry::{name_hash, variant_hash, BlockRegistry};
use pretty_assertions::assert_eq;

use crate::testing::{filled_chunk, TestWorld};

#[test]
fn flat_layout_with_variants() {
    let pos = ChunkPos::new(7, -9);

    let mut data = vec![0_i64; 256];
    // Four bits per index: cell 0 holds index 1, cell 1 index 2.
    data[0] = 0x21;

    let nbt = compound! {
        "DataVersion" => 2860,
        "xPos" => pos.x,
        "zPos" => pos.z,
        "sections" => List::Compound(vec![
            compound! {
                "Y" => -1_i8,
                "block_states" => compound! {
                    "palette" => List::Compound(vec![compound! { "Name" => "minecraft:stone" }]),
                },
            },
            compound! {
                "Y" => 1_i8,
                "block_states" => compound! {
                    "palette" => List::Compound(vec![
                        compound! { "Name" => "minecraft:air" },
                        compound! {
                            "Name" => "minecraft:oak_log",
                            "Properties" => compound! { "axis" => "y" },
                        },
                        compound! {
                            "Name" => "minecraft:oak_log",
                            "Properties" => compound! { "axis" => "x" },
                        },
                    ]),
                    "data" => data,
                },
            },
        ]),
    };

    let mut world = TestWorld::new().unwrap();
    world.insert(pos, &nbt, Compression::Zlib).unwrap();
    world.write().unwrap();

    let loader = ChunkLoader::new(Arc::new(BlockRegistry::bundled()));
    let chunk = loader.load(world.path(), pos).unwrap().unwrap();

    assert_eq!(chunk.pos, pos);
    assert!(chunk.sections[0].is_none());
    assert_eq!(chunk.highest, 16);

    let upright = chunk.palette_entry(0, 16, 0).unwrap();
    assert_eq!(upright.hash, variant_hash("minecraft:oak_log", "axis", "y"));
    assert_eq!(upright.properties.get("axis").map(String::as_str), Some("y"));

    let sideways = chunk.palette_entry(1, 16, 0).unwrap();
    assert_eq!(sideways.hash, name_hash("minecraft:oak_log"));

    assert_eq!(chunk.palette_entry(2, 16, 0).unwrap().name, "minecraft:air");
}

#[test]
fn folder_lists_chunks_of_every_region() {
    let chunks = [
        ChunkPos::new(0, 0),
        ChunkPos::new(31, 31),
        ChunkPos::new(-1, 0),
        ChunkPos::new(64, -65),
    ];

    let mut world = TestWorld::new().unwrap();
    for pos in chunks {
        world
            .insert(pos, &filled_chunk(pos, 1976, 0, "minecraft:sand"), Compression::Gzip)
            .unwrap();
    }
    world.write().unwrap();

    let mut folder = RegionFolder::for_world(world.path());
    let found: BTreeSet<_> = folder
        .iter_chunks()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(found, chunks.into_iter().collect());

    let raw = folder.get_chunk(ChunkPos::new(64, -65)).unwrap().unwrap();
    assert_eq!(raw.data.get_i32("DataVersion"), Some(1976));
}
