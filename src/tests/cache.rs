use std::sync::Arc;
use std::thread;

use overview_anvil::{ChunkPos, Compression, GeneratedStructure};
use overview_cache::{
    CacheEvent, ChunkCache, ChunkCacheConfig, ChunkLoadStatus, ChunkState, EvictionKind,
    FetchBehaviour,
};
use overview_nbt::{compound, List};
use overview_registry::BlockRegistry;

use crate::testing::{filled_chunk, wait_for_loads, TestWorld};

fn cache(world: &TestWorld, capacity: usize) -> ChunkCache {
    ChunkCache::new(
        ChunkCacheConfig::new(world.path())
            .with_workers(2)
            .with_capacity(capacity),
        Arc::new(BlockRegistry::bundled()),
    )
}

fn stone_world(chunks: impl IntoIterator<Item = ChunkPos>) -> TestWorld {
    let mut world = TestWorld::new().unwrap();
    for pos in chunks {
        world
            .insert(pos, &filled_chunk(pos, 1976, 2, "minecraft:stone"), Compression::Zlib)
            .unwrap();
    }
    world.write().unwrap();
    world
}

#[test]
fn fetch_schedules_one_load() {
    let pos = ChunkPos::new(3, -2);
    let world = stone_world([pos]);
    let cache = cache(&world, 64);

    assert!(cache.fetch(pos).is_none());
    assert!(cache.fetch(pos).is_none());
    assert_eq!(cache.scheduled_jobs(), 1);

    wait_for_loads(&cache, 1);

    let chunk = cache.fetch(pos).expect("chunk should be cached");
    assert_eq!(chunk.pos, pos);
    assert!(chunk.loaded);
    assert_eq!(chunk.highest, 2 * 16 + 15);
    assert_eq!(
        chunk.palette_entry(0, 40, 0).map(|e| e.name.as_str()),
        Some("minecraft:stone")
    );
    assert!(Arc::ptr_eq(&chunk, &cache.is_loaded(pos).unwrap()));
    assert_eq!(cache.scheduled_jobs(), 1);
}

#[test]
fn every_compression_loads() {
    let mut world = TestWorld::new().unwrap();
    let chunks = [
        (ChunkPos::new(0, 0), Compression::Gzip),
        (ChunkPos::new(1, 0), Compression::Zlib),
        (ChunkPos::new(-40, 70), Compression::None),
    ];
    for (pos, compression) in chunks {
        world
            .insert(pos, &filled_chunk(pos, 2586, 0, "minecraft:dirt"), compression)
            .unwrap();
    }
    world.write().unwrap();

    let cache = cache(&world, 64);
    for (pos, _) in chunks {
        cache.fetch(pos);
    }

    for event in wait_for_loads(&cache, 3) {
        if let CacheEvent::ChunkLoaded { pos, status } = event {
            let chunk = status.chunk().expect("chunk should load");
            assert_eq!(chunk.pos, pos);
            assert_eq!(chunk.data_version, 2586);
        }
    }
    assert_eq!(cache.cached_chunks(), 3);
}

#[test]
fn zero_sector_offset_fails() {
    let pos = ChunkPos::new(5, 5);
    let mut world = TestWorld::new().unwrap();
    world.insert_location(pos, 1);
    world.write().unwrap();

    let cache = cache(&world, 64);
    cache.fetch(pos);

    match wait_for_loads(&cache, 1).pop() {
        Some(CacheEvent::ChunkLoaded { pos: p, status }) => {
            assert_eq!(p, pos);
            assert!(!status.success());
            assert!(matches!(status, ChunkLoadStatus::Failed(_)));
        }
        e => panic!("unexpected event {e:?}"),
    }

    // Failed chunks stay absent.
    assert!(cache.fetch(pos).is_none());
    assert_eq!(cache.state(pos), Some(ChunkState::Cached));
    assert_eq!(cache.scheduled_jobs(), 1);
}

#[test]
fn missing_chunks_load_empty() {
    let world = stone_world([ChunkPos::new(0, 0)]);
    let cache = cache(&world, 64);

    // Inside the region file, and in a region without a file.
    cache.fetch(ChunkPos::new(1, 0));
    cache.fetch(ChunkPos::new(100, 100));

    for event in wait_for_loads(&cache, 2) {
        match event {
            CacheEvent::ChunkLoaded { status, .. } => {
                assert!(matches!(status, ChunkLoadStatus::Empty));
            }
            e => panic!("unexpected event {e:?}"),
        }
    }
    assert_eq!(cache.cached_chunks(), 0);
    assert_eq!(cache.len(), 2);
}

#[test]
fn structures_are_announced_first() {
    let pos = ChunkPos::new(2, 2);
    let mut nbt = filled_chunk(pos, 1976, 4, "minecraft:stone");
    if let Some(overview_nbt::Value::Compound(level)) = nbt.get_mut("Level") {
        level.insert(
            "Structures",
            compound! {
                "Starts" => compound! {
                    "village" => compound! {
                        "id" => "village",
                        "BB" => vec![32, 60, 32, 80, 90, 70],
                    },
                    "mineshaft" => compound! { "id" => "INVALID" },
                },
            },
        );
    }

    let mut world = TestWorld::new().unwrap();
    world.insert(pos, &nbt, Compression::Zlib).unwrap();
    world.write().unwrap();

    let cache = cache(&world, 64);
    cache.fetch(pos);

    let events = wait_for_loads(&cache, 1);
    assert_eq!(events.len(), 2);

    match &events[0] {
        CacheEvent::StructureFound(found) => assert_eq!(
            found,
            &GeneratedStructure {
                kind: "village".into(),
                bounds: [32, 60, 32, 80, 90, 70],
            }
        ),
        e => panic!("unexpected event {e:?}"),
    }
    assert!(matches!(events[1], CacheEvent::ChunkLoaded { .. }));
}

#[test]
fn eviction_respects_bound() {
    let chunks: Vec<_> = (0..12).map(|x| ChunkPos::new(x, 0)).collect();
    let world = stone_world(chunks.iter().copied());
    let cache = ChunkCache::new(
        ChunkCacheConfig::new(world.path())
            .with_workers(1)
            .with_capacity(4)
            .with_eviction(EvictionKind::Fifo),
        Arc::new(BlockRegistry::bundled()),
    );

    for &pos in &chunks {
        cache.fetch(pos);
        wait_for_loads(&cache, 1);
    }

    assert_eq!(cache.cached_chunks(), 4);
    // Oldest first.
    assert!(!cache.is_cached(chunks[0]));
    assert!(cache.is_loaded(chunks[11]).is_some());

    // Evicted chunks load again.
    assert!(cache.fetch(chunks[0]).is_none());
    wait_for_loads(&cache, 1);
    assert!(cache.is_loaded(chunks[0]).is_some());
    assert!(!cache.is_cached(chunks[8]));
}

#[test]
fn force_update_reloads() {
    let pos = ChunkPos::new(0, 0);
    let world = stone_world([pos]);
    let cache = cache(&world, 64);

    cache.fetch(pos);
    wait_for_loads(&cache, 1);
    let first = cache.fetch(pos).unwrap();

    assert!(cache.fetch_with(pos, FetchBehaviour::ForceUpdate).is_none());
    wait_for_loads(&cache, 1);
    let second = cache.fetch_with(pos, FetchBehaviour::UseCached).unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first, second);
    assert_eq!(cache.scheduled_jobs(), 2);
}

#[test]
fn clear_while_loading() {
    let chunks: Vec<_> = (0..8)
        .flat_map(|x| (0..8).map(move |z| ChunkPos::new(x, z)))
        .collect();
    let world = stone_world(chunks.iter().copied());
    let cache = cache(&world, 1024);

    thread::scope(|s| {
        for part in chunks.chunks(16) {
            let cache = &cache;
            s.spawn(move || {
                for &pos in part {
                    cache.fetch(pos);
                }
            });
        }

        cache.clear();
    });

    cache.wait_idle();

    // Whatever was scheduled after the clear has finished. Nothing is stuck
    // loading and nothing from before the clear came back.
    for &pos in &chunks {
        match cache.state(pos) {
            None | Some(ChunkState::Cached) => {}
            state => panic!("{pos:?} is {state:?}"),
        }
    }

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.cached_chunks(), 0);
}

#[test]
fn switching_worlds() {
    let pos = ChunkPos::new(0, 0);
    let empty = TestWorld::new().unwrap();
    let full = stone_world([pos]);
    let cache = cache(&empty, 64);

    cache.fetch(pos);
    wait_for_loads(&cache, 1);
    assert!(cache.fetch(pos).is_none());

    cache.switch_world(full.path());
    cache.fetch(pos);
    wait_for_loads(&cache, 1);
    assert!(cache.fetch(pos).is_some());
}

#[test]
fn legacy_chunks_through_cache() {
    let pos = ChunkPos::new(-1, -1);
    let nbt = compound! {
        "Level" => compound! {
            "xPos" => pos.x,
            "zPos" => pos.z,
            "Biomes" => vec![4_i8; 256],
            "Structures" => compound! {
                "Starts" => compound! {
                    "village" => compound! {
                        "id" => "village",
                        "BB" => vec![0, 0, 0, 1, 1, 1],
                    },
                },
            },
            "Sections" => List::Compound(vec![compound! {
                "Y" => 0_i8,
                "Blocks" => vec![1_i8; 4096],
                "Data" => vec![0_i8; 2048],
                "BlockLight" => vec![0_i8; 2048],
            }]),
        },
    };

    let mut world = TestWorld::new().unwrap();
    world.insert(pos, &nbt, Compression::Gzip).unwrap();
    world.write().unwrap();

    let cache = cache(&world, 64);
    cache.fetch(pos);

    // Legacy chunks never carry structures.
    let events = wait_for_loads(&cache, 1);
    assert_eq!(events.len(), 1);

    let chunk = cache.fetch(pos).unwrap();
    assert_eq!(chunk.data_version, 0);
    assert_eq!(chunk.biome(3, 3), 4);
    assert_eq!(
        chunk.palette_entry(0, 0, 0).map(|e| e.name.as_str()),
        Some("minecraft:stone")
    );
    assert!(chunk.structures.is_empty());
}
