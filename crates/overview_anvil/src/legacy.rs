//! Translation of pre-flattening block ids (numeric id plus 4-bit data
//! value) to named block states.

use std::collections::BTreeMap;

use overview_registry::{name_hash, BlockRegistry, UNKNOWN};

use crate::chunk::{Palette, PaletteEntry};

/// Number of entries in the legacy palette: 12 bit ids times 16 data values.
pub const LEGACY_PALETTE_LEN: usize = 1 << 16;

/// Palette index of the legacy block `id` with data value `data`.
pub const fn legacy_index(id: u16, data: u8) -> u16 {
    (id << 4) | (data as u16 & 0xf)
}

type LegacyBlock = (u16, u8, &'static str, &'static [(&'static str, &'static str)]);

const AXIS_Y: &[(&str, &str)] = &[("axis", "y")];
const AXIS_X: &[(&str, &str)] = &[("axis", "x")];
const AXIS_Z: &[(&str, &str)] = &[("axis", "z")];

const COLORS: [&str; 16] = [
    "white",
    "orange",
    "magenta",
    "light_blue",
    "yellow",
    "lime",
    "pink",
    "gray",
    "light_gray",
    "cyan",
    "purple",
    "blue",
    "brown",
    "green",
    "red",
    "black",
];

/// Vanilla blocks up to 1.12. Ids without a data-specific entry use their
/// data 0 entry for every data value.
#[rustfmt::skip]
const LEGACY_BLOCKS: &[LegacyBlock] = &[
    (0, 0, "air", &[]),
    (1, 0, "stone", &[]),
    (1, 1, "granite", &[]),
    (1, 2, "polished_granite", &[]),
    (1, 3, "diorite", &[]),
    (1, 4, "polished_diorite", &[]),
    (1, 5, "andesite", &[]),
    (1, 6, "polished_andesite", &[]),
    (2, 0, "grass_block", &[("snowy", "false")]),
    (3, 0, "dirt", &[]),
    (3, 1, "coarse_dirt", &[]),
    (3, 2, "podzol", &[("snowy", "false")]),
    (4, 0, "cobblestone", &[]),
    (5, 0, "oak_planks", &[]),
    (5, 1, "spruce_planks", &[]),
    (5, 2, "birch_planks", &[]),
    (5, 3, "jungle_planks", &[]),
    (5, 4, "acacia_planks", &[]),
    (5, 5, "dark_oak_planks", &[]),
    (6, 0, "oak_sapling", &[]),
    (6, 1, "spruce_sapling", &[]),
    (6, 2, "birch_sapling", &[]),
    (6, 3, "jungle_sapling", &[]),
    (6, 4, "acacia_sapling", &[]),
    (6, 5, "dark_oak_sapling", &[]),
    (7, 0, "bedrock", &[]),
    (8, 0, "water", &[]),
    (9, 0, "water", &[]),
    (10, 0, "lava", &[]),
    (11, 0, "lava", &[]),
    (12, 0, "sand", &[]),
    (12, 1, "red_sand", &[]),
    (13, 0, "gravel", &[]),
    (14, 0, "gold_ore", &[]),
    (15, 0, "iron_ore", &[]),
    (16, 0, "coal_ore", &[]),
    (17, 0, "oak_log", AXIS_Y),
    (17, 1, "spruce_log", AXIS_Y),
    (17, 2, "birch_log", AXIS_Y),
    (17, 3, "jungle_log", AXIS_Y),
    (17, 4, "oak_log", AXIS_X),
    (17, 5, "spruce_log", AXIS_X),
    (17, 6, "birch_log", AXIS_X),
    (17, 7, "jungle_log", AXIS_X),
    (17, 8, "oak_log", AXIS_Z),
    (17, 9, "spruce_log", AXIS_Z),
    (17, 10, "birch_log", AXIS_Z),
    (17, 11, "jungle_log", AXIS_Z),
    (18, 0, "oak_leaves", &[]),
    (18, 1, "spruce_leaves", &[]),
    (18, 2, "birch_leaves", &[]),
    (18, 3, "jungle_leaves", &[]),
    (18, 4, "oak_leaves", &[]),
    (18, 5, "spruce_leaves", &[]),
    (18, 6, "birch_leaves", &[]),
    (18, 7, "jungle_leaves", &[]),
    (18, 8, "oak_leaves", &[]),
    (18, 9, "spruce_leaves", &[]),
    (18, 10, "birch_leaves", &[]),
    (18, 11, "jungle_leaves", &[]),
    (18, 12, "oak_leaves", &[]),
    (18, 13, "spruce_leaves", &[]),
    (18, 14, "birch_leaves", &[]),
    (18, 15, "jungle_leaves", &[]),
    (19, 0, "sponge", &[]),
    (19, 1, "wet_sponge", &[]),
    (20, 0, "glass", &[]),
    (21, 0, "lapis_ore", &[]),
    (22, 0, "lapis_block", &[]),
    (24, 0, "sandstone", &[]),
    (24, 1, "chiseled_sandstone", &[]),
    (24, 2, "cut_sandstone", &[]),
    (30, 0, "cobweb", &[]),
    (31, 0, "dead_bush", &[]),
    (31, 1, "grass", &[]),
    (31, 2, "fern", &[]),
    (32, 0, "dead_bush", &[]),
    (37, 0, "dandelion", &[]),
    (38, 0, "poppy", &[]),
    (38, 1, "blue_orchid", &[]),
    (38, 2, "allium", &[]),
    (38, 3, "azure_bluet", &[]),
    (38, 4, "red_tulip", &[]),
    (38, 5, "orange_tulip", &[]),
    (38, 6, "white_tulip", &[]),
    (38, 7, "pink_tulip", &[]),
    (38, 8, "oxeye_daisy", &[]),
    (39, 0, "brown_mushroom", &[]),
    (40, 0, "red_mushroom", &[]),
    (41, 0, "gold_block", &[]),
    (42, 0, "iron_block", &[]),
    (43, 0, "smooth_stone", &[]),
    (44, 0, "smooth_stone_slab", &[]),
    (45, 0, "bricks", &[]),
    (46, 0, "tnt", &[]),
    (47, 0, "bookshelf", &[]),
    (48, 0, "mossy_cobblestone", &[]),
    (49, 0, "obsidian", &[]),
    (50, 0, "torch", &[]),
    (51, 0, "fire", &[]),
    (52, 0, "spawner", &[]),
    (53, 0, "oak_stairs", &[]),
    (54, 0, "chest", &[]),
    (55, 0, "redstone_wire", &[]),
    (56, 0, "diamond_ore", &[]),
    (57, 0, "diamond_block", &[]),
    (58, 0, "crafting_table", &[]),
    (59, 0, "wheat", &[]),
    (60, 0, "farmland", &[]),
    (61, 0, "furnace", &[]),
    (62, 0, "furnace", &[]),
    (63, 0, "oak_sign", &[]),
    (64, 0, "oak_door", &[]),
    (65, 0, "ladder", &[]),
    (66, 0, "rail", &[]),
    (67, 0, "cobblestone_stairs", &[]),
    (73, 0, "redstone_ore", &[]),
    (74, 0, "redstone_ore", &[]),
    (78, 0, "snow", &[]),
    (79, 0, "ice", &[]),
    (80, 0, "snow_block", &[]),
    (81, 0, "cactus", &[]),
    (82, 0, "clay", &[]),
    (83, 0, "sugar_cane", &[]),
    (85, 0, "oak_fence", &[]),
    (86, 0, "pumpkin", &[]),
    (87, 0, "netherrack", &[]),
    (88, 0, "soul_sand", &[]),
    (89, 0, "glowstone", &[]),
    (91, 0, "jack_o_lantern", &[]),
    (97, 0, "infested_stone", &[]),
    (98, 0, "stone_bricks", &[]),
    (98, 1, "mossy_stone_bricks", &[]),
    (98, 2, "cracked_stone_bricks", &[]),
    (98, 3, "chiseled_stone_bricks", &[]),
    (99, 0, "brown_mushroom_block", &[]),
    (100, 0, "red_mushroom_block", &[]),
    (101, 0, "iron_bars", &[]),
    (102, 0, "glass_pane", &[]),
    (103, 0, "melon", &[]),
    (106, 0, "vine", &[]),
    (107, 0, "oak_fence_gate", &[]),
    (108, 0, "brick_stairs", &[]),
    (109, 0, "stone_brick_stairs", &[]),
    (110, 0, "mycelium", &[("snowy", "false")]),
    (111, 0, "lily_pad", &[]),
    (112, 0, "nether_bricks", &[]),
    (121, 0, "end_stone", &[]),
    (129, 0, "emerald_ore", &[]),
    (133, 0, "emerald_block", &[]),
    (152, 0, "redstone_block", &[]),
    (153, 0, "nether_quartz_ore", &[]),
    (155, 0, "quartz_block", &[]),
    (161, 0, "acacia_leaves", &[]),
    (161, 1, "dark_oak_leaves", &[]),
    (161, 4, "acacia_leaves", &[]),
    (161, 5, "dark_oak_leaves", &[]),
    (161, 8, "acacia_leaves", &[]),
    (161, 9, "dark_oak_leaves", &[]),
    (161, 12, "acacia_leaves", &[]),
    (161, 13, "dark_oak_leaves", &[]),
    (162, 0, "acacia_log", AXIS_Y),
    (162, 1, "dark_oak_log", AXIS_Y),
    (162, 4, "acacia_log", AXIS_X),
    (162, 5, "dark_oak_log", AXIS_X),
    (162, 8, "acacia_log", AXIS_Z),
    (162, 9, "dark_oak_log", AXIS_Z),
    (168, 0, "prismarine", &[]),
    (169, 0, "sea_lantern", &[]),
    (170, 0, "hay_block", AXIS_Y),
    (172, 0, "terracotta", &[]),
    (173, 0, "coal_block", &[]),
    (174, 0, "packed_ice", &[]),
    (175, 0, "sunflower", &[]),
    (175, 1, "lilac", &[]),
    (175, 2, "tall_grass", &[]),
    (175, 3, "large_fern", &[]),
    (175, 4, "rose_bush", &[]),
    (175, 5, "peony", &[]),
    (179, 0, "red_sandstone", &[]),
    (201, 0, "purpur_block", &[]),
    (206, 0, "end_stone_bricks", &[]),
    (208, 0, "grass_path", &[]),
    (213, 0, "magma_block", &[]),
    (214, 0, "nether_wart_block", &[]),
    (215, 0, "red_nether_bricks", &[]),
    (216, 0, "bone_block", AXIS_Y),
];

/// Blocks with one variant per dye color, in data value order.
const COLORED_BLOCKS: &[(u16, &str)] = &[
    (35, "wool"),
    (95, "stained_glass"),
    (159, "terracotta"),
    (160, "stained_glass_pane"),
    (171, "carpet"),
    (251, "concrete"),
    (252, "concrete_powder"),
];

/// Builds the palette legacy sections index with [`legacy_index`].
///
/// Hashes are computed against `blocks`, so variant definitions apply to
/// legacy chunks the same way they apply to modern ones. Unmapped ids resolve
/// to [`UNKNOWN`].
pub fn flattening_palette(blocks: &BlockRegistry) -> Palette {
    let entry = |name: String, props: &[(&str, &str)]| {
        let properties: BTreeMap<String, String> = props
            .iter()
            .map(|&(k, v)| (k.to_owned(), v.to_owned()))
            .collect();

        PaletteEntry {
            hash: blocks.state_hash(&name, &properties),
            name,
            properties,
        }
    };

    let mut palette = vec![PaletteEntry::new(UNKNOWN, name_hash(UNKNOWN)); LEGACY_PALETTE_LEN];

    let mut set_all = |id: u16, e: PaletteEntry| {
        for data in 0..16 {
            palette[usize::from(legacy_index(id, data))] = e.clone();
        }
    };

    for &(id, _, name, props) in LEGACY_BLOCKS.iter().filter(|b| b.1 == 0) {
        set_all(id, entry(format!("minecraft:{name}"), props));
    }

    for &(id, data, name, props) in LEGACY_BLOCKS.iter().filter(|b| b.1 != 0) {
        palette[usize::from(legacy_index(id, data))] = entry(format!("minecraft:{name}"), props);
    }

    for &(id, suffix) in COLORED_BLOCKS {
        for (data, color) in COLORS.iter().enumerate() {
            palette[usize::from(legacy_index(id, data as u8))] =
                entry(format!("minecraft:{color}_{suffix}"), &[]);
        }
    }

    palette.into()
}

#[cfg(test)]
mod tests {
    use overview_registry::{BlockInfo, Color, AIR, AIR_HASH};

    use super::*;

    #[test]
    fn air_is_index_zero() {
        let palette = flattening_palette(&BlockRegistry::new());

        assert_eq!(palette.len(), LEGACY_PALETTE_LEN);
        assert_eq!(palette[0].name, AIR);
        assert_eq!(palette[0].hash, AIR_HASH);
    }

    #[test]
    fn data_values() {
        let palette = flattening_palette(&BlockRegistry::new());
        let name = |id, data| palette[usize::from(legacy_index(id, data))].name.as_str();

        assert_eq!(name(1, 0), "minecraft:stone");
        assert_eq!(name(1, 3), "minecraft:diorite");
        // No entry for data 9, falls back to data 0.
        assert_eq!(name(1, 9), "minecraft:stone");
        assert_eq!(name(35, 14), "minecraft:red_wool");
        assert_eq!(name(17, 5), "minecraft:spruce_log");
        assert_eq!(name(0xabc, 0), UNKNOWN);
    }

    #[test]
    fn variants_apply_to_legacy_blocks() {
        let mut blocks = BlockRegistry::new();
        blocks.insert(BlockInfo::new("minecraft:oak_log", Color::new(100, 80, 50)));
        blocks.insert_variant(
            "minecraft:oak_log",
            "axis",
            "y",
            BlockInfo::new("minecraft:oak_log", Color::new(150, 120, 70)),
        );

        let palette = flattening_palette(&blocks);
        let upright = &palette[usize::from(legacy_index(17, 0))];
        let sideways = &palette[usize::from(legacy_index(17, 4))];

        assert_eq!(upright.hash, overview_registry::variant_hash("minecraft:oak_log", "axis", "y"));
        assert_eq!(sideways.hash, name_hash("minecraft:oak_log"));
    }
}
