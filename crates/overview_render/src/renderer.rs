use std::sync::OnceLock;

use overview_anvil::{Chunk, Section};
use overview_cache::RenderParams;
use overview_registry::{
    BiomeInfo, BiomeRegistry, BlockInfo, BlockRegistry, Color, TintKind, AIR_HASH, LIGHT_LEVELS,
};

use crate::chunk_image::{ChunkImage, CHUNK_PIXELS};

/// Number of blocks below the surface searched for caves.
pub const CAVE_DEPTH: usize = 16;

/// Darkening applied to blocks `n` blocks below the view depth.
const DEPTH_SHADE: [u32; 11] = [0, 12, 18, 22, 24, 26, 28, 29, 30, 31, 32];

/// Light assumed everywhere when lighting is off.
const DAYLIGHT: i32 = 13;

/// Relief shading applied to a column higher or lower than its western
/// neighbour.
const RELIEF: i32 = 2;

/// Height the biome colorizers treat as sea level.
const SEA_LEVEL: i32 = 64;

/// How much each transparent block below the surface darkens it in cave
/// mode. Falls off exponentially and sums up to 1.5.
fn cave_shade() -> &'static [f32; CAVE_DEPTH] {
    static SHADE: OnceLock<[f32; CAVE_DEPTH]> = OnceLock::new();

    SHADE.get_or_init(|| {
        let mut shade: [f32; CAVE_DEPTH] =
            std::array::from_fn(|i| 1.0 / (i as f32 / (CAVE_DEPTH as f32 / 2.0)).exp());
        let sum: f32 = shade.iter().sum();

        for s in &mut shade {
            *s = 1.5 * *s / sum;
        }

        shade
    })
}

/// Renders `chunk` as seen from above, starting at `params.depth`.
pub fn render_chunk(
    chunk: &Chunk,
    params: RenderParams,
    blocks: &BlockRegistry,
    biomes: &BiomeRegistry,
) -> ChunkImage {
    let renderer = ColumnRenderer {
        chunk,
        params,
        blocks,
    };

    let mut img = ChunkImage::new();

    for z in 0..CHUNK_PIXELS {
        let mut last_y = None;

        for x in 0..CHUNK_PIXELS {
            let offset = x + z * CHUNK_PIXELS;
            let biome = biomes.resolve(chunk.biomes[offset]);

            let (color, highest) = renderer.column(offset, biome, last_y);

            img.set_pixel(x, z, color);
            img.depth[offset] = highest.clamp(0, 255) as u8;
            last_y = Some(highest);
        }
    }

    img
}

struct ColumnRenderer<'a> {
    chunk: &'a Chunk,
    params: RenderParams,
    blocks: &'a BlockRegistry,
}

impl<'a> ColumnRenderer<'a> {
    fn block(&self, section: &Section, offset: usize, y: i32) -> &'a BlockInfo {
        self.blocks.resolve(section.palette_entry_at(offset, y).hash)
    }

    /// The block at `y` of the column, air outside of stored sections.
    fn block_at(&self, offset: usize, y: i32) -> &'a BlockInfo {
        match self.chunk.section(y) {
            Some(section) => self.block(section, offset, y),
            None => self.blocks.resolve(AIR_HASH),
        }
    }

    fn light_at(&self, offset: usize, y: i32) -> i32 {
        self.chunk
            .section(y)
            .map_or(0, |s| i32::from(s.block_light_at(offset, y)))
    }

    /// Blends the column at `offset` top down. Returns the color and the Y
    /// of the topmost drawn block.
    fn column(&self, offset: usize, biome: &BiomeInfo, last_y: Option<i32>) -> ([u8; 3], i32) {
        let flags = self.params.flags;

        let mut rgb = [0u8; 3];
        let mut alpha = 0.0;
        let mut highest = 0;

        let mut y = self.params.depth.min(self.chunk.highest);

        while y >= 0 {
            let Some(section) = self.chunk.section(y) else {
                // Skip the whole section.
                y = ((y >> 4) << 4) - 1;
                continue;
            };

            let block = self.block(section, offset, y);
            if block.alpha == 0.0 {
                y -= 1;
                continue;
            }

            let light_above = self.light_at(offset, y + 1);
            let mut light = if flags.lighting() { light_above } else { DAYLIGHT };

            if alpha == 0.0 {
                match last_y {
                    Some(last) if last < y => light += RELIEF,
                    Some(last) if last > y => light -= RELIEF,
                    _ => {}
                }
            }

            let base = block.color();
            let tinted = match block.tint {
                TintKind::Water => biome.water_color(base),
                TintKind::Grass => biome.grass_color(base, y - SEA_LEVEL),
                TintKind::Foliage => biome.foliage_color(base, y - SEA_LEVEL),
                TintKind::None => base,
            };

            let shaded = tinted.scaled(Color::light_factor(light));
            let mut col = [u32::from(shaded.r), u32::from(shaded.g), u32::from(shaded.b)];

            if flags.depth_shading() {
                let below = usize::try_from(self.params.depth - y).unwrap_or(0);
                let shade = DEPTH_SHADE[below.min(DEPTH_SHADE.len() - 1)];

                for c in &mut col {
                    *c -= shade.min(*c);
                }
            }

            if flags.mob_spawn() {
                col = self.mob_spawn_highlight(section, offset, y, block, light_above, col);
            }

            if flags.biome_colors() {
                let c = biome.colors[light.clamp(0, LIGHT_LEVELS as i32 - 1) as usize];
                col = [u32::from(c.r), u32::from(c.g), u32::from(c.b)];
                alpha = 0.0;
            }

            if alpha == 0.0 {
                alpha = block.alpha;
                rgb = col.map(|c| c.min(255) as u8);
                highest = y;
            } else {
                for (acc, c) in rgb.iter_mut().zip(col) {
                    *acc = (alpha * f64::from(*acc) + (1.0 - alpha) * f64::from(c)) as u8;
                }
                alpha += block.alpha * (1.0 - alpha);
            }

            if block.alpha == 1.0 || alpha > 0.9 {
                break;
            }

            y -= 1;
        }

        if flags.cave_mode() {
            rgb = self.cave_darken(offset, highest, rgb);
        }

        (rgb, highest)
    }

    /// Tints blocks mobs could spawn on (red) or in (blue).
    fn mob_spawn_highlight(
        &self,
        section: &Section,
        offset: usize,
        y: i32,
        block: &BlockInfo,
        light_above: i32,
        mut col: [u32; 3],
    ) -> [u32; 3] {
        let above = self.block_at(offset, y + 1);
        let above2 = self.block_at(offset, y + 2);
        let below = self.block_at(offset, y - 1);
        let light = i32::from(section.block_light_at(offset, y));

        let room = |info: &BlockInfo| !info.normal_cube && info.spawn_inside;
        let floor = |info: &BlockInfo| info.solid_top && !info.bedrock;

        // Standing on top of this block.
        if floor(block) && light_above < 8 && room(above) && !above.liquid && room(above2) {
            col = [(col[0] + 256) / 2, col[1] / 2, (col[2] + 192) / 2];
        }

        // Inside this block, e.g. snow layers.
        if floor(below) && light < 8 && room(block) && !block.liquid && room(above) {
            col = [(col[0] + 192) / 2, col[1] / 2, (col[2] + 256) / 2];
        }

        col
    }

    fn cave_darken(&self, offset: usize, highest: i32, rgb: [u8; 3]) -> [u8; 3] {
        let shade = cave_shade();
        let mut factor = 1.0f32;

        for (i, y) in (0..highest).rev().take(CAVE_DEPTH).enumerate() {
            let Some(section) = self.chunk.section(y) else {
                continue;
            };

            if self.block(section, offset, y).transparent {
                factor -= shade[i];
            }
        }

        let factor = factor.max(0.25);
        rgb.map(|c| (factor * f32::from(c)) as u8)
    }
}
