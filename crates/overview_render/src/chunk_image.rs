use std::sync::Arc;

use image::RgbaImage;
use overview_anvil::chunk::COLUMN_COUNT;
use overview_anvil::{ChunkGroupPos, ChunkPos, GROUP_SIZE};

/// Width and height of a chunk image in pixels.
pub const CHUNK_PIXELS: usize = 16;

/// Width and height of a chunk group image in pixels.
pub const GROUP_PIXELS: usize = CHUNK_PIXELS * GROUP_SIZE as usize;

/// A rendered chunk: one pixel per block column.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ChunkImage {
    /// Pixels in B, G, R, A order, row by row (north to south).
    pub pixels: Box<[u8; COLUMN_COUNT * 4]>,
    /// Y of the topmost block drawn in each column.
    pub depth: Box<[u8; COLUMN_COUNT]>,
}

impl ChunkImage {
    /// A black, fully opaque image.
    pub fn new() -> Self {
        let mut pixels = Box::new([0; COLUMN_COUNT * 4]);
        for px in pixels.chunks_exact_mut(4) {
            px[3] = 0xff;
        }

        Self {
            pixels,
            depth: Box::new([0; COLUMN_COUNT]),
        }
    }

    /// Checkerboard drawn where no chunk exists.
    pub fn placeholder() -> Self {
        let mut img = Self::new();

        for z in 0..CHUNK_PIXELS {
            for x in 0..CHUNK_PIXELS {
                let shade = if (x & 8) ^ (z & 8) == 0 { 0x44 } else { 0x88 };
                img.set_pixel(x, z, [shade, shade, shade]);
            }
        }

        img
    }

    /// The B, G, R, A bytes of the pixel at column `x`, `z`.
    pub fn pixel(&self, x: usize, z: usize) -> [u8; 4] {
        let i = (x + z * CHUNK_PIXELS) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    pub(crate) fn set_pixel(&mut self, x: usize, z: usize, [r, g, b]: [u8; 3]) {
        let i = (x + z * CHUNK_PIXELS) * 4;
        self.pixels[i..i + 4].copy_from_slice(&[b, g, r, 0xff]);
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        bgra_to_rgba(CHUNK_PIXELS as u32, CHUNK_PIXELS as u32, &self.pixels[..])
    }
}

impl Default for ChunkImage {
    fn default() -> Self {
        Self::new()
    }
}

/// The chunks of a [`ChunkGroupPos`] drawn into one image.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GroupImage {
    pub group: ChunkGroupPos,
    /// B, G, R, A pixels, `GROUP_PIXELS` per row.
    pub pixels: Vec<u8>,
}

impl GroupImage {
    pub fn to_rgba_image(&self) -> RgbaImage {
        bgra_to_rgba(GROUP_PIXELS as u32, GROUP_PIXELS as u32, &self.pixels)
    }
}

/// Copies the image of every chunk in `group` into one image. Chunks for
/// which `images` returns `None` are drawn as [`ChunkImage::placeholder`].
pub fn compose_group<F>(group: ChunkGroupPos, mut images: F) -> GroupImage
where
    F: FnMut(ChunkPos) -> Option<Arc<ChunkImage>>,
{
    let placeholder = ChunkImage::placeholder();
    let origin = group.origin();
    let row_len = GROUP_PIXELS * 4;
    let mut pixels = vec![0; row_len * GROUP_PIXELS];

    for pos in group.chunks() {
        let image = images(pos);
        let image = image.as_deref().unwrap_or(&placeholder);

        let left = (pos.x - origin.x) as usize * CHUNK_PIXELS * 4;
        let top = (pos.z - origin.z) as usize * CHUNK_PIXELS;

        for (z, row) in image.pixels.chunks_exact(CHUNK_PIXELS * 4).enumerate() {
            let start = (top + z) * row_len + left;
            pixels[start..start + row.len()].copy_from_slice(row);
        }
    }

    GroupImage { group, pixels }
}

fn bgra_to_rgba(width: u32, height: u32, bgra: &[u8]) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let i = (x + y * width) as usize * 4;
        image::Rgba([bgra[i + 2], bgra[i + 1], bgra[i], bgra[i + 3]])
    })
}
