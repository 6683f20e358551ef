/// Side length of a region in chunks.
pub const REGION_SIZE: i32 = 32;

/// Side length of a [`ChunkGroupPos`] in chunks.
pub const GROUP_SIZE: i32 = 8;

/// The X and Z position of a chunk.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, Debug)]
pub struct ChunkPos {
    /// The X position of the chunk.
    pub x: i32,
    /// The Z position of the chunk.
    pub z: i32,
}

impl ChunkPos {
    /// Constructs a new chunk position.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The chunk containing the block column at `block_x`, `block_z`.
    pub const fn at(block_x: i32, block_z: i32) -> Self {
        Self::new(block_x.div_euclid(16), block_z.div_euclid(16))
    }

    pub const fn region(self) -> RegionPos {
        RegionPos::new(
            self.x.div_euclid(REGION_SIZE),
            self.z.div_euclid(REGION_SIZE),
        )
    }

    pub const fn group(self) -> ChunkGroupPos {
        ChunkGroupPos::new(self.x.div_euclid(GROUP_SIZE), self.z.div_euclid(GROUP_SIZE))
    }

    /// Index of this chunk in its region's location table.
    pub(crate) const fn region_index(self) -> usize {
        (self.x.rem_euclid(REGION_SIZE) + self.z.rem_euclid(REGION_SIZE) * REGION_SIZE) as usize
    }
}

impl From<(i32, i32)> for ChunkPos {
    fn from((x, z): (i32, i32)) -> Self {
        Self { x, z }
    }
}

impl From<ChunkPos> for (i32, i32) {
    fn from(pos: ChunkPos) -> Self {
        (pos.x, pos.z)
    }
}

impl From<[i32; 2]> for ChunkPos {
    fn from([x, z]: [i32; 2]) -> Self {
        Self { x, z }
    }
}

/// The X and Z position of a region file, `r.{x}.{z}.mca`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, Debug)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl RegionPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn file_name(self) -> String {
        format!("r.{}.{}.mca", self.x, self.z)
    }

    /// Position of the chunk stored at `index` in this region's location
    /// table.
    pub(crate) const fn chunk_at(self, index: usize) -> ChunkPos {
        let index = index as i32;
        ChunkPos::new(
            self.x * REGION_SIZE + index % REGION_SIZE,
            self.z * REGION_SIZE + index / REGION_SIZE,
        )
    }
}

/// A square tile of [`GROUP_SIZE`] × [`GROUP_SIZE`] chunks, drawn and cached
/// as one image.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, Debug)]
pub struct ChunkGroupPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkGroupPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The chunk in the north-west corner of the group.
    pub const fn origin(self) -> ChunkPos {
        ChunkPos::new(self.x * GROUP_SIZE, self.z * GROUP_SIZE)
    }

    pub const fn contains(self, pos: ChunkPos) -> bool {
        pos.x.div_euclid(GROUP_SIZE) == self.x && pos.z.div_euclid(GROUP_SIZE) == self.z
    }

    /// Iterates the chunks of this group row by row.
    pub fn chunks(self) -> impl Iterator<Item = ChunkPos> {
        let origin = self.origin();
        (0..GROUP_SIZE).flat_map(move |dz| {
            (0..GROUP_SIZE).map(move |dx| ChunkPos::new(origin.x + dx, origin.z + dz))
        })
    }
}
