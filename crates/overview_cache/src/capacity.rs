use std::mem::size_of;

use overview_anvil::chunk::{SECTION_COUNT, SECTION_VOLUME};
use overview_anvil::Chunk;
use sysinfo::System;
use tracing::debug;

/// Chunk count used when the available memory cannot be determined.
pub const FALLBACK_CAPACITY: usize = 10_000;

/// Heap and inline size of a chunk with every section allocated.
pub const fn full_chunk_size() -> usize {
    let section = SECTION_VOLUME * size_of::<u16>() + SECTION_VOLUME / 2;
    size_of::<Chunk>() + SECTION_COUNT * section
}

/// Number of chunks that fit into `available` bytes.
///
/// Most chunks are less than half filled with sections, so the bound is
/// twice what fully allocated chunks would need.
pub const fn estimated_capacity(available: u64) -> usize {
    let chunks = available / full_chunk_size() as u64;
    let bound = chunks.saturating_mul(2);

    if bound > usize::MAX as u64 {
        usize::MAX
    } else {
        bound as usize
    }
}

/// Probes the available physical memory and derives the cache bound from it.
pub fn memory_capacity() -> usize {
    let mut sys = System::new();
    sys.refresh_memory();

    let available = sys.available_memory();
    if available == 0 {
        debug!("available memory unknown, caching up to {FALLBACK_CAPACITY} chunks");
        return FALLBACK_CAPACITY;
    }

    let capacity = estimated_capacity(available).max(1);
    debug!("{available} bytes available, caching up to {capacity} chunks");

    capacity
}

/// Working bound for a view `width` × `height` pixels large at one pixel
/// per block: every visible chunk plus 10%, capped at `memory_bound`.
pub fn window_capacity(width: u32, height: u32, memory_bound: usize) -> usize {
    let visible = (width.div_ceil(16) as usize) * (height.div_ceil(16) as usize);
    let wanted = visible + visible.div_ceil(10);

    wanted.clamp(1, memory_bound.max(1))
}
