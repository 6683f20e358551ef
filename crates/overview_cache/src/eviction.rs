//! Policies choosing which cached chunk to drop when the cache is over its
//! working bound.

use std::collections::VecDeque;
use std::fmt;

use lru::LruCache;
use overview_anvil::ChunkPos;
use rustc_hash::FxHashMap;

/// Tracks cached chunks and picks eviction victims.
///
/// The cache only reports chunks that hold a decoded chunk. Entries still
/// loading are never handed to the policy.
pub trait EvictionPolicy: Send + fmt::Debug {
    /// `pos` was inserted.
    fn on_cached(&mut self, pos: ChunkPos);
    /// `pos` was read by a consumer.
    fn on_access(&mut self, pos: ChunkPos);
    /// `pos` was dropped for a reason other than eviction.
    fn on_removed(&mut self, pos: ChunkPos);
    /// Removes and returns the next chunk to evict.
    fn next_victim(&mut self) -> Option<ChunkPos>;
    fn clear(&mut self);
}

/// Which built-in policy a cache uses.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub enum EvictionKind {
    /// Evict the least recently fetched chunk.
    #[default]
    Lru,
    /// Evict the chunk that was inserted first.
    Fifo,
}

impl EvictionKind {
    pub fn build(self) -> Box<dyn EvictionPolicy> {
        match self {
            Self::Lru => Box::new(LruEviction::new()),
            Self::Fifo => Box::new(FifoEviction::new()),
        }
    }
}

#[derive(Debug)]
pub struct LruEviction {
    order: LruCache<ChunkPos, ()>,
}

impl LruEviction {
    pub fn new() -> Self {
        Self {
            order: LruCache::unbounded(),
        }
    }
}

impl Default for LruEviction {
    fn default() -> Self {
        Self::new()
    }
}

impl EvictionPolicy for LruEviction {
    fn on_cached(&mut self, pos: ChunkPos) {
        self.order.put(pos, ());
    }

    fn on_access(&mut self, pos: ChunkPos) {
        self.order.promote(&pos);
    }

    fn on_removed(&mut self, pos: ChunkPos) {
        self.order.pop(&pos);
    }

    fn next_victim(&mut self) -> Option<ChunkPos> {
        self.order.pop_lru().map(|(pos, ())| pos)
    }

    fn clear(&mut self) {
        self.order.clear();
    }
}

#[derive(Debug, Default)]
pub struct FifoEviction {
    queue: VecDeque<(ChunkPos, u64)>,
    /// Insertion number of every chunk still cached. Queue entries with an
    /// older number are stale.
    live: FxHashMap<ChunkPos, u64>,
    next_seq: u64,
}

impl FifoEviction {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvictionPolicy for FifoEviction {
    fn on_cached(&mut self, pos: ChunkPos) {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.live.insert(pos, seq);
        self.queue.push_back((pos, seq));
    }

    fn on_access(&mut self, _pos: ChunkPos) {}

    fn on_removed(&mut self, pos: ChunkPos) {
        self.live.remove(&pos);
    }

    fn next_victim(&mut self) -> Option<ChunkPos> {
        while let Some((pos, seq)) = self.queue.pop_front() {
            if self.live.get(&pos) == Some(&seq) {
                self.live.remove(&pos);
                return Some(pos);
            }
        }

        None
    }

    fn clear(&mut self) {
        self.queue.clear();
        self.live.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32) -> ChunkPos {
        ChunkPos::new(x, 0)
    }

    #[test]
    fn lru_prefers_untouched_chunks() {
        let mut lru = LruEviction::new();
        for x in 0..3 {
            lru.on_cached(p(x));
        }
        lru.on_access(p(0));
        lru.on_removed(p(1));

        assert_eq!(lru.next_victim(), Some(p(2)));
        assert_eq!(lru.next_victim(), Some(p(0)));
        assert_eq!(lru.next_victim(), None);
    }

    #[test]
    fn fifo_ignores_access() {
        let mut fifo = FifoEviction::new();
        for x in 0..3 {
            fifo.on_cached(p(x));
        }
        fifo.on_access(p(0));
        fifo.on_removed(p(1));
        // Reinserted chunks queue up again.
        fifo.on_cached(p(1));

        assert_eq!(fifo.next_victim(), Some(p(0)));
        assert_eq!(fifo.next_victim(), Some(p(2)));
        assert_eq!(fifo.next_victim(), Some(p(1)));
        assert_eq!(fifo.next_victim(), None);
    }

    #[test]
    fn clear_forgets_everything() {
        for kind in [EvictionKind::Lru, EvictionKind::Fifo] {
            let mut policy = kind.build();
            policy.on_cached(p(5));
            policy.clear();

            assert_eq!(policy.next_victim(), None, "{kind:?}");
        }
    }
}
