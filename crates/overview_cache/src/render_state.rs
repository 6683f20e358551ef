//! Bookkeeping of rendered chunk and chunk-group images.
//!
//! The cache does not render anything itself. It remembers which view
//! parameters every stored image was rendered for and which keys have a
//! render in flight, so a key is never submitted twice at the same time.

use std::hash::Hash;
use std::sync::Arc;

use bitfield_struct::bitfield;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Flags changing how a chunk is drawn.
#[bitfield(u8)]
#[derive(PartialEq, Eq, Hash)]
pub struct RenderFlags {
    pub lighting: bool,
    pub mob_spawn: bool,
    pub cave_mode: bool,
    pub depth_shading: bool,
    pub show_entities: bool,
    #[bits(1)]
    _reserved: u8,
    pub biome_colors: bool,
    #[bits(1)]
    _pad: u8,
}

impl RenderFlags {
    pub const LIGHTING: u8 = 1;
    pub const MOB_SPAWN: u8 = 2;
    pub const CAVE_MODE: u8 = 4;
    pub const DEPTH_SHADING: u8 = 8;
    pub const SHOW_ENTITIES: u8 = 16;
    pub const BIOME_COLORS: u8 = 64;
}

/// View parameters a rendered image is valid for.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct RenderParams {
    /// Highest block Y that is drawn.
    pub depth: i32,
    pub flags: RenderFlags,
}

impl RenderParams {
    pub const fn new(depth: i32, flags: RenderFlags) -> Self {
        Self { depth, flags }
    }
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            depth: 255,
            flags: RenderFlags::new(),
        }
    }
}

/// Result of [`RenderStateCache::probe`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Staleness {
    /// The stored image was rendered for the probed parameters.
    Fresh,
    /// There is an image, but for other parameters.
    Stale,
    /// A render for this key is running.
    InFlight,
    /// Nothing was rendered yet.
    Missing,
}

/// Request state of an entry.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RenderStatus {
    Empty,
    /// Waiting for the chunks it is drawn from to load.
    LoadingRequested,
    RenderingRequested,
}

#[derive(Debug)]
struct RenderEntry<I> {
    loading: bool,
    rendering: bool,
    rendered_for: Option<RenderParams>,
    image: Option<Arc<I>>,
}

impl<I> Default for RenderEntry<I> {
    fn default() -> Self {
        Self {
            loading: false,
            rendering: false,
            rendered_for: None,
            image: None,
        }
    }
}

impl<I> RenderEntry<I> {
    fn staleness(&self, params: RenderParams) -> Staleness {
        if self.rendering {
            Staleness::InFlight
        } else if self.image.is_none() {
            Staleness::Missing
        } else if self.rendered_for == Some(params) {
            Staleness::Fresh
        } else {
            Staleness::Stale
        }
    }
}

/// Render state keyed by chunk or chunk-group position, holding images of
/// type `I`.
#[derive(Debug)]
pub struct RenderStateCache<K, I> {
    entries: RwLock<FxHashMap<K, RenderEntry<I>>>,
}

impl<K, I> Default for RenderStateCache<K, I> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
        }
    }
}

impl<K: Copy + Eq + Hash, I> RenderStateCache<K, I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self, key: K, params: RenderParams) -> Staleness {
        self.entries
            .read()
            .get(&key)
            .map_or(Staleness::Missing, |entry| entry.staleness(params))
    }

    /// Claims the render of `key` for `params`.
    ///
    /// Returns `true` if the caller must now render and [`install`] the
    /// image. Returns `false` if the stored image is fresh or a render is
    /// already running.
    ///
    /// [`install`]: Self::install
    pub fn request_render(&self, key: K, params: RenderParams) -> bool {
        let mut entries = self.entries.write();
        let entry = entries.entry(key).or_default();

        match entry.staleness(params) {
            Staleness::Fresh | Staleness::InFlight => false,
            Staleness::Stale | Staleness::Missing => {
                entry.rendering = true;
                true
            }
        }
    }

    /// Records that `key` waits for chunk loads before it can be rendered.
    pub fn mark_loading(&self, key: K) {
        self.entries.write().entry(key).or_default().loading = true;
    }

    /// Stores a finished render, ending any request on `key`.
    pub fn install(&self, key: K, params: RenderParams, image: I) {
        let mut entries = self.entries.write();
        let entry = entries.entry(key).or_default();

        entry.loading = false;
        entry.rendering = false;
        entry.rendered_for = Some(params);
        entry.image = Some(Arc::new(image));
    }

    /// Ends a render that produced no image. The previous image is kept.
    pub fn abandon(&self, key: K) {
        if let Some(entry) = self.entries.write().get_mut(&key) {
            entry.rendering = false;
        }
    }

    /// The stored image, fresh or not.
    pub fn image(&self, key: K) -> Option<Arc<I>> {
        self.entries.read().get(&key)?.image.clone()
    }

    /// Parameters the stored image was rendered for.
    pub fn rendered_for(&self, key: K) -> Option<RenderParams> {
        self.entries.read().get(&key)?.rendered_for
    }

    pub fn status(&self, key: K) -> Option<RenderStatus> {
        self.entries.read().get(&key).map(|entry| {
            if entry.rendering {
                RenderStatus::RenderingRequested
            } else if entry.loading {
                RenderStatus::LoadingRequested
            } else {
                RenderStatus::Empty
            }
        })
    }

    pub fn remove(&self, key: K) -> Option<Arc<I>> {
        self.entries.write().remove(&key)?.image
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
