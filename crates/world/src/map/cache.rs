use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use tracing::debug;

use crate::sync::{read_or_recover, write_or_recover};

use super::types::{GridId, Map, MapIdentity, TerrainCorners, TileAnimation, Tileset};

/// Cache key: one entry per (map, global tile id).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub map: MapIdentity,
    pub grid_id: GridId,
}

impl TileKey {
    fn new(map: &Map, grid_id: GridId) -> Self {
        Self {
            map: map.identity.clone(),
            grid_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileCacheStats {
    pub tileset_entries: usize,
    pub animation_entries: usize,
    pub animation_flags: usize,
    pub tileset_scans: u64,
}

/// Memoized per-tile lookups over immutable maps.
///
/// Entries are write-once: the first resolution for a key wins. Entries live
/// until [`TileCache::evict_map`] is called for their map.
#[derive(Debug, Default)]
pub struct TileCache {
    tilesets: RwLock<HashMap<TileKey, Arc<Tileset>>>,
    animations: RwLock<HashMap<TileKey, Arc<TileAnimation>>>,
    has_animation: RwLock<HashMap<TileKey, bool>>,
    tileset_scans: AtomicU64,
}

impl TileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache shared by every environment that does not inject its own.
    pub fn process() -> Arc<TileCache> {
        static PROCESS_CACHE: OnceLock<Arc<TileCache>> = OnceLock::new();
        Arc::clone(PROCESS_CACHE.get_or_init(|| Arc::new(TileCache::new())))
    }

    pub fn find_tileset(&self, map: &Map, grid_id: GridId) -> Option<Arc<Tileset>> {
        let key = TileKey::new(map, grid_id);
        if let Some(tileset) = read_or_recover(&self.tilesets, "tile_cache.tilesets").get(&key) {
            return Some(Arc::clone(tileset));
        }

        let found = self.scan(map, grid_id)?;
        let mut tilesets = write_or_recover(&self.tilesets, "tile_cache.tilesets");
        Some(Arc::clone(tilesets.entry(key).or_insert(found)))
    }

    /// Terrain of the tileset owning `grid_id`; four empty corners on a miss.
    pub fn terrain(&self, map: &Map, grid_id: GridId) -> TerrainCorners {
        map.tilesets
            .iter()
            .find(|tileset| tileset.contains(grid_id))
            .map(|tileset| tileset.terrain(grid_id))
            .unwrap_or_default()
    }

    pub fn animation(&self, map: &Map, grid_id: GridId) -> Option<Arc<TileAnimation>> {
        let key = TileKey::new(map, grid_id);
        if read_or_recover(&self.has_animation, "tile_cache.has_animation").get(&key)
            == Some(&false)
        {
            return None;
        }
        if let Some(animation) =
            read_or_recover(&self.animations, "tile_cache.animations").get(&key)
        {
            return Some(Arc::clone(animation));
        }

        let animation = self
            .scan(map, grid_id)
            .and_then(|tileset| tileset.animation(grid_id));
        if let Some(found) = &animation {
            write_or_recover(&self.animations, "tile_cache.animations")
                .entry(key.clone())
                .or_insert_with(|| Arc::clone(found));
        }
        write_or_recover(&self.has_animation, "tile_cache.has_animation")
            .entry(key)
            .or_insert(animation.is_some());
        animation
    }

    /// Drops every entry of one map, typically when its environment unloads.
    pub fn evict_map(&self, identity: &MapIdentity) -> usize {
        let mut removed = 0;
        {
            let mut tilesets = write_or_recover(&self.tilesets, "tile_cache.tilesets");
            let before = tilesets.len();
            tilesets.retain(|key, _| &key.map != identity);
            removed += before - tilesets.len();
        }
        {
            let mut animations = write_or_recover(&self.animations, "tile_cache.animations");
            let before = animations.len();
            animations.retain(|key, _| &key.map != identity);
            removed += before - animations.len();
        }
        {
            let mut flags = write_or_recover(&self.has_animation, "tile_cache.has_animation");
            let before = flags.len();
            flags.retain(|key, _| &key.map != identity);
            removed += before - flags.len();
        }
        debug!(map = %identity, removed, "tile_cache_evicted");
        removed
    }

    pub fn stats(&self) -> TileCacheStats {
        TileCacheStats {
            tileset_entries: read_or_recover(&self.tilesets, "tile_cache.tilesets").len(),
            animation_entries: read_or_recover(&self.animations, "tile_cache.animations").len(),
            animation_flags: read_or_recover(&self.has_animation, "tile_cache.has_animation")
                .len(),
            tileset_scans: self.tileset_scans.load(Ordering::Relaxed),
        }
    }

    fn scan(&self, map: &Map, grid_id: GridId) -> Option<Arc<Tileset>> {
        self.tileset_scans.fetch_add(1, Ordering::Relaxed);
        map.tilesets
            .iter()
            .find(|tileset| tileset.contains(grid_id))
            .cloned()
    }
}
