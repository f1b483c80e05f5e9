use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::geometry::{Size, Vec2};

/// Global tile identifier spanning every tileset of a map. `0` means "no tile".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridId(pub u32);

impl GridId {
    pub const EMPTY: GridId = GridId(0);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable name of a loaded map; namespaces every per-tile cache entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MapIdentity(Arc<str>);

impl MapIdentity {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub grid_id: GridId,
    pub grid_location: GridPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TileLayerError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
}

/// Row-major grid of global ids for one tile layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    name: String,
    width: u32,
    height: u32,
    grid_ids: Vec<GridId>,
}

impl TileLayer {
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        grid_ids: Vec<GridId>,
    ) -> Result<Self, TileLayerError> {
        let expected = width as usize * height as usize;
        let actual = grid_ids.len();
        if expected != actual {
            return Err(TileLayerError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            name: name.into(),
            width,
            height,
            grid_ids,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn grid_ids(&self) -> &[GridId] {
        &self.grid_ids
    }

    fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// The tile at `(x, y)`, or `None` when out of bounds or empty.
    pub fn tile(&self, x: i32, y: i32) -> Option<Tile> {
        let grid_id = self
            .index_of(x, y)
            .and_then(|index| self.grid_ids.get(index).copied())?;
        if grid_id.is_empty() {
            return None;
        }
        Some(Tile {
            grid_id,
            grid_location: GridPoint { x, y },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terrain {
    pub name: String,
    pub tile: i32,
}

/// Terrain for the four corners of a tile: top-left, top-right, bottom-left, bottom-right.
pub type TerrainCorners = [Option<Terrain>; 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationFrame {
    pub tile_id: u32,
    pub duration_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileAnimation {
    frames: Vec<AnimationFrame>,
}

impl TileAnimation {
    pub fn new(frames: Vec<AnimationFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[AnimationFrame] {
        &self.frames
    }
}

/// Per-tile metadata stored by local tile index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TilesetTile {
    pub terrain: [Option<usize>; 4],
    pub animation: Option<Arc<TileAnimation>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    pub name: String,
    pub first_grid_id: u32,
    pub tile_count: u32,
    pub tile_size: TileSize,
    pub columns: u32,
    pub terrain_types: Vec<Terrain>,
    pub tiles: HashMap<u32, TilesetTile>,
}

impl Tileset {
    /// One past the last claimed id, widened so a range ending at `u32::MAX` fits.
    fn end_grid_id(&self) -> u64 {
        u64::from(self.first_grid_id) + u64::from(self.tile_count)
    }

    /// Last claimed id, clamped to `u32::MAX`. Meaningless when `tile_count` is zero.
    pub fn last_grid_id(&self) -> u32 {
        u32::try_from(self.end_grid_id().saturating_sub(1)).unwrap_or(u32::MAX)
    }

    pub fn contains(&self, grid_id: GridId) -> bool {
        let id = u64::from(grid_id.0);
        id >= u64::from(self.first_grid_id) && id < self.end_grid_id()
    }

    fn local_id(&self, grid_id: GridId) -> Option<u32> {
        self.contains(grid_id)
            .then(|| grid_id.0 - self.first_grid_id)
    }

    pub fn terrain(&self, grid_id: GridId) -> TerrainCorners {
        let mut corners = TerrainCorners::default();
        let Some(tile) = self
            .local_id(grid_id)
            .and_then(|local| self.tiles.get(&local))
        else {
            return corners;
        };
        for (slot, terrain_index) in corners.iter_mut().zip(tile.terrain) {
            *slot = terrain_index.and_then(|index| self.terrain_types.get(index).cloned());
        }
        corners
    }

    pub fn animation(&self, grid_id: GridId) -> Option<Arc<TileAnimation>> {
        self.local_id(grid_id)
            .and_then(|local| self.tiles.get(&local))
            .and_then(|tile| tile.animation.clone())
    }
}

/// String-keyed custom properties authored on a map object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomProperties {
    values: BTreeMap<String, String>,
}

impl CustomProperties {
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CustomProperties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut properties = CustomProperties::default();
        for (name, value) in iter {
            properties.insert(name, value);
        }
        properties
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polyline {
    /// Points relative to the owning object's location; the first one is the origin.
    pub points: Vec<Vec2>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapObject {
    pub id: u32,
    pub name: String,
    pub object_type: String,
    pub location: Vec2,
    pub dimension: Size,
    pub polyline: Option<Polyline>,
    pub properties: CustomProperties,
}

impl MapObject {
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapObjectLayer {
    pub name: String,
    pub objects: Vec<MapObject>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    pub identity: MapIdentity,
    pub width: u32,
    pub height: u32,
    pub tile_size: TileSize,
    pub tile_layers: Vec<TileLayer>,
    pub object_layers: Vec<MapObjectLayer>,
    pub tilesets: Vec<Arc<Tileset>>,
}

impl Map {
    pub fn object_count(&self) -> usize {
        self.object_layers
            .iter()
            .map(|layer| layer.objects.len())
            .sum()
    }
}
