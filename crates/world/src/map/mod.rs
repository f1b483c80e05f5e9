mod cache;
mod lookup;
mod tmx;
mod types;

pub use cache::{TileCache, TileCacheStats, TileKey};
pub use lookup::{
    find_map_object, max_object_id, polyline_path, polyline_points, tile_bounding_box,
    tile_bounding_box_at_pixel, tile_location, tiles_at_pixel,
};
pub use tmx::{MapErrorCode, MapLoadError, MapLoader, SourceLocation, TmxMapLoader};
pub use types::{
    AnimationFrame, CustomProperties, GridId, GridPoint, Map, MapIdentity, MapObject,
    MapObjectLayer, Polyline, Terrain, TerrainCorners, Tile, TileAnimation, TileLayer,
    TileLayerError, TileSize, Tileset, TilesetTile,
};
