use crate::geometry::{Path, Rect, Vec2};

use super::types::{GridPoint, Map, MapObject, Tile};

/// Grid coordinate containing a pixel location (floor division by the cell size).
pub fn tile_location(map: &Map, point: Vec2) -> GridPoint {
    GridPoint {
        x: (point.x / map.tile_size.width as f32).floor() as i32,
        y: (point.y / map.tile_size.height as f32).floor() as i32,
    }
}

pub fn tile_bounding_box(map: &Map, grid: GridPoint) -> Rect {
    let width = map.tile_size.width as f32;
    let height = map.tile_size.height as f32;
    Rect::new(grid.x as f32 * width, grid.y as f32 * height, width, height)
}

pub fn tile_bounding_box_at_pixel(map: &Map, point: Vec2) -> Rect {
    tile_bounding_box(map, tile_location(map, point))
}

/// One entry per tile layer (in layer order) that has a tile under `point`.
pub fn tiles_at_pixel(map: &Map, point: Vec2) -> Vec<Tile> {
    let grid = tile_location(map, point);
    map.tile_layers
        .iter()
        .filter_map(|layer| layer.tile(grid.x, grid.y))
        .collect()
}

/// Absolute path for an authored polyline: the object location followed by
/// every point after the implicit origin, translated by that location.
pub fn polyline_path(object: &MapObject) -> Option<Path> {
    let polyline = object.polyline.as_ref()?;
    if polyline.points.is_empty() {
        return None;
    }
    let mut points = Vec::with_capacity(polyline.points.len());
    points.push(object.location);
    points.extend(polyline_points(object));
    Some(Path { points })
}

/// The authored polyline points after the origin, in world coordinates.
pub fn polyline_points(object: &MapObject) -> Vec<Vec2> {
    let Some(polyline) = object.polyline.as_ref() else {
        return Vec::new();
    };
    polyline
        .points
        .iter()
        .skip(1)
        .map(|point| object.location.offset(point.x, point.y))
        .collect()
}

/// Largest authored object id, or 0 for a map without objects.
pub fn max_object_id(map: &Map) -> u32 {
    map.object_layers
        .iter()
        .flat_map(|layer| layer.objects.iter())
        .map(|object| object.id)
        .max()
        .unwrap_or(0)
}

pub fn find_map_object(map: &Map, id: u32) -> Option<&MapObject> {
    map.object_layers
        .iter()
        .flat_map(|layer| layer.objects.iter())
        .find(|object| object.id == id)
}
