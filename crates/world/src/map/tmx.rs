use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use roxmltree::{Document, Node};
use tracing::debug;

use crate::geometry::{Size, Vec2};

use super::types::{
    AnimationFrame, CustomProperties, GridId, Map, MapIdentity, MapObject, MapObjectLayer,
    Polyline, Terrain, TileAnimation, TileLayer, TileSize, Tileset, TilesetTile,
};

/// Tiled stores flip/rotation flags in the top bits of every gid.
const GID_FLAG_MASK: u32 = 0x1FFF_FFFF;

/// Source of immutable maps; the environment only depends on this contract.
pub trait MapLoader {
    fn load_map(&self, path: &Path) -> Result<Map, MapLoadError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    MissingAttribute,
    InvalidValue,
    UnsupportedEncoding,
    TileCountMismatch,
}

#[derive(Debug, Clone)]
pub struct MapLoadError {
    pub code: MapErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for MapLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for MapLoadError {}

/// Loader for Tiled `.tmx` maps with inline or external (`.tsx`) tilesets.
#[derive(Debug, Clone, Copy, Default)]
pub struct TmxMapLoader;

impl MapLoader for TmxMapLoader {
    fn load_map(&self, path: &Path) -> Result<Map, MapLoadError> {
        let raw = fs::read_to_string(path).map_err(|source| read_error(path, source))?;
        // Full canonical path: maps sharing a file name in different folders
        // must not share tile cache entries.
        let identity = fs::canonicalize(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .display()
            .to_string();
        let map = parse_map_document(&identity, path, path.parent(), &raw)?;
        debug!(
            map = %map.identity,
            path = %path.display(),
            tilesets = map.tilesets.len(),
            tile_layers = map.tile_layers.len(),
            object_layers = map.object_layers.len(),
            "tmx_map_parsed"
        );
        Ok(map)
    }
}

impl TmxMapLoader {
    /// Parses a map held in memory. External tilesets are not available here.
    pub fn parse_str(&self, identity: &str, raw: &str) -> Result<Map, MapLoadError> {
        parse_map_document(identity, Path::new(identity), None, raw)
    }
}

struct ParseContext<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl ParseContext<'_, '_> {
    fn error_at(&self, code: MapErrorCode, message: String, node: Node<'_, '_>) -> MapLoadError {
        let pos = self.doc.text_pos_at(node.range().start);
        MapLoadError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }

    fn required_attr<T: FromStr>(&self, node: Node<'_, '_>, name: &str) -> Result<T, MapLoadError> {
        match self.optional_attr(node, name)? {
            Some(value) => Ok(value),
            None => Err(self.error_at(
                MapErrorCode::MissingAttribute,
                format!(
                    "missing required attribute '{}' on <{}>",
                    name,
                    node.tag_name().name()
                ),
                node,
            )),
        }
    }

    fn optional_attr<T: FromStr>(
        &self,
        node: Node<'_, '_>,
        name: &str,
    ) -> Result<Option<T>, MapLoadError> {
        let Some(raw) = node.attribute(name) else {
            return Ok(None);
        };
        raw.trim().parse::<T>().map(Some).map_err(|_| {
            self.error_at(
                MapErrorCode::InvalidValue,
                format!(
                    "attribute '{}' on <{}> has invalid value '{}'",
                    name,
                    node.tag_name().name(),
                    raw
                ),
                node,
            )
        })
    }
}

fn parse_xml<'input>(file_path: &Path, raw: &'input str) -> Result<Document<'input>, MapLoadError> {
    Document::parse(raw).map_err(|error| MapLoadError {
        code: MapErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })
}

fn parse_map_document(
    identity: &str,
    file_path: &Path,
    base_dir: Option<&Path>,
    raw: &str,
) -> Result<Map, MapLoadError> {
    let doc = parse_xml(file_path, raw)?;
    let ctx = ParseContext {
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "map" {
        return Err(ctx.error_at(
            MapErrorCode::InvalidRoot,
            "root element must be <map>".to_string(),
            root,
        ));
    }

    let width: u32 = ctx.required_attr(root, "width")?;
    let height: u32 = ctx.required_attr(root, "height")?;
    let tile_size = TileSize {
        width: ctx.required_attr(root, "tilewidth")?,
        height: ctx.required_attr(root, "tileheight")?,
    };
    if tile_size.width == 0 || tile_size.height == 0 {
        return Err(ctx.error_at(
            MapErrorCode::InvalidValue,
            "tilewidth and tileheight must be > 0".to_string(),
            root,
        ));
    }

    let mut tilesets = Vec::new();
    let mut tile_layers = Vec::new();
    let mut object_layers = Vec::new();

    for child in root.children().filter(|node| node.is_element()) {
        match child.tag_name().name() {
            "tileset" => {
                let first_grid_id: u32 = ctx.required_attr(child, "firstgid")?;
                let tileset = match child.attribute("source") {
                    Some(source) => {
                        load_external_tileset(&ctx, child, base_dir, source, first_grid_id)?
                    }
                    None => parse_tileset(&ctx, child, first_grid_id)?,
                };
                check_grid_id_range(&ctx, child, &tileset)?;
                tilesets.push(Arc::new(tileset));
            }
            "layer" => tile_layers.push(parse_tile_layer(&ctx, child, width, height)?),
            "objectgroup" => object_layers.push(parse_object_layer(&ctx, child)?),
            other => debug!(element = other, map = identity, "tmx_element_ignored"),
        }
    }

    Ok(Map {
        identity: MapIdentity::new(identity),
        width,
        height,
        tile_size,
        tile_layers,
        object_layers,
        tilesets,
    })
}

/// Tileset ranges must start at 1 and end within the unflagged id space.
fn check_grid_id_range(
    ctx: &ParseContext<'_, '_>,
    node: Node<'_, '_>,
    tileset: &Tileset,
) -> Result<(), MapLoadError> {
    let end = u64::from(tileset.first_grid_id) + u64::from(tileset.tile_count);
    if tileset.first_grid_id == 0 || end > u64::from(GID_FLAG_MASK) + 1 {
        return Err(ctx.error_at(
            MapErrorCode::InvalidValue,
            format!(
                "tileset '{}' range firstgid={} tilecount={} exceeds grid id {}",
                tileset.name, tileset.first_grid_id, tileset.tile_count, GID_FLAG_MASK
            ),
            node,
        ));
    }
    Ok(())
}

fn load_external_tileset(
    ctx: &ParseContext<'_, '_>,
    node: Node<'_, '_>,
    base_dir: Option<&Path>,
    source: &str,
    first_grid_id: u32,
) -> Result<Tileset, MapLoadError> {
    let Some(base_dir) = base_dir else {
        return Err(ctx.error_at(
            MapErrorCode::ReadFile,
            format!("external tileset '{source}' cannot be resolved without a map directory"),
            node,
        ));
    };
    let tsx_path = base_dir.join(source);
    let raw = fs::read_to_string(&tsx_path).map_err(|error| read_error(&tsx_path, error))?;
    let doc = parse_xml(&tsx_path, &raw)?;
    let tsx_ctx = ParseContext {
        file_path: &tsx_path,
        doc: &doc,
    };
    let root = doc.root_element();
    if root.tag_name().name() != "tileset" {
        return Err(tsx_ctx.error_at(
            MapErrorCode::InvalidRoot,
            "root element must be <tileset>".to_string(),
            root,
        ));
    }
    parse_tileset(&tsx_ctx, root, first_grid_id)
}

fn parse_tileset(
    ctx: &ParseContext<'_, '_>,
    node: Node<'_, '_>,
    first_grid_id: u32,
) -> Result<Tileset, MapLoadError> {
    let tile_size = TileSize {
        width: ctx.optional_attr(node, "tilewidth")?.unwrap_or(0),
        height: ctx.optional_attr(node, "tileheight")?.unwrap_or(0),
    };
    let image = node
        .children()
        .find(|child| child.is_element() && child.tag_name().name() == "image");
    let image_size = match image {
        Some(image) => Some((
            ctx.optional_attr::<u32>(image, "width")?.unwrap_or(0),
            ctx.optional_attr::<u32>(image, "height")?.unwrap_or(0),
        )),
        None => None,
    };

    let columns = match ctx.optional_attr::<u32>(node, "columns")? {
        Some(columns) => columns,
        None => match image_size {
            Some((image_width, _)) if tile_size.width > 0 => image_width / tile_size.width,
            _ => 0,
        },
    };
    let tile_count = match ctx.optional_attr::<u32>(node, "tilecount")? {
        Some(count) => count,
        None => match image_size {
            Some((_, image_height)) if tile_size.height > 0 => columns
                .checked_mul(image_height / tile_size.height)
                .ok_or_else(|| {
                    ctx.error_at(
                        MapErrorCode::InvalidValue,
                        format!("tile count derived from image overflows ({columns} columns)"),
                        node,
                    )
                })?,
            _ => {
                return Err(ctx.error_at(
                    MapErrorCode::MissingAttribute,
                    "tileset needs 'tilecount' or an <image> with dimensions".to_string(),
                    node,
                ))
            }
        },
    };

    let mut terrain_types = Vec::new();
    let mut tiles = HashMap::new();
    for child in node.children().filter(|child| child.is_element()) {
        match child.tag_name().name() {
            "terraintypes" => {
                for terrain in child
                    .children()
                    .filter(|t| t.is_element() && t.tag_name().name() == "terrain")
                {
                    terrain_types.push(Terrain {
                        name: terrain.attribute("name").unwrap_or_default().to_string(),
                        tile: ctx.optional_attr(terrain, "tile")?.unwrap_or(-1),
                    });
                }
            }
            "tile" => {
                let local_id: u32 = ctx.required_attr(child, "id")?;
                tiles.insert(local_id, parse_tileset_tile(ctx, child)?);
            }
            _ => {}
        }
    }

    Ok(Tileset {
        name: node.attribute("name").unwrap_or_default().to_string(),
        first_grid_id,
        tile_count,
        tile_size,
        columns,
        terrain_types,
        tiles,
    })
}

fn parse_tileset_tile(
    ctx: &ParseContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<TilesetTile, MapLoadError> {
    let mut tile = TilesetTile::default();
    if let Some(raw) = node.attribute("terrain") {
        for (slot, part) in tile.terrain.iter_mut().zip(raw.split(',')) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            *slot = Some(part.parse::<usize>().map_err(|_| {
                ctx.error_at(
                    MapErrorCode::InvalidValue,
                    format!("terrain corner '{part}' is not a terrain index"),
                    node,
                )
            })?);
        }
    }

    if let Some(animation) = node
        .children()
        .find(|child| child.is_element() && child.tag_name().name() == "animation")
    {
        let mut frames = Vec::new();
        for frame in animation
            .children()
            .filter(|child| child.is_element() && child.tag_name().name() == "frame")
        {
            frames.push(AnimationFrame {
                tile_id: ctx.required_attr(frame, "tileid")?,
                duration_ms: ctx.required_attr(frame, "duration")?,
            });
        }
        if !frames.is_empty() {
            tile.animation = Some(Arc::new(TileAnimation::new(frames)));
        }
    }
    Ok(tile)
}

fn parse_tile_layer(
    ctx: &ParseContext<'_, '_>,
    node: Node<'_, '_>,
    map_width: u32,
    map_height: u32,
) -> Result<TileLayer, MapLoadError> {
    let width = ctx.optional_attr(node, "width")?.unwrap_or(map_width);
    let height = ctx.optional_attr(node, "height")?.unwrap_or(map_height);
    let Some(data) = node
        .children()
        .find(|child| child.is_element() && child.tag_name().name() == "data")
    else {
        return Err(ctx.error_at(
            MapErrorCode::MissingAttribute,
            "tile layer has no <data> element".to_string(),
            node,
        ));
    };
    if data
        .children()
        .any(|child| child.is_element() && child.tag_name().name() == "chunk")
    {
        return Err(ctx.error_at(
            MapErrorCode::UnsupportedEncoding,
            "chunked (infinite) tile layers are not supported".to_string(),
            data,
        ));
    }

    let grid_ids = match data.attribute("encoding") {
        Some("csv") => parse_csv_grid_ids(ctx, data)?,
        None => {
            let mut ids = Vec::new();
            for tile in data
                .children()
                .filter(|child| child.is_element() && child.tag_name().name() == "tile")
            {
                let gid: u32 = ctx.optional_attr(tile, "gid")?.unwrap_or(0);
                ids.push(GridId(gid & GID_FLAG_MASK));
            }
            ids
        }
        Some(other) => {
            return Err(ctx.error_at(
                MapErrorCode::UnsupportedEncoding,
                format!("tile data encoding '{other}' is not supported; use csv or xml"),
                data,
            ))
        }
    };

    let name = node.attribute("name").unwrap_or_default();
    TileLayer::new(name, width, height, grid_ids).map_err(|error| {
        ctx.error_at(
            MapErrorCode::TileCountMismatch,
            format!("layer '{name}': {error}"),
            data,
        )
    })
}

fn parse_csv_grid_ids(
    ctx: &ParseContext<'_, '_>,
    data: Node<'_, '_>,
) -> Result<Vec<GridId>, MapLoadError> {
    data.text()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u32>()
                .map(|gid| GridId(gid & GID_FLAG_MASK))
                .map_err(|_| {
                    ctx.error_at(
                        MapErrorCode::InvalidValue,
                        format!("tile gid '{part}' is not a valid number"),
                        data,
                    )
                })
        })
        .collect()
}

fn parse_object_layer(
    ctx: &ParseContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<MapObjectLayer, MapLoadError> {
    let mut objects = Vec::new();
    for object in node
        .children()
        .filter(|child| child.is_element() && child.tag_name().name() == "object")
    {
        objects.push(parse_map_object(ctx, object)?);
    }
    Ok(MapObjectLayer {
        name: node.attribute("name").unwrap_or_default().to_string(),
        objects,
    })
}

fn parse_map_object(
    ctx: &ParseContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<MapObject, MapLoadError> {
    let object_type = node
        .attribute("type")
        .or_else(|| node.attribute("class"))
        .unwrap_or_default()
        .trim()
        .to_string();

    let mut properties = CustomProperties::default();
    let mut polyline = None;
    for child in node.children().filter(|child| child.is_element()) {
        match child.tag_name().name() {
            "properties" => {
                for property in child
                    .children()
                    .filter(|p| p.is_element() && p.tag_name().name() == "property")
                {
                    let name: String = ctx.required_attr(property, "name")?;
                    let value = property
                        .attribute("value")
                        .or_else(|| property.text())
                        .unwrap_or_default();
                    properties.insert(name, value);
                }
            }
            "polyline" => {
                let raw = child.attribute("points").unwrap_or_default();
                polyline = Some(Polyline {
                    points: parse_points(ctx, child, raw)?,
                });
            }
            _ => {}
        }
    }

    Ok(MapObject {
        id: ctx.required_attr(node, "id")?,
        name: node.attribute("name").unwrap_or_default().to_string(),
        object_type,
        location: Vec2::new(
            ctx.optional_attr(node, "x")?.unwrap_or(0.0),
            ctx.optional_attr(node, "y")?.unwrap_or(0.0),
        ),
        dimension: Size::new(
            ctx.optional_attr(node, "width")?.unwrap_or(0.0),
            ctx.optional_attr(node, "height")?.unwrap_or(0.0),
        ),
        polyline,
        properties,
    })
}

fn parse_points(
    ctx: &ParseContext<'_, '_>,
    node: Node<'_, '_>,
    raw: &str,
) -> Result<Vec<Vec2>, MapLoadError> {
    raw.split_whitespace()
        .map(|pair| {
            let parsed = pair
                .split_once(',')
                .and_then(|(x, y)| Some(Vec2::new(x.parse().ok()?, y.parse().ok()?)));
            parsed.ok_or_else(|| {
                ctx.error_at(
                    MapErrorCode::InvalidValue,
                    format!("polyline point '{pair}' must be 'x,y'"),
                    node,
                )
            })
        })
        .collect()
}

fn read_error(path: &Path, source: std::io::Error) -> MapLoadError {
    MapLoadError {
        code: MapErrorCode::ReadFile,
        message: format!("failed to read map file: {source}"),
        file_path: path.to_path_buf(),
        location: None,
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    const SAMPLE_MAP: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.0" orientation="orthogonal" width="3" height="2" tilewidth="16" tileheight="16">
  <tileset firstgid="1" name="ground" tilewidth="16" tileheight="16" tilecount="10" columns="5">
    <terraintypes>
      <terrain name="grass" tile="0"/>
      <terrain name="dirt" tile="4"/>
    </terraintypes>
    <tile id="2" terrain="0,0,1,">
      <animation>
        <frame tileid="2" duration="100"/>
        <frame tileid="3" duration="150"/>
      </animation>
    </tile>
  </tileset>
  <layer name="ground" width="3" height="2">
    <data encoding="csv">
1,2,3,
0,2147483653,6
</data>
  </layer>
  <layer name="decor" width="3" height="2">
    <data>
      <tile gid="0"/><tile gid="4"/><tile/>
      <tile/><tile/><tile gid="9"/>
    </data>
  </layer>
  <objectgroup name="objects">
    <object id="4" name="lamp" type="LIGHTSOURCE" x="10" y="20" width="32" height="32">
      <properties>
        <property name="LIGHTBRIGHTNESS" value="180"/>
        <property name="LIGHTCOLOR" value="#ffcc00"/>
      </properties>
    </object>
    <object id="9" class="COLLISIONBOX" x="0" y="0" width="48" height="8"/>
    <object id="12" x="5" y="5">
      <polyline points="0,0 10,0 10,10"/>
    </object>
  </objectgroup>
</map>"##;

    #[test]
    fn parses_layers_tilesets_and_objects() {
        let map = TmxMapLoader.parse_str("sample.tmx", SAMPLE_MAP).expect("map");
        assert_eq!(map.identity.as_str(), "sample.tmx");
        assert_eq!((map.width, map.height), (3, 2));
        assert_eq!(map.tile_size, TileSize { width: 16, height: 16 });
        assert_eq!(map.tile_layers.len(), 2);
        assert_eq!(map.object_layers.len(), 1);
        assert_eq!(map.object_count(), 3);

        let ground = &map.tile_layers[0];
        assert_eq!(ground.tile(0, 0).map(|t| t.grid_id), Some(GridId(1)));
        assert_eq!(ground.tile(0, 1), None);
        assert_eq!(ground.tile(1, 1).map(|t| t.grid_id), Some(GridId(5)));
        let decor = &map.tile_layers[1];
        assert_eq!(decor.tile(1, 0).map(|t| t.grid_id), Some(GridId(4)));
        assert_eq!(decor.tile(2, 1).map(|t| t.grid_id), Some(GridId(9)));

        let tileset = &map.tilesets[0];
        assert_eq!(tileset.first_grid_id, 1);
        assert_eq!(tileset.last_grid_id(), 10);
        assert_eq!(tileset.terrain_types.len(), 2);
        let animation = tileset.animation(GridId(3)).expect("animation");
        assert_eq!(animation.frames().len(), 2);
        assert_eq!(tileset.terrain(GridId(3))[2].as_ref().map(|t| t.name.as_str()), Some("dirt"));
        assert!(tileset.terrain(GridId(3))[3].is_none());

        let objects = &map.object_layers[0].objects;
        assert_eq!(objects[0].object_type, "LIGHTSOURCE");
        assert_eq!(objects[0].property("LIGHTCOLOR"), Some("#ffcc00"));
        assert_eq!(objects[1].object_type, "COLLISIONBOX");
        assert_eq!(objects[2].object_type, "");
        let polyline = objects[2].polyline.as_ref().expect("polyline");
        assert_eq!(polyline.points.len(), 3);
        assert_eq!(polyline.points[2], Vec2::new(10.0, 10.0));
    }

    #[test]
    fn loads_external_tileset_relative_to_map() {
        let temp = TempDir::new().expect("temp");
        write_file(
            &temp.path().join("tiles").join("props.tsx"),
            r#"<tileset name="props" tilewidth="16" tileheight="16" tilecount="20" columns="4">
                <tile id="0"><animation><frame tileid="0" duration="50"/></animation></tile>
            </tileset>"#,
        );
        let map_path = temp.path().join("level1.tmx");
        write_file(
            &map_path,
            r#"<map width="1" height="1" tilewidth="16" tileheight="16">
                <tileset firstgid="11" source="tiles/props.tsx"/>
                <layer name="l"><data encoding="csv">11</data></layer>
            </map>"#,
        );
        let map = TmxMapLoader.load_map(&map_path).expect("map");
        let canonical = fs::canonicalize(&map_path).expect("canonical");
        assert_eq!(map.identity.as_str(), canonical.display().to_string());
        assert_eq!(map.tilesets[0].name, "props");
        assert_eq!(map.tilesets[0].first_grid_id, 11);
        assert_eq!(map.tilesets[0].last_grid_id(), 30);
        assert!(map.tilesets[0].animation(GridId(11)).is_some());
    }

    #[test]
    fn tilecount_falls_back_to_image_dimensions() {
        let map = TmxMapLoader
            .parse_str(
                "img.tmx",
                r#"<map width="1" height="1" tilewidth="8" tileheight="8">
                    <tileset firstgid="1" tilewidth="8" tileheight="8">
                        <image source="a.png" width="32" height="16"/>
                    </tileset>
                </map>"#,
            )
            .expect("map");
        assert_eq!(map.tilesets[0].columns, 4);
        assert_eq!(map.tilesets[0].tile_count, 8);
    }

    #[test]
    fn same_file_name_in_different_folders_gets_distinct_identities() {
        let temp = TempDir::new().expect("temp");
        let level = r#"<map width="1" height="1" tilewidth="16" tileheight="16"/>"#;
        let first = temp.path().join("a").join("level.tmx");
        let second = temp.path().join("b").join("level.tmx");
        write_file(&first, level);
        write_file(&second, level);

        let first = TmxMapLoader.load_map(&first).expect("first");
        let second = TmxMapLoader.load_map(&second).expect("second");
        assert_ne!(first.identity, second.identity);
        assert!(first.identity.as_str().ends_with("level.tmx"));
    }

    #[test]
    fn tileset_range_past_grid_id_space_is_rejected() {
        let map_with = |first_grid_id: u32| {
            format!(
                r#"<map width="1" height="1" tilewidth="8" tileheight="8">
                    <tileset firstgid="{first_grid_id}" name="t" tilecount="2"/>
                </map>"#
            )
        };
        for first_grid_id in [u32::MAX, GID_FLAG_MASK, 0] {
            let err = TmxMapLoader
                .parse_str("range.tmx", &map_with(first_grid_id))
                .expect_err("err");
            assert_eq!(err.code, MapErrorCode::InvalidValue, "firstgid {first_grid_id}");
            assert!(err.location.is_some());
        }

        let map = TmxMapLoader
            .parse_str("edge.tmx", &map_with(GID_FLAG_MASK - 1))
            .expect("map");
        assert_eq!(map.tilesets[0].last_grid_id(), GID_FLAG_MASK);
    }

    #[test]
    fn overflowing_image_tile_count_is_rejected() {
        let err = TmxMapLoader
            .parse_str(
                "huge.tmx",
                r#"<map width="1" height="1" tilewidth="1" tileheight="1">
                    <tileset firstgid="1" tilewidth="1" tileheight="1">
                        <image source="a.png" width="100000" height="100000"/>
                    </tileset>
                </map>"#,
            )
            .expect_err("err");
        assert_eq!(err.code, MapErrorCode::InvalidValue);
    }

    #[test]
    fn base64_data_is_rejected() {
        let err = TmxMapLoader
            .parse_str(
                "b64.tmx",
                r#"<map width="1" height="1" tilewidth="8" tileheight="8">
                    <layer name="l"><data encoding="base64">AQAAAA==</data></layer>
                </map>"#,
            )
            .expect_err("err");
        assert_eq!(err.code, MapErrorCode::UnsupportedEncoding);
        assert!(err.location.is_some());
    }

    #[test]
    fn tile_count_mismatch_is_reported() {
        let err = TmxMapLoader
            .parse_str(
                "short.tmx",
                r#"<map width="2" height="2" tilewidth="8" tileheight="8">
                    <layer name="l"><data encoding="csv">1,2,3</data></layer>
                </map>"#,
            )
            .expect_err("err");
        assert_eq!(err.code, MapErrorCode::TileCountMismatch);
    }

    #[test]
    fn missing_object_id_reports_location() {
        let err = TmxMapLoader
            .parse_str(
                "noid.tmx",
                r#"<map width="1" height="1" tilewidth="8" tileheight="8">
                    <objectgroup><object type="PROP" x="1" y="1"/></objectgroup>
                </map>"#,
            )
            .expect_err("err");
        assert_eq!(err.code, MapErrorCode::MissingAttribute);
        assert_eq!(err.location.map(|loc| loc.line), Some(2));
    }

    #[test]
    fn malformed_xml_and_wrong_root_are_distinguished() {
        let malformed = TmxMapLoader
            .parse_str("bad.tmx", "<map><layer></map>")
            .expect_err("err");
        assert_eq!(malformed.code, MapErrorCode::XmlMalformed);
        assert!(malformed.location.is_some());

        let wrong_root = TmxMapLoader
            .parse_str("root.tmx", "<tileset/>")
            .expect_err("err");
        assert_eq!(wrong_root.code, MapErrorCode::InvalidRoot);
    }

    #[test]
    fn missing_file_is_read_error() {
        let temp = TempDir::new().expect("temp");
        let err = TmxMapLoader
            .load_map(&temp.path().join("absent.tmx"))
            .expect_err("err");
        assert_eq!(err.code, MapErrorCode::ReadFile);
        assert!(err.location.is_none());
    }
}
