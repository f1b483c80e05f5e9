use std::collections::BTreeSet;

use serde::Serialize;
use tracing::info;
use world::{
    EntityId, Environment, EnvironmentServices, EnvironmentState, GridId, InitSummary, Rect,
    Shape, TmxMapLoader,
};

use super::bootstrap::{ProbeError, ProbeWiring};

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TileReport {
    pub(crate) distinct_grid_ids: usize,
    pub(crate) animated: usize,
    pub(crate) unresolved: usize,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct QueryReport {
    pub(crate) area: Rect,
    pub(crate) hits: Vec<EntityId>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ProbeReport {
    pub(crate) map: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) tilesets: usize,
    pub(crate) objects: usize,
    pub(crate) state: EnvironmentState,
    pub(crate) init: InitSummary,
    pub(crate) combat_entities: usize,
    pub(crate) movable_entities: usize,
    pub(crate) props: usize,
    pub(crate) light_sources: usize,
    pub(crate) tiles: TileReport,
    pub(crate) query: Option<QueryReport>,
    pub(crate) evicted_cache_entries: usize,
}

pub(crate) fn run_probe(wiring: &ProbeWiring) -> Result<ProbeReport, ProbeError> {
    let services = EnvironmentServices::default().with_config(wiring.config.clone());
    let environment = Environment::load(&wiring.map_path, &TmxMapLoader, services)?;
    let init = environment.init()?;

    let tiles = tile_report(&environment);
    let query = wiring.query.map(|area| QueryReport {
        area,
        hits: environment
            .find_combat_entities(&Shape::Rect(area))
            .iter()
            .map(|entity| entity.id())
            .collect(),
    });
    if let Some(query) = &query {
        info!(hits = query.hits.len(), area = ?query.area, "probe_query_completed");
    }

    let map = environment.map();
    let mut report = ProbeReport {
        map: map.identity.to_string(),
        width: map.width,
        height: map.height,
        tilesets: map.tilesets.len(),
        objects: map.object_count(),
        state: environment.state(),
        init,
        combat_entities: environment.combat_entities().len(),
        movable_entities: environment.movable_entities().len(),
        props: environment.props().len(),
        light_sources: environment.light_sources().len(),
        tiles,
        query,
        evicted_cache_entries: 0,
    };
    report.evicted_cache_entries = environment.unload();
    Ok(report)
}

fn tile_report(environment: &Environment) -> TileReport {
    let grid_ids = environment
        .map()
        .tile_layers
        .iter()
        .flat_map(|layer| layer.grid_ids().iter().copied())
        .filter(|grid_id| !grid_id.is_empty())
        .collect::<BTreeSet<GridId>>();
    let unresolved = grid_ids
        .iter()
        .filter(|grid_id| environment.tileset_for(**grid_id).is_none())
        .count();
    let animated = grid_ids
        .iter()
        .filter(|grid_id| environment.animation_for(**grid_id).is_some())
        .count();
    TileReport {
        distinct_grid_ids: grid_ids.len(),
        animated,
        unresolved,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use world::WorldConfig;

    use super::*;

    const LEVEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="3" height="1" tilewidth="16" tileheight="16">
  <tileset firstgid="1" name="water" tilewidth="16" tileheight="16" tilecount="4" columns="2">
    <tile id="0">
      <animation>
        <frame tileid="0" duration="100"/>
        <frame tileid="1" duration="100"/>
      </animation>
    </tile>
  </tileset>
  <layer id="1" name="floor" width="3" height="1">
    <data encoding="csv">1,2,40</data>
  </layer>
  <objectgroup id="2" name="objects">
    <object id="5" type="PROP" x="0" y="0" width="16" height="16">
      <properties>
        <property name="SPRITESHEETNAME" value="barrel"/>
        <property name="MATERIAL" value="WOOD"/>
        <property name="HEALTH" value="10"/>
        <property name="COLLISION" value="true"/>
      </properties>
    </object>
    <object id="6" type="LIGHTSOURCE" x="32" y="0" width="48" height="48">
      <properties>
        <property name="LIGHTBRIGHTNESS" value="90"/>
      </properties>
    </object>
  </objectgroup>
</map>"#;

    #[test]
    fn probe_reports_environment_and_query() {
        let temp = TempDir::new().expect("temp");
        let map_path = temp.path().join("level.tmx");
        fs::write(&map_path, LEVEL).expect("write");

        let report = run_probe(&ProbeWiring {
            map_path,
            config: WorldConfig::default(),
            query: Some(Rect::new(8.0, 8.0, 4.0, 4.0)),
        })
        .expect("probe");

        let canonical = fs::canonicalize(temp.path().join("level.tmx")).expect("canonical");
        assert_eq!(report.map, canonical.display().to_string());
        assert_eq!(report.state, EnvironmentState::Ready);
        assert_eq!(report.init.props, 1);
        assert_eq!(report.init.light_sources_skipped, 1);
        assert_eq!(report.combat_entities, 1);
        assert_eq!(report.light_sources, 0);
        assert_eq!(report.tiles.distinct_grid_ids, 3);
        assert_eq!(report.tiles.animated, 1);
        assert_eq!(report.tiles.unresolved, 1);
        let query = report.query.expect("query");
        assert_eq!(query.hits, vec![EntityId(5)]);
        assert!(report.evicted_cache_entries > 0);
    }

    #[test]
    fn missing_map_is_a_load_error() {
        let temp = TempDir::new().expect("temp");
        let result = run_probe(&ProbeWiring {
            map_path: temp.path().join("absent.tmx"),
            config: WorldConfig::default(),
            query: None,
        });
        assert!(matches!(result, Err(ProbeError::Environment(_))));
    }
}
