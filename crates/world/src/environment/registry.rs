use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AuthoringPolicy;
use crate::geometry::{Rect, Shape, Vec2};
use crate::map::{
    max_object_id, tiles_at_pixel, GridId, Map, MapLoadError, MapLoader, MapObject,
    TerrainCorners, Tile, TileAnimation, Tileset,
};
use crate::sync::{read_or_recover, write_or_recover};

use super::entity::{LightSource, WorldEntity};
use super::factory::{
    collision_box_from, decor_mob_from, light_source_from, prop_from, AuthoringError,
    MapObjectKind,
};
use super::ids::{EntityId, IdSequenceError};
use super::services::EnvironmentServices;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentState {
    Loading,
    Ready,
    Cleared,
}

impl EnvironmentState {
    pub fn as_str(self) -> &'static str {
        match self {
            EnvironmentState::Loading => "loading",
            EnvironmentState::Ready => "ready",
            EnvironmentState::Cleared => "cleared",
        }
    }
}

impl fmt::Display for EnvironmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts of what `init()` produced from the map's object layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InitSummary {
    pub light_sources: usize,
    pub light_sources_skipped: usize,
    pub collision_boxes: usize,
    pub props: usize,
    pub decor_mobs: usize,
    pub reserved_ignored: usize,
    pub untyped_ignored: usize,
    pub unknown_type_ignored: usize,
    pub invalid_skipped: usize,
}

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("environment is {actual}; expected {expected}")]
    InvalidState {
        expected: EnvironmentState,
        actual: EnvironmentState,
    },
    #[error(transparent)]
    Load(#[from] MapLoadError),
    #[error(transparent)]
    Authoring(#[from] AuthoringError),
    #[error(transparent)]
    Ids(#[from] IdSequenceError),
}

enum Spawn {
    Light(LightSource),
    CollisionBox(Rect),
    Prop(WorldEntity),
    DecorMob(WorldEntity),
}

/// Live entity population of one loaded map.
#[derive(Debug)]
pub struct Environment {
    map: Arc<Map>,
    services: EnvironmentServices,
    state: RwLock<EnvironmentState>,
    combat_entities: RwLock<BTreeMap<EntityId, Arc<WorldEntity>>>,
    movable_entities: RwLock<BTreeMap<EntityId, Arc<WorldEntity>>>,
    props: RwLock<Vec<Arc<WorldEntity>>>,
    light_sources: RwLock<Vec<Arc<LightSource>>>,
}

impl Environment {
    /// Seeds the global id sequence past every authored object id.
    pub fn new(map: impl Into<Arc<Map>>, services: EnvironmentServices) -> Self {
        let map = map.into();
        let max_authored_id = max_object_id(&map);
        let global_seed = services.ids.seed_global(i64::from(max_authored_id));
        debug!(
            map = %map.identity,
            max_authored_id,
            global_seed,
            "global_id_sequence_seeded"
        );
        Self {
            map,
            services,
            state: RwLock::new(EnvironmentState::Loading),
            combat_entities: RwLock::new(BTreeMap::new()),
            movable_entities: RwLock::new(BTreeMap::new()),
            props: RwLock::new(Vec::new()),
            light_sources: RwLock::new(Vec::new()),
        }
    }

    pub fn load(
        path: &Path,
        loader: &dyn MapLoader,
        services: EnvironmentServices,
    ) -> Result<Self, EnvironmentError> {
        let map = loader.load_map(path)?;
        info!(
            map = %map.identity,
            path = %path.display(),
            width = map.width,
            height = map.height,
            tile_layers = map.tile_layers.len(),
            object_layers = map.object_layers.len(),
            tilesets = map.tilesets.len(),
            objects = map.object_count(),
            "map_loaded"
        );
        Ok(Self::new(map, services))
    }

    pub fn map(&self) -> &Arc<Map> {
        &self.map
    }

    pub fn services(&self) -> &EnvironmentServices {
        &self.services
    }

    pub fn state(&self) -> EnvironmentState {
        *read_or_recover(&self.state, "environment_state")
    }

    /// Instantiates every typed map object. Only valid while loading.
    pub fn init(&self) -> Result<InitSummary, EnvironmentError> {
        let mut state = write_or_recover(&self.state, "environment_state");
        if *state != EnvironmentState::Loading {
            return Err(EnvironmentError::InvalidState {
                expected: EnvironmentState::Loading,
                actual: *state,
            });
        }

        let policy = self.services.config.authoring_policy;
        let mut summary = InitSummary::default();
        let mut spawns = Vec::new();
        for layer in &self.map.object_layers {
            for object in &layer.objects {
                match self.spawn_for(object, &mut summary) {
                    Ok(Some(spawn)) => spawns.push(spawn),
                    Ok(None) => {}
                    Err(error) if policy == AuthoringPolicy::Strict => {
                        self.discard(&spawns);
                        return Err(error.into());
                    }
                    Err(error) => {
                        warn!(
                            map = %self.map.identity,
                            layer = %layer.name,
                            object_id = error.object_id,
                            kind = error.kind.type_tag(),
                            error = %error.source,
                            "map_object_skipped"
                        );
                        summary.invalid_skipped += 1;
                    }
                }
            }
        }

        for spawn in spawns {
            self.commit(spawn, &mut summary);
        }
        *state = EnvironmentState::Ready;
        info!(
            map = %self.map.identity,
            light_sources = summary.light_sources,
            collision_boxes = summary.collision_boxes,
            props = summary.props,
            decor_mobs = summary.decor_mobs,
            skipped = summary.invalid_skipped + summary.light_sources_skipped,
            "environment_initialized"
        );
        Ok(summary)
    }

    fn spawn_for(
        &self,
        object: &MapObject,
        summary: &mut InitSummary,
    ) -> Result<Option<Spawn>, AuthoringError> {
        let tag = object.object_type.trim();
        if tag.is_empty() {
            summary.untyped_ignored += 1;
            return Ok(None);
        }
        let Some(kind) = MapObjectKind::from_type_tag(tag) else {
            warn!(
                map = %self.map.identity,
                object_id = object.id,
                object_type = tag,
                "map_object_type_unknown"
            );
            summary.unknown_type_ignored += 1;
            return Ok(None);
        };

        match kind {
            MapObjectKind::LightSource => match light_source_from(object)? {
                Some(light) => Ok(Some(Spawn::Light(light))),
                None => {
                    warn!(
                        map = %self.map.identity,
                        object_id = object.id,
                        "light_source_skipped_missing_properties"
                    );
                    summary.light_sources_skipped += 1;
                    Ok(None)
                }
            },
            MapObjectKind::CollisionBox => {
                Ok(Some(Spawn::CollisionBox(collision_box_from(object))))
            }
            MapObjectKind::Prop => prop_from(object, self.services.animations.as_ref())
                .map(|prop| Some(Spawn::Prop(prop))),
            MapObjectKind::DecorMob => decor_mob_from(object).map(|mob| Some(Spawn::DecorMob(mob))),
            MapObjectKind::Effect | MapObjectKind::Mob => {
                debug!(
                    map = %self.map.identity,
                    object_id = object.id,
                    kind = kind.type_tag(),
                    "map_object_kind_reserved"
                );
                summary.reserved_ignored += 1;
                Ok(None)
            }
        }
    }

    fn commit(&self, spawn: Spawn, summary: &mut InitSummary) {
        match spawn {
            Spawn::Light(light) => {
                self.add_light_source(light);
                summary.light_sources += 1;
            }
            Spawn::CollisionBox(bounds) => {
                self.services.physics.add_static_collision_box(bounds);
                summary.collision_boxes += 1;
            }
            Spawn::Prop(prop) => {
                let prop = Arc::new(prop);
                write_or_recover(&self.props, "props").push(Arc::clone(&prop));
                self.insert_combat(&prop);
                if prop.has_collision() {
                    self.services.physics.add_collidable(&prop);
                }
                summary.props += 1;
            }
            Spawn::DecorMob(mob) => {
                let mob = Arc::new(mob);
                self.insert_movable(&mob);
                if mob.has_collision() {
                    self.services.physics.add_collidable(&mob);
                }
                summary.decor_mobs += 1;
            }
        }
    }

    fn discard(&self, spawns: &[Spawn]) {
        for spawn in spawns {
            if let Spawn::Prop(entity) | Spawn::DecorMob(entity) = spawn {
                self.dispose_animations(entity);
            }
        }
    }

    fn insert_combat(&self, entity: &Arc<WorldEntity>) -> Option<Arc<WorldEntity>> {
        let replaced = write_or_recover(&self.combat_entities, "combat_entities")
            .insert(entity.id(), Arc::clone(entity));
        if replaced.is_some() {
            warn!(map = %self.map.identity, id = %entity.id(), "combat_entity_replaced");
        }
        replaced
    }

    fn insert_movable(&self, entity: &Arc<WorldEntity>) -> Option<Arc<WorldEntity>> {
        let replaced = write_or_recover(&self.movable_entities, "movable_entities")
            .insert(entity.id(), Arc::clone(entity));
        if replaced.is_some() {
            warn!(map = %self.map.identity, id = %entity.id(), "movable_entity_replaced");
        }
        replaced
    }

    /// Registers the entity as both a combat and a movable entity.
    pub fn add(&self, entity: Arc<WorldEntity>) {
        self.insert_combat(&entity);
        self.insert_movable(&entity);
    }

    pub fn add_combat_entity(&self, entity: Arc<WorldEntity>) -> Option<Arc<WorldEntity>> {
        self.insert_combat(&entity)
    }

    pub fn add_movable_entity(&self, entity: Arc<WorldEntity>) -> Option<Arc<WorldEntity>> {
        self.insert_movable(&entity)
    }

    /// Appends a prop without registering it anywhere else.
    pub fn add_prop(&self, prop: Arc<WorldEntity>) {
        write_or_recover(&self.props, "props").push(prop);
    }

    pub fn add_light_source(&self, light: LightSource) -> Arc<LightSource> {
        let light = Arc::new(light);
        write_or_recover(&self.light_sources, "light_sources").push(Arc::clone(&light));
        light
    }

    /// Removes the id from both registries.
    pub fn remove(&self, id: EntityId) -> Option<Arc<WorldEntity>> {
        let combat = self.remove_combat_entity(id);
        let movable = self.remove_movable_entity(id);
        combat.or(movable)
    }

    pub fn remove_combat_entity(&self, id: EntityId) -> Option<Arc<WorldEntity>> {
        write_or_recover(&self.combat_entities, "combat_entities").remove(&id)
    }

    pub fn remove_movable_entity(&self, id: EntityId) -> Option<Arc<WorldEntity>> {
        write_or_recover(&self.movable_entities, "movable_entities").remove(&id)
    }

    pub fn combat_entity(&self, id: EntityId) -> Option<Arc<WorldEntity>> {
        read_or_recover(&self.combat_entities, "combat_entities")
            .get(&id)
            .cloned()
    }

    pub fn movable_entity(&self, id: EntityId) -> Option<Arc<WorldEntity>> {
        read_or_recover(&self.movable_entities, "movable_entities")
            .get(&id)
            .cloned()
    }

    pub fn combat_entities(&self) -> Vec<Arc<WorldEntity>> {
        read_or_recover(&self.combat_entities, "combat_entities")
            .values()
            .cloned()
            .collect()
    }

    pub fn movable_entities(&self) -> Vec<Arc<WorldEntity>> {
        read_or_recover(&self.movable_entities, "movable_entities")
            .values()
            .cloned()
            .collect()
    }

    pub fn props(&self) -> Vec<Arc<WorldEntity>> {
        read_or_recover(&self.props, "props").clone()
    }

    pub fn light_sources(&self) -> Vec<Arc<LightSource>> {
        read_or_recover(&self.light_sources, "light_sources").clone()
    }

    pub fn allocate_global_id(&self) -> Result<EntityId, EnvironmentError> {
        Ok(self.services.ids.allocate_global()?)
    }

    pub fn allocate_local_id(&self) -> Result<EntityId, EnvironmentError> {
        Ok(self.services.ids.allocate_local()?)
    }

    /// Combat entities whose hit box overlaps `shape` with positive area.
    pub fn find_combat_entities(&self, shape: &Shape) -> Vec<Arc<WorldEntity>> {
        self.find_combat_entities_where(shape, |_| true)
    }

    /// Predicate runs before any geometry. Non-rectangular shapes go through a
    /// bounding-box broad phase before the exact test.
    pub fn find_combat_entities_where<P>(
        &self,
        shape: &Shape,
        predicate: P,
    ) -> Vec<Arc<WorldEntity>>
    where
        P: Fn(&WorldEntity) -> bool,
    {
        let candidates = self
            .combat_entities()
            .into_iter()
            .filter(|entity| predicate(entity));
        match shape {
            Shape::Rect(rect) => candidates
                .filter(|entity| rect.intersects(&entity.hit_box()))
                .collect(),
            _ => {
                let bounds = shape.bounds();
                candidates
                    .filter(|entity| {
                        let hit_box = entity.hit_box();
                        bounds.intersects(&hit_box) && shape.intersects_rect(&hit_box)
                    })
                    .collect()
            }
        }
    }

    /// Disposes registered animations and empties both registries and the
    /// light sources. Props are kept.
    pub fn clear(&self) -> Result<(), EnvironmentError> {
        let mut state = write_or_recover(&self.state, "environment_state");
        if *state != EnvironmentState::Ready {
            return Err(EnvironmentError::InvalidState {
                expected: EnvironmentState::Ready,
                actual: *state,
            });
        }

        let combat =
            std::mem::take(&mut *write_or_recover(&self.combat_entities, "combat_entities"));
        let movable =
            std::mem::take(&mut *write_or_recover(&self.movable_entities, "movable_entities"));
        let disposed = combat
            .values()
            .chain(movable.values())
            .filter(|entity| self.dispose_animations(entity))
            .count();
        let light_sources =
            std::mem::take(&mut *write_or_recover(&self.light_sources, "light_sources")).len();

        *state = EnvironmentState::Cleared;
        info!(
            map = %self.map.identity,
            combat_entities = combat.len(),
            movable_entities = movable.len(),
            light_sources,
            animation_controllers_disposed = disposed,
            "environment_cleared"
        );
        Ok(())
    }

    /// Tears the environment down; the tile cache drops this map's entries
    /// when configured to. Returns the number of evicted cache entries.
    pub fn unload(self) -> usize {
        self.dispose_all();
        let evicted = if self.services.config.evict_tile_cache_on_unload {
            self.services.tile_cache.evict_map(&self.map.identity)
        } else {
            0
        };
        info!(map = %self.map.identity, evicted_cache_entries = evicted, "environment_unloaded");
        evicted
    }

    fn dispose_all(&self) {
        let combat = self.combat_entities();
        let movable = self.movable_entities();
        let props = self.props();
        for entity in combat.iter().chain(movable.iter()).chain(props.iter()) {
            self.dispose_animations(entity);
        }
    }

    /// `true` when this call released the entity's controller.
    fn dispose_animations(&self, entity: &WorldEntity) -> bool {
        match entity.animation_controller() {
            Some(controller) if controller.mark_disposed() => {
                self.services.animations.dispose(controller);
                true
            }
            _ => false,
        }
    }

    pub fn tileset_for(&self, grid_id: GridId) -> Option<Arc<Tileset>> {
        self.services.tile_cache.find_tileset(&self.map, grid_id)
    }

    pub fn terrain_for(&self, grid_id: GridId) -> TerrainCorners {
        self.services.tile_cache.terrain(&self.map, grid_id)
    }

    pub fn animation_for(&self, grid_id: GridId) -> Option<Arc<TileAnimation>> {
        self.services.tile_cache.animation(&self.map, grid_id)
    }

    pub fn tiles_at(&self, point: Vec2) -> Vec<Tile> {
        tiles_at_pixel(&self.map, point)
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        self.dispose_all();
    }
}
