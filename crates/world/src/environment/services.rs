use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::WorldConfig;
use crate::geometry::Rect;
use crate::map::TileCache;

use super::entity::{AnimationController, AnimationHandle, PropState, WorldEntity};
use super::ids::IdSequences;

/// Physics engine contract: registration only, no results are consumed.
pub trait PhysicsSink: Send + Sync {
    fn add_static_collision_box(&self, bounds: Rect);
    fn add_collidable(&self, entity: &Arc<WorldEntity>);
}

/// Animation controller contract for entity states.
pub trait AnimationBackend: Send + Sync {
    fn create_animation(&self, entity: &WorldEntity, state: PropState) -> AnimationHandle;
    fn dispose(&self, controller: &AnimationController);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullPhysics;

impl PhysicsSink for NullPhysics {
    fn add_static_collision_box(&self, _bounds: Rect) {}

    fn add_collidable(&self, _entity: &Arc<WorldEntity>) {}
}

/// Issues sequential handles and keeps no resources.
#[derive(Debug, Default)]
pub struct NullAnimations {
    next_handle: AtomicU64,
}

impl AnimationBackend for NullAnimations {
    fn create_animation(&self, _entity: &WorldEntity, _state: PropState) -> AnimationHandle {
        AnimationHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    fn dispose(&self, _controller: &AnimationController) {}
}

/// Everything an environment needs from the outside world.
#[derive(Clone)]
pub struct EnvironmentServices {
    pub ids: Arc<IdSequences>,
    pub tile_cache: Arc<TileCache>,
    pub physics: Arc<dyn PhysicsSink>,
    pub animations: Arc<dyn AnimationBackend>,
    pub config: WorldConfig,
}

impl Default for EnvironmentServices {
    fn default() -> Self {
        Self {
            ids: IdSequences::process(),
            tile_cache: TileCache::process(),
            physics: Arc::new(NullPhysics),
            animations: Arc::new(NullAnimations::default()),
            config: WorldConfig::default(),
        }
    }
}

impl EnvironmentServices {
    /// Services with private id sequences and tile cache.
    pub fn isolated() -> Self {
        Self {
            ids: Arc::new(IdSequences::new()),
            tile_cache: Arc::new(TileCache::new()),
            ..Self::default()
        }
    }

    pub fn with_config(mut self, config: WorldConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_physics(mut self, physics: Arc<dyn PhysicsSink>) -> Self {
        self.physics = physics;
        self
    }

    pub fn with_animations(mut self, animations: Arc<dyn AnimationBackend>) -> Self {
        self.animations = animations;
        self
    }
}

impl fmt::Debug for EnvironmentServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentServices")
            .field("ids", &self.ids)
            .field("tile_cache", &self.tile_cache.stats())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
