mod entity;
mod factory;
mod ids;
mod properties;
mod registry;
mod services;

pub use entity::{
    AnimationController, AnimationHandle, CollisionSettings, CombatAttributes, EntityKind,
    LightSource, Material, PropState, Rgba, WorldEntity,
};
pub use factory::{AuthoringError, MapObjectKind};
pub use ids::{EntityId, IdSequenceError, IdSequences};
pub use properties::{
    PropertyError, PropertyReader, COLLISION, COLLISION_BOX_HEIGHT_FACTOR,
    COLLISION_BOX_WIDTH_FACTOR, HEALTH, INDESTRUCTIBLE, LIGHT_BRIGHTNESS, LIGHT_COLOR, MATERIAL,
    MOB_TYPE, SPRITESHEET_NAME, TEAM,
};
pub use registry::{Environment, EnvironmentError, EnvironmentState, InitSummary};
pub use services::{
    AnimationBackend, EnvironmentServices, NullAnimations, NullPhysics, PhysicsSink,
};
