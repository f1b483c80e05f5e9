use thiserror::Error;

use crate::geometry::Rect;
use crate::map::MapObject;

use super::entity::{
    AnimationController, CollisionSettings, CombatAttributes, EntityKind, LightSource, Material,
    PropState, Rgba, WorldEntity,
};
use super::ids::EntityId;
use super::properties::{
    PropertyError, PropertyReader, COLLISION, COLLISION_BOX_HEIGHT_FACTOR,
    COLLISION_BOX_WIDTH_FACTOR, HEALTH, INDESTRUCTIBLE, LIGHT_BRIGHTNESS, LIGHT_COLOR, MATERIAL,
    MOB_TYPE, SPRITESHEET_NAME, TEAM,
};
use super::services::AnimationBackend;

/// The closed set of object types a map may author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapObjectKind {
    LightSource,
    CollisionBox,
    Prop,
    DecorMob,
    Effect,
    Mob,
}

impl MapObjectKind {
    pub const ALL: [MapObjectKind; 6] = [
        MapObjectKind::LightSource,
        MapObjectKind::CollisionBox,
        MapObjectKind::Prop,
        MapObjectKind::DecorMob,
        MapObjectKind::Effect,
        MapObjectKind::Mob,
    ];

    pub fn from_type_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.type_tag().eq_ignore_ascii_case(tag))
    }

    pub fn type_tag(self) -> &'static str {
        match self {
            MapObjectKind::LightSource => "LIGHTSOURCE",
            MapObjectKind::CollisionBox => "COLLISIONBOX",
            MapObjectKind::Prop => "PROP",
            MapObjectKind::DecorMob => "DECORMOB",
            MapObjectKind::Effect => "EFFECT",
            MapObjectKind::Mob => "MOB",
        }
    }

    pub fn required_properties(self) -> &'static [&'static str] {
        match self {
            MapObjectKind::LightSource => &[LIGHT_BRIGHTNESS, LIGHT_COLOR],
            MapObjectKind::Prop => &[SPRITESHEET_NAME, MATERIAL, HEALTH, COLLISION],
            MapObjectKind::DecorMob => &[MOB_TYPE, COLLISION],
            MapObjectKind::CollisionBox | MapObjectKind::Effect | MapObjectKind::Mob => &[],
        }
    }

    pub fn optional_properties(self) -> &'static [&'static str] {
        match self {
            MapObjectKind::Prop => &[
                INDESTRUCTIBLE,
                COLLISION_BOX_WIDTH_FACTOR,
                COLLISION_BOX_HEIGHT_FACTOR,
                TEAM,
            ],
            MapObjectKind::DecorMob => &[COLLISION_BOX_WIDTH_FACTOR, COLLISION_BOX_HEIGHT_FACTOR],
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("map object {object_id} ({kind:?}): {source}")]
pub struct AuthoringError {
    pub object_id: u32,
    pub kind: MapObjectKind,
    #[source]
    pub source: PropertyError,
}

fn check_required(object: &MapObject, kind: MapObjectKind) -> Result<(), AuthoringError> {
    let reader = PropertyReader::new(&object.properties);
    for name in kind.required_properties() {
        if !reader.has(name) {
            return Err(authoring_error(
                object,
                kind,
                PropertyError::Missing {
                    name: (*name).to_string(),
                },
            ));
        }
    }
    Ok(())
}

fn authoring_error(
    object: &MapObject,
    kind: MapObjectKind,
    source: PropertyError,
) -> AuthoringError {
    AuthoringError {
        object_id: object.id,
        kind,
        source,
    }
}

/// `Ok(None)` when brightness or color is absent: such lights are skipped.
pub(crate) fn light_source_from(object: &MapObject) -> Result<Option<LightSource>, AuthoringError> {
    let kind = MapObjectKind::LightSource;
    if check_required(object, kind).is_err() {
        return Ok(None);
    }
    let reader = PropertyReader::new(&object.properties);
    let wrap = |source| authoring_error(object, kind, source);
    let (Some(brightness), Some(rgb)) = (
        reader.u8(LIGHT_BRIGHTNESS).map_err(wrap)?,
        reader.rgb(LIGHT_COLOR).map_err(wrap)?,
    ) else {
        return Ok(None);
    };

    Ok(Some(LightSource {
        location: object.location,
        radius: (object.dimension.width / 2.0) as i32,
        brightness,
        color: Rgba::from_rgb24(rgb, brightness),
    }))
}

pub(crate) fn collision_box_from(object: &MapObject) -> Rect {
    Rect::from_location_size(object.location, object.dimension)
}

fn collision_from(
    object: &MapObject,
    kind: MapObjectKind,
    reader: &PropertyReader<'_>,
) -> Result<CollisionSettings, AuthoringError> {
    let wrap = |source| authoring_error(object, kind, source);
    let defaults = CollisionSettings::default();
    Ok(CollisionSettings {
        enabled: reader.required_bool(COLLISION).map_err(wrap)?,
        width_factor: reader
            .f32(COLLISION_BOX_WIDTH_FACTOR)
            .map_err(wrap)?
            .unwrap_or(defaults.width_factor),
        height_factor: reader
            .f32(COLLISION_BOX_HEIGHT_FACTOR)
            .map_err(wrap)?
            .unwrap_or(defaults.height_factor),
    })
}

/// Builds a prop; destructible props get damaged and destroyed animations.
pub(crate) fn prop_from(
    object: &MapObject,
    animations: &dyn AnimationBackend,
) -> Result<WorldEntity, AuthoringError> {
    let kind = MapObjectKind::Prop;
    check_required(object, kind)?;
    let reader = PropertyReader::new(&object.properties);
    let wrap = |source| authoring_error(object, kind, source);

    let sprite_sheet = reader.required_text(SPRITESHEET_NAME).map_err(wrap)?;
    let material = reader
        .material(MATERIAL)
        .map_err(wrap)?
        .unwrap_or(Material::Undefined);
    let combat = CombatAttributes {
        max_health: reader.u32(HEALTH).map_err(wrap)?.unwrap_or_default(),
        indestructible: reader.bool(INDESTRUCTIBLE).unwrap_or(false),
        team: reader.i32(TEAM).map_err(wrap)?,
    };
    let collision = collision_from(object, kind, &reader)?;

    let id = EntityId::from_map_object(object.id);
    let prop = WorldEntity::new(
        id,
        EntityKind::Prop {
            sprite_sheet: sprite_sheet.to_string(),
            material,
        },
        object.location,
        object.dimension,
    )
    .with_collision(collision)
    .with_combat(combat);

    let mut controller = AnimationController::new(id);
    if !combat.indestructible {
        for state in [PropState::Damaged, PropState::Destroyed] {
            controller.add(state, animations.create_animation(&prop, state));
        }
    }
    Ok(prop.with_animation_controller(controller))
}

pub(crate) fn decor_mob_from(object: &MapObject) -> Result<WorldEntity, AuthoringError> {
    let kind = MapObjectKind::DecorMob;
    check_required(object, kind)?;
    let reader = PropertyReader::new(&object.properties);
    let mob_type = reader
        .required_text(MOB_TYPE)
        .map_err(|source| authoring_error(object, kind, source))?;
    let collision = collision_from(object, kind, &reader)?;

    Ok(WorldEntity::new(
        EntityId::from_map_object(object.id),
        EntityKind::DecorMob {
            mob_type: mob_type.to_string(),
        },
        object.location,
        object.dimension,
    )
    .with_collision(collision))
}
