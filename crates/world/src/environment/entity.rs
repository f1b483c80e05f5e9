use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::geometry::{Rect, Size, Vec2};

use super::ids::EntityId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Material {
    #[default]
    Undefined,
    Wood,
    Stone,
    Metal,
    Ceramic,
    Plastic,
    Organic,
}

impl Material {
    pub const ALL: [Material; 7] = [
        Material::Undefined,
        Material::Wood,
        Material::Stone,
        Material::Metal,
        Material::Ceramic,
        Material::Plastic,
        Material::Organic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Material::Undefined => "UNDEFINED",
            Material::Wood => "WOOD",
            Material::Stone => "STONE",
            Material::Metal => "METAL",
            Material::Ceramic => "CERAMIC",
            Material::Plastic => "PLASTIC",
            Material::Organic => "ORGANIC",
        }
    }
}

impl FromStr for Material {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Material::ALL
            .into_iter()
            .find(|material| material.name().eq_ignore_ascii_case(raw.trim()))
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub fn from_rgb24(rgb: u32, alpha: u8) -> Self {
        Self {
            r: ((rgb >> 16) & 0xFF) as u8,
            g: ((rgb >> 8) & 0xFF) as u8,
            b: (rgb & 0xFF) as u8,
            a: alpha,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightSource {
    pub location: Vec2,
    pub radius: i32,
    pub brightness: u8,
    pub color: Rgba,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PropState {
    Intact,
    Damaged,
    Destroyed,
}

/// Opaque handle issued by the animation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AnimationHandle(pub u64);

/// Animations owned by one entity; disposed at most once.
#[derive(Debug)]
pub struct AnimationController {
    owner: EntityId,
    animations: Vec<(PropState, AnimationHandle)>,
    disposed: AtomicBool,
}

impl AnimationController {
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            animations: Vec::new(),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn add(&mut self, state: PropState, handle: AnimationHandle) {
        self.animations.push((state, handle));
    }

    pub fn animations(&self) -> &[(PropState, AnimationHandle)] {
        &self.animations
    }

    pub fn has_state(&self, state: PropState) -> bool {
        self.animations.iter().any(|(own, _)| *own == state)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Returns `true` only for the first caller.
    pub(crate) fn mark_disposed(&self) -> bool {
        self.disposed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CollisionSettings {
    pub enabled: bool,
    pub width_factor: f32,
    pub height_factor: f32,
}

impl Default for CollisionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            width_factor: 1.0,
            height_factor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CombatAttributes {
    pub max_health: u32,
    pub indestructible: bool,
    pub team: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EntityKind {
    Prop {
        sprite_sheet: String,
        material: Material,
    },
    DecorMob {
        mob_type: String,
    },
    Creature {
        name: String,
    },
}

#[derive(Debug)]
pub struct WorldEntity {
    id: EntityId,
    kind: EntityKind,
    location: Vec2,
    size: Size,
    collision: CollisionSettings,
    combat: Option<CombatAttributes>,
    animation: Option<AnimationController>,
}

impl WorldEntity {
    pub fn new(id: EntityId, kind: EntityKind, location: Vec2, size: Size) -> Self {
        Self {
            id,
            kind,
            location,
            size,
            collision: CollisionSettings::default(),
            combat: None,
            animation: None,
        }
    }

    pub fn with_collision(mut self, collision: CollisionSettings) -> Self {
        self.collision = collision;
        self
    }

    pub fn with_combat(mut self, combat: CombatAttributes) -> Self {
        self.combat = Some(combat);
        self
    }

    pub fn with_animation_controller(mut self, controller: AnimationController) -> Self {
        self.animation = Some(controller);
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn location(&self) -> Vec2 {
        self.location
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn collision(&self) -> CollisionSettings {
        self.collision
    }

    pub fn has_collision(&self) -> bool {
        self.collision.enabled
    }

    pub fn combat(&self) -> Option<&CombatAttributes> {
        self.combat.as_ref()
    }

    pub fn max_health(&self) -> Option<u32> {
        self.combat.map(|combat| combat.max_health)
    }

    pub fn team(&self) -> Option<i32> {
        self.combat.and_then(|combat| combat.team)
    }

    pub fn animation_controller(&self) -> Option<&AnimationController> {
        self.animation.as_ref()
    }

    pub fn is_prop(&self) -> bool {
        matches!(self.kind, EntityKind::Prop { .. })
    }

    pub fn hit_box(&self) -> Rect {
        Rect::from_location_size(self.location, self.size)
    }

    /// Collision box scaled by the width/height factors, centered horizontally
    /// and anchored to the bottom edge of the hit box.
    pub fn collision_box(&self) -> Rect {
        let width = self.size.width * self.collision.width_factor;
        let height = self.size.height * self.collision.height_factor;
        Rect::new(
            self.location.x + (self.size.width - width) / 2.0,
            self.location.y + self.size.height - height,
            width,
            height,
        )
    }
}
