//! Collaborator interfaces
//!
//! The coordinator never simulates rigid bodies, loads meshes or draws
//! anything itself. It talks to those systems through the narrow traits
//! below and only ever holds their handles.

use std::future::Future;
use std::pin::Pin;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::AssetError;

/// Rigid body handle issued by the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Collider handle issued by the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColliderHandle(pub u32);

/// Render node handle issued by the asset loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RenderHandle(pub u32);

/// Position and orientation in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// How a body participates in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never moves (floor)
    Fixed,
    /// Moved only by explicit transforms (container walls)
    KinematicPosition,
    /// Affected by gravity and contacts
    Dynamic,
}

/// Body creation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub transform: Transform,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Disabled bodies neither collide nor fall
    pub enabled: bool,
    pub can_sleep: bool,
}

impl BodyDesc {
    pub fn new(kind: BodyKind, transform: Transform) -> Self {
        Self {
            kind,
            transform,
            linear_damping: 0.0,
            angular_damping: 0.0,
            enabled: true,
            can_sleep: true,
        }
    }
}

/// Collider geometry (dimensions are half-sizes where applicable)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum ColliderShape {
    Ball { radius: f32 },
    Cuboid { half_extents: Vec3 },
    Cylinder { half_height: f32, radius: f32 },
    Capsule { half_height: f32, radius: f32 },
}

impl ColliderShape {
    /// Radius of a sphere enclosing the shape
    pub fn bounding_radius(&self) -> f32 {
        match *self {
            ColliderShape::Ball { radius } => radius,
            ColliderShape::Cuboid { half_extents } => half_extents.length(),
            ColliderShape::Cylinder { half_height, radius } => {
                (half_height * half_height + radius * radius).sqrt()
            }
            ColliderShape::Capsule { half_height, radius } => half_height + radius,
        }
    }
}

/// How two touching materials combine a coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineRule {
    #[default]
    Average,
    Min,
    Multiply,
    Max,
}

/// Physical material of a collider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalMaterial {
    pub mass: f32,
    pub restitution: f32,
    pub friction: f32,
    #[serde(default)]
    pub restitution_combine: CombineRule,
    #[serde(default)]
    pub friction_combine: CombineRule,
}

impl Default for PhysicalMaterial {
    fn default() -> Self {
        Self {
            mass: 1.0,
            restitution: 0.2,
            friction: 0.5,
            restitution_combine: CombineRule::Average,
            friction_combine: CombineRule::Average,
        }
    }
}

/// Collider creation parameters (offset/rotation are local to the body)
#[derive(Debug, Clone, PartialEq)]
pub struct ColliderDesc {
    pub shape: ColliderShape,
    pub local: Transform,
    pub material: PhysicalMaterial,
    /// Report contacts through `drain_collision_events`
    pub collision_events: bool,
}

/// Rigid-body world the coordinator sits on top of
pub trait PhysicsWorld {
    /// Advance the simulation by `dt` seconds
    fn step(&mut self, dt: f32);

    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle;

    fn create_collider(&mut self, desc: &ColliderDesc, body: BodyHandle) -> ColliderHandle;

    /// Remove a body and every collider attached to it
    fn remove_body(&mut self, body: BodyHandle);

    fn set_body_enabled(&mut self, body: BodyHandle, enabled: bool);

    /// Teleport a body, ignoring forces (used for previews and the container)
    fn set_kinematic_transform(&mut self, body: BodyHandle, transform: Transform);

    /// Current transform of a body, `None` if it no longer exists
    fn body_transform(&self, body: BodyHandle) -> Option<Transform>;

    /// Hand every contact pair reported by the last step to `sink`, then forget them
    fn drain_collision_events(&mut self, sink: &mut dyn FnMut(ColliderHandle, ColliderHandle));

    fn collider_owner(&self, collider: ColliderHandle) -> Option<BodyHandle>;
}

/// Scene graph that draws render handles
pub trait RenderScene {
    fn add(&mut self, handle: RenderHandle);

    fn remove(&mut self, handle: RenderHandle);

    fn set_transform(&mut self, handle: RenderHandle, transform: Transform);

    fn set_scale(&mut self, handle: RenderHandle, scale: Vec3);
}

/// Future returned by [`AssetLoader::load`]
pub type AssetFuture = Pin<Box<dyn Future<Output = Result<RenderHandle, AssetError>>>>;

/// Loads item models into render handles
pub trait AssetLoader {
    fn load(&mut self, asset: &str) -> AssetFuture;
}
