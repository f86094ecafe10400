//! Container geometry
//!
//! Four glass walls share one kinematic body so the whole container can be
//! turned in quarter steps; the floor is a separate fixed slab. Neither is a
//! registry member, so contacts against them never qualify for a merge.

use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::backend::{
    BodyDesc, BodyHandle, BodyKind, ColliderDesc, ColliderShape, PhysicalMaterial, PhysicsWorld,
    Transform,
};
use crate::settings::ContainerSpec;

/// Quarter-turn direction (seen from above)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Turn {
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct Arena {
    walls: BodyHandle,
    floor: BodyHandle,
    /// Net quarter turns, kept in 0..4
    quarter_turns: u8,
}

impl Arena {
    /// Create the wall and floor bodies
    pub fn build(spec: &ContainerSpec, physics: &mut impl PhysicsWorld) -> Self {
        let wall_material = PhysicalMaterial {
            restitution: spec.wall_restitution,
            friction: spec.wall_friction,
            ..PhysicalMaterial::default()
        };

        let walls = physics.create_body(&BodyDesc::new(BodyKind::KinematicPosition, Transform::IDENTITY));
        let (w, h, d, t) = (spec.width, spec.height, spec.depth, spec.wall_thickness);
        // (size, centre) of back, front, left, right
        let panels = [
            (Vec3::new(w, h, t), Vec3::new(0.0, h / 2.0, -d / 2.0)),
            (Vec3::new(w, h, t), Vec3::new(0.0, h / 2.0, d / 2.0)),
            (Vec3::new(t, h, d), Vec3::new(-w / 2.0, h / 2.0, 0.0)),
            (Vec3::new(t, h, d), Vec3::new(w / 2.0, h / 2.0, 0.0)),
        ];
        for (size, centre) in panels {
            physics.create_collider(
                &ColliderDesc {
                    shape: ColliderShape::Cuboid {
                        half_extents: size / 2.0,
                    },
                    local: Transform::from_translation(centre),
                    material: wall_material,
                    collision_events: false,
                },
                walls,
            );
        }

        let floor = physics.create_body(&BodyDesc::new(
            BodyKind::Fixed,
            Transform::from_translation(Vec3::new(0.0, spec.floor_y, 0.0)),
        ));
        physics.create_collider(
            &ColliderDesc {
                shape: ColliderShape::Cuboid {
                    half_extents: Vec3::new(
                        spec.floor_half_extent,
                        spec.floor_half_thickness,
                        spec.floor_half_extent,
                    ),
                },
                local: Transform::IDENTITY,
                material: PhysicalMaterial::default(),
                collision_events: false,
            },
            floor,
        );

        log::info!("Container built: {}x{}x{} (wall {})", w, h, d, t);
        Self {
            walls,
            floor,
            quarter_turns: 0,
        }
    }

    pub fn walls(&self) -> BodyHandle {
        self.walls
    }

    pub fn floor(&self) -> BodyHandle {
        self.floor
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.quarter_turns as f32 * FRAC_PI_2)
    }

    /// Turn the container a quarter step about the vertical axis
    pub fn turn(&mut self, turn: Turn, physics: &mut impl PhysicsWorld) -> Quat {
        self.quarter_turns = match turn {
            Turn::Left => (self.quarter_turns + 1) % 4,
            Turn::Right => (self.quarter_turns + 3) % 4,
        };
        let rotation = self.rotation();
        physics.set_kinematic_transform(
            self.walls,
            Transform {
                translation: Vec3::ZERO,
                rotation,
            },
        );
        rotation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::headless::HeadlessPhysics;

    #[test]
    fn test_build_creates_walls_and_floor() {
        let mut physics = HeadlessPhysics::default();
        let arena = Arena::build(&ContainerSpec::default(), &mut physics);

        assert_eq!(physics.body_count(), 2);
        assert_eq!(physics.colliders_of(arena.walls()).len(), 4);
        assert_eq!(physics.colliders_of(arena.floor()).len(), 1);
        let floor = physics.body_transform(arena.floor()).unwrap();
        assert_eq!(floor.translation.y, ContainerSpec::default().floor_y);
    }

    #[test]
    fn test_turns_wrap() {
        let mut physics = HeadlessPhysics::default();
        let mut arena = Arena::build(&ContainerSpec::default(), &mut physics);

        arena.turn(Turn::Left, &mut physics);
        let q = physics.body_transform(arena.walls()).unwrap().rotation;
        assert!(q.angle_between(Quat::from_rotation_y(FRAC_PI_2)) < 1e-5);

        arena.turn(Turn::Right, &mut physics);
        arena.turn(Turn::Right, &mut physics);
        assert!(arena.rotation().angle_between(Quat::from_rotation_y(-FRAC_PI_2)) < 1e-5);

        for _ in 0..4 {
            arena.turn(Turn::Left, &mut physics);
        }
        assert!(arena.rotation().angle_between(Quat::from_rotation_y(-FRAC_PI_2)) < 1e-5);
    }

    #[test]
    fn test_item_stays_inside_walls() {
        let mut physics = HeadlessPhysics::default();
        let spec = ContainerSpec::default();
        Arena::build(&spec, &mut physics);

        let ball = physics.create_body(&BodyDesc::new(
            BodyKind::Dynamic,
            Transform::from_translation(Vec3::new(3.7, 2.0, 0.0)),
        ));
        physics.attach_ball(ball, 0.5);
        for _ in 0..240 {
            physics.step(1.0 / 120.0);
        }
        let x = physics.body_transform(ball).unwrap().translation.x;
        let inner = spec.width / 2.0 - spec.wall_thickness / 2.0;
        assert!(x + 0.5 <= inner + 1e-3, "ball poked through the wall: x = {x}");
    }
}
