//! Headless collaborators
//!
//! A deliberately small rigid-body world (gravity, sphere/box contacts, no
//! rotation dynamics), a map-backed scene graph and an asset loader with
//! scriptable latency and failures. Good enough to drive the coordinator end
//! to end; not a physics engine.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use glam::{Mat3, Vec3};

use crate::error::AssetError;
use crate::sim::backend::{
    AssetFuture, AssetLoader, BodyDesc, BodyHandle, BodyKind, ColliderDesc, ColliderHandle,
    ColliderShape, PhysicalMaterial, PhysicsWorld, RenderHandle, RenderScene, Transform,
};

#[derive(Debug, Clone)]
struct Body {
    kind: BodyKind,
    transform: Transform,
    velocity: Vec3,
    linear_damping: f32,
    enabled: bool,
}

#[derive(Debug, Clone)]
struct Collider {
    owner: BodyHandle,
    shape: ColliderShape,
    local: Transform,
    events: bool,
}

/// Ordered collider pair, smaller handle first
type ContactKey = (ColliderHandle, ColliderHandle);

fn contact_key(a: ColliderHandle, b: ColliderHandle) -> ContactKey {
    if a <= b { (a, b) } else { (b, a) }
}

/// Toy rigid-body world
#[derive(Debug)]
pub struct HeadlessPhysics {
    pub gravity: Vec3,
    bodies: BTreeMap<BodyHandle, Body>,
    colliders: BTreeMap<ColliderHandle, Collider>,
    next_body: u32,
    next_collider: u32,
    /// Contacts that started during the last step, not yet drained
    pending_events: Vec<ContactKey>,
    /// Contacts alive at the end of the last step
    touching: HashSet<ContactKey>,
    removed: usize,
}

impl Default for HeadlessPhysics {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, crate::consts::GRAVITY_Y, 0.0))
    }
}

impl HeadlessPhysics {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity,
            bodies: BTreeMap::new(),
            colliders: BTreeMap::new(),
            next_body: 1,
            next_collider: 1,
            pending_events: Vec::new(),
            touching: HashSet::new(),
            removed: 0,
        }
    }

    /// Attach a ball collider with default material and contact events
    pub fn attach_ball(&mut self, body: BodyHandle, radius: f32) -> ColliderHandle {
        let desc = ColliderDesc {
            shape: ColliderShape::Ball { radius },
            local: Transform::IDENTITY,
            material: PhysicalMaterial::default(),
            collision_events: true,
        };
        self.create_collider(&desc, body)
    }

    /// Queue a contact pair for the next drain, as if the last step reported it
    pub fn push_contact(&mut self, a: ColliderHandle, b: ColliderHandle) {
        self.pending_events.push((a, b));
    }

    pub fn has_body(&self, body: BodyHandle) -> bool {
        self.bodies.contains_key(&body)
    }

    pub fn is_enabled(&self, body: BodyHandle) -> Option<bool> {
        self.bodies.get(&body).map(|b| b.enabled)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Total bodies removed so far
    pub fn removed_bodies(&self) -> usize {
        self.removed
    }

    /// Colliders attached to a body
    pub fn colliders_of(&self, body: BodyHandle) -> Vec<ColliderHandle> {
        self.colliders
            .iter()
            .filter(|(_, c)| c.owner == body)
            .map(|(h, _)| *h)
            .collect()
    }

    fn world_center(&self, collider: &Collider) -> Option<(Vec3, Transform)> {
        let body = self.bodies.get(&collider.owner)?;
        let center = body.transform.translation + body.transform.rotation * collider.local.translation;
        Some((center, body.transform))
    }

    fn is_active(&self, collider: &Collider) -> bool {
        self.bodies.get(&collider.owner).is_some_and(|b| b.enabled)
    }

    fn integrate(&mut self, dt: f32) {
        for body in self.bodies.values_mut() {
            if !body.enabled || body.kind != BodyKind::Dynamic {
                continue;
            }
            body.velocity += self.gravity * dt;
            body.velocity *= 1.0 / (1.0 + body.linear_damping * dt);
            body.transform.translation += body.velocity * dt;
        }
    }

    /// Push a dynamic body out along `normal` and drop its inbound velocity
    fn separate(&mut self, body: BodyHandle, normal: Vec3, depth: f32) {
        if let Some(b) = self.bodies.get_mut(&body) {
            if b.kind != BodyKind::Dynamic {
                return;
            }
            b.transform.translation += normal * depth;
            let inbound = b.velocity.dot(normal);
            if inbound < 0.0 {
                b.velocity -= normal * inbound;
            }
        }
    }

    fn collide(&mut self) -> HashSet<ContactKey> {
        let handles: Vec<ColliderHandle> = self
            .colliders
            .iter()
            .filter(|(_, c)| self.is_active(c))
            .map(|(h, _)| *h)
            .collect();

        let mut touching = HashSet::new();
        for (i, &ha) in handles.iter().enumerate() {
            for &hb in &handles[i + 1..] {
                let (Some(ca), Some(cb)) = (self.colliders.get(&ha), self.colliders.get(&hb))
                else {
                    continue;
                };
                if ca.owner == cb.owner {
                    continue;
                }
                let (Some(kind_a), Some(kind_b)) = (
                    self.bodies.get(&ca.owner).map(|b| b.kind),
                    self.bodies.get(&cb.owner).map(|b| b.kind),
                ) else {
                    continue;
                };
                if kind_a != BodyKind::Dynamic && kind_b != BodyKind::Dynamic {
                    continue;
                }
                let (ca, cb) = (ca.clone(), cb.clone());
                if let Some((normal, depth)) = self.penetration(&ca, &cb) {
                    // normal points from a towards b
                    match (kind_a == BodyKind::Dynamic, kind_b == BodyKind::Dynamic) {
                        (true, true) => {
                            self.separate(ca.owner, -normal, depth * 0.5);
                            self.separate(cb.owner, normal, depth * 0.5);
                        }
                        (true, false) => self.separate(ca.owner, -normal, depth),
                        _ => self.separate(cb.owner, normal, depth),
                    }
                    if ca.events || cb.events {
                        touching.insert(contact_key(ha, hb));
                    }
                }
            }
        }
        touching
    }

    /// Contact normal (a -> b) and depth, if the colliders overlap
    fn penetration(&self, a: &Collider, b: &Collider) -> Option<(Vec3, f32)> {
        let (center_a, pose_a) = self.world_center(a)?;
        let (center_b, pose_b) = self.world_center(b)?;
        match (a.shape, b.shape) {
            (ColliderShape::Cuboid { half_extents }, _) => {
                let rotation = pose_a.rotation * a.local.rotation;
                let (n, d) = sphere_box(center_b, b.shape.bounding_radius(), center_a, half_extents, rotation)?;
                Some((-n, d))
            }
            (_, ColliderShape::Cuboid { half_extents }) => {
                let rotation = pose_b.rotation * b.local.rotation;
                sphere_box(center_a, a.shape.bounding_radius(), center_b, half_extents, rotation)
            }
            _ => {
                let offset = center_b - center_a;
                let reach = a.shape.bounding_radius() + b.shape.bounding_radius();
                let dist = offset.length();
                if dist >= reach {
                    return None;
                }
                let normal = if dist > f32::EPSILON { offset / dist } else { Vec3::Y };
                Some((normal, reach - dist))
            }
        }
    }
}

/// Sphere against an oriented box approximated by its world AABB.
/// Returns the normal pointing from the sphere towards the box.
fn sphere_box(
    center: Vec3,
    radius: f32,
    box_center: Vec3,
    half_extents: Vec3,
    rotation: glam::Quat,
) -> Option<(Vec3, f32)> {
    let m = Mat3::from_quat(rotation);
    let abs = Mat3::from_cols(m.x_axis.abs(), m.y_axis.abs(), m.z_axis.abs());
    let half = abs * half_extents;
    let min = box_center - half;
    let max = box_center + half;

    let closest = center.clamp(min, max);
    let offset = center - closest;
    let dist = offset.length();
    if dist >= radius {
        return None;
    }
    if dist > f32::EPSILON {
        Some((-offset / dist, radius - dist))
    } else {
        // Centre inside the box: push out through the top face
        Some((-Vec3::Y, radius + (max.y - center.y)))
    }
}

impl PhysicsWorld for HeadlessPhysics {
    fn step(&mut self, dt: f32) {
        self.integrate(dt);
        let touching = self.collide();
        let mut started: Vec<ContactKey> = touching.difference(&self.touching).copied().collect();
        started.sort();
        self.pending_events.extend(started);
        self.touching = touching;
    }

    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_body);
        self.next_body += 1;
        self.bodies.insert(
            handle,
            Body {
                kind: desc.kind,
                transform: desc.transform,
                velocity: Vec3::ZERO,
                linear_damping: desc.linear_damping,
                enabled: desc.enabled,
            },
        );
        handle
    }

    fn create_collider(&mut self, desc: &ColliderDesc, body: BodyHandle) -> ColliderHandle {
        let handle = ColliderHandle(self.next_collider);
        self.next_collider += 1;
        self.colliders.insert(
            handle,
            Collider {
                owner: body,
                shape: desc.shape,
                local: desc.local,
                events: desc.collision_events,
            },
        );
        handle
    }

    fn remove_body(&mut self, body: BodyHandle) {
        if self.bodies.remove(&body).is_none() {
            return;
        }
        self.removed += 1;
        let gone: HashSet<ColliderHandle> = self
            .colliders
            .iter()
            .filter(|(_, c)| c.owner == body)
            .map(|(h, _)| *h)
            .collect();
        self.colliders.retain(|h, _| !gone.contains(h));
        self.touching
            .retain(|(a, b)| !gone.contains(a) && !gone.contains(b));
    }

    fn set_body_enabled(&mut self, body: BodyHandle, enabled: bool) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.enabled = enabled;
        }
    }

    fn set_kinematic_transform(&mut self, body: BodyHandle, transform: Transform) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.transform = transform;
            b.velocity = Vec3::ZERO;
        }
    }

    fn body_transform(&self, body: BodyHandle) -> Option<Transform> {
        self.bodies.get(&body).map(|b| b.transform)
    }

    fn drain_collision_events(&mut self, sink: &mut dyn FnMut(ColliderHandle, ColliderHandle)) {
        for (a, b) in self.pending_events.drain(..) {
            sink(a, b);
        }
    }

    fn collider_owner(&self, collider: ColliderHandle) -> Option<BodyHandle> {
        self.colliders.get(&collider).map(|c| c.owner)
    }
}

/// A render node as the scene sees it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneNode {
    pub transform: Transform,
    pub scale: Vec3,
}

/// Map-backed scene graph
#[derive(Debug, Default)]
pub struct HeadlessScene {
    nodes: HashMap<RenderHandle, SceneNode>,
}

impl HeadlessScene {
    pub fn contains(&self, handle: RenderHandle) -> bool {
        self.nodes.contains_key(&handle)
    }

    pub fn transform(&self, handle: RenderHandle) -> Option<Transform> {
        self.nodes.get(&handle).map(|n| n.transform)
    }

    pub fn scale(&self, handle: RenderHandle) -> Option<Vec3> {
        self.nodes.get(&handle).map(|n| n.scale)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl RenderScene for HeadlessScene {
    fn add(&mut self, handle: RenderHandle) {
        self.nodes.entry(handle).or_insert(SceneNode {
            transform: Transform::IDENTITY,
            scale: Vec3::ONE,
        });
    }

    fn remove(&mut self, handle: RenderHandle) {
        self.nodes.remove(&handle);
    }

    fn set_transform(&mut self, handle: RenderHandle, transform: Transform) {
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.transform = transform;
        }
    }

    fn set_scale(&mut self, handle: RenderHandle, scale: Vec3) {
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.scale = scale;
        }
    }
}

/// Load that resolves after a fixed number of polls
struct DelayedLoad {
    remaining: u32,
    result: Option<Result<RenderHandle, AssetError>>,
}

impl Future for DelayedLoad {
    type Output = Result<RenderHandle, AssetError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.remaining > 0 {
            this.remaining -= 1;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        match this.result.take() {
            Some(result) => Poll::Ready(result),
            None => Poll::Ready(Err(AssetError::new("load polled after completion"))),
        }
    }
}

/// Asset loader with scriptable latency and failures
#[derive(Debug, Default)]
pub struct HeadlessAssets {
    /// Polls each load stays pending before resolving
    pub latency: u32,
    failing: HashSet<String>,
    next_handle: u32,
    loads: usize,
}

impl HeadlessAssets {
    pub fn with_latency(latency: u32) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Make every future load of `asset` fail
    pub fn fail_asset(&mut self, asset: impl Into<String>) {
        self.failing.insert(asset.into());
    }

    pub fn heal_asset(&mut self, asset: &str) {
        self.failing.remove(asset);
    }

    /// Number of loads started
    pub fn loads(&self) -> usize {
        self.loads
    }
}

impl AssetLoader for HeadlessAssets {
    fn load(&mut self, asset: &str) -> AssetFuture {
        self.loads += 1;
        let result = if self.failing.contains(asset) {
            Err(AssetError::new(format!("no such model: {asset}")))
        } else {
            self.next_handle += 1;
            Ok(RenderHandle(self.next_handle))
        };
        Box::pin(DelayedLoad {
            remaining: self.latency,
            result: Some(result),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ball_rests_on_floor() {
        let mut physics = HeadlessPhysics::default();
        let floor = physics.create_body(&BodyDesc::new(
            BodyKind::Fixed,
            Transform::from_translation(Vec3::new(0.0, -1.0, 0.0)),
        ));
        physics.create_collider(
            &ColliderDesc {
                shape: ColliderShape::Cuboid {
                    half_extents: Vec3::new(50.0, 0.5, 50.0),
                },
                local: Transform::IDENTITY,
                material: PhysicalMaterial::default(),
                collision_events: false,
            },
            floor,
        );
        let ball = physics.create_body(&BodyDesc::new(
            BodyKind::Dynamic,
            Transform::from_translation(Vec3::new(0.0, 3.0, 0.0)),
        ));
        physics.attach_ball(ball, 0.5);

        for _ in 0..600 {
            physics.step(1.0 / 120.0);
        }
        let y = physics.body_transform(ball).unwrap().translation.y;
        assert!((y - 0.0).abs() < 0.05, "ball should rest on the floor top, got {y}");
    }

    #[test]
    fn test_contact_reported_once_when_started() {
        let mut physics = HeadlessPhysics::new(Vec3::ZERO);
        let a = physics.create_body(&BodyDesc::new(BodyKind::Dynamic, Transform::IDENTITY));
        let b = physics.create_body(&BodyDesc::new(
            BodyKind::Dynamic,
            Transform::from_translation(Vec3::new(0.8, 0.0, 0.0)),
        ));
        let ca = physics.attach_ball(a, 0.5);
        let cb = physics.attach_ball(b, 0.5);

        physics.step(1.0 / 120.0);
        let mut events = Vec::new();
        physics.drain_collision_events(&mut |x, y| events.push((x, y)));
        assert_eq!(events, vec![(ca, cb)]);

        physics.step(1.0 / 120.0);
        events.clear();
        physics.drain_collision_events(&mut |x, y| events.push((x, y)));
        assert!(events.is_empty());
    }

    #[test]
    fn test_disabled_body_ignored() {
        let mut physics = HeadlessPhysics::default();
        let mut desc = BodyDesc::new(
            BodyKind::Dynamic,
            Transform::from_translation(Vec3::new(0.0, 10.0, 0.0)),
        );
        desc.enabled = false;
        let body = physics.create_body(&desc);
        physics.attach_ball(body, 0.5);
        physics.step(0.1);
        assert_eq!(physics.body_transform(body).unwrap().translation.y, 10.0);
    }

    #[test]
    fn test_delayed_asset_load() {
        let mut assets = HeadlessAssets::with_latency(2);
        assets.fail_asset("bad.glb");
        let mut good = assets.load("good.glb");
        let mut bad = assets.load("bad.glb");

        let mut cx = Context::from_waker(std::task::Waker::noop());
        assert!(good.as_mut().poll(&mut cx).is_pending());
        assert!(good.as_mut().poll(&mut cx).is_pending());
        assert!(matches!(good.as_mut().poll(&mut cx), Poll::Ready(Ok(_))));

        let _ = bad.as_mut().poll(&mut cx);
        let _ = bad.as_mut().poll(&mut cx);
        assert!(matches!(bad.as_mut().poll(&mut cx), Poll::Ready(Err(_))));
        assert_eq!(assets.loads(), 2);
    }
}
