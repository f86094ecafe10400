//! Object registry
//!
//! Owns the body handle -> object mapping for every live, merge-eligible item.
//! Preview objects are not members until they are committed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::backend::{BodyHandle, ColliderHandle, PhysicsWorld, RenderHandle, RenderScene};
use super::ladder::ItemKind;
use crate::error::GameError;

/// Stable object identifier (allocated by the spawn coordinator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

/// An item with its paired render and physics handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedObject {
    pub id: ObjectId,
    pub kind: ItemKind,
    pub render: RenderHandle,
    pub body: BodyHandle,
}

/// Live objects indexed by body handle
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    by_body: HashMap<BodyHandle, ManagedObject>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object; its body must not already belong to a live object
    pub fn add(&mut self, obj: ManagedObject) -> Result<(), GameError> {
        if self.by_body.contains_key(&obj.body) {
            return Err(GameError::DuplicateHandle(obj.body));
        }
        self.by_body.insert(obj.body, obj);
        Ok(())
    }

    pub fn find(&self, body: BodyHandle) -> Option<&ManagedObject> {
        self.by_body.get(&body)
    }

    /// Map a collider to its registered object (collider -> body -> object)
    pub fn resolve_collider(
        &self,
        physics: &impl PhysicsWorld,
        collider: ColliderHandle,
    ) -> Result<ManagedObject, GameError> {
        physics
            .collider_owner(collider)
            .and_then(|body| self.find(body))
            .copied()
            .ok_or(GameError::StaleHandle(collider))
    }

    /// True if this exact object (same id on the same body) is live
    pub fn contains(&self, obj: &ManagedObject) -> bool {
        self.by_body.get(&obj.body).is_some_and(|o| o.id == obj.id)
    }

    /// Detach an object from physics and the scene, then forget it.
    ///
    /// Removing an object that is no longer registered is a no-op and returns
    /// `false`.
    pub fn remove(
        &mut self,
        obj: &ManagedObject,
        physics: &mut impl PhysicsWorld,
        scene: &mut impl RenderScene,
    ) -> bool {
        if !self.contains(obj) {
            return false;
        }
        self.by_body.remove(&obj.body);
        physics.remove_body(obj.body);
        scene.remove(obj.render);
        true
    }

    /// Copy every body's transform onto its render handle
    pub fn sync_transforms(&self, physics: &impl PhysicsWorld, scene: &mut impl RenderScene) {
        for obj in self.by_body.values() {
            if let Some(transform) = physics.body_transform(obj.body) {
                scene.set_transform(obj.render, transform);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_body.is_empty()
    }

    /// Live objects sorted by id (stable iteration order)
    pub fn objects(&self) -> Vec<ManagedObject> {
        let mut objects: Vec<_> = self.by_body.values().copied().collect();
        objects.sort_by_key(|o| o.id);
        objects
    }

    /// Number of live objects of one kind
    pub fn count_of(&self, kind: ItemKind) -> usize {
        self.by_body.values().filter(|o| o.kind == kind).count()
    }
}
