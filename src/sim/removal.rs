//! Deferred removal queue
//!
//! Objects consumed during collision resolution are staged here and only
//! detached from the world once the resolver has finished.

use std::collections::HashSet;

use super::backend::{PhysicsWorld, RenderScene};
use super::registry::{ManagedObject, ObjectId, ObjectRegistry};

#[derive(Debug, Default)]
pub struct RemovalQueue {
    queued: Vec<ManagedObject>,
    members: HashSet<ObjectId>,
}

impl RemovalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an object for removal. Returns `false` if it was already staged.
    pub fn enqueue(&mut self, obj: ManagedObject) -> bool {
        if !self.members.insert(obj.id) {
            return false;
        }
        self.queued.push(obj);
        true
    }

    pub fn contains(&self, obj: &ManagedObject) -> bool {
        self.members.contains(&obj.id)
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Staged objects in enqueue order
    pub fn iter(&self) -> impl Iterator<Item = &ManagedObject> {
        self.queued.iter()
    }

    /// Remove every staged object from the registry, then empty the queue.
    /// Returns how many objects were actually removed.
    pub fn drain(
        &mut self,
        registry: &mut ObjectRegistry,
        physics: &mut impl PhysicsWorld,
        scene: &mut impl RenderScene,
    ) -> usize {
        let removed = self
            .queued
            .drain(..)
            .filter(|obj| registry.remove(obj, physics, scene))
            .count();
        self.members.clear();
        removed
    }
}
