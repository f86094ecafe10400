//! Collision resolution
//!
//! Turns the contact pairs reported by one physics step into merges. A pair
//! qualifies when both colliders belong to registered objects, neither object
//! is already consumed this tick, both are the same kind and that kind has a
//! successor. Both objects of a qualifying pair are consumed before the
//! successor is requested, so the set of consumed objects never depends on
//! whether the spawn slot happens to be free. Consumed objects go to the
//! removal queue; nothing is detached from the world here.

use glam::Vec3;

use super::backend::{ColliderHandle, PhysicsWorld};
use super::ladder::ItemKind;
use super::registry::{ManagedObject, ObjectRegistry};
use super::removal::RemovalQueue;
use super::spawn::{SpawnCoordinator, SpawnRequest, SpawnTicket};
use crate::error::GameError;
use crate::lifted_midpoint;
use crate::settings::ItemCatalog;

/// One contact pair from a physics step
pub type ContactPair = (ColliderHandle, ColliderHandle);

/// Where merge results are sent
pub trait MergeSpawner {
    /// Request a live (non-preview) item. May fail with `SpawnBusy`.
    fn spawn_merged(&mut self, kind: ItemKind, position: Vec3) -> Result<SpawnTicket, GameError>;
}

/// [`MergeSpawner`] backed by the spawn coordinator
pub struct CoordinatorSpawner<'a, A> {
    pub coordinator: &'a mut SpawnCoordinator,
    pub catalog: &'a ItemCatalog,
    pub assets: &'a mut A,
}

impl<A: super::backend::AssetLoader> MergeSpawner for CoordinatorSpawner<'_, A> {
    fn spawn_merged(&mut self, kind: ItemKind, position: Vec3) -> Result<SpawnTicket, GameError> {
        self.coordinator
            .request(SpawnRequest::dynamic(kind, position), self.catalog, &mut *self.assets)
    }
}

/// A merge performed during resolution
#[derive(Debug, Clone, PartialEq)]
pub struct Merge {
    pub consumed: [ManagedObject; 2],
    pub into: ItemKind,
    pub position: Vec3,
    pub ticket: SpawnTicket,
}

/// A pair consumed while the spawn slot was unavailable; its successor is lost
#[derive(Debug, Clone, PartialEq)]
pub struct LostMerge {
    pub consumed: [ManagedObject; 2],
    pub into: ItemKind,
    pub error: GameError,
}

/// What happened to a single contact pair
#[derive(Debug, Clone, PartialEq)]
pub enum ContactVerdict {
    /// One side is not a registered object (removed, wall, floor, preview)
    Stale,
    /// Both colliders belong to the same object
    SameObject,
    /// One side is already consumed this tick
    AlreadyQueued,
    KindMismatch,
    /// Both are the terminal kind
    Terminal,
    Merged(Merge),
    /// Consumed, but the successor spawn was refused
    SuccessorLost(LostMerge),
}

/// Summary of one resolution pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveReport {
    pub events: usize,
    pub stale: usize,
    pub merges: Vec<Merge>,
    /// Consumed pairs whose successor spawn was refused
    pub lost: Vec<LostMerge>,
}

/// Drain the contact pairs of the last step into an owned batch.
///
/// The physics world is only borrowed for the duration of the drain; the
/// resolver works on the batch afterwards.
pub fn collect_contacts(physics: &mut impl PhysicsWorld) -> Vec<ContactPair> {
    let mut batch = Vec::new();
    physics.drain_collision_events(&mut |a, b| batch.push((a, b)));
    batch
}

/// Decide a single contact pair
pub fn resolve_contact(
    pair: ContactPair,
    physics: &impl PhysicsWorld,
    registry: &ObjectRegistry,
    removals: &mut RemovalQueue,
    spawner: &mut impl MergeSpawner,
    lift: f32,
) -> ContactVerdict {
    let (Ok(a), Ok(b)) = (
        registry.resolve_collider(physics, pair.0),
        registry.resolve_collider(physics, pair.1),
    ) else {
        return ContactVerdict::Stale;
    };
    if a.id == b.id {
        return ContactVerdict::SameObject;
    }
    if removals.contains(&a) || removals.contains(&b) {
        return ContactVerdict::AlreadyQueued;
    }
    if a.kind != b.kind {
        return ContactVerdict::KindMismatch;
    }
    let Some(into) = a.kind.successor() else {
        return ContactVerdict::Terminal;
    };
    let (Some(pose_a), Some(pose_b)) = (physics.body_transform(a.body), physics.body_transform(b.body))
    else {
        return ContactVerdict::Stale;
    };

    let position = lifted_midpoint(pose_a.translation, pose_b.translation, lift);
    removals.enqueue(a);
    removals.enqueue(b);
    match spawner.spawn_merged(into, position) {
        Ok(ticket) => ContactVerdict::Merged(Merge {
            consumed: [a, b],
            into,
            position,
            ticket,
        }),
        Err(error) => ContactVerdict::SuccessorLost(LostMerge {
            consumed: [a, b],
            into,
            error,
        }),
    }
}

/// Resolve a whole batch in the order the physics world reported it
pub fn resolve_collisions(
    batch: &[ContactPair],
    physics: &impl PhysicsWorld,
    registry: &ObjectRegistry,
    removals: &mut RemovalQueue,
    spawner: &mut impl MergeSpawner,
    lift: f32,
) -> ResolveReport {
    let mut report = ResolveReport {
        events: batch.len(),
        ..ResolveReport::default()
    };

    for &pair in batch {
        match resolve_contact(pair, physics, registry, removals, spawner, lift) {
            ContactVerdict::Merged(merge) => {
                log::debug!(
                    "Merged {} #{} + #{} -> {} at {:?}",
                    merge.consumed[0].kind,
                    merge.consumed[0].id.0,
                    merge.consumed[1].id.0,
                    merge.into,
                    merge.position
                );
                report.merges.push(merge);
            }
            ContactVerdict::Stale => {
                log::trace!("Skipped contact {:?}: unregistered collider", pair);
                report.stale += 1;
            }
            ContactVerdict::SuccessorLost(lost) => {
                log::debug!(
                    "Merged {} #{} + #{}, {} lost: {}",
                    lost.consumed[0].kind,
                    lost.consumed[0].id.0,
                    lost.consumed[1].id.0,
                    lost.into,
                    lost.error
                );
                report.lost.push(lost);
            }
            _ => {}
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::MERGE_SPAWN_LIFT;
    use crate::platform::headless::{HeadlessAssets, HeadlessPhysics, HeadlessScene};
    use crate::sim::backend::{BodyDesc, BodyKind, RenderHandle, RenderScene, Transform};
    use crate::sim::registry::ObjectId;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    /// Records merge spawns instead of loading anything
    #[derive(Default)]
    struct RecordingSpawner {
        requests: Vec<(ItemKind, Vec3)>,
        busy: bool,
    }

    impl MergeSpawner for RecordingSpawner {
        fn spawn_merged(&mut self, kind: ItemKind, position: Vec3) -> Result<SpawnTicket, GameError> {
            if self.busy {
                return Err(GameError::SpawnBusy);
            }
            self.requests.push((kind, position));
            Ok(SpawnTicket(self.requests.len() as u64))
        }
    }

    #[derive(Default)]
    struct World {
        physics: HeadlessPhysics,
        scene: HeadlessScene,
        registry: ObjectRegistry,
        next_id: u32,
    }

    impl World {
        /// Register an item and return its single collider
        fn item(&mut self, kind: ItemKind, pos: Vec3) -> ColliderHandle {
            self.next_id += 1;
            let body = self
                .physics
                .create_body(&BodyDesc::new(BodyKind::Dynamic, Transform::from_translation(pos)));
            let collider = self.physics.attach_ball(body, 0.5);
            let render = RenderHandle(self.next_id);
            self.scene.add(render);
            self.registry
                .add(ManagedObject {
                    id: ObjectId(self.next_id),
                    kind,
                    render,
                    body,
                })
                .unwrap();
            collider
        }

        /// A collider on a body the registry does not know (a wall)
        fn wall(&mut self) -> ColliderHandle {
            let body = self
                .physics
                .create_body(&BodyDesc::new(BodyKind::KinematicPosition, Transform::IDENTITY));
            self.physics.attach_ball(body, 1.0)
        }

        fn resolve(
            &self,
            batch: &[ContactPair],
            spawner: &mut RecordingSpawner,
        ) -> (ResolveReport, RemovalQueue) {
            let mut removals = RemovalQueue::new();
            let report = resolve_collisions(
                batch,
                &self.physics,
                &self.registry,
                &mut removals,
                spawner,
                MERGE_SPAWN_LIFT,
            );
            (report, removals)
        }
    }

    fn removal_ids(removals: &RemovalQueue) -> BTreeSet<u32> {
        removals.iter().map(|o| o.id.0).collect()
    }

    #[test]
    fn test_two_rice_merge_into_chili() {
        let mut world = World::default();
        let a = world.item(ItemKind::Rice, Vec3::new(-0.5, 1.0, 0.0));
        let b = world.item(ItemKind::Rice, Vec3::new(0.5, 2.0, 0.0));
        let mut spawner = RecordingSpawner::default();

        let (report, removals) = world.resolve(&[(a, b)], &mut spawner);

        assert_eq!(removal_ids(&removals), BTreeSet::from([1, 2]));
        assert_eq!(spawner.requests.len(), 1);
        let (kind, pos) = spawner.requests[0];
        assert_eq!(kind, ItemKind::Chili);
        assert!((pos - Vec3::new(0.0, 1.5 + MERGE_SPAWN_LIFT, 0.0)).length() < 1e-6);
        assert_eq!(report.merges.len(), 1);
        assert_eq!(report.merges[0].into, ItemKind::Chili);
    }

    #[test]
    fn test_kind_mismatch_does_nothing() {
        let mut world = World::default();
        let a = world.item(ItemKind::Rice, Vec3::ZERO);
        let b = world.item(ItemKind::Chili, Vec3::X);
        let mut spawner = RecordingSpawner::default();

        let (report, removals) = world.resolve(&[(a, b)], &mut spawner);
        assert!(removals.is_empty());
        assert!(spawner.requests.is_empty());
        assert!(report.merges.is_empty());
    }

    #[test]
    fn test_terminal_pair_never_merges() {
        let mut world = World::default();
        let a = world.item(ItemKind::Peach, Vec3::ZERO);
        let b = world.item(ItemKind::Peach, Vec3::X);
        let mut spawner = RecordingSpawner::default();

        let mut removals = RemovalQueue::new();
        let verdict = resolve_contact(
            (a, b),
            &world.physics,
            &world.registry,
            &mut removals,
            &mut spawner,
            MERGE_SPAWN_LIFT,
        );
        assert_eq!(verdict, ContactVerdict::Terminal);
        assert!(removals.is_empty());
        assert!(spawner.requests.is_empty());
    }

    #[test]
    fn test_queued_object_not_consumed_twice() {
        let mut world = World::default();
        let a = world.item(ItemKind::Garlic, Vec3::ZERO);
        let b = world.item(ItemKind::Garlic, Vec3::X);
        let c = world.item(ItemKind::Garlic, Vec3::Y);
        let mut spawner = RecordingSpawner::default();

        let (report, removals) = world.resolve(&[(a, b), (b, c), (c, a)], &mut spawner);
        assert_eq!(report.merges.len(), 1);
        assert_eq!(removal_ids(&removals), BTreeSet::from([1, 2]));
        assert_eq!(spawner.requests.len(), 1);
    }

    #[test]
    fn test_stale_and_wall_contacts_skipped() {
        let mut world = World::default();
        let a = world.item(ItemKind::Rice, Vec3::ZERO);
        let wall = world.wall();
        let mut spawner = RecordingSpawner::default();

        let (report, removals) =
            world.resolve(&[(a, wall), (a, ColliderHandle(4242))], &mut spawner);
        assert_eq!(report.stale, 2);
        assert_eq!(report.events, 2);
        assert!(removals.is_empty());
    }

    #[test]
    fn test_busy_spawn_still_consumes_pair() {
        let mut world = World::default();
        let a = world.item(ItemKind::Plum, Vec3::ZERO);
        let b = world.item(ItemKind::Plum, Vec3::X);
        let mut spawner = RecordingSpawner {
            busy: true,
            ..Default::default()
        };

        let (report, removals) = world.resolve(&[(a, b)], &mut spawner);
        assert_eq!(removal_ids(&removals), BTreeSet::from([1, 2]));
        assert!(report.merges.is_empty());
        assert!(spawner.requests.is_empty());
        assert_eq!(report.lost.len(), 1);
        assert_eq!(report.lost[0].into, ItemKind::Apple);
        assert_eq!(report.lost[0].error, GameError::SpawnBusy);
    }

    #[test]
    fn test_collect_contacts_drains_batch() {
        let mut world = World::default();
        let a = world.item(ItemKind::Rice, Vec3::ZERO);
        let b = world.item(ItemKind::Rice, Vec3::X);
        world.physics.push_contact(a, b);

        assert_eq!(collect_contacts(&mut world.physics), vec![(a, b)]);
        assert!(collect_contacts(&mut world.physics).is_empty());
    }

    /// Disjoint qualifying pairs plus noise: mismatches, terminals, walls, stale handles
    fn mixed_batch(world: &mut World) -> (Vec<ContactPair>, BTreeSet<u32>) {
        let mut batch = Vec::new();
        let mut expected = BTreeSet::new();
        let kinds = [ItemKind::Rice, ItemKind::Rice, ItemKind::Garlic, ItemKind::Apple];
        let mut firsts = Vec::new();
        for (i, kind) in kinds.into_iter().enumerate() {
            let x = i as f32 * 2.0;
            let a = world.item(kind, Vec3::new(x, 0.0, 0.0));
            let b = world.item(kind, Vec3::new(x + 1.0, 0.0, 0.0));
            expected.insert(world.next_id - 1);
            expected.insert(world.next_id);
            batch.push((a, b));
            firsts.push(a);
        }
        let odd = world.item(ItemKind::Plum, Vec3::new(0.0, 5.0, 0.0));
        let p1 = world.item(ItemKind::Peach, Vec3::new(2.0, 5.0, 0.0));
        let p2 = world.item(ItemKind::Peach, Vec3::new(3.0, 5.0, 0.0));
        let wall = world.wall();
        for &a in &firsts {
            batch.push((a, odd));
            batch.push((wall, a));
        }
        batch.push((p1, p2));
        batch.push((ColliderHandle(9999), firsts[0]));
        (batch, expected)
    }

    #[test]
    fn test_reverse_order_same_removals() {
        let mut world = World::default();
        let (batch, expected) = mixed_batch(&mut world);

        let mut spawner = RecordingSpawner::default();
        let (_, forward) = world.resolve(&batch, &mut spawner);
        let reversed: Vec<_> = batch.iter().rev().copied().collect();
        let mut spawner = RecordingSpawner::default();
        let (_, backward) = world.resolve(&reversed, &mut spawner);

        assert_eq!(removal_ids(&forward), expected);
        assert_eq!(removal_ids(&backward), expected);
    }

    /// Resolve through a real coordinator, whose slot stays held after the first merge
    fn resolve_with_coordinator(
        world: &World,
        batch: &[ContactPair],
    ) -> (ResolveReport, RemovalQueue, SpawnCoordinator) {
        let catalog = ItemCatalog::default();
        let mut assets = HeadlessAssets::default();
        let mut coordinator = SpawnCoordinator::new();
        let mut removals = RemovalQueue::new();
        let report = {
            let mut spawner = CoordinatorSpawner {
                coordinator: &mut coordinator,
                catalog: &catalog,
                assets: &mut assets,
            };
            resolve_collisions(
                batch,
                &world.physics,
                &world.registry,
                &mut removals,
                &mut spawner,
                MERGE_SPAWN_LIFT,
            )
        };
        (report, removals, coordinator)
    }

    #[test]
    fn test_disjoint_pairs_with_single_spawn_slot() {
        let mut world = World::default();
        let a = world.item(ItemKind::Rice, Vec3::new(-2.0, 0.0, 0.0));
        let b = world.item(ItemKind::Rice, Vec3::new(-1.0, 0.0, 0.0));
        let c = world.item(ItemKind::Rice, Vec3::new(1.0, 0.0, 0.0));
        let d = world.item(ItemKind::Rice, Vec3::new(2.0, 0.0, 0.0));

        let (forward, forward_removals, coordinator) =
            resolve_with_coordinator(&world, &[(a, b), (c, d)]);
        let (backward, backward_removals, _) =
            resolve_with_coordinator(&world, &[(c, d), (a, b)]);

        assert_eq!(removal_ids(&forward_removals), BTreeSet::from([1, 2, 3, 4]));
        assert_eq!(removal_ids(&backward_removals), BTreeSet::from([1, 2, 3, 4]));
        assert!(coordinator.is_busy());
        for report in [&forward, &backward] {
            assert_eq!(report.merges.len(), 1);
            assert_eq!(report.lost.len(), 1);
            assert_eq!(report.lost[0].error, GameError::SpawnBusy);
        }
        // The first reported pair gets the successor
        assert_eq!(forward.merges[0].consumed[0].id, ObjectId(1));
        assert_eq!(backward.merges[0].consumed[0].id, ObjectId(3));
    }

    proptest! {
        #[test]
        fn prop_removals_independent_of_order_with_busy_slot(
            order in Just((0..14usize).collect::<Vec<_>>()).prop_shuffle()
        ) {
            let mut world = World::default();
            let (batch, expected) = mixed_batch(&mut world);
            let shuffled: Vec<_> = order.iter().map(|&i| batch[i]).collect();

            let (report, removals, _) = resolve_with_coordinator(&world, &shuffled);

            prop_assert_eq!(removal_ids(&removals), expected);
            prop_assert_eq!(report.merges.len(), 1);
            prop_assert_eq!(report.lost.len(), 3);
        }

        #[test]
        fn prop_removals_independent_of_event_order(
            order in Just((0..14usize).collect::<Vec<_>>()).prop_shuffle()
        ) {
            let mut world = World::default();
            let (batch, expected) = mixed_batch(&mut world);
            prop_assert_eq!(batch.len(), 14);
            let shuffled: Vec<_> = order.iter().map(|&i| batch[i]).collect();

            let mut spawner = RecordingSpawner::default();
            let (report, removals) = world.resolve(&shuffled, &mut spawner);

            prop_assert_eq!(removal_ids(&removals), expected);
            prop_assert_eq!(report.merges.len(), 4);
            prop_assert_eq!(spawner.requests.len(), 4);
        }
    }
}
