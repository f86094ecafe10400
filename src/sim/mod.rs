//! Game-logic coordination
//!
//! Everything here talks to physics, rendering and asset loading through the
//! traits in [`backend`], so the same logic runs against the headless
//! collaborators and a real engine:
//! - Deterministic given a seed and an input script
//! - Stable iteration order (by object id)
//! - One spawn in flight at a time
//! - World mutation only at the post-resolution safe point

pub mod arena;
pub mod backend;
pub mod collision;
pub mod ladder;
pub mod preview;
pub mod registry;
pub mod removal;
pub mod spawn;
pub mod state;
pub mod tick;

pub use arena::{Arena, Turn};
pub use backend::{
    AssetFuture, AssetLoader, BodyHandle, ColliderHandle, ColliderShape, PhysicsWorld, RenderHandle,
    RenderScene, Transform,
};
pub use collision::{
    ContactVerdict, LostMerge, Merge, MergeSpawner, ResolveReport, resolve_collisions,
};
pub use ladder::ItemKind;
pub use preview::{PointerEvent, PreviewController, PreviewState};
pub use registry::{ManagedObject, ObjectId, ObjectRegistry};
pub use removal::RemovalQueue;
pub use spawn::{SpawnCoordinator, SpawnMode, SpawnOutcome, SpawnRequest, SpawnTicket};
pub use state::{GameEvent, MergeGame, SessionStats};
pub use tick::{FrameInput, tick};
