//! Session state
//!
//! Everything one running game owns: the collaborators, the registry and the
//! coordinators that mutate it.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::arena::{Arena, Turn};
use super::backend::{AssetLoader, PhysicsWorld, RenderScene};
use super::ladder::ItemKind;
use super::preview::PreviewController;
use super::registry::{ManagedObject, ObjectRegistry};
use super::removal::RemovalQueue;
use super::spawn::SpawnCoordinator;
use crate::error::{ConfigError, GameError};
use crate::settings::GameConfig;

/// Something that happened during a tick, for the host to react to
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Two items were consumed and their successor requested
    Merged {
        consumed: [ManagedObject; 2],
        into: ItemKind,
        position: Vec3,
    },
    /// Two items were consumed but the spawn slot was busy, so no successor
    MergeLost {
        consumed: [ManagedObject; 2],
        into: ItemKind,
    },
    /// A merge successor entered the registry
    Spawned(ManagedObject),
    SpawnFailed { kind: ItemKind, error: GameError },
    /// A new preview is floating and can be dragged
    PreviewReady(ManagedObject),
    /// The preview was released into the simulation
    Committed(ManagedObject),
    CommitFailed(GameError),
    ContainerTurned(Turn),
}

/// Running totals (not gameplay-affecting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub merges: u64,
    pub lost_merges: u64,
    pub stale_events: u64,
    pub failed_spawns: u64,
    pub committed: u64,
}

/// A merge game session over concrete physics, scene and asset backends
#[derive(Debug)]
pub struct MergeGame<P, S, A> {
    pub config: GameConfig,
    pub physics: P,
    pub scene: S,
    pub assets: A,
    pub registry: ObjectRegistry,
    pub removals: RemovalQueue,
    pub spawner: SpawnCoordinator,
    pub preview: PreviewController,
    pub arena: Arena,
    pub stats: SessionStats,
    /// Simulation tick counter
    pub time_ticks: u64,
}

impl<P, S, A> MergeGame<P, S, A>
where
    P: PhysicsWorld,
    S: RenderScene,
    A: AssetLoader,
{
    /// Build the container and request the first preview
    pub fn new(config: GameConfig, mut physics: P, scene: S, mut assets: A) -> Result<Self, ConfigError> {
        config.validate()?;

        let arena = Arena::build(&config.container, &mut physics);
        let mut spawner = SpawnCoordinator::new();
        let mut preview = PreviewController::new(&config);
        preview.request_preview(&mut spawner, &config.catalog, &mut assets);

        log::info!(
            "Session started (seed {:#x}, {} catalog items)",
            config.seed,
            config.catalog.len()
        );

        Ok(Self {
            config,
            physics,
            scene,
            assets,
            registry: ObjectRegistry::new(),
            removals: RemovalQueue::new(),
            spawner,
            preview,
            arena,
            stats: SessionStats::default(),
            time_ticks: 0,
        })
    }

    /// Live items sorted by id
    pub fn objects(&self) -> Vec<ManagedObject> {
        self.registry.objects()
    }

    /// The floating preview, if one is ready
    pub fn held_preview(&self) -> Option<&ManagedObject> {
        self.preview.held()
    }

    /// Position of a live or held item
    pub fn position_of(&self, obj: &ManagedObject) -> Option<Vec3> {
        self.physics.body_transform(obj.body).map(|t| t.translation)
    }
}
