//! Per-frame session tick
//!
//! Phase order: physics step, collision resolution, removal drain, spawn
//! completion, transform sync, preview input and timers. The physics world is
//! never mutated while its collision events are being drained.

use serde::{Deserialize, Serialize};

use super::arena::Turn;
use super::backend::{AssetLoader, PhysicsWorld, RenderScene};
use super::collision::{CoordinatorSpawner, collect_contacts, resolve_collisions};
use super::preview::PointerEvent;
use super::spawn::{SpawnContext, SpawnMode};
use super::state::{GameEvent, MergeGame};

/// Input gathered by the host since the last frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameInput {
    /// Pointer events in arrival order
    pub pointer: Vec<PointerEvent>,
    /// Quarter turn of the container
    pub turn: Option<Turn>,
}

/// Advance the session by one frame of `dt` seconds
pub fn tick<P, S, A>(game: &mut MergeGame<P, S, A>, input: &FrameInput, dt: f32) -> Vec<GameEvent>
where
    P: PhysicsWorld,
    S: RenderScene,
    A: AssetLoader,
{
    let dt = if dt.is_finite() {
        dt.clamp(0.0, game.config.max_frame_dt)
    } else {
        0.0
    };
    let mut events = Vec::new();

    if let Some(turn) = input.turn {
        game.arena.turn(turn, &mut game.physics);
        events.push(GameEvent::ContainerTurned(turn));
    }

    game.physics.step(dt);

    // Resolve against the registry as it was after the step
    let batch = collect_contacts(&mut game.physics);
    let report = {
        let mut spawner = CoordinatorSpawner {
            coordinator: &mut game.spawner,
            catalog: &game.config.catalog,
            assets: &mut game.assets,
        };
        resolve_collisions(
            &batch,
            &game.physics,
            &game.registry,
            &mut game.removals,
            &mut spawner,
            game.config.merge_spawn_lift,
        )
    };
    game.stats.stale_events += report.stale as u64;
    game.stats.merges += report.merges.len() as u64;
    game.stats.lost_merges += report.lost.len() as u64;
    events.extend(report.merges.into_iter().map(|m| GameEvent::Merged {
        consumed: m.consumed,
        into: m.into,
        position: m.position,
    }));
    events.extend(report.lost.into_iter().map(|l| GameEvent::MergeLost {
        consumed: l.consumed,
        into: l.into,
    }));

    game.removals
        .drain(&mut game.registry, &mut game.physics, &mut game.scene);

    // Safe point: finished loads become objects
    let outcomes = {
        let mut ctx = SpawnContext {
            catalog: &game.config.catalog,
            physics: &mut game.physics,
            scene: &mut game.scene,
            assets: &mut game.assets,
            registry: &mut game.registry,
        };
        game.spawner.poll_spawns(&mut ctx)
    };
    for outcome in outcomes {
        if let Some(obj) = game.preview.on_spawned(&outcome) {
            events.push(GameEvent::PreviewReady(obj));
            continue;
        }
        match outcome.result {
            Ok(obj) if outcome.request.mode == SpawnMode::Dynamic => {
                events.push(GameEvent::Spawned(obj));
            }
            Ok(obj) => log::warn!("Unclaimed preview {} #{}", obj.kind, obj.id.0),
            Err(error) => {
                game.stats.failed_spawns += 1;
                events.push(GameEvent::SpawnFailed {
                    kind: outcome.request.kind,
                    error,
                });
            }
        }
    }

    game.registry.sync_transforms(&game.physics, &mut game.scene);

    for &event in &input.pointer {
        let committed =
            game.preview
                .handle_pointer(event, &mut game.physics, &mut game.scene, &mut game.registry);
        match committed {
            Some(Ok(obj)) => {
                game.stats.committed += 1;
                events.push(GameEvent::Committed(obj));
            }
            Some(Err(error)) => events.push(GameEvent::CommitFailed(error)),
            None => {}
        }
    }
    game.preview
        .update(dt, &mut game.spawner, &game.config.catalog, &mut game.assets);

    game.time_ticks += 1;
    events
}
