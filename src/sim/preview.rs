//! Drag-to-place preview controller
//!
//! Holds at most one floating item. The item's body is disabled (no gravity,
//! no contacts) while the player drags it sideways; releasing the pointer
//! commits it: physics is switched on and the item joins the registry. The
//! next preview is requested after a short settle delay, and never while the
//! previous request is still pending.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::backend::{AssetLoader, PhysicsWorld, RenderScene};
use super::ladder::ItemKind;
use super::registry::{ManagedObject, ObjectRegistry};
use super::spawn::{SpawnCoordinator, SpawnMode, SpawnOutcome, SpawnRequest, SpawnTicket};
use crate::error::GameError;
use crate::settings::{GameConfig, ItemCatalog};

/// Pointer or touch input, already mapped to a world-space lateral x
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    /// Press; `inside` is false when it landed outside the render surface
    Down { x: f32, inside: bool },
    Move { x: f32 },
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PreviewState {
    Idle,
    /// `grab_offset` keeps the item from jumping under the pointer
    Dragging { grab_offset: f32 },
}

#[derive(Debug)]
pub struct PreviewController {
    state: PreviewState,
    /// Uncommitted preview item
    held: Option<ManagedObject>,
    /// Ticket of the preview spawn we are waiting on
    pending: Option<SpawnTicket>,
    next_kind: ItemKind,
    /// Seconds left before the next preview is requested
    settle: Option<f32>,
    rng: Pcg32,
    pool: Vec<ItemKind>,
    x_limit: f32,
    spawn_height: f32,
    settle_delay: f32,
}

impl PreviewController {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            state: PreviewState::Idle,
            held: None,
            pending: None,
            next_kind: config.first_preview,
            settle: None,
            rng: Pcg32::seed_from_u64(config.seed),
            pool: config.preview_pool(),
            x_limit: config.preview_x_limit,
            spawn_height: config.preview_spawn_height,
            settle_delay: config.preview_settle_delay,
        }
    }

    pub fn state(&self) -> PreviewState {
        self.state
    }

    pub fn held(&self) -> Option<&ManagedObject> {
        self.held.as_ref()
    }

    pub fn pending(&self) -> Option<SpawnTicket> {
        self.pending
    }

    /// Kind of the next preview to be requested
    pub fn next_kind(&self) -> ItemKind {
        self.next_kind
    }

    /// Clamp a lateral position to the container's inner bounds
    #[inline]
    pub fn clamp_x(&self, x: f32) -> f32 {
        x.clamp(-self.x_limit, self.x_limit)
    }

    fn choose_next_kind(&mut self) {
        if self.pool.is_empty() {
            return;
        }
        let idx = self.rng.random_range(0..self.pool.len());
        self.next_kind = self.pool[idx];
    }

    fn schedule_next(&mut self) {
        self.choose_next_kind();
        self.settle = Some(self.settle_delay);
    }

    /// Request the next preview spawn unless one is held or pending
    pub fn request_preview(
        &mut self,
        spawner: &mut SpawnCoordinator,
        catalog: &ItemCatalog,
        assets: &mut impl AssetLoader,
    ) -> Option<SpawnTicket> {
        if self.held.is_some() || self.pending.is_some() {
            return None;
        }
        let position = Vec3::new(0.0, self.spawn_height, 0.0);
        match spawner.request(SpawnRequest::preview(self.next_kind, position), catalog, assets) {
            Ok(ticket) => {
                self.pending = Some(ticket);
                self.settle = None;
                Some(ticket)
            }
            Err(e) => {
                log::warn!("Preview {} not requested: {}", self.next_kind, e);
                self.schedule_next();
                None
            }
        }
    }

    /// Take a finished spawn if it is ours. Returns the new preview on success.
    pub fn on_spawned(&mut self, outcome: &SpawnOutcome) -> Option<ManagedObject> {
        if outcome.request.mode != SpawnMode::Preview || self.pending != Some(outcome.ticket) {
            return None;
        }
        self.pending = None;
        match &outcome.result {
            Ok(obj) => {
                log::debug!("Preview ready: {} #{}", obj.kind, obj.id.0);
                self.held = Some(*obj);
                self.state = PreviewState::Idle;
                Some(*obj)
            }
            Err(e) => {
                log::warn!("Preview {} failed, retrying: {}", outcome.request.kind, e);
                self.schedule_next();
                None
            }
        }
    }

    /// Feed one pointer event. Returns the committed item on release.
    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        physics: &mut impl PhysicsWorld,
        scene: &mut impl RenderScene,
        registry: &mut ObjectRegistry,
    ) -> Option<Result<ManagedObject, GameError>> {
        match (event, self.state) {
            (PointerEvent::Down { x, inside: true }, PreviewState::Idle) => {
                let held = self.held?;
                let current = physics.body_transform(held.body)?.translation.x;
                self.state = PreviewState::Dragging {
                    grab_offset: current - x,
                };
                None
            }
            (PointerEvent::Move { x }, PreviewState::Dragging { grab_offset }) => {
                let held = self.held?;
                let mut transform = physics.body_transform(held.body)?;
                transform.translation.x = self.clamp_x(x + grab_offset);
                physics.set_kinematic_transform(held.body, transform);
                scene.set_transform(held.render, transform);
                None
            }
            (PointerEvent::Up, PreviewState::Dragging { .. }) => self.commit(physics, registry),
            _ => None,
        }
    }

    /// Hand the held preview over to the simulation. `None` if nothing is held.
    ///
    /// Registry insertion is the only fallible step and happens first; if it
    /// fails the preview stays held, physics-disabled, and the drag ends.
    pub fn commit(
        &mut self,
        physics: &mut impl PhysicsWorld,
        registry: &mut ObjectRegistry,
    ) -> Option<Result<ManagedObject, GameError>> {
        let obj = self.held?;
        self.state = PreviewState::Idle;
        if let Err(e) = registry.add(obj) {
            log::warn!("Commit of {} #{} refused: {}", obj.kind, obj.id.0, e);
            return Some(Err(e));
        }

        if let Some(transform) = physics.body_transform(obj.body) {
            physics.set_kinematic_transform(obj.body, transform);
        }
        physics.set_body_enabled(obj.body, true);

        self.held = None;
        self.schedule_next();
        log::debug!("Committed {} #{}", obj.kind, obj.id.0);
        Some(Ok(obj))
    }

    /// Count down the settle delay and request the next preview when it ends
    pub fn update(
        &mut self,
        dt: f32,
        spawner: &mut SpawnCoordinator,
        catalog: &ItemCatalog,
        assets: &mut impl AssetLoader,
    ) {
        let Some(remaining) = self.settle else {
            return;
        };
        let remaining = remaining - dt;
        if remaining > 0.0 {
            self.settle = Some(remaining);
            return;
        }
        self.settle = None;
        self.request_preview(spawner, catalog, assets);
    }
}
