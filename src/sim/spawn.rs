//! Spawn coordinator
//!
//! Creating an item waits on its model load. Only one load is in flight at a
//! time; the in-flight slot is the spawn lock. While it is held, preview
//! requests queue up and are retried when it frees, and merge requests are
//! rejected with `SpawnBusy`.
//!
//! The coordinator owns the load futures and polls them from
//! [`SpawnCoordinator::poll_spawns`], which the session calls at its post-drain
//! safe point. Bodies, colliders and scene nodes are only created there, after
//! the model has resolved, so a failed load never leaves a partial object.

use std::collections::VecDeque;
use std::task::{Context, Poll, Waker};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::backend::{
    AssetFuture, AssetLoader, BodyDesc, BodyKind, ColliderDesc, PhysicsWorld, RenderHandle,
    RenderScene, Transform,
};
use super::ladder::ItemKind;
use super::registry::{ManagedObject, ObjectId, ObjectRegistry};
use crate::error::GameError;
use crate::settings::ItemCatalog;

/// Whether a spawned item is a physics-disabled preview or a live item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnMode {
    /// Disabled body, withheld from the registry until committed
    Preview,
    /// Dynamic body, registered as soon as it exists
    Dynamic,
}

/// Identifies one spawn request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpawnTicket(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRequest {
    pub kind: ItemKind,
    pub position: Vec3,
    pub mode: SpawnMode,
}

impl SpawnRequest {
    pub fn preview(kind: ItemKind, position: Vec3) -> Self {
        Self {
            kind,
            position,
            mode: SpawnMode::Preview,
        }
    }

    pub fn dynamic(kind: ItemKind, position: Vec3) -> Self {
        Self {
            kind,
            position,
            mode: SpawnMode::Dynamic,
        }
    }
}

/// A finished request, successful or not
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnOutcome {
    pub ticket: SpawnTicket,
    pub request: SpawnRequest,
    pub result: Result<ManagedObject, GameError>,
}

struct InFlightSpawn {
    ticket: SpawnTicket,
    request: SpawnRequest,
    asset: String,
    load: AssetFuture,
}

/// Everything a spawn touches once its model has loaded
pub struct SpawnContext<'a, P, S, A> {
    pub catalog: &'a ItemCatalog,
    pub physics: &'a mut P,
    pub scene: &'a mut S,
    pub assets: &'a mut A,
    pub registry: &'a mut ObjectRegistry,
}

#[derive(Default)]
pub struct SpawnCoordinator {
    /// Held spawn lock
    in_flight: Option<InFlightSpawn>,
    /// Preview requests waiting for the lock, oldest first
    waiting: VecDeque<(SpawnTicket, SpawnRequest)>,
    next_ticket: u64,
    next_object: u32,
}

impl std::fmt::Debug for SpawnCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnCoordinator")
            .field("in_flight", &self.in_flight.as_ref().map(|s| (s.ticket, s.request)))
            .field("waiting", &self.waiting)
            .field("next_ticket", &self.next_ticket)
            .finish()
    }
}

impl SpawnCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a load is in flight
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Preview requests queued behind the lock
    pub fn waiting_previews(&self) -> usize {
        self.waiting.len()
    }

    /// Ticket of the in-flight request, if any
    pub fn in_flight(&self) -> Option<SpawnTicket> {
        self.in_flight.as_ref().map(|s| s.ticket)
    }

    fn issue_ticket(&mut self) -> SpawnTicket {
        self.next_ticket += 1;
        SpawnTicket(self.next_ticket)
    }

    fn issue_object_id(&mut self) -> ObjectId {
        self.next_object += 1;
        ObjectId(self.next_object)
    }

    /// Ask for a new item.
    ///
    /// Fails immediately with `UnknownItemType` if the kind is not in the
    /// catalog, or with `SpawnBusy` for a merge spawn while another spawn is in
    /// flight. Preview requests never fail for contention; they wait.
    pub fn request(
        &mut self,
        request: SpawnRequest,
        catalog: &ItemCatalog,
        assets: &mut impl AssetLoader,
    ) -> Result<SpawnTicket, GameError> {
        let spec = catalog.get(request.kind)?;

        if self.is_busy() {
            return match request.mode {
                SpawnMode::Preview => {
                    let ticket = self.issue_ticket();
                    log::trace!("Preview {} waiting for spawn lock ({:?})", request.kind, ticket);
                    self.waiting.push_back((ticket, request));
                    Ok(ticket)
                }
                SpawnMode::Dynamic => Err(GameError::SpawnBusy),
            };
        }

        let ticket = self.issue_ticket();
        let asset = spec.asset.clone();
        self.start(ticket, request, asset, assets);
        Ok(ticket)
    }

    fn start(
        &mut self,
        ticket: SpawnTicket,
        request: SpawnRequest,
        asset: String,
        assets: &mut impl AssetLoader,
    ) {
        log::trace!("Loading '{}' for {} ({:?})", asset, request.kind, ticket);
        let load = assets.load(&asset);
        self.in_flight = Some(InFlightSpawn {
            ticket,
            request,
            asset,
            load,
        });
    }

    /// Resume in-flight loads and build every object whose model is ready.
    ///
    /// Waiting previews are retried, from validation onwards, as soon as the
    /// lock frees. Returns the outcomes in completion order.
    pub fn poll_spawns<P, S, A>(&mut self, ctx: &mut SpawnContext<'_, P, S, A>) -> Vec<SpawnOutcome>
    where
        P: PhysicsWorld,
        S: RenderScene,
        A: AssetLoader,
    {
        let mut outcomes = Vec::new();
        let mut cx = Context::from_waker(Waker::noop());

        loop {
            if self.in_flight.is_none() {
                let Some((ticket, request)) = self.waiting.pop_front() else {
                    break;
                };
                match ctx.catalog.get(request.kind) {
                    Ok(spec) => {
                        let asset = spec.asset.clone();
                        self.start(ticket, request, asset, &mut *ctx.assets);
                    }
                    Err(e) => {
                        outcomes.push(SpawnOutcome {
                            ticket,
                            request,
                            result: Err(e),
                        });
                        continue;
                    }
                }
            }

            let Some(mut flight) = self.in_flight.take() else {
                break;
            };
            let loaded = match flight.load.as_mut().poll(&mut cx) {
                Poll::Pending => {
                    self.in_flight = Some(flight);
                    break;
                }
                Poll::Ready(loaded) => loaded,
            };

            let result = match loaded {
                Ok(render) => self.build(&flight, render, ctx),
                Err(source) => Err(GameError::AssetLoadFailed {
                    asset: flight.asset.clone(),
                    source,
                }),
            };
            match &result {
                Ok(obj) => log::debug!(
                    "Spawned {} #{} ({:?}) at {:?}",
                    obj.kind,
                    obj.id.0,
                    flight.request.mode,
                    flight.request.position
                ),
                Err(e) => log::warn!("Spawn of {} failed: {}", flight.request.kind, e),
            }
            outcomes.push(SpawnOutcome {
                ticket: flight.ticket,
                request: flight.request,
                result,
            });
        }

        outcomes
    }

    /// Create body, collider and scene node for a loaded model
    fn build<P, S, A>(
        &mut self,
        flight: &InFlightSpawn,
        render: RenderHandle,
        ctx: &mut SpawnContext<'_, P, S, A>,
    ) -> Result<ManagedObject, GameError>
    where
        P: PhysicsWorld,
        S: RenderScene,
    {
        let request = flight.request;
        let spec = ctx.catalog.get(request.kind)?;
        let transform = Transform::from_translation(request.position);

        let mut body_desc = BodyDesc::new(BodyKind::Dynamic, transform);
        body_desc.linear_damping = spec.linear_damping;
        body_desc.angular_damping = spec.angular_damping;
        body_desc.enabled = request.mode == SpawnMode::Dynamic;
        body_desc.can_sleep = false;
        let body = ctx.physics.create_body(&body_desc);

        ctx.physics.create_collider(
            &ColliderDesc {
                shape: spec.collider,
                local: Transform {
                    translation: spec.collider_offset,
                    rotation: spec.collider_rotation,
                },
                material: spec.material,
                collision_events: true,
            },
            body,
        );

        ctx.scene.add(render);
        ctx.scene.set_transform(render, transform);
        ctx.scene.set_scale(render, Vec3::splat(spec.scale));

        let obj = ManagedObject {
            id: self.issue_object_id(),
            kind: request.kind,
            render,
            body,
        };

        if request.mode == SpawnMode::Dynamic {
            if let Err(e) = ctx.registry.add(obj) {
                ctx.physics.remove_body(body);
                ctx.scene.remove(render);
                return Err(e);
            }
        }
        Ok(obj)
    }
}
