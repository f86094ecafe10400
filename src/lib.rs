//! Merge Drop - game-logic coordinator for a falling-object merge game
//!
//! Core modules:
//! - `sim`: Deterministic game logic (ladder, registry, spawning, merging, preview)
//! - `platform`: In-memory physics/scene/asset collaborators for headless runs
//! - `settings`: Data-driven item catalog and tuning
//! - `error`: Error taxonomy shared by the coordinator

pub mod error;
pub mod platform;
pub mod settings;
pub mod sim;

pub use error::{AssetError, ConfigError, GameError};
pub use settings::GameConfig;

use glam::Vec3;

/// Game configuration constants (defaults for [`GameConfig`])
pub mod consts {
    /// Fixed simulation timestep used by the headless driver (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Largest frame delta handed to the physics step
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// World gravity (y axis)
    pub const GRAVITY_Y: f32 = -9.81;

    /// Upward bias added to the midpoint of a merging pair
    pub const MERGE_SPAWN_LIFT: f32 = 0.5;

    /// Preview objects are dragged within [-PREVIEW_X_LIMIT, PREVIEW_X_LIMIT]
    pub const PREVIEW_X_LIMIT: f32 = 3.3;
    /// Height at which a fresh preview appears
    pub const PREVIEW_SPAWN_HEIGHT: f32 = 10.0;
    /// Delay between a commit and the next preview spawn (seconds)
    pub const PREVIEW_SETTLE_DELAY: f32 = 0.05;

    /// Container (glass bottle) dimensions
    pub const CONTAINER_WIDTH: f32 = 8.0;
    pub const CONTAINER_HEIGHT: f32 = 10.0;
    pub const CONTAINER_DEPTH: f32 = 4.0;
    pub const CONTAINER_WALL_THICKNESS: f32 = 0.2;

    /// Floor slab (half extents and centre height)
    pub const FLOOR_HALF_EXTENT: f32 = 50.0;
    pub const FLOOR_HALF_THICKNESS: f32 = 0.5;
    pub const FLOOR_Y: f32 = -1.0;
}

/// Midpoint of two positions, lifted along +Y by `lift`
#[inline]
pub fn lifted_midpoint(a: Vec3, b: Vec3, lift: f32) -> Vec3 {
    (a + b) * 0.5 + Vec3::Y * lift
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifted_midpoint() {
        let mid = lifted_midpoint(Vec3::new(-1.0, 2.0, 0.0), Vec3::new(1.0, 4.0, 2.0), 0.5);
        assert!((mid - Vec3::new(0.0, 3.5, 1.0)).length() < 1e-6);
    }
}
