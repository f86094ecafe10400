//! Error taxonomy for the coordinator
//!
//! None of these are fatal: the frame loop keeps running whatever happens to
//! an individual spawn, merge or collision event.

use thiserror::Error;

use crate::sim::backend::{BodyHandle, ColliderHandle};

/// Errors surfaced by the registry, spawn coordinator and collision resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// The requested item type is not in the configured catalog
    #[error("unknown item type: {0}")]
    UnknownItemType(String),

    /// The asset loader failed; no partial object was left behind
    #[error("asset load failed for '{asset}': {source}")]
    AssetLoadFailed {
        asset: String,
        #[source]
        source: AssetError,
    },

    /// A spawn is already in flight and the request cannot wait
    #[error("spawn slot busy")]
    SpawnBusy,

    /// The body handle already maps to a live object
    #[error("body {0:?} is already registered")]
    DuplicateHandle(BodyHandle),

    /// A collision referenced a collider with no registered owner
    #[error("collider {0:?} has no registered owner")]
    StaleHandle(ColliderHandle),
}

/// Failure reported by an [`AssetLoader`](crate::sim::backend::AssetLoader).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct AssetError(pub String);

impl AssetError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Errors from loading or validating a [`GameConfig`](crate::GameConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
