//! Platform collaborators
//!
//! Implementations of the physics/scene/asset traits for running the
//! coordinator without a browser, GPU or real rigid-body engine:
//! - `headless`: in-memory world used by the native driver and the tests

pub mod headless;

pub use headless::{HeadlessAssets, HeadlessPhysics, HeadlessScene};
