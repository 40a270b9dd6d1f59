//! Pure logistics mission logic for Starfreight.
//!
//! This crate contains the mission engine and everything it depends on,
//! independent of any ECS, renderer or runtime. The galaxy the engine acts on
//! is reached only through the collaborator traits in [`galaxy`], so the
//! same code drives the `hecs` world in `starfreight-core`, the headless
//! harness, and the in-memory fixtures used by the unit tests.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`cargo`] | Just-in-time loading, storage-aware unloading, batch splitting |
//! | [`colonization`] | Multi-trip colonization runs and colony founding |
//! | [`config`] | Engine tunables and colony rules, with validation |
//! | [`engine`] | Mission launch, cancellation and the per-tick phase machine |
//! | [`galaxy`] | Collaborator traits: vehicles, storage, facilities, notifications |
//! | [`ids`] | Typed identifiers and the mission id generator |
//! | [`mission`] | Mission kinds, phases, statuses, summaries and the store |
//! | [`physics`] | Vehicle size classes, fuel and travel-time formulas |
//! | [`resources`] | Closed resource set and fixed-size resource maps |
//! | [`validation`] | Staged pre-flight checks with errors and warnings |

pub mod cargo;
pub mod colonization;
pub mod config;
pub mod engine;
pub mod galaxy;
pub mod ids;
pub mod mission;
pub mod physics;
pub mod resources;
pub mod validation;

#[cfg(test)]
mod testkit;

pub use engine::{CancelError, CancelOutcome, LaunchError, LogisticsEngine, ResidualError};
pub use validation::{MissionRequest, ValidationResult};
