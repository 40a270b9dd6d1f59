//! Starfreight Core - Galaxy Logistics Simulation
//!
//! An ECS world of star systems, bodies and freighters, driven by the
//! logistics mission engine from `starfreight-logic`.
//!
//! # Architecture
//!
//! The galaxy lives in a `hecs` world:
//! - **Entities**: Locations, bodies, facilities, vehicles
//! - **Components**: Pure data attached to entities (Location, Stockpile, Ship, etc.)
//! - **Engine**: [`GalaxyWorld`](galaxy::GalaxyWorld) implements the mission
//!   engine's collaborator traits; [`SimulationEngine`](engine::SimulationEngine)
//!   turns frame time into fixed logistics ticks
//!
//! # Example
//!
//! ```rust,no_run
//! use starfreight_core::prelude::*;
//!
//! let scenario = ScenarioSpec::from_path("data/scenario.json").unwrap();
//! let mut engine = SimulationEngine::from_scenario(EngineConfig::default(), &scenario).unwrap();
//!
//! engine
//!     .create_one_way_mission(
//!         VehicleId(1),
//!         LocationId(2),
//!         vec![CargoLine::request(ResourceKind::Steel, 100.0)],
//!     )
//!     .unwrap();
//!
//! loop {
//!     engine.update(1.0 / 60.0); // 60 FPS
//! }
//! ```

pub mod components;
pub mod engine;
pub mod galaxy;
pub mod notifications;
pub mod scenario;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::{EngineError, SimulationEngine};
    pub use crate::galaxy::GalaxyWorld;
    pub use crate::notifications::{Notification, NotificationLog};
    pub use crate::scenario::{ScenarioError, ScenarioSpec};
    pub use starfreight_logic::cargo::CargoLine;
    pub use starfreight_logic::config::EngineConfig;
    pub use starfreight_logic::galaxy::*;
    pub use starfreight_logic::ids::*;
    pub use starfreight_logic::mission::{
        AbortCause, Completion, MissionKind, MissionPhase, MissionStatus, MissionSummary,
        WaitReason,
    };
    pub use starfreight_logic::physics::SizeClass;
    pub use starfreight_logic::resources::{ResourceKind, ResourceMap};
    pub use starfreight_logic::{CancelOutcome, MissionRequest};
}
