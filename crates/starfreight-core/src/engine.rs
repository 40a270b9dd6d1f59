//! Simulation engine - main entry point for running the galaxy

use starfreight_logic::cargo::CargoLine;
use starfreight_logic::config::{ConfigError, EngineConfig};
use starfreight_logic::ids::{BodyId, LocationId, MissionId, VehicleId};
use starfreight_logic::mission::{Mission, MissionSummary};
use starfreight_logic::resources::ResourceMap;
use starfreight_logic::{
    CancelError, CancelOutcome, LaunchError, LogisticsEngine, MissionRequest, ResidualError,
    ValidationResult,
};
use thiserror::Error;

use crate::galaxy::GalaxyWorld;
use crate::notifications::NotificationLog;
use crate::scenario::{ScenarioError, ScenarioSpec};

/// Tick-clock milliseconds advanced per logistics tick.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine config: {}", format_config_errors(.0))]
    InvalidConfig(Vec<ConfigError>),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

fn format_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Main simulation engine
///
/// Owns the galaxy world and the logistics engine, and turns frame time into
/// fixed-size logistics ticks.
pub struct SimulationEngine {
    /// ECS world containing every location, body, facility and vehicle
    pub galaxy: GalaxyWorld,
    logistics: LogisticsEngine,
    time_scale: f32,
    tick_interval_ms: u64,
    /// Scaled frame time not yet consumed by a tick
    pending_ms: f64,
    ticks: u64,
}

impl SimulationEngine {
    /// Create an engine over an empty galaxy
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_galaxy(config, GalaxyWorld::new())
    }

    pub fn with_galaxy(config: EngineConfig, galaxy: GalaxyWorld) -> Result<Self, EngineError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(EngineError::InvalidConfig(errors));
        }
        Ok(Self {
            galaxy,
            logistics: LogisticsEngine::new(config),
            time_scale: 1.0,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            pending_ms: 0.0,
            ticks: 0,
        })
    }

    /// Build the galaxy from a scenario
    pub fn from_scenario(config: EngineConfig, scenario: &ScenarioSpec) -> Result<Self, EngineError> {
        let galaxy = scenario.build()?;
        Self::with_galaxy(config, galaxy)
    }

    /// Update the simulation by delta_seconds of real time
    ///
    /// Runs as many fixed ticks as the scaled time covers; the remainder
    /// carries over to the next call.
    pub fn update(&mut self, delta_seconds: f32) {
        let scaled_ms = f64::from(delta_seconds * self.time_scale) * 1000.0;
        if scaled_ms.is_finite() && scaled_ms > 0.0 {
            self.pending_ms += scaled_ms;
        }
        let interval = self.tick_interval_ms as f64;
        while self.pending_ms >= interval {
            self.pending_ms -= interval;
            self.tick(self.tick_interval_ms);
        }
    }

    /// Run one logistics tick of `delta_ms`, bypassing the time scale
    pub fn tick(&mut self, delta_ms: u64) {
        self.logistics.process_tick(&mut self.galaxy, delta_ms);
        self.ticks += 1;
    }

    /// Set time scale (1.0 = real-time, 2.0 = 2x speed, etc.)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn set_tick_interval_ms(&mut self, interval: u64) {
        self.tick_interval_ms = interval.max(1);
    }

    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    /// Ticks run since start
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulation time in game hours since start
    pub fn sim_time(&self) -> f64 {
        self.logistics.now_ms() as f64 / self.logistics.config().ms_per_game_hour
    }

    pub fn logistics(&self) -> &LogisticsEngine {
        &self.logistics
    }

    pub fn notifications(&self) -> &NotificationLog {
        self.galaxy.notifications()
    }

    // ========================================================================
    // MISSIONS
    // ========================================================================

    pub fn validate_mission(&self, request: &MissionRequest) -> ValidationResult {
        self.logistics.validate_mission(&self.galaxy, request)
    }

    pub fn launch(&mut self, request: MissionRequest) -> Result<MissionId, LaunchError> {
        self.logistics.launch(&mut self.galaxy, request)
    }

    pub fn create_one_way_mission(
        &mut self,
        vehicle: VehicleId,
        destination: LocationId,
        cargo: Vec<CargoLine>,
    ) -> Result<MissionId, LaunchError> {
        self.logistics
            .create_one_way_mission(&mut self.galaxy, vehicle, destination, cargo)
    }

    pub fn create_round_trip_mission(
        &mut self,
        vehicle: VehicleId,
        destination: LocationId,
        outbound: Vec<CargoLine>,
        return_cargo: Vec<CargoLine>,
    ) -> Result<MissionId, LaunchError> {
        self.logistics.create_round_trip_mission(
            &mut self.galaxy,
            vehicle,
            destination,
            outbound,
            return_cargo,
        )
    }

    pub fn create_recurring_route(
        &mut self,
        vehicle: VehicleId,
        destination: LocationId,
        outbound: Vec<CargoLine>,
        return_cargo: Vec<CargoLine>,
    ) -> Result<MissionId, LaunchError> {
        self.logistics.create_recurring_route(
            &mut self.galaxy,
            vehicle,
            destination,
            outbound,
            return_cargo,
        )
    }

    pub fn create_colonization_run(
        &mut self,
        vehicle: VehicleId,
        destination: LocationId,
        cargo: Vec<CargoLine>,
        site: Option<BodyId>,
    ) -> Result<MissionId, LaunchError> {
        self.logistics
            .create_colonization_run(&mut self.galaxy, vehicle, destination, cargo, site)
    }

    pub fn cancel_mission(&mut self, id: MissionId) -> Result<CancelOutcome, CancelError> {
        self.logistics.cancel_mission(&mut self.galaxy, id)
    }

    pub fn dump_residual_cargo(&mut self, vehicle: VehicleId) -> Result<ResourceMap, ResidualError> {
        self.logistics.dump_residual_cargo(&mut self.galaxy, vehicle)
    }

    pub fn mission(&self, id: MissionId) -> Option<&Mission> {
        self.logistics.mission(id)
    }

    /// Snapshot of every known mission, in id order
    pub fn summaries(&self) -> Vec<MissionSummary> {
        self.logistics.summaries()
    }

    pub fn active_mission_count(&self) -> usize {
        self.logistics.active_count()
    }
}
