//! Logistics engine.
//!
//! Owns every mission and advances each non-completed one by exactly one
//! phase handler per [`LogisticsEngine::process_tick`], in mission-id order.
//! All side effects go through the [`Galaxy`] collaborator traits, so the
//! same engine runs against the ECS world in `starfreight-core` and the
//! in-memory fixture used by the unit tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cargo::{self, CargoLine, LoadOutcome};
use crate::colonization;
use crate::config::EngineConfig;
use crate::galaxy::{Galaxy, LocationStorage, Severity, Vehicle, VehicleState, VehicleStatus};
use crate::ids::{BodyId, IdGenerator, LocationId, MissionId, SequentialIds, VehicleId};
use crate::mission::{
    AbortCause, Completion, Mission, MissionKind, MissionPhase, MissionStatus, MissionStore,
    MissionSummary, Wait, WaitReason,
};
use crate::physics;
use crate::resources::{ResourceKind, ResourceMap, AMOUNT_EPSILON};
use crate::validation::{self, MissionRequest, ValidationResult};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LaunchError {
    #[error("mission rejected: {}", .0.error_messages().join("; "))]
    Rejected(ValidationResult),
    #[error("vehicle {0} could not be dispatched")]
    DispatchFailed(VehicleId),
}

impl LaunchError {
    /// The validation report, when the request was rejected up front.
    pub fn validation(&self) -> Option<&ValidationResult> {
        match self {
            Self::Rejected(result) => Some(result),
            Self::DispatchFailed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CancelError {
    #[error("mission {0} does not exist")]
    NotFound(MissionId),
    #[error("mission {0} has already completed")]
    AlreadyCompleted(MissionId),
    #[error("mission {0} is already being cancelled")]
    AlreadyCancelling(MissionId),
}

/// What a successful cancellation did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CancelOutcome {
    /// The vehicle finishes its current leg first; the mission completes on a
    /// later tick.
    Scheduled,
    /// Completed on the spot. `residual` is whatever stays aboard the vehicle.
    Completed { residual: ResourceMap },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResidualError {
    #[error("vehicle {0} does not exist")]
    UnknownVehicle(VehicleId),
    #[error("vehicle {vehicle} is still assigned to mission {mission}")]
    VehicleBusy { vehicle: VehicleId, mission: MissionId },
    #[error("vehicle {0} is not docked")]
    NotDocked(VehicleId),
    #[error("vehicle {0} has nothing aboard")]
    NothingAboard(VehicleId),
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug)]
pub struct LogisticsEngine {
    config: EngineConfig,
    store: MissionStore,
    clock_ms: u64,
    ids: Box<dyn IdGenerator>,
}

impl LogisticsEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_id_generator(config, Box::new(SequentialIds::new()))
    }

    pub fn with_id_generator(config: EngineConfig, ids: Box<dyn IdGenerator>) -> Self {
        Self {
            config,
            store: MissionStore::new(),
            clock_ms: 0,
            ids,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Tick-clock time in milliseconds since the engine started.
    pub fn now_ms(&self) -> u64 {
        self.clock_ms
    }

    pub fn mission(&self, id: MissionId) -> Option<&Mission> {
        self.store.get(id)
    }

    pub fn missions(&self) -> impl Iterator<Item = &Mission> {
        self.store.iter()
    }

    pub fn mission_for_vehicle(&self, vehicle: VehicleId) -> Option<MissionId> {
        self.store.mission_for_vehicle(vehicle)
    }

    pub fn active_count(&self) -> usize {
        self.store.active_count()
    }

    pub fn summaries(&self) -> Vec<MissionSummary> {
        self.store
            .iter()
            .map(|m| MissionSummary::of(m, self.clock_ms))
            .collect()
    }

    /// Forget completed missions. Returns how many were dropped.
    pub fn prune_completed(&mut self) -> usize {
        self.store.prune_completed()
    }

    pub fn validate_mission<G: Galaxy + ?Sized>(
        &self,
        galaxy: &G,
        request: &MissionRequest,
    ) -> ValidationResult {
        validation::validate_mission(galaxy, &self.config, request)
    }

    pub fn create_one_way_mission<G: Galaxy + ?Sized>(
        &mut self,
        galaxy: &mut G,
        vehicle: VehicleId,
        destination: LocationId,
        cargo: Vec<CargoLine>,
    ) -> Result<MissionId, LaunchError> {
        self.launch(galaxy, MissionRequest::one_way(vehicle, destination, cargo))
    }

    pub fn create_round_trip_mission<G: Galaxy + ?Sized>(
        &mut self,
        galaxy: &mut G,
        vehicle: VehicleId,
        destination: LocationId,
        outbound: Vec<CargoLine>,
        return_cargo: Vec<CargoLine>,
    ) -> Result<MissionId, LaunchError> {
        let request = MissionRequest::round_trip(vehicle, destination, outbound, return_cargo);
        self.launch(galaxy, request)
    }

    pub fn create_recurring_route<G: Galaxy + ?Sized>(
        &mut self,
        galaxy: &mut G,
        vehicle: VehicleId,
        destination: LocationId,
        outbound: Vec<CargoLine>,
        return_cargo: Vec<CargoLine>,
    ) -> Result<MissionId, LaunchError> {
        let request = MissionRequest::recurring(vehicle, destination, outbound, return_cargo);
        self.launch(galaxy, request)
    }

    pub fn create_colonization_run<G: Galaxy + ?Sized>(
        &mut self,
        galaxy: &mut G,
        vehicle: VehicleId,
        destination: LocationId,
        cargo: Vec<CargoLine>,
        site: Option<BodyId>,
    ) -> Result<MissionId, LaunchError> {
        let request = MissionRequest::colonization(vehicle, destination, cargo, site);
        self.launch(galaxy, request)
    }

    /// Validate and start a mission. Nothing is deducted unless the whole
    /// request passes.
    pub fn launch<G: Galaxy + ?Sized>(
        &mut self,
        galaxy: &mut G,
        request: MissionRequest,
    ) -> Result<MissionId, LaunchError> {
        let report = validation::validate_mission(galaxy, &self.config, &request);
        if !report.valid {
            log::warn!(
                "{} for {} rejected: {}",
                request.kind.name(),
                request.vehicle,
                report.error_messages().join("; ")
            );
            return Err(LaunchError::Rejected(report));
        }
        let vehicle = galaxy
            .vehicle(request.vehicle)
            .ok_or(LaunchError::DispatchFailed(request.vehicle))?;

        let id = self.ids.next_mission_id();
        let origin = vehicle.state.location;
        let mut mission = Mission::new(
            id,
            vehicle.id,
            request.kind,
            origin,
            request.destination,
            self.clock_ms,
        );
        mission.outbound = request.outbound.clone();
        if matches!(
            request.kind,
            MissionKind::RoundTrip | MissionKind::RecurringRoute
        ) {
            mission.return_cargo = request.return_cargo.clone();
        }

        let mut ctx = TickContext {
            galaxy,
            config: &self.config,
            now_ms: self.clock_ms,
        };
        let launched = match request.kind {
            MissionKind::OneWay | MissionKind::RoundTrip => {
                launch_reserved(&mut ctx, &mut mission, &vehicle, report.fuel_estimate)
            }
            MissionKind::RecurringRoute => link_vehicle(&mut ctx, &mission, &vehicle),
            MissionKind::ColonizationRun => {
                colonization::launch(&mut ctx, &mut mission, &vehicle, request.site)
            }
        };
        if launched.is_err() {
            return Err(LaunchError::DispatchFailed(vehicle.id));
        }

        log::info!(
            "{} {} launched: {} from {} to {}",
            mission.kind.name(),
            id,
            vehicle.name,
            mission.origin,
            mission.destination
        );
        self.store.insert(mission);
        Ok(id)
    }

    /// Cancel a mission. In-flight vehicles finish their leg first.
    pub fn cancel_mission<G: Galaxy + ?Sized>(
        &mut self,
        galaxy: &mut G,
        id: MissionId,
    ) -> Result<CancelOutcome, CancelError> {
        let mission = self.store.get_mut(id).ok_or(CancelError::NotFound(id))?;
        if mission.is_completed() {
            return Err(CancelError::AlreadyCompleted(id));
        }
        if mission.is_cancelling() {
            return Err(CancelError::AlreadyCancelling(id));
        }

        let mut ctx = TickContext {
            galaxy,
            config: &self.config,
            now_ms: self.clock_ms,
        };
        let outcome = if mission.kind == MissionKind::ColonizationRun {
            colonization::cancel(&mut ctx, mission)
        } else {
            let stuck_for_space = mission
                .wait()
                .is_some_and(|w| w.reason == WaitReason::StorageSpace);
            if mission.phase.is_in_transit() || (!mission.current_cargo.is_empty() && !stuck_for_space)
            {
                mission.status = MissionStatus::Cancelling;
                CancelOutcome::Scheduled
            } else {
                complete(&mut ctx, mission, Completion::Cancelled);
                CancelOutcome::Completed {
                    residual: mission.cargo_aboard(),
                }
            }
        };

        log::info!("{} {} cancelled ({:?})", mission.kind.name(), id, outcome);
        if mission.is_completed() {
            let vehicle = mission.vehicle;
            self.store.release_vehicle(vehicle, id);
        }
        Ok(outcome)
    }

    /// Advance the clock by `delta_ms` and every active mission by one step.
    pub fn process_tick<G: Galaxy + ?Sized>(&mut self, galaxy: &mut G, delta_ms: u64) {
        self.clock_ms = self.clock_ms.saturating_add(delta_ms);
        let mut ctx = TickContext {
            galaxy,
            config: &self.config,
            now_ms: self.clock_ms,
        };

        for id in self.store.active_ids() {
            let Some(mission) = self.store.get_mut(id) else {
                continue;
            };
            if let Err(cause) = advance(&mut ctx, mission) {
                abort(&mut ctx, mission, cause);
            }
            if mission.is_completed() {
                let vehicle = mission.vehicle;
                self.store.release_vehicle(vehicle, id);
            }
        }
    }

    /// Deposit whatever fits of an idle vehicle's stranded cargo at its
    /// current location. Returns what was unloaded.
    pub fn dump_residual_cargo<G: Galaxy + ?Sized>(
        &self,
        galaxy: &mut G,
        vehicle: VehicleId,
    ) -> Result<ResourceMap, ResidualError> {
        let mut vehicle = galaxy
            .vehicle(vehicle)
            .ok_or(ResidualError::UnknownVehicle(vehicle))?;
        if let Some(mission) = self.store.mission_for_vehicle(vehicle.id) {
            return Err(ResidualError::VehicleBusy {
                vehicle: vehicle.id,
                mission,
            });
        }
        if !vehicle.is_idle() {
            return Err(ResidualError::NotDocked(vehicle.id));
        }
        if !vehicle.carries_cargo() {
            return Err(ResidualError::NothingAboard(vehicle.id));
        }

        let at = vehicle.state.location;
        let mut unloaded = ResourceMap::new();
        let aboard = vehicle.state.cargo;
        for (kind, amount) in aboard.iter() {
            let put = amount.min(galaxy.free_space(at, kind));
            if put > AMOUNT_EPSILON {
                galaxy.deposit(at, kind, put);
                vehicle.state.cargo.take(kind, put);
                unloaded.add(kind, put);
            }
        }
        galaxy.set_vehicle_state(vehicle.id, vehicle.state);
        log::info!("{} dumped {} at {}", vehicle.id, unloaded, at);
        Ok(unloaded)
    }
}

// ============================================================================
// TICK CONTEXT & SHARED HELPERS
// ============================================================================

/// Borrowed state a phase handler needs.
pub(crate) struct TickContext<'a, G: ?Sized> {
    pub galaxy: &'a mut G,
    pub config: &'a EngineConfig,
    pub now_ms: u64,
}

/// Result of a phase handler. `Err` force-completes the mission.
pub(crate) type Step = Result<(), AbortCause>;

fn launch_reserved<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
    vehicle: &Vehicle,
    fuel: f64,
) -> Step {
    mission.current_cargo = mission
        .outbound
        .iter()
        .filter(|l| l.requested > AMOUNT_EPSILON)
        .map(|l| CargoLine::reserved(l.kind, l.requested))
        .collect();
    let destination = mission.destination;
    depart(
        ctx,
        mission,
        vehicle,
        destination,
        MissionPhase::InTransitToDestination,
    )?;

    // Dispatch succeeded; commit the reservation.
    for line in &mission.current_cargo {
        ctx.galaxy.deduct(mission.origin, line.kind, line.loaded);
    }
    ctx.galaxy.deduct(mission.origin, ResourceKind::Fuel, fuel);
    mission.fuel_consumed += fuel;
    Ok(())
}

fn link_vehicle<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &Mission,
    vehicle: &Vehicle,
) -> Step {
    let mut state = vehicle.state.clone();
    state.mission = Some(mission.id);
    if ctx.galaxy.set_vehicle_state(vehicle.id, state) {
        Ok(())
    } else {
        Err(AbortCause::VehicleLost)
    }
}

/// Put the vehicle in flight towards `to` and move the mission to `phase`.
pub(crate) fn depart<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
    vehicle: &Vehicle,
    to: LocationId,
    phase: MissionPhase,
) -> Step {
    let from = vehicle.state.location;
    let distance = ctx
        .galaxy
        .distance(from, to)
        .ok_or(AbortCause::LocationLost)?;
    let hours = physics::travel_time_hours(
        distance,
        &vehicle.profile,
        ctx.config.global_speed_multiplier,
    );
    let arrival = ctx
        .now_ms
        .saturating_add(physics::hours_to_ms(hours, ctx.config.ms_per_game_hour));

    let state = VehicleState {
        status: VehicleStatus::InTransit,
        location: from,
        destination: Some(to),
        departure_ms: Some(ctx.now_ms),
        arrival_ms: Some(arrival),
        cargo: mission.cargo_aboard(),
        mission: Some(mission.id),
    };
    if !ctx.galaxy.set_vehicle_state(vehicle.id, state) {
        return Err(AbortCause::VehicleLost);
    }

    mission.phase = phase;
    mission.departure_ms = Some(ctx.now_ms);
    mission.arrival_ms = Some(arrival);
    if matches!(mission.status, MissionStatus::Waiting(_)) {
        mission.status = MissionStatus::Active;
    }
    log::debug!(
        "{} departed {} for {} carrying {} (arrives at {} ms)",
        mission.id,
        from,
        to,
        mission.cargo_aboard(),
        arrival
    );
    Ok(())
}

/// Dock the vehicle at `at` after a leg.
fn dock<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
    vehicle: &Vehicle,
    at: LocationId,
) -> Step {
    let state = VehicleState {
        status: VehicleStatus::Idle,
        location: at,
        destination: None,
        departure_ms: None,
        arrival_ms: None,
        cargo: mission.cargo_aboard(),
        mission: Some(mission.id),
    };
    if !ctx.galaxy.set_vehicle_state(vehicle.id, state) {
        return Err(AbortCause::VehicleLost);
    }
    mission.departure_ms = None;
    mission.arrival_ms = None;
    Ok(())
}

/// Mirror the mission's cargo onto the vehicle.
pub(crate) fn sync_cargo<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &Mission,
) -> Step {
    let mut vehicle = ctx
        .galaxy
        .vehicle(mission.vehicle)
        .ok_or(AbortCause::VehicleLost)?;
    vehicle.state.cargo = mission.cargo_aboard();
    if ctx.galaxy.set_vehicle_state(vehicle.id, vehicle.state) {
        Ok(())
    } else {
        Err(AbortCause::VehicleLost)
    }
}

/// Charge `amount` fuel from the pool at `location`. Returns false (and
/// charges nothing) when the pool is short.
pub(crate) fn pay_fuel<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
    location: LocationId,
    amount: f64,
) -> bool {
    let available = ctx.galaxy.amount(location, ResourceKind::Fuel);
    if available + AMOUNT_EPSILON < amount {
        return false;
    }
    let charged = amount.min(available);
    if charged > AMOUNT_EPSILON {
        ctx.galaxy.deduct(location, ResourceKind::Fuel, charged);
        mission.fuel_consumed += charged;
    }
    true
}

/// Fuel for one leg of this mission with the current load.
pub(crate) fn leg_fuel<G: Galaxy + ?Sized>(
    ctx: &TickContext<'_, G>,
    mission: &Mission,
    vehicle: &Vehicle,
) -> Result<f64, AbortCause> {
    let distance = ctx
        .galaxy
        .distance(mission.origin, mission.destination)
        .ok_or(AbortCause::LocationLost)?;
    Ok(physics::fuel_cost(
        distance,
        mission.cargo_weight(),
        &vehicle.profile,
    ))
}

/// Block the mission. Notifies only when the wait begins or changes.
pub(crate) fn enter_wait<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
    wait: Wait,
) {
    if mission.is_cancelling() || mission.wait() == Some(&wait) {
        return;
    }
    mission.status = MissionStatus::Waiting(wait);
    let place = place_name(&*ctx.galaxy, wait.location);
    log::warn!("{} {} at {}", mission.id, mission.status.label(), place);
    if ctx.config.notify_waits {
        let message = format!(
            "{} {}: {} at {}",
            mission.kind.name(),
            mission.id,
            mission.status.label().to_lowercase(),
            place
        );
        ctx.galaxy
            .notify(Severity::Warning, "Mission waiting", &message);
    }
}

/// Finish the mission, free its vehicle and notify.
pub(crate) fn complete<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
    completion: Completion,
) {
    if let Some(mut vehicle) = ctx.galaxy.vehicle(mission.vehicle) {
        if vehicle.state.mission == Some(mission.id) {
            vehicle.state.mission = None;
            vehicle.state.status = VehicleStatus::Idle;
            vehicle.state.destination = None;
            vehicle.state.departure_ms = None;
            vehicle.state.arrival_ms = None;
            vehicle.state.cargo = mission.cargo_aboard();
            ctx.galaxy.set_vehicle_state(vehicle.id, vehicle.state);
        }
    }
    mission.departure_ms = None;
    mission.arrival_ms = None;

    let destination = place_name(&*ctx.galaxy, mission.destination);
    let (severity, title, message) = match &completion {
        Completion::Delivered if mission.kind == MissionKind::ColonizationRun => {
            match mission.colonization.as_ref().and_then(|s| s.population) {
                Some(population) => (
                    Severity::Success,
                    "Colony founded",
                    format!(
                        "{} founded a colony of {} at {} after {} trips",
                        mission.id, population, destination, mission.trips_completed
                    ),
                ),
                None => (
                    Severity::Success,
                    "Colony supplied",
                    format!(
                        "{} delivered its cargo to the existing colony at {}",
                        mission.id, destination
                    ),
                ),
            }
        }
        Completion::Delivered => (
            Severity::Success,
            "Mission complete",
            format!(
                "{} {} to {} finished after {} trip(s)",
                mission.kind.name(),
                mission.id,
                destination,
                mission.trips_completed
            ),
        ),
        Completion::Cancelled => (
            Severity::Info,
            "Mission cancelled",
            format!("{} {} was cancelled", mission.kind.name(), mission.id),
        ),
        Completion::Aborted(cause) => (
            Severity::Error,
            "Mission aborted",
            format!(
                "{} {} aborted: {}",
                mission.kind.name(),
                mission.id,
                match cause {
                    AbortCause::VehicleLost => "its vehicle no longer exists",
                    AbortCause::LocationLost => "a route endpoint no longer exists",
                }
            ),
        ),
        Completion::ColonizationFailed { shortfall } => (
            Severity::Error,
            "Colonization failed",
            format!(
                "{} could not found a colony at {}: still short of {}",
                mission.id, destination, shortfall
            ),
        ),
    };
    ctx.galaxy.notify(severity, title, &message);
    log::info!("{}", message);
    mission.status = MissionStatus::Completed(completion);
}

fn abort<G: Galaxy + ?Sized>(ctx: &mut TickContext<'_, G>, mission: &mut Mission, cause: AbortCause) {
    log::warn!("{} aborting: {:?}", mission.id, cause);
    complete(ctx, mission, Completion::Aborted(cause));
}

pub(crate) fn place_name<G: LocationStorage + ?Sized>(galaxy: &G, id: LocationId) -> String {
    galaxy
        .location(id)
        .map(|l| l.name)
        .unwrap_or_else(|| id.to_string())
}

// ============================================================================
// PHASE HANDLERS
// ============================================================================

fn advance<G: Galaxy + ?Sized>(ctx: &mut TickContext<'_, G>, mission: &mut Mission) -> Step {
    let vehicle = ctx
        .galaxy
        .vehicle(mission.vehicle)
        .ok_or(AbortCause::VehicleLost)?;
    if ctx.galaxy.location(mission.origin).is_none()
        || ctx.galaxy.location(mission.destination).is_none()
    {
        return Err(AbortCause::LocationLost);
    }

    let colonizing = mission.kind == MissionKind::ColonizationRun;
    let (origin, destination) = (mission.origin, mission.destination);
    match mission.phase {
        MissionPhase::AtOriginPreparingOutbound if colonizing => {
            colonization::prepare_at_origin(ctx, mission, &vehicle)
        }
        MissionPhase::AtOriginPreparingOutbound => prepare_outbound(ctx, mission, &vehicle),
        MissionPhase::InTransitToDestination => arrive(
            ctx,
            mission,
            &vehicle,
            destination,
            MissionPhase::AtDestinationUnloadingAndPreparing,
        ),
        MissionPhase::AtDestinationUnloadingAndPreparing if colonizing => {
            colonization::at_destination(ctx, mission, &vehicle)
        }
        MissionPhase::AtDestinationUnloadingAndPreparing => {
            at_destination(ctx, mission, &vehicle)
        }
        MissionPhase::InTransitToOrigin => arrive(
            ctx,
            mission,
            &vehicle,
            origin,
            MissionPhase::AtOriginUnloading,
        ),
        MissionPhase::AtOriginUnloading if colonizing => {
            colonization::at_origin(ctx, mission, &vehicle)
        }
        MissionPhase::AtOriginUnloading => at_origin(ctx, mission),
    }
}

fn prepare_outbound<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
    vehicle: &Vehicle,
) -> Step {
    let origin = mission.origin;
    if mission.is_cancelling() {
        cargo::return_to_storage(ctx.galaxy, origin, &mut mission.current_cargo);
        complete(ctx, mission, Completion::Cancelled);
        return Ok(());
    }

    match cargo::load(ctx.galaxy, origin, &mission.outbound, vehicle.profile.capacity) {
        LoadOutcome::Starved { resource } => {
            enter_wait(ctx, mission, cargo_wait(resource, origin));
            return Ok(());
        }
        LoadOutcome::Loaded(lines) => mission.current_cargo = lines,
    }

    let fuel = leg_fuel(ctx, mission, vehicle)?;
    if !pay_fuel(ctx, mission, origin, fuel) {
        cargo::return_to_storage(ctx.galaxy, origin, &mut mission.current_cargo);
        enter_wait(ctx, mission, fuel_wait(origin));
        return Ok(());
    }

    let destination = mission.destination;
    depart(
        ctx,
        mission,
        vehicle,
        destination,
        MissionPhase::InTransitToDestination,
    )
}

fn arrive<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
    vehicle: &Vehicle,
    at: LocationId,
    next: MissionPhase,
) -> Step {
    match mission.arrival_ms {
        Some(arrival) if ctx.now_ms < arrival => return Ok(()),
        _ => {}
    }
    dock(ctx, mission, vehicle, at)?;
    mission.phase = next;
    log::debug!("{} arrived at {} ({})", mission.id, at, next.label());
    Ok(())
}

fn at_destination<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
    vehicle: &Vehicle,
) -> Step {
    let destination = mission.destination;
    if !unload_here(ctx, mission, destination)? {
        return Ok(());
    }
    if mission.is_cancelling() {
        complete(ctx, mission, Completion::Cancelled);
        return Ok(());
    }
    if mission.kind == MissionKind::OneWay {
        mission.trips_completed += 1;
        complete(ctx, mission, Completion::Delivered);
        return Ok(());
    }

    match cargo::load(
        ctx.galaxy,
        destination,
        &mission.return_cargo,
        vehicle.profile.capacity,
    ) {
        LoadOutcome::Starved { resource } => {
            enter_wait(ctx, mission, cargo_wait(resource, destination));
            return Ok(());
        }
        LoadOutcome::Loaded(lines) => mission.current_cargo = lines,
    }

    // Round trips prepaid both legs at launch.
    if mission.kind == MissionKind::RecurringRoute {
        let fuel = leg_fuel(ctx, mission, vehicle)?;
        if !pay_fuel(ctx, mission, destination, fuel) {
            cargo::return_to_storage(ctx.galaxy, destination, &mut mission.current_cargo);
            enter_wait(ctx, mission, fuel_wait(destination));
            return Ok(());
        }
    }

    let origin = mission.origin;
    depart(ctx, mission, vehicle, origin, MissionPhase::InTransitToOrigin)
}

fn at_origin<G: Galaxy + ?Sized>(ctx: &mut TickContext<'_, G>, mission: &mut Mission) -> Step {
    let origin = mission.origin;
    if !unload_here(ctx, mission, origin)? {
        return Ok(());
    }
    mission.trips_completed += 1;

    if mission.is_cancelling() {
        complete(ctx, mission, Completion::Cancelled);
    } else if mission.kind == MissionKind::RecurringRoute {
        mission.status = MissionStatus::Active;
        mission.phase = MissionPhase::AtOriginPreparingOutbound;
        log::debug!("{} finished cycle {}", mission.id, mission.trips_completed);
    } else {
        complete(ctx, mission, Completion::Delivered);
    }
    Ok(())
}

/// Unload at `at`. Returns true once the hold is empty. A cancelling
/// mission with cargo that does not fit completes on the spot and the
/// vehicle keeps the residual.
fn unload_here<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
    at: LocationId,
) -> Result<bool, AbortCause> {
    let outcome = cargo::unload(ctx.galaxy, at, &mut mission.current_cargo);
    if !outcome.delivered.is_empty() {
        mission.cargo_delivered.merge(&outcome.delivered);
        log::debug!("{} unloaded {} at {}", mission.id, outcome.delivered, at);
    }
    sync_cargo(ctx, mission)?;

    if !outcome.residual {
        return Ok(true);
    }
    if mission.is_cancelling() {
        complete(ctx, mission, Completion::Cancelled);
    } else {
        let resource = mission.current_cargo.first().map(|l| l.kind);
        enter_wait(
            ctx,
            mission,
            Wait {
                reason: WaitReason::StorageSpace,
                resource,
                location: at,
            },
        );
    }
    Ok(false)
}

fn cargo_wait(resource: ResourceKind, location: LocationId) -> Wait {
    Wait {
        reason: WaitReason::Cargo,
        resource: Some(resource),
        location,
    }
}

pub(crate) fn fuel_wait(location: LocationId) -> Wait {
    Wait {
        reason: WaitReason::Fuel,
        resource: Some(ResourceKind::Fuel),
        location,
    }
}
