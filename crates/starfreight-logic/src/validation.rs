//! Pre-flight mission validation.
//!
//! Checks run in a fixed order and stop after the first stage that finds a
//! blocking problem:
//!
//! 1. vehicle exists and is a freighter
//! 2. vehicle is idle, unassigned and empty
//! 3. origin and destination exist and differ
//! 4. station tiers (and colony-site rules) fit the vehicle's size class
//! 5. requested cargo per leg fits in the hold
//! 6. cargo and fuel are available for kinds that reserve upfront
//!
//! Validation never mutates anything. Warnings do not block a launch.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cargo::{self, CargoLine};
use crate::config::EngineConfig;
use crate::galaxy::{FacilityRegistry, LocationStorage, VehicleKind, VehicleRegistry};
use crate::ids::{BodyId, LocationId, MissionId, VehicleId};
use crate::mission::MissionKind;
use crate::physics::{self, SizeClass};
use crate::resources::{ResourceKind, ResourceMap, AMOUNT_EPSILON};

// ============================================================================
// REQUEST
// ============================================================================

/// Everything needed to validate or launch a mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionRequest {
    pub vehicle: VehicleId,
    pub destination: LocationId,
    pub kind: MissionKind,
    pub outbound: Vec<CargoLine>,
    pub return_cargo: Vec<CargoLine>,
    /// Colonization only: preferred body for the colony facilities.
    pub site: Option<BodyId>,
}

impl MissionRequest {
    pub fn one_way(vehicle: VehicleId, destination: LocationId, cargo: Vec<CargoLine>) -> Self {
        Self {
            vehicle,
            destination,
            kind: MissionKind::OneWay,
            outbound: cargo,
            return_cargo: Vec::new(),
            site: None,
        }
    }

    pub fn round_trip(
        vehicle: VehicleId,
        destination: LocationId,
        outbound: Vec<CargoLine>,
        return_cargo: Vec<CargoLine>,
    ) -> Self {
        Self {
            vehicle,
            destination,
            kind: MissionKind::RoundTrip,
            outbound,
            return_cargo,
            site: None,
        }
    }

    pub fn recurring(
        vehicle: VehicleId,
        destination: LocationId,
        outbound: Vec<CargoLine>,
        return_cargo: Vec<CargoLine>,
    ) -> Self {
        Self {
            kind: MissionKind::RecurringRoute,
            ..Self::round_trip(vehicle, destination, outbound, return_cargo)
        }
    }

    pub fn colonization(
        vehicle: VehicleId,
        destination: LocationId,
        cargo: Vec<CargoLine>,
        site: Option<BodyId>,
    ) -> Self {
        Self {
            vehicle,
            destination,
            kind: MissionKind::ColonizationRun,
            outbound: cargo,
            return_cargo: Vec::new(),
            site,
        }
    }

    fn has_return_leg(&self) -> bool {
        matches!(self.kind, MissionKind::RoundTrip | MissionKind::RecurringRoute)
    }
}

// ============================================================================
// RESULT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Leg {
    Outbound,
    Return,
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Outbound => "outbound",
            Self::Return => "return",
        })
    }
}

/// A problem that blocks mission creation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("vehicle {0} does not exist")]
    UnknownVehicle(VehicleId),
    #[error("vehicle {vehicle} is a {kind:?}; only freighters can fly logistics missions")]
    WrongVehicleClass { vehicle: VehicleId, kind: VehicleKind },
    #[error("vehicle {vehicle} is already assigned to mission {mission}")]
    VehicleBusy { vehicle: VehicleId, mission: MissionId },
    #[error("vehicle {0} is not idle")]
    VehicleNotIdle(VehicleId),
    #[error("vehicle {0} still carries undelivered cargo")]
    LeftoverCargo(VehicleId),
    #[error("origin location {0} does not exist")]
    UnknownOrigin(LocationId),
    #[error("destination location {0} does not exist")]
    UnknownDestination(LocationId),
    #[error("origin and destination are both {0}")]
    SameLocation(LocationId),
    #[error("{location} has a tier {tier} station; {size:?} vehicles need tier {required}")]
    StationTierTooLow {
        location: LocationId,
        tier: u8,
        required: u8,
        size: SizeClass,
    },
    #[error("{0} is already colonized")]
    AlreadyColonized(LocationId),
    #[error("body {site} is not a free facility site at {location}")]
    InvalidSite { site: BodyId, location: LocationId },
    #[error("{0} has no body with a free facility slot")]
    NoFacilitySite(LocationId),
    #[error("a colonization run needs cargo to deliver")]
    NothingToShip,
    #[error("cargo line for {0} requests an invalid amount")]
    InvalidAmount(ResourceKind),
    #[error("{leg} cargo weighs {weight:.1}, vehicle capacity is {capacity:.1}")]
    OverCapacity { leg: Leg, weight: f64, capacity: f64 },
    #[error("insufficient {resource} at {location}: need {needed:.1}, have {available:.1}")]
    InsufficientResource {
        resource: ResourceKind,
        location: LocationId,
        needed: f64,
        available: f64,
    },
    #[error("insufficient fuel at {location}: need {needed:.1}, have {available:.1}")]
    InsufficientFuel {
        location: LocationId,
        needed: f64,
        available: f64,
    },
}

/// A problem worth showing the player that does not block creation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationWarning {
    #[error("outbound leg carries no cargo")]
    EmptyOutbound,
    #[error("return leg carries no cargo")]
    EmptyReturn,
    #[error("cargo line for {0} requests nothing and will be skipped")]
    ZeroQuantityLine(ResourceKind),
    #[error("no {resource} is available at {location} right now; the route will wait for it")]
    CurrentlyUnavailable {
        resource: ResourceKind,
        location: LocationId,
    },
    #[error("cargo falls short of colony requirements ({shortfall}); the run will try to source the rest")]
    BelowColonyRequirements { shortfall: ResourceMap },
}

/// Outcome of [`validate_mission`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    /// Fuel charged at launch (upfront kinds), for the first leg
    /// (colonization), or per cycle (recurring routes).
    pub fuel_estimate: f64,
    /// One-leg travel time in game hours.
    pub travel_hours: f64,
}

impl ValidationResult {
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }

    fn reject(mut self, errors: Vec<ValidationError>) -> Self {
        self.valid = false;
        self.errors.extend(errors);
        self
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Validate a mission request against the current galaxy state.
pub fn validate_mission<G>(galaxy: &G, config: &EngineConfig, req: &MissionRequest) -> ValidationResult
where
    G: VehicleRegistry + LocationStorage + FacilityRegistry + ?Sized,
{
    let result = ValidationResult::default();

    // 1. Vehicle exists and is the right class
    let Some(vehicle) = galaxy.vehicle(req.vehicle) else {
        return result.reject(vec![ValidationError::UnknownVehicle(req.vehicle)]);
    };
    if vehicle.kind != VehicleKind::Freighter {
        return result.reject(vec![ValidationError::WrongVehicleClass {
            vehicle: vehicle.id,
            kind: vehicle.kind,
        }]);
    }

    // 2. Vehicle is free
    if let Some(mission) = vehicle.state.mission {
        return result.reject(vec![ValidationError::VehicleBusy {
            vehicle: vehicle.id,
            mission,
        }]);
    }
    if !vehicle.is_idle() {
        return result.reject(vec![ValidationError::VehicleNotIdle(vehicle.id)]);
    }
    if vehicle.carries_cargo() {
        return result.reject(vec![ValidationError::LeftoverCargo(vehicle.id)]);
    }

    // 3. Route endpoints
    let origin_id = vehicle.state.location;
    let Some(origin) = galaxy.location(origin_id) else {
        return result.reject(vec![ValidationError::UnknownOrigin(origin_id)]);
    };
    let Some(destination) = galaxy.location(req.destination) else {
        return result.reject(vec![ValidationError::UnknownDestination(req.destination)]);
    };
    if origin.id == destination.id {
        return result.reject(vec![ValidationError::SameLocation(origin.id)]);
    }

    // 4. Station tiers
    let profile = vehicle.profile;
    let required = profile.size_class.spec().min_station_tier;
    let mut errors = Vec::new();
    if origin.station_tier < required {
        errors.push(ValidationError::StationTierTooLow {
            location: origin.id,
            tier: origin.station_tier,
            required,
            size: profile.size_class,
        });
    }
    if req.kind == MissionKind::ColonizationRun {
        // The destination has no port yet; it must simply be unclaimed.
        if galaxy.is_colonized(destination.id) {
            errors.push(ValidationError::AlreadyColonized(destination.id));
        }
        let bodies = galaxy.bodies_at(destination.id);
        match req.site {
            Some(site) if !bodies.iter().any(|b| b.id == site && b.free_slots() > 0) => {
                errors.push(ValidationError::InvalidSite {
                    site,
                    location: destination.id,
                });
            }
            None if !bodies.iter().any(|b| b.free_slots() > 0) => {
                errors.push(ValidationError::NoFacilitySite(destination.id));
            }
            _ => {}
        }
    } else if destination.station_tier < required {
        errors.push(ValidationError::StationTierTooLow {
            location: destination.id,
            tier: destination.station_tier,
            required,
            size: profile.size_class,
        });
    }
    if !errors.is_empty() {
        return result.reject(errors);
    }

    // 5. Cargo bounds
    for line in req.outbound.iter().chain(&req.return_cargo) {
        if !line.requested.is_finite() || line.requested < 0.0 {
            errors.push(ValidationError::InvalidAmount(line.kind));
        }
    }
    let outbound_weight = cargo::requested_weight(&req.outbound);
    let return_weight = if req.has_return_leg() {
        cargo::requested_weight(&req.return_cargo)
    } else {
        0.0
    };
    if req.kind == MissionKind::ColonizationRun {
        if cargo::is_deadhead(&req.outbound) {
            errors.push(ValidationError::NothingToShip);
        }
    } else {
        if outbound_weight > profile.capacity + AMOUNT_EPSILON {
            errors.push(ValidationError::OverCapacity {
                leg: Leg::Outbound,
                weight: outbound_weight,
                capacity: profile.capacity,
            });
        }
        if return_weight > profile.capacity + AMOUNT_EPSILON {
            errors.push(ValidationError::OverCapacity {
                leg: Leg::Return,
                weight: return_weight,
                capacity: profile.capacity,
            });
        }
    }
    if !errors.is_empty() {
        return result.reject(errors);
    }

    // Estimates and warnings
    let mut result = result;
    let distance = galaxy.distance(origin.id, destination.id).unwrap_or(0.0);
    result.travel_hours =
        physics::travel_time_hours(distance, &profile, config.global_speed_multiplier);
    let first_batch_weight = outbound_weight.min(profile.capacity);
    let outbound_fuel = physics::fuel_cost(distance, first_batch_weight, &profile);
    let return_fuel = physics::fuel_cost(distance, return_weight, &profile);
    result.fuel_estimate = match req.kind {
        MissionKind::OneWay | MissionKind::ColonizationRun => outbound_fuel,
        MissionKind::RoundTrip | MissionKind::RecurringRoute => outbound_fuel + return_fuel,
    };

    if req.kind != MissionKind::ColonizationRun && cargo::is_deadhead(&req.outbound) {
        result.warnings.push(ValidationWarning::EmptyOutbound);
    }
    if req.has_return_leg() && cargo::is_deadhead(&req.return_cargo) {
        result.warnings.push(ValidationWarning::EmptyReturn);
    }
    for line in req.outbound.iter().chain(&req.return_cargo) {
        if line.requested.abs() <= AMOUNT_EPSILON {
            result.warnings.push(ValidationWarning::ZeroQuantityLine(line.kind));
        }
    }

    // 6. Availability
    match req.kind {
        MissionKind::OneWay | MissionKind::RoundTrip | MissionKind::ColonizationRun => {
            let mut origin_demand = manifest_map(&req.outbound);
            origin_demand.add(ResourceKind::Fuel, result.fuel_estimate);
            check_availability(galaxy, origin.id, &origin_demand, &mut errors);
            if req.kind == MissionKind::RoundTrip {
                let return_demand = manifest_map(&req.return_cargo);
                check_availability(galaxy, destination.id, &return_demand, &mut errors);
            }
            if req.kind == MissionKind::ColonizationRun {
                let shortfall = manifest_map(&req.outbound)
                    .shortfall_against(&config.colonization.requirements);
                if !shortfall.is_empty() {
                    result
                        .warnings
                        .push(ValidationWarning::BelowColonyRequirements { shortfall });
                }
            }
        }
        MissionKind::RecurringRoute => {
            // Resolved just in time on every leg; only flag what is dry now.
            for (at, manifest) in [
                (origin.id, &req.outbound),
                (destination.id, &req.return_cargo),
            ] {
                for line in manifest.iter().filter(|l| l.requested > AMOUNT_EPSILON) {
                    if galaxy.amount(at, line.kind) <= AMOUNT_EPSILON {
                        result.warnings.push(ValidationWarning::CurrentlyUnavailable {
                            resource: line.kind,
                            location: at,
                        });
                    }
                }
            }
        }
    }
    if !errors.is_empty() {
        return result.reject(errors);
    }

    result.valid = true;
    result
}

fn manifest_map(lines: &[CargoLine]) -> ResourceMap {
    let mut map = ResourceMap::new();
    for line in lines {
        map.add(line.kind, line.requested.max(0.0));
    }
    map
}

fn check_availability<G>(
    galaxy: &G,
    location: LocationId,
    demand: &ResourceMap,
    errors: &mut Vec<ValidationError>,
) where
    G: LocationStorage + ?Sized,
{
    for (resource, needed) in demand.iter() {
        let available = galaxy.amount(location, resource);
        if available + AMOUNT_EPSILON >= needed {
            continue;
        }
        errors.push(if resource == ResourceKind::Fuel {
            ValidationError::InsufficientFuel {
                location,
                needed,
                available,
            }
        } else {
            ValidationError::InsufficientResource {
                resource,
                location,
                needed,
                available,
            }
        });
    }
}
