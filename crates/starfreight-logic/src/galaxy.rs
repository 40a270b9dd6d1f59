//! Collaborator interfaces the engine reads and mutates.
//!
//! The engine never owns vehicles, storage pools or facilities. It sees them
//! through these traits, which the host (an ECS world, a test fixture, a
//! database adapter) implements. All calls happen inside a single tick pass,
//! so no implementation needs interior locking.

use serde::{Deserialize, Serialize};

use crate::ids::{BodyId, FacilityId, LocationId, MissionId, VehicleId};
use crate::physics::{self, VehicleProfile};
use crate::resources::{ResourceKind, ResourceMap};

// ============================================================================
// VEHICLES
// ============================================================================

/// Hull role. Only freighters fly logistics missions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleKind {
    Freighter,
    Scout,
    Miner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleStatus {
    /// Docked at `location`.
    Idle,
    /// Flying between `location` (departed from) and `destination`.
    InTransit,
    /// Out of service (damaged, refitting).
    Disabled,
}

/// The part of a vehicle record the engine writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub status: VehicleStatus,
    /// Docked location, or the departure point while in transit.
    pub location: LocationId,
    pub destination: Option<LocationId>,
    pub departure_ms: Option<u64>,
    pub arrival_ms: Option<u64>,
    /// Mirror of what is physically aboard.
    pub cargo: ResourceMap,
    /// Lightweight back-reference; the mission store owns the association.
    pub mission: Option<MissionId>,
}

impl VehicleState {
    pub fn docked_at(location: LocationId) -> Self {
        Self {
            status: VehicleStatus::Idle,
            location,
            destination: None,
            departure_ms: None,
            arrival_ms: None,
            cargo: ResourceMap::new(),
            mission: None,
        }
    }
}

/// Snapshot of a vehicle as the registry reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub name: String,
    pub kind: VehicleKind,
    pub profile: VehicleProfile,
    pub state: VehicleState,
}

impl Vehicle {
    pub fn is_idle(&self) -> bool {
        self.state.status == VehicleStatus::Idle
    }

    pub fn carries_cargo(&self) -> bool {
        !self.state.cargo.is_empty()
    }
}

/// Read/write access to vehicle records.
pub trait VehicleRegistry {
    fn vehicle(&self, id: VehicleId) -> Option<Vehicle>;

    /// Overwrite the mutable state of a vehicle. Returns `false` if the
    /// vehicle no longer exists.
    fn set_vehicle_state(&mut self, id: VehicleId, state: VehicleState) -> bool;
}

// ============================================================================
// LOCATIONS & STORAGE
// ============================================================================

/// Static description of a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub id: LocationId,
    pub name: String,
    pub position: [f64; 3],
    /// 0 = no station.
    pub station_tier: u8,
}

/// Shared per-location resource pools, each resource with its own capacity.
///
/// The engine only reads, decrements and increments these pools. Callers of
/// `deduct` have already checked availability in the same step.
pub trait LocationStorage {
    fn location(&self, id: LocationId) -> Option<LocationInfo>;

    fn amount(&self, id: LocationId, kind: ResourceKind) -> f64;

    fn capacity(&self, id: LocationId, kind: ResourceKind) -> f64;

    fn deduct(&mut self, id: LocationId, kind: ResourceKind, amount: f64);

    fn deposit(&mut self, id: LocationId, kind: ResourceKind, amount: f64);

    fn free_space(&self, id: LocationId, kind: ResourceKind) -> f64 {
        (self.capacity(id, kind) - self.amount(id, kind)).max(0.0)
    }

    fn distance(&self, a: LocationId, b: LocationId) -> Option<f64> {
        let from = self.location(a)?;
        let to = self.location(b)?;
        Some(physics::distance(&from.position, &to.position))
    }
}

// ============================================================================
// FACILITIES (colonization)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacilityKind {
    /// Temporary depot holding colonization cargo until the colony is founded.
    HoldingDepot,
    /// Permanent colony hub.
    ColonyHub,
}

/// A body at a location that can host facilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyInfo {
    pub id: BodyId,
    pub name: String,
    pub location: LocationId,
    pub slots: u32,
    pub used_slots: u32,
}

impl BodyInfo {
    pub fn free_slots(&self) -> u32 {
        self.slots.saturating_sub(self.used_slots)
    }
}

/// Facility bookkeeping used by colonization runs.
pub trait FacilityRegistry {
    fn bodies_at(&self, location: LocationId) -> Vec<BodyInfo>;

    fn create_facility(&mut self, body: BodyId, kind: FacilityKind) -> Option<FacilityId>;

    /// Tear a facility down and hand back whatever it held. Slot usage is
    /// left to the caller.
    fn remove_facility(&mut self, id: FacilityId) -> Option<ResourceMap>;

    /// What a facility currently holds.
    fn facility_stock(&self, id: FacilityId) -> Option<ResourceMap>;

    /// Put a facility of `kind` on `body` in place of `id`, holding `stock`.
    /// The old stock is dropped and the slot carries over. If the new
    /// facility can't be built, `id` stays up untouched.
    fn replace_facility(
        &mut self,
        id: FacilityId,
        body: BodyId,
        kind: FacilityKind,
        stock: &ResourceMap,
    ) -> Option<FacilityId> {
        let replacement = self.create_facility(body, kind)?;
        self.remove_facility(id);
        self.stock_facility(replacement, stock);
        Some(replacement)
    }

    /// Add resources to a facility's stock.
    fn stock_facility(&mut self, id: FacilityId, resources: &ResourceMap);

    fn adjust_slot_usage(&mut self, body: BodyId, delta: i32);

    fn is_colonized(&self, location: LocationId) -> bool;

    fn mark_colonized(&mut self, location: LocationId, population: u64);
}

// ============================================================================
// NOTIFICATIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Fire-and-forget player-facing notifications. The engine never reads back.
pub trait NotificationSink {
    fn notify(&mut self, severity: Severity, title: &str, message: &str);
}

/// Everything a tick pass touches.
pub trait Galaxy: VehicleRegistry + LocationStorage + FacilityRegistry + NotificationSink {}

impl<T> Galaxy for T where T: VehicleRegistry + LocationStorage + FacilityRegistry + NotificationSink {}
