//! Mission model: kinds, phases, statuses and the mission store.
//!
//! A mission's lifecycle is an explicit state machine: [`MissionPhase`] says
//! where in the protocol the vehicle is, [`MissionStatus`] says whether the
//! mission is progressing, blocked (with a [`Wait`]), winding down after a
//! cancellation, or finished.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cargo::{self, CargoLine};
use crate::ids::{BodyId, FacilityId, LocationId, MissionId, VehicleId};
use crate::resources::{ResourceKind, ResourceMap};

// ============================================================================
// KINDS, PHASES, STATUS
// ============================================================================

/// Delivery protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionKind {
    /// Deliver once and stay at the destination. Reserves cargo and fuel upfront.
    OneWay,
    /// Deliver, load return cargo, come home. Both legs' fuel paid upfront.
    RoundTrip,
    /// Loop origin → destination → origin until cancelled, loading and
    /// fuelling just in time on every leg.
    RecurringRoute,
    /// Shuttle a reserved cargo quota to found a colony.
    ColonizationRun,
}

impl MissionKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::OneWay => "One-way delivery",
            Self::RoundTrip => "Round trip",
            Self::RecurringRoute => "Recurring route",
            Self::ColonizationRun => "Colonization run",
        }
    }

    /// Kinds that reserve cargo and fuel when launched instead of per leg.
    pub fn reserves_upfront(self) -> bool {
        matches!(self, Self::OneWay | Self::RoundTrip)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionPhase {
    AtOriginPreparingOutbound,
    InTransitToDestination,
    AtDestinationUnloadingAndPreparing,
    InTransitToOrigin,
    AtOriginUnloading,
}

impl MissionPhase {
    pub fn is_in_transit(self) -> bool {
        matches!(self, Self::InTransitToDestination | Self::InTransitToOrigin)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::AtOriginPreparingOutbound => "Preparing at origin",
            Self::InTransitToDestination => "En route to destination",
            Self::AtDestinationUnloadingAndPreparing => "Unloading at destination",
            Self::InTransitToOrigin => "Returning to origin",
            Self::AtOriginUnloading => "Unloading at origin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaitReason {
    Cargo,
    Fuel,
    StorageSpace,
}

impl fmt::Display for WaitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cargo => "cargo",
            Self::Fuel => "fuel",
            Self::StorageSpace => "storage space",
        })
    }
}

/// A blocking condition, re-checked every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wait {
    pub reason: WaitReason,
    pub resource: Option<ResourceKind>,
    pub location: LocationId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbortCause {
    VehicleLost,
    LocationLost,
}

/// How a mission ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Completion {
    /// The protocol ran to its natural end.
    Delivered,
    Cancelled,
    /// A collaborator disappeared mid-mission. Nothing was refunded.
    Aborted(AbortCause),
    /// Every batch was delivered but the colony requirements were not met.
    ColonizationFailed { shortfall: ResourceMap },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MissionStatus {
    Active,
    Waiting(Wait),
    /// Finish the current leg, then complete.
    Cancelling,
    /// Terminal.
    Completed(Completion),
}

impl MissionStatus {
    pub fn label(&self) -> String {
        match self {
            Self::Active => "Active".to_string(),
            Self::Waiting(wait) => match wait.resource {
                Some(resource) => format!("Waiting for {} ({})", wait.reason, resource),
                None => format!("Waiting for {}", wait.reason),
            },
            Self::Cancelling => "Cancelling".to_string(),
            Self::Completed(Completion::Delivered) => "Completed".to_string(),
            Self::Completed(Completion::Cancelled) => "Cancelled".to_string(),
            Self::Completed(Completion::Aborted(_)) => "Aborted".to_string(),
            Self::Completed(Completion::ColonizationFailed { .. }) => {
                "Colonization failed".to_string()
            }
        }
    }
}

// ============================================================================
// COLONIZATION STATE
// ============================================================================

/// Multi-trip bookkeeping carried by colonization runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColonizationState {
    /// Reserved cargo not yet flown.
    pub remaining: Vec<CargoLine>,
    /// Everything delivered so far.
    pub delivered: ResourceMap,
    /// Requested facility site, if any.
    pub site: Option<BodyId>,
    /// Temporary depot created on first delivery, and the body it occupies.
    pub holding: Option<(FacilityId, BodyId)>,
    pub auto_source_rounds: u32,
    /// Set once this run founds the colony.
    pub population: Option<u64>,
    /// Cargo used up founding the colony.
    pub consumed: ResourceMap,
}

// ============================================================================
// MISSION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub vehicle: VehicleId,
    pub kind: MissionKind,
    pub origin: LocationId,
    pub destination: LocationId,
    pub outbound: Vec<CargoLine>,
    pub return_cargo: Vec<CargoLine>,
    /// What is physically aboard right now.
    pub current_cargo: Vec<CargoLine>,
    pub status: MissionStatus,
    pub phase: MissionPhase,
    pub departure_ms: Option<u64>,
    pub arrival_ms: Option<u64>,
    pub trips_completed: u32,
    pub fuel_consumed: f64,
    /// Cumulative cargo unloaded at either end.
    pub cargo_delivered: ResourceMap,
    pub created_ms: u64,
    pub colonization: Option<ColonizationState>,
}

impl Mission {
    pub fn new(
        id: MissionId,
        vehicle: VehicleId,
        kind: MissionKind,
        origin: LocationId,
        destination: LocationId,
        created_ms: u64,
    ) -> Self {
        Self {
            id,
            vehicle,
            kind,
            origin,
            destination,
            outbound: Vec::new(),
            return_cargo: Vec::new(),
            current_cargo: Vec::new(),
            status: MissionStatus::Active,
            phase: MissionPhase::AtOriginPreparingOutbound,
            departure_ms: None,
            arrival_ms: None,
            trips_completed: 0,
            fuel_consumed: 0.0,
            cargo_delivered: ResourceMap::new(),
            created_ms,
            colonization: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.status, MissionStatus::Completed(_))
    }

    pub fn is_cancelling(&self) -> bool {
        self.status == MissionStatus::Cancelling
    }

    pub fn wait(&self) -> Option<&Wait> {
        match &self.status {
            MissionStatus::Waiting(wait) => Some(wait),
            _ => None,
        }
    }

    pub fn completion(&self) -> Option<&Completion> {
        match &self.status {
            MissionStatus::Completed(completion) => Some(completion),
            _ => None,
        }
    }

    pub fn cargo_weight(&self) -> f64 {
        cargo::total_weight(&self.current_cargo)
    }

    pub fn cargo_aboard(&self) -> ResourceMap {
        cargo::to_resource_map(&self.current_cargo)
    }

    /// Milliseconds until arrival, if travelling.
    pub fn eta_ms(&self, now_ms: u64) -> Option<u64> {
        self.arrival_ms.map(|arrival| arrival.saturating_sub(now_ms))
    }
}

/// Compact read model for status displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionSummary {
    pub id: MissionId,
    pub vehicle: VehicleId,
    pub kind: MissionKind,
    pub origin: LocationId,
    pub destination: LocationId,
    pub phase: MissionPhase,
    pub status: String,
    pub trips_completed: u32,
    pub fuel_consumed: f64,
    pub cargo_aboard: f64,
    pub eta_ms: Option<u64>,
}

impl MissionSummary {
    pub fn of(mission: &Mission, now_ms: u64) -> Self {
        Self {
            id: mission.id,
            vehicle: mission.vehicle,
            kind: mission.kind,
            origin: mission.origin,
            destination: mission.destination,
            phase: mission.phase,
            status: mission.status.label(),
            trips_completed: mission.trips_completed,
            fuel_consumed: mission.fuel_consumed,
            cargo_aboard: mission.cargo_weight(),
            eta_ms: mission.eta_ms(now_ms),
        }
    }
}

// ============================================================================
// MISSION STORE
// ============================================================================

/// Owns every mission and the vehicle → active mission association.
///
/// Missions are kept in id order so tick passes visit them in a stable order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MissionStore {
    missions: BTreeMap<MissionId, Mission>,
    by_vehicle: HashMap<VehicleId, MissionId>,
}

impl MissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new mission and link its vehicle.
    pub fn insert(&mut self, mission: Mission) {
        if !mission.is_completed() {
            self.by_vehicle.insert(mission.vehicle, mission.id);
        }
        self.missions.insert(mission.id, mission);
    }

    pub fn get(&self, id: MissionId) -> Option<&Mission> {
        self.missions.get(&id)
    }

    pub fn get_mut(&mut self, id: MissionId) -> Option<&mut Mission> {
        self.missions.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mission> {
        self.missions.values()
    }

    /// Ids of every mission that has not completed, in visiting order.
    pub fn active_ids(&self) -> Vec<MissionId> {
        self.missions
            .values()
            .filter(|m| !m.is_completed())
            .map(|m| m.id)
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.missions.values().filter(|m| !m.is_completed()).count()
    }

    pub fn mission_for_vehicle(&self, vehicle: VehicleId) -> Option<MissionId> {
        self.by_vehicle.get(&vehicle).copied()
    }

    /// Drop the vehicle association of a finished mission.
    pub fn release_vehicle(&mut self, vehicle: VehicleId, mission: MissionId) {
        if self.by_vehicle.get(&vehicle) == Some(&mission) {
            self.by_vehicle.remove(&vehicle);
        }
    }

    /// Forget completed missions. Returns how many were removed.
    pub fn prune_completed(&mut self) -> usize {
        let before = self.missions.len();
        self.missions.retain(|_, m| !m.is_completed());
        before - self.missions.len()
    }

    pub fn len(&self) -> usize {
        self.missions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mission(id: u64, vehicle: u32) -> Mission {
        Mission::new(
            MissionId(id),
            VehicleId(vehicle),
            MissionKind::OneWay,
            LocationId(1),
            LocationId(2),
            0,
        )
    }

    #[test]
    fn test_store_links_vehicle() {
        let mut store = MissionStore::new();
        store.insert(mission(1, 7));
        assert_eq!(store.mission_for_vehicle(VehicleId(7)), Some(MissionId(1)));
        store.release_vehicle(VehicleId(7), MissionId(1));
        assert_eq!(store.mission_for_vehicle(VehicleId(7)), None);
    }

    #[test]
    fn test_release_ignores_stale_mission() {
        let mut store = MissionStore::new();
        store.insert(mission(2, 7));
        store.release_vehicle(VehicleId(7), MissionId(1));
        assert_eq!(store.mission_for_vehicle(VehicleId(7)), Some(MissionId(2)));
    }

    #[test]
    fn test_active_ids_in_stable_order() {
        let mut store = MissionStore::new();
        store.insert(mission(3, 1));
        store.insert(mission(1, 2));
        let mut done = mission(2, 3);
        done.status = MissionStatus::Completed(Completion::Delivered);
        store.insert(done);
        assert_eq!(store.active_ids(), vec![MissionId(1), MissionId(3)]);
        assert_eq!(store.prune_completed(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_status_labels() {
        let wait = Wait {
            reason: WaitReason::Fuel,
            resource: Some(ResourceKind::Fuel),
            location: LocationId(1),
        };
        assert_eq!(
            MissionStatus::Waiting(wait).label(),
            "Waiting for fuel (Fuel)"
        );
        assert!(MissionPhase::InTransitToOrigin.is_in_transit());
        assert!(!MissionPhase::AtOriginUnloading.is_in_transit());
    }

    #[test]
    fn test_eta() {
        let mut m = mission(1, 1);
        m.arrival_ms = Some(5_000);
        assert_eq!(m.eta_ms(3_000), Some(2_000));
        assert_eq!(m.eta_ms(9_000), Some(0));
    }
}
