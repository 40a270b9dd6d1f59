//! In-memory galaxy for unit tests.

use std::collections::{BTreeMap, HashMap};

use crate::galaxy::*;
use crate::ids::*;
use crate::physics::{SizeClass, VehicleProfile};
use crate::resources::{ResourceKind, ResourceMap};

#[derive(Debug, Clone)]
pub struct MemoryLocation {
    pub info: LocationInfo,
    pub amounts: ResourceMap,
    pub capacity: f64,
    pub population: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct MemoryFacility {
    pub body: BodyId,
    pub kind: FacilityKind,
    pub stock: ResourceMap,
}

#[derive(Debug, Default)]
pub struct MemoryGalaxy {
    pub vehicles: BTreeMap<VehicleId, Vehicle>,
    pub locations: BTreeMap<LocationId, MemoryLocation>,
    pub bodies: BTreeMap<BodyId, BodyInfo>,
    pub facilities: HashMap<FacilityId, MemoryFacility>,
    pub notifications: Vec<(Severity, String, String)>,
    next_facility: u32,
}

impl MemoryGalaxy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_location(&mut self, id: LocationId, position: [f64; 3], tier: u8, capacity: f64) {
        self.locations.insert(
            id,
            MemoryLocation {
                info: LocationInfo {
                    id,
                    name: format!("Station {}", id.0),
                    position,
                    station_tier: tier,
                },
                amounts: ResourceMap::new(),
                capacity,
                population: None,
            },
        );
    }

    pub fn set_amount(&mut self, id: LocationId, kind: ResourceKind, amount: f64) {
        if let Some(loc) = self.locations.get_mut(&id) {
            loc.amounts.set(kind, amount);
        }
    }

    pub fn add_freighter(&mut self, id: VehicleId, at: LocationId, size: SizeClass, capacity: f64) {
        self.vehicles.insert(
            id,
            Vehicle {
                id,
                name: format!("Freighter {}", id.0),
                kind: VehicleKind::Freighter,
                profile: VehicleProfile::stock(size).with_capacity(capacity),
                state: VehicleState::docked_at(at),
            },
        );
    }

    pub fn add_body(&mut self, id: BodyId, location: LocationId, slots: u32) {
        self.bodies.insert(
            id,
            BodyInfo {
                id,
                name: format!("Body {}", id.0),
                location,
                slots,
                used_slots: 0,
            },
        );
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.notifications.iter().filter(|n| n.0 == severity).count()
    }
}

impl VehicleRegistry for MemoryGalaxy {
    fn vehicle(&self, id: VehicleId) -> Option<Vehicle> {
        self.vehicles.get(&id).cloned()
    }

    fn set_vehicle_state(&mut self, id: VehicleId, state: VehicleState) -> bool {
        match self.vehicles.get_mut(&id) {
            Some(v) => {
                v.state = state;
                true
            }
            None => false,
        }
    }
}

impl LocationStorage for MemoryGalaxy {
    fn location(&self, id: LocationId) -> Option<LocationInfo> {
        self.locations.get(&id).map(|l| l.info.clone())
    }

    fn amount(&self, id: LocationId, kind: ResourceKind) -> f64 {
        self.locations.get(&id).map(|l| l.amounts.get(kind)).unwrap_or(0.0)
    }

    fn capacity(&self, id: LocationId, _kind: ResourceKind) -> f64 {
        self.locations.get(&id).map(|l| l.capacity).unwrap_or(0.0)
    }

    fn deduct(&mut self, id: LocationId, kind: ResourceKind, amount: f64) {
        if let Some(loc) = self.locations.get_mut(&id) {
            let current = loc.amounts.get(kind);
            assert!(amount <= current + 1e-6, "deducted more {} than available", kind);
            loc.amounts.take(kind, amount);
        }
    }

    fn deposit(&mut self, id: LocationId, kind: ResourceKind, amount: f64) {
        if let Some(loc) = self.locations.get_mut(&id) {
            loc.amounts.add(kind, amount);
        }
    }
}

impl FacilityRegistry for MemoryGalaxy {
    fn bodies_at(&self, location: LocationId) -> Vec<BodyInfo> {
        self.bodies.values().filter(|b| b.location == location).cloned().collect()
    }

    fn create_facility(&mut self, body: BodyId, kind: FacilityKind) -> Option<FacilityId> {
        if !self.bodies.contains_key(&body) {
            return None;
        }
        self.next_facility += 1;
        let id = FacilityId(self.next_facility);
        self.facilities.insert(
            id,
            MemoryFacility {
                body,
                kind,
                stock: ResourceMap::new(),
            },
        );
        Some(id)
    }

    fn facility_stock(&self, id: FacilityId) -> Option<ResourceMap> {
        self.facilities.get(&id).map(|f| f.stock)
    }

    fn remove_facility(&mut self, id: FacilityId) -> Option<ResourceMap> {
        self.facilities.remove(&id).map(|f| f.stock)
    }

    fn stock_facility(&mut self, id: FacilityId, resources: &ResourceMap) {
        if let Some(f) = self.facilities.get_mut(&id) {
            f.stock.merge(resources);
        }
    }

    fn adjust_slot_usage(&mut self, body: BodyId, delta: i32) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.used_slots = b.used_slots.saturating_add_signed(delta);
        }
    }

    fn is_colonized(&self, location: LocationId) -> bool {
        self.locations
            .get(&location)
            .is_some_and(|l| l.population.is_some())
    }

    fn mark_colonized(&mut self, location: LocationId, population: u64) {
        if let Some(loc) = self.locations.get_mut(&location) {
            loc.population = Some(population);
            loc.info.station_tier = loc.info.station_tier.max(1);
        }
    }
}

impl NotificationSink for MemoryGalaxy {
    fn notify(&mut self, severity: Severity, title: &str, message: &str) {
        self.notifications
            .push((severity, title.to_string(), message.to_string()));
    }
}
