//! Locations, their storage, orbital bodies and facilities.

use serde::{Deserialize, Serialize};
use starfreight_logic::galaxy::{BodyInfo, FacilityKind, LocationInfo};
use starfreight_logic::ids::{BodyId, FacilityId, LocationId};
use starfreight_logic::resources::{ResourceKind, ResourceMap};

/// A star system or station vehicles can travel between.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub position: [f64; 3],
    /// 0 = no port.
    pub station_tier: u8,
}

impl Location {
    pub fn new(id: LocationId, name: impl Into<String>, position: [f64; 3]) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            station_tier: 0,
        }
    }

    pub fn with_tier(mut self, tier: u8) -> Self {
        self.station_tier = tier;
        self
    }

    pub fn info(&self) -> LocationInfo {
        LocationInfo {
            id: self.id,
            name: self.name.clone(),
            position: self.position,
            station_tier: self.station_tier,
        }
    }
}

/// Shared resource pool of a location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stockpile {
    pub amounts: ResourceMap,
    /// Per-resource storage limit.
    pub capacity: ResourceMap,
}

impl Stockpile {
    /// Same limit for every resource.
    pub fn uniform(capacity: f64) -> Self {
        let mut limits = ResourceMap::new();
        for kind in ResourceKind::ALL {
            limits.set(kind, capacity);
        }
        Self {
            amounts: ResourceMap::new(),
            capacity: limits,
        }
    }

    pub fn with_amount(mut self, kind: ResourceKind, amount: f64) -> Self {
        self.amounts.set(kind, amount);
        self
    }

    pub fn has_capacity(&self) -> bool {
        !self.capacity.is_empty()
    }

    pub fn free(&self, kind: ResourceKind) -> f64 {
        (self.capacity.get(kind) - self.amounts.get(kind)).max(0.0)
    }
}

/// Marks a founded colony. Attached to the location entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Colony {
    pub population: u64,
}

/// A planet or moon with facility slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub id: BodyId,
    pub name: String,
    pub location: LocationId,
    pub slots: u32,
    pub used_slots: u32,
}

impl Body {
    pub fn new(id: BodyId, name: impl Into<String>, location: LocationId, slots: u32) -> Self {
        Self {
            id,
            name: name.into(),
            location,
            slots,
            used_slots: 0,
        }
    }

    pub fn info(&self) -> BodyInfo {
        BodyInfo {
            id: self.id,
            name: self.name.clone(),
            location: self.location,
            slots: self.slots,
            used_slots: self.used_slots,
        }
    }
}

/// A structure occupying one slot on a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub body: BodyId,
    pub kind: FacilityKind,
    pub stock: ResourceMap,
}
