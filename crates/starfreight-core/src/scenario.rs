//! Scenario files: the starting galaxy as JSON.
//!
//! A scenario lists locations (with storage and optional colony), bodies and
//! vehicles. [`ScenarioSpec::build`] checks cross-references and spawns
//! everything into a fresh [`GalaxyWorld`].

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use starfreight_logic::galaxy::{FacilityRegistry, VehicleKind};
use starfreight_logic::ids::{BodyId, LocationId, VehicleId};
use starfreight_logic::physics::{SizeClass, VehicleProfile};
use starfreight_logic::resources::ResourceMap;
use thiserror::Error;

use crate::components::*;
use crate::galaxy::GalaxyWorld;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),
    #[error("location {0} is defined twice")]
    DuplicateLocation(LocationId),
    #[error("body {0} is defined twice")]
    DuplicateBody(BodyId),
    #[error("vehicle {0} is defined twice")]
    DuplicateVehicle(VehicleId),
    #[error("{owner} refers to unknown location {location}")]
    UnknownLocation { owner: String, location: LocationId },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioSpec {
    #[serde(default)]
    pub locations: Vec<LocationSpec>,
    #[serde(default)]
    pub bodies: Vec<BodySpec>,
    #[serde(default)]
    pub vehicles: Vec<VehicleSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSpec {
    pub id: LocationId,
    pub name: String,
    pub position: [f64; 3],
    #[serde(default)]
    pub station_tier: u8,
    /// Storage limit applied to every resource.
    #[serde(default)]
    pub capacity: f64,
    /// Per-resource overrides of `capacity`.
    #[serde(default)]
    pub capacity_by_kind: ResourceMap,
    #[serde(default)]
    pub stock: ResourceMap,
    /// Present for locations that start out colonized.
    #[serde(default)]
    pub population: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodySpec {
    pub id: BodyId,
    pub name: String,
    pub location: LocationId,
    pub slots: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSpec {
    pub id: VehicleId,
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: VehicleKind,
    pub size_class: SizeClass,
    /// Overrides the hull's base capacity.
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default = "default_modifier")]
    pub efficiency_modifier: f64,
    #[serde(default = "default_modifier")]
    pub speed_modifier: f64,
    pub location: LocationId,
}

fn default_kind() -> VehicleKind {
    VehicleKind::Freighter
}

fn default_modifier() -> f64 {
    1.0
}

impl LocationSpec {
    fn stockpile(&self) -> Stockpile {
        let mut stockpile = Stockpile::uniform(self.capacity.max(0.0));
        for (kind, limit) in self.capacity_by_kind.iter() {
            stockpile.capacity.set(kind, limit);
        }
        stockpile.amounts = self.stock;
        stockpile
    }
}

impl VehicleSpec {
    fn ship(&self) -> Ship {
        let mut profile = VehicleProfile::stock(self.size_class)
            .with_modifiers(self.efficiency_modifier, self.speed_modifier);
        if let Some(capacity) = self.capacity {
            profile = profile.with_capacity(capacity);
        }
        Ship::freighter(self.id, self.name.clone(), self.size_class)
            .with_kind(self.kind)
            .with_profile(profile)
    }
}

impl ScenarioSpec {
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check ids and references, returning all problems found.
    pub fn validate(&self) -> Vec<ScenarioError> {
        let mut errors = Vec::new();

        let mut locations = HashSet::new();
        for location in &self.locations {
            if !locations.insert(location.id) {
                errors.push(ScenarioError::DuplicateLocation(location.id));
            }
        }

        let mut bodies = HashSet::new();
        for body in &self.bodies {
            if !bodies.insert(body.id) {
                errors.push(ScenarioError::DuplicateBody(body.id));
            }
            if !locations.contains(&body.location) {
                errors.push(ScenarioError::UnknownLocation {
                    owner: format!("body {}", body.id),
                    location: body.location,
                });
            }
        }

        let mut vehicles = HashSet::new();
        for vehicle in &self.vehicles {
            if !vehicles.insert(vehicle.id) {
                errors.push(ScenarioError::DuplicateVehicle(vehicle.id));
            }
            if !locations.contains(&vehicle.location) {
                errors.push(ScenarioError::UnknownLocation {
                    owner: format!("vehicle {}", vehicle.id),
                    location: vehicle.location,
                });
            }
        }

        errors
    }

    /// Spawn the scenario into a new world. Fails on the first problem
    /// [`validate`](Self::validate) reports.
    pub fn build(&self) -> Result<GalaxyWorld, ScenarioError> {
        if let Some(error) = self.validate().into_iter().next() {
            return Err(error);
        }

        let mut galaxy = GalaxyWorld::new();
        for spec in &self.locations {
            let location = Location::new(spec.id, spec.name.clone(), spec.position)
                .with_tier(spec.station_tier);
            galaxy.add_location(location, spec.stockpile());
            if let Some(population) = spec.population {
                galaxy.mark_colonized(spec.id, population);
            }
        }
        for spec in &self.bodies {
            galaxy.add_body(Body::new(spec.id, spec.name.clone(), spec.location, spec.slots));
        }
        for spec in &self.vehicles {
            galaxy.add_vehicle(spec.ship(), spec.location);
        }

        log::info!(
            "scenario built: {} locations, {} bodies, {} vehicles",
            self.locations.len(),
            self.bodies.len(),
            self.vehicles.len()
        );
        Ok(galaxy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starfreight_logic::galaxy::{LocationStorage, VehicleRegistry};
    use starfreight_logic::resources::ResourceKind;

    const SCENARIO: &str = r#"{
        "locations": [
            { "id": 1, "name": "Sol", "position": [0, 0, 0], "station_tier": 2,
              "capacity": 1000, "capacity_by_kind": { "Fuel": 5000 },
              "stock": { "Fuel": 4000, "Steel": 300 }, "population": 8000000 },
            { "id": 2, "name": "Barnard", "position": [6, 0, 0] }
        ],
        "bodies": [ { "id": 1, "name": "Barnard b", "location": 2, "slots": 2 } ],
        "vehicles": [
            { "id": 1, "name": "Mule", "size_class": "Medium", "location": 1 },
            { "id": 2, "name": "Scout", "kind": "Scout", "size_class": "Light",
              "capacity": 20, "location": 1 }
        ]
    }"#;

    #[test]
    fn test_build_from_json() {
        let galaxy = ScenarioSpec::from_json(SCENARIO).unwrap().build().unwrap();
        assert_eq!(galaxy.amount(LocationId(1), ResourceKind::Fuel), 4000.0);
        assert_eq!(galaxy.capacity(LocationId(1), ResourceKind::Fuel), 5000.0);
        assert_eq!(galaxy.capacity(LocationId(1), ResourceKind::Glass), 1000.0);
        assert_eq!(galaxy.capacity(LocationId(2), ResourceKind::Glass), 0.0);
        assert!(galaxy.is_colonized(LocationId(1)));

        let mule = galaxy.vehicle(VehicleId(1)).unwrap();
        assert_eq!(mule.profile.capacity, 500.0);
        let scout = galaxy.vehicle(VehicleId(2)).unwrap();
        assert_eq!(scout.kind, VehicleKind::Scout);
        assert_eq!(scout.profile.capacity, 20.0);
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let mut spec = ScenarioSpec::from_json(SCENARIO).unwrap();
        spec.locations.push(spec.locations[0].clone());
        spec.vehicles[1].location = LocationId(9);
        let errors = spec.validate();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ScenarioError::DuplicateLocation(LocationId(1))));
        assert!(matches!(
            errors[1],
            ScenarioError::UnknownLocation { location: LocationId(9), .. }
        ));
        assert!(spec.build().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let err = ScenarioSpec::from_json("{ \"locations\": 3 }").unwrap_err();
        assert!(matches!(err, ScenarioError::Json(_)));
    }
}
