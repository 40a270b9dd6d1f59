//! The galaxy as an ECS world.
//!
//! [`GalaxyWorld`] stores locations, bodies, facilities and vehicles as
//! `hecs` entities and implements every collaborator trait the mission
//! engine needs. Id-to-entity maps keep lookups O(1).

use std::collections::HashMap;

use hecs::{Entity, World};
use starfreight_logic::galaxy::{
    BodyInfo, FacilityKind, FacilityRegistry, LocationInfo, LocationStorage, NotificationSink,
    Severity, Vehicle, VehicleRegistry, VehicleState,
};
use starfreight_logic::ids::{BodyId, FacilityId, LocationId, VehicleId};
use starfreight_logic::resources::{ResourceKind, ResourceMap, AMOUNT_EPSILON};

use crate::components::*;
use crate::notifications::NotificationLog;

/// Storage limit per resource given to a colony founded where no storage
/// existed.
pub const DEFAULT_COLONY_STORAGE: f64 = 1_000.0;

pub struct GalaxyWorld {
    world: World,
    locations: HashMap<LocationId, Entity>,
    bodies: HashMap<BodyId, Entity>,
    facilities: HashMap<FacilityId, Entity>,
    vehicles: HashMap<VehicleId, Entity>,
    next_facility: u32,
    colony_storage: f64,
    notifications: NotificationLog,
}

impl Default for GalaxyWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl GalaxyWorld {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            locations: HashMap::new(),
            bodies: HashMap::new(),
            facilities: HashMap::new(),
            vehicles: HashMap::new(),
            next_facility: 0,
            colony_storage: DEFAULT_COLONY_STORAGE,
            notifications: NotificationLog::default(),
        }
    }

    pub fn with_notification_log(mut self, log: NotificationLog) -> Self {
        self.notifications = log;
        self
    }

    pub fn with_colony_storage(mut self, capacity: f64) -> Self {
        self.colony_storage = capacity.max(0.0);
        self
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn notifications(&self) -> &NotificationLog {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationLog {
        &mut self.notifications
    }

    // ------------------------------------------------------------------
    // Spawning and removal
    // ------------------------------------------------------------------

    /// Add a location, replacing any previous one with the same id.
    pub fn add_location(&mut self, location: Location, stockpile: Stockpile) -> Entity {
        let id = location.id;
        let entity = self.world.spawn((location, stockpile));
        if let Some(old) = self.locations.insert(id, entity) {
            let _ = self.world.despawn(old);
        }
        entity
    }

    pub fn add_body(&mut self, body: Body) -> Entity {
        let id = body.id;
        let entity = self.world.spawn((body,));
        if let Some(old) = self.bodies.insert(id, entity) {
            let _ = self.world.despawn(old);
        }
        entity
    }

    /// Add a vehicle docked idle at `at`.
    pub fn add_vehicle(&mut self, ship: Ship, at: LocationId) -> Entity {
        let id = ship.id;
        let entity = self.world.spawn((ship, VehicleState::docked_at(at)));
        if let Some(old) = self.vehicles.insert(id, entity) {
            let _ = self.world.despawn(old);
        }
        entity
    }

    /// Remove a vehicle (destroyed, scrapped). Returns false if unknown.
    pub fn remove_vehicle(&mut self, id: VehicleId) -> bool {
        match self.vehicles.remove(&id) {
            Some(entity) => self.world.despawn(entity).is_ok(),
            None => false,
        }
    }

    pub fn remove_location(&mut self, id: LocationId) -> bool {
        match self.locations.remove(&id) {
            Some(entity) => self.world.despawn(entity).is_ok(),
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn location_ids(&self) -> Vec<LocationId> {
        let mut ids: Vec<_> = self.locations.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn vehicle_ids(&self) -> Vec<VehicleId> {
        let mut ids: Vec<_> = self.vehicles.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn stockpile(&self, id: LocationId) -> Option<Stockpile> {
        let entity = *self.locations.get(&id)?;
        self.world.get::<&Stockpile>(entity).ok().map(|s| (*s).clone())
    }

    pub fn set_amount(&mut self, id: LocationId, kind: ResourceKind, amount: f64) {
        if let Some(mut stockpile) = self.stockpile_mut(id) {
            stockpile.amounts.set(kind, amount.max(0.0));
        }
    }

    pub fn population(&self, id: LocationId) -> Option<u64> {
        let entity = *self.locations.get(&id)?;
        self.world.get::<&Colony>(entity).ok().map(|c| c.population)
    }

    pub fn facility(&self, id: FacilityId) -> Option<Facility> {
        let entity = *self.facilities.get(&id)?;
        self.world.get::<&Facility>(entity).ok().map(|f| (*f).clone())
    }

    /// All facilities, by id.
    pub fn facilities(&self) -> Vec<Facility> {
        let mut all: Vec<Facility> = self
            .world
            .query::<&Facility>()
            .iter()
            .map(|(_, f)| f.clone())
            .collect();
        all.sort_by_key(|f| f.id);
        all
    }

    /// Every resource unit that still exists anywhere: location storage,
    /// vehicle holds and facility stock.
    pub fn total_in_play(&self) -> ResourceMap {
        let mut total = ResourceMap::new();
        for (_, stockpile) in self.world.query::<&Stockpile>().iter() {
            total.merge(&stockpile.amounts);
        }
        for (_, state) in self.world.query::<&VehicleState>().iter() {
            total.merge(&state.cargo);
        }
        for (_, facility) in self.world.query::<&Facility>().iter() {
            total.merge(&facility.stock);
        }
        total
    }

    fn stockpile_mut(&self, id: LocationId) -> Option<hecs::RefMut<'_, Stockpile>> {
        let entity = *self.locations.get(&id)?;
        self.world.get::<&mut Stockpile>(entity).ok()
    }
}

impl VehicleRegistry for GalaxyWorld {
    fn vehicle(&self, id: VehicleId) -> Option<Vehicle> {
        let entity = *self.vehicles.get(&id)?;
        let mut query = self
            .world
            .query_one::<(&Ship, &VehicleState)>(entity)
            .ok()?;
        let (ship, state) = query.get()?;
        Some(ship.view(state))
    }

    fn set_vehicle_state(&mut self, id: VehicleId, state: VehicleState) -> bool {
        let Some(&entity) = self.vehicles.get(&id) else {
            return false;
        };
        match self.world.get::<&mut VehicleState>(entity) {
            Ok(mut current) => {
                *current = state;
                true
            }
            Err(_) => false,
        }
    }
}

impl LocationStorage for GalaxyWorld {
    fn location(&self, id: LocationId) -> Option<LocationInfo> {
        let entity = *self.locations.get(&id)?;
        self.world.get::<&Location>(entity).ok().map(|l| l.info())
    }

    fn amount(&self, id: LocationId, kind: ResourceKind) -> f64 {
        self.stockpile(id).map(|s| s.amounts.get(kind)).unwrap_or(0.0)
    }

    fn capacity(&self, id: LocationId, kind: ResourceKind) -> f64 {
        self.stockpile(id).map(|s| s.capacity.get(kind)).unwrap_or(0.0)
    }

    fn deduct(&mut self, id: LocationId, kind: ResourceKind, amount: f64) {
        if let Some(mut stockpile) = self.stockpile_mut(id) {
            let taken = stockpile.amounts.take(kind, amount);
            if taken + AMOUNT_EPSILON < amount {
                log::error!(
                    "deducted {:.3} {} at {} but only {:.3} was stored",
                    amount,
                    kind,
                    id,
                    taken
                );
            }
        }
    }

    fn deposit(&mut self, id: LocationId, kind: ResourceKind, amount: f64) {
        if let Some(mut stockpile) = self.stockpile_mut(id) {
            stockpile.amounts.add(kind, amount.max(0.0));
        }
    }
}

impl FacilityRegistry for GalaxyWorld {
    fn bodies_at(&self, location: LocationId) -> Vec<BodyInfo> {
        let mut bodies: Vec<BodyInfo> = self
            .world
            .query::<&Body>()
            .iter()
            .filter(|(_, b)| b.location == location)
            .map(|(_, b)| b.info())
            .collect();
        bodies.sort_by_key(|b| b.id);
        bodies
    }

    fn create_facility(&mut self, body: BodyId, kind: FacilityKind) -> Option<FacilityId> {
        if !self.bodies.contains_key(&body) {
            return None;
        }
        self.next_facility += 1;
        let id = FacilityId(self.next_facility);
        let entity = self.world.spawn((Facility {
            id,
            body,
            kind,
            stock: ResourceMap::new(),
        },));
        self.facilities.insert(id, entity);
        log::debug!("{:?} {} built on {}", kind, id, body);
        Some(id)
    }

    fn facility_stock(&self, id: FacilityId) -> Option<ResourceMap> {
        self.facility(id).map(|f| f.stock)
    }

    fn remove_facility(&mut self, id: FacilityId) -> Option<ResourceMap> {
        let entity = self.facilities.remove(&id)?;
        let stock = self.world.get::<&Facility>(entity).ok().map(|f| f.stock);
        if self.world.despawn(entity).is_err() {
            log::warn!("{} was already gone from the world", id);
        }
        stock
    }

    fn stock_facility(&mut self, id: FacilityId, resources: &ResourceMap) {
        let Some(&entity) = self.facilities.get(&id) else {
            return;
        };
        if let Ok(mut facility) = self.world.get::<&mut Facility>(entity) {
            facility.stock.merge(resources);
        }
    }

    fn adjust_slot_usage(&mut self, body: BodyId, delta: i32) {
        let Some(&entity) = self.bodies.get(&body) else {
            return;
        };
        if let Ok(mut body) = self.world.get::<&mut Body>(entity) {
            body.used_slots = body.used_slots.saturating_add_signed(delta).min(body.slots);
        }
    }

    fn is_colonized(&self, location: LocationId) -> bool {
        self.population(location).is_some()
    }

    fn mark_colonized(&mut self, location: LocationId, population: u64) {
        let Some(&entity) = self.locations.get(&location) else {
            return;
        };
        if let Ok(mut loc) = self.world.get::<&mut Location>(entity) {
            loc.station_tier = loc.station_tier.max(1);
        }
        if let Ok(mut stockpile) = self.world.get::<&mut Stockpile>(entity) {
            if !stockpile.has_capacity() {
                *stockpile = Stockpile {
                    amounts: stockpile.amounts,
                    ..Stockpile::uniform(self.colony_storage)
                };
            }
        }
        if self.world.insert_one(entity, Colony { population }).is_ok() {
            log::info!("{} colonized with population {}", location, population);
        }
    }
}

impl NotificationSink for GalaxyWorld {
    fn notify(&mut self, severity: Severity, title: &str, message: &str) {
        log::debug!("[{:?}] {}: {}", severity, title, message);
        self.notifications.push(severity, title, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starfreight_logic::physics::SizeClass;

    fn galaxy() -> GalaxyWorld {
        let mut galaxy = GalaxyWorld::new();
        galaxy.add_location(
            Location::new(LocationId(1), "Sol", [0.0, 0.0, 0.0]).with_tier(3),
            Stockpile::uniform(500.0).with_amount(ResourceKind::Fuel, 200.0),
        );
        galaxy.add_location(
            Location::new(LocationId(2), "Tau Ceti", [3.0, 4.0, 0.0]),
            Stockpile::default(),
        );
        galaxy.add_body(Body::new(BodyId(1), "Tau Ceti e", LocationId(2), 1));
        galaxy.add_vehicle(
            Ship::freighter(VehicleId(1), "Mule", SizeClass::Light),
            LocationId(1),
        );
        galaxy
    }

    #[test]
    fn test_storage_roundtrip_through_traits() {
        let mut galaxy = galaxy();
        galaxy.deduct(LocationId(1), ResourceKind::Fuel, 50.0);
        galaxy.deposit(LocationId(1), ResourceKind::Steel, 20.0);
        assert_eq!(galaxy.amount(LocationId(1), ResourceKind::Fuel), 150.0);
        assert_eq!(galaxy.free_space(LocationId(1), ResourceKind::Steel), 480.0);
        assert_eq!(galaxy.distance(LocationId(1), LocationId(2)), Some(5.0));
        assert_eq!(galaxy.amount(LocationId(9), ResourceKind::Fuel), 0.0);
    }

    #[test]
    fn test_vehicle_state_is_written_back() {
        let mut galaxy = galaxy();
        let mut vehicle = galaxy.vehicle(VehicleId(1)).unwrap();
        assert_eq!(vehicle.profile.capacity, 100.0);
        vehicle.state.cargo.add(ResourceKind::Food, 5.0);
        assert!(galaxy.set_vehicle_state(VehicleId(1), vehicle.state));
        assert!(galaxy.vehicle(VehicleId(1)).unwrap().carries_cargo());

        assert!(galaxy.remove_vehicle(VehicleId(1)));
        assert!(galaxy.vehicle(VehicleId(1)).is_none());
        assert!(!galaxy.set_vehicle_state(VehicleId(1), VehicleState::docked_at(LocationId(1))));
    }

    #[test]
    fn test_facility_lifecycle() {
        let mut galaxy = galaxy();
        let id = galaxy
            .create_facility(BodyId(1), FacilityKind::HoldingDepot)
            .unwrap();
        galaxy.adjust_slot_usage(BodyId(1), 1);
        galaxy.stock_facility(id, &ResourceMap::from_pairs(&[(ResourceKind::Steel, 10.0)]));
        assert_eq!(galaxy.bodies_at(LocationId(2))[0].free_slots(), 0);
        assert_eq!(galaxy.facility(id).unwrap().stock.get(ResourceKind::Steel), 10.0);

        let kept = ResourceMap::from_pairs(&[(ResourceKind::Steel, 4.0)]);
        let hub = galaxy
            .replace_facility(id, BodyId(1), FacilityKind::ColonyHub, &kept)
            .unwrap();
        assert!(galaxy.facility(id).is_none());
        assert_eq!(galaxy.facility_stock(id), None);
        assert_eq!(galaxy.facility(hub).unwrap().kind, FacilityKind::ColonyHub);
        assert_eq!(galaxy.facility_stock(hub), Some(kept));
        assert_eq!(galaxy.bodies_at(LocationId(2))[0].used_slots, 1);

        // No body to build on: the old facility stays as it was.
        assert_eq!(
            galaxy.replace_facility(hub, BodyId(9), FacilityKind::HoldingDepot, &ResourceMap::new()),
            None
        );
        assert_eq!(galaxy.facility_stock(hub), Some(kept));

        assert_eq!(galaxy.remove_facility(hub), Some(kept));
        assert!(galaxy.facilities().is_empty());
        assert!(galaxy.create_facility(BodyId(9), FacilityKind::HoldingDepot).is_none());
    }

    #[test]
    fn test_colonizing_grants_storage() {
        let mut galaxy = galaxy();
        assert!(!galaxy.is_colonized(LocationId(2)));
        assert_eq!(galaxy.free_space(LocationId(2), ResourceKind::Steel), 0.0);

        galaxy.mark_colonized(LocationId(2), 1_200);
        assert_eq!(galaxy.population(LocationId(2)), Some(1_200));
        assert_eq!(galaxy.location(LocationId(2)).unwrap().station_tier, 1);
        assert_eq!(
            galaxy.free_space(LocationId(2), ResourceKind::Steel),
            DEFAULT_COLONY_STORAGE
        );
    }

    #[test]
    fn test_total_in_play_counts_every_holder() {
        let mut galaxy = galaxy();
        let mut vehicle = galaxy.vehicle(VehicleId(1)).unwrap();
        vehicle.state.cargo.add(ResourceKind::Fuel, 25.0);
        galaxy.set_vehicle_state(VehicleId(1), vehicle.state);
        assert_eq!(galaxy.total_in_play().get(ResourceKind::Fuel), 225.0);
    }
}
