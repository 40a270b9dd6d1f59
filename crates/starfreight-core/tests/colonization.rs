//! Colonization runs on the ECS galaxy.
//!
//! The default colony rules ask for 100 Steel, 50 Glass, 100 Food and 50
//! Water. A Light hull of capacity 100 needs one 9-tick round trip per batch
//! after the first delivery at tick 4.

use starfreight_core::prelude::*;
use starfreight_logic::validation::ValidationError;

const ORIGIN: LocationId = LocationId(1);
const COLONY: LocationId = LocationId(2);
const MOON: BodyId = BodyId(7);
const SHIP: VehicleId = VehicleId(1);

fn quota() -> Vec<CargoLine> {
    vec![
        CargoLine::request(ResourceKind::Steel, 100.0),
        CargoLine::request(ResourceKind::Glass, 50.0),
        CargoLine::request(ResourceKind::Food, 100.0),
        CargoLine::request(ResourceKind::Water, 50.0),
    ]
}

/// A stocked home port and an unclaimed system with no storage of its own.
fn setup() -> SimulationEngine {
    let mut galaxy = GalaxyWorld::new();
    galaxy.add_location(
        Location::new(ORIGIN, "New Lagos", [0.0, 0.0, 0.0]).with_tier(2),
        Stockpile::uniform(10_000.0)
            .with_amount(ResourceKind::Steel, 150.0)
            .with_amount(ResourceKind::Glass, 50.0)
            .with_amount(ResourceKind::Food, 100.0)
            .with_amount(ResourceKind::Water, 50.0)
            .with_amount(ResourceKind::Fuel, 10_000.0),
    );
    galaxy.add_location(
        Location::new(COLONY, "Gliese 667 C", [10.0, 0.0, 0.0]),
        Stockpile::default(),
    );
    galaxy.add_body(Body::new(MOON, "Gliese 667 Cc", COLONY, 2));
    galaxy.add_vehicle(Ship::freighter(SHIP, "Pioneer", SizeClass::Light), ORIGIN);

    let config = EngineConfig {
        ms_per_game_hour: 1_000.0,
        ..EngineConfig::default()
    };
    SimulationEngine::with_galaxy(config, galaxy).unwrap()
}

fn run(engine: &mut SimulationEngine, ticks: usize) {
    for _ in 0..ticks {
        engine.tick(1_000);
    }
}

fn accounted(engine: &SimulationEngine) -> f64 {
    let burned: f64 = engine.summaries().iter().map(|s| s.fuel_consumed).sum();
    engine.galaxy.total_in_play().total() + burned
}

#[test]
fn test_three_hundred_units_land_in_exactly_three_trips() {
    let mut engine = setup();
    let id = engine
        .create_colonization_run(SHIP, COLONY, quota(), Some(MOON))
        .unwrap();

    run(&mut engine, 21);
    let mission = engine.mission(id).unwrap();
    assert!(!mission.is_completed());
    assert_eq!(mission.trips_completed, 2);

    run(&mut engine, 1);
    let mission = engine.mission(id).unwrap();
    assert_eq!(mission.completion(), Some(&Completion::Delivered));
    assert_eq!(mission.trips_completed, 3);
    assert_eq!(mission.fuel_consumed, 1_500.0);

    assert_eq!(engine.galaxy.population(COLONY), Some(1_000));
    assert_eq!(engine.galaxy.location(COLONY).unwrap().station_tier, 1);
    let facilities = engine.galaxy.facilities();
    assert_eq!(facilities.len(), 1);
    assert_eq!(facilities[0].kind, FacilityKind::ColonyHub);
    assert_eq!(facilities[0].body, MOON);
    assert_eq!(engine.galaxy.bodies_at(COLONY)[0].used_slots, 1);

    assert_eq!(engine.notifications().count(Severity::Info), 3);
    assert_eq!(engine.notifications().latest().unwrap().title, "Colony founded");
    assert!(engine.galaxy.vehicle(SHIP).unwrap().state.mission.is_none());
}

#[test]
fn test_surplus_goes_into_the_new_colony_storage() {
    let mut engine = setup();
    let mut cargo = quota();
    cargo[0] = CargoLine::request(ResourceKind::Steel, 150.0);
    let id = engine
        .create_colonization_run(SHIP, COLONY, cargo, None)
        .unwrap();

    run(&mut engine, 40);
    let mission = engine.mission(id).unwrap();
    assert_eq!(mission.completion(), Some(&Completion::Delivered));
    assert_eq!(mission.trips_completed, 4);
    assert_eq!(engine.galaxy.amount(COLONY, ResourceKind::Steel), 50.0);
    assert!(engine.galaxy.facilities()[0].stock.is_empty());
    assert_eq!(engine.galaxy.population(COLONY), Some(1_000));
}

#[test]
fn test_cancelled_run_returns_everything_not_delivered() {
    let mut engine = setup();
    let before = accounted(&engine);
    let id = engine
        .create_colonization_run(SHIP, COLONY, quota(), Some(MOON))
        .unwrap();
    run(&mut engine, 10);
    assert_eq!(engine.mission(id).unwrap().trips_completed, 1);

    assert_eq!(engine.cancel_mission(id), Ok(CancelOutcome::Scheduled));
    assert!((accounted(&engine) - before).abs() < 1e-6);

    run(&mut engine, 5);
    let mission = engine.mission(id).unwrap();
    assert_eq!(mission.completion(), Some(&Completion::Cancelled));
    assert_eq!(mission.trips_completed, 2);
    assert!(!engine.galaxy.is_colonized(COLONY));

    let depot = &engine.galaxy.facilities()[0];
    assert_eq!(depot.kind, FacilityKind::HoldingDepot);
    assert_eq!(depot.stock.total(), 200.0);
    assert_eq!(engine.galaxy.amount(ORIGIN, ResourceKind::Water), 50.0);
    assert!((accounted(&engine) - before).abs() < 1e-6);
}

#[test]
fn test_colonized_or_unusable_targets_are_rejected() {
    let mut engine = setup();
    let err = engine
        .create_colonization_run(SHIP, COLONY, quota(), Some(BodyId(99)))
        .unwrap_err();
    let report = err.validation().unwrap();
    assert!(matches!(
        report.errors[0],
        ValidationError::InvalidSite { site: BodyId(99), .. }
    ));

    engine.galaxy.mark_colonized(COLONY, 500);
    let err = engine
        .create_colonization_run(SHIP, COLONY, quota(), None)
        .unwrap_err();
    assert!(matches!(
        err.validation().unwrap().errors[0],
        ValidationError::AlreadyColonized(COLONY)
    ));
    assert_eq!(engine.galaxy.amount(ORIGIN, ResourceKind::Steel), 150.0);
}
