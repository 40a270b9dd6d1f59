//! Starfreight Headless Simulation Harness
//!
//! Runs the logistics engine against the bundled scenario in-process, with
//! no renderer or host game. Checks the data files, the physics formulas,
//! launch validation, every mission protocol and colonization, then runs a
//! seeded random soak that checks the engine invariants after every tick.
//!
//! Usage:
//!   cargo run -p starfreight-simtest
//!   cargo run -p starfreight-simtest -- --verbose
//!   cargo run -p starfreight-simtest -- --seed 7 --ticks 5000
//!
//! `RUST_LOG` overrides the log filter.

use std::collections::HashSet;
use std::fmt::Display;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use starfreight_core::prelude::*;
use starfreight_logic::cargo;
use starfreight_logic::mission::Mission;
use starfreight_logic::physics::{self, VehicleProfile};
use starfreight_logic::validation::ValidationError;
use starfreight_logic::{CancelError, LaunchError};
use tracing_subscriber::EnvFilter;

// ── Data files ──────────────────────────────────────────────────────────
const HARNESS_TOML: &str = include_str!("../../../data/engine.toml");
const SCENARIO_JSON: &str = include_str!("../../../data/scenario.json");

#[derive(Debug, Default, Deserialize)]
struct HarnessFile {
    #[serde(default)]
    engine: EngineConfig,
    #[serde(default)]
    soak: SoakConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
struct SoakConfig {
    seed: u64,
    ticks: usize,
    tick_ms: u64,
}

impl Default for SoakConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ticks: 1_500,
            tick_ms: 1_000,
        }
    }
}

// Scenario ids
const SOL: LocationId = LocationId(1);
const TAU_CETI: LocationId = LocationId(2);
const BARNARD: LocationId = LocationId(3);
const WOLF: LocationId = LocationId(4);
const KEPLER: LocationId = LocationId(5);
const DRAY: VehicleId = VehicleId(1);
const MULE: VehicleId = VehicleId(2);
const LEVIATHAN: VehicleId = VehicleId(3);
const COURIER: VehicleId = VehicleId(4);
const PACKHORSE: VehicleId = VehicleId(5);
const PIONEER: VehicleId = VehicleId(6);
const PATHFINDER: VehicleId = VehicleId(7);

/// No scripted mission in the scenario needs more ticks than this.
const MAX_TICKS: usize = 500;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn new(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

fn setup_failed(name: &str, err: impl Display) -> Vec<TestResult> {
    vec![TestResult::new(name, false, format!("setup failed: {}", err))]
}

struct Options {
    verbose: bool,
    seed: Option<u64>,
    ticks: Option<usize>,
}

impl Options {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .and_then(|v| v.parse().ok())
        };
        Self {
            verbose: args.iter().any(|a| a == "--verbose"),
            seed: value_of("--seed"),
            ticks: value_of("--ticks").map(|t: u64| t as usize),
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "warn" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let options = Options::from_args();
    init_logging(options.verbose);
    println!("=== Starfreight Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Data files
    let loaded = load_data_files(&mut results);

    // 2. Physics formulas
    results.extend(validate_physics(options.verbose));

    if let Some((harness, scenario)) = loaded {
        let config = &harness.engine;
        let mut soak = harness.soak;
        if let Some(seed) = options.seed {
            soak.seed = seed;
        }
        if let Some(ticks) = options.ticks {
            soak.ticks = ticks;
        }

        // 3. Launch validation
        results.extend(validate_launch_checks(config, &scenario, options.verbose));

        // 4. Mission protocols
        results.extend(validate_protocols(config, &scenario, options.verbose));

        // 5. Colonization
        results.extend(validate_colonization(config, &scenario, options.verbose));

        // 6. Randomized soak & determinism
        results.extend(validate_soak(config, &scenario, soak, options.verbose));
    }

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || options.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── Shared helpers ──────────────────────────────────────────────────────

fn fresh(config: &EngineConfig, scenario: &ScenarioSpec) -> Result<SimulationEngine, EngineError> {
    SimulationEngine::from_scenario(config.clone(), scenario)
}

/// Tick until the mission completes. Returns the ticks used.
fn run_until_done(engine: &mut SimulationEngine, id: MissionId) -> usize {
    for tick in 0..MAX_TICKS {
        if engine.mission(id).map_or(true, |m| m.is_completed()) {
            return tick;
        }
        engine.tick(1_000);
    }
    MAX_TICKS
}

fn run(engine: &mut SimulationEngine, ticks: usize) {
    for _ in 0..ticks {
        engine.tick(1_000);
    }
}

fn lines(pairs: &[(ResourceKind, f64)]) -> Vec<CargoLine> {
    pairs
        .iter()
        .map(|&(kind, amount)| CargoLine::request(kind, amount))
        .collect()
}

/// Every unit in the galaxy plus what missions account for outside it: fuel
/// burned, colonization cargo still queued at the origin and cargo used up
/// founding a colony.
fn accounted<'a>(galaxy: &GalaxyWorld, missions: impl Iterator<Item = &'a Mission>) -> f64 {
    let mut total = galaxy.total_in_play().total();
    for mission in missions {
        total += mission.fuel_consumed;
        if let Some(state) = &mission.colonization {
            total += cargo::total_weight(&state.remaining) + state.consumed.total();
        }
    }
    total
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
}

// ── 1. Data Files ───────────────────────────────────────────────────────

fn load_data_files(results: &mut Vec<TestResult>) -> Option<(HarnessFile, ScenarioSpec)> {
    println!("--- Data Files ---");

    let harness: HarnessFile = match toml::from_str(HARNESS_TOML) {
        Ok(h) => h,
        Err(e) => {
            results.push(TestResult::new(
                "config_parse",
                false,
                format!("TOML parse error: {}", e),
            ));
            return None;
        }
    };
    let config_errors = harness.engine.validate();
    results.push(TestResult::new(
        "config_valid",
        config_errors.is_empty(),
        if config_errors.is_empty() {
            format!(
                "engine config valid ({} ms per game hour)",
                harness.engine.ms_per_game_hour
            )
        } else {
            format!("{:?}", config_errors)
        },
    ));

    let scenario = match ScenarioSpec::from_json(SCENARIO_JSON) {
        Ok(s) => s,
        Err(e) => {
            results.push(TestResult::new("scenario_parse", false, e.to_string()));
            return None;
        }
    };
    results.push(TestResult::new(
        "scenario_not_empty",
        scenario.locations.len() >= 5 && scenario.vehicles.len() >= 7,
        format!(
            "{} locations, {} bodies, {} vehicles",
            scenario.locations.len(),
            scenario.bodies.len(),
            scenario.vehicles.len()
        ),
    ));

    let problems = scenario.validate();
    results.push(TestResult::new(
        "scenario_references",
        problems.is_empty(),
        if problems.is_empty() {
            "all ids unique, all references resolve".to_string()
        } else {
            problems
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        },
    ));

    match scenario.build() {
        Ok(galaxy) => {
            let colonized = galaxy
                .location_ids()
                .into_iter()
                .filter(|&id| galaxy.is_colonized(id))
                .count();
            results.push(TestResult::new(
                "scenario_builds",
                galaxy.vehicle_ids().len() == scenario.vehicles.len() && !galaxy.is_colonized(KEPLER),
                format!("{} vehicles spawned, {} colonies", galaxy.vehicle_ids().len(), colonized),
            ));
        }
        Err(e) => {
            results.push(TestResult::new("scenario_builds", false, e.to_string()));
            return None;
        }
    }

    if !config_errors.is_empty() {
        return None;
    }
    Some((harness, scenario))
}

// ── 2. Physics ──────────────────────────────────────────────────────────

fn validate_physics(_verbose: bool) -> Vec<TestResult> {
    println!("--- Physics ---");
    let mut results = Vec::new();

    let light = VehicleProfile::stock(SizeClass::Light);
    let fuel = physics::fuel_cost(10.0, 100.0, &light);
    results.push(TestResult::new(
        "physics_fuel_cost",
        close(fuel, 500.0),
        format!("10 units × 100 weight on a Light hull → {:.1} fuel", fuel),
    ));

    let empty = physics::fuel_cost(25.0, 0.0, &light);
    results.push(TestResult::new(
        "physics_empty_leg_free",
        empty == 0.0,
        "an empty hold burns no fuel",
    ));

    let tuned = light.with_modifiers(2.0, 1.0);
    results.push(TestResult::new(
        "physics_efficiency_modifier",
        close(physics::fuel_cost(10.0, 100.0, &tuned), 250.0),
        "2× efficiency halves the fuel bill",
    ));

    let hours = physics::travel_time_hours(12.0, &VehicleProfile::stock(SizeClass::Medium), 1.0);
    let ms = physics::hours_to_ms(hours, 1_000.0);
    results.push(TestResult::new(
        "physics_travel_time",
        close(hours, 4.0) && ms == 4_000,
        format!("12 units on a Medium hull → {:.2} h ({} ms)", hours, ms),
    ));

    let classes = [
        SizeClass::Light,
        SizeClass::Medium,
        SizeClass::Heavy,
        SizeClass::Super,
    ];
    let ordered = classes.windows(2).all(|w| {
        let (a, b) = (w[0].spec(), w[1].spec());
        a.min_station_tier < b.min_station_tier
            && a.base_capacity < b.base_capacity
            && a.speed > b.speed
    });
    results.push(TestResult::new(
        "physics_size_class_ladder",
        ordered && classes.iter().all(|c| SizeClass::from_u8(*c as u8) == Some(*c)),
        "bigger hulls: higher tier, more capacity, slower",
    ));

    results
}

// ── 3. Launch Validation ────────────────────────────────────────────────

fn validate_launch_checks(
    config: &EngineConfig,
    scenario: &ScenarioSpec,
    verbose: bool,
) -> Vec<TestResult> {
    println!("--- Launch Validation ---");
    let mut results = Vec::new();

    // Reference case: 500 fuel needed, 400 on hand.
    let mut galaxy = GalaxyWorld::new();
    galaxy.add_location(
        Location::new(LocationId(1), "Depot A", [0.0, 0.0, 0.0]).with_tier(1),
        Stockpile::uniform(1_000.0)
            .with_amount(ResourceKind::Steel, 100.0)
            .with_amount(ResourceKind::Fuel, 400.0),
    );
    galaxy.add_location(
        Location::new(LocationId(2), "Depot B", [10.0, 0.0, 0.0]).with_tier(1),
        Stockpile::uniform(1_000.0),
    );
    galaxy.add_vehicle(
        Ship::freighter(VehicleId(1), "Hauler", SizeClass::Light),
        LocationId(1),
    );
    match SimulationEngine::with_galaxy(config.clone(), galaxy) {
        Ok(mut engine) => {
            let outcome = engine.create_one_way_mission(
                VehicleId(1),
                LocationId(2),
                lines(&[(ResourceKind::Steel, 100.0)]),
            );
            let fuel_error = matches!(
                &outcome,
                Err(LaunchError::Rejected(report)) if report.errors.iter().any(|e| matches!(
                    e,
                    ValidationError::InsufficientFuel { needed, available, .. }
                        if close(*needed, 500.0) && close(*available, 400.0)
                ))
            );
            let untouched = engine.galaxy.amount(LocationId(1), ResourceKind::Fuel) == 400.0
                && engine.galaxy.amount(LocationId(1), ResourceKind::Steel) == 100.0
                && engine.summaries().is_empty();
            results.push(TestResult::new(
                "validation_fuel_500_vs_400",
                fuel_error && untouched,
                match outcome {
                    Err(e) => e.to_string(),
                    Ok(id) => format!("unexpectedly launched {}", id),
                },
            ));
        }
        Err(e) => results.extend(setup_failed("validation_fuel_500_vs_400", e)),
    }

    let engine = match fresh(config, scenario) {
        Ok(e) => e,
        Err(e) => {
            results.extend(setup_failed("validation_scenario", e));
            return results;
        }
    };
    let before = engine.galaxy.total_in_play();

    let cases: [(&str, MissionRequest, fn(&ValidationError) -> bool); 6] = [
        (
            "validation_tier_too_low",
            MissionRequest::one_way(LEVIATHAN, BARNARD, lines(&[(ResourceKind::Steel, 100.0)])),
            |e| matches!(e, ValidationError::StationTierTooLow { location, .. } if *location == BARNARD),
        ),
        (
            "validation_scout_refused",
            MissionRequest::one_way(PATHFINDER, TAU_CETI, Vec::new()),
            |e| matches!(e, ValidationError::WrongVehicleClass { .. }),
        ),
        (
            "validation_over_capacity",
            MissionRequest::round_trip(
                DRAY,
                TAU_CETI,
                Vec::new(),
                lines(&[(ResourceKind::Iron, 150.0)]),
            ),
            |e| matches!(e, ValidationError::OverCapacity { .. }),
        ),
        (
            "validation_same_location",
            MissionRequest::one_way(DRAY, SOL, Vec::new()),
            |e| matches!(e, ValidationError::SameLocation(_)),
        ),
        (
            "validation_return_cargo_missing",
            MissionRequest::round_trip(
                MULE,
                TAU_CETI,
                Vec::new(),
                lines(&[(ResourceKind::Water, 10.0)]),
            ),
            |e| matches!(e, ValidationError::InsufficientResource { location, .. } if *location == TAU_CETI),
        ),
        (
            "validation_colony_exists",
            MissionRequest::colonization(DRAY, TAU_CETI, lines(&[(ResourceKind::Food, 50.0)]), None),
            |e| matches!(e, ValidationError::AlreadyColonized(_)),
        ),
    ];
    for (name, request, expected) in cases {
        let report = engine.validate_mission(&request);
        let hit = !report.valid && report.errors.iter().any(expected);
        results.push(TestResult::new(name, hit, report.error_messages().join("; ")));
    }

    let recurring = engine.validate_mission(&MissionRequest::recurring(
        PACKHORSE,
        SOL,
        lines(&[(ResourceKind::Steel, 100.0)]),
        Vec::new(),
    ));
    results.push(TestResult::new(
        "validation_recurring_only_warns",
        recurring.valid && !recurring.warnings.is_empty(),
        recurring.warning_messages().join("; "),
    ));

    results.push(TestResult::new(
        "validation_has_no_side_effects",
        engine.galaxy.total_in_play() == before,
        "storage unchanged after every check",
    ));

    if verbose {
        println!("  {} checks against the scenario", results.len());
    }
    results
}

// ── 4. Mission Protocols ────────────────────────────────────────────────

fn validate_protocols(config: &EngineConfig, scenario: &ScenarioSpec, _verbose: bool) -> Vec<TestResult> {
    println!("--- Mission Protocols ---");
    let mut results = Vec::new();

    results.extend(check_one_way(config, scenario));
    results.extend(check_round_trip_atomic(config, scenario));
    results.extend(check_recurring_stuck(config, scenario));
    results.extend(check_starvation(config, scenario));
    results.extend(check_partial_load(config, scenario));
    results.extend(check_storage_overflow(config, scenario));
    results.extend(check_cancellation(config, scenario));

    results
}

fn check_one_way(config: &EngineConfig, scenario: &ScenarioSpec) -> Vec<TestResult> {
    let mut engine = match fresh(config, scenario) {
        Ok(e) => e,
        Err(e) => return setup_failed("one_way_delivery", e),
    };
    let cargo = lines(&[(ResourceKind::Electronics, 200.0)]);
    let id = match engine.create_one_way_mission(MULE, TAU_CETI, cargo) {
        Ok(id) => id,
        Err(e) => return setup_failed("one_way_delivery", e),
    };
    let ticks = run_until_done(&mut engine, id);
    let delivered = engine
        .mission(id)
        .is_some_and(|m| m.completion() == Some(&Completion::Delivered) && m.trips_completed == 1);
    let stocked = engine.galaxy.amount(TAU_CETI, ResourceKind::Electronics) == 200.0;
    let freed = engine.galaxy.vehicle(MULE).is_some_and(|v| {
        v.is_idle() && v.state.location == TAU_CETI && v.state.mission.is_none()
    });
    vec![TestResult::new(
        "one_way_delivery",
        delivered && stocked && freed,
        format!("200 Electronics delivered to Tau Ceti in {} ticks", ticks),
    )]
}

fn check_round_trip_atomic(config: &EngineConfig, scenario: &ScenarioSpec) -> Vec<TestResult> {
    let mut engine = match fresh(config, scenario) {
        Ok(e) => e,
        Err(e) => return setup_failed("round_trip_atomic", e),
    };
    let request = MissionRequest::round_trip(
        DRAY,
        BARNARD,
        lines(&[(ResourceKind::Food, 80.0)]),
        lines(&[(ResourceKind::Water, 60.0)]),
    );
    let estimate = engine.validate_mission(&request).fuel_estimate;

    engine.galaxy.set_amount(SOL, ResourceKind::Fuel, estimate - 1.0);
    let rejected = engine.launch(request.clone()).is_err()
        && engine.galaxy.amount(SOL, ResourceKind::Food) == 2_500.0
        && close(engine.galaxy.amount(SOL, ResourceKind::Fuel), estimate - 1.0);

    engine.galaxy.set_amount(SOL, ResourceKind::Fuel, estimate);
    let launched = match engine.launch(request) {
        Ok(id) => id,
        Err(e) => return setup_failed("round_trip_atomic", e),
    };
    let drained = engine.galaxy.amount(SOL, ResourceKind::Fuel) == 0.0;
    run_until_done(&mut engine, launched);
    let completed = engine
        .mission(launched)
        .is_some_and(|m| m.completion() == Some(&Completion::Delivered));
    let swapped = engine.galaxy.amount(BARNARD, ResourceKind::Food) == 80.0
        && engine.galaxy.amount(SOL, ResourceKind::Water) == 2_060.0;

    vec![TestResult::new(
        "round_trip_atomic",
        rejected && drained && completed && swapped,
        format!(
            "both legs ({:.1} fuel) reserved at launch or not at all",
            estimate
        ),
    )]
}

fn check_recurring_stuck(config: &EngineConfig, scenario: &ScenarioSpec) -> Vec<TestResult> {
    let mut engine = match fresh(config, scenario) {
        Ok(e) => e,
        Err(e) => return setup_failed("recurring_stuck_at_destination", e),
    };
    let id = match engine.create_recurring_route(
        COURIER,
        SOL,
        lines(&[(ResourceKind::Iron, 50.0)]),
        lines(&[(ResourceKind::Medicine, 20.0)]),
    ) {
        Ok(id) => id,
        Err(e) => return setup_failed("recurring_stuck_at_destination", e),
    };
    run(&mut engine, 60);

    let stuck = engine.mission(id).is_some_and(|m| {
        m.phase == MissionPhase::AtDestinationUnloadingAndPreparing
            && m.trips_completed == 0
            && m.wait().is_some_and(|w| {
                w.reason == WaitReason::Cargo
                    && w.resource == Some(ResourceKind::Medicine)
                    && w.location == SOL
            })
    });
    let warned_once = engine.notifications().count(Severity::Warning) == 1;
    vec![TestResult::new(
        "recurring_stuck_at_destination",
        stuck && warned_once && engine.galaxy.amount(SOL, ResourceKind::Iron) == 50.0,
        engine
            .mission(id)
            .map(|m| m.status.label())
            .unwrap_or_default(),
    )]
}

fn check_starvation(config: &EngineConfig, scenario: &ScenarioSpec) -> Vec<TestResult> {
    let mut engine = match fresh(config, scenario) {
        Ok(e) => e,
        Err(e) => return setup_failed("starvation_waits", e),
    };
    let id = match engine.create_recurring_route(
        PACKHORSE,
        SOL,
        lines(&[(ResourceKind::Steel, 100.0)]),
        Vec::new(),
    ) {
        Ok(id) => id,
        Err(e) => return setup_failed("starvation_waits", e),
    };
    run(&mut engine, 10);
    let waiting = engine.mission(id).is_some_and(|m| {
        m.phase == MissionPhase::AtOriginPreparingOutbound
            && m.fuel_consumed == 0.0
            && m.wait().map(|w| w.reason) == Some(WaitReason::Cargo)
    });
    let fuel_kept = engine.galaxy.amount(BARNARD, ResourceKind::Fuel) == 6_000.0;

    engine.galaxy.set_amount(BARNARD, ResourceKind::Steel, 100.0);
    run(&mut engine, 1);
    let resumed = engine
        .mission(id)
        .is_some_and(|m| m.phase == MissionPhase::InTransitToDestination);

    vec![TestResult::new(
        "starvation_waits",
        waiting && fuel_kept && resumed,
        "no fuel charged while the origin is dry; departs once stocked",
    )]
}

fn check_partial_load(config: &EngineConfig, scenario: &ScenarioSpec) -> Vec<TestResult> {
    let mut engine = match fresh(config, scenario) {
        Ok(e) => e,
        Err(e) => return setup_failed("partial_load_departs", e),
    };
    engine.galaxy.set_amount(BARNARD, ResourceKind::Water, 120.0);
    let id = match engine.create_recurring_route(
        PACKHORSE,
        SOL,
        lines(&[(ResourceKind::Water, 300.0)]),
        Vec::new(),
    ) {
        Ok(id) => id,
        Err(e) => return setup_failed("partial_load_departs", e),
    };
    run(&mut engine, 1);
    let (phase, weight, fuel) = engine
        .mission(id)
        .map(|m| (Some(m.phase), m.cargo_weight(), m.fuel_consumed))
        .unwrap_or((None, 0.0, 0.0));
    vec![TestResult::new(
        "partial_load_departs",
        phase == Some(MissionPhase::InTransitToDestination) && weight == 120.0 && close(fuel, 576.0),
        format!("departed with {:.0} of 300 Water, {:.1} fuel", weight, fuel),
    )]
}

fn check_storage_overflow(config: &EngineConfig, scenario: &ScenarioSpec) -> Vec<TestResult> {
    let mut engine = match fresh(config, scenario) {
        Ok(e) => e,
        Err(e) => return setup_failed("storage_overflow_residual", e),
    };
    engine.galaxy.set_amount(WOLF, ResourceKind::Steel, 150.0);
    let id = match engine.create_one_way_mission(DRAY, WOLF, lines(&[(ResourceKind::Steel, 100.0)])) {
        Ok(id) => id,
        Err(e) => return setup_failed("storage_overflow_residual", e),
    };
    for _ in 0..MAX_TICKS {
        let blocked = engine
            .mission(id)
            .and_then(|m| m.wait())
            .is_some_and(|w| w.reason == WaitReason::StorageSpace);
        if blocked {
            break;
        }
        engine.tick(1_000);
    }
    let partial = engine.galaxy.amount(WOLF, ResourceKind::Steel) == 200.0;
    let residual = ResourceMap::from_pairs(&[(ResourceKind::Steel, 50.0)]);
    let cancelled = engine.cancel_mission(id) == Ok(CancelOutcome::Completed { residual });

    engine.galaxy.set_amount(WOLF, ResourceKind::Steel, 0.0);
    let dumped = engine
        .dump_residual_cargo(DRAY)
        .is_ok_and(|d| d.get(ResourceKind::Steel) == 50.0);
    let empty = engine.galaxy.vehicle(DRAY).is_some_and(|v| !v.carries_cargo());

    vec![TestResult::new(
        "storage_overflow_residual",
        partial && cancelled && dumped && empty,
        "50 Steel kept aboard when Wolf 359 filled up, dumped after space freed",
    )]
}

fn check_cancellation(config: &EngineConfig, scenario: &ScenarioSpec) -> Vec<TestResult> {
    let mut engine = match fresh(config, scenario) {
        Ok(e) => e,
        Err(e) => return setup_failed("cancellation_conserves_cargo", e),
    };
    let before = accounted(&engine.galaxy, engine.logistics().missions());

    let launches = [
        engine.create_one_way_mission(MULE, TAU_CETI, lines(&[(ResourceKind::Electronics, 200.0)])),
        engine.create_round_trip_mission(
            DRAY,
            BARNARD,
            lines(&[(ResourceKind::Food, 80.0)]),
            lines(&[(ResourceKind::Water, 60.0)]),
        ),
        engine.create_recurring_route(
            LEVIATHAN,
            TAU_CETI,
            lines(&[(ResourceKind::Steel, 500.0)]),
            lines(&[(ResourceKind::Iron, 500.0)]),
        ),
    ];
    let ids: Vec<MissionId> = launches.into_iter().filter_map(Result::ok).collect();
    if ids.len() != 3 {
        return setup_failed("cancellation_conserves_cargo", "launch rejected");
    }

    run(&mut engine, 2);
    let scheduled = ids
        .iter()
        .all(|&id| engine.cancel_mission(id) == Ok(CancelOutcome::Scheduled));
    let double = ids
        .iter()
        .all(|&id| engine.cancel_mission(id) == Err(CancelError::AlreadyCancelling(id)));
    for &id in &ids {
        run_until_done(&mut engine, id);
    }
    let all_cancelled = ids.iter().all(|&id| {
        engine
            .mission(id)
            .is_some_and(|m| m.completion() == Some(&Completion::Cancelled))
    });
    let after = accounted(&engine.galaxy, engine.logistics().missions());

    vec![TestResult::new(
        "cancellation_conserves_cargo",
        scheduled && double && all_cancelled && close(before, after),
        format!("{:.3} units accounted before, {:.3} after", before, after),
    )]
}

// ── 5. Colonization ─────────────────────────────────────────────────────

fn quota(water: f64) -> Vec<CargoLine> {
    lines(&[
        (ResourceKind::Steel, 100.0),
        (ResourceKind::Glass, 50.0),
        (ResourceKind::Food, 100.0),
        (ResourceKind::Water, water),
    ])
}

fn validate_colonization(
    config: &EngineConfig,
    scenario: &ScenarioSpec,
    _verbose: bool,
) -> Vec<TestResult> {
    println!("--- Colonization ---");
    let mut results = Vec::new();

    let mut engine = match fresh(config, scenario) {
        Ok(e) => e,
        Err(e) => return setup_failed("colonization_three_trips", e),
    };
    match engine.create_colonization_run(PIONEER, KEPLER, quota(50.0), Some(BodyId(1))) {
        Ok(id) => {
            let ticks = run_until_done(&mut engine, id);
            let trips = engine.mission(id).map_or(0, |m| m.trips_completed);
            let founded = engine
                .mission(id)
                .is_some_and(|m| m.completion() == Some(&Completion::Delivered));
            results.push(TestResult::new(
                "colonization_three_trips",
                founded && trips == 3,
                format!("300 units at capacity 100: {} trips, {} ticks", trips, ticks),
            ));

            let hub = engine
                .galaxy
                .facilities()
                .into_iter()
                .find(|f| f.body == BodyId(1));
            results.push(TestResult::new(
                "colonization_colony_founded",
                engine.galaxy.population(KEPLER) == Some(1_000)
                    && hub.is_some_and(|f| f.kind == FacilityKind::ColonyHub),
                format!("population {:?}", engine.galaxy.population(KEPLER)),
            ));

            let again = engine.create_colonization_run(DRAY, KEPLER, quota(50.0), None);
            results.push(TestResult::new(
                "colonization_only_once",
                again.is_err(),
                again.err().map(|e| e.to_string()).unwrap_or_default(),
            ));
        }
        Err(e) => results.extend(setup_failed("colonization_three_trips", e)),
    }

    let mut engine = match fresh(config, scenario) {
        Ok(e) => e,
        Err(e) => {
            results.extend(setup_failed("colonization_sources_shortfall", e));
            return results;
        }
    };
    match engine.create_colonization_run(PIONEER, KEPLER, quota(30.0), None) {
        Ok(id) => {
            run_until_done(&mut engine, id);
            let sourced = engine.mission(id).is_some_and(|m| {
                m.completion() == Some(&Completion::Delivered)
                    && m.trips_completed == 4
                    && m.colonization.as_ref().map(|s| s.auto_source_rounds) == Some(1)
            });
            results.push(TestResult::new(
                "colonization_sources_shortfall",
                sourced && engine.galaxy.is_colonized(KEPLER),
                "20 Water short, collected from Sol on a fourth trip",
            ));
        }
        Err(e) => results.extend(setup_failed("colonization_sources_shortfall", e)),
    }

    results
}

// ── 6. Soak ─────────────────────────────────────────────────────────────

const CARGO_KINDS: [ResourceKind; 9] = [
    ResourceKind::Steel,
    ResourceKind::Glass,
    ResourceKind::Food,
    ResourceKind::Water,
    ResourceKind::Iron,
    ResourceKind::Silicon,
    ResourceKind::Electronics,
    ResourceKind::Machinery,
    ResourceKind::Fuel,
];

#[derive(Default)]
struct SoakReport {
    launched: usize,
    rejected: usize,
    cancelled: usize,
    dumped: usize,
    violations: Vec<String>,
    summaries: Vec<MissionSummary>,
    totals: ResourceMap,
}

fn random_manifest(rng: &mut StdRng, capacity: f64) -> Vec<CargoLine> {
    let count = rng.gen_range(1..=2);
    let share = capacity.min(400.0) / 2.0;
    CARGO_KINDS
        .choose_multiple(rng, count)
        .map(|&kind| CargoLine::request(kind, rng.gen_range(5.0..share).round()))
        .collect()
}

fn random_launch(
    engine: &mut SimulationEngine,
    rng: &mut StdRng,
    locations: &[LocationId],
    report: &mut SoakReport,
) {
    let ids = engine.galaxy.vehicle_ids();
    let Some(&id) = ids.choose(rng) else {
        return;
    };
    let Some(vehicle) = engine.galaxy.vehicle(id) else {
        return;
    };
    if !vehicle.is_idle() || vehicle.state.mission.is_some() {
        return;
    }
    if vehicle.carries_cargo() {
        if engine.dump_residual_cargo(id).is_ok() {
            report.dumped += 1;
        }
        return;
    }
    let here = vehicle.state.location;
    let targets: Vec<LocationId> = locations.iter().copied().filter(|&l| l != here).collect();
    let Some(&to) = targets.choose(rng) else {
        return;
    };

    let capacity = vehicle.profile.capacity;
    let outbound = random_manifest(rng, capacity);
    let back = if rng.gen_bool(0.7) {
        random_manifest(rng, capacity)
    } else {
        Vec::new()
    };
    let request = match rng.gen_range(0..10) {
        0..=3 => MissionRequest::one_way(id, to, outbound),
        4..=5 => MissionRequest::round_trip(id, to, outbound, back),
        6..=8 => MissionRequest::recurring(id, to, outbound, back),
        _ => {
            let cargo = quota(rng.gen_range(20.0..80.0_f64).round());
            MissionRequest::colonization(id, KEPLER, cargo, None)
        }
    };
    match engine.launch(request) {
        Ok(_) => report.launched += 1,
        Err(_) => report.rejected += 1,
    }
}

fn check_invariants(engine: &SimulationEngine, baseline: f64, tick: usize, violations: &mut Vec<String>) {
    let galaxy = &engine.galaxy;
    let logistics = engine.logistics();

    for id in galaxy.vehicle_ids() {
        let Some(vehicle) = galaxy.vehicle(id) else {
            continue;
        };
        let aboard = vehicle.state.cargo.total();
        if aboard > vehicle.profile.capacity + 1e-6 {
            violations.push(format!(
                "tick {}: {} carries {:.3} over capacity {:.1}",
                tick, id, aboard, vehicle.profile.capacity
            ));
        }
        if ResourceKind::ALL.iter().any(|&k| vehicle.state.cargo.get(k) < -1e-9) {
            violations.push(format!("tick {}: {} holds a negative amount", tick, id));
        }
        let linked = logistics.mission_for_vehicle(id);
        if vehicle.state.mission != linked {
            violations.push(format!(
                "tick {}: {} points at {:?}, store says {:?}",
                tick, id, vehicle.state.mission, linked
            ));
        }
    }

    for id in galaxy.location_ids() {
        let Some(stockpile) = galaxy.stockpile(id) else {
            continue;
        };
        if let Some(kind) = ResourceKind::ALL
            .into_iter()
            .find(|&k| stockpile.amounts.get(k) < -1e-9)
        {
            violations.push(format!("tick {}: {} has negative {}", tick, id, kind));
        }
    }

    let mut busy = HashSet::new();
    for mission in logistics.missions().filter(|m| !m.is_completed()) {
        if !busy.insert(mission.vehicle) {
            violations.push(format!(
                "tick {}: {} flies two active missions",
                tick, mission.vehicle
            ));
        }
    }

    let total = accounted(galaxy, logistics.missions());
    if !close(total, baseline) {
        violations.push(format!(
            "tick {}: {:.6} units accounted, expected {:.6}",
            tick, total, baseline
        ));
    }
}

fn soak(
    config: &EngineConfig,
    scenario: &ScenarioSpec,
    settings: SoakConfig,
) -> Result<SoakReport, EngineError> {
    let mut engine = fresh(config, scenario)?;
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let locations = engine.galaxy.location_ids();
    let mut baseline = accounted(&engine.galaxy, engine.logistics().missions());
    let mut report = SoakReport::default();

    for tick in 0..settings.ticks {
        if rng.gen_bool(0.3) {
            random_launch(&mut engine, &mut rng, &locations, &mut report);
        }

        if rng.gen_bool(0.03) {
            let active: Vec<MissionId> = engine
                .logistics()
                .missions()
                .filter(|m| !m.is_completed() && !m.is_cancelling())
                .map(|m| m.id)
                .collect();
            if let Some(&id) = active.choose(&mut rng) {
                if engine.cancel_mission(id).is_ok() {
                    report.cancelled += 1;
                }
            }
        }

        // Production elsewhere in the galaxy tops up storage now and then.
        if rng.gen_bool(0.08) {
            if let Some(&at) = locations.choose(&mut rng) {
                let kind = ResourceKind::ALL[rng.gen_range(0..ResourceKind::ALL.len())];
                let put = rng
                    .gen_range(10.0..400.0_f64)
                    .round()
                    .min(engine.galaxy.free_space(at, kind));
                if put > 0.0 {
                    engine.galaxy.deposit(at, kind, put);
                    baseline += put;
                }
            }
        }

        engine.tick(settings.tick_ms);
        check_invariants(&engine, baseline, tick, &mut report.violations);
    }

    report.summaries = engine.summaries();
    report.totals = engine.galaxy.total_in_play();
    log::info!(
        "soak finished: {} launched, {} rejected, {} cancelled, {} notifications",
        report.launched,
        report.rejected,
        report.cancelled,
        engine.notifications().total()
    );
    Ok(report)
}

fn validate_soak(
    config: &EngineConfig,
    scenario: &ScenarioSpec,
    settings: SoakConfig,
    verbose: bool,
) -> Vec<TestResult> {
    println!("--- Randomized Soak (seed {}, {} ticks) ---", settings.seed, settings.ticks);
    let mut results = Vec::new();

    let first = match soak(config, scenario, settings) {
        Ok(r) => r,
        Err(e) => return setup_failed("soak_invariants", e),
    };
    if verbose {
        println!(
            "  {} launched, {} rejected, {} cancelled, {} residual dumps",
            first.launched, first.rejected, first.cancelled, first.dumped
        );
        for v in first.violations.iter().take(10) {
            println!("    {}", v);
        }
    }

    results.push(TestResult::new(
        "soak_exercised",
        first.launched > 0,
        format!("{} missions launched", first.launched),
    ));
    results.push(TestResult::new(
        "soak_invariants",
        first.violations.is_empty(),
        match first.violations.first() {
            None => "capacity, non-negative pools, single linkage, conservation held every tick"
                .to_string(),
            Some(v) => format!("{} violations, first: {}", first.violations.len(), v),
        },
    ));

    match soak(config, scenario, settings) {
        Ok(second) => results.push(TestResult::new(
            "soak_deterministic",
            first.summaries == second.summaries && first.totals == second.totals,
            format!("{} missions replayed identically", first.summaries.len()),
        )),
        Err(e) => results.extend(setup_failed("soak_deterministic", e)),
    }

    results
}
