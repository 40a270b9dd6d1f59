//! Colonization runs.
//!
//! The full cargo quota is reserved at launch and shuttled in capacity-sized
//! batches. The first delivery opens a temporary holding depot on a body at
//! the destination; once everything has landed the run either founds a
//! colony (holding depot becomes the colony hub, surplus goes into colony
//! storage) or tops up the shortfall from the origin, or fails.

use crate::cargo::{self, CargoLine};
use crate::config::ColonizationConfig;
use crate::engine::{self, CancelOutcome, Step, TickContext};
use crate::galaxy::{FacilityKind, FacilityRegistry, Galaxy, LocationStorage, Severity, Vehicle};
use crate::ids::{BodyId, FacilityId, LocationId};
use crate::mission::{ColonizationState, Completion, Mission, MissionPhase, MissionStatus};
use crate::resources::{ResourceKind, ResourceMap, AMOUNT_EPSILON};

/// Founding population for a colony that received `delivered`.
///
/// Scales `base_population` by the lowest delivered/required ratio, clamped
/// to `[1, max_population_multiplier]`.
pub fn colony_population(delivered: &ResourceMap, rules: &ColonizationConfig) -> u64 {
    let ratio = rules
        .requirements
        .iter()
        .map(|(kind, needed)| delivered.get(kind) / needed)
        .fold(f64::INFINITY, f64::min);
    let ratio = if ratio.is_finite() { ratio } else { 1.0 };
    let multiplier = ratio.clamp(1.0, rules.max_population_multiplier.max(1.0));
    (rules.base_population as f64 * multiplier).round().max(1.0) as u64
}

/// Reserve the whole quota, load the first batch and dispatch.
pub(crate) fn launch<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
    vehicle: &Vehicle,
    site: Option<BodyId>,
) -> Step {
    let mut queue: Vec<CargoLine> = mission
        .outbound
        .iter()
        .filter(|l| l.requested > AMOUNT_EPSILON)
        .map(|l| CargoLine::reserved(l.kind, l.requested))
        .collect();
    let reserved = cargo::to_resource_map(&queue);
    mission.current_cargo = cargo::split_batch(&mut queue, vehicle.profile.capacity);
    mission.colonization = Some(ColonizationState {
        remaining: queue,
        site,
        ..ColonizationState::default()
    });

    let fuel = engine::leg_fuel(ctx, mission, vehicle)?;
    let destination = mission.destination;
    engine::depart(
        ctx,
        mission,
        vehicle,
        destination,
        MissionPhase::InTransitToDestination,
    )?;

    let origin = mission.origin;
    for (kind, amount) in reserved.iter() {
        ctx.galaxy.deduct(origin, kind, amount);
    }
    ctx.galaxy.deduct(origin, ResourceKind::Fuel, fuel);
    mission.fuel_consumed += fuel;
    Ok(())
}

/// Batch aboard at the origin: pay the leg and go.
pub(crate) fn prepare_at_origin<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
    vehicle: &Vehicle,
) -> Step {
    let origin = mission.origin;
    if mission.is_cancelling() {
        cargo::return_to_storage(ctx.galaxy, origin, &mut mission.current_cargo);
        engine::complete(ctx, mission, Completion::Cancelled);
        return Ok(());
    }
    if mission.current_cargo.is_empty() {
        take_next_batch(ctx, mission, vehicle)?;
    }

    let fuel = engine::leg_fuel(ctx, mission, vehicle)?;
    if !engine::pay_fuel(ctx, mission, origin, fuel) {
        engine::enter_wait(ctx, mission, engine::fuel_wait(origin));
        return Ok(());
    }
    let destination = mission.destination;
    engine::depart(
        ctx,
        mission,
        vehicle,
        destination,
        MissionPhase::InTransitToDestination,
    )
}

/// Land the batch, then head back for more or settle the colony.
pub(crate) fn at_destination<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
    vehicle: &Vehicle,
) -> Step {
    // A fuel wait retries here with an empty hold; only deliver once.
    if !mission.current_cargo.is_empty() {
        deliver(ctx, mission)?;
    }
    if mission.is_completed() {
        return Ok(());
    }
    if mission.is_cancelling() {
        engine::complete(ctx, mission, Completion::Cancelled);
        return Ok(());
    }

    let more_to_fly = mission
        .colonization
        .as_ref()
        .is_some_and(|s| !s.remaining.is_empty());
    if more_to_fly {
        head_home(ctx, mission, vehicle)
    } else {
        settle(ctx, mission, vehicle)
    }
}

/// Back at the origin: put the next batch aboard.
pub(crate) fn at_origin<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
    vehicle: &Vehicle,
) -> Step {
    if mission.is_cancelling() {
        let origin = mission.origin;
        cargo::return_to_storage(ctx.galaxy, origin, &mut mission.current_cargo);
        engine::complete(ctx, mission, Completion::Cancelled);
        return Ok(());
    }
    take_next_batch(ctx, mission, vehicle)?;
    mission.phase = MissionPhase::AtOriginPreparingOutbound;
    Ok(())
}

/// Refund everything reserved but not yet delivered, then wind down.
pub(crate) fn cancel<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
) -> CancelOutcome {
    let origin = mission.origin;
    if let Some(state) = mission.colonization.as_mut() {
        let refund = cargo::to_resource_map(&state.remaining);
        cargo::return_to_storage(ctx.galaxy, origin, &mut state.remaining);
        if !refund.is_empty() {
            log::info!("{} refunded {} to {}", mission.id, refund, origin);
        }
    }

    let batch_aboard = !mission.current_cargo.is_empty();
    match mission.phase {
        MissionPhase::InTransitToDestination | MissionPhase::InTransitToOrigin => {
            mission.status = MissionStatus::Cancelling;
            CancelOutcome::Scheduled
        }
        MissionPhase::AtDestinationUnloadingAndPreparing if batch_aboard => {
            mission.status = MissionStatus::Cancelling;
            CancelOutcome::Scheduled
        }
        MissionPhase::AtOriginPreparingOutbound | MissionPhase::AtOriginUnloading => {
            cargo::return_to_storage(ctx.galaxy, origin, &mut mission.current_cargo);
            engine::complete(ctx, mission, Completion::Cancelled);
            CancelOutcome::Completed {
                residual: ResourceMap::new(),
            }
        }
        MissionPhase::AtDestinationUnloadingAndPreparing => {
            engine::complete(ctx, mission, Completion::Cancelled);
            CancelOutcome::Completed {
                residual: mission.cargo_aboard(),
            }
        }
    }
}

fn take_next_batch<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
    vehicle: &Vehicle,
) -> Step {
    if let Some(state) = mission.colonization.as_mut() {
        let batch = cargo::split_batch(&mut state.remaining, vehicle.profile.capacity);
        mission.current_cargo.extend(batch);
    }
    engine::sync_cargo(ctx, mission)
}

fn deliver<G: Galaxy + ?Sized>(ctx: &mut TickContext<'_, G>, mission: &mut Mission) -> Step {
    let load = cargo::to_resource_map(&mission.current_cargo);
    mission.current_cargo.clear();
    engine::sync_cargo(ctx, mission)?;
    mission.trips_completed += 1;
    mission.cargo_delivered.merge(&load);

    let destination = mission.destination;
    let state = mission.colonization.get_or_insert_with(ColonizationState::default);
    state.delivered.merge(&load);
    if state.holding.is_none() {
        state.holding = open_holding_depot(ctx.galaxy, destination, state.site);
    }
    let holding = state.holding;
    match holding {
        Some((facility, _)) => ctx.galaxy.stock_facility(facility, &load),
        None => return abandon_without_site(ctx, mission, &load),
    }

    let message = format!(
        "{} landed {} at {} (trip {})",
        mission.id,
        load,
        engine::place_name(&*ctx.galaxy, destination),
        mission.trips_completed
    );
    log::info!("{}", message);
    ctx.galaxy
        .notify(Severity::Info, "Colony cargo delivered", &message);
    Ok(())
}

fn open_holding_depot<G: FacilityRegistry + ?Sized>(
    galaxy: &mut G,
    location: LocationId,
    site: Option<BodyId>,
) -> Option<(FacilityId, BodyId)> {
    let bodies = galaxy.bodies_at(location);
    let body = site
        .and_then(|site| bodies.iter().find(|b| b.id == site && b.free_slots() > 0))
        .or_else(|| bodies.iter().find(|b| b.free_slots() > 0))?;
    let facility = galaxy.create_facility(body.id, FacilityKind::HoldingDepot)?;
    galaxy.adjust_slot_usage(body.id, 1);
    Some((facility, body.id))
}

/// Empty return leg to the origin.
fn head_home<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
    vehicle: &Vehicle,
) -> Step {
    let destination = mission.destination;
    let fuel = engine::leg_fuel(ctx, mission, vehicle)?;
    if !engine::pay_fuel(ctx, mission, destination, fuel) {
        engine::enter_wait(ctx, mission, engine::fuel_wait(destination));
        return Ok(());
    }
    let origin = mission.origin;
    engine::depart(ctx, mission, vehicle, origin, MissionPhase::InTransitToOrigin)
}

/// Everything has landed: found the colony, source the shortfall, or fail.
fn settle<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
    vehicle: &Vehicle,
) -> Step {
    let config = ctx.config;
    let rules = &config.colonization;
    let origin = mission.origin;
    if ctx.galaxy.is_colonized(mission.destination) {
        return join_existing_colony(ctx, mission);
    }
    let state = mission.colonization.get_or_insert_with(ColonizationState::default);
    let shortfall = state.delivered.shortfall_against(&rules.requirements);
    if shortfall.is_empty() {
        return found_colony(ctx, mission);
    }

    if state.auto_source_rounds < rules.max_auto_source_rounds {
        for (kind, missing) in shortfall.iter() {
            let take = missing.min(ctx.galaxy.amount(origin, kind).max(0.0));
            if take > AMOUNT_EPSILON {
                ctx.galaxy.deduct(origin, kind, take);
                state.remaining.push(CargoLine::reserved(kind, take));
            }
        }
        if !state.remaining.is_empty() {
            state.auto_source_rounds += 1;
            let message = format!(
                "{} is short of {}; collecting {} from {}",
                mission.id,
                shortfall,
                cargo::to_resource_map(&state.remaining),
                engine::place_name(&*ctx.galaxy, origin)
            );
            log::info!("{}", message);
            ctx.galaxy
                .notify(Severity::Info, "Sourcing colony shortfall", &message);
            return head_home(ctx, mission, vehicle);
        }
    }

    engine::complete(ctx, mission, Completion::ColonizationFailed { shortfall });
    Ok(())
}

fn found_colony<G: Galaxy + ?Sized>(ctx: &mut TickContext<'_, G>, mission: &mut Mission) -> Step {
    let config = ctx.config;
    let rules = &config.colonization;
    let state = mission.colonization.clone().unwrap_or_default();
    let destination = mission.destination;

    let population = colony_population(&state.delivered, rules);
    ctx.galaxy.mark_colonized(destination, population);

    let surplus = state.delivered.surplus_over(&rules.requirements);
    let (storable, leftover) = split_storable(&*ctx.galaxy, destination, &surplus);
    let hub = state.holding.and_then(|(facility, body)| {
        ctx.galaxy
            .replace_facility(facility, body, FacilityKind::ColonyHub, &leftover)
    });
    if hub.is_some() {
        deposit_all(&mut *ctx.galaxy, destination, &storable);
    } else {
        log::error!(
            "{} could not raise a colony hub at {}; cargo stays in the holding depot",
            mission.id,
            destination
        );
    }
    if let Some(state) = mission.colonization.as_mut() {
        state.population = Some(population);
        if let Some(hub) = hub {
            state.holding = state.holding.map(|(_, body)| (hub, body));
            for (kind, amount) in state.delivered.iter() {
                state.consumed.set(kind, amount - surplus.get(kind));
            }
        }
    }

    log::info!(
        "{} founded a colony at {} with population {} (surplus {})",
        mission.id,
        destination,
        population,
        surplus
    );
    engine::complete(ctx, mission, Completion::Delivered);
    Ok(())
}

/// Every body at the destination is full: refund the queue, leave what fits
/// of this load in local storage and give up. The rest of the batch stays
/// aboard.
fn abandon_without_site<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
    load: &ResourceMap,
) -> Step {
    let config = ctx.config;
    let origin = mission.origin;
    let destination = mission.destination;
    let mut shortfall = ResourceMap::new();
    if let Some(state) = mission.colonization.as_mut() {
        cargo::return_to_storage(ctx.galaxy, origin, &mut state.remaining);
        shortfall = state.delivered.shortfall_against(&config.colonization.requirements);
    }
    log::warn!("{} found no free facility site at {}", mission.id, destination);

    let (storable, rest) = split_storable(&*ctx.galaxy, destination, load);
    deposit_all(&mut *ctx.galaxy, destination, &storable);
    for (kind, amount) in rest.iter() {
        mission.current_cargo.push(CargoLine::reserved(kind, amount));
    }
    engine::sync_cargo(ctx, mission)?;
    engine::complete(ctx, mission, Completion::ColonizationFailed { shortfall });
    Ok(())
}

/// Another run founded the colony first: move the depot stock into colony
/// storage. Whatever storage can't take stays in a holding depot.
fn join_existing_colony<G: Galaxy + ?Sized>(
    ctx: &mut TickContext<'_, G>,
    mission: &mut Mission,
) -> Step {
    let destination = mission.destination;
    let holding = mission.colonization.as_mut().and_then(|s| s.holding.take());
    let Some((facility, body)) = holding else {
        engine::complete(ctx, mission, Completion::Delivered);
        return Ok(());
    };

    let landed = ctx.galaxy.facility_stock(facility).unwrap_or_default();
    let (mut storable, rest) = split_storable(&*ctx.galaxy, destination, &landed);
    let mut holding = None;
    if rest.is_empty() {
        ctx.galaxy.remove_facility(facility);
        ctx.galaxy.adjust_slot_usage(body, -1);
        deposit_all(&mut *ctx.galaxy, destination, &storable);
    } else {
        match ctx
            .galaxy
            .replace_facility(facility, body, FacilityKind::HoldingDepot, &rest)
        {
            Some(depot) => {
                deposit_all(&mut *ctx.galaxy, destination, &storable);
                holding = Some((depot, body));
            }
            None => {
                storable = ResourceMap::new();
                holding = Some((facility, body));
            }
        }
    }
    if let Some(state) = mission.colonization.as_mut() {
        state.holding = holding;
    }

    log::info!(
        "{} found {} already colonized; handed over {}",
        mission.id,
        destination,
        storable
    );
    if holding.is_some() {
        log::warn!(
            "{} left cargo in a holding depot at {}: colony storage is full",
            mission.id,
            destination
        );
    }
    engine::complete(ctx, mission, Completion::Delivered);
    Ok(())
}

/// Split `goods` into what local storage at `location` can take and the rest.
fn split_storable<G: LocationStorage + ?Sized>(
    galaxy: &G,
    location: LocationId,
    goods: &ResourceMap,
) -> (ResourceMap, ResourceMap) {
    let mut storable = ResourceMap::new();
    let mut rest = ResourceMap::new();
    for (kind, amount) in goods.iter() {
        let put = amount.min(galaxy.free_space(location, kind)).max(0.0);
        if put > AMOUNT_EPSILON {
            storable.add(kind, put);
        }
        if amount - put > AMOUNT_EPSILON {
            rest.add(kind, amount - put);
        }
    }
    (storable, rest)
}

fn deposit_all<G: LocationStorage + ?Sized>(galaxy: &mut G, location: LocationId, goods: &ResourceMap) {
    for (kind, amount) in goods.iter() {
        galaxy.deposit(location, kind, amount);
    }
}
