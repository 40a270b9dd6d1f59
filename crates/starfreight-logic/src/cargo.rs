//! Just-in-time cargo loading and storage-aware unloading.
//!
//! Loading takes whatever is available now, up to the request and the
//! vehicle's remaining capacity. Unloading deposits only what fits at the
//! destination and leaves the rest aboard. Cargo is never discarded.

use serde::{Deserialize, Serialize};

use crate::galaxy::LocationStorage;
use crate::ids::LocationId;
use crate::resources::{ResourceKind, ResourceMap, AMOUNT_EPSILON};

/// One line of a cargo manifest. `loaded` never exceeds `requested`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CargoLine {
    pub kind: ResourceKind,
    pub requested: f64,
    pub loaded: f64,
}

impl CargoLine {
    /// A manifest request with nothing loaded yet.
    pub fn request(kind: ResourceKind, amount: f64) -> Self {
        Self {
            kind,
            requested: amount,
            loaded: 0.0,
        }
    }

    /// A line that has `loaded` aboard out of `requested`.
    pub fn loaded(kind: ResourceKind, requested: f64, loaded: f64) -> Self {
        Self {
            kind,
            requested,
            loaded: loaded.clamp(0.0, requested.max(0.0)),
        }
    }

    /// Already-reserved cargo: fully loaded against its own request.
    pub fn reserved(kind: ResourceKind, amount: f64) -> Self {
        Self::loaded(kind, amount, amount)
    }
}

/// Result of a load attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// At least one line loaded (possibly partially), or the manifest was
    /// deliberately empty.
    Loaded(Vec<CargoLine>),
    /// Nothing at all could be loaded; retry next tick.
    Starved { resource: ResourceKind },
}

/// Result of an unload attempt.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnloadOutcome {
    pub delivered: ResourceMap,
    /// Something is still aboard because the destination was full.
    pub residual: bool,
}

/// Total weight of what is loaded.
pub fn total_weight(lines: &[CargoLine]) -> f64 {
    lines.iter().map(|l| l.loaded).sum()
}

/// Total weight the manifest asks for.
pub fn requested_weight(lines: &[CargoLine]) -> f64 {
    lines.iter().map(|l| l.requested.max(0.0)).sum()
}

/// A manifest that asks for nothing describes a deliberate empty leg.
pub fn is_deadhead(manifest: &[CargoLine]) -> bool {
    manifest.iter().all(|l| l.requested <= AMOUNT_EPSILON)
}

pub fn to_resource_map(lines: &[CargoLine]) -> ResourceMap {
    let mut map = ResourceMap::new();
    for line in lines {
        map.add(line.kind, line.loaded);
    }
    map
}

/// Load `manifest` from `location` into a vehicle with `capacity` free.
pub fn load<S: LocationStorage + ?Sized>(
    storage: &mut S,
    location: LocationId,
    manifest: &[CargoLine],
    capacity: f64,
) -> LoadOutcome {
    if is_deadhead(manifest) {
        return LoadOutcome::Loaded(Vec::new());
    }

    let mut remaining = capacity.max(0.0);
    let mut loaded = Vec::new();
    let mut first_exhausted = None;

    for line in manifest.iter().filter(|l| l.requested > AMOUNT_EPSILON) {
        let available = storage.amount(location, line.kind).max(0.0);
        if available <= AMOUNT_EPSILON && first_exhausted.is_none() {
            first_exhausted = Some(line.kind);
        }
        let to_load = line.requested.min(available).min(remaining);
        if to_load > AMOUNT_EPSILON {
            storage.deduct(location, line.kind, to_load);
            loaded.push(CargoLine::loaded(line.kind, line.requested, to_load));
            remaining -= to_load;
        }
    }

    if loaded.is_empty() {
        let resource = first_exhausted
            .or_else(|| manifest.iter().find(|l| l.requested > AMOUNT_EPSILON).map(|l| l.kind))
            .unwrap_or(ResourceKind::Fuel);
        return LoadOutcome::Starved { resource };
    }
    LoadOutcome::Loaded(loaded)
}

/// Unload `aboard` at `location`, keeping whatever does not fit.
pub fn unload<S: LocationStorage + ?Sized>(
    storage: &mut S,
    location: LocationId,
    aboard: &mut Vec<CargoLine>,
) -> UnloadOutcome {
    let mut outcome = UnloadOutcome::default();

    for line in aboard.iter_mut() {
        let space = storage.free_space(location, line.kind);
        let to_unload = line.loaded.min(space);
        if to_unload > AMOUNT_EPSILON {
            storage.deposit(location, line.kind, to_unload);
            outcome.delivered.add(line.kind, to_unload);
            line.loaded -= to_unload;
        }
    }

    aboard.retain(|l| l.loaded > AMOUNT_EPSILON);
    outcome.residual = !aboard.is_empty();
    outcome
}

/// Put freshly loaded cargo back where it came from.
pub fn return_to_storage<S: LocationStorage + ?Sized>(
    storage: &mut S,
    location: LocationId,
    lines: &mut Vec<CargoLine>,
) {
    for line in lines.drain(..) {
        if line.loaded > AMOUNT_EPSILON {
            storage.deposit(location, line.kind, line.loaded);
        }
    }
}

/// Take the next batch of at most `capacity` from a queue of reserved cargo,
/// splitting a line if it straddles the limit.
pub fn split_batch(queue: &mut Vec<CargoLine>, capacity: f64) -> Vec<CargoLine> {
    let mut remaining = capacity.max(0.0);
    let mut batch = Vec::new();

    for line in queue.iter_mut() {
        if remaining <= AMOUNT_EPSILON {
            break;
        }
        let take = line.loaded.min(remaining);
        if take > AMOUNT_EPSILON {
            batch.push(CargoLine::reserved(line.kind, take));
            line.loaded -= take;
            line.requested = line.loaded;
            remaining -= take;
        }
    }

    queue.retain(|l| l.loaded > AMOUNT_EPSILON);
    batch
}
