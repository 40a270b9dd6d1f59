//! Resource kinds and fixed-size per-resource amount maps.
//!
//! Every tradeable good is a variant of the closed [`ResourceKind`] enum, and
//! per-resource quantities live in a [`ResourceMap`] backed by a fixed array
//! indexed by the kind. Amounts are plain `f64` units; one unit of any
//! resource weighs one unit of vehicle capacity.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

/// Amounts at or below this are treated as zero (float dust from partial loads).
pub const AMOUNT_EPSILON: f64 = 1e-9;

/// Number of [`ResourceKind`] variants.
pub const RESOURCE_COUNT: usize = 10;

/// A stockpiled, shippable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ResourceKind {
    /// Propellant. Also the pool that mission fuel is charged against.
    Fuel = 0,
    Steel = 1,
    Glass = 2,
    Food = 3,
    Water = 4,
    Iron = 5,
    Silicon = 6,
    Electronics = 7,
    Machinery = 8,
    Medicine = 9,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; RESOURCE_COUNT] = [
        Self::Fuel,
        Self::Steel,
        Self::Glass,
        Self::Food,
        Self::Water,
        Self::Iron,
        Self::Silicon,
        Self::Electronics,
        Self::Machinery,
        Self::Medicine,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Fuel => "Fuel",
            Self::Steel => "Steel",
            Self::Glass => "Glass",
            Self::Food => "Food",
            Self::Water => "Water",
            Self::Iron => "Iron",
            Self::Silicon => "Silicon",
            Self::Electronics => "Electronics",
            Self::Machinery => "Machinery",
            Self::Medicine => "Medicine",
        }
    }

    pub fn from_u8(val: u8) -> Option<Self> {
        Self::ALL.get(val as usize).copied()
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-resource amounts. Serialized as a `{ "Steel": 100.0, ... }` map of the
/// non-zero entries.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<ResourceKind, f64>",
    into = "BTreeMap<ResourceKind, f64>"
)]
pub struct ResourceMap([f64; RESOURCE_COUNT]);

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(ResourceKind, f64)]) -> Self {
        let mut map = Self::new();
        for &(kind, amount) in pairs {
            map.add(kind, amount);
        }
        map
    }

    #[inline]
    pub fn get(&self, kind: ResourceKind) -> f64 {
        self.0[kind.index()]
    }

    #[inline]
    pub fn set(&mut self, kind: ResourceKind, amount: f64) {
        self.0[kind.index()] = amount;
    }

    #[inline]
    pub fn add(&mut self, kind: ResourceKind, amount: f64) {
        self.0[kind.index()] += amount;
    }

    /// Remove up to `amount`, never going below zero. Returns what was removed.
    pub fn take(&mut self, kind: ResourceKind, amount: f64) -> f64 {
        let slot = &mut self.0[kind.index()];
        let taken = amount.max(0.0).min(*slot);
        *slot -= taken;
        if *slot <= AMOUNT_EPSILON {
            *slot = 0.0;
        }
        taken
    }

    pub fn merge(&mut self, other: &ResourceMap) {
        for kind in ResourceKind::ALL {
            self.add(kind, other.get(kind));
        }
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|v| *v <= AMOUNT_EPSILON)
    }

    /// Non-zero entries in [`ResourceKind::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, f64)> + '_ {
        ResourceKind::ALL
            .into_iter()
            .map(|kind| (kind, self.get(kind)))
            .filter(|(_, amount)| *amount > AMOUNT_EPSILON)
    }

    /// How much of each requirement is still missing from `self`.
    pub fn shortfall_against(&self, requirements: &ResourceMap) -> ResourceMap {
        let mut short = ResourceMap::new();
        for (kind, needed) in requirements.iter() {
            let missing = needed - self.get(kind);
            if missing > AMOUNT_EPSILON {
                short.set(kind, missing);
            }
        }
        short
    }

    /// Amounts in `self` above what `requirements` asks for.
    pub fn surplus_over(&self, requirements: &ResourceMap) -> ResourceMap {
        let mut surplus = ResourceMap::new();
        for (kind, have) in self.iter() {
            let extra = have - requirements.get(kind);
            if extra > AMOUNT_EPSILON {
                surplus.set(kind, extra);
            }
        }
        surplus
    }

    pub fn covers(&self, requirements: &ResourceMap) -> bool {
        self.shortfall_against(requirements).is_empty()
    }
}

impl Index<ResourceKind> for ResourceMap {
    type Output = f64;

    fn index(&self, kind: ResourceKind) -> &f64 {
        &self.0[kind.index()]
    }
}

impl From<BTreeMap<ResourceKind, f64>> for ResourceMap {
    fn from(entries: BTreeMap<ResourceKind, f64>) -> Self {
        let mut map = ResourceMap::new();
        for (kind, amount) in entries {
            map.set(kind, amount);
        }
        map
    }
}

impl From<ResourceMap> for BTreeMap<ResourceKind, f64> {
    fn from(map: ResourceMap) -> Self {
        map.iter().collect()
    }
}

impl fmt::Display for ResourceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("nothing");
        }
        let mut first = true;
        for (kind, amount) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{:.1} {}", amount, kind)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_u8(kind as u8), Some(kind));
        }
        assert!(ResourceKind::from_u8(99).is_none());
    }

    #[test]
    fn test_take_saturates() {
        let mut map = ResourceMap::from_pairs(&[(ResourceKind::Steel, 30.0)]);
        assert_eq!(map.take(ResourceKind::Steel, 50.0), 30.0);
        assert_eq!(map.get(ResourceKind::Steel), 0.0);
        assert_eq!(map.take(ResourceKind::Glass, 10.0), 0.0);
    }

    #[test]
    fn test_shortfall_and_surplus() {
        let requirements = ResourceMap::from_pairs(&[
            (ResourceKind::Steel, 100.0),
            (ResourceKind::Food, 50.0),
        ]);
        let delivered = ResourceMap::from_pairs(&[
            (ResourceKind::Steel, 120.0),
            (ResourceKind::Food, 20.0),
        ]);
        let short = delivered.shortfall_against(&requirements);
        assert_eq!(short.get(ResourceKind::Food), 30.0);
        assert_eq!(short.get(ResourceKind::Steel), 0.0);
        let surplus = delivered.surplus_over(&requirements);
        assert_eq!(surplus.get(ResourceKind::Steel), 20.0);
        assert!(!delivered.covers(&requirements));
    }

    #[test]
    fn test_iter_skips_zero_entries() {
        let map = ResourceMap::from_pairs(&[(ResourceKind::Water, 5.0)]);
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries, vec![(ResourceKind::Water, 5.0)]);
    }

    #[test]
    fn test_display() {
        let map = ResourceMap::from_pairs(&[(ResourceKind::Steel, 10.0), (ResourceKind::Fuel, 2.5)]);
        assert_eq!(map.to_string(), "2.5 Fuel, 10.0 Steel");
        assert_eq!(ResourceMap::new().to_string(), "nothing");
    }
}
