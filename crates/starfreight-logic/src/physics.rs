//! Vehicle physics: fuel cost and travel time.
//!
//! Pure functions of distance, cargo weight and the vehicle's size class and
//! modifiers. Nothing here touches storage or the clock.

use serde::{Deserialize, Serialize};

/// Lower bound applied to modifiers so a misconfigured vehicle cannot divide
/// by zero.
const MIN_MODIFIER: f64 = 1e-6;

// ============================================================================
// SIZE CLASSES
// ============================================================================

/// Hull size class. Determines base fuel efficiency, speed and the station
/// tier required to dock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SizeClass {
    /// Shuttles and couriers. Docks anywhere with a station.
    Light = 0,
    /// Standard freighters.
    Medium = 1,
    /// Bulk haulers; need a developed port.
    Heavy = 2,
    /// Super-freighters; only the largest shipyards can service them.
    Super = 3,
}

/// Size class parameters.
#[derive(Debug, Clone)]
pub struct SizeClassSpec {
    pub name: &'static str,
    /// Fuel burned per unit distance per unit of cargo weight.
    pub fuel_efficiency: f64,
    /// Cruise speed in distance units per game hour.
    pub speed: f64,
    /// Minimum station tier at both ends of a route.
    pub min_station_tier: u8,
    /// Cargo capacity of a stock hull of this class.
    pub base_capacity: f64,
}

impl SizeClass {
    pub fn spec(&self) -> SizeClassSpec {
        match self {
            Self::Light => SizeClassSpec {
                name: "Light",
                fuel_efficiency: 0.5,
                speed: 4.0,
                min_station_tier: 1,
                base_capacity: 100.0,
            },
            Self::Medium => SizeClassSpec {
                name: "Medium",
                fuel_efficiency: 0.8,
                speed: 3.0,
                min_station_tier: 2,
                base_capacity: 500.0,
            },
            Self::Heavy => SizeClassSpec {
                name: "Heavy",
                fuel_efficiency: 1.2,
                speed: 2.0,
                min_station_tier: 3,
                base_capacity: 2_000.0,
            },
            Self::Super => SizeClassSpec {
                name: "Super",
                fuel_efficiency: 2.0,
                speed: 1.5,
                min_station_tier: 4,
                base_capacity: 10_000.0,
            },
        }
    }

    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(Self::Light),
            1 => Some(Self::Medium),
            2 => Some(Self::Heavy),
            3 => Some(Self::Super),
            _ => None,
        }
    }
}

// ============================================================================
// VEHICLE PROFILE
// ============================================================================

/// The physical characteristics of one vehicle that feed the formulas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleProfile {
    pub size_class: SizeClass,
    /// Maximum cargo weight aboard.
    pub capacity: f64,
    /// Engine upgrades; higher burns less fuel.
    pub efficiency_modifier: f64,
    /// Drive upgrades; higher flies faster.
    pub speed_modifier: f64,
}

impl VehicleProfile {
    /// Stock hull: base capacity, no upgrades.
    pub fn stock(size_class: SizeClass) -> Self {
        Self {
            size_class,
            capacity: size_class.spec().base_capacity,
            efficiency_modifier: 1.0,
            speed_modifier: 1.0,
        }
    }

    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_modifiers(mut self, efficiency: f64, speed: f64) -> Self {
        self.efficiency_modifier = efficiency;
        self.speed_modifier = speed;
        self
    }
}

// ============================================================================
// FORMULAS
// ============================================================================

/// Fuel for one leg: `distance × cargo_weight × fuel_efficiency / efficiency_modifier`.
///
/// An empty leg costs nothing regardless of distance.
pub fn fuel_cost(distance: f64, cargo_weight: f64, profile: &VehicleProfile) -> f64 {
    let efficiency = profile.size_class.spec().fuel_efficiency;
    distance * cargo_weight * efficiency / profile.efficiency_modifier.max(MIN_MODIFIER)
}

/// Hours for one leg: `distance / (speed × speed_modifier × global_multiplier)`.
pub fn travel_time_hours(
    distance: f64,
    profile: &VehicleProfile,
    global_speed_multiplier: f64,
) -> f64 {
    let speed = profile.size_class.spec().speed
        * profile.speed_modifier.max(MIN_MODIFIER)
        * global_speed_multiplier.max(MIN_MODIFIER);
    distance / speed
}

/// Straight-line distance between two location coordinates.
pub fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Convert game hours to tick-clock milliseconds, rounding up so a leg never
/// arrives early.
pub fn hours_to_ms(hours: f64, ms_per_game_hour: f64) -> u64 {
    let ms = (hours * ms_per_game_hour).ceil();
    if ms.is_finite() && ms > 0.0 {
        ms as u64
    } else {
        0
    }
}
