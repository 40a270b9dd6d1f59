//! Strongly-typed identifiers and the mission id generator.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty), $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Unique mission identifier, issued by an [`IdGenerator`].
    MissionId(u64),
    "M-"
);
id_type!(
    /// Vehicle identifier owned by the vehicle registry.
    VehicleId(u32),
    "V-"
);
id_type!(
    /// Location (station / system) identifier.
    LocationId(u32),
    "L-"
);
id_type!(
    /// Celestial body identifier, used as a facility site.
    BodyId(u32),
    "B-"
);
id_type!(
    /// Facility identifier issued by the facility registry.
    FacilityId(u32),
    "F-"
);

/// Produces unique mission ids.
pub trait IdGenerator: fmt::Debug {
    fn next_mission_id(&mut self) -> MissionId;
}

/// Monotonic id generator starting at 1.
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    last: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue numbering after `last` (e.g. when resuming a session).
    pub fn starting_after(last: u64) -> Self {
        Self { last }
    }
}

impl IdGenerator for SequentialIds {
    fn next_mission_id(&mut self) -> MissionId {
        self.last += 1;
        MissionId(self.last)
    }
}
