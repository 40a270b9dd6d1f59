//! Vehicle components.
//!
//! A vehicle entity carries a [`Ship`] (what it is) and the logic crate's
//! [`VehicleState`] (where it is and what it carries).

use serde::{Deserialize, Serialize};
use starfreight_logic::galaxy::{Vehicle, VehicleKind, VehicleState};
use starfreight_logic::ids::VehicleId;
use starfreight_logic::physics::{SizeClass, VehicleProfile};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ship {
    pub id: VehicleId,
    pub name: String,
    pub kind: VehicleKind,
    pub profile: VehicleProfile,
}

impl Ship {
    /// A stock freighter of the given hull size.
    pub fn freighter(id: VehicleId, name: impl Into<String>, size: SizeClass) -> Self {
        Self {
            id,
            name: name.into(),
            kind: VehicleKind::Freighter,
            profile: VehicleProfile::stock(size),
        }
    }

    pub fn with_kind(mut self, kind: VehicleKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_profile(mut self, profile: VehicleProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Combine with its state into the view the mission engine works on.
    pub fn view(&self, state: &VehicleState) -> Vehicle {
        Vehicle {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            profile: self.profile,
            state: state.clone(),
        }
    }
}
