use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::simulation::id::Id;
use crate::simulation::vehicles::InternalVehicle;

pub mod registry;
pub mod station;
pub mod vehicles;

pub use registry::{StationRef, StationRegistry};
pub use station::{ParkingSpaces, Station};
pub use vehicles::CarsharingVehicles;

/// The three carsharing schemes an agent can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    /// Round trip. The vehicle goes back to the station it was taken from.
    TwoWay,
    /// The vehicle is dropped at any station with a free parking space.
    OneWay,
    /// The vehicle is parked wherever the rental ends.
    FreeFloating,
}

impl Scheme {
    pub const ALL: [Scheme; 3] = [Scheme::TwoWay, Scheme::OneWay, Scheme::FreeFloating];

    /// Prefix of vehicle ids on the network.
    pub fn vehicle_prefix(&self) -> &'static str {
        match self {
            Scheme::TwoWay => "TW_",
            Scheme::OneWay => "OW_",
            Scheme::FreeFloating => "FF_",
        }
    }

    /// Short tag used in failure events.
    pub fn tag(&self) -> &'static str {
        match self {
            Scheme::TwoWay => "rt",
            Scheme::OneWay => "ow",
            Scheme::FreeFloating => "ff",
        }
    }

    pub fn walk_mode(&self) -> &'static str {
        match self {
            Scheme::TwoWay => "walk_rb",
            Scheme::OneWay => "walk_ow_sb",
            Scheme::FreeFloating => "walk_ff",
        }
    }

    pub fn drive_mode(&self) -> &'static str {
        match self {
            Scheme::TwoWay => "twowaycarsharing",
            Scheme::OneWay => "onewaycarsharing",
            Scheme::FreeFloating => "freefloating",
        }
    }

    pub fn sim_vehicle_id(&self, vehicle: &Id<InternalVehicle>) -> Id<InternalVehicle> {
        Id::create(&format!("{}{}", self.vehicle_prefix(), vehicle.external()))
    }
}

impl Display for Scheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Closed set of leg kinds the carsharing agent knows how to initialize. Every carsharing mode
/// string maps to exactly one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CarsharingLegKind {
    /// Walking to or from a shared vehicle.
    Walk(Scheme),
    /// Driving a shared vehicle.
    Drive(Scheme),
}

impl CarsharingLegKind {
    pub fn from_mode(mode: &str) -> Option<Self> {
        Scheme::ALL.into_iter().find_map(|scheme| {
            if mode == scheme.walk_mode() {
                Some(CarsharingLegKind::Walk(scheme))
            } else if mode == scheme.drive_mode() {
                Some(CarsharingLegKind::Drive(scheme))
            } else {
                None
            }
        })
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            CarsharingLegKind::Walk(s) | CarsharingLegKind::Drive(s) => *s,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            CarsharingLegKind::Walk(s) => s.walk_mode(),
            CarsharingLegKind::Drive(s) => s.drive_mode(),
        }
    }
}
