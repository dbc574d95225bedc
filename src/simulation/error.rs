use thiserror::Error;

use crate::simulation::carsharing::Scheme;
use crate::simulation::id::Id;
use crate::simulation::network::Link;
use crate::simulation::population::InternalPerson;
use crate::simulation::vehicles::InternalVehicle;

#[derive(Debug, Error)]
pub enum CarsharingError {
    /// No vehicle or parking space within reach, or another agent took it between search and
    /// reservation. Recovered by aborting the requesting agent.
    #[error("{scheme:?} resource unavailable at station {station}: {reason}")]
    ResourceUnavailable {
        scheme: Scheme,
        station: Id<Link>,
        reason: &'static str,
    },

    #[error("invalid plan state for agent {agent}: {message}")]
    InvalidPlanState {
        agent: Id<InternalPerson>,
        message: String,
    },

    #[error("agent {agent} has no {scheme:?} reservation")]
    StaleReservation {
        agent: Id<InternalPerson>,
        scheme: Scheme,
    },

    #[error("no {scheme:?} station at link {link}")]
    UnknownStation { scheme: Scheme, link: Id<Link> },

    #[error("{scheme:?} station at link {link} exists already")]
    DuplicateStation { scheme: Scheme, link: Id<Link> },

    #[error("no occupied parking space to free at station {0}")]
    NoOccupiedParkingSpace(Id<Link>),

    #[error("link {0} is not part of the network")]
    UnknownLink(Id<Link>),

    #[error("no route from link {from} to link {to}")]
    NoRoute { from: Id<Link>, to: Id<Link> },

    #[error("vehicle {0} is already part of a station inventory")]
    DuplicateVehicle(Id<InternalVehicle>),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type CarsharingResult<T> = Result<T, CarsharingError>;

impl CarsharingError {
    pub fn invalid_plan_state(agent: &Id<InternalPerson>, message: impl Into<String>) -> Self {
        CarsharingError::InvalidPlanState {
            agent: agent.clone(),
            message: message.into(),
        }
    }
}
