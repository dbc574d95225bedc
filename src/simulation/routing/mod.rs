use std::fmt::Debug;

use crate::simulation::error::CarsharingResult;
use crate::simulation::id::Id;
use crate::simulation::network::Link;
use crate::simulation::population::{InternalLeg, InternalPerson};

pub mod network_router;
pub mod teleported_router;

/// Routing service used by carsharing agents to build vehicle legs. The result is a sequence of
/// sub legs. Only those with a network route contribute links to the vehicle leg, but the travel
/// times of all of them are summed up.
pub trait Router: Send + Sync {
    fn compute_route(
        &self,
        mode: &str,
        from: &Id<Link>,
        to: &Id<Link>,
        departure_time: u32,
        person: &Id<InternalPerson>,
    ) -> CarsharingResult<Vec<InternalLeg>>;
}

impl Debug for dyn Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Router")
    }
}
