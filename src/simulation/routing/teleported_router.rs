use geo::{Distance, Euclidean, Point};

use crate::simulation::error::CarsharingResult;
use crate::simulation::id::Id;
use crate::simulation::network::{Link, Network};
use crate::simulation::population::{InternalGenericRoute, InternalLeg, InternalRoute};

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Teleportation {
    pub distance: f64,
    pub duration: u32,
}

/// Estimates walks from the straight line distance between two links, stretched by a beeline
/// factor to approximate the network distance.
#[derive(Debug, Clone, Copy)]
pub struct BeeLineDistanceRouter {
    beeline_factor: f64,
    speed: f64,
}

impl BeeLineDistanceRouter {
    pub fn new(beeline_factor: f64, speed: f64) -> Self {
        Self {
            beeline_factor,
            speed,
        }
    }

    fn query_points(&self, p1: Point, p2: Point) -> Teleportation {
        let distance = Euclidean::distance(p1, p2) * self.beeline_factor;
        let duration = (distance / self.speed) as u32;
        Teleportation { distance, duration }
    }

    pub fn query_links(
        &self,
        network: &Network,
        from: &Id<Link>,
        to: &Id<Link>,
    ) -> CarsharingResult<Teleportation> {
        let from_point = network.link_coord(from)?;
        let to_point = network.link_coord(to)?;
        Ok(self.query_points(from_point, to_point))
    }

    /// A teleported leg between two links, departing at `now`.
    pub fn walk_leg(
        &self,
        network: &Network,
        mode: &str,
        from: &Id<Link>,
        to: &Id<Link>,
        now: u32,
    ) -> CarsharingResult<InternalLeg> {
        let teleportation = self.query_links(network, from, to)?;
        let route = InternalRoute::Generic(InternalGenericRoute::new(
            from.clone(),
            to.clone(),
            Some(teleportation.duration),
            Some(teleportation.distance),
            None,
        ));
        Ok(InternalLeg::new(
            route,
            mode,
            teleportation.duration,
            Some(now),
        ))
    }
}
