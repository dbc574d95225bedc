use std::cmp::Ordering;
use std::sync::Arc;

use keyed_priority_queue::{Entry, KeyedPriorityQueue};
use nohash_hasher::{IntMap, IntSet};
use tracing::trace;

use crate::simulation::error::{CarsharingError, CarsharingResult};
use crate::simulation::id::Id;
use crate::simulation::network::{Link, Network, Node};
use crate::simulation::population::{
    InternalGenericRoute, InternalLeg, InternalNetworkRoute, InternalPerson, InternalRoute,
};
use crate::simulation::routing::Router;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Distance(pub u32);

impl Ord for Distance {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0).reverse()
    }
}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Distance {
    pub fn get(&self) -> u32 {
        self.0
    }
}

/// Routes on free speed travel times. Travel times don't change during a run, so routes do not
/// depend on the departure time.
#[derive(Debug)]
pub struct NetworkRouter {
    network: Arc<Network>,
}

impl NetworkRouter {
    pub fn new(network: Arc<Network>) -> Self {
        NetworkRouter { network }
    }

    /// Fastest path between the end of `from` and the start of `to`. Returns the links in between
    /// and the time needed for them.
    fn shortest_path(
        &self,
        from: &Id<Link>,
        to: &Id<Link>,
    ) -> CarsharingResult<(Vec<Id<Link>>, u32)> {
        let start = self.network.link(from)?.to.clone();
        let target = self.network.link(to)?.from.clone();

        let mut queue: KeyedPriorityQueue<Id<Node>, Distance> = KeyedPriorityQueue::new();
        let mut settled: IntSet<Id<Node>> = IntSet::default();
        let mut predecessors: IntMap<Id<Node>, Id<Link>> = IntMap::default();
        queue.push(start.clone(), Distance(0));

        while let Some((node, distance)) = queue.pop() {
            settled.insert(node.clone());
            if node == target {
                let path = self.collect_path(&start, &target, &predecessors)?;
                return Ok((path, distance.get()));
            }

            for link_id in &self.network.get_node(&node).out_links {
                let link = self.network.link(link_id)?;
                if settled.contains(&link.to) {
                    continue;
                }
                let candidate = distance.get() + link.free_speed_travel_time();
                match queue.entry(link.to.clone()) {
                    Entry::Occupied(e) => {
                        if e.get_priority().get() > candidate {
                            e.set_priority(Distance(candidate));
                            predecessors.insert(link.to.clone(), link_id.clone());
                        }
                    }
                    Entry::Vacant(e) => {
                        e.set_priority(Distance(candidate));
                        predecessors.insert(link.to.clone(), link_id.clone());
                    }
                }
            }
        }

        Err(CarsharingError::NoRoute {
            from: from.clone(),
            to: to.clone(),
        })
    }

    fn collect_path(
        &self,
        start: &Id<Node>,
        target: &Id<Node>,
        predecessors: &IntMap<Id<Node>, Id<Link>>,
    ) -> CarsharingResult<Vec<Id<Link>>> {
        let mut path = Vec::new();
        let mut curr = target.clone();
        while &curr != start {
            let link_id = &predecessors[&curr];
            path.push(link_id.clone());
            curr = self.network.link(link_id)?.from.clone();
        }
        path.reverse();
        Ok(path)
    }
}

impl Router for NetworkRouter {
    fn compute_route(
        &self,
        mode: &str,
        from: &Id<Link>,
        to: &Id<Link>,
        departure_time: u32,
        person: &Id<InternalPerson>,
    ) -> CarsharingResult<Vec<InternalLeg>> {
        let (links, trav_time) = if from == to {
            (vec![from.clone()], 0)
        } else {
            let (path, time) = self.shortest_path(from, to)?;
            let end_time = self.network.link(to)?.free_speed_travel_time();

            let mut links = Vec::with_capacity(path.len() + 2);
            links.push(from.clone());
            links.extend(path);
            links.push(to.clone());
            (links, time + end_time)
        };

        let distance = links
            .iter()
            .skip(1)
            .map(|id| self.network.link(id).map(|l| l.length))
            .sum::<CarsharingResult<f64>>()?;

        trace!(
            "{mode} route for {person} at {departure_time} from {from} to {to}: {} links, {trav_time}s",
            links.len()
        );

        let generic = InternalGenericRoute::new(
            from.clone(),
            to.clone(),
            Some(trav_time),
            Some(distance),
            None,
        );
        let route = InternalRoute::Network(InternalNetworkRoute::new(generic, links));
        Ok(vec![InternalLeg::new(
            route,
            mode,
            trav_time,
            Some(departure_time),
        )])
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_approx_eq::assert_approx_eq;

    use crate::simulation::error::CarsharingError;
    use crate::simulation::id::Id;
    use crate::simulation::network::{Link, Network, Node};
    use crate::simulation::routing::network_router::NetworkRouter;
    use crate::simulation::routing::Router;

    /// n1 -> n2 -> n3 with a slow shortcut n1 -> n3 and a way back n3 -> n1.
    fn network() -> Arc<Network> {
        let mut network = Network::new();
        network.add_node(Node::new(Id::create("router-n1"), 0., 0.));
        network.add_node(Node::new(Id::create("router-n2"), 100., 0.));
        network.add_node(Node::new(Id::create("router-n3"), 200., 0.));
        network.add_node(Node::new(Id::create("router-n4"), 300., 0.));
        let links = [
            ("router-l12", "router-n1", "router-n2", 100., 10.),
            ("router-l23", "router-n2", "router-n3", 100., 10.),
            ("router-l13", "router-n1", "router-n3", 200., 1.),
            ("router-l34", "router-n3", "router-n4", 100., 10.),
            ("router-l31", "router-n3", "router-n1", 200., 10.),
        ];
        for (id, from, to, length, speed) in links {
            network.add_link(Id::create(id), Id::create(from), Id::create(to), length, speed);
        }
        Arc::new(network)
    }

    #[test]
    fn fastest_path() {
        let router = NetworkRouter::new(network());
        let legs = router
            .compute_route(
                "car",
                &Id::create("router-l31"),
                &Id::create("router-l34"),
                0,
                &Id::create("router-p"),
            )
            .unwrap();
        assert_eq!(1, legs.len());

        let route = legs[0].route.as_ref().unwrap().as_network().unwrap();
        let expected: Vec<Id<Link>> = vec![
            Id::create("router-l31"),
            Id::create("router-l12"),
            Id::create("router-l23"),
            Id::create("router-l34"),
        ];
        assert_eq!(&expected, route.route());
        assert_eq!(Some(30), legs[0].trav_time);
        assert_approx_eq!(300., route.generic_delegate().distance().unwrap());
    }

    #[test]
    fn same_link() {
        let router = NetworkRouter::new(network());
        let legs = router
            .compute_route(
                "car",
                &Id::create("router-l12"),
                &Id::create("router-l12"),
                0,
                &Id::create("router-p"),
            )
            .unwrap();
        assert_eq!(Some(0), legs[0].trav_time);
        assert_eq!(
            &vec![Id::<Link>::create("router-l12")],
            legs[0].route.as_ref().unwrap().as_network().unwrap().route()
        );
    }

    #[test]
    fn unreachable() {
        let router = NetworkRouter::new(network());
        let result = router.compute_route(
            "car",
            &Id::create("router-l34"),
            &Id::create("router-l12"),
            0,
            &Id::create("router-p"),
        );
        assert!(matches!(result, Err(CarsharingError::NoRoute { .. })));
    }
}
