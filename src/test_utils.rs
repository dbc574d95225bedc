use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::simulation::config::CarsharingConfig;
use crate::simulation::controller::{CarsharingEnvironment, CarsharingEnvironmentBuilder};
use crate::simulation::id::Id;
use crate::simulation::messaging::events::{CarsharingEvent, EventsCollector};
use crate::simulation::network::{Link, Network, Node};
use crate::simulation::population::{InternalActivity, InternalLeg, InternalPerson, InternalPlan};
use crate::simulation::routing::network_router::NetworkRouter;

pub const TEST_FREESPEED: f64 = 10.;

/// A straight road along the x axis with nodes at `xs`. Between two neighbouring nodes there is a
/// forward link `{prefix}-f{i}` and a backward link `{prefix}-b{i}`. The prefix keeps ids of
/// different tests apart, as ids are interned process wide.
pub fn line_network(prefix: &str, xs: &[f64]) -> Network {
    let mut network = Network::new();
    let nodes: Vec<Id<Node>> = xs
        .iter()
        .enumerate()
        .map(|(i, x)| {
            let id = Id::create(&format!("{prefix}-n{i}"));
            network.add_node(Node::new(id.clone(), *x, 0.));
            id
        })
        .collect();

    for (i, pair) in nodes.windows(2).enumerate() {
        let length = (xs[i + 1] - xs[i]).abs();
        network.add_link(
            line_link(prefix, i),
            pair[0].clone(),
            pair[1].clone(),
            length,
            TEST_FREESPEED,
        );
        network.add_link(
            Id::create(&format!("{prefix}-b{i}")),
            pair[1].clone(),
            pair[0].clone(),
            length,
            TEST_FREESPEED,
        );
    }
    network
}

/// The forward link between node `i` and `i + 1` of a [`line_network`].
pub fn line_link(prefix: &str, i: usize) -> Id<Link> {
    Id::create(&format!("{prefix}-f{i}"))
}

pub fn carsharing_config(
    two_way_search_distance: f64,
    one_way_search_distance: f64,
) -> CarsharingConfig {
    CarsharingConfig {
        two_way_search_distance,
        one_way_search_distance,
        walk_beeline_factor: 1.3,
        walk_speed: 1.,
    }
}

/// Environment with empty station registries, the network router and an [`EventsCollector`].
pub fn environment(
    network: Network,
    two_way_search_distance: f64,
    one_way_search_distance: f64,
) -> CarsharingEnvironment {
    let network = Arc::new(network);
    let env = CarsharingEnvironmentBuilder::default()
        .network(network.clone())
        .router(Arc::new(NetworkRouter::new(network)))
        .config(carsharing_config(two_way_search_distance, one_way_search_distance))
        .build()
        .expect("Failed to build test environment");
    env.events().add_subscriber(Box::new(EventsCollector::new()));
    env
}

pub fn collected_events(env: &CarsharingEnvironment) -> Vec<(u32, CarsharingEvent)> {
    env.events()
        .get_subscriber::<EventsCollector>()
        .map(|c| c.events().to_vec())
        .unwrap_or_default()
}

/// Assembles a single plan. Activities are placed at the coordinate of their link.
pub struct PlanBuilder<'n> {
    network: &'n Network,
    plan: InternalPlan,
}

impl<'n> PlanBuilder<'n> {
    pub fn new(network: &'n Network) -> Self {
        PlanBuilder {
            network,
            plan: InternalPlan::default(),
        }
    }

    pub fn act(mut self, act_type: &str, link: &Id<Link>, end_time: Option<u32>) -> Self {
        let coord = self
            .network
            .link_coord(link)
            .expect("Activity link is not part of the network");
        self.plan.add_act(InternalActivity::new(
            coord.x(),
            coord.y(),
            act_type,
            link.clone(),
            None,
            end_time,
            None,
        ));
        self
    }

    pub fn leg(mut self, mode: &str, from: &Id<Link>, to: &Id<Link>) -> Self {
        self.plan.add_leg(InternalLeg::unrouted(mode, from.clone(), to.clone()));
        self
    }

    pub fn build(self, id: &str) -> InternalPerson {
        InternalPerson::new(Id::create(id), self.plan)
    }
}

/// home - walk - drive - work - drive - walk - home
pub fn two_way_round_trip(
    network: &Network,
    id: &str,
    home: &Id<Link>,
    work: &Id<Link>,
    departure: u32,
    work_end: u32,
) -> InternalPerson {
    PlanBuilder::new(network)
        .act("home", home, Some(departure))
        .leg("walk_rb", home, work)
        .leg("twowaycarsharing", home, work)
        .act("work", work, Some(work_end))
        .leg("twowaycarsharing", work, home)
        .leg("walk_rb", work, home)
        .act("home", home, None)
        .build(id)
}

/// home - walk - drive - walk - work
pub fn one_way_trip(
    network: &Network,
    id: &str,
    home: &Id<Link>,
    work: &Id<Link>,
    departure: u32,
) -> InternalPerson {
    PlanBuilder::new(network)
        .act("home", home, Some(departure))
        .leg("walk_ow_sb", home, work)
        .leg("onewaycarsharing", home, work)
        .leg("walk_ow_sb", home, work)
        .act("work", work, None)
        .build(id)
}

/// home - walk - drive - work
pub fn free_floating_trip(
    network: &Network,
    id: &str,
    home: &Id<Link>,
    work: &Id<Link>,
    departure: u32,
) -> InternalPerson {
    PlanBuilder::new(network)
        .act("home", home, Some(departure))
        .leg("walk_ff", home, work)
        .leg("freefloating", home, work)
        .act("work", work, None)
        .build(id)
}

pub fn create_folders(path: PathBuf) -> PathBuf {
    fs::create_dir_all(&path)
        .unwrap_or_else(|_e| panic!("Failed to create folders for path {path:?}"));
    path
}
