use geo::{Distance, Euclidean, Point};
use nohash_hasher::IntMap;

use crate::simulation::error::{CarsharingError, CarsharingResult};
use crate::simulation::id::Id;

/// Road network as seen by the carsharing core. Only what is needed for search points, beeline
/// distances and the reference router is kept here.
#[derive(Debug, Default)]
pub struct Network {
    nodes: IntMap<Id<Node>, Node>,
    links: IntMap<Id<Link>, Link>,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: Id<Node>,
    pub x: f64,
    pub y: f64,
    pub in_links: Vec<Id<Link>>,
    pub out_links: Vec<Id<Link>>,
}

#[derive(Debug, Clone)]
pub struct Link {
    pub id: Id<Link>,
    pub from: Id<Node>,
    pub to: Id<Node>,
    pub length: f64,
    pub freespeed: f64,
    coord: Point,
}

impl Node {
    pub fn new(id: Id<Node>, x: f64, y: f64) -> Self {
        Node {
            id,
            x,
            y,
            in_links: Vec::new(),
            out_links: Vec::new(),
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl Link {
    /// The coordinate of a link is the middle between its from and to node.
    pub fn coord(&self) -> Point {
        self.coord
    }

    /// Free speed travel time in whole seconds.
    pub fn free_speed_travel_time(&self) -> u32 {
        (self.length / self.freespeed) as u32
    }
}

impl Network {
    pub fn new() -> Self {
        Network::default()
    }

    pub fn add_node(&mut self, node: Node) {
        assert!(
            !self.nodes.contains_key(&node.id),
            "Node with id {} already exists.",
            node.id
        );
        self.nodes.insert(node.id.clone(), node);
    }

    /// Adds a link between two existing nodes. The link's coordinate is derived from its nodes.
    pub fn add_link(
        &mut self,
        id: Id<Link>,
        from: Id<Node>,
        to: Id<Node>,
        length: f64,
        freespeed: f64,
    ) {
        assert!(
            !self.links.contains_key(&id),
            "Link with id {id} already exists."
        );
        assert!(
            freespeed > 0.,
            "Link {id} must have a positive freespeed, but was {freespeed}"
        );

        let from_point = self.get_node(&from).point();
        let to_point = self.get_node(&to).point();
        let coord = Point::new(
            (from_point.x() + to_point.x()) / 2.,
            (from_point.y() + to_point.y()) / 2.,
        );

        // wire up in and out links
        self.nodes
            .get_mut(&from)
            .unwrap()
            .out_links
            .push(id.clone());
        self.nodes.get_mut(&to).unwrap().in_links.push(id.clone());

        self.links.insert(
            id.clone(),
            Link {
                id,
                from,
                to,
                length,
                freespeed,
                coord,
            },
        );
    }

    pub fn get_node(&self, id: &Id<Node>) -> &Node {
        self.nodes
            .get(id)
            .unwrap_or_else(|| panic!("Node {id} is not part of the network."))
    }

    pub fn link(&self, id: &Id<Link>) -> CarsharingResult<&Link> {
        self.links
            .get(id)
            .ok_or_else(|| CarsharingError::UnknownLink(id.clone()))
    }

    pub fn link_coord(&self, id: &Id<Link>) -> CarsharingResult<Point> {
        self.link(id).map(Link::coord)
    }

    /// Straight line distance between the coordinates of two links.
    pub fn beeline_distance(&self, from: &Id<Link>, to: &Id<Link>) -> CarsharingResult<f64> {
        let from = self.link_coord(from)?;
        let to = self.link_coord(to)?;
        Ok(Euclidean::distance(from, to))
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }
}

#[cfg(test)]
mod tests {
    use crate::simulation::error::CarsharingError;
    use crate::simulation::id::Id;
    use crate::simulation::network::{Link, Network, Node};
    use assert_approx_eq::assert_approx_eq;

    fn two_links() -> Network {
        let mut network = Network::new();
        network.add_node(Node::new(Id::create("net-n1"), 0., 0.));
        network.add_node(Node::new(Id::create("net-n2"), 100., 0.));
        network.add_node(Node::new(Id::create("net-n3"), 100., 200.));
        network.add_link(
            Id::create("net-l1"),
            Id::create("net-n1"),
            Id::create("net-n2"),
            100.,
            10.,
        );
        network.add_link(
            Id::create("net-l2"),
            Id::create("net-n2"),
            Id::create("net-n3"),
            200.,
            10.,
        );
        network
    }

    #[test]
    fn link_coord_is_midpoint() {
        let network = two_links();
        let coord = network.link_coord(&Id::create("net-l1")).unwrap();
        assert_eq!(50., coord.x());
        assert_eq!(0., coord.y());

        let coord = network.link_coord(&Id::create("net-l2")).unwrap();
        assert_eq!(100., coord.x());
        assert_eq!(100., coord.y());
    }

    #[test]
    fn beeline_between_links() {
        let network = two_links();
        let distance = network
            .beeline_distance(&Id::create("net-l1"), &Id::create("net-l2"))
            .unwrap();
        assert_approx_eq!(distance, (50f64 * 50. + 100. * 100.).sqrt());
    }

    #[test]
    fn in_and_out_links() {
        let network = two_links();
        let n2 = network.get_node(&Id::create("net-n2"));
        assert_eq!(vec![Id::<Link>::create("net-l1")], n2.in_links);
        assert_eq!(vec![Id::<Link>::create("net-l2")], n2.out_links);
    }

    #[test]
    fn unknown_link() {
        let network = two_links();
        let result = network.link(&Id::create("net-unknown"));
        assert!(matches!(result, Err(CarsharingError::UnknownLink(_))));
    }

    #[test]
    #[should_panic]
    fn reject_duplicate_link() {
        let mut network = two_links();
        network.add_link(
            Id::create("net-l1"),
            Id::create("net-n1"),
            Id::create("net-n2"),
            100.,
            10.,
        );
    }
}
