use geo::{Distance, Euclidean, Point};
use nohash_hasher::{IntMap, IntSet};
use parking_lot::RwLock;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tracing::{debug, trace};

use crate::simulation::carsharing::station::Station;
use crate::simulation::carsharing::Scheme;
use crate::simulation::error::{CarsharingError, CarsharingResult};
use crate::simulation::id::Id;
use crate::simulation::network::Link;
use crate::simulation::vehicles::InternalVehicle;

/// Entry of the spatial index. Only position and key are stored, the station itself lives in the
/// map next to the index.
#[derive(Debug, Clone, PartialEq)]
struct IndexEntry {
    point: [f64; 2],
    link: Id<Link>,
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for IndexEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Result of a station search.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRef {
    pub link: Id<Link>,
    pub coord: Point,
    pub distance: f64,
}

#[derive(Debug, Default)]
struct Inventory {
    stations: IntMap<Id<Link>, Station>,
    index: RTree<IndexEntry>,
    // every vehicle currently parked at one of the stations
    parked: IntSet<Id<InternalVehicle>>,
}

impl Inventory {
    fn insert(&mut self, station: Station) {
        let coord = station.coord();
        self.index.insert(IndexEntry {
            point: [coord.x(), coord.y()],
            link: station.link().clone(),
        });
        self.parked.extend(station.vehicles().iter().cloned());
        self.stations.insert(station.link().clone(), station);
    }
}

/// All stations of one carsharing scheme. The map of stations and its spatial index are guarded
/// by one lock, so that they are always consistent. Searches take the read lock, every mutation
/// the write lock. A mutation following a search re-validates what the search found and fails
/// with [`CarsharingError::ResourceUnavailable`] if another agent was faster.
#[derive(Debug)]
pub struct StationRegistry {
    scheme: Scheme,
    inventory: RwLock<Inventory>,
}

impl StationRegistry {
    pub fn new(scheme: Scheme) -> Self {
        StationRegistry {
            scheme,
            inventory: RwLock::new(Inventory::default()),
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn add_station(&self, station: Station) -> CarsharingResult<()> {
        let has_parking = station.parking().is_some();
        if has_parking != (self.scheme == Scheme::OneWay) {
            return Err(CarsharingError::Config(format!(
                "Station at link {} does not fit the {:?} scheme. Only one-way stations have parking capacity.",
                station.link(),
                self.scheme
            )));
        }

        let mut inventory = self.inventory.write();
        if inventory.stations.contains_key(station.link()) {
            return Err(CarsharingError::DuplicateStation {
                scheme: self.scheme,
                link: station.link().clone(),
            });
        }
        let mut seen = IntSet::default();
        for vehicle in station.vehicles() {
            if inventory.parked.contains(vehicle) || !seen.insert(vehicle.clone()) {
                return Err(CarsharingError::DuplicateVehicle(vehicle.clone()));
            }
        }

        debug!(
            "Adding {} station at link {} with {} vehicles",
            self.scheme,
            station.link(),
            station.vehicles().len()
        );
        inventory.insert(station);
        Ok(())
    }

    /// Nearest station strictly closer than `radius` to `point` which satisfies `predicate`. Of
    /// several stations with the same distance the first one found is returned.
    pub fn find_nearest<P>(&self, point: Point, radius: f64, predicate: P) -> Option<StationRef>
    where
        P: Fn(&Station) -> bool,
    {
        let inventory = self.inventory.read();
        let query = [point.x(), point.y()];
        let mut best: Option<StationRef> = None;

        for entry in inventory.index.locate_within_distance(query, radius * radius) {
            let station = &inventory.stations[&entry.link];
            let distance = Euclidean::distance(point, station.coord());
            if distance >= radius || !predicate(station) {
                continue;
            }
            if best.as_ref().map_or(true, |b| distance < b.distance) {
                best = Some(StationRef {
                    link: entry.link.clone(),
                    coord: station.coord(),
                    distance,
                });
            }
        }
        trace!(
            "{} search at ({}, {}) with radius {radius}: {:?}",
            self.scheme,
            point.x(),
            point.y(),
            best
        );
        best
    }

    /// Nearest station satisfying `predicate`, regardless of how far away it is.
    pub fn find_nearest_unbounded<P>(&self, point: Point, predicate: P) -> Option<StationRef>
    where
        P: Fn(&Station) -> bool,
    {
        let inventory = self.inventory.read();
        let found = inventory
            .index
            .nearest_neighbor_iter(&[point.x(), point.y()])
            .map(|entry| &inventory.stations[&entry.link])
            .find(|station| predicate(station))
            .map(|station| StationRef {
                link: station.link().clone(),
                coord: station.coord(),
                distance: Euclidean::distance(point, station.coord()),
            });
        found
    }

    pub fn find_nearest_vehicle(&self, point: Point, radius: f64) -> Option<StationRef> {
        self.find_nearest(point, radius, Station::has_vehicle)
    }

    pub fn find_nearest_parking(&self, point: Point, radius: f64) -> Option<StationRef> {
        self.find_nearest(point, radius, Station::has_free_parking_space)
    }

    pub fn take_vehicle(
        &self,
        link: &Id<Link>,
        vehicle: &Id<InternalVehicle>,
    ) -> CarsharingResult<()> {
        let mut inventory = self.inventory.write();
        let station = self.station_mut(&mut inventory, link)?;
        if !station.remove_vehicle(vehicle) {
            return Err(self.unavailable(link, "vehicle is gone"));
        }
        inventory.parked.remove(vehicle);
        Ok(())
    }

    /// Takes the first vehicle parked at the station.
    pub fn take_any_vehicle(&self, link: &Id<Link>) -> CarsharingResult<Id<InternalVehicle>> {
        let mut inventory = self.inventory.write();
        let station = self.station_mut(&mut inventory, link)?;
        let vehicle = station
            .remove_first_vehicle()
            .ok_or_else(|| self.unavailable(link, "no vehicle left"))?;
        inventory.parked.remove(&vehicle);
        trace!("Took {} vehicle {vehicle} at {link}", self.scheme);
        Ok(vehicle)
    }

    /// Parks a vehicle at the station of `link`. Two-way and free-floating vehicles may be parked
    /// anywhere, so a station is created at `coord` if there is none at the link yet. One-way
    /// vehicles need an existing station. Parking spaces are not touched; one-way drivers reserve
    /// their space before they depart.
    pub fn return_vehicle(
        &self,
        link: &Id<Link>,
        coord: Point,
        vehicle: Id<InternalVehicle>,
    ) -> CarsharingResult<()> {
        let mut inventory = self.inventory.write();
        if inventory.parked.contains(&vehicle) {
            return Err(CarsharingError::DuplicateVehicle(vehicle));
        }

        if let Some(station) = inventory.stations.get_mut(link) {
            station.add_vehicle(vehicle.clone());
        } else if self.scheme == Scheme::OneWay {
            return Err(CarsharingError::UnknownStation {
                scheme: self.scheme,
                link: link.clone(),
            });
        } else {
            debug!("Creating {} station at link {link}", self.scheme);
            inventory.insert(Station::new(link.clone(), coord, vec![vehicle.clone()]));
        }
        inventory.parked.insert(vehicle);
        Ok(())
    }

    pub fn reserve_parking_space(&self, link: &Id<Link>) -> CarsharingResult<()> {
        let mut inventory = self.inventory.write();
        let station = self.station_mut(&mut inventory, link)?;
        let reserved = station.parking_mut().map_or(false, |p| p.reserve());
        if reserved {
            Ok(())
        } else {
            Err(self.unavailable(link, "no free parking space"))
        }
    }

    pub fn free_parking_space(&self, link: &Id<Link>) -> CarsharingResult<()> {
        let mut inventory = self.inventory.write();
        let station = self.station_mut(&mut inventory, link)?;
        let freed = station.parking_mut().map_or(false, |p| p.free());
        if freed {
            Ok(())
        } else {
            Err(CarsharingError::NoOccupiedParkingSpace(link.clone()))
        }
    }

    /// Snapshot of a station.
    pub fn station(&self, link: &Id<Link>) -> Option<Station> {
        self.inventory.read().stations.get(link).cloned()
    }

    pub fn available_vehicles(&self, link: &Id<Link>) -> usize {
        self.inventory
            .read()
            .stations
            .get(link)
            .map_or(0, |s| s.vehicles().len())
    }

    pub fn occupied_parking_spaces(&self, link: &Id<Link>) -> Option<usize> {
        self.inventory
            .read()
            .stations
            .get(link)
            .and_then(|s| s.parking().map(|p| p.occupied()))
    }

    pub fn total_vehicles(&self) -> usize {
        self.inventory.read().parked.len()
    }

    pub fn len(&self) -> usize {
        self.inventory.read().stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn station_mut<'a>(
        &self,
        inventory: &'a mut Inventory,
        link: &Id<Link>,
    ) -> CarsharingResult<&'a mut Station> {
        inventory
            .stations
            .get_mut(link)
            .ok_or_else(|| CarsharingError::UnknownStation {
                scheme: self.scheme,
                link: link.clone(),
            })
    }

    fn unavailable(&self, link: &Id<Link>, reason: &'static str) -> CarsharingError {
        CarsharingError::ResourceUnavailable {
            scheme: self.scheme,
            station: link.clone(),
            reason,
        }
    }
}
