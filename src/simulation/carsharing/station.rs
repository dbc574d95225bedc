use geo::Point;

use crate::simulation::id::Id;
use crate::simulation::network::Link;
use crate::simulation::vehicles::InternalVehicle;

/// Parking capacity of a one-way station. `occupied` counts parked vehicles plus spaces reserved
/// by agents which are on their way to the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParkingSpaces {
    capacity: usize,
    occupied: usize,
}

impl ParkingSpaces {
    pub fn new(capacity: usize, occupied: usize) -> Self {
        assert!(
            occupied <= capacity,
            "Cannot occupy {occupied} of {capacity} parking spaces"
        );
        ParkingSpaces { capacity, occupied }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn occupied(&self) -> usize {
        self.occupied
    }

    pub fn has_free_space(&self) -> bool {
        self.occupied < self.capacity
    }

    pub(crate) fn reserve(&mut self) -> bool {
        if self.has_free_space() {
            self.occupied += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn free(&mut self) -> bool {
        if self.occupied > 0 {
            self.occupied -= 1;
            true
        } else {
            false
        }
    }
}

/// A location holding rentable vehicles. Stations are keyed by the link they are attached to.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    link: Id<Link>,
    coord: Point,
    vehicles: Vec<Id<InternalVehicle>>,
    parking: Option<ParkingSpaces>,
}

impl Station {
    pub fn new(link: Id<Link>, coord: Point, vehicles: Vec<Id<InternalVehicle>>) -> Self {
        Station {
            link,
            coord,
            vehicles,
            parking: None,
        }
    }

    /// A one-way station. Parked vehicles occupy a parking space each.
    pub fn with_parking(
        link: Id<Link>,
        coord: Point,
        vehicles: Vec<Id<InternalVehicle>>,
        capacity: usize,
    ) -> Self {
        let parking = ParkingSpaces::new(capacity, vehicles.len());
        Station {
            link,
            coord,
            vehicles,
            parking: Some(parking),
        }
    }

    pub fn link(&self) -> &Id<Link> {
        &self.link
    }

    pub fn coord(&self) -> Point {
        self.coord
    }

    pub fn vehicles(&self) -> &[Id<InternalVehicle>] {
        &self.vehicles
    }

    pub fn parking(&self) -> Option<&ParkingSpaces> {
        self.parking.as_ref()
    }

    pub fn has_vehicle(&self) -> bool {
        !self.vehicles.is_empty()
    }

    /// Stations without parking restriction always accept vehicles.
    pub fn has_free_parking_space(&self) -> bool {
        self.parking.as_ref().map_or(true, ParkingSpaces::has_free_space)
    }

    pub(crate) fn parking_mut(&mut self) -> Option<&mut ParkingSpaces> {
        self.parking.as_mut()
    }

    pub(crate) fn remove_vehicle(&mut self, vehicle: &Id<InternalVehicle>) -> bool {
        if let Some(pos) = self.vehicles.iter().position(|v| v == vehicle) {
            self.vehicles.remove(pos);
            true
        } else {
            false
        }
    }

    pub(crate) fn remove_first_vehicle(&mut self) -> Option<Id<InternalVehicle>> {
        if self.vehicles.is_empty() {
            None
        } else {
            Some(self.vehicles.remove(0))
        }
    }

    pub(crate) fn add_vehicle(&mut self, vehicle: Id<InternalVehicle>) {
        self.vehicles.push(vehicle);
    }
}

#[cfg(test)]
mod tests {
    use geo::Point;

    use crate::simulation::carsharing::station::{ParkingSpaces, Station};
    use crate::simulation::id::Id;

    #[test]
    fn parking_bounds() {
        let mut parking = ParkingSpaces::new(2, 1);
        assert!(parking.reserve());
        assert!(!parking.reserve());
        assert_eq!(2, parking.occupied());

        assert!(parking.free());
        assert!(parking.free());
        assert!(!parking.free());
        assert_eq!(0, parking.occupied());
    }

    #[test]
    #[should_panic]
    fn over_occupied() {
        ParkingSpaces::new(1, 2);
    }

    #[test]
    fn vehicles_occupy_parking() {
        let station = Station::with_parking(
            Id::create("station-l1"),
            Point::new(0., 0.),
            vec![Id::create("station-v1"), Id::create("station-v2")],
            3,
        );
        assert_eq!(2, station.parking().unwrap().occupied());
        assert!(station.has_free_parking_space());
    }

    #[test]
    fn take_first_vehicle() {
        let mut station = Station::new(
            Id::create("station-l2"),
            Point::new(0., 0.),
            vec![Id::create("station-v3"), Id::create("station-v4")],
        );
        assert_eq!(
            Some(Id::create("station-v3")),
            station.remove_first_vehicle()
        );
        assert!(!station.remove_vehicle(&Id::create("station-v3")));
        assert!(station.remove_vehicle(&Id::create("station-v4")));
        assert!(!station.has_vehicle());
        assert!(station.has_free_parking_space());
    }
}
