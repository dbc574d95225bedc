use nohash_hasher::IntMap;

use crate::simulation::carsharing::Scheme;
use crate::simulation::id::Id;
use crate::simulation::network::Link;
use crate::simulation::vehicles::InternalVehicle;

/// A vehicle an agent has taken out of a station.
#[derive(Debug, Clone, PartialEq)]
pub struct Rental {
    pub vehicle: Id<InternalVehicle>,
    /// Link of the station the vehicle was taken from.
    pub pickup: Id<Link>,
    /// Station where a parking space was reserved. One-way only.
    pub drop_off: Option<Id<Link>>,
}

/// Transient state of a carsharing trip. Owned by exactly one agent.
///
/// The memo tables remember for a trip where the vehicle was picked up (two-way) or dropped off
/// (one-way). The walk leg at the end of the trip consumes the entry, so nothing is left behind
/// once the trip is over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripContext {
    two_way: Option<Rental>,
    one_way: Option<Rental>,
    free_floating: Option<Rental>,
    two_way_memo: IntMap<Id<Link>, Id<Link>>,
    one_way_memo: IntMap<Id<Link>, Id<Link>>,
}

impl TripContext {
    pub fn rental(&self, scheme: Scheme) -> Option<&Rental> {
        match scheme {
            Scheme::TwoWay => self.two_way.as_ref(),
            Scheme::OneWay => self.one_way.as_ref(),
            Scheme::FreeFloating => self.free_floating.as_ref(),
        }
    }

    fn rental_slot(&mut self, scheme: Scheme) -> &mut Option<Rental> {
        match scheme {
            Scheme::TwoWay => &mut self.two_way,
            Scheme::OneWay => &mut self.one_way,
            Scheme::FreeFloating => &mut self.free_floating,
        }
    }

    /// Records a taken vehicle. Returns the previous rental of the scheme, if there was one.
    pub fn start_rental(
        &mut self,
        scheme: Scheme,
        vehicle: Id<InternalVehicle>,
        pickup: Id<Link>,
    ) -> Option<Rental> {
        self.rental_slot(scheme).replace(Rental {
            vehicle,
            pickup,
            drop_off: None,
        })
    }

    /// Returns false if there is no rental of the scheme.
    pub fn set_drop_off(&mut self, scheme: Scheme, drop_off: Id<Link>) -> bool {
        match self.rental_slot(scheme) {
            Some(rental) => {
                rental.drop_off = Some(drop_off);
                true
            }
            None => false,
        }
    }

    pub fn end_rental(&mut self, scheme: Scheme) -> Option<Rental> {
        self.rental_slot(scheme).take()
    }

    fn memo(&mut self, scheme: Scheme) -> Option<&mut IntMap<Id<Link>, Id<Link>>> {
        match scheme {
            Scheme::TwoWay => Some(&mut self.two_way_memo),
            Scheme::OneWay => Some(&mut self.one_way_memo),
            Scheme::FreeFloating => None,
        }
    }

    /// Free-floating trips end at the next activity and keep no memo.
    pub fn remember(&mut self, scheme: Scheme, key: Id<Link>, station: Id<Link>) {
        if let Some(memo) = self.memo(scheme) {
            memo.insert(key, station);
        }
    }

    pub fn recall(&self, scheme: Scheme, key: &Id<Link>) -> Option<&Id<Link>> {
        match scheme {
            Scheme::TwoWay => self.two_way_memo.get(key),
            Scheme::OneWay => self.one_way_memo.get(key),
            Scheme::FreeFloating => None,
        }
    }

    pub fn consume(&mut self, scheme: Scheme, key: &Id<Link>) -> Option<Id<Link>> {
        self.memo(scheme).and_then(|memo| memo.remove(key))
    }

    pub fn memo_len(&self, scheme: Scheme) -> usize {
        match scheme {
            Scheme::TwoWay => self.two_way_memo.len(),
            Scheme::OneWay => self.one_way_memo.len(),
            Scheme::FreeFloating => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.two_way.is_none()
            && self.one_way.is_none()
            && self.free_floating.is_none()
            && self.two_way_memo.is_empty()
            && self.one_way_memo.is_empty()
    }
}
