use crate::simulation::carsharing::Scheme;
use crate::simulation::id::Id;

/// A rentable carsharing vehicle. Vehicles carry no state of their own beyond their identity;
/// where a vehicle currently is is owned by exactly one station inventory or one agent's trip
/// context.
#[derive(Debug, PartialEq, Clone)]
pub struct InternalVehicle {
    pub id: Id<InternalVehicle>,
    pub scheme: Scheme,
}

impl InternalVehicle {
    pub fn new(id: Id<InternalVehicle>, scheme: Scheme) -> Self {
        InternalVehicle { id, scheme }
    }

    /// The id under which the vehicle drives on the network, e.g. `TW_42` for the two-way vehicle
    /// `42`. The prefix keeps vehicles of different schemes apart, even if their inventories use
    /// the same raw ids.
    pub fn sim_id(&self) -> Id<InternalVehicle> {
        self.scheme.sim_vehicle_id(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use crate::simulation::carsharing::Scheme;
    use crate::simulation::id::Id;
    use crate::simulation::vehicles::InternalVehicle;

    #[test]
    fn prefixed_sim_ids() {
        let raw = Id::create("veh-7");
        assert_eq!(
            "TW_veh-7",
            InternalVehicle::new(raw.clone(), Scheme::TwoWay)
                .sim_id()
                .external()
        );
        assert_eq!(
            "OW_veh-7",
            InternalVehicle::new(raw.clone(), Scheme::OneWay)
                .sim_id()
                .external()
        );
        assert_eq!(
            "FF_veh-7",
            InternalVehicle::new(raw, Scheme::FreeFloating)
                .sim_id()
                .external()
        );
    }
}
