use crate::simulation::network::{Link, Node};
use crate::simulation::population::InternalPerson;
use crate::simulation::vehicles::InternalVehicle;

pub trait StableTypeId {
    fn stable_type_id() -> u64;
}

impl StableTypeId for String {
    fn stable_type_id() -> u64 {
        STRING_TYPE_ID
    }
}

impl StableTypeId for InternalPerson {
    fn stable_type_id() -> u64 {
        PERSON_TYPE_ID
    }
}

impl StableTypeId for Link {
    fn stable_type_id() -> u64 {
        LINK_TYPE_ID
    }
}

impl StableTypeId for Node {
    fn stable_type_id() -> u64 {
        NODE_TYPE_ID
    }
}

impl StableTypeId for InternalVehicle {
    fn stable_type_id() -> u64 {
        VEHICLE_TYPE_ID
    }
}

impl StableTypeId for () {
    fn stable_type_id() -> u64 {
        0
    }
}

impl StableTypeId for u32 {
    fn stable_type_id() -> u64 {
        U32_TYPE_ID
    }
}

pub const STRING_TYPE_ID: u64 = 1;
pub const PERSON_TYPE_ID: u64 = 2;
pub const LINK_TYPE_ID: u64 = 3;
pub const NODE_TYPE_ID: u64 = 4;
pub const VEHICLE_TYPE_ID: u64 = 6;
pub const U32_TYPE_ID: u64 = 9;
