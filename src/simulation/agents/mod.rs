use std::fmt::Debug;

use crate::simulation::id::Id;
use crate::simulation::network::Link;
use crate::simulation::population::{InternalPerson, InternalPlanElement};
use crate::simulation::time_queue::{EndTime, Identifiable};
use crate::simulation::vehicles::InternalVehicle;

pub mod agent_logic;
pub mod carsharing_agent;
pub mod trip_context;

pub use carsharing_agent::CarsharingAgent;

/// Callbacks the simulation drives an agent with, and what it can ask the agent about its plan.
pub trait PlanAgent: EndTime + Identifiable<InternalPerson> + Send {
    fn on_activity_end(&mut self, now: u32);
    fn on_leg_end(&mut self, now: u32);
    fn current_plan_element(&self) -> Option<&InternalPlanElement>;
    fn next_plan_element(&self) -> Option<&InternalPlanElement>;
    fn destination_link_id(&self) -> Option<&Id<Link>>;
    fn state(&self) -> AgentState;
    fn is_finished(&self) -> bool;
}

pub trait VehicleAssignment {
    /// The vehicle the agent drives on its current leg. `None` if the agent is not on a leg.
    fn assigned_vehicle_id(&self) -> Option<Id<InternalVehicle>>;
}

impl Debug for dyn PlanAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Plan agent with id {}", self.id().external())
    }
}

/// `Aborted` is terminal. Everything else an agent does is derived from its position in the plan.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AgentState {
    Active,
    Aborted,
}
