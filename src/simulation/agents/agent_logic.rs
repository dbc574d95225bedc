use tracing::trace;

use crate::simulation::id::Id;
use crate::simulation::population::{
    InternalActivity, InternalLeg, InternalPerson, InternalPlanElement, PlanElementKind,
};
use crate::simulation::time_queue::{EndTime, Identifiable};

/// Walks through the selected plan of a person, one element at a time.
#[derive(Debug, PartialEq, Clone)]
pub struct PlanBasedSimulationLogic {
    pub(super) basic_agent_delegate: InternalPerson,
    pub(super) curr_plan_element: usize,
}

impl Identifiable<InternalPerson> for PlanBasedSimulationLogic {
    fn id(&self) -> &Id<InternalPerson> {
        self.basic_agent_delegate.id()
    }
}

impl PlanBasedSimulationLogic {
    pub fn new(basic_agent_delegate: InternalPerson) -> Self {
        Self {
            basic_agent_delegate,
            curr_plan_element: 0,
        }
    }

    pub fn person(&self) -> &InternalPerson {
        &self.basic_agent_delegate
    }

    pub fn curr_index(&self) -> usize {
        self.curr_plan_element
    }

    pub fn curr_element(&self) -> Option<&InternalPlanElement> {
        self.basic_agent_delegate
            .plan_element_at(self.curr_plan_element)
    }

    pub fn next_element(&self) -> Option<&InternalPlanElement> {
        self.basic_agent_delegate
            .plan_element_at(self.curr_plan_element + 1)
    }

    pub fn prev_element(&self) -> Option<&InternalPlanElement> {
        self.curr_plan_element
            .checked_sub(1)
            .and_then(|i| self.basic_agent_delegate.plan_element_at(i))
    }

    pub fn prev_kind(&self) -> Option<PlanElementKind> {
        self.prev_element().map(InternalPlanElement::kind)
    }

    pub fn next_kind(&self) -> Option<PlanElementKind> {
        self.next_element().map(InternalPlanElement::kind)
    }

    pub fn curr_act(&self) -> Option<&InternalActivity> {
        self.curr_element().and_then(InternalPlanElement::as_activity)
    }

    pub fn curr_leg(&self) -> Option<&InternalLeg> {
        self.curr_element().and_then(InternalPlanElement::as_leg)
    }

    pub(super) fn curr_leg_mut(&mut self) -> Option<&mut InternalLeg> {
        self.basic_agent_delegate
            .plan_element_at_mut(self.curr_plan_element)
            .and_then(InternalPlanElement::as_leg_mut)
    }

    /// Moves to the next plan element. Returns false if the current element is the last one.
    pub fn advance_plan(&mut self) -> bool {
        if self.curr_plan_element + 1 >= self.basic_agent_delegate.total_elements() {
            return false;
        }
        self.curr_plan_element += 1;
        trace!(
            "Agent {} advanced to plan element {}",
            self.basic_agent_delegate.id(),
            self.curr_plan_element
        );
        true
    }

    pub fn is_last_element(&self) -> bool {
        self.curr_plan_element + 1 >= self.basic_agent_delegate.total_elements()
    }
}

impl EndTime for PlanBasedSimulationLogic {
    fn end_time(&self, now: u32) -> u32 {
        match self.curr_element() {
            Some(InternalPlanElement::Activity(a)) => a.cmp_end_time(now),
            Some(InternalPlanElement::Leg(l)) => now.saturating_add(l.travel_time()),
            None => u32::MAX,
        }
    }
}
