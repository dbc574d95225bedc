use crate::simulation::carsharing::CarsharingLegKind;
use crate::simulation::id::Id;
use crate::simulation::network::Link;
use crate::simulation::vehicles::InternalVehicle;

#[derive(Debug, PartialEq, Clone)]
pub struct InternalActivity {
    pub act_type: Id<String>,
    pub link_id: Id<Link>,
    pub x: f64,
    pub y: f64,
    pub start_time: Option<u32>,
    pub end_time: Option<u32>,
    pub max_dur: Option<u32>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct InternalLeg {
    pub mode: Id<String>,
    pub dep_time: Option<u32>,
    pub trav_time: Option<u32>,
    pub route: Option<InternalRoute>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum InternalRoute {
    Generic(InternalGenericRoute),
    Network(InternalNetworkRoute),
}

#[derive(Debug, PartialEq, Clone)]
pub struct InternalGenericRoute {
    start_link: Id<Link>,
    end_link: Id<Link>,
    trav_time: Option<u32>,
    distance: Option<f64>,
    vehicle: Option<Id<InternalVehicle>>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct InternalNetworkRoute {
    generic_delegate: InternalGenericRoute,
    route: Vec<Id<Link>>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum InternalPlanElement {
    Activity(InternalActivity),
    Leg(InternalLeg),
}

/// Coarse shape of a plan element. The carsharing agent derives which leg initialization to run
/// from the kinds of the elements around the current leg.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PlanElementKind {
    Activity,
    Leg,
}

#[derive(Debug, PartialEq, Clone)]
pub struct InternalPlan {
    pub selected: bool,
    pub elements: Vec<InternalPlanElement>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct InternalPerson {
    id: Id<InternalPerson>,
    plans: Vec<InternalPlan>,
}

impl InternalPerson {
    pub fn new(id: Id<InternalPerson>, plan: InternalPlan) -> Self {
        InternalPerson {
            id,
            plans: vec![plan],
        }
    }

    pub fn id(&self) -> &Id<InternalPerson> {
        &self.id
    }

    pub fn plan_element_at(&self, index: usize) -> Option<&InternalPlanElement> {
        self.selected_plan()
            .and_then(|plan| plan.elements.get(index))
    }

    pub(crate) fn plan_element_at_mut(&mut self, index: usize) -> Option<&mut InternalPlanElement> {
        self.selected_plan_mut()
            .and_then(|plan| plan.elements.get_mut(index))
    }

    pub fn total_elements(&self) -> usize {
        self.selected_plan().map_or(0, |plan| plan.elements.len())
    }

    pub fn selected_plan(&self) -> Option<&InternalPlan> {
        self.plans.iter().find(|&plan| plan.selected)
    }

    pub(crate) fn selected_plan_mut(&mut self) -> Option<&mut InternalPlan> {
        self.plans.iter_mut().find(|plan| plan.selected)
    }
}

impl Default for InternalPlan {
    fn default() -> Self {
        Self {
            selected: true,
            elements: Vec::new(),
        }
    }
}

impl InternalPlan {
    pub fn add_leg(&mut self, leg: InternalLeg) {
        self.elements.push(InternalPlanElement::Leg(leg));
    }

    pub fn add_act(&mut self, activity: InternalActivity) {
        self.elements.push(InternalPlanElement::Activity(activity));
    }

    pub fn legs(&self) -> Vec<&InternalLeg> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                InternalPlanElement::Leg(leg) => Some(leg),
                _ => None,
            })
            .collect()
    }

    pub fn acts(&self) -> Vec<&InternalActivity> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                InternalPlanElement::Activity(act) => Some(act),
                _ => None,
            })
            .collect()
    }
}

impl InternalActivity {
    pub fn new(
        x: f64,
        y: f64,
        act_type: &str,
        link_id: Id<Link>,
        start_time: Option<u32>,
        end_time: Option<u32>,
        max_dur: Option<u32>,
    ) -> Self {
        InternalActivity {
            x,
            y,
            act_type: Id::create(act_type),
            link_id,
            start_time,
            end_time,
            max_dur,
        }
    }

    pub(crate) fn cmp_end_time(&self, begin: u32) -> u32 {
        if let Some(end_time) = self.end_time {
            end_time
        } else if let Some(max_dur) = self.max_dur {
            begin + max_dur
        } else {
            // an activity without end time and duration lasts until the end of the day
            u32::MAX
        }
    }
}

impl InternalLeg {
    pub fn new(route: InternalRoute, mode: &str, trav_time: u32, dep_time: Option<u32>) -> Self {
        Self {
            route: Some(route),
            mode: Id::create(mode),
            trav_time: Some(trav_time),
            dep_time,
        }
    }

    /// A leg as it appears in a plan before the carsharing agent has initialized it: only the
    /// origin and destination links are known.
    pub fn unrouted(mode: &str, start_link: Id<Link>, end_link: Id<Link>) -> Self {
        Self {
            route: Some(InternalRoute::Generic(InternalGenericRoute::new(
                start_link, end_link, None, None, None,
            ))),
            mode: Id::create(mode),
            trav_time: None,
            dep_time: None,
        }
    }

    pub fn carsharing_kind(&self) -> Option<CarsharingLegKind> {
        CarsharingLegKind::from_mode(self.mode.external())
    }

    pub fn travel_time(&self) -> u32 {
        self.trav_time
            .or_else(|| self.route.as_ref().and_then(|r| r.as_generic().trav_time()))
            .unwrap_or(0)
    }
}

impl InternalPlanElement {
    pub fn as_activity(&self) -> Option<&InternalActivity> {
        if let InternalPlanElement::Activity(act) = self {
            Some(act)
        } else {
            None
        }
    }

    pub fn as_leg(&self) -> Option<&InternalLeg> {
        if let InternalPlanElement::Leg(leg) = self {
            Some(leg)
        } else {
            None
        }
    }

    pub fn as_leg_mut(&mut self) -> Option<&mut InternalLeg> {
        if let InternalPlanElement::Leg(leg) = self {
            Some(leg)
        } else {
            None
        }
    }

    pub fn kind(&self) -> PlanElementKind {
        match self {
            InternalPlanElement::Activity(_) => PlanElementKind::Activity,
            InternalPlanElement::Leg(_) => PlanElementKind::Leg,
        }
    }
}

impl InternalRoute {
    pub fn as_generic(&self) -> &InternalGenericRoute {
        match self {
            InternalRoute::Generic(g) => g,
            InternalRoute::Network(n) => &n.generic_delegate,
        }
    }

    pub fn as_network(&self) -> Option<&InternalNetworkRoute> {
        match self {
            InternalRoute::Network(n) => Some(n),
            _ => None,
        }
    }

    pub fn start_link(&self) -> &Id<Link> {
        &self.as_generic().start_link
    }

    pub fn end_link(&self) -> &Id<Link> {
        &self.as_generic().end_link
    }

    pub fn vehicle(&self) -> Option<&Id<InternalVehicle>> {
        self.as_generic().vehicle.as_ref()
    }
}

impl InternalGenericRoute {
    pub fn new(
        start_link: Id<Link>,
        end_link: Id<Link>,
        trav_time: Option<u32>,
        distance: Option<f64>,
        vehicle: Option<Id<InternalVehicle>>,
    ) -> Self {
        Self {
            start_link,
            end_link,
            trav_time,
            distance,
            vehicle,
        }
    }

    pub fn end_link(&self) -> &Id<Link> {
        &self.end_link
    }

    pub fn start_link(&self) -> &Id<Link> {
        &self.start_link
    }

    pub fn vehicle(&self) -> &Option<Id<InternalVehicle>> {
        &self.vehicle
    }

    pub fn trav_time(&self) -> Option<u32> {
        self.trav_time
    }

    pub fn distance(&self) -> Option<f64> {
        self.distance
    }
}

impl InternalNetworkRoute {
    pub fn route_element_at(&self, index: usize) -> Option<&Id<Link>> {
        self.route.get(index)
    }

    pub fn new(generic_delegate: InternalGenericRoute, route: Vec<Id<Link>>) -> Self {
        Self {
            generic_delegate,
            route,
        }
    }

    pub fn generic_delegate(&self) -> &InternalGenericRoute {
        &self.generic_delegate
    }

    pub fn route(&self) -> &Vec<Id<Link>> {
        &self.route
    }
}
