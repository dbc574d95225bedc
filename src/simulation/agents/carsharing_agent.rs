use tracing::{debug, error, info, instrument, trace, warn};

use crate::simulation::agents::agent_logic::PlanBasedSimulationLogic;
use crate::simulation::agents::trip_context::{Rental, TripContext};
use crate::simulation::agents::{AgentState, PlanAgent, VehicleAssignment};
use crate::simulation::carsharing::{CarsharingLegKind, Scheme, Station, StationRef};
use crate::simulation::controller::CarsharingEnvironment;
use crate::simulation::error::{CarsharingError, CarsharingResult};
use crate::simulation::id::Id;
use crate::simulation::messaging::events::CarsharingEvent;
use crate::simulation::network::Link;
use crate::simulation::population::{
    InternalGenericRoute, InternalLeg, InternalNetworkRoute, InternalPerson, InternalPlanElement,
    InternalRoute, PlanElementKind,
};
use crate::simulation::routing::teleported_router::BeeLineDistanceRouter;
use crate::simulation::time_queue::{EndTime, Identifiable};
use crate::simulation::vehicles::InternalVehicle;

/// An agent which uses shared vehicles. Whenever the agent starts a carsharing leg, the leg is
/// rebuilt from the agent's position in the plan and the vehicles currently available: walks to
/// and from vehicles are teleported, drives are routed on the network.
///
/// If no vehicle or parking space can be found, the agent is aborted and a failure event is
/// published. An aborted agent ignores all further callbacks.
#[derive(Debug)]
pub struct CarsharingAgent {
    logic: PlanBasedSimulationLogic,
    trip: TripContext,
    state: AgentState,
    env: CarsharingEnvironment,
    walk_router: BeeLineDistanceRouter,
}

impl CarsharingAgent {
    pub fn new(person: InternalPerson, env: CarsharingEnvironment) -> Self {
        let config = env.config();
        let walk_router = BeeLineDistanceRouter::new(config.walk_beeline_factor, config.walk_speed);
        CarsharingAgent {
            logic: PlanBasedSimulationLogic::new(person),
            trip: TripContext::default(),
            state: AgentState::Active,
            env,
            walk_router,
        }
    }

    pub fn person(&self) -> &InternalPerson {
        self.logic.person()
    }

    pub fn trip_context(&self) -> &TripContext {
        &self.trip
    }

    pub fn curr_plan_index(&self) -> usize {
        self.logic.curr_index()
    }

    fn initialize_current_leg(&mut self, now: u32) {
        let Some(kind) = self.logic.curr_leg().and_then(InternalLeg::carsharing_kind) else {
            return;
        };
        let prev = self.logic.prev_kind();
        let next = self.logic.next_kind();
        trace!("Initializing {kind:?} leg, previous {prev:?}, next {next:?}");

        let result = match kind {
            CarsharingLegKind::Walk(scheme) => self.initialize_walk_leg(scheme, prev, next, now),
            CarsharingLegKind::Drive(Scheme::TwoWay) => {
                self.initialize_two_way_drive(prev, next, now)
            }
            CarsharingLegKind::Drive(Scheme::FreeFloating) => {
                self.initialize_free_floating_drive(now)
            }
            CarsharingLegKind::Drive(Scheme::OneWay) => self.initialize_one_way_drive(now),
        };

        if let Err(e) = result {
            self.report(e);
        }
    }

    fn initialize_walk_leg(
        &mut self,
        scheme: Scheme,
        prev: Option<PlanElementKind>,
        next: Option<PlanElementKind>,
        now: u32,
    ) -> CarsharingResult<()> {
        let (start, end) = self.curr_leg_links()?;
        match (scheme, prev, next) {
            (Scheme::FreeFloating, _, _) => self.start_walk(scheme, &start, now),
            (_, _, Some(PlanElementKind::Leg)) => self.start_walk(scheme, &start, now),
            (_, Some(PlanElementKind::Leg), _) => self.end_walk(scheme, &end, now),
            _ => Err(CarsharingError::invalid_plan_state(
                self.id(),
                format!("{scheme:?} walk leg without a neighbouring leg"),
            )),
        }
    }

    /// Walk from the start of the leg to the nearest vehicle, which is taken out of its station.
    fn start_walk(&mut self, scheme: Scheme, start: &Id<Link>, now: u32) -> CarsharingResult<()> {
        let Some((station, vehicle)) = self.reserve_vehicle(scheme, start)? else {
            self.abort(
                now,
                CarsharingEvent::NoVehicleAvailable {
                    link: start.clone(),
                    scheme,
                    person: self.id().clone(),
                },
            );
            return Ok(());
        };
        debug!(
            "Reserved {scheme} vehicle {vehicle} at {} ({:.1}m away)",
            station.link, station.distance
        );

        if let Some(previous) = self.trip.start_rental(scheme, vehicle, station.link.clone()) {
            warn!(
                "Agent {} still had {scheme} vehicle {}. Returning it to {}.",
                self.id(),
                previous.vehicle,
                previous.pickup
            );
            self.return_to_pickup(scheme, previous)?;
        }
        if scheme == Scheme::TwoWay {
            self.trip.remember(scheme, start.clone(), station.link.clone());
        }

        let leg = self.walk_router.walk_leg(
            self.env.network(),
            scheme.walk_mode(),
            start,
            &station.link,
            now,
        )?;
        self.replace_current_leg(leg)
    }

    /// Walk from where the vehicle was left to the end of the leg.
    fn end_walk(&mut self, scheme: Scheme, end: &Id<Link>, now: u32) -> CarsharingResult<()> {
        let from = self.trip.consume(scheme, end).ok_or_else(|| {
            CarsharingError::invalid_plan_state(
                self.id(),
                format!("no {scheme:?} station memorized for a trip ending at {end}"),
            )
        })?;
        let leg =
            self.walk_router
                .walk_leg(self.env.network(), scheme.walk_mode(), &from, end, now)?;
        self.replace_current_leg(leg)
    }

    fn initialize_two_way_drive(
        &mut self,
        prev: Option<PlanElementKind>,
        next: Option<PlanElementKind>,
        now: u32,
    ) -> CarsharingResult<()> {
        use PlanElementKind::{Activity, Leg};

        let (start, end) = self.curr_leg_links()?;
        let (from, to) = match (prev, next) {
            // the vehicle stays with the agent during the previous activity
            (Some(Activity), Some(Activity)) => (start, end),
            (Some(Leg), Some(Leg)) => {
                let pickup = self.pickup(Scheme::TwoWay)?;
                (pickup.clone(), pickup)
            }
            (Some(Leg), _) => (self.pickup(Scheme::TwoWay)?, end),
            (_, Some(Leg)) => {
                let back = self
                    .trip
                    .recall(Scheme::TwoWay, &end)
                    .cloned()
                    .ok_or_else(|| {
                        CarsharingError::invalid_plan_state(
                            self.id(),
                            format!("no two-way station memorized for a trip ending at {end}"),
                        )
                    })?;
                (start, back)
            }
            _ => {
                return Err(CarsharingError::invalid_plan_state(
                    self.id(),
                    format!("two-way drive between {prev:?} and {next:?}"),
                ))
            }
        };
        let leg = self.vehicle_leg(Scheme::TwoWay, &from, &to, now)?;
        self.replace_current_leg(leg)
    }

    /// Free-floating rentals end directly at the next activity, there is no walk afterwards.
    fn initialize_free_floating_drive(&mut self, now: u32) -> CarsharingResult<()> {
        let (_, end) = self.curr_leg_links()?;
        let from = self.pickup(Scheme::FreeFloating)?;
        let to = match self.logic.next_element() {
            Some(InternalPlanElement::Activity(act)) => act.link_id.clone(),
            _ => end,
        };
        let leg = self.vehicle_leg(Scheme::FreeFloating, &from, &to, now)?;
        self.replace_current_leg(leg)
    }

    /// Reserves a parking space close to the destination before the vehicle leaves its station.
    /// Only then is the parking space at the origin released.
    fn initialize_one_way_drive(&mut self, now: u32) -> CarsharingResult<()> {
        let (_, end) = self.curr_leg_links()?;
        let from = self.pickup(Scheme::OneWay)?;

        let Some(station) = self.reserve_parking(&end)? else {
            // the trip is not committed, so the vehicle goes back into its untouched slot
            let returned = match self.trip.end_rental(Scheme::OneWay) {
                Some(rental) => self.return_to_pickup(Scheme::OneWay, rental),
                None => Ok(()),
            };
            self.abort(
                now,
                CarsharingEvent::NoParkingSpaceAvailable {
                    link: end,
                    scheme: Scheme::OneWay,
                    person: self.id().clone(),
                },
            );
            return returned;
        };
        debug!("Reserved one-way parking space at {}", station.link);

        let registry = self.env.vehicles().one_way();
        if let Err(e) = registry.free_parking_space(&from) {
            if let Err(undo) = registry.free_parking_space(&station.link) {
                error!("Could not release parking space at {}: {undo}", station.link);
            }
            return Err(e);
        }
        self.trip.set_drop_off(Scheme::OneWay, station.link.clone());
        self.trip.remember(Scheme::OneWay, end, station.link.clone());

        let leg = self.vehicle_leg(Scheme::OneWay, &from, &station.link, now)?;
        self.replace_current_leg(leg)
    }

    /// Searches the nearest station with a vehicle and takes one. `None` if there is no such
    /// station or another agent was faster.
    fn reserve_vehicle(
        &self,
        scheme: Scheme,
        from: &Id<Link>,
    ) -> CarsharingResult<Option<(StationRef, Id<InternalVehicle>)>> {
        let point = self.env.network().link_coord(from)?;
        let registry = self.env.vehicles().registry(scheme);
        let config = self.env.config();

        let found = match scheme {
            Scheme::TwoWay => registry.find_nearest_vehicle(point, config.two_way_search_distance),
            Scheme::OneWay => registry.find_nearest_vehicle(point, config.one_way_search_distance),
            Scheme::FreeFloating => registry.find_nearest_unbounded(point, Station::has_vehicle),
        };
        let Some(station) = found else {
            return Ok(None);
        };

        let vehicle = lost_race_as_none(registry.take_any_vehicle(&station.link))?;
        Ok(vehicle.map(|v| (station, v)))
    }

    fn reserve_parking(&self, destination: &Id<Link>) -> CarsharingResult<Option<StationRef>> {
        let point = self.env.network().link_coord(destination)?;
        let registry = self.env.vehicles().one_way();
        let Some(station) =
            registry.find_nearest_parking(point, self.env.config().one_way_search_distance)
        else {
            return Ok(None);
        };

        let reserved = lost_race_as_none(registry.reserve_parking_space(&station.link))?;
        Ok(reserved.map(|_| station))
    }

    /// Routes a car from `from` to `to` and tags the route with the rented vehicle.
    fn vehicle_leg(
        &self,
        scheme: Scheme,
        from: &Id<Link>,
        to: &Id<Link>,
        now: u32,
    ) -> CarsharingResult<InternalLeg> {
        let sub_legs = self
            .env
            .router()
            .compute_route("car", from, to, now, self.id())?;

        let mut links = vec![from.clone()];
        let mut trav_time: u32 = 0;
        let mut distance = 0.;
        for sub_leg in &sub_legs {
            trav_time += sub_leg.travel_time();
            if let Some(route) = &sub_leg.route {
                distance += route.as_generic().distance().unwrap_or(0.);
                if let Some(network_route) = route.as_network() {
                    links.extend(network_route.route().iter().cloned());
                }
            }
        }
        links.push(to.clone());
        links.dedup();

        let vehicle = self
            .trip
            .rental(scheme)
            .map(|r| scheme.sim_vehicle_id(&r.vehicle));
        let generic = InternalGenericRoute::new(
            from.clone(),
            to.clone(),
            Some(trav_time),
            Some(distance),
            vehicle,
        );
        Ok(InternalLeg::new(
            InternalRoute::Network(InternalNetworkRoute::new(generic, links)),
            scheme.drive_mode(),
            trav_time,
            Some(now),
        ))
    }

    /// Puts the vehicle of a finished drive back into a registry. A two-way vehicle stays with the
    /// agent if an activity follows, since it has to be brought back to its station later.
    fn park_vehicle(&mut self) -> CarsharingResult<()> {
        let (scheme, end) = match self.logic.curr_leg() {
            Some(leg) => match (leg.carsharing_kind(), &leg.route) {
                (Some(CarsharingLegKind::Drive(scheme)), Some(route)) => {
                    (scheme, route.end_link().clone())
                }
                _ => return Ok(()),
            },
            None => return Ok(()),
        };

        if scheme == Scheme::TwoWay && self.logic.next_kind() != Some(PlanElementKind::Leg) {
            return Ok(());
        }

        let rental = self
            .trip
            .end_rental(scheme)
            .ok_or_else(|| CarsharingError::StaleReservation {
                agent: self.id().clone(),
                scheme,
            })?;
        let link = if scheme == Scheme::OneWay {
            rental.drop_off.clone().ok_or_else(|| {
                CarsharingError::invalid_plan_state(
                    self.id(),
                    "one-way vehicle without reserved parking space",
                )
            })?
        } else {
            end
        };

        let coord = self.env.network().link_coord(&link)?;
        debug!("Parking {scheme} vehicle {} at {link}", rental.vehicle);
        self.env
            .vehicles()
            .registry(scheme)
            .return_vehicle(&link, coord, rental.vehicle)
    }

    fn return_to_pickup(&self, scheme: Scheme, rental: Rental) -> CarsharingResult<()> {
        let coord = self.env.network().link_coord(&rental.pickup)?;
        debug!("Returning {scheme} vehicle {} to {}", rental.vehicle, rental.pickup);
        self.env
            .vehicles()
            .registry(scheme)
            .return_vehicle(&rental.pickup, coord, rental.vehicle)
    }

    fn pickup(&self, scheme: Scheme) -> CarsharingResult<Id<Link>> {
        self.trip
            .rental(scheme)
            .map(|r| r.pickup.clone())
            .ok_or_else(|| CarsharingError::StaleReservation {
                agent: self.id().clone(),
                scheme,
            })
    }

    fn curr_leg_links(&self) -> CarsharingResult<(Id<Link>, Id<Link>)> {
        self.logic
            .curr_leg()
            .and_then(|leg| leg.route.as_ref())
            .map(|route| (route.start_link().clone(), route.end_link().clone()))
            .ok_or_else(|| {
                CarsharingError::invalid_plan_state(self.id(), "current leg has no route")
            })
    }

    fn replace_current_leg(&mut self, leg: InternalLeg) -> CarsharingResult<()> {
        let agent = self.id().clone();
        let curr = self.logic.curr_leg_mut().ok_or_else(|| {
            CarsharingError::invalid_plan_state(&agent, "current plan element is not a leg")
        })?;
        *curr = leg;
        Ok(())
    }

    fn abort(&mut self, now: u32, event: CarsharingEvent) {
        info!("Aborting agent {} at {now}: {event}", self.id());
        self.state = AgentState::Aborted;
        self.env.events().publish_event(now, &event);
    }

    fn report(&self, e: CarsharingError) {
        match e {
            CarsharingError::StaleReservation { .. } => warn!("{e}"),
            _ => error!("Could not initialize leg of agent {}: {e}", self.id()),
        }
    }

    fn agent_vehicle_id(&self) -> Id<InternalVehicle> {
        Id::create(self.id().external())
    }
}

/// Another agent may empty a station between search and reservation. That is no error, there is
/// just nothing to reserve.
fn lost_race_as_none<T>(result: CarsharingResult<T>) -> CarsharingResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e @ CarsharingError::ResourceUnavailable { .. }) => {
            debug!("{e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

impl Identifiable<InternalPerson> for CarsharingAgent {
    fn id(&self) -> &Id<InternalPerson> {
        self.logic.id()
    }
}

impl EndTime for CarsharingAgent {
    fn end_time(&self, now: u32) -> u32 {
        match self.state {
            AgentState::Aborted => u32::MAX,
            AgentState::Active => self.logic.end_time(now),
        }
    }
}

impl PlanAgent for CarsharingAgent {
    #[instrument(level = "trace", skip(self), fields(agent = %self.id()))]
    fn on_activity_end(&mut self, now: u32) {
        if self.state == AgentState::Aborted {
            return;
        }
        if !self.logic.advance_plan() {
            warn!("Agent {} has nothing to do after its last activity", self.id());
            return;
        }
        self.initialize_current_leg(now);
    }

    #[instrument(level = "trace", skip(self), fields(agent = %self.id()))]
    fn on_leg_end(&mut self, now: u32) {
        if self.state == AgentState::Aborted {
            return;
        }
        if let Err(e) = self.park_vehicle() {
            self.report(e);
        }
        if !self.logic.advance_plan() {
            warn!("Agent {} ended its plan with a leg", self.id());
            return;
        }
        self.initialize_current_leg(now);
    }

    fn current_plan_element(&self) -> Option<&InternalPlanElement> {
        self.logic.curr_element()
    }

    fn next_plan_element(&self) -> Option<&InternalPlanElement> {
        self.logic.next_element()
    }

    fn destination_link_id(&self) -> Option<&Id<Link>> {
        match self.logic.curr_element()? {
            InternalPlanElement::Leg(leg) => leg.route.as_ref().map(InternalRoute::end_link),
            InternalPlanElement::Activity(act) => Some(&act.link_id),
        }
    }

    fn state(&self) -> AgentState {
        self.state
    }

    fn is_finished(&self) -> bool {
        self.state == AgentState::Active
            && self.logic.is_last_element()
            && self.logic.curr_act().is_some()
    }
}

impl VehicleAssignment for CarsharingAgent {
    fn assigned_vehicle_id(&self) -> Option<Id<InternalVehicle>> {
        let leg = self.logic.curr_leg()?;
        let id = match leg.carsharing_kind() {
            Some(CarsharingLegKind::Drive(scheme)) => match self.trip.rental(scheme) {
                Some(rental) => scheme.sim_vehicle_id(&rental.vehicle),
                None => {
                    warn!(
                        "{}. Using the agent id as vehicle id.",
                        CarsharingError::StaleReservation {
                            agent: self.id().clone(),
                            scheme,
                        }
                    );
                    self.agent_vehicle_id()
                }
            },
            _ => leg
                .route
                .as_ref()
                .and_then(InternalRoute::vehicle)
                .cloned()
                .unwrap_or_else(|| self.agent_vehicle_id()),
        };
        Some(id)
    }
}
