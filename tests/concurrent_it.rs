use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use carsharing_qsim::simulation::agents::{AgentState, PlanAgent};
use carsharing_qsim::simulation::carsharing::Station;
use carsharing_qsim::simulation::config::Simulation;
use carsharing_qsim::simulation::controller::local_controller::LocalCarsharingSimulation;
use carsharing_qsim::simulation::id::Id;
use carsharing_qsim::simulation::messaging::events::CarsharingEvent;
use carsharing_qsim::test_utils::{
    collected_events, environment, line_link, line_network, two_way_round_trip,
};

#[test]
fn vehicles_are_conserved_with_worker_threads() {
    let network = line_network("cc-it", &[-50., 50., 150., 1950., 2050.]);
    let env = environment(network, 1000., 1000.);
    let station = line_link("cc-it", 0);
    let home = line_link("cc-it", 1);
    let work = line_link("cc-it", 3);
    let vehicles = (0..5)
        .map(|i| Id::create(&format!("cc-it-v{i}")))
        .collect();
    env.vehicles()
        .two_way()
        .add_station(Station::new(
            station.clone(),
            env.network().link_coord(&station).unwrap(),
            vehicles,
        ))
        .unwrap();

    // departures cluster on a few time steps, so that agents compete within one batch
    let mut rng = StdRng::seed_from_u64(42);
    let persons = (0..40)
        .map(|i| {
            let departure = rng.random_range(100..=103);
            two_way_round_trip(
                env.network(),
                &format!("cc-it-p{i}"),
                &home,
                &work,
                departure,
                5000,
            )
        })
        .collect();
    let simulation = Simulation {
        start_time: 0,
        end_time: 86400,
    };

    let agents = LocalCarsharingSimulation::from_persons(persons, &env, &simulation)
        .with_worker_threads(4)
        .run();
    assert_eq!(40, agents.len());

    let finished: Vec<_> = agents.iter().filter(|a| a.is_finished()).collect();
    let aborted: Vec<_> = agents
        .iter()
        .filter(|a| a.state() == AgentState::Aborted)
        .collect();
    assert_eq!(5, finished.len());
    assert_eq!(35, aborted.len());

    // every vehicle was driven by exactly one agent
    let driven: HashSet<_> = finished
        .iter()
        .map(|a| {
            let legs = a.person().selected_plan().unwrap().legs();
            legs[1].route.as_ref().unwrap().vehicle().unwrap().clone()
        })
        .collect();
    assert_eq!(5, driven.len());

    let events = collected_events(&env);
    assert_eq!(35, events.len());
    assert!(events
        .iter()
        .all(|(_, e)| matches!(e, CarsharingEvent::NoVehicleAvailable { .. })));

    assert_eq!(5, env.vehicles().two_way().available_vehicles(&station));
    assert_eq!(5, env.vehicles().two_way().total_vehicles());
}
