use carsharing_qsim::simulation::agents::PlanAgent;
use carsharing_qsim::simulation::carsharing::Station;
use carsharing_qsim::simulation::config::Simulation;
use carsharing_qsim::simulation::controller::local_controller::LocalCarsharingSimulation;
use carsharing_qsim::simulation::id::Id;
use carsharing_qsim::simulation::population::InternalPlanElement;
use carsharing_qsim::test_utils::{
    collected_events, environment, free_floating_trip, line_link, line_network, PlanBuilder,
};

#[test]
fn rental_ends_at_next_activity() {
    let network = line_network("ff-it", &[-50., 50., 150., 1950., 2050.]);
    // free-floating search is not bounded by the configured radii
    let env = environment(network, 10., 10.);
    let parked_at = line_link("ff-it", 2);
    let home = line_link("ff-it", 1);
    let work = line_link("ff-it", 3);
    env.vehicles()
        .free_floating()
        .add_station(Station::new(
            parked_at.clone(),
            env.network().link_coord(&parked_at).unwrap(),
            vec![Id::create("ff-it-v1")],
        ))
        .unwrap();

    let person = free_floating_trip(env.network(), "ff-it-p", &home, &work, 100);
    let simulation = Simulation {
        start_time: 0,
        end_time: 86400,
    };
    let agents = LocalCarsharingSimulation::from_persons(vec![person], &env, &simulation).run();

    let agent = &agents[0];
    assert!(agent.is_finished());
    assert!(agent.trip_context().is_empty());
    assert!(collected_events(&env).is_empty());

    let legs = agent.person().selected_plan().unwrap().legs();
    assert_eq!(2, legs.len());
    // 950m beeline * 1.3 at 1m/s
    assert_eq!(Some(1235), legs[0].trav_time);

    let drive = legs[1].route.as_ref().unwrap();
    assert_eq!(&parked_at, drive.start_link());
    assert_eq!(&work, drive.end_link());
    assert_eq!(Some(&Id::create("FF_ff-it-v1")), drive.vehicle());

    // no walk after the drive, the vehicle is parked where the agent works
    let registry = env.vehicles().free_floating();
    assert_eq!(0, registry.available_vehicles(&parked_at));
    assert_eq!(1, registry.available_vehicles(&work));
    assert_eq!(2, registry.len());
}

#[test]
fn drive_follows_the_next_activity() {
    let network = line_network("ff-next", &[-50., 50., 150., 1950., 2050.]);
    let env = environment(network, 10., 10.);
    let parked_at = line_link("ff-next", 0);
    let home = line_link("ff-next", 1);
    let plan_end = line_link("ff-next", 2);
    let shop = line_link("ff-next", 3);
    env.vehicles()
        .free_floating()
        .add_station(Station::new(
            parked_at.clone(),
            env.network().link_coord(&parked_at).unwrap(),
            vec![Id::create("ff-next-v1")],
        ))
        .unwrap();

    // the legs name a destination which differs from the activity following them
    let person = PlanBuilder::new(env.network())
        .act("home", &home, Some(100))
        .leg("walk_ff", &home, &plan_end)
        .leg("freefloating", &home, &plan_end)
        .act("shop", &shop, None)
        .build("ff-next-p");
    let simulation = Simulation {
        start_time: 0,
        end_time: 86400,
    };
    let agents = LocalCarsharingSimulation::from_persons(vec![person], &env, &simulation).run();

    let agent = &agents[0];
    assert!(matches!(
        agent.current_plan_element(),
        Some(InternalPlanElement::Activity(_))
    ));
    let legs = agent.person().selected_plan().unwrap().legs();
    assert_eq!(&shop, legs[1].route.as_ref().unwrap().end_link());
    assert_eq!(1, env.vehicles().free_floating().available_vehicles(&shop));
}
