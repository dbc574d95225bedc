use std::thread;

use itertools::Itertools;
use tracing::{debug, info, instrument};

use crate::simulation::agents::{AgentState, CarsharingAgent, PlanAgent};
use crate::simulation::config::Simulation;
use crate::simulation::controller::CarsharingEnvironment;
use crate::simulation::population::{InternalPerson, InternalPlanElement};
use crate::simulation::time_queue::{EndTime, TimeQueue};

/// Drives a set of agents through their plans. Agents wake up at the end of their current
/// activity or leg and are handed the matching callback. An agent leaves the simulation once it
/// has finished its plan, was aborted, or has nothing left to do before the end time.
///
/// All agents waking up at the same time step form a batch. With more than one worker thread, a
/// batch is split up and processed on scoped threads, so that agents compete for the shared
/// station registries.
pub struct LocalCarsharingSimulation<A: PlanAgent> {
    queue: TimeQueue<A>,
    done: Vec<A>,
    start_time: u32,
    end_time: u32,
    worker_threads: usize,
}

impl LocalCarsharingSimulation<CarsharingAgent> {
    /// Creates one carsharing agent per person, all sharing the same environment.
    pub fn from_persons(
        persons: Vec<InternalPerson>,
        env: &CarsharingEnvironment,
        simulation: &Simulation,
    ) -> Self {
        let agents = persons
            .into_iter()
            .map(|p| CarsharingAgent::new(p, env.clone()))
            .collect();
        Self::new(agents, simulation)
    }
}

impl<A: PlanAgent> LocalCarsharingSimulation<A> {
    pub fn new(agents: Vec<A>, simulation: &Simulation) -> Self {
        let mut queue = TimeQueue::new();
        for agent in agents {
            queue.add(agent, simulation.start_time);
        }
        LocalCarsharingSimulation {
            queue,
            done: Vec::new(),
            start_time: simulation.start_time,
            end_time: simulation.end_time,
            worker_threads: 1,
        }
    }

    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads.max(1);
        self
    }

    /// Runs until no agent is left in the queue and returns all agents, ordered by id.
    #[instrument(level = "info", skip(self), fields(threads = self.worker_threads))]
    pub fn run(mut self) -> Vec<A> {
        info!(
            "Starting carsharing simulation with {} agents at {}. End time is {}.",
            self.queue.len(),
            self.start_time,
            self.end_time
        );

        let mut now = self.queue.next_time().unwrap_or(self.end_time).max(self.start_time);
        while !self.queue.is_empty() && now <= self.end_time {
            let mut batch = self.queue.pop(now);
            debug!("{} agents woke up at {now}", batch.len());
            self.wake_up(&mut batch, now);

            for agent in batch {
                self.enqueue(agent, now);
            }

            match self.queue.next_time() {
                Some(next) => now = next.max(now + 1),
                None => break,
            }
        }

        // whoever is left has plans which reach beyond the end time
        let mut remaining = self.queue.pop(u32::MAX);
        self.done.append(&mut remaining);

        info!(
            "Carsharing simulation finished at {now}. {} agents aborted.",
            self.done
                .iter()
                .filter(|a| a.state() == AgentState::Aborted)
                .count()
        );

        self.done
            .into_iter()
            .sorted_by(|a, b| a.id().external().cmp(b.id().external()))
            .collect()
    }

    fn wake_up(&self, batch: &mut [A], now: u32) {
        if self.worker_threads <= 1 || batch.len() <= 1 {
            for agent in batch.iter_mut() {
                Self::handle(agent, now);
            }
            return;
        }

        let chunk_size = batch.len().div_ceil(self.worker_threads);
        thread::scope(|scope| {
            for chunk in batch.chunks_mut(chunk_size) {
                scope.spawn(move || {
                    for agent in chunk {
                        Self::handle(agent, now);
                    }
                });
            }
        });
    }

    fn handle(agent: &mut A, now: u32) {
        match agent.current_plan_element() {
            Some(InternalPlanElement::Activity(_)) => agent.on_activity_end(now),
            Some(InternalPlanElement::Leg(_)) => agent.on_leg_end(now),
            None => {}
        }
    }

    fn enqueue(&mut self, agent: A, now: u32) {
        let wakes_up = agent.end_time(now);
        if agent.state() == AgentState::Aborted
            || agent.is_finished()
            || wakes_up == u32::MAX
            || wakes_up > self.end_time
        {
            self.done.push(agent);
        } else {
            self.queue.add(agent, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::simulation::agents::{AgentState, PlanAgent};
    use crate::simulation::config::Simulation;
    use crate::simulation::controller::local_controller::LocalCarsharingSimulation;
    use crate::simulation::id::Id;
    use crate::test_utils::{environment, line_link, line_network, PlanBuilder};

    #[test]
    fn agents_without_carsharing_finish() {
        let network = line_network("lc-car", &[0., 100., 200., 300.]);
        let env = environment(network, 1000., 1000.);
        let a = line_link("lc-car", 0);
        let b = line_link("lc-car", 2);

        let persons = (0..3)
            .map(|i| {
                PlanBuilder::new(env.network())
                    .act("home", &a, Some(10 + i))
                    .leg("car", &a, &b)
                    .act("work", &b, None)
                    .build(&format!("lc-car-p{i}"))
            })
            .collect();
        let simulation = Simulation {
            start_time: 0,
            end_time: 3600,
        };

        let agents = LocalCarsharingSimulation::from_persons(persons, &env, &simulation).run();
        assert_eq!(3, agents.len());
        assert_eq!(&Id::create("lc-car-p0"), agents[0].person().id());
        assert!(agents.iter().all(|a| a.is_finished()));
    }

    #[test]
    fn plans_beyond_end_time_are_returned() {
        let network = line_network("lc-late", &[0., 100., 200.]);
        let env = environment(network, 1000., 1000.);
        let a = line_link("lc-late", 0);
        let b = line_link("lc-late", 1);

        let person = PlanBuilder::new(env.network())
            .act("home", &a, Some(7200))
            .leg("car", &a, &b)
            .act("work", &b, None)
            .build("lc-late-p");
        let simulation = Simulation {
            start_time: 0,
            end_time: 3600,
        };

        let agents = LocalCarsharingSimulation::from_persons(vec![person], &env, &simulation)
            .with_worker_threads(4)
            .run();
        assert_eq!(1, agents.len());
        assert_eq!(AgentState::Active, agents[0].state());
        assert_eq!(0, agents[0].curr_plan_index());
    }
}
