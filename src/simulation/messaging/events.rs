use std::any::Any;
use std::fmt::{Debug, Display, Formatter};

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{info, instrument};

use crate::simulation::carsharing::Scheme;
use crate::simulation::id::Id;
use crate::simulation::network::Link;
use crate::simulation::population::InternalPerson;

/// Failures of carsharing agents. Each one ends the plan of the agent it names.
#[derive(Debug, Clone, PartialEq)]
pub enum CarsharingEvent {
    NoVehicleAvailable {
        link: Id<Link>,
        scheme: Scheme,
        person: Id<InternalPerson>,
    },
    NoParkingSpaceAvailable {
        link: Id<Link>,
        scheme: Scheme,
        person: Id<InternalPerson>,
    },
}

impl CarsharingEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            CarsharingEvent::NoVehicleAvailable { .. } => "noCarSharingVehicle",
            CarsharingEvent::NoParkingSpaceAvailable { .. } => "noParkingSpace",
        }
    }

    pub fn link(&self) -> &Id<Link> {
        match self {
            CarsharingEvent::NoVehicleAvailable { link, .. }
            | CarsharingEvent::NoParkingSpaceAvailable { link, .. } => link,
        }
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            CarsharingEvent::NoVehicleAvailable { scheme, .. }
            | CarsharingEvent::NoParkingSpaceAvailable { scheme, .. } => *scheme,
        }
    }

    pub fn person(&self) -> &Id<InternalPerson> {
        match self {
            CarsharingEvent::NoVehicleAvailable { person, .. }
            | CarsharingEvent::NoParkingSpaceAvailable { person, .. } => person,
        }
    }
}

impl Display for CarsharingEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "type={} link={} carsharingType={} person={}",
            self.event_type(),
            self.link(),
            self.scheme(),
            self.person()
        )
    }
}

pub trait EventsSubscriber {
    fn receive_event(&mut self, time: u32, event: &CarsharingEvent);

    fn finish(&mut self) {}

    fn as_any(&mut self) -> &mut dyn Any;
}

impl Debug for dyn EventsSubscriber + Send {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventsSubscriber")
    }
}

pub struct EventsLogger {}

impl EventsSubscriber for EventsLogger {
    fn receive_event(&mut self, time: u32, event: &CarsharingEvent) {
        info!("{time}: {event}");
    }

    fn as_any(&mut self) -> &mut dyn Any {
        self
    }
}

/// Keeps every event it receives, in the order of publication.
#[derive(Debug, Default)]
pub struct EventsCollector {
    events: Vec<(u32, CarsharingEvent)>,
}

impl EventsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[(u32, CarsharingEvent)] {
        &self.events
    }
}

impl EventsSubscriber for EventsCollector {
    fn receive_event(&mut self, time: u32, event: &CarsharingEvent) {
        self.events.push((time, event.clone()));
    }

    fn as_any(&mut self) -> &mut dyn Any {
        self
    }
}

/// Process wide sink for carsharing events. Agents on different threads publish through a shared
/// reference, so the subscribers sit behind a mutex. Events of one agent reach the subscribers in
/// the order the agent published them.
#[derive(Default, Debug)]
pub struct EventsPublisher {
    handlers: Mutex<Vec<Box<dyn EventsSubscriber + Send>>>,
}

impl EventsPublisher {
    pub fn new() -> Self {
        EventsPublisher {
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn add_subscriber(&self, handler: Box<dyn EventsSubscriber + Send>) {
        self.handlers.lock().push(handler);
    }

    pub fn publish_event(&self, time: u32, event: &CarsharingEvent) {
        for handler in self.handlers.lock().iter_mut() {
            handler.receive_event(time, event);
        }
    }

    #[instrument(skip_all, level = "trace")]
    pub fn finish(&self) {
        for handler in self.handlers.lock().iter_mut() {
            handler.finish();
        }
    }

    /// Locks the publisher and hands out the last subscriber of type `T`. Publishing blocks while
    /// the returned guard is alive.
    pub fn get_subscriber<T: EventsSubscriber + 'static>(&self) -> Option<MappedMutexGuard<'_, T>> {
        MutexGuard::try_map(self.handlers.lock(), |handlers| {
            handlers
                .iter_mut()
                .rev()
                .find_map(|h| h.as_any().downcast_mut::<T>())
        })
        .ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use crate::simulation::carsharing::Scheme;
    use crate::simulation::id::Id;
    use crate::simulation::messaging::events::{
        CarsharingEvent, EventsCollector, EventsLogger, EventsPublisher,
    };

    fn no_vehicle(person: &str) -> CarsharingEvent {
        CarsharingEvent::NoVehicleAvailable {
            link: Id::create("events-l1"),
            scheme: Scheme::TwoWay,
            person: Id::create(person),
        }
    }

    #[test]
    fn collect_events() {
        let publisher = EventsPublisher::new();
        publisher.add_subscriber(Box::new(EventsLogger {}));
        publisher.add_subscriber(Box::new(EventsCollector::new()));

        publisher.publish_event(10, &no_vehicle("events-p1"));
        publisher.publish_event(
            12,
            &CarsharingEvent::NoParkingSpaceAvailable {
                link: Id::create("events-l2"),
                scheme: Scheme::OneWay,
                person: Id::create("events-p2"),
            },
        );
        publisher.finish();

        let collector = publisher.get_subscriber::<EventsCollector>().unwrap();
        assert_eq!(2, collector.events().len());
        assert_eq!(10, collector.events()[0].0);
        assert_eq!("rt", collector.events()[0].1.scheme().tag());
        assert_eq!("noParkingSpace", collector.events()[1].1.event_type());
        assert_eq!(
            &Id::<crate::simulation::network::Link>::create("events-l2"),
            collector.events()[1].1.link()
        );
    }

    #[test]
    fn missing_subscriber() {
        let publisher = EventsPublisher::new();
        publisher.add_subscriber(Box::new(EventsLogger {}));
        assert!(publisher.get_subscriber::<EventsCollector>().is_none());
    }

    #[test]
    fn publish_from_threads() {
        let publisher = Arc::new(EventsPublisher::new());
        publisher.add_subscriber(Box::new(EventsCollector::new()));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let publisher = publisher.clone();
                thread::spawn(move || {
                    for t in 0..25 {
                        publisher.publish_event(t, &no_vehicle(&format!("events-t{i}")));
                    }
                })
            })
            .collect();
        handles.into_iter().for_each(|h| h.join().unwrap());

        let collector = publisher.get_subscriber::<EventsCollector>().unwrap();
        assert_eq!(100, collector.events().len());
    }

    #[test]
    fn display() {
        let event = no_vehicle("events-p3");
        assert_eq!(
            "type=noCarSharingVehicle link=events-l1 carsharingType=rt person=events-p3",
            event.to_string()
        );
    }
}
