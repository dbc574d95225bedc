pub mod agents;
pub mod carsharing;
pub mod config;
pub mod controller;
pub mod error;
pub mod id;
pub mod logging;
pub mod messaging;
pub mod network;
pub mod population;
pub mod routing;
pub mod time_queue;
pub mod vehicles;
