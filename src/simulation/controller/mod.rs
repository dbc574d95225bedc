use std::sync::Arc;

use derive_builder::Builder;
use tracing::info;

use crate::simulation::carsharing::CarsharingVehicles;
use crate::simulation::config::{CarsharingConfig, Config};
use crate::simulation::error::{CarsharingError, CarsharingResult};
use crate::simulation::messaging::events::EventsPublisher;
use crate::simulation::network::Network;
use crate::simulation::routing::Router;

pub mod local_controller;

/// Everything a carsharing agent shares with all other agents. Cloning is cheap, all members are
/// reference counted.
#[derive(Builder, Clone, Debug)]
#[builder(pattern = "owned")]
pub struct CarsharingEnvironment {
    network: Arc<Network>,
    #[builder(default)]
    vehicles: CarsharingVehicles,
    router: Arc<dyn Router>,
    #[builder(default = "Arc::new(EventsPublisher::new())")]
    events: Arc<EventsPublisher>,
    config: CarsharingConfig,
}

impl CarsharingEnvironment {
    /// Sets up the environment from a config file. Stations are loaded from the file named in the
    /// carsharing module; without one, all registries start empty.
    pub fn from_config(
        config: &Config,
        network: Arc<Network>,
        router: Arc<dyn Router>,
    ) -> CarsharingResult<Self> {
        let cs_config = CarsharingConfig::from_config(config)?;
        let vehicles = match CarsharingConfig::stations_path(config) {
            Some(path) => CarsharingVehicles::from_yaml_file(&path, &network)?,
            None => {
                info!("No station file configured. Starting with empty station registries.");
                CarsharingVehicles::new()
            }
        };

        CarsharingEnvironmentBuilder::default()
            .network(network)
            .vehicles(vehicles)
            .router(router)
            .config(cs_config)
            .build()
            .map_err(|e| CarsharingError::Config(e.to_string()))
    }

    pub fn network(&self) -> &Arc<Network> {
        &self.network
    }

    pub fn vehicles(&self) -> &CarsharingVehicles {
        &self.vehicles
    }

    pub fn router(&self) -> &Arc<dyn Router> {
        &self.router
    }

    pub fn events(&self) -> &Arc<EventsPublisher> {
        &self.events
    }

    pub fn config(&self) -> &CarsharingConfig {
        &self.config
    }
}
