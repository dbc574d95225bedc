use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::simulation::carsharing::registry::StationRegistry;
use crate::simulation::carsharing::station::Station;
use crate::simulation::carsharing::Scheme;
use crate::simulation::error::{CarsharingError, CarsharingResult};
use crate::simulation::id::Id;
use crate::simulation::network::Network;

/// One station as written in a stations file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StationDefinition {
    pub link: String,
    #[serde(default)]
    pub vehicles: Vec<String>,
    /// Number of parking spaces. Only for one-way stations, where it is required.
    #[serde(default)]
    pub capacity: Option<usize>,
}

/// Layout of a stations file:
///
/// ```yaml
/// two_way:
///   - link: "1"
///     vehicles: ["tw-1", "tw-2"]
/// one_way:
///   - link: "5"
///     vehicles: ["ow-1"]
///     capacity: 4
/// free_floating:
///   - link: "9"
///     vehicles: ["ff-1"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StationsDefinition {
    #[serde(default)]
    pub two_way: Vec<StationDefinition>,
    #[serde(default)]
    pub one_way: Vec<StationDefinition>,
    #[serde(default)]
    pub free_floating: Vec<StationDefinition>,
}

/// The station registries of all three schemes. Registries are shared between all agents.
#[derive(Debug, Clone)]
pub struct CarsharingVehicles {
    two_way: Arc<StationRegistry>,
    one_way: Arc<StationRegistry>,
    free_floating: Arc<StationRegistry>,
}

impl Default for CarsharingVehicles {
    fn default() -> Self {
        CarsharingVehicles {
            two_way: Arc::new(StationRegistry::new(Scheme::TwoWay)),
            one_way: Arc::new(StationRegistry::new(Scheme::OneWay)),
            free_floating: Arc::new(StationRegistry::new(Scheme::FreeFloating)),
        }
    }
}

impl CarsharingVehicles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_file(path: &Path, network: &Network) -> CarsharingResult<Self> {
        info!("Loading carsharing stations from {path:?}");
        let reader = BufReader::new(File::open(path)?);
        let definition: StationsDefinition = serde_yaml::from_reader(reader)?;
        let result = Self::from_definition(&definition, network)?;
        info!(
            "Loaded {} two-way, {} one-way and {} free-floating stations",
            result.two_way.len(),
            result.one_way.len(),
            result.free_floating.len()
        );
        Ok(result)
    }

    pub fn from_definition(
        definition: &StationsDefinition,
        network: &Network,
    ) -> CarsharingResult<Self> {
        let result = CarsharingVehicles::new();
        for (scheme, stations) in [
            (Scheme::TwoWay, &definition.two_way),
            (Scheme::OneWay, &definition.one_way),
            (Scheme::FreeFloating, &definition.free_floating),
        ] {
            let registry = result.registry(scheme);
            for def in stations {
                registry.add_station(Self::create_station(scheme, def, network)?)?;
            }
        }
        Ok(result)
    }

    fn create_station(
        scheme: Scheme,
        def: &StationDefinition,
        network: &Network,
    ) -> CarsharingResult<Station> {
        let link = Id::create(&def.link);
        let coord = network.link_coord(&link)?;
        let vehicles = def.vehicles.iter().map(|v| Id::create(v)).collect();

        match (scheme, def.capacity) {
            (Scheme::OneWay, Some(capacity)) if capacity >= def.vehicles.len() => {
                Ok(Station::with_parking(link, coord, vehicles, capacity))
            }
            (Scheme::OneWay, Some(capacity)) => Err(CarsharingError::Config(format!(
                "One-way station at link {link} holds {} vehicles, but has only {capacity} parking spaces",
                def.vehicles.len()
            ))),
            (Scheme::OneWay, None) => Err(CarsharingError::Config(format!(
                "One-way station at link {link} has no capacity"
            ))),
            (_, None) => Ok(Station::new(link, coord, vehicles)),
            (_, Some(_)) => Err(CarsharingError::Config(format!(
                "{scheme:?} station at link {link} must not have a parking capacity"
            ))),
        }
    }

    pub fn registry(&self, scheme: Scheme) -> &Arc<StationRegistry> {
        match scheme {
            Scheme::TwoWay => &self.two_way,
            Scheme::OneWay => &self.one_way,
            Scheme::FreeFloating => &self.free_floating,
        }
    }

    pub fn two_way(&self) -> &Arc<StationRegistry> {
        &self.two_way
    }

    pub fn one_way(&self) -> &Arc<StationRegistry> {
        &self.one_way
    }

    pub fn free_floating(&self) -> &Arc<StationRegistry> {
        &self.free_floating
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::simulation::carsharing::vehicles::{
        CarsharingVehicles, StationDefinition, StationsDefinition,
    };
    use crate::simulation::carsharing::Scheme;
    use crate::simulation::error::CarsharingError;
    use crate::simulation::id::Id;
    use crate::simulation::network::{Network, Node};

    fn network() -> Network {
        let mut network = Network::new();
        network.add_node(Node::new(Id::create("load-n1"), 0., 0.));
        network.add_node(Node::new(Id::create("load-n2"), 1000., 0.));
        network.add_link(
            Id::create("load-l1"),
            Id::create("load-n1"),
            Id::create("load-n2"),
            1000.,
            10.,
        );
        network.add_link(
            Id::create("load-l2"),
            Id::create("load-n2"),
            Id::create("load-n1"),
            1000.,
            10.,
        );
        network
    }

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
two_way:
  - link: load-l1
    vehicles: [load-tw-1, load-tw-2]
one_way:
  - link: load-l2
    vehicles: [load-ow-1]
    capacity: 3
free_floating:
  - link: load-l1
    vehicles: [load-ff-1]
"#;
        let dir = std::env::temp_dir().join("carsharing_qsim_load_from_yaml_file");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("stations.yml");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(yaml.as_bytes())
            .unwrap();

        let vehicles = CarsharingVehicles::from_yaml_file(&path, &network()).unwrap();

        assert_eq!(2, vehicles.two_way().available_vehicles(&Id::create("load-l1")));
        assert_eq!(
            Some(1),
            vehicles
                .one_way()
                .occupied_parking_spaces(&Id::create("load-l2"))
        );
        let station = vehicles
            .registry(Scheme::FreeFloating)
            .station(&Id::create("load-l1"))
            .unwrap();
        assert_eq!(500., station.coord().x());
        assert_eq!(1, station.vehicles().len());
    }

    #[test]
    fn one_way_needs_capacity() {
        let definition = StationsDefinition {
            one_way: vec![StationDefinition {
                link: String::from("load-l1"),
                vehicles: vec![String::from("load-ow-2"), String::from("load-ow-3")],
                capacity: Some(1),
            }],
            ..Default::default()
        };
        let result = CarsharingVehicles::from_definition(&definition, &network());
        assert!(matches!(result, Err(CarsharingError::Config(_))));

        let definition = StationsDefinition {
            one_way: vec![StationDefinition {
                link: String::from("load-l1"),
                vehicles: vec![],
                capacity: None,
            }],
            ..Default::default()
        };
        let result = CarsharingVehicles::from_definition(&definition, &network());
        assert!(matches!(result, Err(CarsharingError::Config(_))));
    }

    #[test]
    fn unknown_link() {
        let definition = StationsDefinition {
            two_way: vec![StationDefinition {
                link: String::from("load-unknown"),
                vehicles: vec![],
                capacity: None,
            }],
            ..Default::default()
        };
        let result = CarsharingVehicles::from_definition(&definition, &network());
        assert!(matches!(result, Err(CarsharingError::UnknownLink(_))));
    }
}
