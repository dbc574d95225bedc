use std::any::Any;
use std::cell::RefCell;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use ahash::HashMap;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::simulation::error::{CarsharingError, CarsharingResult};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineArgs {
    #[arg(long, short)]
    pub config_path: String,
    /// Overrides the station file given in the carsharing module.
    #[arg(long, short)]
    pub stations: Option<String>,
}

#[derive(Serialize, Deserialize, Default)]
pub struct Config {
    modules: RefCell<HashMap<String, Box<dyn ConfigModule>>>,
}

impl Config {
    pub fn from_file(args: &CommandLineArgs) -> CarsharingResult<Self> {
        let reader = BufReader::new(File::open(&args.config_path)?);
        let config: Config = serde_yaml::from_reader(reader)?;
        info!("Loaded config from {}", args.config_path);

        if let Some(stations) = &args.stations {
            let mut carsharing = config.carsharing().ok_or_else(|| {
                CarsharingError::Config(String::from(
                    "Station file given on the command line, but no carsharing module configured.",
                ))
            })?;
            carsharing.stations = Some(stations.clone());
            config.set_carsharing(carsharing);
        }
        Ok(config)
    }

    pub fn carsharing(&self) -> Option<Carsharing> {
        self.module::<Carsharing>("carsharing")
    }

    pub fn set_carsharing(&self, carsharing: Carsharing) {
        self.modules
            .borrow_mut()
            .insert("carsharing".to_string(), Box::new(carsharing));
    }

    pub fn teleportation(&self) -> Option<Teleportation> {
        self.module::<Teleportation>("teleportation")
    }

    pub fn set_teleportation(&self, teleportation: Teleportation) {
        self.modules
            .borrow_mut()
            .insert("teleportation".to_string(), Box::new(teleportation));
    }

    pub fn output(&self) -> Output {
        if let Some(output) = self.module::<Output>("output") {
            output
        } else {
            let default = Output {
                output_dir: "./".to_string(),
                logging: Logging::None,
            };
            self.modules
                .borrow_mut()
                .insert("output".to_string(), Box::new(default.clone()));
            default
        }
    }

    pub fn set_output(&self, output: Output) {
        self.modules
            .borrow_mut()
            .insert("output".to_string(), Box::new(output));
    }

    pub fn simulation(&self) -> Simulation {
        if let Some(simulation) = self.module::<Simulation>("simulation") {
            simulation
        } else {
            let default = Simulation::default();
            self.modules
                .borrow_mut()
                .insert("simulation".to_string(), Box::new(default.clone()));
            default
        }
    }

    pub fn set_simulation(&self, simulation: Simulation) {
        self.modules
            .borrow_mut()
            .insert("simulation".to_string(), Box::new(simulation));
    }

    fn module<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        self.modules
            .borrow()
            .get(key)
            .and_then(|boxed| boxed.as_ref().as_any().downcast_ref::<T>().cloned())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Carsharing {
    /// Search radius in meters for two-way (round trip) vehicles.
    pub two_way_search_distance: f64,
    /// Search radius in meters for one-way vehicles and one-way parking spaces.
    pub one_way_search_distance: f64,
    #[serde(default)]
    pub stations: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Teleportation {
    #[serde(default = "default_walk_beeline_factor")]
    pub walk_beeline_factor: f64,
    #[serde(default = "default_walk_speed")]
    pub walk_speed: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Output {
    pub output_dir: String,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Simulation {
    pub start_time: u32,
    pub end_time: u32,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            start_time: 0,
            end_time: 86400,
        }
    }
}

/// Have this extra layer of log level enum, as tracing subscriber has no
/// off/none option by default. At least it can't be parsed
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub enum Logging {
    #[default]
    None,
    Info,
}

#[typetag::serde(tag = "type")]
pub trait ConfigModule {
    fn as_any(&self) -> &dyn Any;
}

#[typetag::serde]
impl ConfigModule for Carsharing {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[typetag::serde]
impl ConfigModule for Teleportation {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[typetag::serde]
impl ConfigModule for Output {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[typetag::serde]
impl ConfigModule for Simulation {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn default_walk_beeline_factor() -> f64 {
    1.3
}

fn default_walk_speed() -> f64 {
    3. / 3.6
}

/// The plain numeric parameters the carsharing agents need at run time. Extracted once from
/// [`Config`], so that it can be copied into agents running on different threads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarsharingConfig {
    pub two_way_search_distance: f64,
    pub one_way_search_distance: f64,
    pub walk_beeline_factor: f64,
    pub walk_speed: f64,
}

impl CarsharingConfig {
    pub fn from_config(config: &Config) -> CarsharingResult<Self> {
        let carsharing = config.carsharing().ok_or_else(|| {
            CarsharingError::Config(String::from("The carsharing module is missing."))
        })?;
        let teleportation = config.teleportation().ok_or_else(|| {
            CarsharingError::Config(String::from("The teleportation module is missing."))
        })?;

        let result = CarsharingConfig {
            two_way_search_distance: carsharing.two_way_search_distance,
            one_way_search_distance: carsharing.one_way_search_distance,
            walk_beeline_factor: teleportation.walk_beeline_factor,
            walk_speed: teleportation.walk_speed,
        };
        result.validate()?;
        Ok(result)
    }

    pub fn validate(&self) -> CarsharingResult<()> {
        Self::require_non_negative("two_way_search_distance", self.two_way_search_distance)?;
        Self::require_non_negative("one_way_search_distance", self.one_way_search_distance)?;
        Self::require_positive("walk_beeline_factor", self.walk_beeline_factor)?;
        Self::require_positive("walk_speed", self.walk_speed)
    }

    fn require_non_negative(name: &str, value: f64) -> CarsharingResult<()> {
        if value.is_finite() && value >= 0. {
            Ok(())
        } else {
            Err(CarsharingError::Config(format!(
                "{name} must be a finite, non negative number, but was {value}"
            )))
        }
    }

    fn require_positive(name: &str, value: f64) -> CarsharingResult<()> {
        if value.is_finite() && value > 0. {
            Ok(())
        } else {
            Err(CarsharingError::Config(format!(
                "{name} must be a finite, positive number, but was {value}"
            )))
        }
    }

    pub fn stations_path(config: &Config) -> Option<PathBuf> {
        config
            .carsharing()
            .and_then(|c| c.stations)
            .map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use crate::simulation::config::{
        Carsharing, CarsharingConfig, Config, Logging, Simulation, Teleportation,
    };
    use crate::simulation::error::CarsharingError;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn read_from_yaml() {
        let config = Config::default();
        config.set_carsharing(Carsharing {
            two_way_search_distance: 1000.,
            one_way_search_distance: 500.,
            stations: Some(String::from("stations.yml")),
        });
        config.set_teleportation(Teleportation {
            walk_beeline_factor: 1.3,
            walk_speed: 1.,
        });
        config.set_simulation(Simulation {
            start_time: 0,
            end_time: 42,
        });

        let yaml = serde_yaml::to_string(&config).expect("Failed to serialize yaml");
        let parsed_config: Config = serde_yaml::from_str(&yaml).expect("failed to parse config");

        let carsharing = parsed_config.carsharing().unwrap();
        assert_eq!(carsharing.two_way_search_distance, 1000.);
        assert_eq!(carsharing.one_way_search_distance, 500.);
        assert_eq!(carsharing.stations, Some(String::from("stations.yml")));
        assert_eq!(parsed_config.simulation().end_time, 42);
        assert_eq!(parsed_config.teleportation().unwrap().walk_speed, 1.);
    }

    #[test]
    fn read_carsharing_module() {
        let yaml = r#"
        modules:
          carsharing:
            type: Carsharing
            two_way_search_distance: 1000.
            one_way_search_distance: 800.
          teleportation:
            type: Teleportation
            walk_beeline_factor: 1.5
          output:
            type: Output
            output_dir: ./output
            logging: Info
        "#;
        let parsed_config: Config = serde_yaml::from_str(yaml).expect("failed to parse config");
        let cs_config = CarsharingConfig::from_config(&parsed_config).unwrap();

        assert_eq!(cs_config.two_way_search_distance, 1000.);
        assert_eq!(cs_config.one_way_search_distance, 800.);
        assert_eq!(cs_config.walk_beeline_factor, 1.5);
        assert_approx_eq!(cs_config.walk_speed, 0.8333, 1e-4);
        assert_eq!(parsed_config.output().logging, Logging::Info);
        assert_eq!(CarsharingConfig::stations_path(&parsed_config), None);
    }

    #[test]
    fn missing_module_is_an_error() {
        let yaml = r#"
        modules:
          teleportation:
            type: Teleportation
            walk_speed: 1.0
        "#;
        let parsed_config: Config = serde_yaml::from_str(yaml).expect("failed to parse config");
        let result = CarsharingConfig::from_config(&parsed_config);
        assert!(matches!(result, Err(CarsharingError::Config(_))));
    }

    #[test]
    fn reject_invalid_walk_speed() {
        let config = CarsharingConfig {
            two_way_search_distance: 100.,
            one_way_search_distance: 100.,
            walk_beeline_factor: 1.3,
            walk_speed: 0.,
        };
        assert!(matches!(config.validate(), Err(CarsharingError::Config(_))));

        let config = CarsharingConfig {
            walk_speed: 1.,
            one_way_search_distance: f64::NAN,
            ..config
        };
        assert!(matches!(config.validate(), Err(CarsharingError::Config(_))));
    }

    #[test]
    fn unparsable_number_fails() {
        let yaml = r#"
        modules:
          carsharing:
            type: Carsharing
            two_way_search_distance: far
            one_way_search_distance: 800.
        "#;
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }
}
