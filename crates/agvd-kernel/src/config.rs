//! Kernel configuration and the plant it operates.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path as FsPath;

use agvd_core::{Destination, IntegrationLevel, Path, Point, TransportOrder, Vehicle};
use agvd_dispatch::DispatcherConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "AGVD_CONFIG";

/// Configuration of one kernel instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub dispatcher: DispatcherConfig,

    /// Interval in which loopback vehicles advance by one step.
    pub tick_interval_ms: u64,

    /// Stop once every transport order is in a final state.
    pub exit_when_idle: bool,

    pub plant: PlantConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            dispatcher: DispatcherConfig::default(),
            tick_interval_ms: 250,
            exit_when_idle: true,
            plant: PlantConfig::demo(),
        }
    }
}

impl KernelConfig {
    /// Read a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<FsPath>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load the configuration named on the command line or in
    /// [`CONFIG_ENV`], falling back to the demo plant.
    pub fn load(arg: Option<String>) -> anyhow::Result<Self> {
        match arg.or_else(|| std::env::var(CONFIG_ENV).ok()) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

/// Points, paths, vehicles and initial transport orders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantConfig {
    pub points: Vec<String>,
    pub paths: Vec<PathConfig>,
    pub vehicles: Vec<VehicleConfig>,
    pub orders: Vec<OrderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    pub source: String,
    pub destination: String,
    pub length: i64,

    /// Also add the reverse path.
    #[serde(default)]
    pub bidirectional: bool,

    #[serde(default)]
    pub locked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub name: String,

    #[serde(default)]
    pub position: Option<String>,

    #[serde(default = "full_energy")]
    pub energy_level: u8,

    /// Order types and their priorities; any type when empty.
    #[serde(default)]
    pub acceptable_order_types: BTreeMap<String, i32>,

    #[serde(default = "to_be_utilized")]
    pub integration_level: IntegrationLevel,
}

fn full_energy() -> u8 {
    100
}

fn to_be_utilized() -> IntegrationLevel {
    IntegrationLevel::ToBeUtilized
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfig {
    /// Generated when missing.
    #[serde(default)]
    pub name: Option<String>,

    pub destinations: Vec<DestinationConfig>,

    #[serde(default)]
    pub order_type: Option<String>,

    #[serde(default)]
    pub intended_vehicle: Option<String>,

    #[serde(default)]
    pub dispensable: bool,

    #[serde(default)]
    pub dependencies: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    pub point: String,

    #[serde(default = "nop")]
    pub operation: String,
}

fn nop() -> String {
    Destination::OP_NOP.to_string()
}

impl PlantConfig {
    /// A small loop with a shortcut:
    ///
    /// ```text
    /// A --- B --- C
    /// |     |     |
    /// F --- E --- D
    /// ```
    pub fn demo() -> Self {
        let path = |source: &str, destination: &str, length: i64| PathConfig {
            source: source.to_string(),
            destination: destination.to_string(),
            length,
            bidirectional: true,
            locked: false,
        };
        let to = |point: &str, operation: &str| DestinationConfig {
            point: point.to_string(),
            operation: operation.to_string(),
        };

        Self {
            points: ["A", "B", "C", "D", "E", "F"].map(String::from).to_vec(),
            paths: vec![
                path("A", "B", 1000),
                path("B", "C", 1000),
                path("C", "D", 1500),
                path("D", "E", 1000),
                path("E", "F", 1000),
                path("F", "A", 1500),
                path("B", "E", 1200),
            ],
            vehicles: vec![
                VehicleConfig {
                    name: "Vehicle-01".to_string(),
                    position: Some("A".to_string()),
                    energy_level: 100,
                    acceptable_order_types: BTreeMap::new(),
                    integration_level: IntegrationLevel::ToBeUtilized,
                },
                VehicleConfig {
                    name: "Vehicle-02".to_string(),
                    position: Some("D".to_string()),
                    energy_level: 80,
                    acceptable_order_types: BTreeMap::from([("Transport".to_string(), 0)]),
                    integration_level: IntegrationLevel::ToBeUtilized,
                },
            ],
            orders: vec![
                OrderConfig {
                    name: Some("TOrder-Transport".to_string()),
                    destinations: vec![to("C", "Load"), to("F", "Unload")],
                    order_type: Some("Transport".to_string()),
                    intended_vehicle: None,
                    dispensable: false,
                    dependencies: BTreeSet::new(),
                },
                OrderConfig {
                    name: Some("TOrder-Inspect".to_string()),
                    destinations: vec![to("E", Destination::OP_NOP)],
                    order_type: None,
                    intended_vehicle: None,
                    dispensable: false,
                    dependencies: BTreeSet::new(),
                },
                OrderConfig {
                    name: Some("TOrder-Return".to_string()),
                    destinations: vec![to("B", Destination::OP_NOP)],
                    order_type: None,
                    intended_vehicle: None,
                    dispensable: false,
                    dependencies: BTreeSet::from(["TOrder-Inspect".to_string()]),
                },
            ],
        }
    }

    pub fn points(&self) -> Vec<Point> {
        self.points.iter().map(Point::new).collect()
    }

    pub fn paths(&self) -> Vec<Path> {
        self.paths
            .iter()
            .flat_map(|p| {
                let forward = Path::new(&p.source, &p.destination, p.length).with_locked(p.locked);
                let reverse = p
                    .bidirectional
                    .then(|| Path::new(&p.destination, &p.source, p.length).with_locked(p.locked));
                std::iter::once(forward).chain(reverse)
            })
            .collect()
    }

    pub fn vehicles(&self) -> Vec<Vehicle> {
        self.vehicles
            .iter()
            .map(|config| {
                let mut vehicle = Vehicle::new(&config.name)
                    .with_energy_level(config.energy_level)
                    .with_integration_level(config.integration_level);
                if let Some(position) = &config.position {
                    vehicle = vehicle.with_position(position);
                }
                if !config.acceptable_order_types.is_empty() {
                    vehicle = vehicle.with_acceptable_order_types(
                        config.acceptable_order_types.clone(),
                    );
                }
                vehicle
            })
            .collect()
    }

    pub fn orders(&self) -> agvd_core::Result<Vec<TransportOrder>> {
        self.orders
            .iter()
            .map(|config| {
                let mut builder = TransportOrder::builder().dispensable(config.dispensable);
                if let Some(name) = &config.name {
                    builder = builder.name(name);
                }
                for destination in &config.destinations {
                    builder = builder
                        .destination(Destination::new(&destination.point, &destination.operation));
                }
                if let Some(order_type) = &config.order_type {
                    builder = builder.order_type(order_type);
                }
                if let Some(vehicle) = &config.intended_vehicle {
                    builder = builder.intended_vehicle(vehicle);
                }
                for dependency in &config.dependencies {
                    builder = builder.dependency(dependency);
                }
                builder.build()
            })
            .collect()
    }
}
