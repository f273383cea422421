//! Vehicles as seen by the dispatcher.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::order::ORDER_TYPE_ANY;
use crate::types::{IntegrationLevel, ProcState, VehicleState};

/// How a vehicle's acceptable order types match a given order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OrderTypeMatch {
    /// The type itself is acceptable, with the given priority.
    Exact(i32),
    /// Only the wildcard type matches, with the given priority.
    Wildcard(i32),
}

impl OrderTypeMatch {
    /// The configured priority; lower values are preferred.
    pub fn priority(&self) -> i32 {
        match self {
            OrderTypeMatch::Exact(priority) | OrderTypeMatch::Wildcard(priority) => *priority,
        }
    }
}

/// A mobile agent processing transport orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub name: String,

    pub state: VehicleState,

    pub proc_state: ProcState,

    pub integration_level: IntegrationLevel,

    /// Whether the vehicle has been paused.
    #[serde(default)]
    pub paused: bool,

    /// The point the vehicle is at, if known.
    pub current_position: Option<String>,

    pub transport_order: Option<String>,

    pub order_sequence: Option<String>,

    /// Energy level in percent (0-100).
    pub energy_level: u8,

    /// Below this level the vehicle only accepts recharge orders.
    pub energy_level_critical: u8,

    /// Above this level the vehicle is considered sufficiently charged.
    pub energy_level_good: u8,

    /// Order type -> priority; lower values are preferred.
    #[serde(default)]
    pub acceptable_order_types: BTreeMap<String, i32>,

    /// Resources allocated along the route, oldest first.
    #[serde(default)]
    pub allocated_resources: Vec<BTreeSet<String>>,

    /// Resources claimed for the route ahead, in travel order.
    #[serde(default)]
    pub claimed_resources: Vec<BTreeSet<String>>,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Vehicle {
    /// Create an idle vehicle that accepts any order type.
    pub fn new(name: impl Into<String>) -> Self {
        let mut acceptable_order_types = BTreeMap::new();
        acceptable_order_types.insert(ORDER_TYPE_ANY.to_string(), 0);
        Self {
            name: name.into(),
            state: VehicleState::Idle,
            proc_state: ProcState::Idle,
            integration_level: IntegrationLevel::ToBeUtilized,
            paused: false,
            current_position: None,
            transport_order: None,
            order_sequence: None,
            energy_level: 100,
            energy_level_critical: 30,
            energy_level_good: 90,
            acceptable_order_types,
            allocated_resources: Vec::new(),
            claimed_resources: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_position(mut self, point: impl Into<String>) -> Self {
        self.current_position = Some(point.into());
        self
    }

    pub fn with_energy_level(mut self, energy_level: u8) -> Self {
        self.energy_level = energy_level.min(100);
        self
    }

    pub fn with_state(mut self, state: VehicleState) -> Self {
        self.state = state;
        self
    }

    pub fn with_proc_state(mut self, proc_state: ProcState) -> Self {
        self.proc_state = proc_state;
        self
    }

    pub fn with_integration_level(mut self, level: IntegrationLevel) -> Self {
        self.integration_level = level;
        self
    }

    pub fn with_transport_order(mut self, order: impl Into<String>) -> Self {
        self.transport_order = Some(order.into());
        self
    }

    /// Replace the acceptable order types.
    pub fn with_acceptable_order_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = (S, i32)>,
        S: Into<String>,
    {
        self.acceptable_order_types = types.into_iter().map(|(t, p)| (t.into(), p)).collect();
        self
    }

    /// How this vehicle matches the given order type.
    ///
    /// An exact entry always takes precedence over the wildcard.
    pub fn order_type_match(&self, order_type: &str) -> Option<OrderTypeMatch> {
        if let Some(priority) = self.acceptable_order_types.get(order_type) {
            return Some(OrderTypeMatch::Exact(*priority));
        }
        self.acceptable_order_types
            .get(ORDER_TYPE_ANY)
            .map(|priority| OrderTypeMatch::Wildcard(*priority))
    }

    /// Returns true if orders of the given type may be assigned.
    pub fn accepts_order_type(&self, order_type: &str) -> bool {
        self.order_type_match(order_type).is_some()
    }

    pub fn is_energy_level_critical(&self) -> bool {
        self.energy_level <= self.energy_level_critical
    }

    pub fn is_energy_level_good(&self) -> bool {
        self.energy_level >= self.energy_level_good
    }

    /// Returns true if the vehicle is neither processing nor finishing an order.
    pub fn has_no_order(&self) -> bool {
        self.proc_state == ProcState::Idle && self.transport_order.is_none()
    }
}
