//! Transport orders, their drive orders and order sequences.
//!
//! A [`TransportOrder`] is a job made of one or more [`DriveOrder`] legs that a
//! single vehicle processes in sequence.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FleetError, Result};
use crate::history::{EventCode, HistoryEntry, ObjectHistory, Supplement};
use crate::route::Route;
use crate::types::{DriveOrderState, TransportOrderState};

/// Order type matching every vehicle that accepts any type.
pub const ORDER_TYPE_ANY: &str = "*";

/// Order type assigned when none is given.
pub const ORDER_TYPE_NONE: &str = "-";

/// Where a drive order takes the vehicle and what it does there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Name of the destination point.
    pub destination: String,

    /// Operation to perform at the destination.
    pub operation: String,

    /// Additional properties for the vehicle driver.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Destination {
    /// No operation, the vehicle only moves there.
    pub const OP_NOP: &'static str = "NOP";
    /// Move to the point.
    pub const OP_MOVE: &'static str = "MOVE";
    /// Park at the point.
    pub const OP_PARK: &'static str = "PARK";

    pub fn new(destination: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            operation: operation.into(),
            properties: BTreeMap::new(),
        }
    }

    /// A destination with the NOP operation.
    pub fn point(destination: impl Into<String>) -> Self {
        Self::new(destination, Self::OP_NOP)
    }

    /// Returns true if nothing has to be done at the destination.
    pub fn is_nop(&self) -> bool {
        self.operation == Self::OP_NOP
    }
}

/// One leg of a transport order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveOrder {
    pub destination: Destination,

    /// Name of the transport order this leg belongs to.
    pub transport_order: String,

    /// The route, once computed.
    pub route: Option<Route>,

    pub state: DriveOrderState,
}

impl DriveOrder {
    pub fn new(destination: Destination) -> Self {
        Self {
            destination,
            transport_order: String::new(),
            route: None,
            state: DriveOrderState::Pristine,
        }
    }

    /// Set the route.
    pub fn with_route(mut self, route: Route) -> Self {
        self.route = Some(route);
        self
    }

    /// Set the owning transport order.
    pub fn with_transport_order(mut self, transport_order: impl Into<String>) -> Self {
        self.transport_order = transport_order.into();
        self
    }

    /// Set the state.
    pub fn with_state(mut self, state: DriveOrderState) -> Self {
        self.state = state;
        self
    }

    /// Cost of the route, zero if there is none.
    pub fn route_costs(&self) -> i64 {
        self.route.as_ref().map_or(0, Route::costs)
    }
}

/// A job: a sequence of drive orders processed by one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportOrder {
    /// Unique name of this order.
    pub name: String,

    /// The legs of this order.
    pub drive_orders: Vec<DriveOrder>,

    /// Index of the leg currently processed, `None` before the first one.
    current_drive_order_index: Option<usize>,

    pub state: TransportOrderState,

    /// The vehicle this order must be processed by, if any.
    pub intended_vehicle: Option<String>,

    /// The vehicle processing this order.
    pub processing_vehicle: Option<String>,

    /// Type tag matched against vehicles' acceptable order types.
    pub order_type: String,

    /// Whether the order may be aborted to free its vehicle.
    pub dispensable: bool,

    /// The order sequence this order belongs to.
    pub wrapping_sequence: Option<String>,

    /// Names of orders that must be finished before this one.
    #[serde(default)]
    pub dependencies: BTreeSet<String>,

    pub deadline: DateTime<Utc>,

    pub creation_time: DateTime<Utc>,

    pub finished_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    #[serde(default)]
    pub history: ObjectHistory,
}

impl TransportOrder {
    /// Create a new TransportOrderBuilder.
    pub fn builder() -> TransportOrderBuilder {
        TransportOrderBuilder::new()
    }

    pub fn current_drive_order_index(&self) -> Option<usize> {
        self.current_drive_order_index
    }

    /// The leg currently processed.
    pub fn current_drive_order(&self) -> Option<&DriveOrder> {
        self.current_drive_order_index
            .and_then(|index| self.drive_orders.get(index))
    }

    /// Legs already finished.
    pub fn past_drive_orders(&self) -> &[DriveOrder] {
        match self.current_drive_order_index {
            None => &[],
            Some(index) => &self.drive_orders[..index.min(self.drive_orders.len())],
        }
    }

    /// The current leg and all legs after it.
    pub fn current_and_future_drive_orders(&self) -> &[DriveOrder] {
        match self.current_drive_order_index {
            None => &self.drive_orders,
            Some(index) => &self.drive_orders[index.min(self.drive_orders.len())..],
        }
    }

    /// Legs after the current one.
    pub fn future_drive_orders(&self) -> &[DriveOrder] {
        match self.current_drive_order_index {
            None => &self.drive_orders,
            Some(index) => &self.drive_orders[(index + 1).min(self.drive_orders.len())..],
        }
    }

    /// Returns true if there is a leg after the current one.
    pub fn has_next_drive_order(&self) -> bool {
        !self.future_drive_orders().is_empty()
    }

    /// Advance to the next leg, finishing the current one.
    ///
    /// Moving past the last leg leaves no current drive order.
    pub fn advance_drive_order(&mut self) {
        let next = match self.current_drive_order_index {
            None => 0,
            Some(index) => {
                if let Some(current) = self.drive_orders.get_mut(index) {
                    current.state = DriveOrderState::Finished;
                }
                index + 1
            }
        };
        self.current_drive_order_index = Some(next.min(self.drive_orders.len()));
    }

    /// Replace the current and future legs, keeping finished ones.
    pub fn replace_future_drive_orders(&mut self, drive_orders: Vec<DriveOrder>) -> Result<()> {
        let keep = self.past_drive_orders().len();
        if drive_orders.len() != self.drive_orders.len() - keep {
            return Err(FleetError::IllegalState {
                name: self.name.clone(),
                message: format!(
                    "expected {} drive orders, got {}",
                    self.drive_orders.len() - keep,
                    drive_orders.len()
                ),
            });
        }
        self.drive_orders.truncate(keep);
        let name = self.name.clone();
        self.drive_orders.extend(
            drive_orders
                .into_iter()
                .map(|d| d.with_transport_order(name.clone())),
        );
        Ok(())
    }

    /// Sum of all route costs.
    pub fn total_route_costs(&self) -> i64 {
        self.drive_orders.iter().map(DriveOrder::route_costs).sum()
    }

    /// Returns true if the order belongs to an order sequence.
    pub fn is_part_of_sequence(&self) -> bool {
        self.wrapping_sequence.is_some()
    }
}

/// Builder for creating TransportOrders with a fluent API.
#[derive(Debug, Default)]
pub struct TransportOrderBuilder {
    name: Option<String>,
    destinations: Vec<Destination>,
    intended_vehicle: Option<String>,
    order_type: Option<String>,
    dispensable: bool,
    wrapping_sequence: Option<String>,
    dependencies: BTreeSet<String>,
    deadline: Option<DateTime<Utc>>,
    creation_time: Option<DateTime<Utc>>,
    properties: BTreeMap<String, String>,
}

impl TransportOrderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name; a unique one is generated otherwise.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a leg.
    pub fn destination(mut self, destination: Destination) -> Self {
        self.destinations.push(destination);
        self
    }

    /// Add a leg to a point with the NOP operation.
    pub fn to_point(self, point: impl Into<String>) -> Self {
        self.destination(Destination::point(point))
    }

    pub fn intended_vehicle(mut self, vehicle: impl Into<String>) -> Self {
        self.intended_vehicle = Some(vehicle.into());
        self
    }

    pub fn order_type(mut self, order_type: impl Into<String>) -> Self {
        self.order_type = Some(order_type.into());
        self
    }

    pub fn dispensable(mut self, dispensable: bool) -> Self {
        self.dispensable = dispensable;
        self
    }

    pub fn wrapping_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.wrapping_sequence = Some(sequence.into());
        self
    }

    pub fn dependency(mut self, order: impl Into<String>) -> Self {
        self.dependencies.insert(order.into());
        self
    }

    pub fn deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Override the creation time (defaults to now).
    pub fn creation_time(mut self, creation_time: DateTime<Utc>) -> Self {
        self.creation_time = Some(creation_time);
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Build the TransportOrder.
    pub fn build(self) -> Result<TransportOrder> {
        let name = self
            .name
            .unwrap_or_else(|| format!("TOrder-{}", Uuid::new_v4()));

        if self.destinations.is_empty() {
            return Err(FleetError::IllegalState {
                name,
                message: "a transport order needs at least one destination".to_string(),
            });
        }

        let drive_orders = self
            .destinations
            .into_iter()
            .map(|d| DriveOrder::new(d).with_transport_order(name.clone()))
            .collect();

        let creation_time = self.creation_time.unwrap_or_else(Utc::now);
        let mut history = ObjectHistory::new();
        history.append(HistoryEntry::new(EventCode::OrderCreated, Supplement::None));

        Ok(TransportOrder {
            name,
            drive_orders,
            current_drive_order_index: None,
            state: TransportOrderState::Raw,
            intended_vehicle: self.intended_vehicle,
            processing_vehicle: None,
            order_type: self.order_type.unwrap_or_else(|| ORDER_TYPE_NONE.to_string()),
            dispensable: self.dispensable,
            wrapping_sequence: self.wrapping_sequence,
            dependencies: self.dependencies,
            deadline: self
                .deadline
                .unwrap_or_else(|| creation_time + Duration::days(365)),
            creation_time,
            finished_time: None,
            properties: self.properties,
            history,
        })
    }
}

/// An ordered group of transport orders processed by the same vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSequence {
    pub name: String,

    /// Names of the member orders, in processing order.
    pub orders: Vec<String>,

    /// Whether more orders may be added.
    pub complete: bool,

    /// Whether all orders are processed.
    pub finished: bool,

    pub intended_vehicle: Option<String>,

    pub processing_vehicle: Option<String>,
}

impl OrderSequence {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            orders: Vec::new(),
            complete: false,
            finished: false,
            intended_vehicle: None,
            processing_vehicle: None,
        }
    }
}
