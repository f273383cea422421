//! Collaborators the dispatcher drives but does not implement.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use agvd_core::{DriveOrder, Result, Step, TransportOrder, Vehicle};
use serde::{Deserialize, Serialize};

/// Computes routes and routing costs for vehicles.
pub trait Router: Send + Sync {
    /// Route the current and all future drive orders of `order` for `vehicle`,
    /// starting at `source_point`.
    ///
    /// Returns the drive orders with routes attached, or `None` if the vehicle
    /// cannot reach all destinations right now.
    fn get_route(
        &self,
        vehicle: &Vehicle,
        source_point: &str,
        order: &TransportOrder,
    ) -> Result<Option<Vec<DriveOrder>>>;

    /// Like [`Router::get_route`], but travelling locked paths is allowed.
    fn get_route_ignoring_path_locks(
        &self,
        vehicle: &Vehicle,
        source_point: &str,
        order: &TransportOrder,
    ) -> Result<Option<Vec<DriveOrder>>> {
        self.get_route(vehicle, source_point, order)
    }

    /// Cost of travelling from one point to another.
    fn get_costs(&self, vehicle: &Vehicle, source_point: &str, destination_point: &str)
        -> Result<i64>;

    /// Tell the router which route the vehicle is going to take, `None` for none.
    fn select_route(&self, vehicle: &Vehicle, drive_orders: Option<&[DriveOrder]>) -> Result<()>;

    /// Paths changed (e.g. locked or unlocked); recompute the routing tables.
    fn update_routing_topology(&self, paths: &BTreeSet<String>) -> Result<()>;

    /// Whether any vehicle can route the given order.
    fn check_routability(&self, order: &TransportOrder) -> Result<bool>;
}

/// A single movement command issued to a vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementCommand {
    /// The transport order this command belongs to.
    pub transport_order: String,

    pub step: Step,

    /// Operation executed after the step, NOP for intermediate steps.
    pub operation: String,

    /// Whether this is the last movement of its drive order.
    pub final_movement: bool,
}

/// Communicates with one vehicle.
pub trait VehicleController: Send + Sync {
    /// Start processing a drive order.
    fn set_drive_order(
        &self,
        drive_order: &DriveOrder,
        order_properties: &BTreeMap<String, String>,
    ) -> Result<()>;

    /// Replace the route of the drive order being processed.
    ///
    /// Steps already sent to the vehicle are part of the new drive order, too.
    fn update_drive_order(
        &self,
        drive_order: &DriveOrder,
        order_properties: &BTreeMap<String, String>,
    ) -> Result<()>;

    /// Stop processing the current drive order.
    ///
    /// Unless `immediate`, movements already sent are finished first.
    fn abort_drive_order(&self, immediate: bool) -> Result<()>;

    /// Commands issued for the drive order being processed, oldest first.
    ///
    /// Empty once the drive order is finished or aborted.
    fn commands_sent(&self) -> Vec<MovementCommand>;
}

/// Provides the controller for each vehicle.
pub trait VehicleControllerPool: Send + Sync {
    fn controller(&self, vehicle: &str) -> Result<Arc<dyn VehicleController>>;
}
