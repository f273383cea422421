//! Common state types used across the dispatcher.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a transport order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportOrderState {
    /// Created, not yet checked.
    #[default]
    Raw,
    /// Parameters checked, waiting for dependencies.
    Active,
    /// Ready to be assigned to a vehicle.
    Dispatchable,
    /// Assigned to and being processed by a vehicle.
    BeingProcessed,
    /// Withdrawn, waiting for the vehicle to stop processing it.
    Withdrawn,
    /// Successfully completed.
    Finished,
    /// Failed or aborted.
    Failed,
    /// No vehicle can route it.
    Unroutable,
}

impl TransportOrderState {
    /// Returns true if this is a terminal state.
    pub fn is_final_state(&self) -> bool {
        matches!(
            self,
            TransportOrderState::Finished
                | TransportOrderState::Failed
                | TransportOrderState::Unroutable
        )
    }
}

/// Progress of a single drive order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DriveOrderState {
    #[default]
    Pristine,
    Travelling,
    Operating,
    Finished,
    Failed,
}

/// Operational state reported by a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VehicleState {
    #[default]
    Unknown,
    Unavailable,
    Error,
    Idle,
    Executing,
    Charging,
}

/// Job-processing state of a vehicle, owned by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcState {
    /// Not processing any order.
    #[default]
    Idle,
    /// Finished a drive order, waiting for the next one.
    AwaitingOrder,
    /// Executing a drive order.
    ProcessingOrder,
}

/// Degree to which a vehicle is under dispatcher control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationLevel {
    /// Not known to the dispatcher at all.
    ToBeIgnored,
    /// Position is shown, nothing else.
    #[default]
    ToBeNoticed,
    /// Resources are respected, no orders are assigned.
    ToBeRespected,
    /// Fully available for transport orders.
    ToBeUtilized,
}

/// Direction in which a vehicle travels a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Forward,
    Backward,
    Undefined,
}

/// How a route step came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReroutingType {
    /// Part of a regular route.
    #[default]
    Regular,
    /// Produced by a forced reroute.
    Forced,
}
