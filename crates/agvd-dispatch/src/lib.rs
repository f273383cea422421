//! # agvd Dispatch
//!
//! Assigns transport orders to vehicles, moves vehicles from one drive order
//! to the next and reroutes them while under way.
//!
//! Routing and vehicle communication are left to the [`Router`] and
//! [`VehicleControllerPool`] collaborators.

pub mod assignment;
pub mod candidate;
pub mod config;
pub mod dispatcher;
pub mod filter;
pub mod order_util;
pub mod phase;
pub mod priority;
pub mod reroute;
pub mod reservation;
pub mod services;
pub mod status;

#[cfg(test)]
pub(crate) mod test_support;

pub use assignment::{
    AssignmentState, OrderAssigner, TransportOrderAssignmentChecker, TransportOrderAssignmentVeto,
    VehicleSelector,
};
pub use candidate::AssignmentCandidate;
pub use config::{DispatcherConfig, RerouteTrigger, ReroutingImpossibleStrategy};
pub use dispatcher::DefaultDispatcher;
pub use reroute::RerouteUtil;
pub use reservation::OrderReservationPool;
pub use services::{MovementCommand, Router, VehicleController, VehicleControllerPool};
pub use status::DispatchingStatusMarker;
