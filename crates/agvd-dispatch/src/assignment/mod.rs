//! Matching transport orders with vehicles.

mod assigner;
mod checker;
mod selector;
mod state;

pub use assigner::OrderAssigner;
pub use checker::{TransportOrderAssignmentChecker, TransportOrderAssignmentVeto};
pub use selector::VehicleSelector;
pub use state::AssignmentState;
