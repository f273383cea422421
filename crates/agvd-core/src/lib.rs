//! # agvd Core
//!
//! Domain model for the agvd fleet dispatcher.
//!
//! This crate provides the fundamental building blocks:
//! - [`TransportOrder`] - A job made of drive-order legs
//! - [`Route`] - Costed sequence of steps
//! - [`Vehicle`] - An agent processing transport orders
//! - [`ObjectHistory`] - Append-only audit trail of an order
//! - [`FleetError`] - Error types

pub mod error;
pub mod history;
pub mod order;
pub mod plant;
pub mod route;
pub mod types;
pub mod vehicle;

// Re-exports for convenience
pub use error::{FleetError, Result};
pub use history::{EventCode, HistoryEntry, ObjectHistory, Supplement};
pub use order::{
    Destination, DriveOrder, OrderSequence, TransportOrder, TransportOrderBuilder, ORDER_TYPE_ANY,
    ORDER_TYPE_NONE,
};
pub use plant::{Path, Point};
pub use route::{Route, Step};
pub use types::*;
pub use vehicle::{OrderTypeMatch, Vehicle};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{FleetError, Result};
    pub use crate::history::{EventCode, HistoryEntry, Supplement};
    pub use crate::order::{Destination, DriveOrder, TransportOrder};
    pub use crate::route::{Route, Step};
    pub use crate::types::*;
    pub use crate::vehicle::Vehicle;
}
