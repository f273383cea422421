//! # agvd Store
//!
//! The object service the dispatcher queries and updates, with an in-memory
//! implementation that publishes change events.

pub mod service;
pub mod store;
pub mod subscription;

pub use service::ObjectService;
pub use store::InMemoryObjectService;
pub use subscription::{
    ChangeType, ObjectChangeEvent, ObjectKind, ObjectSubscription, SubscriptionFilter,
};
