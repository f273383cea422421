//! Error types for the agvd dispatcher.

use thiserror::Error;

/// Main error type for agvd operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FleetError {
    /// An assignment candidate was constructed from inconsistent parts.
    #[error("Invalid assignment candidate: {0}")]
    InvalidCandidate(String),

    /// A referenced object does not exist.
    #[error("Object unknown: {kind} with name {name}")]
    ObjectUnknown { kind: String, name: String },

    /// An object cannot perform the requested transition.
    #[error("Illegal state for {name}: {message}")]
    IllegalState { name: String, message: String },

    /// Configuration values are missing or inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A direct assignment was refused.
    #[error("Assignment of {order} vetoed: {veto}")]
    AssignmentVetoed { order: String, veto: String },

    /// No route could be computed where one was required.
    #[error("No route for {order} with vehicle {vehicle}")]
    Unroutable { order: String, vehicle: String },

    /// The routing collaborator failed.
    #[error("Routing error: {0}")]
    RoutingError(String),

    /// A vehicle controller rejected or failed a command.
    #[error("Vehicle controller error for {vehicle}: {message}")]
    ControllerError { vehicle: String, message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl FleetError {
    /// Shorthand for an unknown object.
    pub fn unknown(kind: &str, name: impl Into<String>) -> Self {
        FleetError::ObjectUnknown {
            kind: kind.to_string(),
            name: name.into(),
        }
    }

    /// Returns true if retrying the dispatch cycle later may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            FleetError::ObjectUnknown { .. } => true,
            FleetError::Unroutable { .. } => true,
            FleetError::RoutingError(_) => true,
            FleetError::ControllerError { .. } => true,
            _ => false,
        }
    }
}

/// Convenience Result type for agvd operations.
pub type Result<T> = std::result::Result<T, FleetError>;

impl From<serde_json::Error> for FleetError {
    fn from(err: serde_json::Error) -> Self {
        FleetError::SerializationError(err.to_string())
    }
}
