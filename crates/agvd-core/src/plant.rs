//! Plant model elements the dispatcher needs to know about.

use serde::{Deserialize, Serialize};

/// A position vehicles can occupy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub name: String,
}

impl Point {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A directed connection between two points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    /// Unique name of the path.
    pub name: String,

    /// The point the path starts at.
    pub source_point: String,

    /// The point the path ends at.
    pub destination_point: String,

    /// Length of the path in mm, used as routing cost by simple routers.
    pub length: i64,

    /// Locked paths must not be travelled.
    pub locked: bool,
}

impl Path {
    /// Create an unlocked path named `<source>--<destination>`.
    pub fn new(source: impl Into<String>, destination: impl Into<String>, length: i64) -> Self {
        let source = source.into();
        let destination = destination.into();
        Self {
            name: format!("{}--{}", source, destination),
            source_point: source,
            destination_point: destination,
            length,
            locked: false,
        }
    }

    /// Set the lock flag.
    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }
}
