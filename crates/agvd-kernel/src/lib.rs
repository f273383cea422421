//! # agvd Kernel
//!
//! Hosts one dispatcher together with a shortest-path router and loopback
//! vehicles that drive the routes they are given.

pub mod config;
pub mod kernel;
pub mod loopback;
pub mod router;
pub mod state;

pub use config::{KernelConfig, PlantConfig};
pub use kernel::{Kernel, KernelSummary};
pub use loopback::{LoopbackController, LoopbackControllerPool};
pub use router::ShortestPathRouter;
pub use state::KernelState;
