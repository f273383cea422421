//! Dispatcher configuration.

use serde::{Deserialize, Serialize};

use crate::priority::keys;

/// When vehicles that are under way get their routes recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RerouteTrigger {
    /// Only on explicit request.
    #[default]
    Never,
    /// Whenever a vehicle finishes a drive order.
    DriveOrderFinished,
    /// Whenever the routing topology changes.
    TopologyChange,
}

/// What to do when no route can be found for a vehicle's remaining way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReroutingImpossibleStrategy {
    /// Retry with path locks ignored, keep the current route if that fails too.
    #[default]
    IgnorePathLocks,
    /// Pause the vehicle and keep its current route.
    PauseImmediately,
    /// Keep the current route but stop before the first locked path.
    PauseAtPathLock,
}

/// Configuration for the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Criteria for sorting transport orders, most significant first.
    pub order_priorities: Vec<String>,

    /// Criteria for sorting vehicles, most significant first.
    pub vehicle_priorities: Vec<String>,

    /// Criteria for sorting assignment candidates, most significant first.
    pub candidate_priorities: Vec<String>,

    /// Orders with a deadline closer than this are considered at risk.
    pub deadline_at_risk_period_ms: i64,

    pub reroute_trigger: RerouteTrigger,

    pub rerouting_impossible_strategy: ReroutingImpossibleStrategy,

    /// Mark orders no vehicle can route as unroutable instead of dispatching them.
    pub dismiss_unroutable_transport_orders: bool,

    /// Order type that vehicles with a critical energy level still accept.
    pub recharge_order_type: String,

    /// Interval of the periodic dispatch run.
    pub idle_vehicle_redispatching_interval_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            order_priorities: vec![keys::BY_DEADLINE.to_string()],
            vehicle_priorities: vec![
                keys::IDLE_FIRST.to_string(),
                keys::BY_ENERGY_LEVEL.to_string(),
            ],
            candidate_priorities: vec![
                keys::BY_DEADLINE.to_string(),
                keys::IDLE_FIRST.to_string(),
                keys::BY_COMPLETE_ROUTING_COSTS.to_string(),
                keys::BY_ENERGY_LEVEL.to_string(),
            ],
            deadline_at_risk_period_ms: 60_000,
            reroute_trigger: RerouteTrigger::Never,
            rerouting_impossible_strategy: ReroutingImpossibleStrategy::IgnorePathLocks,
            dismiss_unroutable_transport_orders: true,
            recharge_order_type: "Charge".to_string(),
            idle_vehicle_redispatching_interval_ms: 10_000,
        }
    }
}

impl DispatcherConfig {
    /// A configuration applying only the fixed name tie-breakers.
    pub fn without_priorities() -> Self {
        Self {
            order_priorities: Vec::new(),
            vehicle_priorities: Vec::new(),
            candidate_priorities: Vec::new(),
            ..Self::default()
        }
    }
}
