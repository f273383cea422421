//! The kernel's dispatch loop.

use std::collections::BTreeSet;

use agvd_core::TransportOrderState;
use agvd_store::{ObjectKind, ObjectService, SubscriptionFilter};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::KernelConfig;
use crate::state::KernelState;

/// Order outcome counts when the kernel stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelSummary {
    pub finished: usize,
    pub failed: usize,
    pub unroutable: usize,
    pub pending: usize,
}

/// Runs the dispatcher on a single task.
///
/// Dispatching happens on vehicle changes and periodically, never
/// concurrently.
pub struct Kernel {
    state: KernelState,
    tick_interval: Duration,
    redispatch_interval: Duration,
    exit_when_idle: bool,
}

impl Kernel {
    pub fn new(config: &KernelConfig) -> anyhow::Result<Self> {
        Ok(Self {
            state: KernelState::from_config(config)?,
            tick_interval: Duration::from_millis(config.tick_interval_ms.max(1)),
            redispatch_interval: Duration::from_millis(
                config.dispatcher.idle_vehicle_redispatching_interval_ms.max(1),
            ),
            exit_when_idle: config.exit_when_idle,
        })
    }

    pub fn state(&self) -> &KernelState {
        &self.state
    }

    /// Lock or unlock a path and tell the dispatcher about it.
    pub fn set_path_locked(&self, path: &str, locked: bool) -> anyhow::Result<()> {
        self.state.store.update_path_locked(path, locked)?;
        self.state
            .dispatcher
            .topology_changed(&BTreeSet::from([path.to_string()]))?;
        Ok(())
    }

    /// Run until interrupted or, with `exit_when_idle`, until every order
    /// reached a final state.
    pub async fn run(&self) -> anyhow::Result<KernelSummary> {
        info!("🔧 Kernel started");

        let mut vehicle_events = self
            .state
            .store
            .subscribe(SubscriptionFilter::kind(ObjectKind::Vehicle));
        let mut ticks = interval(self.tick_interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut redispatch = interval(self.redispatch_interval);
        redispatch.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        self.dispatch();

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("🛑 Shutdown requested");
                    break;
                }
                Some(event) = vehicle_events.next() => {
                    debug!("{} changed", event.name);
                    // One dispatch covers every change queued so far.
                    while vehicle_events.try_next().is_some() {}
                    self.dispatch();
                }
                _ = ticks.tick() => {
                    if let Err(e) = self.state.controllers.tick_all() {
                        warn!("Vehicle tick failed: {}", e);
                    }
                }
                _ = redispatch.tick() => {
                    debug!("Periodic dispatch");
                    self.dispatch();
                }
            }

            if self.exit_when_idle && self.is_idle()? {
                info!("✅ All transport orders processed");
                break;
            }
        }

        let summary = self.summary()?;
        info!(
            "📊 Finished: {}, failed: {}, unroutable: {}, pending: {}",
            summary.finished, summary.failed, summary.unroutable, summary.pending
        );
        Ok(summary)
    }

    fn dispatch(&self) {
        if let Err(e) = self.state.dispatcher.dispatch() {
            warn!("Dispatch failed: {}", e);
        }
    }

    fn is_idle(&self) -> anyhow::Result<bool> {
        let open = self
            .state
            .store
            .fetch_transport_orders(&|o| !o.state.is_final_state())?;
        Ok(open.is_empty() && !self.state.controllers.any_busy())
    }

    pub fn summary(&self) -> anyhow::Result<KernelSummary> {
        let mut summary = KernelSummary::default();
        for order in self.state.store.fetch_transport_orders(&|_| true)? {
            match order.state {
                TransportOrderState::Finished => summary.finished += 1,
                TransportOrderState::Failed => summary.failed += 1,
                TransportOrderState::Unroutable => summary.unroutable += 1,
                _ => summary.pending += 1,
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DestinationConfig, OrderConfig};

    fn fast_config() -> KernelConfig {
        let mut config = KernelConfig::default();
        config.tick_interval_ms = 2;
        config.dispatcher.idle_vehicle_redispatching_interval_ms = 20;
        config
    }

    #[tokio::test]
    async fn test_demo_runs_to_completion() {
        let kernel = Kernel::new(&fast_config()).unwrap();
        let summary = tokio::time::timeout(Duration::from_secs(10), kernel.run())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.finished, 3);
        assert_eq!(summary.pending, 0);

        let store = &kernel.state().store;
        let inspect = store.fetch_transport_order("TOrder-Inspect").unwrap();
        let ret = store.fetch_transport_order("TOrder-Return").unwrap();
        assert!(ret.finished_time >= inspect.finished_time);
        assert!(!kernel.state().controllers.any_busy());
    }

    #[tokio::test]
    async fn test_unroutable_order_dismissed() {
        let mut config = fast_config();
        config.plant.points.push("Z".to_string());
        config.plant.orders = vec![OrderConfig {
            name: Some("TOrder-Lost".to_string()),
            destinations: vec![DestinationConfig {
                point: "Z".to_string(),
                operation: "NOP".to_string(),
            }],
            order_type: None,
            intended_vehicle: None,
            dispensable: false,
            dependencies: BTreeSet::new(),
        }];

        let kernel = Kernel::new(&config).unwrap();
        let summary = tokio::time::timeout(Duration::from_secs(5), kernel.run())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.unroutable, 1);
    }

    #[test]
    fn test_path_lock_reaches_router() {
        let kernel = Kernel::new(&fast_config()).unwrap();
        kernel.set_path_locked("B--E", true).unwrap();
        assert!(kernel.state().store.fetch_path("B--E").unwrap().locked);
        assert!(kernel.set_path_locked("X--Y", true).is_err());
    }
}
