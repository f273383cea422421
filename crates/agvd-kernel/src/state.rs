//! Shared kernel state.

use std::sync::Arc;

use agvd_dispatch::DefaultDispatcher;
use agvd_store::{InMemoryObjectService, ObjectService};
use anyhow::Context;
use tracing::info;

use crate::config::KernelConfig;
use crate::loopback::LoopbackControllerPool;
use crate::router::ShortestPathRouter;

/// Everything a running kernel holds on to.
#[derive(Clone)]
pub struct KernelState {
    pub store: Arc<InMemoryObjectService>,
    pub router: Arc<ShortestPathRouter>,
    pub controllers: Arc<LoopbackControllerPool>,
    pub dispatcher: Arc<DefaultDispatcher>,
}

impl KernelState {
    /// Build the plant model and wire the dispatcher to it.
    pub fn from_config(config: &KernelConfig) -> anyhow::Result<Self> {
        let store = Arc::new(InMemoryObjectService::new());
        let plant = &config.plant;

        for point in plant.points() {
            store.create_point(point)?;
        }
        for path in plant.paths() {
            let name = path.name.clone();
            store
                .create_path(path)
                .with_context(|| format!("creating path {}", name))?;
        }
        for vehicle in plant.vehicles() {
            store.create_vehicle(vehicle)?;
        }

        let object_service: Arc<dyn ObjectService> = store.clone();
        let router = Arc::new(ShortestPathRouter::new(object_service.clone()));
        let controllers = Arc::new(LoopbackControllerPool::new(store.clone())?);
        let dispatcher = Arc::new(
            DefaultDispatcher::new(
                config.dispatcher.clone(),
                object_service,
                router.clone(),
                controllers.clone(),
            )
            .context("configuring dispatcher")?,
        );

        for order in plant.orders()? {
            store.create_transport_order(order)?;
        }

        info!(
            "🏭 Plant loaded: {} points, {} paths, {} vehicles, {} orders",
            plant.points.len(),
            store.fetch_paths(&|_| true)?.len(),
            plant.vehicles.len(),
            plant.orders.len()
        );

        Ok(Self {
            store,
            router,
            controllers,
            dispatcher,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_state() {
        let state = KernelState::from_config(&KernelConfig::default()).unwrap();
        assert_eq!(state.store.fetch_vehicles(&|_| true).unwrap().len(), 2);
        assert_eq!(state.store.fetch_transport_orders(&|_| true).unwrap().len(), 3);
    }

    #[test]
    fn test_bad_priority_rejected() {
        let mut config = KernelConfig::default();
        config.dispatcher.order_priorities = vec!["BY_MOOD".to_string()];
        assert!(KernelState::from_config(&config).is_err());
    }
}
