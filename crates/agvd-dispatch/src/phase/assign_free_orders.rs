use std::sync::Arc;

use agvd_core::{Result, TransportOrderState};
use agvd_store::ObjectService;
use tracing::debug;

use super::Phase;
use crate::assignment::{OrderAssigner, VehicleSelector};
use crate::filter::{CompositeTransportOrderSelectionFilter, SelectionFilter};

/// Assigns freely dispatchable orders to available vehicles.
pub struct AssignFreeOrdersPhase {
    object_service: Arc<dyn ObjectService>,
    vehicle_selector: Arc<VehicleSelector>,
    order_filter: CompositeTransportOrderSelectionFilter,
    order_assigner: Arc<OrderAssigner>,
}

impl AssignFreeOrdersPhase {
    pub fn new(
        object_service: Arc<dyn ObjectService>,
        vehicle_selector: Arc<VehicleSelector>,
        order_filter: CompositeTransportOrderSelectionFilter,
        order_assigner: Arc<OrderAssigner>,
    ) -> Self {
        Self {
            object_service,
            vehicle_selector,
            order_filter,
            order_assigner,
        }
    }
}

impl Phase for AssignFreeOrdersPhase {
    fn name(&self) -> &'static str {
        "assign_free_orders"
    }

    fn run(&self) -> Result<()> {
        let vehicles = self.vehicle_selector.available_vehicles()?;
        if vehicles.is_empty() {
            debug!("No vehicles available, skipping order assignment");
            return Ok(());
        }

        let orders: Vec<_> = self
            .object_service
            .fetch_transport_orders(&|o| o.state == TransportOrderState::Dispatchable)?
            .into_iter()
            .filter(|order| self.order_filter.apply(order).is_empty())
            .collect();
        if orders.is_empty() {
            return Ok(());
        }

        let state = self.order_assigner.try_assignments(&vehicles, &orders)?;
        debug!(
            "Assigned {}, reserved {}, rejected {} orders",
            state.assigned_candidates().len(),
            state.reserved_candidates().len(),
            state.filtered_orders().len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::default_order_filter;
    use crate::test_support::Fixture;

    fn phase(fixture: &Fixture) -> AssignFreeOrdersPhase {
        AssignFreeOrdersPhase::new(
            fixture.store.clone(),
            Arc::new(fixture.vehicle_selector()),
            default_order_filter(fixture.reservation_pool.clone()),
            Arc::new(fixture.order_assigner()),
        )
    }

    #[test]
    fn test_free_order_assigned() {
        let fixture = Fixture::new();
        fixture.vehicle("Vehicle-01", "A");
        fixture.dispatchable_order("TOrder-1", &["B"]);

        phase(&fixture).run().unwrap();

        let order = fixture.order("TOrder-1");
        assert_eq!(order.state, TransportOrderState::BeingProcessed);
        assert_eq!(order.processing_vehicle.as_deref(), Some("Vehicle-01"));
        assert_eq!(fixture.controllers.controller_for("Vehicle-01").drive_orders().len(), 1);
    }

    #[test]
    fn test_no_vehicles_leaves_orders_untouched() {
        let fixture = Fixture::new();
        fixture.dispatchable_order("TOrder-1", &["B"]);

        phase(&fixture).run().unwrap();

        let order = fixture.order("TOrder-1");
        assert_eq!(order.state, TransportOrderState::Dispatchable);
        assert_eq!(order.history.entries().len(), 1);
    }
}
