use std::sync::Arc;

use agvd_core::{IntegrationLevel, Result, TransportOrderState, Vehicle};
use agvd_store::ObjectService;
use tracing::{debug, info};

use super::Phase;
use crate::assignment::OrderAssigner;
use crate::order_util::TransportOrderUtil;
use crate::reservation::OrderReservationPool;

/// Assigns reserved orders to their vehicles once these are free.
pub struct AssignReservedOrdersPhase {
    object_service: Arc<dyn ObjectService>,
    reservation_pool: Arc<OrderReservationPool>,
    order_assigner: Arc<OrderAssigner>,
    order_util: Arc<TransportOrderUtil>,
}

impl AssignReservedOrdersPhase {
    pub fn new(
        object_service: Arc<dyn ObjectService>,
        reservation_pool: Arc<OrderReservationPool>,
        order_assigner: Arc<OrderAssigner>,
        order_util: Arc<TransportOrderUtil>,
    ) -> Self {
        Self {
            object_service,
            reservation_pool,
            order_assigner,
            order_util,
        }
    }

    fn check_for_reserved_order(&self, vehicle: &Vehicle) -> Result<()> {
        for order_name in self.reservation_pool.find_reservations(&vehicle.name) {
            let order = self.object_service.fetch_transport_order(&order_name)?;
            if order.state != TransportOrderState::Dispatchable {
                debug!("Dropping reservation of {} ({:?})", order_name, order.state);
                self.reservation_pool.remove_reservation(&order_name);
                continue;
            }

            let Some(candidate) = self.order_assigner.compute_candidate(vehicle, &order)? else {
                continue;
            };
            let reasons = self.order_assigner.filter_candidate(&candidate);
            if !reasons.is_empty() {
                debug!("Reserved order {} rejected: {:?}", order_name, reasons);
                continue;
            }

            info!("Assigning reserved order {} to {}", order_name, vehicle.name);
            return self.order_util.assign_transport_order(
                &vehicle.name,
                &order_name,
                candidate.drive_orders().to_vec(),
            );
        }
        Ok(())
    }
}

impl Phase for AssignReservedOrdersPhase {
    fn name(&self) -> &'static str {
        "assign_reserved_orders"
    }

    fn run(&self) -> Result<()> {
        let vehicles = self.object_service.fetch_vehicles(&|v| {
            v.has_no_order()
                && v.integration_level == IntegrationLevel::ToBeUtilized
                && v.current_position.is_some()
                && !v.paused
        })?;
        for vehicle in vehicles {
            self.check_for_reserved_order(&vehicle)?;
        }
        Ok(())
    }
}
