use std::sync::Arc;

use agvd_core::{DriveOrder, ProcState, ReroutingType, Result, TransportOrderState, Vehicle};
use agvd_store::ObjectService;
use tracing::debug;

use super::Phase;
use crate::config::RerouteTrigger;
use crate::order_util::TransportOrderUtil;
use crate::reroute::RerouteUtil;
use crate::services::VehicleControllerPool;

/// Moves vehicles that finished a drive order on to the next one, or
/// finishes their transport order.
pub struct AssignNextDriveOrdersPhase {
    object_service: Arc<dyn ObjectService>,
    controller_pool: Arc<dyn VehicleControllerPool>,
    order_util: Arc<TransportOrderUtil>,
    reroute_util: Arc<RerouteUtil>,
    reroute_trigger: RerouteTrigger,
}

impl AssignNextDriveOrdersPhase {
    pub fn new(
        object_service: Arc<dyn ObjectService>,
        controller_pool: Arc<dyn VehicleControllerPool>,
        order_util: Arc<TransportOrderUtil>,
        reroute_util: Arc<RerouteUtil>,
        reroute_trigger: RerouteTrigger,
    ) -> Self {
        Self {
            object_service,
            controller_pool,
            order_util,
            reroute_util,
            reroute_trigger,
        }
    }

    /// Advance `vehicle_name`'s transport order past the finished drive order.
    ///
    /// Drive orders that need neither movement nor an operation are skipped.
    pub fn check_for_next_drive_order(&self, vehicle_name: &str) -> Result<()> {
        loop {
            let vehicle = self.object_service.fetch_vehicle(vehicle_name)?;
            let Some(order_name) = vehicle.transport_order.clone() else {
                return Ok(());
            };

            self.object_service
                .update_transport_order_next_drive_order(&order_name)?;
            let order = self.object_service.fetch_transport_order(&order_name)?;

            let Some(next) = order.current_drive_order() else {
                self.order_util.finish_order(&order_name, vehicle_name)?;
                // A free vehicle may unblock deferred orders.
                return self.order_util.check_new_orders();
            };

            if !must_assign(next, &vehicle) {
                debug!(
                    "Skipping drive order to {} of {}",
                    next.destination.destination, order_name
                );
                self.object_service
                    .update_vehicle_proc_state(vehicle_name, ProcState::AwaitingOrder)?;
                continue;
            }

            if self.reroute_trigger == RerouteTrigger::DriveOrderFinished {
                self.reroute_util.reroute(&vehicle, ReroutingType::Regular)?;
            }

            // The reroute may have replaced the drive order.
            let order = self.object_service.fetch_transport_order(&order_name)?;
            if let Some(next) = order.current_drive_order() {
                debug!(
                    "Sending drive order to {} to {}",
                    next.destination.destination, vehicle_name
                );
                self.controller_pool
                    .controller(vehicle_name)?
                    .set_drive_order(next, &order.properties)?;
            }
            return self
                .object_service
                .update_vehicle_proc_state(vehicle_name, ProcState::ProcessingOrder);
        }
    }
}

/// Whether the vehicle has to move or operate for this drive order.
fn must_assign(drive_order: &DriveOrder, vehicle: &Vehicle) -> bool {
    let destination = drive_order
        .route
        .as_ref()
        .and_then(|r| r.final_destination_point())
        .unwrap_or(&drive_order.destination.destination);
    vehicle.current_position.as_deref() != Some(destination) || !drive_order.destination.is_nop()
}

impl Phase for AssignNextDriveOrdersPhase {
    fn name(&self) -> &'static str {
        "assign_next_drive_orders"
    }

    fn run(&self) -> Result<()> {
        let vehicles = self.object_service.fetch_vehicles(&|v| {
            v.proc_state == ProcState::AwaitingOrder && v.transport_order.is_some()
        })?;
        for vehicle in vehicles {
            let Some(order_name) = vehicle.transport_order.as_deref() else {
                continue;
            };
            let order = self.object_service.fetch_transport_order(order_name)?;
            if order.state == TransportOrderState::BeingProcessed {
                self.check_for_next_drive_order(&vehicle.name)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatcherConfig;
    use crate::test_support::Fixture;
    use agvd_core::{Destination, EventCode, TransportOrder};

    fn finish_leg(fixture: &Fixture, vehicle: &str, position: &str) {
        fixture
            .store
            .update_vehicle_position(vehicle, Some(position))
            .unwrap();
        fixture
            .store
            .update_vehicle_proc_state(vehicle, ProcState::AwaitingOrder)
            .unwrap();
    }

    #[test]
    fn test_next_leg_sent() {
        let fixture = Fixture::new();
        fixture.vehicle("Vehicle-01", "A");
        fixture.dispatchable_order("TOrder-1", &["B", "C"]);
        fixture.assign("Vehicle-01", "TOrder-1");
        let phase = fixture.assign_next_drive_orders_phase();

        finish_leg(&fixture, "Vehicle-01", "B");
        phase.run().unwrap();

        let sent = fixture.controllers.controller_for("Vehicle-01").drive_orders();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].destination.destination, "C");
        assert_eq!(
            fixture.vehicle_obj("Vehicle-01").proc_state,
            ProcState::ProcessingOrder
        );
        assert_eq!(fixture.order("TOrder-1").current_drive_order_index(), Some(1));
    }

    #[test]
    fn test_last_leg_finishes_order() {
        let fixture = Fixture::new();
        fixture.vehicle("Vehicle-01", "A");
        fixture.dispatchable_order("TOrder-1", &["B"]);
        fixture.assign("Vehicle-01", "TOrder-1");
        fixture.raw_order("TOrder-2", &["C"]);
        let phase = fixture.assign_next_drive_orders_phase();

        finish_leg(&fixture, "Vehicle-01", "B");
        phase.run().unwrap();

        let order = fixture.order("TOrder-1");
        assert_eq!(order.state, TransportOrderState::Finished);
        assert_eq!(order.history.count_of(&EventCode::OrderReachedFinalState), 1);
        assert!(fixture.vehicle_obj("Vehicle-01").has_no_order());
        assert!(!fixture.router.selected("Vehicle-01"));
        assert_eq!(fixture.order("TOrder-2").state, TransportOrderState::Dispatchable);
    }

    #[test]
    fn test_nop_legs_at_position_skipped() {
        let fixture = Fixture::new();
        fixture.vehicle("Vehicle-01", "A");
        fixture
            .store
            .create_transport_order(
                TransportOrder::builder()
                    .name("TOrder-1")
                    .to_point("B")
                    .to_point("B")
                    .to_point("B")
                    .destination(Destination::new("B", "Load"))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        fixture.make_dispatchable("TOrder-1");
        fixture.assign("Vehicle-01", "TOrder-1");
        let phase = fixture.assign_next_drive_orders_phase();

        finish_leg(&fixture, "Vehicle-01", "B");
        phase.run().unwrap();

        let order = fixture.order("TOrder-1");
        assert_eq!(order.current_drive_order_index(), Some(3));
        let sent = fixture.controllers.controller_for("Vehicle-01").drive_orders();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].destination.operation, "Load");
    }

    #[test]
    fn test_reroutes_at_leg_boundary() {
        let fixture = Fixture::with_config(DispatcherConfig {
            reroute_trigger: RerouteTrigger::DriveOrderFinished,
            ..DispatcherConfig::default()
        });
        fixture.vehicle("Vehicle-01", "A");
        fixture.dispatchable_order("TOrder-1", &["B", "D"]);
        fixture.assign("Vehicle-01", "TOrder-1");
        fixture.router.set_via("B", "D", &["E"]);
        let phase = fixture.assign_next_drive_orders_phase();

        finish_leg(&fixture, "Vehicle-01", "B");
        phase.run().unwrap();

        let controller = fixture.controllers.controller_for("Vehicle-01");
        let sent = controller.drive_orders();
        let route = sent[1].route.clone().unwrap();
        assert_eq!(route.steps().len(), 2);
        assert_eq!(route.steps()[0].destination_point, "E");
        assert!(controller.updated_drive_orders().is_empty());
    }
}
