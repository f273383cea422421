//! State transitions of transport orders and the vehicles processing them.

use std::sync::Arc;

use agvd_core::{DriveOrder, ProcState, Result, TransportOrder, TransportOrderState, Vehicle};
use agvd_store::ObjectService;
use tracing::{debug, info, warn};

use crate::reservation::OrderReservationPool;
use crate::services::{Router, VehicleControllerPool};
use crate::status::DispatchingStatusMarker;

/// Moves transport orders through their life cycle.
pub struct TransportOrderUtil {
    object_service: Arc<dyn ObjectService>,
    router: Arc<dyn Router>,
    controller_pool: Arc<dyn VehicleControllerPool>,
    reservation_pool: Arc<OrderReservationPool>,
    status_marker: Arc<DispatchingStatusMarker>,
    dismiss_unroutable_transport_orders: bool,
}

impl TransportOrderUtil {
    pub fn new(
        object_service: Arc<dyn ObjectService>,
        router: Arc<dyn Router>,
        controller_pool: Arc<dyn VehicleControllerPool>,
        reservation_pool: Arc<OrderReservationPool>,
        status_marker: Arc<DispatchingStatusMarker>,
        dismiss_unroutable_transport_orders: bool,
    ) -> Self {
        Self {
            object_service,
            router,
            controller_pool,
            reservation_pool,
            status_marker,
            dismiss_unroutable_transport_orders,
        }
    }

    /// Let `vehicle` process `order` along the given routed drive orders and
    /// send it the first one.
    pub fn assign_transport_order(
        &self,
        vehicle: &str,
        order: &str,
        drive_orders: Vec<DriveOrder>,
    ) -> Result<()> {
        info!("🚚 Assigning {} to {}", order, vehicle);

        self.object_service
            .update_vehicle_proc_state(vehicle, ProcState::ProcessingOrder)?;
        self.object_service
            .update_transport_order_processing_vehicle(order, Some(vehicle), drive_orders)?;
        self.object_service
            .update_vehicle_transport_order(vehicle, Some(order))?;
        self.object_service
            .update_transport_order_state(order, TransportOrderState::BeingProcessed)?;
        self.object_service
            .update_transport_order_next_drive_order(order)?;
        self.reservation_pool.remove_reservation(order);

        let vehicle_obj = self.object_service.fetch_vehicle(vehicle)?;
        let order_obj = self.object_service.fetch_transport_order(order)?;
        self.router.select_route(
            &vehicle_obj,
            Some(order_obj.current_and_future_drive_orders()),
        )?;
        self.status_marker.mark_order_as_assigned(order, vehicle)?;

        if let Some(first) = order_obj.current_drive_order() {
            self.controller_pool
                .controller(vehicle)?
                .set_drive_order(first, &order_obj.properties)?;
        }
        Ok(())
    }

    /// Promote new orders towards DISPATCHABLE.
    ///
    /// RAW orders become ACTIVE, or UNROUTABLE if no vehicle could route them
    /// and such orders are to be dismissed. ACTIVE orders become DISPATCHABLE
    /// once all orders they depend on are in a final state.
    pub fn check_new_orders(&self) -> Result<()> {
        for order in self
            .object_service
            .fetch_transport_orders(&|o| o.state == TransportOrderState::Raw)?
        {
            if self.dismiss_unroutable_transport_orders && !self.router.check_routability(&order)? {
                warn!("Order {} cannot be routed, marking it unroutable", order.name);
                self.object_service
                    .update_transport_order_state(&order.name, TransportOrderState::Unroutable)?;
            } else {
                self.object_service
                    .update_transport_order_state(&order.name, TransportOrderState::Active)?;
            }
        }

        for order in self
            .object_service
            .fetch_transport_orders(&|o| o.state == TransportOrderState::Active)?
        {
            if self.dependencies_finished(&order)? {
                debug!("Order {} is dispatchable", order.name);
                self.object_service
                    .update_transport_order_state(&order.name, TransportOrderState::Dispatchable)?;
            }
        }
        Ok(())
    }

    fn dependencies_finished(&self, order: &TransportOrder) -> Result<bool> {
        for dependency in &order.dependencies {
            match self.object_service.fetch_transport_order(dependency) {
                Ok(dep) if !dep.state.is_final_state() => return Ok(false),
                Ok(_) => {}
                Err(err) if err.is_recoverable() => {
                    warn!("Order {} depends on {}: {}", order.name, dependency, err);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(true)
    }

    /// Withdraw an order.
    ///
    /// An order without a processing vehicle fails right away. Otherwise the
    /// vehicle is told to abort; the order fails once the vehicle is done.
    pub fn abort_order(&self, order_name: &str, immediate: bool) -> Result<()> {
        let order = self.object_service.fetch_transport_order(order_name)?;
        if order.state.is_final_state() {
            debug!("Order {} already in final state {:?}", order_name, order.state);
            return Ok(());
        }

        match order.processing_vehicle.as_deref() {
            Some(vehicle) => self.abort_order_by_vehicle(vehicle, immediate),
            None => {
                info!("Withdrawing unassigned order {}", order_name);
                self.reservation_pool.remove_reservation(order_name);
                self.object_service
                    .update_transport_order_state(order_name, TransportOrderState::Withdrawn)?;
                self.object_service
                    .update_transport_order_state(order_name, TransportOrderState::Failed)
            }
        }
    }

    /// Withdraw the order `vehicle` is processing, if any.
    pub fn abort_order_by_vehicle(&self, vehicle_name: &str, immediate: bool) -> Result<()> {
        let vehicle = self.object_service.fetch_vehicle(vehicle_name)?;
        let Some(order_name) = vehicle.transport_order.clone() else {
            debug!("Vehicle {} has no order to withdraw", vehicle_name);
            return Ok(());
        };
        let order = self.object_service.fetch_transport_order(&order_name)?;

        info!(
            "Withdrawing {} from {} (immediate: {})",
            order_name, vehicle_name, immediate
        );
        if !order.state.is_final_state() && order.state != TransportOrderState::Withdrawn {
            self.object_service
                .update_transport_order_state(&order_name, TransportOrderState::Withdrawn)?;
        }
        self.controller_pool
            .controller(vehicle_name)?
            .abort_drive_order(immediate)?;

        if immediate {
            self.finish_abortion(&order_name, &vehicle)?;
        }
        Ok(())
    }

    /// Fail a withdrawn order and release its vehicle.
    pub fn finish_abortion(&self, order_name: &str, vehicle: &Vehicle) -> Result<()> {
        info!("Order {} withdrawn from {}", order_name, vehicle.name);
        self.object_service
            .update_transport_order_state(order_name, TransportOrderState::Failed)?;
        self.release_vehicle(&vehicle.name)
    }

    /// Finish a processed order and release its vehicle.
    pub fn finish_order(&self, order_name: &str, vehicle_name: &str) -> Result<()> {
        info!("✅ Order {} finished by {}", order_name, vehicle_name);
        self.object_service
            .update_transport_order_state(order_name, TransportOrderState::Finished)?;
        self.release_vehicle(vehicle_name)
    }

    fn release_vehicle(&self, vehicle_name: &str) -> Result<()> {
        self.object_service
            .update_vehicle_proc_state(vehicle_name, ProcState::Idle)?;
        self.object_service
            .update_vehicle_transport_order(vehicle_name, None)?;
        let vehicle = self.object_service.fetch_vehicle(vehicle_name)?;
        self.router.select_route(&vehicle, None)
    }
}
