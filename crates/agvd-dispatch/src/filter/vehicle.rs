use std::collections::BTreeSet;
use std::sync::Arc;

use agvd_core::{IntegrationLevel, ProcState, TransportOrderState, Vehicle, VehicleState};
use agvd_store::ObjectService;

use super::{reason_if, SelectionFilter};
use crate::reservation::OrderReservationPool;

/// Accepts vehicles that may get a new transport order right now.
///
/// A vehicle qualifies while it processes nothing, or while it processes an
/// order that may be aborted in favour of another one.
pub struct IsAvailableForAnyOrder {
    object_service: Arc<dyn ObjectService>,
    reservation_pool: Arc<OrderReservationPool>,
}

impl IsAvailableForAnyOrder {
    pub fn new(
        object_service: Arc<dyn ObjectService>,
        reservation_pool: Arc<OrderReservationPool>,
    ) -> Self {
        Self {
            object_service,
            reservation_pool,
        }
    }

    fn processes_no_order(vehicle: &Vehicle) -> bool {
        vehicle.has_no_order()
            && matches!(vehicle.state, VehicleState::Idle | VehicleState::Charging)
    }

    fn processes_dispensable_order(&self, vehicle: &Vehicle) -> bool {
        if vehicle.proc_state != ProcState::ProcessingOrder {
            return false;
        }
        vehicle
            .transport_order
            .as_deref()
            .and_then(|name| self.object_service.fetch_transport_order(name).ok())
            .map(|order| order.dispensable && order.state == TransportOrderState::BeingProcessed)
            .unwrap_or(false)
    }

    fn needs_more_charging(vehicle: &Vehicle) -> bool {
        vehicle.state == VehicleState::Charging && vehicle.is_energy_level_critical()
    }
}

impl SelectionFilter<Vehicle> for IsAvailableForAnyOrder {
    fn apply(&self, vehicle: &Vehicle) -> BTreeSet<String> {
        [
            reason_if(
                vehicle.integration_level != IntegrationLevel::ToBeUtilized,
                || "vehicle is not to be utilized".to_string(),
            ),
            reason_if(vehicle.paused, || "vehicle is paused".to_string()),
            reason_if(vehicle.current_position.is_none(), || {
                "vehicle position is unknown".to_string()
            }),
            reason_if(vehicle.order_sequence.is_some(), || {
                "vehicle is processing an order sequence".to_string()
            }),
            reason_if(Self::needs_more_charging(vehicle), || {
                "vehicle needs more charging".to_string()
            }),
            reason_if(
                !Self::processes_no_order(vehicle) && !self.processes_dispensable_order(vehicle),
                || "vehicle is busy".to_string(),
            ),
            reason_if(
                !self.reservation_pool.find_reservations(&vehicle.name).is_empty(),
                || "vehicle has a reserved order".to_string(),
            ),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
