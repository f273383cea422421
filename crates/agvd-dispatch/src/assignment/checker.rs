use std::fmt;
use std::sync::Arc;

use agvd_core::{
    IntegrationLevel, ProcState, Result, TransportOrder, TransportOrderState, VehicleState,
};
use agvd_store::ObjectService;
use serde::{Deserialize, Serialize};

use crate::reservation::OrderReservationPool;

/// Why a transport order may not be assigned to its intended vehicle directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportOrderAssignmentVeto {
    NoVeto,
    TransportOrderStateInvalid,
    TransportOrderPartOfOrderSequence,
    TransportOrderIntendedVehicleNotSet,
    VehicleProcessingStateInvalid,
    VehicleStateInvalid,
    VehicleIntegrationLevelInvalid,
    VehicleCurrentPositionUnknown,
    VehicleProcessingOrderSequence,
    VehicleReservedForOtherOrder,
}

impl TransportOrderAssignmentVeto {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoVeto => "NO_VETO",
            Self::TransportOrderStateInvalid => "TRANSPORT_ORDER_STATE_INVALID",
            Self::TransportOrderPartOfOrderSequence => "TRANSPORT_ORDER_PART_OF_ORDER_SEQUENCE",
            Self::TransportOrderIntendedVehicleNotSet => "TRANSPORT_ORDER_INTENDED_VEHICLE_NOT_SET",
            Self::VehicleProcessingStateInvalid => "VEHICLE_PROCESSING_STATE_INVALID",
            Self::VehicleStateInvalid => "VEHICLE_STATE_INVALID",
            Self::VehicleIntegrationLevelInvalid => "VEHICLE_INTEGRATION_LEVEL_INVALID",
            Self::VehicleCurrentPositionUnknown => "VEHICLE_CURRENT_POSITION_UNKNOWN",
            Self::VehicleProcessingOrderSequence => "VEHICLE_PROCESSING_ORDER_SEQUENCE",
            Self::VehicleReservedForOtherOrder => "VEHICLE_RESERVED_FOR_OTHER_ORDER",
        }
    }
}

impl fmt::Display for TransportOrderAssignmentVeto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks whether a transport order may be assigned to its intended vehicle
/// right away, bypassing the regular dispatch run.
pub struct TransportOrderAssignmentChecker {
    object_service: Arc<dyn ObjectService>,
    reservation_pool: Arc<OrderReservationPool>,
}

impl TransportOrderAssignmentChecker {
    pub fn new(
        object_service: Arc<dyn ObjectService>,
        reservation_pool: Arc<OrderReservationPool>,
    ) -> Self {
        Self {
            object_service,
            reservation_pool,
        }
    }

    /// The first veto that applies, or [`TransportOrderAssignmentVeto::NoVeto`].
    pub fn check_transport_order_assignment(
        &self,
        order: &TransportOrder,
    ) -> Result<TransportOrderAssignmentVeto> {
        use TransportOrderAssignmentVeto::*;

        if order.state != TransportOrderState::Dispatchable {
            return Ok(TransportOrderStateInvalid);
        }
        if order.is_part_of_sequence() {
            return Ok(TransportOrderPartOfOrderSequence);
        }
        let Some(vehicle_name) = order.intended_vehicle.as_deref() else {
            return Ok(TransportOrderIntendedVehicleNotSet);
        };

        let vehicle = self.object_service.fetch_vehicle(vehicle_name)?;
        if vehicle.proc_state != ProcState::Idle {
            return Ok(VehicleProcessingStateInvalid);
        }
        if !matches!(vehicle.state, VehicleState::Idle | VehicleState::Charging) {
            return Ok(VehicleStateInvalid);
        }
        if vehicle.integration_level != IntegrationLevel::ToBeUtilized {
            return Ok(VehicleIntegrationLevelInvalid);
        }
        if vehicle.current_position.is_none() {
            return Ok(VehicleCurrentPositionUnknown);
        }
        if vehicle.order_sequence.is_some() {
            return Ok(VehicleProcessingOrderSequence);
        }
        if self
            .reservation_pool
            .find_reservations(vehicle_name)
            .iter()
            .any(|reserved| reserved != &order.name)
        {
            return Ok(VehicleReservedForOtherOrder);
        }
        Ok(NoVeto)
    }
}
