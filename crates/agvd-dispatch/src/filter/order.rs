use std::collections::BTreeSet;
use std::sync::Arc;

use agvd_core::{TransportOrder, TransportOrderState};

use super::{reason_if, SelectionFilter};
use crate::reservation::OrderReservationPool;

/// Accepts orders any vehicle may be assigned in a regular dispatch run.
pub struct IsFreelyDispatchableToAnyVehicle {
    reservation_pool: Arc<OrderReservationPool>,
}

impl IsFreelyDispatchableToAnyVehicle {
    pub fn new(reservation_pool: Arc<OrderReservationPool>) -> Self {
        Self { reservation_pool }
    }
}

impl SelectionFilter<TransportOrder> for IsFreelyDispatchableToAnyVehicle {
    fn apply(&self, order: &TransportOrder) -> BTreeSet<String> {
        [
            reason_if(order.state != TransportOrderState::Dispatchable, || {
                format!("order is {:?}, not dispatchable", order.state)
            }),
            reason_if(order.is_part_of_sequence(), || {
                "order is part of an order sequence".to_string()
            }),
            reason_if(self.reservation_pool.is_reserved(&order.name), || {
                "order is reserved".to_string()
            }),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
