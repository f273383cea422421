//! Reservations of transport orders for vehicles that are still busy.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

/// Maps transport orders to the vehicle they are reserved for.
///
/// An order is reserved for at most one vehicle at a time.
#[derive(Debug, Default)]
pub struct OrderReservationPool {
    reservations: Mutex<HashMap<String, String>>,
}

impl OrderReservationPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `order` for `vehicle`, replacing any existing reservation of it.
    pub fn add_reservation(&self, order: &str, vehicle: &str) {
        debug!("Reserving {} for {}", order, vehicle);
        self.reservations
            .lock()
            .insert(order.to_string(), vehicle.to_string());
    }

    pub fn remove_reservation(&self, order: &str) {
        if self.reservations.lock().remove(order).is_some() {
            debug!("Removed reservation of {}", order);
        }
    }

    /// Drop every reservation held for `vehicle`.
    pub fn remove_reservations(&self, vehicle: &str) {
        self.reservations.lock().retain(|_, v| v != vehicle);
    }

    pub fn is_reserved(&self, order: &str) -> bool {
        self.reservations.lock().contains_key(order)
    }

    /// The vehicle `order` is reserved for.
    pub fn reserved_vehicle(&self, order: &str) -> Option<String> {
        self.reservations.lock().get(order).cloned()
    }

    /// Orders reserved for `vehicle`, sorted by name.
    pub fn find_reservations(&self, vehicle: &str) -> Vec<String> {
        let mut orders: Vec<String> = self
            .reservations
            .lock()
            .iter()
            .filter(|(_, v)| v.as_str() == vehicle)
            .map(|(order, _)| order.clone())
            .collect();
        orders.sort();
        orders
    }

    pub fn clear(&self) {
        self.reservations.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.reservations.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.lock().is_empty()
    }
}
