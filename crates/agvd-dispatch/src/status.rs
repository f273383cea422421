//! Dispatching status recorded in transport order histories.

use std::collections::BTreeSet;
use std::sync::Arc;

use agvd_core::{EventCode, HistoryEntry, Result, TransportOrder};
use agvd_store::ObjectService;
use tracing::{debug, info};

const DEFERRAL_CODES: [EventCode; 2] = [
    EventCode::OrderDispatchingDeferred,
    EventCode::OrderDispatchingResumed,
];

/// Appends dispatching decisions to transport order histories.
///
/// Deferrals are only recorded when the reasons change, so repeated dispatch
/// runs with the same outcome leave the history untouched.
pub struct DispatchingStatusMarker {
    object_service: Arc<dyn ObjectService>,
}

impl DispatchingStatusMarker {
    pub fn new(object_service: Arc<dyn ObjectService>) -> Self {
        Self { object_service }
    }

    /// Whether the latest deferral-related entry says the order is deferred.
    pub fn is_order_marked_as_deferred(order: &TransportOrder) -> bool {
        order
            .history
            .latest_of(&DEFERRAL_CODES)
            .is_some_and(|entry| entry.event_code == EventCode::OrderDispatchingDeferred)
    }

    /// Whether `reasons` differ from those of the order's current deferral.
    ///
    /// True if the order is not currently deferred.
    pub fn have_deferral_reasons_for_order_changed(
        order: &TransportOrder,
        reasons: &BTreeSet<String>,
    ) -> bool {
        match order.history.latest_of(&DEFERRAL_CODES) {
            Some(entry) if entry.event_code == EventCode::OrderDispatchingDeferred => {
                let recorded: BTreeSet<&str> =
                    entry.supplement.reasons().iter().map(String::as_str).collect();
                recorded.len() != reasons.len()
                    || !reasons.iter().all(|r| recorded.contains(r.as_str()))
            }
            _ => true,
        }
    }

    /// Record that the order cannot be dispatched, unless already recorded
    /// with the same reasons.
    pub fn mark_order_as_deferred(&self, order_name: &str, reasons: &BTreeSet<String>) -> Result<()> {
        let order = self.object_service.fetch_transport_order(order_name)?;
        if Self::is_order_marked_as_deferred(&order)
            && !Self::have_deferral_reasons_for_order_changed(&order, reasons)
        {
            return Ok(());
        }

        info!("Deferring {}: {:?}", order_name, reasons);
        self.object_service.append_transport_order_history_entry(
            order_name,
            HistoryEntry::with_reasons(EventCode::OrderDispatchingDeferred, reasons.iter().cloned()),
        )
    }

    /// Record that a deferred order is dispatchable again.
    pub fn mark_order_as_resumed(&self, order_name: &str) -> Result<()> {
        debug!("Resuming {}", order_name);
        self.object_service.append_transport_order_history_entry(
            order_name,
            HistoryEntry::with_reasons(EventCode::OrderDispatchingResumed, Vec::<String>::new()),
        )
    }

    pub fn mark_order_as_assigned(&self, order_name: &str, vehicle_name: &str) -> Result<()> {
        self.object_service.append_transport_order_history_entry(
            order_name,
            HistoryEntry::with_text(EventCode::OrderAssignedToVehicle, vehicle_name),
        )
    }

    pub fn mark_order_as_reserved(&self, order_name: &str, vehicle_name: &str) -> Result<()> {
        self.object_service.append_transport_order_history_entry(
            order_name,
            HistoryEntry::with_text(EventCode::OrderReservedForVehicle, vehicle_name),
        )
    }
}
