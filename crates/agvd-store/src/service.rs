//! The object service boundary the dispatcher works against.

use agvd_core::{
    DriveOrder, HistoryEntry, OrderSequence, Path, ProcState, Result, TransportOrder,
    TransportOrderState, Vehicle,
};

/// Query and update access to the domain objects of one plant.
///
/// Fetches return owned snapshots; updates are applied immediately. Callers
/// are expected to use one service from a single dispatching context at a
/// time.
pub trait ObjectService: Send + Sync {
    /// Get a transport order by name.
    fn fetch_transport_order(&self, name: &str) -> Result<TransportOrder>;

    /// Get all transport orders matching a predicate, ordered by name.
    fn fetch_transport_orders(
        &self,
        predicate: &dyn Fn(&TransportOrder) -> bool,
    ) -> Result<Vec<TransportOrder>>;

    /// Get a vehicle by name.
    fn fetch_vehicle(&self, name: &str) -> Result<Vehicle>;

    /// Get all vehicles matching a predicate, ordered by name.
    fn fetch_vehicles(&self, predicate: &dyn Fn(&Vehicle) -> bool) -> Result<Vec<Vehicle>>;

    /// Get an order sequence by name.
    fn fetch_order_sequence(&self, name: &str) -> Result<OrderSequence>;

    /// Get a path by name.
    fn fetch_path(&self, name: &str) -> Result<Path>;

    /// Get all paths matching a predicate, ordered by name.
    fn fetch_paths(&self, predicate: &dyn Fn(&Path) -> bool) -> Result<Vec<Path>>;

    /// Append an entry to a transport order's history.
    fn append_transport_order_history_entry(&self, name: &str, entry: HistoryEntry) -> Result<()>;

    /// Set a transport order's state.
    fn update_transport_order_state(&self, name: &str, state: TransportOrderState) -> Result<()>;

    /// Set the processing vehicle and, if given, the routed drive orders.
    fn update_transport_order_processing_vehicle(
        &self,
        name: &str,
        vehicle: Option<&str>,
        drive_orders: Vec<DriveOrder>,
    ) -> Result<()>;

    /// Replace the current and future drive orders of a transport order.
    fn update_transport_order_drive_orders(
        &self,
        name: &str,
        drive_orders: Vec<DriveOrder>,
    ) -> Result<()>;

    /// Advance a transport order to its next drive order.
    fn update_transport_order_next_drive_order(&self, name: &str) -> Result<()>;

    /// Set a vehicle's processing state.
    fn update_vehicle_proc_state(&self, name: &str, proc_state: ProcState) -> Result<()>;

    /// Set the transport order a vehicle processes.
    fn update_vehicle_transport_order(&self, name: &str, order: Option<&str>) -> Result<()>;

    /// Pause or resume a vehicle.
    fn update_vehicle_paused(&self, name: &str, paused: bool) -> Result<()>;
}
