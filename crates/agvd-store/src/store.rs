//! In-memory object store.

use std::collections::BTreeMap;

use agvd_core::{
    DriveOrder, EventCode, FleetError, HistoryEntry, OrderSequence, Path, Point, ProcState,
    Result, Supplement, TransportOrder, TransportOrderState, Vehicle, VehicleState,
};
use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;

use crate::service::ObjectService;
use crate::subscription::{
    ChangeType, ObjectChangeEvent, ObjectKind, ObjectSubscription, SubscriptionFilter,
    SubscriptionManager,
};

/// All objects of one plant.
#[derive(Debug, Default)]
struct Objects {
    transport_orders: BTreeMap<String, TransportOrder>,
    order_sequences: BTreeMap<String, OrderSequence>,
    vehicles: BTreeMap<String, Vehicle>,
    paths: BTreeMap<String, Path>,
    points: BTreeMap<String, Point>,
}

/// In-memory implementation of [`ObjectService`].
pub struct InMemoryObjectService {
    objects: RwLock<Objects>,

    subscriptions: SubscriptionManager,
}

impl InMemoryObjectService {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(Objects::default()),
            subscriptions: SubscriptionManager::new(),
        }
    }

    /// Subscribe to object changes.
    pub fn subscribe(&self, filter: SubscriptionFilter) -> ObjectSubscription {
        self.subscriptions.subscribe(filter)
    }

    fn publish(&self, kind: ObjectKind, name: &str, change_type: ChangeType) {
        self.subscriptions
            .publish(ObjectChangeEvent::new(kind, name, change_type));
    }

    /// Add a transport order.
    pub fn create_transport_order(&self, order: TransportOrder) -> Result<()> {
        let name = order.name.clone();
        {
            let mut objects = self.objects.write();
            if objects.transport_orders.contains_key(&name) {
                return Err(FleetError::IllegalState {
                    name,
                    message: "transport order already exists".to_string(),
                });
            }
            objects.transport_orders.insert(name.clone(), order);
        }
        debug!("Created transport order {}", name);
        self.publish(ObjectKind::TransportOrder, &name, ChangeType::Created);
        Ok(())
    }

    /// Add an order sequence.
    pub fn create_order_sequence(&self, sequence: OrderSequence) -> Result<()> {
        let name = sequence.name.clone();
        self.objects
            .write()
            .order_sequences
            .insert(name.clone(), sequence);
        self.publish(ObjectKind::OrderSequence, &name, ChangeType::Created);
        Ok(())
    }

    /// Add or replace a vehicle.
    pub fn create_vehicle(&self, vehicle: Vehicle) -> Result<()> {
        let name = vehicle.name.clone();
        self.objects.write().vehicles.insert(name.clone(), vehicle);
        self.publish(ObjectKind::Vehicle, &name, ChangeType::Created);
        Ok(())
    }

    /// Add or replace a point.
    pub fn create_point(&self, point: Point) -> Result<()> {
        let name = point.name.clone();
        self.objects.write().points.insert(name.clone(), point);
        self.publish(ObjectKind::Point, &name, ChangeType::Created);
        Ok(())
    }

    /// Add or replace a path.
    pub fn create_path(&self, path: Path) -> Result<()> {
        let name = path.name.clone();
        self.objects.write().paths.insert(name.clone(), path);
        self.publish(ObjectKind::Path, &name, ChangeType::Created);
        Ok(())
    }

    /// All known points.
    pub fn fetch_points(&self) -> Vec<Point> {
        self.objects.read().points.values().cloned().collect()
    }

    /// Lock or unlock a path.
    pub fn update_path_locked(&self, name: &str, locked: bool) -> Result<()> {
        self.objects
            .write()
            .paths
            .get_mut(name)
            .ok_or_else(|| FleetError::unknown("Path", name))?
            .locked = locked;
        self.publish(ObjectKind::Path, name, ChangeType::Updated);
        Ok(())
    }

    /// Apply an arbitrary change to a vehicle.
    ///
    /// Used by vehicle drivers to report position, state and energy level.
    pub fn update_vehicle(&self, name: &str, f: impl FnOnce(&mut Vehicle)) -> Result<()> {
        {
            let mut objects = self.objects.write();
            let vehicle = objects
                .vehicles
                .get_mut(name)
                .ok_or_else(|| FleetError::unknown("Vehicle", name))?;
            f(vehicle);
        }
        self.publish(ObjectKind::Vehicle, name, ChangeType::Updated);
        Ok(())
    }

    /// Report the point a vehicle is at.
    pub fn update_vehicle_position(&self, name: &str, point: Option<&str>) -> Result<()> {
        self.update_vehicle(name, |v| v.current_position = point.map(str::to_string))
    }

    /// Report a vehicle's operational state.
    pub fn update_vehicle_state(&self, name: &str, state: VehicleState) -> Result<()> {
        self.update_vehicle(name, |v| v.state = state)
    }

    /// Report a vehicle's energy level.
    pub fn update_vehicle_energy_level(&self, name: &str, energy_level: u8) -> Result<()> {
        self.update_vehicle(name, |v| v.energy_level = energy_level.min(100))
    }

    fn update_transport_order(
        &self,
        name: &str,
        f: impl FnOnce(&mut TransportOrder) -> Result<()>,
    ) -> Result<()> {
        {
            let mut objects = self.objects.write();
            let order = objects
                .transport_orders
                .get_mut(name)
                .ok_or_else(|| FleetError::unknown("TransportOrder", name))?;
            f(order)?;
        }
        self.publish(ObjectKind::TransportOrder, name, ChangeType::Updated);
        Ok(())
    }
}

impl Default for InMemoryObjectService {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectService for InMemoryObjectService {
    fn fetch_transport_order(&self, name: &str) -> Result<TransportOrder> {
        self.objects
            .read()
            .transport_orders
            .get(name)
            .cloned()
            .ok_or_else(|| FleetError::unknown("TransportOrder", name))
    }

    fn fetch_transport_orders(
        &self,
        predicate: &dyn Fn(&TransportOrder) -> bool,
    ) -> Result<Vec<TransportOrder>> {
        Ok(self
            .objects
            .read()
            .transport_orders
            .values()
            .filter(|order| predicate(order))
            .cloned()
            .collect())
    }

    fn fetch_vehicle(&self, name: &str) -> Result<Vehicle> {
        self.objects
            .read()
            .vehicles
            .get(name)
            .cloned()
            .ok_or_else(|| FleetError::unknown("Vehicle", name))
    }

    fn fetch_vehicles(&self, predicate: &dyn Fn(&Vehicle) -> bool) -> Result<Vec<Vehicle>> {
        Ok(self
            .objects
            .read()
            .vehicles
            .values()
            .filter(|vehicle| predicate(vehicle))
            .cloned()
            .collect())
    }

    fn fetch_order_sequence(&self, name: &str) -> Result<OrderSequence> {
        self.objects
            .read()
            .order_sequences
            .get(name)
            .cloned()
            .ok_or_else(|| FleetError::unknown("OrderSequence", name))
    }

    fn fetch_path(&self, name: &str) -> Result<Path> {
        self.objects
            .read()
            .paths
            .get(name)
            .cloned()
            .ok_or_else(|| FleetError::unknown("Path", name))
    }

    fn fetch_paths(&self, predicate: &dyn Fn(&Path) -> bool) -> Result<Vec<Path>> {
        Ok(self
            .objects
            .read()
            .paths
            .values()
            .filter(|path| predicate(path))
            .cloned()
            .collect())
    }

    fn append_transport_order_history_entry(&self, name: &str, entry: HistoryEntry) -> Result<()> {
        self.update_transport_order(name, |order| {
            order.history.append(entry);
            Ok(())
        })
    }

    fn update_transport_order_state(&self, name: &str, state: TransportOrderState) -> Result<()> {
        self.update_transport_order(name, |order| {
            order.state = state;
            if state.is_final_state() {
                order.finished_time = Some(Utc::now());
                order.history.append(HistoryEntry::with_text(
                    EventCode::OrderReachedFinalState,
                    format!("{:?}", state),
                ));
            }
            Ok(())
        })
    }

    fn update_transport_order_processing_vehicle(
        &self,
        name: &str,
        vehicle: Option<&str>,
        drive_orders: Vec<DriveOrder>,
    ) -> Result<()> {
        self.update_transport_order(name, |order| {
            if !drive_orders.is_empty() {
                order.replace_future_drive_orders(drive_orders)?;
            }
            order.processing_vehicle = vehicle.map(str::to_string);
            order.history.append(HistoryEntry::new(
                EventCode::OrderProcessingVehicleChanged,
                vehicle.map_or(Supplement::None, |v| Supplement::Text(v.to_string())),
            ));
            Ok(())
        })
    }

    fn update_transport_order_drive_orders(
        &self,
        name: &str,
        drive_orders: Vec<DriveOrder>,
    ) -> Result<()> {
        self.update_transport_order(name, |order| order.replace_future_drive_orders(drive_orders))
    }

    fn update_transport_order_next_drive_order(&self, name: &str) -> Result<()> {
        self.update_transport_order(name, |order| {
            let finished = order
                .current_drive_order()
                .map(|d| d.destination.destination.clone());
            order.advance_drive_order();
            if let Some(destination) = finished {
                order.history.append(HistoryEntry::with_text(
                    EventCode::OrderDriveOrderFinished,
                    destination,
                ));
            }
            Ok(())
        })
    }

    fn update_vehicle_proc_state(&self, name: &str, proc_state: ProcState) -> Result<()> {
        self.update_vehicle(name, |v| v.proc_state = proc_state)
    }

    fn update_vehicle_transport_order(&self, name: &str, order: Option<&str>) -> Result<()> {
        self.update_vehicle(name, |v| v.transport_order = order.map(str::to_string))
    }

    fn update_vehicle_paused(&self, name: &str, paused: bool) -> Result<()> {
        self.update_vehicle(name, |v| v.paused = paused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agvd_core::{Route, Step};

    fn store_with_order() -> InMemoryObjectService {
        let store = InMemoryObjectService::new();
        let order = TransportOrder::builder()
            .name("TOrder-1")
            .to_point("A")
            .to_point("B")
            .build()
            .unwrap();
        store.create_transport_order(order).unwrap();
        store
    }

    #[test]
    fn test_create_and_fetch() {
        let store = store_with_order();
        store.create_vehicle(Vehicle::new("Vehicle-01")).unwrap();

        assert_eq!(store.fetch_transport_order("TOrder-1").unwrap().name, "TOrder-1");
        assert_eq!(store.fetch_vehicles(&|_| true).unwrap().len(), 1);
        assert!(matches!(
            store.fetch_vehicle("Vehicle-02"),
            Err(FleetError::ObjectUnknown { .. })
        ));
    }

    #[test]
    fn test_duplicate_order_rejected() {
        let store = store_with_order();
        let duplicate = TransportOrder::builder()
            .name("TOrder-1")
            .to_point("C")
            .build()
            .unwrap();
        assert!(store.create_transport_order(duplicate).is_err());
    }

    #[test]
    fn test_final_state_records_history() {
        let store = store_with_order();
        store
            .update_transport_order_state("TOrder-1", TransportOrderState::Finished)
            .unwrap();

        let order = store.fetch_transport_order("TOrder-1").unwrap();
        assert!(order.finished_time.is_some());
        assert_eq!(order.history.count_of(&EventCode::OrderReachedFinalState), 1);
    }

    #[test]
    fn test_processing_vehicle_and_drive_orders() {
        let store = store_with_order();
        let order = store.fetch_transport_order("TOrder-1").unwrap();
        let routed: Vec<DriveOrder> = order
            .drive_orders
            .iter()
            .cloned()
            .map(|d| d.with_route(Route::new(vec![Step::new(None, None, "A", 0, 7)])))
            .collect();

        store
            .update_transport_order_processing_vehicle("TOrder-1", Some("Vehicle-01"), routed)
            .unwrap();

        let order = store.fetch_transport_order("TOrder-1").unwrap();
        assert_eq!(order.processing_vehicle.as_deref(), Some("Vehicle-01"));
        assert_eq!(order.total_route_costs(), 14);
    }

    #[test]
    fn test_next_drive_order() {
        let store = store_with_order();
        store.update_transport_order_next_drive_order("TOrder-1").unwrap();
        store.update_transport_order_next_drive_order("TOrder-1").unwrap();

        let order = store.fetch_transport_order("TOrder-1").unwrap();
        assert_eq!(order.current_drive_order().unwrap().destination.destination, "B");
        assert_eq!(order.history.count_of(&EventCode::OrderDriveOrderFinished), 1);
    }

    #[tokio::test]
    async fn test_updates_publish_events() {
        let store = InMemoryObjectService::new();
        store.create_vehicle(Vehicle::new("Vehicle-01")).unwrap();
        let mut sub = store.subscribe(SubscriptionFilter::kind(ObjectKind::Vehicle));

        store
            .update_vehicle_proc_state("Vehicle-01", ProcState::AwaitingOrder)
            .unwrap();

        let event = sub.next().await.unwrap();
        assert_eq!(event.name, "Vehicle-01");
        assert_eq!(event.change_type, ChangeType::Updated);
    }
}
