//! Fakes for the dispatcher's collaborators, backed by the real in-memory store.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use agvd_core::{
    Destination, DriveOrder, Result, Route, Step, TransportOrder, TransportOrderState, Vehicle,
};
use agvd_store::{InMemoryObjectService, ObjectService};
use parking_lot::Mutex;

use crate::assignment::{OrderAssigner, VehicleSelector};
use crate::config::DispatcherConfig;
use crate::filter::{default_candidate_filter, default_vehicle_filter};
use crate::order_util::TransportOrderUtil;
use crate::phase::{AssignNextDriveOrdersPhase, AssignReservedOrdersPhase};
use crate::priority::Priorities;
use crate::reroute::RerouteUtil;
use crate::reservation::OrderReservationPool;
use crate::services::{MovementCommand, Router, VehicleController, VehicleControllerPool};
use crate::status::DispatchingStatusMarker;

const DEFAULT_STEP_COSTS: i64 = 10;

/// Routes along a cost table. Every pair of points is connected directly
/// unless intermediate points were configured with [`TableRouter::set_via`].
#[derive(Default)]
pub(crate) struct TableRouter {
    costs: Mutex<HashMap<(String, String), i64>>,
    via: Mutex<HashMap<(String, String), Vec<String>>>,
    unroutable: Mutex<HashSet<String>>,
    locked: Mutex<HashSet<String>>,
    selected: Mutex<HashMap<String, bool>>,
    topology_updates: Mutex<usize>,
}

impl TableRouter {
    pub fn set_cost(&self, from: &str, to: &str, costs: i64) {
        self.costs
            .lock()
            .insert((from.to_string(), to.to_string()), costs);
    }

    pub fn set_via(&self, from: &str, to: &str, via: &[&str]) {
        self.via.lock().insert(
            (from.to_string(), to.to_string()),
            via.iter().map(|p| p.to_string()).collect(),
        );
    }

    /// No route leads to `point`, not even over locked paths.
    pub fn set_unroutable(&self, point: &str) {
        self.unroutable.lock().insert(point.to_string());
    }

    /// Routes to `point` exist only when path locks are ignored.
    pub fn set_locked(&self, point: &str) {
        self.locked.lock().insert(point.to_string());
    }

    /// Whether a route is currently selected for the vehicle.
    pub fn selected(&self, vehicle: &str) -> bool {
        self.selected.lock().get(vehicle).copied().unwrap_or(false)
    }

    pub fn topology_updates(&self) -> usize {
        *self.topology_updates.lock()
    }

    fn leg(&self, from: &str, to: &str) -> Route {
        if from == to {
            return Route::new(vec![Step::new(None, None, to, 0, 0)]);
        }
        let mut points = vec![from.to_string()];
        if let Some(via) = self.via.lock().get(&(from.to_string(), to.to_string())) {
            points.extend(via.iter().cloned());
        }
        points.push(to.to_string());

        let costs = self.costs.lock();
        Route::new(
            points
                .windows(2)
                .enumerate()
                .map(|(index, pair)| {
                    let step_costs = costs
                        .get(&(pair[0].clone(), pair[1].clone()))
                        .copied()
                        .unwrap_or(DEFAULT_STEP_COSTS);
                    Step::new(
                        Some(format!("{}--{}", pair[0], pair[1]).as_str()),
                        Some(pair[0].as_str()),
                        &pair[1],
                        index,
                        step_costs,
                    )
                })
                .collect(),
        )
    }

    fn route_order(
        &self,
        source_point: &str,
        order: &TransportOrder,
        respect_locks: bool,
    ) -> Option<Vec<DriveOrder>> {
        let legs = order.current_and_future_drive_orders();
        let blocked = |d: &DriveOrder| {
            let destination = &d.destination.destination;
            self.unroutable.lock().contains(destination)
                || (respect_locks && self.locked.lock().contains(destination))
        };
        if legs.iter().any(blocked) {
            return None;
        }

        let mut from = source_point.to_string();
        Some(
            legs.iter()
                .map(|drive_order| {
                    let route = self.leg(&from, &drive_order.destination.destination);
                    from = drive_order.destination.destination.clone();
                    drive_order.clone().with_route(route)
                })
                .collect(),
        )
    }
}

impl Router for TableRouter {
    fn get_route(
        &self,
        _vehicle: &Vehicle,
        source_point: &str,
        order: &TransportOrder,
    ) -> Result<Option<Vec<DriveOrder>>> {
        Ok(self.route_order(source_point, order, true))
    }

    fn get_route_ignoring_path_locks(
        &self,
        _vehicle: &Vehicle,
        source_point: &str,
        order: &TransportOrder,
    ) -> Result<Option<Vec<DriveOrder>>> {
        Ok(self.route_order(source_point, order, false))
    }

    fn get_costs(&self, _vehicle: &Vehicle, source_point: &str, destination_point: &str) -> Result<i64> {
        Ok(self.leg(source_point, destination_point).costs())
    }

    fn select_route(&self, vehicle: &Vehicle, drive_orders: Option<&[DriveOrder]>) -> Result<()> {
        self.selected
            .lock()
            .insert(vehicle.name.clone(), drive_orders.is_some());
        Ok(())
    }

    fn update_routing_topology(&self, _paths: &BTreeSet<String>) -> Result<()> {
        *self.topology_updates.lock() += 1;
        Ok(())
    }

    fn check_routability(&self, order: &TransportOrder) -> Result<bool> {
        let unroutable = self.unroutable.lock();
        Ok(!order
            .drive_orders
            .iter()
            .any(|d| unroutable.contains(&d.destination.destination)))
    }
}

/// Records everything the dispatcher tells one vehicle.
#[derive(Default)]
pub(crate) struct RecordingController {
    drive_orders: Mutex<Vec<DriveOrder>>,
    updated_drive_orders: Mutex<Vec<DriveOrder>>,
    aborts: Mutex<Vec<bool>>,
    current: Mutex<Option<DriveOrder>>,
    commands: Mutex<Vec<MovementCommand>>,
}

impl RecordingController {
    pub fn drive_orders(&self) -> Vec<DriveOrder> {
        self.drive_orders.lock().clone()
    }

    pub fn updated_drive_orders(&self) -> Vec<DriveOrder> {
        self.updated_drive_orders.lock().clone()
    }

    pub fn aborts(&self) -> Vec<bool> {
        self.aborts.lock().clone()
    }

    /// Pretend the first `count` steps of the current drive order were sent.
    pub fn send_steps(&self, count: usize) {
        let Some(drive_order) = self.current.lock().clone() else {
            return;
        };
        let Some(route) = drive_order.route.as_ref() else {
            return;
        };
        let last = route.steps().len().saturating_sub(1);
        let mut commands = self.commands.lock();
        commands.clear();
        commands.extend(route.steps().iter().take(count).map(|step| {
            let final_movement = step.route_index == last;
            MovementCommand {
                transport_order: drive_order.transport_order.clone(),
                step: step.clone(),
                operation: if final_movement {
                    drive_order.destination.operation.clone()
                } else {
                    Destination::OP_NOP.to_string()
                },
                final_movement,
            }
        }));
    }
}

impl VehicleController for RecordingController {
    fn set_drive_order(
        &self,
        drive_order: &DriveOrder,
        _order_properties: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.drive_orders.lock().push(drive_order.clone());
        *self.current.lock() = Some(drive_order.clone());
        self.commands.lock().clear();
        Ok(())
    }

    fn update_drive_order(
        &self,
        drive_order: &DriveOrder,
        _order_properties: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.updated_drive_orders.lock().push(drive_order.clone());
        *self.current.lock() = Some(drive_order.clone());
        Ok(())
    }

    fn abort_drive_order(&self, immediate: bool) -> Result<()> {
        self.aborts.lock().push(immediate);
        *self.current.lock() = None;
        self.commands.lock().clear();
        Ok(())
    }

    fn commands_sent(&self) -> Vec<MovementCommand> {
        self.commands.lock().clone()
    }
}

#[derive(Default)]
pub(crate) struct RecordingControllerPool {
    controllers: Mutex<HashMap<String, Arc<RecordingController>>>,
}

impl RecordingControllerPool {
    pub fn controller_for(&self, vehicle: &str) -> Arc<RecordingController> {
        self.controllers
            .lock()
            .entry(vehicle.to_string())
            .or_default()
            .clone()
    }
}

impl VehicleControllerPool for RecordingControllerPool {
    fn controller(&self, vehicle: &str) -> Result<Arc<dyn VehicleController>> {
        let controller: Arc<dyn VehicleController> = self.controller_for(vehicle);
        Ok(controller)
    }
}

/// A store with fake collaborators and shortcuts for building scenarios.
pub(crate) struct Fixture {
    pub store: Arc<InMemoryObjectService>,
    pub router: Arc<TableRouter>,
    pub controllers: Arc<RecordingControllerPool>,
    pub reservation_pool: Arc<OrderReservationPool>,
    pub config: DispatcherConfig,
    status_marker: Arc<DispatchingStatusMarker>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    pub fn with_config(config: DispatcherConfig) -> Self {
        let store = Arc::new(InMemoryObjectService::new());
        let status_marker = Arc::new(DispatchingStatusMarker::new(store.clone()));
        Self {
            store,
            router: Arc::new(TableRouter::default()),
            controllers: Arc::new(RecordingControllerPool::default()),
            reservation_pool: Arc::new(OrderReservationPool::new()),
            config,
            status_marker,
        }
    }

    pub fn raw_order(&self, name: &str, points: &[&str]) {
        let builder = points
            .iter()
            .fold(TransportOrder::builder().name(name), |b, p| b.to_point(*p));
        self.store.create_transport_order(builder.build().unwrap()).unwrap();
    }

    pub fn dispatchable_order(&self, name: &str, points: &[&str]) {
        self.raw_order(name, points);
        self.make_dispatchable(name);
    }

    pub fn typed_order(&self, name: &str, point: &str, order_type: &str) {
        self.store
            .create_transport_order(
                TransportOrder::builder()
                    .name(name)
                    .to_point(point)
                    .order_type(order_type)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        self.make_dispatchable(name);
    }

    pub fn make_dispatchable(&self, name: &str) {
        self.store
            .update_transport_order_state(name, TransportOrderState::Dispatchable)
            .unwrap();
    }

    pub fn order(&self, name: &str) -> TransportOrder {
        self.store.fetch_transport_order(name).unwrap()
    }

    pub fn vehicle(&self, name: &str, position: &str) {
        self.create_vehicle(Vehicle::new(name).with_position(position));
    }

    pub fn create_vehicle(&self, vehicle: Vehicle) {
        self.store.create_vehicle(vehicle).unwrap();
    }

    pub fn vehicle_obj(&self, name: &str) -> Vehicle {
        self.store.fetch_vehicle(name).unwrap()
    }

    /// Route the order from the vehicle's position and assign it.
    pub fn assign(&self, vehicle: &str, order: &str) {
        let vehicle_obj = self.vehicle_obj(vehicle);
        let position = vehicle_obj.current_position.clone().unwrap();
        let drive_orders = self
            .router
            .get_route(&vehicle_obj, &position, &self.order(order))
            .unwrap()
            .unwrap();
        self.order_util()
            .assign_transport_order(vehicle, order, drive_orders)
            .unwrap();
    }

    pub fn status_marker(&self) -> Arc<DispatchingStatusMarker> {
        self.status_marker.clone()
    }

    pub fn order_util(&self) -> Arc<TransportOrderUtil> {
        Arc::new(TransportOrderUtil::new(
            self.store.clone(),
            self.router.clone(),
            self.controllers.clone(),
            self.reservation_pool.clone(),
            self.status_marker(),
            self.config.dismiss_unroutable_transport_orders,
        ))
    }

    fn priorities(&self) -> Arc<Priorities> {
        Arc::new(Priorities::from_config(&self.config).unwrap())
    }

    pub fn order_assigner(&self) -> OrderAssigner {
        OrderAssigner::new(
            self.router.clone(),
            self.order_util(),
            self.reservation_pool.clone(),
            self.status_marker(),
            default_candidate_filter(self.store.clone(), &self.config),
            self.priorities(),
        )
    }

    pub fn vehicle_selector(&self) -> VehicleSelector {
        VehicleSelector::new(
            self.store.clone(),
            default_vehicle_filter(self.store.clone(), self.reservation_pool.clone()),
            self.priorities(),
        )
    }

    pub fn reroute_util(&self) -> RerouteUtil {
        RerouteUtil::new(
            self.store.clone(),
            self.router.clone(),
            self.controllers.clone(),
            self.config.rerouting_impossible_strategy,
        )
    }

    pub fn assign_next_drive_orders_phase(&self) -> AssignNextDriveOrdersPhase {
        AssignNextDriveOrdersPhase::new(
            self.store.clone(),
            self.controllers.clone(),
            self.order_util(),
            Arc::new(self.reroute_util()),
            self.config.reroute_trigger,
        )
    }

    pub fn assign_reserved_orders_phase(&self) -> AssignReservedOrdersPhase {
        AssignReservedOrdersPhase::new(
            self.store.clone(),
            self.reservation_pool.clone(),
            Arc::new(self.order_assigner()),
            self.order_util(),
        )
    }
}
