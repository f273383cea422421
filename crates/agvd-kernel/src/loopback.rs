//! Loopback vehicle controllers that emulate vehicles driving their routes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use agvd_core::{Destination, DriveOrder, FleetError, ProcState, Result, VehicleState};
use agvd_dispatch::{MovementCommand, VehicleController, VehicleControllerPool};
use agvd_store::{InMemoryObjectService, ObjectService};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct DriveState {
    drive_order: Option<DriveOrder>,
    /// Route index of the next step to travel.
    next_step: usize,
    commands: Vec<MovementCommand>,
    /// Report the drive order as done on the next tick.
    stop_requested: bool,
}

/// Emulates one vehicle: each tick travels one step of the current drive
/// order and reports the new position to the object service.
pub struct LoopbackController {
    vehicle: String,
    object_service: Arc<InMemoryObjectService>,
    state: Mutex<DriveState>,
}

impl LoopbackController {
    pub fn new(vehicle: impl Into<String>, object_service: Arc<InMemoryObjectService>) -> Self {
        Self {
            vehicle: vehicle.into(),
            object_service,
            state: Mutex::new(DriveState::default()),
        }
    }

    /// Whether a drive order is being processed.
    pub fn is_busy(&self) -> bool {
        self.state.lock().drive_order.is_some()
    }

    /// Advance by one step. Returns true if the vehicle moved or finished
    /// its drive order.
    pub fn tick(&self) -> Result<bool> {
        if self.object_service.fetch_vehicle(&self.vehicle)?.paused {
            return Ok(false);
        }

        let mut state = self.state.lock();
        let Some(drive_order) = state.drive_order.clone() else {
            return Ok(false);
        };
        if state.stop_requested {
            *state = DriveState::default();
            drop(state);
            return self.report_finished(&drive_order).map(|_| true);
        }
        let Some(route) = drive_order.route.as_ref() else {
            return Err(FleetError::ControllerError {
                vehicle: self.vehicle.clone(),
                message: "drive order without route".to_string(),
            });
        };

        let Some(step) = route.steps().get(state.next_step).cloned() else {
            *state = DriveState::default();
            drop(state);
            return self.report_finished(&drive_order).map(|_| true);
        };
        if !step.execution_allowed {
            debug!("{} waiting before {:?}", self.vehicle, step.path);
            return Ok(false);
        }

        let final_movement = step.route_index + 1 == route.steps().len();
        state.commands.push(MovementCommand {
            transport_order: drive_order.transport_order.clone(),
            step: step.clone(),
            operation: if final_movement {
                drive_order.destination.operation.clone()
            } else {
                Destination::OP_NOP.to_string()
            },
            final_movement,
        });
        state.next_step += 1;
        drop(state);

        self.object_service
            .update_vehicle_position(&self.vehicle, Some(&step.destination_point))?;
        Ok(true)
    }

    fn report_finished(&self, drive_order: &DriveOrder) -> Result<()> {
        info!(
            "{} reached {} ({})",
            self.vehicle, drive_order.destination.destination, drive_order.destination.operation
        );
        self.object_service.update_vehicle(&self.vehicle, |v| {
            v.state = VehicleState::Idle;
            v.proc_state = ProcState::AwaitingOrder;
        })
    }
}

impl VehicleController for LoopbackController {
    fn set_drive_order(
        &self,
        drive_order: &DriveOrder,
        _order_properties: &BTreeMap<String, String>,
    ) -> Result<()> {
        debug!(
            "{} got drive order to {}",
            self.vehicle, drive_order.destination.destination
        );
        *self.state.lock() = DriveState {
            drive_order: Some(drive_order.clone()),
            ..DriveState::default()
        };
        self.object_service
            .update_vehicle_state(&self.vehicle, VehicleState::Executing)
    }

    fn update_drive_order(
        &self,
        drive_order: &DriveOrder,
        _order_properties: &BTreeMap<String, String>,
    ) -> Result<()> {
        // Sent steps keep their route indices, so the next step stays valid.
        self.state.lock().drive_order = Some(drive_order.clone());
        Ok(())
    }

    fn abort_drive_order(&self, immediate: bool) -> Result<()> {
        let mut state = self.state.lock();
        if immediate {
            *state = DriveState::default();
            drop(state);
            return self
                .object_service
                .update_vehicle_state(&self.vehicle, VehicleState::Idle);
        }
        // Every sent step is already travelled; stop on the next tick.
        if state.drive_order.is_some() {
            state.stop_requested = true;
        }
        Ok(())
    }

    fn commands_sent(&self) -> Vec<MovementCommand> {
        self.state.lock().commands.clone()
    }
}

/// One loopback controller per vehicle.
pub struct LoopbackControllerPool {
    controllers: RwLock<HashMap<String, Arc<LoopbackController>>>,
}

impl LoopbackControllerPool {
    /// Create controllers for every vehicle known to the object service.
    pub fn new(object_service: Arc<InMemoryObjectService>) -> Result<Self> {
        let controllers = object_service
            .fetch_vehicles(&|_| true)?
            .into_iter()
            .map(|v| {
                let controller = Arc::new(LoopbackController::new(&v.name, object_service.clone()));
                (v.name, controller)
            })
            .collect();
        Ok(Self {
            controllers: RwLock::new(controllers),
        })
    }

    /// Advance every vehicle by one step. Returns how many vehicles moved.
    pub fn tick_all(&self) -> Result<usize> {
        let controllers: Vec<_> = self.controllers.read().values().cloned().collect();
        let mut moved = 0;
        for controller in controllers {
            if controller.tick()? {
                moved += 1;
            }
        }
        Ok(moved)
    }

    /// Whether any vehicle still has a drive order.
    pub fn any_busy(&self) -> bool {
        self.controllers.read().values().any(|c| c.is_busy())
    }
}

impl VehicleControllerPool for LoopbackControllerPool {
    fn controller(&self, vehicle: &str) -> Result<Arc<dyn VehicleController>> {
        let controller: Arc<dyn VehicleController> = self
            .controllers
            .read()
            .get(vehicle)
            .cloned()
            .ok_or_else(|| FleetError::unknown("VehicleController", vehicle))?;
        Ok(controller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agvd_core::{Route, Step, Vehicle};

    fn setup() -> (Arc<InMemoryObjectService>, LoopbackControllerPool) {
        let store = Arc::new(InMemoryObjectService::new());
        store
            .create_vehicle(Vehicle::new("Vehicle-01").with_position("A"))
            .unwrap();
        let pool = LoopbackControllerPool::new(store.clone()).unwrap();
        (store, pool)
    }

    fn drive_order() -> DriveOrder {
        DriveOrder::new(Destination::new("C", "Load"))
            .with_transport_order("TOrder-1")
            .with_route(Route::new(vec![
                Step::new(Some("A--B"), Some("A"), "B", 0, 10),
                Step::new(Some("B--C"), Some("B"), "C", 1, 10),
            ]))
    }

    #[test]
    fn test_drives_route_step_by_step() {
        let (store, pool) = setup();
        let controller = pool.controller("Vehicle-01").unwrap();
        controller
            .set_drive_order(&drive_order(), &BTreeMap::new())
            .unwrap();
        assert_eq!(
            store.fetch_vehicle("Vehicle-01").unwrap().state,
            VehicleState::Executing
        );

        assert_eq!(pool.tick_all().unwrap(), 1);
        assert_eq!(
            store.fetch_vehicle("Vehicle-01").unwrap().current_position.as_deref(),
            Some("B")
        );
        assert_eq!(controller.commands_sent().len(), 1);

        pool.tick_all().unwrap();
        let sent = controller.commands_sent();
        assert!(sent[1].final_movement);
        assert_eq!(sent[1].operation, "Load");

        pool.tick_all().unwrap();
        let vehicle = store.fetch_vehicle("Vehicle-01").unwrap();
        assert_eq!(vehicle.current_position.as_deref(), Some("C"));
        assert_eq!(vehicle.proc_state, ProcState::AwaitingOrder);
        assert!(controller.commands_sent().is_empty());
        assert!(!pool.any_busy());
    }

    #[test]
    fn test_blocked_step_waits() {
        let (store, pool) = setup();
        let controller = pool.controller("Vehicle-01").unwrap();
        let blocked = drive_order().with_route(Route::new(vec![
            Step::new(Some("A--B"), Some("A"), "B", 0, 10),
            Step::new(Some("B--C"), Some("B"), "C", 1, 10).with_execution_allowed(false),
        ]));
        controller.set_drive_order(&blocked, &BTreeMap::new()).unwrap();

        assert_eq!(pool.tick_all().unwrap(), 1);
        assert_eq!(pool.tick_all().unwrap(), 0);
        assert_eq!(
            store.fetch_vehicle("Vehicle-01").unwrap().current_position.as_deref(),
            Some("B")
        );
    }

    #[test]
    fn test_abort_after_sent_steps() {
        let (store, pool) = setup();
        let controller = pool.controller("Vehicle-01").unwrap();
        controller
            .set_drive_order(&drive_order(), &BTreeMap::new())
            .unwrap();
        pool.tick_all().unwrap();

        controller.abort_drive_order(false).unwrap();
        pool.tick_all().unwrap();

        let vehicle = store.fetch_vehicle("Vehicle-01").unwrap();
        assert_eq!(vehicle.current_position.as_deref(), Some("B"));
        assert_eq!(vehicle.proc_state, ProcState::AwaitingOrder);
        assert!(!pool.any_busy());
    }

    #[test]
    fn test_unknown_vehicle() {
        let (_, pool) = setup();
        assert!(pool.controller("Vehicle-99").is_err());
    }
}
