//! Rerouting of vehicles that are already processing a transport order.
//!
//! Steps already sent to a vehicle are never changed. A reroute computes a new
//! route from the end of the last sent step (or the vehicle's position if
//! nothing was sent yet) and appends it to the sent part of the current drive
//! order. Future drive orders are replaced completely.

use std::collections::BTreeSet;
use std::sync::Arc;

use agvd_core::{
    DriveOrder, FleetError, ProcState, ReroutingType, Result, Step, TransportOrder,
    TransportOrderState, Vehicle,
};
use agvd_store::ObjectService;
use tracing::{debug, info, warn};

use crate::config::ReroutingImpossibleStrategy;
use crate::services::{MovementCommand, Router, VehicleControllerPool};

pub struct RerouteUtil {
    object_service: Arc<dyn ObjectService>,
    router: Arc<dyn Router>,
    controller_pool: Arc<dyn VehicleControllerPool>,
    strategy: ReroutingImpossibleStrategy,
}

impl RerouteUtil {
    pub fn new(
        object_service: Arc<dyn ObjectService>,
        router: Arc<dyn Router>,
        controller_pool: Arc<dyn VehicleControllerPool>,
        strategy: ReroutingImpossibleStrategy,
    ) -> Self {
        Self {
            object_service,
            router,
            controller_pool,
            strategy,
        }
    }

    /// Reroute every vehicle processing an order.
    pub fn reroute_all(&self, rerouting_type: ReroutingType) -> Result<()> {
        let vehicles = self.object_service.fetch_vehicles(&|v| {
            v.proc_state == ProcState::ProcessingOrder && v.transport_order.is_some()
        })?;
        for vehicle in vehicles {
            self.reroute(&vehicle, rerouting_type)?;
        }
        Ok(())
    }

    /// Recompute the rest of `vehicle`'s route.
    ///
    /// Regular reroutes leave paused vehicles alone. Returns true if the
    /// vehicle's drive orders were changed.
    pub fn reroute(&self, vehicle: &Vehicle, rerouting_type: ReroutingType) -> Result<bool> {
        if rerouting_type == ReroutingType::Regular && vehicle.paused {
            debug!("Not rerouting paused vehicle {}", vehicle.name);
            return Ok(false);
        }
        let Some(order) = self.processed_order(vehicle)? else {
            return Ok(false);
        };
        let sent = self.sent_commands(vehicle, &order)?;
        let Some(source) = sent
            .last()
            .map(|c| c.step.destination_point.clone())
            .or_else(|| vehicle.current_position.clone())
        else {
            warn!("Cannot reroute {}: position unknown", vehicle.name);
            return Ok(false);
        };

        info!(
            "🔀 Rerouting {} from {} ({:?})",
            vehicle.name, source, rerouting_type
        );
        match self.router.get_route(vehicle, &source, &order)? {
            Some(routed) => self.apply_route(vehicle, &order, &sent, routed, rerouting_type),
            None => self.handle_rerouting_impossible(vehicle, &order, &source, &sent, rerouting_type),
        }
    }

    fn handle_rerouting_impossible(
        &self,
        vehicle: &Vehicle,
        order: &TransportOrder,
        source: &str,
        sent: &[MovementCommand],
        rerouting_type: ReroutingType,
    ) -> Result<bool> {
        match self.strategy {
            ReroutingImpossibleStrategy::IgnorePathLocks => {
                match self
                    .router
                    .get_route_ignoring_path_locks(vehicle, source, order)?
                {
                    Some(routed) => self.apply_route(vehicle, order, sent, routed, rerouting_type),
                    None => {
                        warn!("No route for {} even ignoring locks, keeping it", vehicle.name);
                        Ok(false)
                    }
                }
            }
            ReroutingImpossibleStrategy::PauseImmediately => {
                warn!("No route for {}, pausing it", vehicle.name);
                self.object_service.update_vehicle_paused(&vehicle.name, true)?;
                Ok(false)
            }
            ReroutingImpossibleStrategy::PauseAtPathLock => {
                self.block_locked_steps(vehicle, order, sent)
            }
        }
    }

    fn apply_route(
        &self,
        vehicle: &Vehicle,
        order: &TransportOrder,
        sent: &[MovementCommand],
        routed: Vec<DriveOrder>,
        rerouting_type: ReroutingType,
    ) -> Result<bool> {
        let mut routed: Vec<DriveOrder> = routed
            .into_iter()
            .map(|d| stamp_rerouting_type(d, rerouting_type))
            .collect();
        let Some(current) = order.current_drive_order() else {
            return Ok(false);
        };
        if routed.is_empty() {
            return Ok(false);
        }

        if let Some(last) = sent.last() {
            let travelled = travelled_part(current, last.step.route_index)?;
            let continuation = without_standstill(&routed[0], &last.step.destination_point);
            let merged = self.merge_drive_orders(&travelled, &continuation, vehicle)?;
            routed[0] = merged;
        }

        if Self::routes_equals(order.current_and_future_drive_orders(), &routed) {
            debug!("Route of {} unchanged", vehicle.name);
            return Ok(false);
        }

        self.object_service
            .update_transport_order_drive_orders(&order.name, routed)?;
        self.send_updated_route(vehicle, &order.name)?;
        Ok(true)
    }

    /// Forbid travelling locked paths on the steps not yet sent.
    fn block_locked_steps(
        &self,
        vehicle: &Vehicle,
        order: &TransportOrder,
        sent: &[MovementCommand],
    ) -> Result<bool> {
        let locked: BTreeSet<String> = self
            .object_service
            .fetch_paths(&|p| p.locked)?
            .into_iter()
            .map(|p| p.name)
            .collect();
        let last_sent = sent.last().map(|c| c.step.route_index);

        let mut changed = false;
        let mut updated = Vec::new();
        for (leg, drive_order) in order.current_and_future_drive_orders().iter().enumerate() {
            let Some(route) = &drive_order.route else {
                updated.push(drive_order.clone());
                continue;
            };
            let route = route.map_steps(|step| {
                let pending = leg > 0 || last_sent.map_or(true, |index| step.route_index > index);
                let over_lock = step.path.as_ref().is_some_and(|p| locked.contains(p));
                if pending && over_lock && step.execution_allowed {
                    changed = true;
                    step.with_execution_allowed(false)
                } else {
                    step
                }
            });
            updated.push(drive_order.clone().with_route(route));
        }

        if changed {
            warn!("No route for {}, stopping it before locked paths", vehicle.name);
            self.object_service
                .update_transport_order_drive_orders(&order.name, updated)?;
            self.send_updated_route(vehicle, &order.name)?;
        }
        Ok(changed)
    }

    fn send_updated_route(&self, vehicle: &Vehicle, order_name: &str) -> Result<()> {
        let order = self.object_service.fetch_transport_order(order_name)?;
        self.router
            .select_route(vehicle, Some(order.current_and_future_drive_orders()))?;
        // A vehicle awaiting its next drive order gets it from the caller.
        if vehicle.proc_state != ProcState::ProcessingOrder {
            return Ok(());
        }
        if let Some(current) = order.current_drive_order() {
            self.controller_pool
                .controller(&vehicle.name)?
                .update_drive_order(current, &order.properties)?;
        }
        Ok(())
    }

    /// Join two drive orders into one heading for `second`'s destination.
    ///
    /// The cost of getting from the end of `first` to the start of `second`
    /// is added to the first step taken from `second`.
    pub fn merge_drive_orders(
        &self,
        first: &DriveOrder,
        second: &DriveOrder,
        vehicle: &Vehicle,
    ) -> Result<DriveOrder> {
        let (Some(first_route), Some(second_route)) = (&first.route, &second.route) else {
            return Err(FleetError::IllegalState {
                name: first.transport_order.clone(),
                message: "cannot merge drive orders without routes".to_string(),
            });
        };

        let transition = match (
            first_route.final_destination_point(),
            second_route.source_point(),
        ) {
            (Some(end), Some(start)) if end != start => {
                self.router.get_costs(vehicle, end, start)?
            }
            _ => 0,
        };

        let offset = first_route.steps().len();
        let mut steps: Vec<Step> = first_route.steps().to_vec();
        steps.extend(second_route.steps().iter().enumerate().map(|(i, step)| {
            let mut step = step.clone().with_route_index(offset + i);
            if i == 0 {
                step.costs += transition;
            }
            step
        }));

        Ok(second
            .clone()
            .with_state(first.state)
            .with_route(first_route.with_steps(steps)))
    }

    /// Steps of the vehicle's current route that were not sent to it yet.
    pub fn get_future_steps(&self, vehicle: &Vehicle) -> Result<Vec<Step>> {
        let Some(order) = self.processed_order(vehicle)? else {
            return Ok(Vec::new());
        };
        let Some(route) = order.current_drive_order().and_then(|d| d.route.as_ref()) else {
            return Ok(Vec::new());
        };
        let sent = self.sent_commands(vehicle, &order)?;
        Ok(match sent.last() {
            Some(last) => route
                .steps()
                .iter()
                .filter(|s| s.route_index > last.step.route_index)
                .cloned()
                .collect(),
            None => route.steps().to_vec(),
        })
    }

    /// Whether two sequences of drive orders describe the same movements at
    /// the same total cost.
    pub fn routes_equals(a: &[DriveOrder], b: &[DriveOrder]) -> bool {
        let steps = |orders: &[DriveOrder]| -> Vec<Step> {
            orders
                .iter()
                .filter_map(|d| d.route.as_ref())
                .flat_map(|r| r.steps().iter().cloned())
                .collect()
        };
        let costs = |orders: &[DriveOrder]| -> i64 { orders.iter().map(DriveOrder::route_costs).sum() };

        let (steps_a, steps_b) = (steps(a), steps(b));
        costs(a) == costs(b)
            && steps_a.len() == steps_b.len()
            && steps_a
                .iter()
                .zip(&steps_b)
                .all(|(x, y)| x.equals_in_movement(y))
    }

    fn processed_order(&self, vehicle: &Vehicle) -> Result<Option<TransportOrder>> {
        let Some(name) = vehicle.transport_order.as_deref() else {
            return Ok(None);
        };
        let order = self.object_service.fetch_transport_order(name)?;
        if order.state != TransportOrderState::BeingProcessed || order.current_drive_order().is_none()
        {
            return Ok(None);
        }
        Ok(Some(order))
    }

    fn sent_commands(&self, vehicle: &Vehicle, order: &TransportOrder) -> Result<Vec<MovementCommand>> {
        Ok(self
            .controller_pool
            .controller(&vehicle.name)?
            .commands_sent()
            .into_iter()
            .filter(|c| c.transport_order == order.name)
            .collect())
    }
}

/// The part of `drive_order` up to and including the step at `last_index`.
fn travelled_part(drive_order: &DriveOrder, last_index: usize) -> Result<DriveOrder> {
    let route = drive_order.route.as_ref().ok_or_else(|| FleetError::IllegalState {
        name: drive_order.transport_order.clone(),
        message: "drive order in progress has no route".to_string(),
    })?;
    let steps = route
        .steps()
        .iter()
        .filter(|s| s.route_index <= last_index)
        .cloned()
        .collect();
    Ok(drive_order.clone().with_route(route.with_steps(steps)))
}

/// `drive_order` without leading steps that stay at `point`.
fn without_standstill(drive_order: &DriveOrder, point: &str) -> DriveOrder {
    match &drive_order.route {
        Some(route) => {
            let steps = route
                .steps()
                .iter()
                .skip_while(|s| s.path.is_none() && s.destination_point == point)
                .cloned()
                .collect();
            drive_order.clone().with_route(route.with_steps(steps))
        }
        None => drive_order.clone(),
    }
}

fn stamp_rerouting_type(drive_order: DriveOrder, rerouting_type: ReroutingType) -> DriveOrder {
    match drive_order.route.clone() {
        Some(route) => {
            drive_order.with_route(route.map_steps(|s| s.with_rerouting_type(rerouting_type)))
        }
        None => drive_order,
    }
}
