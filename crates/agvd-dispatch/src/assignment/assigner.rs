use std::collections::BTreeSet;
use std::sync::Arc;

use agvd_core::{Result, TransportOrder, Vehicle};
use tracing::{debug, info};

use super::AssignmentState;
use crate::candidate::AssignmentCandidate;
use crate::filter::{
    processability_reasons, CompositeAssignmentCandidateSelectionFilter, SelectionFilter,
};
use crate::order_util::TransportOrderUtil;
use crate::priority::Priorities;
use crate::reservation::OrderReservationPool;
use crate::services::Router;
use crate::status::DispatchingStatusMarker;

/// Pairs transport orders with vehicles.
pub struct OrderAssigner {
    router: Arc<dyn Router>,
    order_util: Arc<TransportOrderUtil>,
    reservation_pool: Arc<OrderReservationPool>,
    status_marker: Arc<DispatchingStatusMarker>,
    candidate_filter: CompositeAssignmentCandidateSelectionFilter,
    priorities: Arc<Priorities>,
}

impl OrderAssigner {
    pub fn new(
        router: Arc<dyn Router>,
        order_util: Arc<TransportOrderUtil>,
        reservation_pool: Arc<OrderReservationPool>,
        status_marker: Arc<DispatchingStatusMarker>,
        candidate_filter: CompositeAssignmentCandidateSelectionFilter,
        priorities: Arc<Priorities>,
    ) -> Self {
        Self {
            router,
            order_util,
            reservation_pool,
            status_marker,
            candidate_filter,
            priorities,
        }
    }

    /// Assign as many of `orders` to `vehicles` as possible.
    ///
    /// Iterates over the smaller of both sets, picking the best candidate for
    /// each element. Afterwards, orders that could not be assigned are marked
    /// as deferred and orders that are no longer rejected as resumed.
    pub fn try_assignments(
        &self,
        vehicles: &[Vehicle],
        orders: &[TransportOrder],
    ) -> Result<AssignmentState> {
        let mut state = AssignmentState::new();

        let mut vehicles = vehicles.to_vec();
        let mut orders = orders.to_vec();
        self.priorities.vehicles.sort(&mut vehicles);
        self.priorities.orders.sort(&mut orders);

        if vehicles.len() < orders.len() {
            for vehicle in &vehicles {
                self.try_assign_order(vehicle, &orders, &mut state)?;
            }
        } else {
            for order in &orders {
                self.try_assign_vehicle(order, &vehicles, &mut state)?;
            }
        }

        self.mark_deferrals(&orders, &state)?;
        Ok(state)
    }

    /// Find the best order for `vehicle`.
    fn try_assign_order(
        &self,
        vehicle: &Vehicle,
        orders: &[TransportOrder],
        state: &mut AssignmentState,
    ) -> Result<()> {
        if state.was_assigned_vehicle(&vehicle.name) {
            return Ok(());
        }

        let mut accepted = Vec::new();
        for order in orders {
            if state.was_assigned_order(&order.name) {
                continue;
            }
            if let Some(candidate) = self.evaluate(vehicle, order, state)? {
                accepted.push(candidate);
            }
        }
        self.commit_best(accepted, state)
    }

    /// Find the best vehicle for `order`.
    fn try_assign_vehicle(
        &self,
        order: &TransportOrder,
        vehicles: &[Vehicle],
        state: &mut AssignmentState,
    ) -> Result<()> {
        if state.was_assigned_order(&order.name) {
            return Ok(());
        }

        let mut accepted = Vec::new();
        for vehicle in vehicles {
            if state.was_assigned_vehicle(&vehicle.name) {
                continue;
            }
            if let Some(candidate) = self.evaluate(vehicle, order, state)? {
                accepted.push(candidate);
            }
        }
        self.commit_best(accepted, state)
    }

    /// Check, route and filter one pairing. Rejections are recorded in `state`.
    fn evaluate(
        &self,
        vehicle: &Vehicle,
        order: &TransportOrder,
        state: &mut AssignmentState,
    ) -> Result<Option<AssignmentCandidate>> {
        let reasons = processability_reasons(vehicle, order);
        if !reasons.is_empty() {
            state.add_filtered_order(&order.name, reasons);
            return Ok(None);
        }

        let Some(candidate) = self.compute_candidate(vehicle, order)? else {
            return Ok(None);
        };

        let reasons = self.filter_candidate(&candidate);
        if reasons.is_empty() {
            Ok(Some(candidate))
        } else {
            debug!(
                "Candidate {}/{} rejected: {:?}",
                vehicle.name, order.name, reasons
            );
            state.add_filtered_order(&order.name, reasons);
            Ok(None)
        }
    }

    /// Route `order` for `vehicle` from its current position.
    ///
    /// `None` if the vehicle's position is unknown or no route exists.
    pub fn compute_candidate(
        &self,
        vehicle: &Vehicle,
        order: &TransportOrder,
    ) -> Result<Option<AssignmentCandidate>> {
        let Some(position) = vehicle.current_position.as_deref() else {
            return Ok(None);
        };
        match self.router.get_route(vehicle, position, order)? {
            Some(drive_orders) => Ok(Some(AssignmentCandidate::new(
                vehicle.clone(),
                order.clone(),
                drive_orders,
            )?)),
            None => {
                debug!("No route for {} with {}", order.name, vehicle.name);
                Ok(None)
            }
        }
    }

    /// Reasons for rejecting `candidate`, empty if acceptable.
    pub fn filter_candidate(&self, candidate: &AssignmentCandidate) -> BTreeSet<String> {
        self.candidate_filter.apply(candidate)
    }

    fn commit_best(
        &self,
        mut accepted: Vec<AssignmentCandidate>,
        state: &mut AssignmentState,
    ) -> Result<()> {
        self.priorities.candidates.sort(&mut accepted);
        match accepted.into_iter().next() {
            Some(best) => self.commit(best, state),
            None => Ok(()),
        }
    }

    /// Assign the candidate, or reserve it if its vehicle is still busy with
    /// a dispensable order.
    fn commit(&self, candidate: AssignmentCandidate, state: &mut AssignmentState) -> Result<()> {
        let vehicle = candidate.vehicle().name.clone();
        let order = candidate.transport_order().name.clone();

        if candidate.vehicle().transport_order.is_none() {
            self.order_util
                .assign_transport_order(&vehicle, &order, candidate.drive_orders().to_vec())?;
            state.add_assigned(candidate);
        } else {
            info!("Reserving {} for {}, aborting its current order", order, vehicle);
            self.reservation_pool.add_reservation(&order, &vehicle);
            self.status_marker.mark_order_as_reserved(&order, &vehicle)?;
            self.order_util.abort_order_by_vehicle(&vehicle, false)?;
            state.add_reserved(candidate);
        }
        Ok(())
    }

    fn mark_deferrals(&self, orders: &[TransportOrder], state: &AssignmentState) -> Result<()> {
        for order in orders {
            if state.was_assigned_order(&order.name) {
                continue;
            }
            match state.filtered_orders().get(&order.name) {
                Some(reasons) => self.status_marker.mark_order_as_deferred(&order.name, reasons)?,
                None if DispatchingStatusMarker::is_order_marked_as_deferred(order) => {
                    self.status_marker.mark_order_as_resumed(&order.name)?
                }
                None => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;
    use agvd_core::{EventCode, ProcState, TransportOrderState, VehicleState};

    #[test]
    fn test_assigns_acceptable_order_and_defers_other() {
        let fixture = Fixture::new();
        fixture.create_vehicle(
            Vehicle::new("Vehicle-01")
                .with_position("A")
                .with_acceptable_order_types([("Load", 0)]),
        );
        fixture.typed_order("TOrder-1", "B", "Load");
        fixture.typed_order("TOrder-2", "C", "Unload");
        let assigner = fixture.order_assigner();

        let vehicle = fixture.vehicle_obj("Vehicle-01");
        let orders = vec![fixture.order("TOrder-1"), fixture.order("TOrder-2")];
        let state = assigner.try_assignments(&[vehicle.clone()], &orders).unwrap();

        assert_eq!(state.assigned_candidates().len(), 1);
        assert_eq!(state.assigned_candidates()[0].transport_order().name, "TOrder-1");
        assert!(state.was_filtered("TOrder-2"));
        assert_eq!(fixture.order("TOrder-1").state, TransportOrderState::BeingProcessed);

        for _ in 0..3 {
            let unassigned = vec![fixture.order("TOrder-2")];
            assigner.try_assignments(&[vehicle.clone()], &unassigned).unwrap();
        }

        let deferred = fixture.order("TOrder-2");
        assert_eq!(deferred.history.count_of(&EventCode::OrderDispatchingDeferred), 1);
        assert_eq!(deferred.state, TransportOrderState::Dispatchable);
    }

    #[test]
    fn test_resumes_when_no_longer_rejected() {
        let fixture = Fixture::new();
        fixture.create_vehicle(Vehicle::new("Vehicle-01").with_position("A").with_energy_level(5));
        fixture.dispatchable_order("TOrder-1", &["B"]);
        let assigner = fixture.order_assigner();

        let orders = vec![fixture.order("TOrder-1")];
        let state = assigner
            .try_assignments(&[fixture.vehicle_obj("Vehicle-01")], &orders)
            .unwrap();
        assert!(state.assigned_candidates().is_empty());
        assert!(DispatchingStatusMarker::is_order_marked_as_deferred(&fixture.order("TOrder-1")));

        // A second vehicle that cannot reach the destination leaves the order
        // unfiltered but unassigned.
        fixture.router.set_unroutable("B");
        fixture.create_vehicle(Vehicle::new("Vehicle-02").with_position("A"));
        let orders = vec![fixture.order("TOrder-1")];
        assigner
            .try_assignments(&[fixture.vehicle_obj("Vehicle-02")], &orders)
            .unwrap();

        let order = fixture.order("TOrder-1");
        assert!(!DispatchingStatusMarker::is_order_marked_as_deferred(&order));
        assert_eq!(order.history.count_of(&EventCode::OrderDispatchingResumed), 1);
    }

    #[test]
    fn test_cheapest_vehicle_wins() {
        let fixture = Fixture::new();
        fixture.vehicle("Vehicle-01", "A");
        fixture.vehicle("Vehicle-02", "C");
        fixture.router.set_cost("A", "B", 50);
        fixture.router.set_cost("C", "B", 5);
        fixture.dispatchable_order("TOrder-1", &["B"]);
        let assigner = fixture.order_assigner();

        let vehicles = vec![fixture.vehicle_obj("Vehicle-01"), fixture.vehicle_obj("Vehicle-02")];
        let state = assigner
            .try_assignments(&vehicles, &[fixture.order("TOrder-1")])
            .unwrap();

        assert_eq!(state.assigned_candidates()[0].vehicle().name, "Vehicle-02");
        assert_eq!(
            fixture.vehicle_obj("Vehicle-02").proc_state,
            ProcState::ProcessingOrder
        );
        assert!(fixture.vehicle_obj("Vehicle-01").has_no_order());
    }

    #[test]
    fn test_intended_vehicle_respected() {
        let fixture = Fixture::new();
        fixture.vehicle("Vehicle-01", "A");
        fixture.vehicle("Vehicle-02", "A");
        fixture
            .store
            .create_transport_order(
                TransportOrder::builder()
                    .name("TOrder-1")
                    .to_point("B")
                    .intended_vehicle("Vehicle-02")
                    .build()
                    .unwrap(),
            )
            .unwrap();
        fixture.make_dispatchable("TOrder-1");
        let assigner = fixture.order_assigner();

        let vehicles = vec![fixture.vehicle_obj("Vehicle-01"), fixture.vehicle_obj("Vehicle-02")];
        let state = assigner
            .try_assignments(&vehicles, &[fixture.order("TOrder-1")])
            .unwrap();

        assert_eq!(state.assigned_candidates()[0].vehicle().name, "Vehicle-02");
    }

    #[test]
    fn test_busy_vehicle_with_dispensable_order_gets_reservation() {
        let fixture = Fixture::new();
        fixture.vehicle("Vehicle-01", "A");
        fixture
            .store
            .create_transport_order(
                TransportOrder::builder()
                    .name("TOrder-0")
                    .to_point("C")
                    .dispensable(true)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        fixture.make_dispatchable("TOrder-0");
        fixture.assign("Vehicle-01", "TOrder-0");
        fixture
            .store
            .update_vehicle_state("Vehicle-01", VehicleState::Executing)
            .unwrap();
        fixture.dispatchable_order("TOrder-1", &["B"]);
        let assigner = fixture.order_assigner();

        let state = assigner
            .try_assignments(&[fixture.vehicle_obj("Vehicle-01")], &[fixture.order("TOrder-1")])
            .unwrap();

        assert_eq!(state.reserved_candidates().len(), 1);
        assert_eq!(
            fixture.reservation_pool.reserved_vehicle("TOrder-1").as_deref(),
            Some("Vehicle-01")
        );
        assert_eq!(
            fixture
                .order("TOrder-1")
                .history
                .count_of(&EventCode::OrderReservedForVehicle),
            1
        );
        assert_eq!(fixture.order("TOrder-0").state, TransportOrderState::Withdrawn);
        assert_eq!(
            fixture.controllers.controller_for("Vehicle-01").aborts(),
            vec![false]
        );
    }
}
