use std::cmp::Ordering;

use agvd_core::{OrderTypeMatch, TransportOrder, Vehicle};
use chrono::Duration;

use super::order::{OrderByAge, OrderByDeadline, OrderByName, OrderDeadlineAtRiskFirst};
use super::vehicle::{VehicleByEnergyLevel, VehicleByName, VehicleIdleFirst};
use super::{keys, ComparatorRegistry, PriorityComparator};
use crate::candidate::AssignmentCandidate;

/// Applies a transport order criterion to the candidates' orders.
pub struct OnOrder<C> {
    key: &'static str,
    inner: C,
}

impl<C> OnOrder<C> {
    pub fn new(key: &'static str, inner: C) -> Self {
        Self { key, inner }
    }
}

impl<C: PriorityComparator<TransportOrder>> PriorityComparator<AssignmentCandidate> for OnOrder<C> {
    fn name(&self) -> &'static str {
        self.key
    }

    fn compare(&self, a: &AssignmentCandidate, b: &AssignmentCandidate) -> Ordering {
        self.inner.compare(a.transport_order(), b.transport_order())
    }
}

/// Applies a vehicle criterion to the candidates' vehicles.
pub struct OnVehicle<C> {
    key: &'static str,
    inner: C,
}

impl<C> OnVehicle<C> {
    pub fn new(key: &'static str, inner: C) -> Self {
        Self { key, inner }
    }
}

impl<C: PriorityComparator<Vehicle>> PriorityComparator<AssignmentCandidate> for OnVehicle<C> {
    fn name(&self) -> &'static str {
        self.key
    }

    fn compare(&self, a: &AssignmentCandidate, b: &AssignmentCandidate) -> Ordering {
        self.inner.compare(a.vehicle(), b.vehicle())
    }
}

/// Lower costs to the first destination first.
#[derive(Debug, Default, Clone, Copy)]
pub struct CandidateByInitialRoutingCosts;

impl PriorityComparator<AssignmentCandidate> for CandidateByInitialRoutingCosts {
    fn name(&self) -> &'static str {
        keys::BY_INITIAL_ROUTING_COSTS
    }

    fn compare(&self, a: &AssignmentCandidate, b: &AssignmentCandidate) -> Ordering {
        a.initial_routing_costs().cmp(&b.initial_routing_costs())
    }
}

/// Lower costs for the whole order first.
#[derive(Debug, Default, Clone, Copy)]
pub struct CandidateByCompleteRoutingCosts;

impl PriorityComparator<AssignmentCandidate> for CandidateByCompleteRoutingCosts {
    fn name(&self) -> &'static str {
        keys::BY_COMPLETE_ROUTING_COSTS
    }

    fn compare(&self, a: &AssignmentCandidate, b: &AssignmentCandidate) -> Ordering {
        a.complete_routing_costs().cmp(&b.complete_routing_costs())
    }
}

/// Preferred order types first.
///
/// A vehicle listing the order's type explicitly beats one that only accepts
/// it through the wildcard, whatever the wildcard's priority. Within the same
/// kind of match, lower priority values win.
#[derive(Debug, Default, Clone, Copy)]
pub struct CandidateByOrderTypePriority;

impl CandidateByOrderTypePriority {
    fn rank(candidate: &AssignmentCandidate) -> (u8, i32) {
        match candidate
            .vehicle()
            .order_type_match(&candidate.transport_order().order_type)
        {
            Some(OrderTypeMatch::Exact(priority)) => (0, priority),
            Some(OrderTypeMatch::Wildcard(priority)) => (1, priority),
            None => (2, 0),
        }
    }
}

impl PriorityComparator<AssignmentCandidate> for CandidateByOrderTypePriority {
    fn name(&self) -> &'static str {
        keys::ORDER_TYPE_PRIORITY
    }

    fn compare(&self, a: &AssignmentCandidate, b: &AssignmentCandidate) -> Ordering {
        Self::rank(a).cmp(&Self::rank(b))
    }
}

/// Vehicle name, then order name.
#[derive(Debug, Default, Clone, Copy)]
pub struct CandidateByNames;

impl PriorityComparator<AssignmentCandidate> for CandidateByNames {
    fn name(&self) -> &'static str {
        keys::BY_NAME
    }

    fn compare(&self, a: &AssignmentCandidate, b: &AssignmentCandidate) -> Ordering {
        VehicleByName
            .compare(a.vehicle(), b.vehicle())
            .then_with(|| OrderByName.compare(a.transport_order(), b.transport_order()))
    }
}

/// Criteria for sorting assignment candidates.
pub fn candidate_registry() -> ComparatorRegistry<AssignmentCandidate> {
    ComparatorRegistry::new(|| Box::new(CandidateByNames))
        .register(keys::BY_AGE, |_| Box::new(OnOrder::new(keys::BY_AGE, OrderByAge)))
        .register(keys::BY_DEADLINE, |_| {
            Box::new(OnOrder::new(keys::BY_DEADLINE, OrderByDeadline))
        })
        .register(keys::DEADLINE_AT_RISK_FIRST, |config| {
            Box::new(OnOrder::new(
                keys::DEADLINE_AT_RISK_FIRST,
                OrderDeadlineAtRiskFirst::new(Duration::milliseconds(
                    config.deadline_at_risk_period_ms,
                )),
            ))
        })
        .register(keys::BY_ORDER_NAME, |_| {
            Box::new(OnOrder::new(keys::BY_ORDER_NAME, OrderByName))
        })
        .register(keys::BY_ENERGY_LEVEL, |_| {
            Box::new(OnVehicle::new(keys::BY_ENERGY_LEVEL, VehicleByEnergyLevel))
        })
        .register(keys::IDLE_FIRST, |_| {
            Box::new(OnVehicle::new(keys::IDLE_FIRST, VehicleIdleFirst))
        })
        .register(keys::BY_VEHICLE_NAME, |_| {
            Box::new(OnVehicle::new(keys::BY_VEHICLE_NAME, VehicleByName))
        })
        .register(keys::BY_INITIAL_ROUTING_COSTS, |_| {
            Box::new(CandidateByInitialRoutingCosts)
        })
        .register(keys::BY_COMPLETE_ROUTING_COSTS, |_| {
            Box::new(CandidateByCompleteRoutingCosts)
        })
        .register(keys::ORDER_TYPE_PRIORITY, |_| {
            Box::new(CandidateByOrderTypePriority)
        })
}
