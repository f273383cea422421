use std::collections::BTreeSet;
use std::sync::Arc;

use agvd_core::{TransportOrder, Vehicle};
use agvd_store::ObjectService;

use super::{reason_if, SelectionFilter};
use crate::candidate::AssignmentCandidate;

/// Reasons why `vehicle` may not process `order` at all.
pub(crate) fn processability_reasons(vehicle: &Vehicle, order: &TransportOrder) -> BTreeSet<String> {
    [
        reason_if(!vehicle.accepts_order_type(&order.order_type), || {
            format!("order type '{}' not acceptable", order.order_type)
        }),
        reason_if(
            order
                .intended_vehicle
                .as_deref()
                .is_some_and(|intended| intended != vehicle.name),
            || "order is intended for another vehicle".to_string(),
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Rejects candidates whose vehicle may not process the order at all.
#[derive(Debug, Default)]
pub struct IsProcessable;

impl SelectionFilter<AssignmentCandidate> for IsProcessable {
    fn apply(&self, candidate: &AssignmentCandidate) -> BTreeSet<String> {
        processability_reasons(candidate.vehicle(), candidate.transport_order())
    }
}

/// Rejects candidates whose vehicle's energy level is critical, unless the
/// order is a recharge order.
#[derive(Debug)]
pub struct HasSufficientEnergy {
    recharge_order_type: String,
}

impl HasSufficientEnergy {
    pub fn new(recharge_order_type: impl Into<String>) -> Self {
        Self {
            recharge_order_type: recharge_order_type.into(),
        }
    }
}

impl SelectionFilter<AssignmentCandidate> for HasSufficientEnergy {
    fn apply(&self, candidate: &AssignmentCandidate) -> BTreeSet<String> {
        reason_if(
            candidate.vehicle().is_energy_level_critical()
                && candidate.transport_order().order_type != self.recharge_order_type,
            || "vehicle energy level is critical".to_string(),
        )
        .into_iter()
        .collect()
    }
}

/// Rejects candidates whose vehicle processes an order that may not be aborted.
pub struct IsNotProcessingIndispensableOrder {
    object_service: Arc<dyn ObjectService>,
}

impl IsNotProcessingIndispensableOrder {
    pub fn new(object_service: Arc<dyn ObjectService>) -> Self {
        Self { object_service }
    }
}

impl SelectionFilter<AssignmentCandidate> for IsNotProcessingIndispensableOrder {
    fn apply(&self, candidate: &AssignmentCandidate) -> BTreeSet<String> {
        let Some(current) = candidate.vehicle().transport_order.as_deref() else {
            return BTreeSet::new();
        };
        let dispensable = self
            .object_service
            .fetch_transport_order(current)
            .map(|order| order.dispensable)
            .unwrap_or(false);
        reason_if(!dispensable, || {
            format!("vehicle is processing indispensable order {}", current)
        })
        .into_iter()
        .collect()
    }
}
