//! Selection filters.
//!
//! A filter inspects one subject and returns the reasons why it must not be
//! used. An empty set means the subject is acceptable. Composites evaluate
//! every member and return the union of all reasons.

mod candidate;
mod order;
mod vehicle;

use std::collections::BTreeSet;
use std::sync::Arc;

use agvd_core::{TransportOrder, Vehicle};
use agvd_store::ObjectService;

pub(crate) use candidate::processability_reasons;
pub use candidate::{HasSufficientEnergy, IsNotProcessingIndispensableOrder, IsProcessable};
pub use order::IsFreelyDispatchableToAnyVehicle;
pub use vehicle::IsAvailableForAnyOrder;

use crate::candidate::AssignmentCandidate;
use crate::config::DispatcherConfig;
use crate::reservation::OrderReservationPool;

/// A veto predicate over one kind of subject.
pub trait SelectionFilter<T>: Send + Sync {
    /// Reasons for rejecting `subject`, empty if it is acceptable.
    fn apply(&self, subject: &T) -> BTreeSet<String>;
}

/// Applies a set of filters and merges their reasons.
pub struct CompositeSelectionFilter<T> {
    filters: Vec<Box<dyn SelectionFilter<T>>>,
}

impl<T> CompositeSelectionFilter<T> {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter.
    pub fn with(mut self, filter: impl SelectionFilter<T> + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn push(&mut self, filter: Box<dyn SelectionFilter<T>>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl<T> Default for CompositeSelectionFilter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SelectionFilter<T> for CompositeSelectionFilter<T> {
    fn apply(&self, subject: &T) -> BTreeSet<String> {
        // No short-circuit: every reason is collected.
        self.filters
            .iter()
            .flat_map(|filter| filter.apply(subject))
            .collect()
    }
}

pub type CompositeVehicleSelectionFilter = CompositeSelectionFilter<Vehicle>;
pub type CompositeTransportOrderSelectionFilter = CompositeSelectionFilter<TransportOrder>;
pub type CompositeAssignmentCandidateSelectionFilter = CompositeSelectionFilter<AssignmentCandidate>;

/// Vehicles that may get a new order.
pub fn default_vehicle_filter(
    object_service: Arc<dyn ObjectService>,
    reservation_pool: Arc<OrderReservationPool>,
) -> CompositeVehicleSelectionFilter {
    CompositeSelectionFilter::new().with(IsAvailableForAnyOrder::new(object_service, reservation_pool))
}

/// Orders that may be assigned to any vehicle.
pub fn default_order_filter(
    reservation_pool: Arc<OrderReservationPool>,
) -> CompositeTransportOrderSelectionFilter {
    CompositeSelectionFilter::new().with(IsFreelyDispatchableToAnyVehicle::new(reservation_pool))
}

/// Acceptable pairings of vehicle and order.
pub fn default_candidate_filter(
    object_service: Arc<dyn ObjectService>,
    config: &DispatcherConfig,
) -> CompositeAssignmentCandidateSelectionFilter {
    CompositeSelectionFilter::new()
        .with(IsProcessable)
        .with(HasSufficientEnergy::new(config.recharge_order_type.clone()))
        .with(IsNotProcessingIndispensableOrder::new(object_service))
}

/// A single reason, or none.
pub(crate) fn reason_if(condition: bool, reason: impl FnOnce() -> String) -> Option<String> {
    condition.then(reason)
}
