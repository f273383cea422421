use std::collections::{BTreeMap, BTreeSet};

use crate::candidate::AssignmentCandidate;

/// Outcome of one run of [`OrderAssigner::try_assignments`](super::OrderAssigner::try_assignments).
#[derive(Debug, Default)]
pub struct AssignmentState {
    assigned_candidates: Vec<AssignmentCandidate>,
    reserved_candidates: Vec<AssignmentCandidate>,
    filtered_orders: BTreeMap<String, BTreeSet<String>>,
}

impl AssignmentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_assigned(&mut self, candidate: AssignmentCandidate) {
        self.assigned_candidates.push(candidate);
    }

    pub fn add_reserved(&mut self, candidate: AssignmentCandidate) {
        self.reserved_candidates.push(candidate);
    }

    /// Record reasons for rejecting an order, in addition to earlier ones.
    pub fn add_filtered_order(&mut self, order: &str, reasons: BTreeSet<String>) {
        self.filtered_orders
            .entry(order.to_string())
            .or_default()
            .extend(reasons);
    }

    fn committed(&self) -> impl Iterator<Item = &AssignmentCandidate> {
        self.assigned_candidates
            .iter()
            .chain(self.reserved_candidates.iter())
    }

    /// Whether the order was assigned or reserved.
    pub fn was_assigned_order(&self, order: &str) -> bool {
        self.committed()
            .any(|c| c.transport_order().name == order)
    }

    /// Whether the vehicle got an order assigned or reserved.
    pub fn was_assigned_vehicle(&self, vehicle: &str) -> bool {
        self.committed().any(|c| c.vehicle().name == vehicle)
    }

    pub fn was_filtered(&self, order: &str) -> bool {
        self.filtered_orders.contains_key(order)
    }

    pub fn assigned_candidates(&self) -> &[AssignmentCandidate] {
        &self.assigned_candidates
    }

    pub fn reserved_candidates(&self) -> &[AssignmentCandidate] {
        &self.reserved_candidates
    }

    /// Rejected orders with the reasons collected for them.
    pub fn filtered_orders(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.filtered_orders
    }
}
