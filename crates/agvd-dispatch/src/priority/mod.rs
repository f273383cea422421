//! Priority comparators.
//!
//! Orders, vehicles and assignment candidates are sorted by a chain of
//! single-criterion comparators. The chain is built from configured keys via a
//! [`ComparatorRegistry`] and always ends with a name-based tie-breaker, so the
//! resulting order is total and deterministic.

mod candidate;
mod order;
mod vehicle;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use agvd_core::{FleetError, Result, TransportOrder, Vehicle};

pub use candidate::{
    candidate_registry, CandidateByCompleteRoutingCosts, CandidateByInitialRoutingCosts,
    CandidateByNames, CandidateByOrderTypePriority, OnOrder, OnVehicle,
};
pub use order::{
    order_registry, OrderByAge, OrderByDeadline, OrderByName, OrderDeadlineAtRiskFirst,
};
pub use vehicle::{vehicle_registry, VehicleByEnergyLevel, VehicleByName, VehicleIdleFirst};

use crate::candidate::AssignmentCandidate;
use crate::config::DispatcherConfig;

/// Keys of the available criteria.
pub mod keys {
    pub const BY_AGE: &str = "BY_AGE";
    pub const BY_DEADLINE: &str = "BY_DEADLINE";
    pub const DEADLINE_AT_RISK_FIRST: &str = "DEADLINE_AT_RISK_FIRST";
    pub const BY_NAME: &str = "BY_NAME";
    pub const BY_ENERGY_LEVEL: &str = "BY_ENERGY_LEVEL";
    pub const IDLE_FIRST: &str = "IDLE_FIRST";
    pub const BY_INITIAL_ROUTING_COSTS: &str = "BY_INITIAL_ROUTING_COSTS";
    pub const BY_COMPLETE_ROUTING_COSTS: &str = "BY_COMPLETE_ROUTING_COSTS";
    pub const BY_VEHICLE_NAME: &str = "BY_VEHICLE_NAME";
    pub const BY_ORDER_NAME: &str = "BY_ORDER_NAME";
    pub const ORDER_TYPE_PRIORITY: &str = "ORDER_TYPE_PRIORITY";
}

/// A single sorting criterion. `Less` means `a` is preferred over `b`.
pub trait PriorityComparator<T>: Send + Sync {
    /// Key of this criterion.
    fn name(&self) -> &'static str;

    fn compare(&self, a: &T, b: &T) -> Ordering;
}

/// A chain of criteria followed by a tie-breaker.
pub struct CompositeComparator<T> {
    comparators: Vec<Box<dyn PriorityComparator<T>>>,
    tie_breaker: Box<dyn PriorityComparator<T>>,
}

impl<T> CompositeComparator<T> {
    pub fn new(
        comparators: Vec<Box<dyn PriorityComparator<T>>>,
        tie_breaker: Box<dyn PriorityComparator<T>>,
    ) -> Self {
        Self {
            comparators,
            tie_breaker,
        }
    }

    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        self.comparators
            .iter()
            .map(|c| c.compare(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| self.tie_breaker.compare(a, b))
    }

    /// Sort `items`, most preferred first.
    pub fn sort(&self, items: &mut [T]) {
        items.sort_by(|a, b| self.compare(a, b));
    }

    /// Keys of the applied criteria, tie-breaker last.
    pub fn names(&self) -> Vec<&'static str> {
        self.comparators
            .iter()
            .chain(std::iter::once(&self.tie_breaker))
            .map(|c| c.name())
            .collect()
    }
}

type Factory<T> = Box<dyn Fn(&DispatcherConfig) -> Box<dyn PriorityComparator<T>> + Send + Sync>;

/// Criteria available for one kind of subject, by key.
pub struct ComparatorRegistry<T> {
    factories: BTreeMap<&'static str, Factory<T>>,
    tie_breaker: fn() -> Box<dyn PriorityComparator<T>>,
}

impl<T> ComparatorRegistry<T> {
    pub fn new(tie_breaker: fn() -> Box<dyn PriorityComparator<T>>) -> Self {
        Self {
            factories: BTreeMap::new(),
            tie_breaker,
        }
    }

    /// Make a criterion available under `key`.
    pub fn register(
        mut self,
        key: &'static str,
        factory: impl Fn(&DispatcherConfig) -> Box<dyn PriorityComparator<T>> + Send + Sync + 'static,
    ) -> Self {
        self.factories.insert(key, Box::new(factory));
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    /// Build the chain for `keys`, in the given order.
    pub fn build(&self, keys: &[String], config: &DispatcherConfig) -> Result<CompositeComparator<T>> {
        let comparators = keys
            .iter()
            .map(|key| {
                self.factories
                    .get(key.as_str())
                    .map(|factory| factory(config))
                    .ok_or_else(|| {
                        FleetError::InvalidConfiguration(format!(
                            "unknown priority key '{}'",
                            key
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(CompositeComparator::new(comparators, (self.tie_breaker)()))
    }
}

/// The configured comparator chains.
pub struct Priorities {
    pub vehicles: CompositeComparator<Vehicle>,
    pub orders: CompositeComparator<TransportOrder>,
    pub candidates: CompositeComparator<AssignmentCandidate>,
}

impl Priorities {
    /// Build all chains, rejecting unknown keys.
    pub fn from_config(config: &DispatcherConfig) -> Result<Self> {
        Ok(Self {
            vehicles: vehicle_registry().build(&config.vehicle_priorities, config)?,
            orders: order_registry().build(&config.order_priorities, config)?,
            candidates: candidate_registry().build(&config.candidate_priorities, config)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_key_rejected() {
        let err = order_registry()
            .build(&["BY_COLOUR".to_string()], &DispatcherConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, FleetError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_names_end_with_tie_breaker() {
        let comparator: CompositeComparator<TransportOrder> = order_registry()
            .build(
                &[keys::BY_DEADLINE.to_string(), keys::BY_AGE.to_string()],
                &DispatcherConfig::default(),
            )
            .unwrap();
        assert_eq!(
            comparator.names(),
            vec![keys::BY_DEADLINE, keys::BY_AGE, keys::BY_NAME]
        );
    }
}
