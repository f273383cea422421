use std::cmp::Ordering;

use agvd_core::TransportOrder;
use chrono::{Duration, Utc};

use super::{keys, ComparatorRegistry, PriorityComparator};

/// Lexicographic by name.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrderByName;

impl PriorityComparator<TransportOrder> for OrderByName {
    fn name(&self) -> &'static str {
        keys::BY_NAME
    }

    fn compare(&self, a: &TransportOrder, b: &TransportOrder) -> Ordering {
        a.name.cmp(&b.name)
    }
}

/// Older orders first.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrderByAge;

impl PriorityComparator<TransportOrder> for OrderByAge {
    fn name(&self) -> &'static str {
        keys::BY_AGE
    }

    fn compare(&self, a: &TransportOrder, b: &TransportOrder) -> Ordering {
        a.creation_time.cmp(&b.creation_time)
    }
}

/// Nearer deadlines first.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrderByDeadline;

impl PriorityComparator<TransportOrder> for OrderByDeadline {
    fn name(&self) -> &'static str {
        keys::BY_DEADLINE
    }

    fn compare(&self, a: &TransportOrder, b: &TransportOrder) -> Ordering {
        a.deadline.cmp(&b.deadline)
    }
}

/// Orders whose deadline is within the risk period first.
#[derive(Debug, Clone, Copy)]
pub struct OrderDeadlineAtRiskFirst {
    period: Duration,
}

impl OrderDeadlineAtRiskFirst {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    fn at_risk(&self, order: &TransportOrder) -> bool {
        order.deadline - Utc::now() < self.period
    }
}

impl PriorityComparator<TransportOrder> for OrderDeadlineAtRiskFirst {
    fn name(&self) -> &'static str {
        keys::DEADLINE_AT_RISK_FIRST
    }

    fn compare(&self, a: &TransportOrder, b: &TransportOrder) -> Ordering {
        self.at_risk(b).cmp(&self.at_risk(a))
    }
}

/// Criteria for sorting transport orders.
pub fn order_registry() -> ComparatorRegistry<TransportOrder> {
    ComparatorRegistry::new(|| Box::new(OrderByName))
        .register(keys::BY_NAME, |_| Box::new(OrderByName))
        .register(keys::BY_AGE, |_| Box::new(OrderByAge))
        .register(keys::BY_DEADLINE, |_| Box::new(OrderByDeadline))
        .register(keys::DEADLINE_AT_RISK_FIRST, |config| {
            Box::new(OrderDeadlineAtRiskFirst::new(Duration::milliseconds(
                config.deadline_at_risk_period_ms,
            )))
        })
}
