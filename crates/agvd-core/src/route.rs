//! Routes and route steps.
//!
//! A [`Route`] is an ordered sequence of [`Step`]s; its cost is always the sum
//! of its step costs.

use serde::{Deserialize, Serialize};

use crate::types::{Orientation, ReroutingType};

/// One movement of a vehicle along a path (or a standstill on a point).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// The path travelled, `None` for a step that stays on a point.
    pub path: Option<String>,

    /// The point the step starts at, `None` for the first standstill step.
    pub source_point: Option<String>,

    /// The point the step ends at.
    pub destination_point: String,

    /// The orientation the vehicle travels in.
    pub vehicle_orientation: Orientation,

    /// Position of this step within its route.
    pub route_index: usize,

    /// Cost of travelling this step.
    pub costs: i64,

    /// Whether the vehicle may execute this step yet.
    pub execution_allowed: bool,

    /// How this step came to be.
    pub rerouting_type: ReroutingType,
}

impl Step {
    /// Create a step travelling `path` from `source` to `destination`.
    pub fn new(
        path: Option<&str>,
        source: Option<&str>,
        destination: &str,
        route_index: usize,
        costs: i64,
    ) -> Self {
        Self {
            path: path.map(str::to_string),
            source_point: source.map(str::to_string),
            destination_point: destination.to_string(),
            vehicle_orientation: Orientation::Forward,
            route_index,
            costs,
            execution_allowed: true,
            rerouting_type: ReroutingType::Regular,
        }
    }

    /// Set the orientation.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.vehicle_orientation = orientation;
        self
    }

    /// Set the route index.
    pub fn with_route_index(mut self, route_index: usize) -> Self {
        self.route_index = route_index;
        self
    }

    /// Set the rerouting type.
    pub fn with_rerouting_type(mut self, rerouting_type: ReroutingType) -> Self {
        self.rerouting_type = rerouting_type;
        self
    }

    /// Set whether execution is allowed.
    pub fn with_execution_allowed(mut self, execution_allowed: bool) -> Self {
        self.execution_allowed = execution_allowed;
        self
    }

    /// Compares only what describes the vehicle's movement.
    pub fn equals_in_movement(&self, other: &Step) -> bool {
        self.source_point == other.source_point
            && self.destination_point == other.destination_point
            && self.path == other.path
            && self.vehicle_orientation == other.vehicle_orientation
    }
}

/// A costed, ordered sequence of steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    steps: Vec<Step>,
    costs: i64,
}

impl Route {
    /// Create a route; its cost is the sum of the step costs.
    pub fn new(steps: Vec<Step>) -> Self {
        let costs = steps.iter().map(|s| s.costs).sum();
        Self { steps, costs }
    }

    /// The steps of this route.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Total cost of this route.
    pub fn costs(&self) -> i64 {
        self.costs
    }

    /// The point the route ends at.
    pub fn final_destination_point(&self) -> Option<&str> {
        self.steps.last().map(|s| s.destination_point.as_str())
    }

    /// The point the route starts at.
    pub fn source_point(&self) -> Option<&str> {
        self.steps
            .first()
            .map(|s| s.source_point.as_deref().unwrap_or(&s.destination_point))
    }

    /// Returns a copy with the given steps, recomputing the cost.
    pub fn with_steps(&self, steps: Vec<Step>) -> Self {
        Self::new(steps)
    }

    /// Returns a copy with every step passed through `f`.
    pub fn map_steps(&self, f: impl FnMut(Step) -> Step) -> Self {
        Self::new(self.steps.iter().cloned().map(f).collect())
    }

    /// Returns true if the route has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_route() -> Route {
        Route::new(vec![
            Step::new(Some("A--B"), Some("A"), "B", 0, 10),
            Step::new(Some("B--C"), Some("B"), "C", 1, 15),
        ])
    }

    #[test]
    fn test_costs_are_sum_of_steps() {
        let route = sample_route();
        assert_eq!(route.costs(), 25);

        let shorter = route.with_steps(route.steps()[..1].to_vec());
        assert_eq!(shorter.costs(), 10);
    }

    #[test]
    fn test_end_points() {
        let route = sample_route();
        assert_eq!(route.source_point(), Some("A"));
        assert_eq!(route.final_destination_point(), Some("C"));
        assert_eq!(Route::new(vec![]).final_destination_point(), None);
    }

    #[test]
    fn test_equals_in_movement_ignores_index_and_costs() {
        let a = Step::new(Some("A--B"), Some("A"), "B", 0, 10);
        let b = Step::new(Some("A--B"), Some("A"), "B", 3, 99);
        assert!(a.equals_in_movement(&b));

        let reversed = b.clone().with_orientation(Orientation::Backward);
        assert!(!a.equals_in_movement(&reversed));
    }
}
