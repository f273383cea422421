//! Shortest-path demo router over the plant's paths.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::sync::Arc;

use agvd_core::{DriveOrder, FleetError, Path, Result, Route, Step, TransportOrder, Vehicle};
use agvd_dispatch::Router;
use agvd_store::ObjectService;
use parking_lot::RwLock;
use tracing::{debug, info};

/// Frontier entry of the search.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchNode {
    point: String,
    costs: i64,
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap; names keep the expansion order stable.
        other
            .costs
            .cmp(&self.costs)
            .then_with(|| other.point.cmp(&self.point))
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Demo router for the kernel's loopback plant. Routes along the cheapest
/// sequence of paths, using path lengths as costs.
///
/// Deployments plug their own routing engine in through [`Router`].
///
/// Paths are read from the object service on every request, so lock changes
/// are picked up without a rebuild.
pub struct ShortestPathRouter {
    object_service: Arc<dyn ObjectService>,
    selected_routes: RwLock<HashMap<String, Vec<DriveOrder>>>,
}

impl ShortestPathRouter {
    pub fn new(object_service: Arc<dyn ObjectService>) -> Self {
        Self {
            object_service,
            selected_routes: RwLock::new(HashMap::new()),
        }
    }

    /// The route last selected for a vehicle.
    pub fn selected_route(&self, vehicle: &str) -> Option<Vec<DriveOrder>> {
        self.selected_routes.read().get(vehicle).cloned()
    }

    /// The cheapest route between two points, if any.
    pub fn shortest_route(
        &self,
        source: &str,
        destination: &str,
        respect_locks: bool,
    ) -> Result<Option<Route>> {
        if source == destination {
            return Ok(Some(Route::new(vec![Step::new(None, None, destination, 0, 0)])));
        }

        let paths = self
            .object_service
            .fetch_paths(&|p| !(respect_locks && p.locked))?;
        let mut outgoing: HashMap<&str, Vec<&Path>> = HashMap::new();
        for path in &paths {
            outgoing.entry(path.source_point.as_str()).or_default().push(path);
        }

        let mut best: HashMap<String, i64> = HashMap::from([(source.to_string(), 0)]);
        let mut via: HashMap<String, &Path> = HashMap::new();
        let mut frontier = BinaryHeap::from([SearchNode {
            point: source.to_string(),
            costs: 0,
        }]);

        while let Some(node) = frontier.pop() {
            if node.point == destination {
                break;
            }
            if best.get(&node.point).is_some_and(|&c| node.costs > c) {
                continue;
            }
            for &path in outgoing.get(node.point.as_str()).into_iter().flatten() {
                let costs = node.costs + path.length;
                let improves = best
                    .get(&path.destination_point)
                    .map_or(true, |&known| costs < known);
                if improves {
                    best.insert(path.destination_point.clone(), costs);
                    via.insert(path.destination_point.clone(), path);
                    frontier.push(SearchNode {
                        point: path.destination_point.clone(),
                        costs,
                    });
                }
            }
        }

        if !best.contains_key(destination) {
            return Ok(None);
        }

        let mut travelled = Vec::new();
        let mut point = destination;
        while point != source {
            let Some(path) = via.get(point) else {
                return Ok(None);
            };
            travelled.push(*path);
            point = path.source_point.as_str();
        }
        travelled.reverse();

        Ok(Some(Route::new(
            travelled
                .into_iter()
                .enumerate()
                .map(|(index, path)| {
                    Step::new(
                        Some(path.name.as_str()),
                        Some(path.source_point.as_str()),
                        &path.destination_point,
                        index,
                        path.length,
                    )
                })
                .collect(),
        )))
    }

    fn route_order(
        &self,
        source_point: &str,
        order: &TransportOrder,
        respect_locks: bool,
    ) -> Result<Option<Vec<DriveOrder>>> {
        let mut from = source_point.to_string();
        let mut routed = Vec::new();
        for drive_order in order.current_and_future_drive_orders() {
            let destination = &drive_order.destination.destination;
            let Some(route) = self.shortest_route(&from, destination, respect_locks)? else {
                debug!("No route from {} to {} for {}", from, destination, order.name);
                return Ok(None);
            };
            routed.push(drive_order.clone().with_route(route));
            from = destination.clone();
        }
        Ok(Some(routed))
    }
}

impl Router for ShortestPathRouter {
    fn get_route(
        &self,
        _vehicle: &Vehicle,
        source_point: &str,
        order: &TransportOrder,
    ) -> Result<Option<Vec<DriveOrder>>> {
        self.route_order(source_point, order, true)
    }

    fn get_route_ignoring_path_locks(
        &self,
        _vehicle: &Vehicle,
        source_point: &str,
        order: &TransportOrder,
    ) -> Result<Option<Vec<DriveOrder>>> {
        self.route_order(source_point, order, false)
    }

    fn get_costs(
        &self,
        _vehicle: &Vehicle,
        source_point: &str,
        destination_point: &str,
    ) -> Result<i64> {
        self.shortest_route(source_point, destination_point, true)?
            .map(|route| route.costs())
            .ok_or_else(|| {
                FleetError::RoutingError(format!(
                    "no route from {} to {}",
                    source_point, destination_point
                ))
            })
    }

    fn select_route(&self, vehicle: &Vehicle, drive_orders: Option<&[DriveOrder]>) -> Result<()> {
        let mut selected = self.selected_routes.write();
        match drive_orders {
            Some(drive_orders) => {
                selected.insert(vehicle.name.clone(), drive_orders.to_vec());
            }
            None => {
                selected.remove(&vehicle.name);
            }
        }
        Ok(())
    }

    fn update_routing_topology(&self, paths: &BTreeSet<String>) -> Result<()> {
        info!("Routing topology updated for {} paths", paths.len());
        Ok(())
    }

    /// Routable if some vehicle with a known position can reach every
    /// destination. Without such vehicles any order counts as routable.
    fn check_routability(&self, order: &TransportOrder) -> Result<bool> {
        let positions: BTreeSet<String> = self
            .object_service
            .fetch_vehicles(&|v| v.current_position.is_some())?
            .into_iter()
            .filter_map(|v| v.current_position)
            .collect();
        if positions.is_empty() {
            return Ok(true);
        }
        for position in &positions {
            if self.route_order(position, order, false)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlantConfig;
    use agvd_store::InMemoryObjectService;

    fn demo_router() -> (Arc<InMemoryObjectService>, ShortestPathRouter) {
        let store = Arc::new(InMemoryObjectService::new());
        for path in PlantConfig::demo().paths() {
            store.create_path(path).unwrap();
        }
        let router = ShortestPathRouter::new(store.clone());
        (store, router)
    }

    fn points(route: &Route) -> Vec<&str> {
        route.steps().iter().map(|s| s.destination_point.as_str()).collect()
    }

    #[test]
    fn test_shortest_route() {
        let (_, router) = demo_router();

        let route = router.shortest_route("A", "D", true).unwrap().unwrap();
        assert_eq!(route.costs(), 3200);
        assert_eq!(points(&route), vec!["B", "E", "D"]);
        assert_eq!(route.steps()[0].path.as_deref(), Some("A--B"));
        assert_eq!(route.steps()[2].route_index, 2);

        let route = router.shortest_route("A", "E", true).unwrap().unwrap();
        assert_eq!(points(&route), vec!["B", "E"]);
    }

    #[test]
    fn test_locked_paths_avoided() {
        let (store, router) = demo_router();
        store.update_path_locked("B--E", true).unwrap();

        let route = router.shortest_route("A", "E", true).unwrap().unwrap();
        assert_eq!(points(&route), vec!["F", "E"]);

        let route = router.shortest_route("A", "E", false).unwrap().unwrap();
        assert_eq!(points(&route), vec!["B", "E"]);
    }

    #[test]
    fn test_standstill_and_unreachable() {
        let (store, router) = demo_router();
        let route = router.shortest_route("C", "C", true).unwrap().unwrap();
        assert_eq!(route.costs(), 0);
        assert_eq!(route.steps()[0].path, None);

        store.create_point(agvd_core::Point::new("Z")).unwrap();
        assert!(router.shortest_route("A", "Z", true).unwrap().is_none());
        assert!(router
            .get_costs(&Vehicle::new("Vehicle-01"), "A", "Z")
            .is_err());
    }

    #[test]
    fn test_route_order_chains_legs() {
        let (store, router) = demo_router();
        store
            .create_vehicle(Vehicle::new("Vehicle-01").with_position("A"))
            .unwrap();
        let order = TransportOrder::builder()
            .name("TOrder-1")
            .to_point("C")
            .to_point("F")
            .build()
            .unwrap();
        let vehicle = store.fetch_vehicle("Vehicle-01").unwrap();

        let routed = router.get_route(&vehicle, "A", &order).unwrap().unwrap();
        assert_eq!(routed.len(), 2);
        assert_eq!(routed[0].route_costs(), 2000);
        assert_eq!(routed[1].route.as_ref().unwrap().source_point(), Some("C"));
        assert!(router.check_routability(&order).unwrap());

        let lost = TransportOrder::builder().name("TOrder-2").to_point("Z").build().unwrap();
        assert!(!router.check_routability(&lost).unwrap());

        router.select_route(&vehicle, Some(&routed)).unwrap();
        assert_eq!(router.selected_route("Vehicle-01").map(|r| r.len()), Some(2));
        router.select_route(&vehicle, None).unwrap();
        assert!(router.selected_route("Vehicle-01").is_none());
    }
}
