//! A proposed pairing of vehicle and transport order.

use agvd_core::{DriveOrder, FleetError, Result, TransportOrder, Vehicle};

/// A vehicle, a transport order and the routed drive orders the vehicle would
/// travel when processing it.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentCandidate {
    vehicle: Vehicle,
    transport_order: TransportOrder,
    drive_orders: Vec<DriveOrder>,
    initial_routing_costs: i64,
    complete_routing_costs: i64,
}

impl AssignmentCandidate {
    /// Create a candidate.
    ///
    /// Every drive order must carry a route.
    pub fn new(
        vehicle: Vehicle,
        transport_order: TransportOrder,
        drive_orders: Vec<DriveOrder>,
    ) -> Result<Self> {
        if drive_orders.is_empty() {
            return Err(FleetError::InvalidCandidate(
                "driveOrders is empty".to_string(),
            ));
        }
        if drive_orders.iter().any(|d| d.route.is_none()) {
            return Err(FleetError::InvalidCandidate(
                "a drive order's route is null".to_string(),
            ));
        }

        let initial_routing_costs = drive_orders[0].route_costs();
        let complete_routing_costs = drive_orders.iter().map(DriveOrder::route_costs).sum();

        Ok(Self {
            vehicle,
            transport_order,
            drive_orders,
            initial_routing_costs,
            complete_routing_costs,
        })
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn transport_order(&self) -> &TransportOrder {
        &self.transport_order
    }

    pub fn drive_orders(&self) -> &[DriveOrder] {
        &self.drive_orders
    }

    /// Costs of travelling to the first destination.
    pub fn initial_routing_costs(&self) -> i64 {
        self.initial_routing_costs
    }

    /// Costs of travelling to all destinations.
    pub fn complete_routing_costs(&self) -> i64 {
        self.complete_routing_costs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agvd_core::{Destination, Route, Step};

    fn routed(destination: &str, costs: i64) -> DriveOrder {
        DriveOrder::new(Destination::point(destination))
            .with_route(Route::new(vec![Step::new(None, None, destination, 0, costs)]))
    }

    fn order() -> TransportOrder {
        TransportOrder::builder()
            .name("TOrder-1")
            .to_point("A")
            .to_point("B")
            .build()
            .unwrap()
    }

    #[test]
    fn test_complete_routing_costs() {
        let candidate = AssignmentCandidate::new(
            Vehicle::new("Vehicle-01"),
            order(),
            vec![routed("A", 1234), routed("B", 5678)],
        )
        .unwrap();

        assert_eq!(candidate.initial_routing_costs(), 1234);
        assert_eq!(candidate.complete_routing_costs(), 6912);
    }

    #[test]
    fn test_empty_drive_orders_rejected() {
        let err = AssignmentCandidate::new(Vehicle::new("Vehicle-01"), order(), vec![])
            .unwrap_err();
        assert!(err.to_string().contains("driveOrders is empty"));
    }

    #[test]
    fn test_missing_route_rejected() {
        let err = AssignmentCandidate::new(
            Vehicle::new("Vehicle-01"),
            order(),
            vec![routed("A", 10), DriveOrder::new(Destination::point("B"))],
        )
        .unwrap_err();
        assert!(err.to_string().contains("a drive order's route is null"));
    }
}
