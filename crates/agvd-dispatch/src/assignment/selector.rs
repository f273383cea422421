use std::sync::Arc;

use agvd_core::{FleetError, Result, TransportOrder, Vehicle};
use agvd_store::ObjectService;
use tracing::debug;

use crate::filter::{CompositeVehicleSelectionFilter, SelectionFilter};
use crate::priority::Priorities;

/// Selects vehicles that may get a new transport order.
pub struct VehicleSelector {
    object_service: Arc<dyn ObjectService>,
    vehicle_filter: CompositeVehicleSelectionFilter,
    priorities: Arc<Priorities>,
}

impl VehicleSelector {
    pub fn new(
        object_service: Arc<dyn ObjectService>,
        vehicle_filter: CompositeVehicleSelectionFilter,
        priorities: Arc<Priorities>,
    ) -> Self {
        Self {
            object_service,
            vehicle_filter,
            priorities,
        }
    }

    /// All available vehicles, most preferred first.
    pub fn available_vehicles(&self) -> Result<Vec<Vehicle>> {
        let mut vehicles: Vec<Vehicle> = self
            .object_service
            .fetch_vehicles(&|_| true)?
            .into_iter()
            .filter(|vehicle| {
                let reasons = self.vehicle_filter.apply(vehicle);
                if !reasons.is_empty() {
                    debug!("Vehicle {} not available: {:?}", vehicle.name, reasons);
                }
                reasons.is_empty()
            })
            .collect();
        self.priorities.vehicles.sort(&mut vehicles);
        Ok(vehicles)
    }

    /// The vehicle an order is to be assigned to directly.
    pub fn vehicle_for_direct_assignment(&self, order: &TransportOrder) -> Result<Vehicle> {
        let name = order.intended_vehicle.as_deref().ok_or_else(|| {
            FleetError::IllegalState {
                name: order.name.clone(),
                message: "no intended vehicle".to_string(),
            }
        })?;
        self.object_service.fetch_vehicle(name)
    }
}
