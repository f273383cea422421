use std::cmp::Ordering;

use agvd_core::{Vehicle, VehicleState};

use super::{keys, ComparatorRegistry, PriorityComparator};

#[derive(Debug, Default, Clone, Copy)]
pub struct VehicleByName;

impl PriorityComparator<Vehicle> for VehicleByName {
    fn name(&self) -> &'static str {
        keys::BY_NAME
    }

    fn compare(&self, a: &Vehicle, b: &Vehicle) -> Ordering {
        a.name.cmp(&b.name)
    }
}

/// Higher energy level first.
#[derive(Debug, Default, Clone, Copy)]
pub struct VehicleByEnergyLevel;

impl PriorityComparator<Vehicle> for VehicleByEnergyLevel {
    fn name(&self) -> &'static str {
        keys::BY_ENERGY_LEVEL
    }

    fn compare(&self, a: &Vehicle, b: &Vehicle) -> Ordering {
        b.energy_level.cmp(&a.energy_level)
    }
}

/// Idle vehicles before vehicles in any other state.
#[derive(Debug, Default, Clone, Copy)]
pub struct VehicleIdleFirst;

impl PriorityComparator<Vehicle> for VehicleIdleFirst {
    fn name(&self) -> &'static str {
        keys::IDLE_FIRST
    }

    fn compare(&self, a: &Vehicle, b: &Vehicle) -> Ordering {
        let idle = |v: &Vehicle| v.state == VehicleState::Idle;
        idle(b).cmp(&idle(a))
    }
}

/// Criteria for sorting vehicles.
pub fn vehicle_registry() -> ComparatorRegistry<Vehicle> {
    ComparatorRegistry::new(|| Box::new(VehicleByName))
        .register(keys::BY_NAME, |_| Box::new(VehicleByName))
        .register(keys::BY_ENERGY_LEVEL, |_| Box::new(VehicleByEnergyLevel))
        .register(keys::IDLE_FIRST, |_| Box::new(VehicleIdleFirst))
}
