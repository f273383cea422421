use std::sync::Arc;

use agvd_core::{ProcState, Result, TransportOrderState};
use agvd_store::ObjectService;

use super::Phase;
use crate::order_util::TransportOrderUtil;

/// Releases vehicles that stopped processing a withdrawn order.
pub struct FinishWithdrawalsPhase {
    object_service: Arc<dyn ObjectService>,
    order_util: Arc<TransportOrderUtil>,
}

impl FinishWithdrawalsPhase {
    pub fn new(object_service: Arc<dyn ObjectService>, order_util: Arc<TransportOrderUtil>) -> Self {
        Self {
            object_service,
            order_util,
        }
    }
}

impl Phase for FinishWithdrawalsPhase {
    fn name(&self) -> &'static str {
        "finish_withdrawals"
    }

    fn run(&self) -> Result<()> {
        let vehicles = self.object_service.fetch_vehicles(&|v| {
            v.proc_state == ProcState::AwaitingOrder && v.transport_order.is_some()
        })?;
        for vehicle in vehicles {
            let Some(order_name) = vehicle.transport_order.as_deref() else {
                continue;
            };
            let order = self.object_service.fetch_transport_order(order_name)?;
            if order.state == TransportOrderState::Withdrawn {
                self.order_util.finish_abortion(order_name, &vehicle)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    #[test]
    fn test_withdrawn_order_fails_when_vehicle_stops() {
        let fixture = Fixture::new();
        fixture.vehicle("Vehicle-01", "A");
        fixture.dispatchable_order("TOrder-1", &["B"]);
        fixture.assign("Vehicle-01", "TOrder-1");
        fixture.order_util().abort_order("TOrder-1", false).unwrap();
        let phase = FinishWithdrawalsPhase::new(fixture.store.clone(), fixture.order_util());

        phase.run().unwrap();
        assert_eq!(fixture.order("TOrder-1").state, TransportOrderState::Withdrawn);

        fixture
            .store
            .update_vehicle_proc_state("Vehicle-01", ProcState::AwaitingOrder)
            .unwrap();
        phase.run().unwrap();

        assert_eq!(fixture.order("TOrder-1").state, TransportOrderState::Failed);
        assert!(fixture.vehicle_obj("Vehicle-01").has_no_order());
    }
}
