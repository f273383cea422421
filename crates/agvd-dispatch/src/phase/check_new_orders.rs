use std::sync::Arc;

use agvd_core::Result;

use super::Phase;
use crate::order_util::TransportOrderUtil;

/// Makes new transport orders dispatchable.
pub struct CheckNewOrdersPhase {
    order_util: Arc<TransportOrderUtil>,
}

impl CheckNewOrdersPhase {
    pub fn new(order_util: Arc<TransportOrderUtil>) -> Self {
        Self { order_util }
    }
}

impl Phase for CheckNewOrdersPhase {
    fn name(&self) -> &'static str {
        "check_new_orders"
    }

    fn run(&self) -> Result<()> {
        self.order_util.check_new_orders()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;
    use agvd_core::{TransportOrder, TransportOrderState};
    use agvd_store::ObjectService;

    #[test]
    fn test_dependencies_hold_orders_back() {
        let fixture = Fixture::new();
        fixture.raw_order("TOrder-1", &["B"]);
        fixture
            .store
            .create_transport_order(
                TransportOrder::builder()
                    .name("TOrder-2")
                    .to_point("C")
                    .dependency("TOrder-1")
                    .build()
                    .unwrap(),
            )
            .unwrap();
        fixture.router.set_unroutable("Z");
        fixture.raw_order("TOrder-3", &["Z"]);

        let phase = CheckNewOrdersPhase::new(fixture.order_util());
        phase.run().unwrap();

        assert_eq!(fixture.order("TOrder-1").state, TransportOrderState::Dispatchable);
        assert_eq!(fixture.order("TOrder-2").state, TransportOrderState::Active);
        assert_eq!(fixture.order("TOrder-3").state, TransportOrderState::Unroutable);

        fixture
            .store
            .update_transport_order_state("TOrder-1", TransportOrderState::Finished)
            .unwrap();
        phase.run().unwrap();
        assert_eq!(fixture.order("TOrder-2").state, TransportOrderState::Dispatchable);
    }
}
