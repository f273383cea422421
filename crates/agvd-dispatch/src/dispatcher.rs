//! The dispatcher facade.

use std::collections::BTreeSet;
use std::sync::Arc;

use agvd_core::{FleetError, ReroutingType, Result};
use agvd_store::ObjectService;
use tracing::{debug, info, warn};

use crate::assignment::{
    OrderAssigner, TransportOrderAssignmentChecker, TransportOrderAssignmentVeto, VehicleSelector,
};
use crate::config::{DispatcherConfig, RerouteTrigger};
use crate::filter::{default_candidate_filter, default_order_filter, default_vehicle_filter};
use crate::order_util::TransportOrderUtil;
use crate::phase::{
    AssignFreeOrdersPhase, AssignNextDriveOrdersPhase, AssignReservedOrdersPhase,
    CheckNewOrdersPhase, FinishWithdrawalsPhase, Phase,
};
use crate::priority::Priorities;
use crate::reroute::RerouteUtil;
use crate::reservation::OrderReservationPool;
use crate::services::{Router, VehicleControllerPool};
use crate::status::DispatchingStatusMarker;

/// Assigns transport orders to vehicles and keeps them moving.
///
/// All methods are expected to be called from one task at a time.
pub struct DefaultDispatcher {
    config: DispatcherConfig,
    object_service: Arc<dyn ObjectService>,
    router: Arc<dyn Router>,
    reservation_pool: Arc<OrderReservationPool>,
    order_util: Arc<TransportOrderUtil>,
    reroute_util: Arc<RerouteUtil>,
    order_assigner: Arc<OrderAssigner>,
    vehicle_selector: Arc<VehicleSelector>,
    assignment_checker: TransportOrderAssignmentChecker,
    phases: Vec<Box<dyn Phase>>,
}

impl DefaultDispatcher {
    /// Wire up a dispatcher.
    ///
    /// Fails if the configuration names an unknown priority criterion.
    pub fn new(
        config: DispatcherConfig,
        object_service: Arc<dyn ObjectService>,
        router: Arc<dyn Router>,
        controller_pool: Arc<dyn VehicleControllerPool>,
    ) -> Result<Self> {
        let priorities = Arc::new(Priorities::from_config(&config)?);
        let reservation_pool = Arc::new(OrderReservationPool::new());
        let status_marker = Arc::new(DispatchingStatusMarker::new(object_service.clone()));

        let order_util = Arc::new(TransportOrderUtil::new(
            object_service.clone(),
            router.clone(),
            controller_pool.clone(),
            reservation_pool.clone(),
            status_marker.clone(),
            config.dismiss_unroutable_transport_orders,
        ));
        let reroute_util = Arc::new(RerouteUtil::new(
            object_service.clone(),
            router.clone(),
            controller_pool.clone(),
            config.rerouting_impossible_strategy,
        ));
        let order_assigner = Arc::new(OrderAssigner::new(
            router.clone(),
            order_util.clone(),
            reservation_pool.clone(),
            status_marker,
            default_candidate_filter(object_service.clone(), &config),
            priorities.clone(),
        ));
        let vehicle_selector = Arc::new(VehicleSelector::new(
            object_service.clone(),
            default_vehicle_filter(object_service.clone(), reservation_pool.clone()),
            priorities,
        ));

        let phases: Vec<Box<dyn Phase>> = vec![
            Box::new(CheckNewOrdersPhase::new(order_util.clone())),
            Box::new(FinishWithdrawalsPhase::new(
                object_service.clone(),
                order_util.clone(),
            )),
            Box::new(AssignNextDriveOrdersPhase::new(
                object_service.clone(),
                controller_pool,
                order_util.clone(),
                reroute_util.clone(),
                config.reroute_trigger,
            )),
            Box::new(AssignReservedOrdersPhase::new(
                object_service.clone(),
                reservation_pool.clone(),
                order_assigner.clone(),
                order_util.clone(),
            )),
            Box::new(AssignFreeOrdersPhase::new(
                object_service.clone(),
                vehicle_selector.clone(),
                default_order_filter(reservation_pool.clone()),
                order_assigner.clone(),
            )),
        ];

        let assignment_checker =
            TransportOrderAssignmentChecker::new(object_service.clone(), reservation_pool.clone());

        info!(
            "Dispatcher ready (reroute trigger: {:?}, rerouting impossible: {:?})",
            config.reroute_trigger, config.rerouting_impossible_strategy
        );
        Ok(Self {
            config,
            object_service,
            router,
            reservation_pool,
            order_util,
            reroute_util,
            order_assigner,
            vehicle_selector,
            assignment_checker,
            phases,
        })
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn reservation_pool(&self) -> &Arc<OrderReservationPool> {
        &self.reservation_pool
    }

    /// Run all dispatch phases once.
    pub fn dispatch(&self) -> Result<()> {
        debug!("Dispatch run started");
        for phase in &self.phases {
            phase.run().map_err(|err| {
                warn!("Phase {} failed: {}", phase.name(), err);
                err
            })?;
        }
        Ok(())
    }

    /// Withdraw a transport order.
    pub fn withdraw_by_transport_order(&self, order: &str, immediate: bool) -> Result<()> {
        self.order_util.abort_order(order, immediate)
    }

    /// Withdraw whatever order the vehicle is processing.
    pub fn withdraw_by_vehicle(&self, vehicle: &str, immediate: bool) -> Result<()> {
        self.order_util.abort_order_by_vehicle(vehicle, immediate)
    }

    /// Reroute a single vehicle. Returns true if its route changed.
    pub fn reroute(&self, vehicle: &str, rerouting_type: ReroutingType) -> Result<bool> {
        let vehicle = self.object_service.fetch_vehicle(vehicle)?;
        self.reroute_util.reroute(&vehicle, rerouting_type)
    }

    /// Reroute all vehicles processing an order.
    pub fn reroute_all(&self, rerouting_type: ReroutingType) -> Result<()> {
        self.reroute_util.reroute_all(rerouting_type)
    }

    /// Paths were locked or unlocked.
    pub fn topology_changed(&self, paths: &BTreeSet<String>) -> Result<()> {
        info!("Routing topology changed: {:?}", paths);
        self.router.update_routing_topology(paths)?;
        if self.config.reroute_trigger == RerouteTrigger::TopologyChange {
            self.reroute_all(ReroutingType::Regular)?;
        }
        Ok(())
    }

    /// Assign an order to its intended vehicle right away.
    pub fn assign_now(&self, order_name: &str) -> Result<()> {
        let order = self.object_service.fetch_transport_order(order_name)?;
        let veto = self
            .assignment_checker
            .check_transport_order_assignment(&order)?;
        if veto != TransportOrderAssignmentVeto::NoVeto {
            warn!("Direct assignment of {} vetoed: {}", order_name, veto);
            return Err(FleetError::AssignmentVetoed {
                order: order_name.to_string(),
                veto: veto.to_string(),
            });
        }

        let vehicle = self.vehicle_selector.vehicle_for_direct_assignment(&order)?;
        let Some(candidate) = self.order_assigner.compute_candidate(&vehicle, &order)? else {
            return Err(FleetError::Unroutable {
                order: order_name.to_string(),
                vehicle: vehicle.name,
            });
        };
        let reasons = self.order_assigner.filter_candidate(&candidate);
        if !reasons.is_empty() {
            return Err(FleetError::AssignmentVetoed {
                order: order_name.to_string(),
                veto: reasons.into_iter().collect::<Vec<_>>().join(", "),
            });
        }

        self.order_util.assign_transport_order(
            &vehicle.name,
            order_name,
            candidate.drive_orders().to_vec(),
        )
    }
}
