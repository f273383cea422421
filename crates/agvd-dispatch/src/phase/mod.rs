//! Steps of a dispatch run.
//!
//! Each phase handles one concern and is run in a fixed sequence by the
//! dispatcher.

mod assign_free_orders;
mod assign_next_drive_orders;
mod assign_reserved_orders;
mod check_new_orders;
mod finish_withdrawals;

use agvd_core::Result;

pub use assign_free_orders::AssignFreeOrdersPhase;
pub use assign_next_drive_orders::AssignNextDriveOrdersPhase;
pub use assign_reserved_orders::AssignReservedOrdersPhase;
pub use check_new_orders::CheckNewOrdersPhase;
pub use finish_withdrawals::FinishWithdrawalsPhase;

/// One step of a dispatch run.
pub trait Phase: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(&self) -> Result<()>;
}
