//! Implements scheduled (recurring) transactions: the recurring template
//! model, the advancer that materializes due occurrences into the ledger,
//! and the REST endpoints for managing schedules.

pub(crate) mod advancer;
pub(crate) mod core;

mod advance_endpoint;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;
mod status_endpoint;

pub use advance_endpoint::advance_schedules_endpoint;
pub use advancer::{AdvanceOutcome, start_advancer_task};
pub use self::core::{
    Frequency, ScheduleStatus, ScheduledTransaction, create_scheduled_transaction_table,
};
pub use create_endpoint::create_schedule_endpoint;
pub use delete_endpoint::delete_schedule_endpoint;
pub use edit_endpoint::edit_schedule_endpoint;
pub use list_endpoint::list_schedules_endpoint;
pub use status_endpoint::set_schedule_status_endpoint;
