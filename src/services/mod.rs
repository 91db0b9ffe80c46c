pub mod assignment_store;
pub mod bulk_status;
pub mod dashboard;
pub mod ledger_store;
pub mod order_store;
