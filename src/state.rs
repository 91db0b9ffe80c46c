use sea_orm::DatabaseConnection;

use crate::{
    config::AppConfig,
    services::{
        assignment_store::RiderAssignmentStore, bulk_status::BulkStatusChanger,
        dashboard::DashboardAggregator, ledger_store::LedgerStore, order_store::OrderStore,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub orders: OrderStore,
    pub ledger: LedgerStore,
    pub assignments: RiderAssignmentStore,
    pub dashboard: DashboardAggregator,
    pub bulk: BulkStatusChanger,
}

impl AppState {
    pub fn new(orm: DatabaseConnection, config: &AppConfig) -> Self {
        let orders = OrderStore::new(orm.clone());
        Self {
            ledger: LedgerStore::new(orm.clone(), config.cash_out_code_ttl_hours),
            assignments: RiderAssignmentStore::new(orm.clone()),
            dashboard: DashboardAggregator::new(orm.clone()),
            bulk: BulkStatusChanger::new(orders.clone(), config.bulk_status_concurrency),
            orders,
            orm,
        }
    }
}
