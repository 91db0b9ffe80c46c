pub mod audit_logs;
pub mod order_statuses;
pub mod orders;
pub mod rider_parcels;
pub mod shops;
pub mod trx_histories;
pub mod wallets;

pub use audit_logs::Entity as AuditLogs;
pub use order_statuses::Entity as OrderStatuses;
pub use orders::Entity as Orders;
pub use rider_parcels::Entity as RiderParcels;
pub use shops::Entity as Shops;
pub use trx_histories::Entity as TrxHistories;
pub use wallets::Entity as Wallets;
