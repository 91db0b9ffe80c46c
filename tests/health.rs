use courier_ledger::routes::health::HealthData;
use sea_orm::DbErr;

#[test]
fn reachable_database_reports_ok() {
    let data = HealthData::from_ping(Ok(()));
    assert_eq!(data.status, "ok");
    assert_eq!(data.database, "up");
}

#[test]
fn unreachable_database_reports_degraded() {
    let data = HealthData::from_ping(Err(DbErr::Custom("connection refused".into())));
    assert_eq!(data.status, "degraded");
    assert_eq!(data.database, "down");
}
