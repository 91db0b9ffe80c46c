use sea_orm::DatabaseConnection;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppResult;

pub async fn log_audit(
    orm: &DatabaseConnection,
    actor_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::now_v7();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, actor_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(actor_id)
    .bind(action)
    .bind(resource)
    .bind(metadata)
    .execute(orm.get_postgres_connection_pool())
    .await?;

    Ok(())
}

/// Writes an audit row after a committed change. A failure is logged, never returned.
pub async fn record(
    orm: &DatabaseConnection,
    actor_id: Option<Uuid>,
    action: &str,
    resource: &str,
    metadata: Value,
) {
    if let Err(err) = log_audit(orm, actor_id, action, Some(resource), Some(metadata)).await {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}
