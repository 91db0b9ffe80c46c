use anyhow::Result;
use futures::future::BoxFuture;
use rand::Rng;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbErr, IsolationLevel,
    RuntimeErr, Statement, TransactionTrait,
};
use std::{path::PathBuf, time::Duration};
use tokio::fs;

use crate::error::{AppError, AppResult};

/// Attempts per transaction before a deadlock or serialization conflict is surfaced.
const MAX_TX_ATTEMPTS: u32 = 8;
/// Upper bound of the first retry delay; doubles per attempt.
const RETRY_BASE_MS: u64 = 10;

/// Create a SeaORM connection.
pub async fn create_orm_conn(database_url: &str) -> Result<DatabaseConnection> {
    let conn = Database::connect(database_url).await?;
    Ok(conn)
}

/// Minimal migration runner that executes SQL files in `migrations/` in filename order.
pub async fn run_migrations(conn: &DatabaseConnection) -> Result<()> {
    let mut entries = fs::read_dir("migrations").await?;
    let mut files: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let backend = conn.get_database_backend();
    for file in files {
        let sql = fs::read_to_string(&file).await?;
        // Postgres prepared statements cannot contain multiple commands,
        // so split the migration file and run each statement individually.
        for stmt in sql.split(';') {
            let stmt = stmt.trim();
            if stmt.is_empty() {
                continue;
            }
            let statement = format!("{stmt};");
            conn.execute(Statement::from_string(backend, statement))
                .await?;
        }
    }

    Ok(())
}

/// Runs `op` inside a READ COMMITTED transaction.
///
/// Commits when `op` succeeds and rolls back on any error, so callers never
/// observe a half-applied write. Every mutating `op` starts by locking the row
/// it guards (`SELECT ... FOR UPDATE`), so its checks run against the latest
/// committed state and concurrent writers queue on the lock instead of
/// aborting. Wallet increments (`balance = balance + $n`) wait the same way.
///
/// Deadlocks and serialization failures still rerun `op` from scratch after a
/// jittered, growing delay. `op` therefore has to be safe to call more than once.
pub async fn with_transaction<T, F>(orm: &DatabaseConnection, op: F) -> AppResult<T>
where
    T: Send,
    F: for<'c> Fn(&'c DatabaseTransaction) -> BoxFuture<'c, AppResult<T>>,
{
    let mut attempt = 1;
    loop {
        let txn = orm
            .begin_with_config(Some(IsolationLevel::ReadCommitted), None)
            .await?;

        let err = match op(&txn).await {
            Ok(value) => match txn.commit().await {
                Ok(()) => return Ok(value),
                Err(err) => AppError::from(err),
            },
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::warn!(error = %rollback_err, "transaction rollback failed");
                }
                err
            }
        };

        if attempt < MAX_TX_ATTEMPTS && is_retryable(&err) {
            let delay = retry_delay(attempt);
            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying transaction after conflict");
            tokio::time::sleep(delay).await;
            attempt += 1;
            continue;
        }
        return Err(err);
    }
}

/// Random delay in `[1, RETRY_BASE_MS * 2^(attempt-1)]` milliseconds.
fn retry_delay(attempt: u32) -> Duration {
    let ceiling = RETRY_BASE_MS << (attempt.saturating_sub(1)).min(6);
    Duration::from_millis(rand::thread_rng().gen_range(1..=ceiling))
}

fn is_retryable(err: &AppError) -> bool {
    match err {
        AppError::OrmError(db_err) => is_serialization_failure(db_err),
        AppError::DbError(sqlx::Error::Database(db_err)) => {
            matches!(db_err.code().as_deref(), Some("40001" | "40P01"))
        }
        _ => false,
    }
}

/// `40001` serialization_failure or `40P01` deadlock_detected.
fn is_serialization_failure(err: &DbErr) -> bool {
    let runtime = match err {
        DbErr::Exec(e) | DbErr::Query(e) | DbErr::Conn(e) => e,
        _ => return false,
    };
    match runtime {
        RuntimeErr::SqlxError(sqlx::Error::Database(db_err)) => {
            matches!(db_err.code().as_deref(), Some("40001" | "40P01"))
        }
        _ => false,
    }
}
