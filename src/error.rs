use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::response::{ApiResponse, Meta};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("Order already delivered")]
    OrderAlreadyDelivered,

    #[error("Order not accepted yet")]
    OrderNotAcceptedYet,

    #[error("Order already in transit")]
    OrderAlreadyInTransit,

    #[error("Order can no longer be edited")]
    OrderLocked,

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Invalid trx code")]
    InvalidTrxCode,

    #[error("Trx code expired")]
    TrxCodeExpired,

    #[error("Transaction not found")]
    TransactionNotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{} of the requested orders were not updated", .0.len())]
    PartialFailure(Vec<BulkFailure>),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[source] DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

/// One order id that a bulk status change could not apply.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkFailure {
    pub order_id: Uuid,
    pub code: String,
    pub error: String,
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
            return AppError::Conflict("Record");
        }
        AppError::OrmError(err)
    }
}

impl AppError {
    /// Stable machine readable code. Clients key on this, never on the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "400001",
            AppError::Forbidden => "403001",
            AppError::InvalidTrxCode => "403004",
            AppError::TrxCodeExpired => "403005",
            AppError::NotFound("Order") => "404006",
            AppError::NotFound("Shop") => "404004",
            AppError::NotFound(_) => "404000",
            AppError::TransactionNotFound => "404007",
            AppError::Conflict("Order") => "409004",
            AppError::Conflict("Wallet") => "409005",
            AppError::Conflict(_) => "409000",
            AppError::OrderAlreadyDelivered => "422003",
            AppError::OrderNotAcceptedYet => "422004",
            AppError::OrderAlreadyInTransit => "422005",
            AppError::OrderLocked => "422006",
            AppError::InsufficientBalance => "422007",
            AppError::PartialFailure(_) => "422008",
            AppError::Cancelled => "499001",
            AppError::DbError(_) | AppError::OrmError(_) => "500001",
            AppError::Internal(_) => "500004",
        }
    }

    /// Human readable title shown to clients.
    pub fn title(&self) -> String {
        match self {
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                "Something went wrong".to_string()
            }
            _ => self.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::TransactionNotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden | AppError::InvalidTrxCode | AppError::TrxCodeExpired => {
                StatusCode::FORBIDDEN
            }
            AppError::OrderAlreadyDelivered
            | AppError::OrderNotAcceptedYet
            | AppError::OrderAlreadyInTransit
            | AppError::OrderLocked
            | AppError::InsufficientBalance
            | AppError::PartialFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Renames a generic unique-constraint conflict after the entity being written.
    pub fn conflict_as(self, entity: &'static str) -> Self {
        match self {
            AppError::Conflict(_) => AppError::Conflict(entity),
            other => other,
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    code: &'static str,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    failures: Option<Vec<BulkFailure>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let failures = match &self {
            AppError::PartialFailure(failures) => Some(failures.clone()),
            _ => None,
        };

        let body = ApiResponse {
            message: self.title(),
            data: Some(ErrorData {
                code: self.code(),
                error: self.to_string(),
                failures,
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
