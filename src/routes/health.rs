use axum::{Json, extract::State};
use sea_orm::DbErr;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Serialize, ToSchema)]
pub struct HealthData {
    pub status: String,
    pub database: String,
}

impl HealthData {
    pub fn from_ping(ping: Result<(), DbErr>) -> Self {
        match ping {
            Ok(()) => Self {
                status: "ok".to_string(),
                database: "up".to_string(),
            },
            Err(err) => {
                tracing::warn!(error = %err, "database ping failed");
                Self {
                    status: "degraded".to_string(),
                    database: "down".to_string(),
                }
            }
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "OK", body = ApiResponse<HealthData>),
    ),
        tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthData>> {
    let data = HealthData::from_ping(state.orm.ping().await);

    Json(ApiResponse::success(
        "Health check",
        data,
        Some(Meta::empty()),
    ))
}
