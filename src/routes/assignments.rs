use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{AssignOrderRequest, AssignedOrder, RiderParcelList},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::Role,
    response::{ApiResponse, Meta},
    routes::params::CursorQuery,
    services::assignment_store::RIDER_PAGE_SIZE,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(assign_order))
        .route("/rider/{rider_id}", get(parcels_by_rider))
}

#[utoipa::path(
    post,
    path = "/api/assignments",
    request_body = AssignOrderRequest,
    responses(
        (status = 200, description = "Order handed to the rider", body = ApiResponse<AssignedOrder>),
        (status = 404, description = "Order not found"),
        (status = 422, description = "Order already delivered or in transit"),
    ),
    security(("bearer_auth" = [])),
    tag = "Assignments"
)]
pub async fn assign_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AssignOrderRequest>,
) -> AppResult<Json<ApiResponse<AssignedOrder>>> {
    ensure_staff(&user)?;
    let assigned = state
        .assignments
        .assign(payload.rider_id, payload.order_id, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(
        "Order assigned",
        assigned,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    get,
    path = "/api/assignments/rider/{rider_id}",
    params(
        ("rider_id" = Uuid, Path, description = "Rider ID"),
        CursorQuery
    ),
    responses(
        (status = 200, description = "The rider's parcels, newest first", body = ApiResponse<RiderParcelList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Assignments"
)]
pub async fn parcels_by_rider(
    State(state): State<AppState>,
    user: AuthUser,
    Path(rider_id): Path<Uuid>,
    Query(query): Query<CursorQuery>,
) -> AppResult<Json<ApiResponse<RiderParcelList>>> {
    let is_self = user.role == Role::Rider && user.user_id == rider_id;
    if !is_self && !user.is_staff() {
        return Err(AppError::Forbidden);
    }

    let items = state
        .assignments
        .parcels_by_rider(rider_id, query.cursor)
        .await?;
    let meta = Meta::keyset(
        RIDER_PAGE_SIZE,
        items.len(),
        items.last().map(|item| item.assignment.id),
    );
    Ok(Json(ApiResponse::success(
        "OK",
        RiderParcelList { items },
        Some(meta),
    )))
}
