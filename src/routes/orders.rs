use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    dto::{
        ledger::{SettleRequest, Settlement},
        orders::{
            BulkStatusRequest, CreateOrderRequest, OrderList, StatusDraft, StatusUpdateRequest,
            UpdateOrderRequest,
        },
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_carrier, ensure_role, ensure_shop_access, ensure_staff},
    models::{Order, Role},
    response::{ApiResponse, Meta},
    routes::params::{DateRangeQuery, OrderListQuery},
    services::{bulk_status::BulkStatusReport, dashboard::DashboardSnapshot},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/bulk-status", post(bulk_status))
        .route("/track/{track_id}", get(track_order))
        .route("/dashboard/{shop_id}", get(dashboard))
        .route("/{id}", get(get_order).put(update_order))
        .route("/{id}/status", post(append_status))
        .route("/{id}/cancel", post(cancel_order))
        .route("/{id}/deliver", post(deliver_order))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders, newest first", body = ApiResponse<OrderList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let mut filter = query.into_filter()?;
    if !user.is_staff() {
        filter.shop_id = Some(user.own_shop()?);
    }

    let items = state.orders.filter(&filter).await?;
    let meta = Meta::keyset(filter.page_size(), items.len(), items.last().map(|o| o.id));
    Ok(Json(ApiResponse::success("Ok", OrderList { items }, Some(meta))))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created", body = ApiResponse<Order>),
        (status = 400, description = "Invalid order"),
        (status = 404, description = "Shop not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let shop_id = user.own_shop()?;
    let order = state.orders.create(shop_id, payload, user.actor()).await?;
    Ok(Json(ApiResponse::success(
        "Order created",
        order,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with its status log", body = ApiResponse<Order>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders.by_id(id).await?;
    if user.role == Role::Rider {
        ensure_carrier(&user, order.rider_id)?;
    } else {
        ensure_shop_access(&user, order.shop_id)?;
    }
    Ok(Json(ApiResponse::success("OK", order, Some(Meta::empty()))))
}

#[utoipa::path(
    get,
    path = "/api/orders/track/{track_id}",
    params(("track_id" = String, Path, description = "Public tracking id")),
    responses(
        (status = 200, description = "Order with its status log", body = ApiResponse<Order>),
        (status = 404, description = "Not Found"),
    ),
    tag = "Orders"
)]
pub async fn track_order(
    State(state): State<AppState>,
    Path(track_id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders.by_track_id(&track_id).await?;
    Ok(Json(ApiResponse::success("OK", order, Some(Meta::empty()))))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<Order>),
        (status = 404, description = "Not Found"),
        (status = 422, description = "Order can no longer be edited"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let shop_id = user.own_shop()?;
    let order = state
        .orders
        .update(id, shop_id, payload, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(
        "Order updated",
        order,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Status appended", body = ApiResponse<Order>),
        (status = 403, description = "Rider does not carry this order"),
        (status = 404, description = "Not Found"),
        (status = 422, description = "Order already delivered"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn append_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusUpdateRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    ensure_role(&user, &[Role::Admin, Role::Moderator, Role::Rider])?;
    ensure_rider_carries(&state, &user, id).await?;
    let draft = StatusDraft::new(payload.status, payload.text, user.actor());
    let order = state.orders.append_status(id, draft).await?;
    Ok(Json(ApiResponse::success(
        "Status updated",
        order,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<Order>),
        (status = 404, description = "Not Found"),
        (status = 422, description = "Order already picked"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let shop_id = user.own_shop()?;
    let order = state.orders.cancel(id, shop_id, user.actor()).await?;
    Ok(Json(ApiResponse::success(
        "Order cancelled",
        order,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/orders/bulk-status",
    request_body = BulkStatusRequest,
    responses(
        (status = 200, description = "Every order updated", body = ApiResponse<BulkStatusReport>),
        (status = 422, description = "Some orders were not updated"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn bulk_status(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<BulkStatusRequest>,
) -> AppResult<Json<ApiResponse<BulkStatusReport>>> {
    ensure_staff(&user)?;
    let token = CancellationToken::new();
    let _cancel_on_drop = token.clone().drop_guard();

    let draft = StatusDraft::new(payload.status, payload.text, user.actor());
    let report = state
        .bulk
        .apply(payload.order_ids, draft, token)
        .await?
        .ensure_all_applied()?;
    Ok(Json(ApiResponse::success(
        "Status updated",
        report,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    get,
    path = "/api/orders/dashboard/{shop_id}",
    params(
        ("shop_id" = Uuid, Path, description = "Shop ID"),
        DateRangeQuery
    ),
    responses(
        (status = 200, description = "Order counts per category", body = ApiResponse<DashboardSnapshot>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
    Path(shop_id): Path<Uuid>,
    Query(range): Query<DateRangeQuery>,
) -> AppResult<Json<ApiResponse<DashboardSnapshot>>> {
    ensure_shop_access(&user, shop_id)?;
    let (start, end) = range.bounds()?;

    let token = CancellationToken::new();
    let _cancel_on_drop = token.clone().drop_guard();
    let snapshot = state
        .dashboard
        .snapshot(shop_id, start, end, &token)
        .await?;
    Ok(Json(ApiResponse::success(
        "OK",
        snapshot,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/deliver",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = SettleRequest,
    responses(
        (status = 200, description = "Order delivered and wallet credited", body = ApiResponse<Settlement>),
        (status = 403, description = "Rider does not carry this order"),
        (status = 404, description = "Order or wallet not found"),
        (status = 422, description = "Order already delivered or not accepted"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn deliver_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SettleRequest>,
) -> AppResult<Json<ApiResponse<Settlement>>> {
    ensure_role(&user, &[Role::Admin, Role::Moderator, Role::Rider])?;
    ensure_rider_carries(&state, &user, id).await?;
    let settlement = state.ledger.settle(id, payload, user.actor()).await?;
    Ok(Json(ApiResponse::success(
        "Order delivered",
        settlement,
        Some(Meta::empty()),
    )))
}

async fn ensure_rider_carries(state: &AppState, user: &AuthUser, order_id: Uuid) -> AppResult<()> {
    if user.role != Role::Rider {
        return Ok(());
    }
    let order = state.orders.by_id(order_id).await?;
    ensure_carrier(user, order.rider_id)
}
