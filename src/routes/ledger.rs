use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::ledger::{
        CashOut, CashOutRequest, IssueCashOutCodeRequest, IssuedCode, OpenWalletRequest,
        PendingCashOutList, WalletSummary,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_shop_access, ensure_staff},
    models::Wallet,
    response::{ApiResponse, Meta},
    routes::params::CursorQuery,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(open_wallet))
        .route("/cash-out-requests", get(cash_out_requests))
        .route("/shop/{shop_id}", get(wallet_by_shop))
        .route("/shop/{shop_id}/cash-out-code", post(issue_cash_out_code))
        .route("/{wallet_id}/cash-out", post(cash_out))
}

#[utoipa::path(
    post,
    path = "/api/ledger",
    request_body = OpenWalletRequest,
    responses(
        (status = 200, description = "Wallet opened", body = ApiResponse<Wallet>),
        (status = 409, description = "Shop already has a wallet"),
    ),
    security(("bearer_auth" = [])),
    tag = "Ledger"
)]
pub async fn open_wallet(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<OpenWalletRequest>,
) -> AppResult<Json<ApiResponse<Wallet>>> {
    ensure_admin(&user)?;
    let wallet = state
        .ledger
        .open_wallet(payload.shop_id, payload.owner_id)
        .await?;
    Ok(Json(ApiResponse::success(
        "Wallet opened",
        wallet,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    get,
    path = "/api/ledger/shop/{shop_id}",
    params(("shop_id" = Uuid, Path, description = "Shop ID")),
    responses(
        (status = 200, description = "Wallet and recent history", body = ApiResponse<WalletSummary>),
        (status = 404, description = "Shop has no wallet"),
    ),
    security(("bearer_auth" = [])),
    tag = "Ledger"
)]
pub async fn wallet_by_shop(
    State(state): State<AppState>,
    user: AuthUser,
    Path(shop_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<WalletSummary>>> {
    ensure_shop_access(&user, shop_id)?;
    let summary = state.ledger.wallet_by_shop(shop_id).await?;
    Ok(Json(ApiResponse::success("OK", summary, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/ledger/shop/{shop_id}/cash-out-code",
    params(("shop_id" = Uuid, Path, description = "Shop ID")),
    request_body = IssueCashOutCodeRequest,
    responses(
        (status = 200, description = "One-time code, shown once", body = ApiResponse<IssuedCode>),
        (status = 404, description = "Shop has no wallet"),
        (status = 422, description = "Insufficient balance"),
    ),
    security(("bearer_auth" = [])),
    tag = "Ledger"
)]
pub async fn issue_cash_out_code(
    State(state): State<AppState>,
    user: AuthUser,
    Path(shop_id): Path<Uuid>,
    Json(payload): Json<IssueCashOutCodeRequest>,
) -> AppResult<Json<ApiResponse<IssuedCode>>> {
    if user.own_shop()? != shop_id {
        return Err(AppError::Forbidden);
    }
    let issued = state
        .ledger
        .issue_cash_out_code(shop_id, payload.amount)
        .await?;
    Ok(Json(ApiResponse::success(
        "Cash-out code issued",
        issued,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/ledger/{wallet_id}/cash-out",
    params(("wallet_id" = Uuid, Path, description = "Wallet ID")),
    request_body = CashOutRequest,
    responses(
        (status = 200, description = "Reserved amount paid out", body = ApiResponse<CashOut>),
        (status = 403, description = "Invalid or expired code"),
        (status = 404, description = "Wallet not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Ledger"
)]
pub async fn cash_out(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wallet_id): Path<Uuid>,
    Json(payload): Json<CashOutRequest>,
) -> AppResult<Json<ApiResponse<CashOut>>> {
    ensure_staff(&user)?;
    let cash_out = state
        .ledger
        .cash_out(user.user_id, wallet_id, &payload.code)
        .await?;
    Ok(Json(ApiResponse::success(
        "Cash out completed",
        cash_out,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    get,
    path = "/api/ledger/cash-out-requests",
    params(CursorQuery),
    responses(
        (status = 200, description = "Wallets with a reserved amount", body = ApiResponse<PendingCashOutList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Ledger"
)]
pub async fn cash_out_requests(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CursorQuery>,
) -> AppResult<Json<ApiResponse<PendingCashOutList>>> {
    ensure_staff(&user)?;
    let items = state.ledger.cash_out_requests(query.cursor).await?;
    let meta = Meta::keyset(
        state.ledger.cash_out_page_size(),
        items.len(),
        items.last().map(|item| item.wallet.id),
    );
    Ok(Json(ApiResponse::success(
        "OK",
        PendingCashOutList { items },
        Some(meta),
    )))
}
