use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        ledger::{
            CashOut, CashOutRequest, IssueCashOutCodeRequest, IssuedCode, OpenWalletRequest,
            PendingCashOut, PendingCashOutList, SettleRequest, Settlement, WalletSummary,
        },
        orders::{
            AssignOrderRequest, AssignedOrder, BulkStatusRequest, CreateOrderRequest, OrderList,
            RiderParcelList, StatusUpdateRequest, UpdateOrderRequest,
        },
    },
    error::BulkFailure,
    models::{
        Assignment, DeliveryType, Order, OrderStatus, PaymentMode, Role, Shop, StatusEntry,
        TrxDirection, TrxHistory, Wallet,
    },
    response::{ApiResponse, Meta},
    routes::{assignments, health, ledger, orders, params},
    services::{
        bulk_status::{BulkItem, BulkOutcome, BulkStatusReport},
        dashboard::DashboardSnapshot,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::track_order,
        orders::update_order,
        orders::append_status,
        orders::cancel_order,
        orders::bulk_status,
        orders::dashboard,
        orders::deliver_order,
        assignments::assign_order,
        assignments::parcels_by_rider,
        ledger::open_wallet,
        ledger::wallet_by_shop,
        ledger::issue_cash_out_code,
        ledger::cash_out,
        ledger::cash_out_requests
    ),
    components(
        schemas(
            Order,
            StatusEntry,
            OrderStatus,
            PaymentMode,
            DeliveryType,
            Role,
            Shop,
            Assignment,
            Wallet,
            TrxHistory,
            TrxDirection,
            CreateOrderRequest,
            UpdateOrderRequest,
            StatusUpdateRequest,
            BulkStatusRequest,
            AssignOrderRequest,
            SettleRequest,
            IssueCashOutCodeRequest,
            CashOutRequest,
            OpenWalletRequest,
            OrderList,
            AssignedOrder,
            RiderParcelList,
            Settlement,
            IssuedCode,
            CashOut,
            WalletSummary,
            PendingCashOut,
            PendingCashOutList,
            BulkItem,
            BulkOutcome,
            BulkStatusReport,
            BulkFailure,
            DashboardSnapshot,
            params::OrderListQuery,
            params::DateRangeQuery,
            params::CursorQuery,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<Settlement>,
            ApiResponse<WalletSummary>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Orders", description = "Order lifecycle endpoints"),
        (name = "Assignments", description = "Rider assignment endpoints"),
        (name = "Ledger", description = "Wallet and cash-out endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
