#![allow(dead_code)]

use chrono::Utc;
use courier_ledger::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::orders::{CreateOrderRequest, StatusDraft, UpdateOrderRequest},
    entity::shops::ActiveModel as ShopActive,
    models::{ActorRef, DeliveryType, Order, OrderStatus, PaymentMode},
    state::AppState,
};
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use uuid::Uuid;

/// `None` when no database is configured, so the caller can skip.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE trx_histories, wallets, rider_parcels, order_statuses, orders, shops, audit_logs CASCADE",
    ))
    .await?;

    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        bulk_status_concurrency: 4,
        cash_out_code_ttl_hours: 72,
    };
    Ok(Some(AppState::new(orm, &config)))
}

pub async fn seed_shop(state: &AppState, name: &str, base_charge: f64) -> anyhow::Result<Uuid> {
    let now = Utc::now();
    let shop = ShopActive {
        id: Set(Uuid::now_v7()),
        owner_id: Set(Uuid::now_v7()),
        name: Set(name.to_string()),
        base_charge: Set(base_charge),
        delivery_zone: Set("Dhaka".into()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(shop.id)
}

pub fn order_request(weight: f64, city: &str, payment_status: PaymentMode, price: f64) -> CreateOrderRequest {
    CreateOrderRequest {
        details: UpdateOrderRequest {
            recipient_name: "Karim".into(),
            recipient_phone: "01711000000".into(),
            recipient_city: city.into(),
            recipient_thana: "Mirpur".into(),
            recipient_area: "Mirpur 10".into(),
            recipient_zip: "1216".into(),
            recipient_address: "House 4, Road 2".into(),
            package_code: String::new(),
            payment_status,
            price,
            parcel_type: "Parcel".into(),
            requested_delivery_time: None,
            pick_address: "Shop floor".into(),
            pick_hub: "Central".into(),
            comments: String::new(),
            number_of_items: 1,
            weight,
            delivery_type: DeliveryType::Regular,
        },
        merchant_id: None,
    }
}

/// A COD order worth 1000 weighing 2.5 kg inside Dhaka, accepted by a moderator.
pub async fn accepted_order(state: &AppState, shop_id: Uuid) -> anyhow::Result<Order> {
    let order = state
        .orders
        .create(
            shop_id,
            order_request(2.5, "Dhaka", PaymentMode::Cod, 1000.0),
            ActorRef::Merchant(Uuid::now_v7()),
        )
        .await?;
    let order = state
        .orders
        .append_status(
            order.id,
            StatusDraft::new(OrderStatus::Accepted, "", ActorRef::Moderator(Uuid::now_v7())),
        )
        .await?;
    Ok(order)
}
