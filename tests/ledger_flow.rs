mod common;

use courier_ledger::{
    dto::{ledger::SettleRequest, orders::StatusDraft},
    entity::{AuditLogs, audit_logs::Column as AuditCol},
    error::AppError,
    models::{ActorRef, OrderStatus, PaymentMode, TrxDirection},
    services::ledger_store::LedgerStore,
    state::AppState,
};
use futures::future::join_all;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use common::{accepted_order, order_request, seed_shop, setup_state};

// One test per binary: setup truncates the shared tables.
#[tokio::test]
async fn ledger_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    settlement_and_cash_out(&state).await?;
    concurrent_settlement_credits_once(&state).await?;
    concurrent_settlements_on_one_shop_all_land(&state).await?;
    reservation_larger_than_balance_is_refused(&state).await?;
    Ok(())
}

// Settlement credits the wallet once; a cash-out code debits it once.
async fn settlement_and_cash_out(state: &AppState) -> anyhow::Result<()> {
    let shop_id = seed_shop(state, "Ledger Shop", 60.0).await?;
    let owner_id = Uuid::now_v7();
    let rider = ActorRef::Rider(Uuid::now_v7());
    let staff_id = Uuid::now_v7();

    let wallet = state.ledger.open_wallet(shop_id, owner_id).await?;
    assert_eq!(wallet.balance, 0.0);
    assert!(matches!(
        state.ledger.open_wallet(shop_id, owner_id).await,
        Err(AppError::Conflict("Wallet"))
    ));

    // Not accepted yet.
    let created = state
        .orders
        .create(
            shop_id,
            order_request(2.5, "Dhaka", PaymentMode::Cod, 1000.0),
            ActorRef::Merchant(owner_id),
        )
        .await?;
    let early = state
        .ledger
        .settle(created.id, settle(shop_id, 500.0), rider)
        .await;
    assert!(matches!(early, Err(AppError::OrderNotAcceptedYet)));

    // 500 collected, 100 charge, 1% of 1000 COD fee.
    let order = accepted_order(state, shop_id).await?;
    assert_eq!(order.charge, 100.0);

    let wrong_shop = state
        .ledger
        .settle(order.id, settle(Uuid::now_v7(), 500.0), rider)
        .await;
    assert!(matches!(wrong_shop, Err(AppError::NotFound("Order"))));

    let settlement = state
        .ledger
        .settle(order.id, settle(shop_id, 500.0), rider)
        .await?;
    assert_eq!(settlement.history.payment, 390.0);
    assert_eq!(settlement.history.payment_type, TrxDirection::In);
    assert_eq!(settlement.history.order_id, Some(order.id));
    assert_eq!(settlement.wallet.balance, 390.0);
    assert!(settlement.order.is_delivered());
    assert_eq!(settlement.order.current_status, Some(OrderStatus::Delivered));
    assert_eq!(settlement.order.statuses[0].status, OrderStatus::Delivered);
    assert_eq!(settlement.order.statuses[0].actor, rider);

    let audited = AuditLogs::find()
        .filter(AuditCol::Action.eq("order_settled"))
        .count(&state.orm)
        .await?;
    assert_eq!(audited, 1);

    // Delivered orders are frozen.
    let again = state
        .ledger
        .settle(order.id, settle(shop_id, 500.0), rider)
        .await;
    assert!(matches!(again, Err(AppError::OrderAlreadyDelivered)));
    let late_status = state
        .orders
        .append_status(order.id, StatusDraft::new(OrderStatus::Returned, "", rider))
        .await;
    assert!(matches!(late_status, Err(AppError::OrderAlreadyDelivered)));

    // Code issuance guards.
    assert!(matches!(
        state.ledger.issue_cash_out_code(shop_id, 391.0).await,
        Err(AppError::InsufficientBalance)
    ));
    assert!(matches!(
        state.ledger.issue_cash_out_code(shop_id, 0.0).await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        state.ledger.issue_cash_out_code(Uuid::now_v7(), 10.0).await,
        Err(AppError::TransactionNotFound)
    ));

    let issued = state.ledger.issue_cash_out_code(shop_id, 390.0).await?;
    assert_eq!(issued.code.len(), 6);
    assert_eq!(issued.amount, 390.0);

    let pending = state.ledger.cash_out_requests(None).await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].wallet.id, wallet.id);
    assert_eq!(pending[0].wallet.amount, 390.0);
    assert_eq!(
        pending[0].shop.as_ref().map(|s| s.name.as_str()),
        Some("Ledger Shop")
    );

    let wrong_code = if issued.code == "000000" { "111111" } else { "000000" };
    assert!(matches!(
        state.ledger.cash_out(staff_id, wallet.id, wrong_code).await,
        Err(AppError::InvalidTrxCode)
    ));
    assert!(matches!(
        state.ledger.cash_out(staff_id, Uuid::now_v7(), &issued.code).await,
        Err(AppError::TransactionNotFound)
    ));

    let paid = state.ledger.cash_out(staff_id, wallet.id, &issued.code).await?;
    assert_eq!(paid.wallet.balance, 0.0);
    assert_eq!(paid.wallet.amount, 0.0);
    assert_eq!(paid.history.payment, 390.0);
    assert_eq!(paid.history.payment_type, TrxDirection::Out);
    assert_eq!(paid.history.created_by, staff_id);

    // Single use.
    assert!(matches!(
        state.ledger.cash_out(staff_id, wallet.id, &issued.code).await,
        Err(AppError::InvalidTrxCode)
    ));
    assert!(state.ledger.cash_out_requests(None).await?.is_empty());

    let summary = state.ledger.wallet_by_shop(shop_id).await?;
    assert_eq!(summary.wallet.balance, 0.0);
    let directions: Vec<TrxDirection> = summary.history.iter().map(|h| h.payment_type).collect();
    assert_eq!(directions, vec![TrxDirection::Out, TrxDirection::In]);
    assert!(matches!(
        state.ledger.wallet_by_shop(Uuid::now_v7()).await,
        Err(AppError::TransactionNotFound)
    ));

    Ok(())
}

// Two riders settling the same order at once: exactly one credit lands.
async fn concurrent_settlement_credits_once(state: &AppState) -> anyhow::Result<()> {
    let shop_id = seed_shop(state, "Race Shop", 60.0).await?;
    let wallet = state.ledger.open_wallet(shop_id, Uuid::now_v7()).await?;
    let order = accepted_order(state, shop_id).await?;

    let first = state.ledger.clone();
    let second = state.ledger.clone();
    let (a, b) = tokio::join!(
        first.settle(order.id, settle(shop_id, 500.0), ActorRef::Rider(Uuid::now_v7())),
        second.settle(order.id, settle(shop_id, 500.0), ActorRef::Rider(Uuid::now_v7())),
    );

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(AppError::OrderAlreadyDelivered)))
    );

    let summary = state.ledger.wallet_by_shop(shop_id).await?;
    assert_eq!(summary.wallet.id, wallet.id);
    assert_eq!(summary.wallet.balance, 390.0);
    assert_eq!(summary.history.len(), 1);

    // An expired code can not be redeemed.
    let short_lived = LedgerStore::new(state.orm.clone(), -1);
    let issued = short_lived.issue_cash_out_code(shop_id, 100.0).await?;
    assert!(matches!(
        state.ledger.cash_out(Uuid::now_v7(), wallet.id, &issued.code).await,
        Err(AppError::TrxCodeExpired)
    ));
    assert_eq!(state.ledger.wallet_by_shop(shop_id).await?.wallet.balance, 390.0);

    Ok(())
}

// Different orders of one shop settled at once all credit the same wallet.
async fn concurrent_settlements_on_one_shop_all_land(state: &AppState) -> anyhow::Result<()> {
    const ORDERS: usize = 8;
    let shop_id = seed_shop(state, "Busy Shop", 60.0).await?;
    state.ledger.open_wallet(shop_id, Uuid::now_v7()).await?;

    let mut orders = Vec::with_capacity(ORDERS);
    for _ in 0..ORDERS {
        orders.push(accepted_order(state, shop_id).await?);
    }

    let results = join_all(orders.iter().map(|order| {
        let ledger = state.ledger.clone();
        let order_id = order.id;
        async move {
            ledger
                .settle(order_id, settle(shop_id, 500.0), ActorRef::Rider(Uuid::now_v7()))
                .await
        }
    }))
    .await;

    for result in &results {
        assert!(result.is_ok(), "settlement failed: {result:?}");
    }
    let summary = state.ledger.wallet_by_shop(shop_id).await?;
    assert_eq!(summary.wallet.balance, 390.0 * ORDERS as f64);
    assert_eq!(summary.history.len(), ORDERS);

    Ok(())
}

// A reservation that no longer fits the balance can not be paid out.
async fn reservation_larger_than_balance_is_refused(state: &AppState) -> anyhow::Result<()> {
    let shop_id = seed_shop(state, "Thin Shop", 60.0).await?;
    let wallet = state.ledger.open_wallet(shop_id, Uuid::now_v7()).await?;
    let rider = ActorRef::Rider(Uuid::now_v7());

    let order = accepted_order(state, shop_id).await?;
    state
        .ledger
        .settle(order.id, settle(shop_id, 500.0), rider)
        .await?;
    let issued = state.ledger.issue_cash_out_code(shop_id, 390.0).await?;

    // Prepaid parcel where the rider collected less than the charge: 50 - 100.
    let prepaid = state
        .orders
        .create(
            shop_id,
            order_request(2.5, "Dhaka", PaymentMode::Paid, 0.0),
            ActorRef::Merchant(Uuid::now_v7()),
        )
        .await?;
    state
        .orders
        .append_status(
            prepaid.id,
            StatusDraft::new(OrderStatus::Accepted, "", ActorRef::Moderator(Uuid::now_v7())),
        )
        .await?;
    let shortfall = state
        .ledger
        .settle(prepaid.id, settle(shop_id, 50.0), rider)
        .await?;
    assert_eq!(shortfall.history.payment, -50.0);
    assert_eq!(shortfall.wallet.balance, 340.0);

    assert!(matches!(
        state.ledger.cash_out(Uuid::now_v7(), wallet.id, &issued.code).await,
        Err(AppError::InsufficientBalance)
    ));

    let summary = state.ledger.wallet_by_shop(shop_id).await?;
    assert_eq!(summary.wallet.balance, 340.0);
    assert_eq!(summary.wallet.amount, 390.0);
    assert!(
        summary
            .history
            .iter()
            .all(|h| h.payment_type == TrxDirection::In)
    );
    assert_eq!(summary.history.len(), 2);

    Ok(())
}

fn settle(shop_id: Uuid, payment: f64) -> SettleRequest {
    SettleRequest {
        shop_id,
        payment,
        remarks: "collected at door".into(),
    }
}
