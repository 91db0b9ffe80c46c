mod common;

use courier_ledger::{
    dto::{ledger::SettleRequest, orders::StatusDraft},
    error::AppError,
    models::{ActorRef, OrderStatus, PaymentMode},
    services::bulk_status::{BulkOutcome, MAX_BULK_ORDERS},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use common::{accepted_order, order_request, seed_shop, setup_state};

// Dashboard buckets partition the shop's orders; bulk changes report per id.
#[tokio::test]
async fn dashboard_and_bulk_status_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let shop_id = seed_shop(&state, "Dashboard Shop", 60.0).await?;
    state.ledger.open_wallet(shop_id, Uuid::now_v7()).await?;
    let merchant = ActorRef::Merchant(Uuid::now_v7());
    let moderator = ActorRef::Moderator(Uuid::now_v7());

    // One order per bucket, plus a second pending one.
    let created = state
        .orders
        .create(
            shop_id,
            order_request(1.0, "Dhaka", PaymentMode::Paid, 0.0),
            merchant,
        )
        .await?;
    let _accepted = accepted_order(&state, shop_id).await?;
    for status in [
        OrderStatus::InTransit,
        OrderStatus::Returned,
        OrderStatus::Cancelled,
        OrderStatus::Declined,
    ] {
        let order = accepted_order(&state, shop_id).await?;
        state
            .orders
            .append_status(order.id, StatusDraft::new(status, "", moderator))
            .await?;
    }
    let delivered = accepted_order(&state, shop_id).await?;
    state
        .ledger
        .settle(
            delivered.id,
            SettleRequest {
                shop_id,
                payment: 500.0,
                remarks: String::new(),
            },
            moderator,
        )
        .await?;

    let token = CancellationToken::new();
    let snapshot = state
        .dashboard
        .snapshot(shop_id, None, None, &token)
        .await?;
    assert_eq!(snapshot.total, 7);
    assert_eq!(snapshot.delivered, 1);
    assert_eq!(snapshot.in_transit, 1);
    assert_eq!(snapshot.returned, 1);
    assert_eq!(snapshot.cancelled, 1);
    assert_eq!(snapshot.declined, 1);
    assert_eq!(snapshot.pending, 2);
    assert_eq!(
        snapshot.delivered
            + snapshot.in_transit
            + snapshot.returned
            + snapshot.cancelled
            + snapshot.declined
            + snapshot.pending,
        snapshot.total
    );

    let other_shop = state
        .dashboard
        .snapshot(Uuid::now_v7(), None, None, &token)
        .await?;
    assert_eq!(other_shop.total, 0);

    let cancelled = CancellationToken::new();
    cancelled.cancel();
    assert!(matches!(
        state.dashboard.snapshot(shop_id, None, None, &cancelled).await,
        Err(AppError::Cancelled)
    ));

    // Bulk: three movable orders, one unknown id, one delivered order.
    let mut movable = Vec::new();
    for _ in 0..3 {
        movable.push(accepted_order(&state, shop_id).await?.id);
    }
    let missing = Uuid::now_v7();
    let mut ids = movable.clone();
    ids.push(missing);
    ids.push(delivered.id);
    ids.push(movable[0]);

    let report = state
        .bulk
        .apply(
            ids,
            StatusDraft::new(OrderStatus::Picked, "", moderator),
            CancellationToken::new(),
        )
        .await?;
    assert_eq!(report.items.len(), 5);
    assert_eq!(report.applied(), 3);
    let order_of_ids: Vec<Uuid> = report.items.iter().map(|i| i.order_id).collect();
    assert_eq!(&order_of_ids[..3], &movable[..]);
    assert_eq!(
        report.items[3].outcome,
        BulkOutcome::Failed {
            code: "404006".into(),
            message: "Order not found".into(),
        }
    );
    assert!(matches!(
        &report.items[4].outcome,
        BulkOutcome::Failed { code, .. } if code == "422003"
    ));
    for id in &movable {
        let order = state.orders.by_id(*id).await?;
        assert!(order.is_picked);
        assert_eq!(order.statuses[0].status, OrderStatus::Picked);
    }

    let Err(AppError::PartialFailure(failures)) = report.ensure_all_applied() else {
        panic!("expected a partial failure");
    };
    let failed: Vec<Uuid> = failures.iter().map(|f| f.order_id).collect();
    assert_eq!(failed, vec![missing, delivered.id]);

    // A batch cancelled before it starts touches nothing.
    let stopped = CancellationToken::new();
    stopped.cancel();
    let report = state
        .bulk
        .apply(
            vec![created.id],
            StatusDraft::new(OrderStatus::Rescheduled, "", moderator),
            stopped,
        )
        .await?;
    assert_eq!(report.items[0].outcome, BulkOutcome::Cancelled);
    assert_eq!(
        state.orders.by_id(created.id).await?.current_status,
        Some(OrderStatus::Created)
    );

    assert!(matches!(
        state
            .bulk
            .apply(
                vec![created.id],
                StatusDraft::new(OrderStatus::Delivered, "", moderator),
                CancellationToken::new(),
            )
            .await,
        Err(AppError::BadRequest(_))
    ));

    let oversized: Vec<Uuid> = (0..=MAX_BULK_ORDERS).map(|_| Uuid::now_v7()).collect();
    assert!(matches!(
        state
            .bulk
            .apply(
                oversized,
                StatusDraft::new(OrderStatus::Picked, "", moderator),
                CancellationToken::new(),
            )
            .await,
        Err(AppError::BadRequest(_))
    ));

    Ok(())
}
