use chrono::{Duration, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::{
    audit,
    db::with_transaction,
    dto::{
        ledger::{CashOut, IssuedCode, PendingCashOut, SettleRequest, Settlement, WalletSummary},
        orders::StatusDraft,
    },
    entity::{
        shops::{Entity as Shops, Model as ShopModel},
        trx_histories::{
            ActiveModel as TrxActive, Column as TrxCol, Entity as TrxHistories, Model as TrxModel,
        },
        wallets::{
            ActiveModel as WalletActive, Column as WalletCol, Entity as Wallets,
            Model as WalletModel,
        },
    },
    error::{AppError, AppResult},
    models::{ActorRef, OrderStatus, PaymentMode, Shop, TrxDirection, TrxHistory, Wallet},
    password, random,
    services::order_store::{apply_status, load_order, lock_order},
};

/// Share of the declared price kept as a COD handling fee.
pub const COD_FEE_RATE: f64 = 0.01;
const HISTORY_PAGE: u64 = 15;
const CASH_OUT_PAGE: u64 = 10;

/// Amount credited to the shop for a delivered order.
pub fn net_payable(gross: f64, charge: f64, price: f64, mode: PaymentMode) -> f64 {
    let net = gross - charge;
    match mode {
        PaymentMode::Cod => net - price * COD_FEE_RATE,
        PaymentMode::Paid => net,
    }
}

/// Per-shop wallets and their credit/debit history.
#[derive(Clone)]
pub struct LedgerStore {
    orm: DatabaseConnection,
    code_ttl: Duration,
}

impl LedgerStore {
    pub fn new(orm: DatabaseConnection, code_ttl_hours: i64) -> Self {
        Self {
            orm,
            code_ttl: Duration::hours(code_ttl_hours),
        }
    }

    /// Creates an empty wallet for a shop. A shop owns at most one.
    pub async fn open_wallet(&self, shop_id: Uuid, owner_id: Uuid) -> AppResult<Wallet> {
        let now = Utc::now();
        let wallet = WalletActive {
            id: Set(Uuid::now_v7()),
            shop_id: Set(shop_id),
            owner_id: Set(owner_id),
            balance: Set(0.0),
            amount: Set(0.0),
            trx_code: Set(None),
            trx_code_expires_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&self.orm)
        .await
        .map_err(|e| AppError::from(e).conflict_as("Wallet"))?;

        tracing::info!(wallet_id = %wallet.id, shop_id = %shop_id, "wallet opened");
        Ok(wallet_from_entity(wallet))
    }

    /// Marks the order delivered and credits the shop's wallet in one transaction.
    pub async fn settle(
        &self,
        order_id: Uuid,
        request: SettleRequest,
        actor: ActorRef,
    ) -> AppResult<Settlement> {
        let created_by = actor
            .id()
            .ok_or_else(|| AppError::BadRequest("settlement needs an acting user".into()))?;
        if !request.payment.is_finite() {
            return Err(AppError::BadRequest("payment must be a number".into()));
        }

        let settlement = with_transaction(&self.orm, |txn| {
            let request = request.clone();
            Box::pin(async move {
                let existing = lock_order(txn, order_id).await?;
                if existing.shop_id != request.shop_id {
                    return Err(AppError::NotFound("Order"));
                }
                if existing.delivered_at.is_some() {
                    return Err(AppError::OrderAlreadyDelivered);
                }
                if !existing.is_accepted {
                    return Err(AppError::OrderNotAcceptedYet);
                }

                let mode: PaymentMode = existing.payment_status.parse().map_err(anyhow::Error::from)?;
                let net = net_payable(request.payment, existing.charge, existing.price, mode);
                let now = Utc::now();

                let draft = StatusDraft::new(OrderStatus::Delivered, "", actor);
                apply_status(txn, existing, &draft, now).await?;

                let wallet = credit_wallet(txn, request.shop_id, net).await?;
                let history = TrxActive {
                    id: Set(Uuid::now_v7()),
                    payment: Set(net),
                    payment_type: Set(TrxDirection::In.as_str().to_string()),
                    trx_id: Set(wallet.id),
                    shop_id: Set(request.shop_id),
                    order_id: Set(Some(order_id)),
                    remarks: Set(request.remarks),
                    created_by: Set(created_by),
                    created_at: Set(now.into()),
                }
                .insert(txn)
                .await?;

                Ok(Settlement {
                    wallet: wallet_from_entity(wallet),
                    history: trx_from_entity(history)?,
                    order: load_order(txn, order_id).await?,
                })
            })
        })
        .await?;

        tracing::info!(
            order_id = %order_id,
            shop_id = %request.shop_id,
            net = settlement.history.payment,
            "order settled"
        );
        audit::record(
            &self.orm,
            Some(created_by),
            "order_settled",
            "orders",
            serde_json::json!({ "order_id": order_id, "net": settlement.history.payment }),
        )
        .await;

        Ok(settlement)
    }

    /// Reserves `amount` behind a fresh one-time code. The plaintext is returned here and nowhere else.
    pub async fn issue_cash_out_code(&self, shop_id: Uuid, amount: f64) -> AppResult<IssuedCode> {
        if !(amount.is_finite() && amount > 0.0) {
            return Err(AppError::BadRequest("amount must be greater than zero".into()));
        }

        let code = random::cash_out_code();
        let hash = password::hash_secret_blocking(code.clone()).await?;
        let expires_at = (Utc::now() + self.code_ttl).timestamp_millis();

        with_transaction(&self.orm, |txn| {
            let hash = hash.clone();
            Box::pin(async move {
                let wallet = Wallets::find()
                    .filter(WalletCol::ShopId.eq(shop_id))
                    .lock(LockType::Update)
                    .one(txn)
                    .await?
                    .ok_or(AppError::TransactionNotFound)?;
                if wallet.balance < amount {
                    return Err(AppError::InsufficientBalance);
                }

                let mut active: WalletActive = wallet.into();
                active.trx_code = Set(Some(hash));
                active.trx_code_expires_at = Set(Some(expires_at));
                active.amount = Set(amount);
                active.updated_at = Set(Utc::now().into());
                active.update(txn).await?;
                Ok(())
            })
        })
        .await?;

        tracing::info!(shop_id = %shop_id, amount, "cash-out code issued");
        Ok(IssuedCode {
            code,
            amount,
            expires_at,
        })
    }

    /// Redeems the pending code, debiting the reserved amount exactly once.
    pub async fn cash_out(&self, actor_id: Uuid, wallet_id: Uuid, code: &str) -> AppResult<CashOut> {
        let code = code.trim().to_string();

        // Verify against the current hash before taking the row lock; the
        // transaction then only proceeds if that same hash is still pending.
        let pending = Wallets::find_by_id(wallet_id)
            .one(&self.orm)
            .await?
            .ok_or(AppError::TransactionNotFound)?;
        let Some(verified_hash) = pending.trx_code else {
            return Err(AppError::InvalidTrxCode);
        };
        if !password::verify_secret_blocking(code, verified_hash.clone()).await? {
            return Err(AppError::InvalidTrxCode);
        }

        let cash_out = with_transaction(&self.orm, |txn| {
            let verified_hash = verified_hash.clone();
            Box::pin(async move {
                let wallet = Wallets::find_by_id(wallet_id)
                    .lock(LockType::Update)
                    .one(txn)
                    .await?
                    .ok_or(AppError::TransactionNotFound)?;

                if wallet.amount <= 0.0 || wallet.trx_code.as_deref() != Some(verified_hash.as_str()) {
                    return Err(AppError::InvalidTrxCode);
                }
                let now = Utc::now();
                if wallet
                    .trx_code_expires_at
                    .is_none_or(|expires_at| now.timestamp_millis() > expires_at)
                {
                    return Err(AppError::TrxCodeExpired);
                }
                if wallet.balance < wallet.amount {
                    return Err(AppError::InsufficientBalance);
                }

                let amount = wallet.amount;
                Wallets::update_many()
                    .col_expr(WalletCol::Balance, Expr::col(WalletCol::Balance).sub(amount))
                    .col_expr(WalletCol::Amount, Expr::value(0.0_f64))
                    .col_expr(WalletCol::TrxCode, Expr::value(Option::<String>::None))
                    .col_expr(WalletCol::TrxCodeExpiresAt, Expr::value(Option::<i64>::None))
                    .col_expr(WalletCol::UpdatedAt, Expr::value(now))
                    .filter(WalletCol::Id.eq(wallet_id))
                    .exec(txn)
                    .await?;

                let history = TrxActive {
                    id: Set(Uuid::now_v7()),
                    payment: Set(amount),
                    payment_type: Set(TrxDirection::Out.as_str().to_string()),
                    trx_id: Set(wallet.id),
                    shop_id: Set(wallet.shop_id),
                    order_id: Set(None),
                    remarks: Set("Cash out".to_string()),
                    created_by: Set(actor_id),
                    created_at: Set(now.into()),
                }
                .insert(txn)
                .await?;

                let wallet = Wallets::find_by_id(wallet_id)
                    .one(txn)
                    .await?
                    .ok_or(AppError::TransactionNotFound)?;

                Ok(CashOut {
                    wallet: wallet_from_entity(wallet),
                    history: trx_from_entity(history)?,
                })
            })
        })
        .await?;

        tracing::info!(wallet_id = %wallet_id, amount = cash_out.history.payment, "cash-out redeemed");
        audit::record(
            &self.orm,
            Some(actor_id),
            "cash_out",
            "wallets",
            serde_json::json!({ "wallet_id": wallet_id, "amount": cash_out.history.payment }),
        )
        .await;

        Ok(cash_out)
    }

    /// The shop's wallet together with its most recent history rows.
    pub async fn wallet_by_shop(&self, shop_id: Uuid) -> AppResult<WalletSummary> {
        let wallet = async {
            Wallets::find()
                .filter(WalletCol::ShopId.eq(shop_id))
                .one(&self.orm)
                .await?
                .ok_or(AppError::TransactionNotFound)
        };
        let history = async {
            let rows = TrxHistories::find()
                .filter(TrxCol::ShopId.eq(shop_id))
                .order_by_desc(TrxCol::CreatedAt)
                .order_by_desc(TrxCol::Id)
                .limit(HISTORY_PAGE)
                .all(&self.orm)
                .await?;
            Ok::<_, AppError>(rows)
        };

        let (wallet, history) = tokio::try_join!(wallet, history)?;
        Ok(WalletSummary {
            wallet: wallet_from_entity(wallet),
            history: history
                .into_iter()
                .map(trx_from_entity)
                .collect::<AppResult<Vec<_>>>()?,
        })
    }

    /// Wallets holding a reserved amount, newest first, with their shop.
    pub async fn cash_out_requests(&self, cursor: Option<Uuid>) -> AppResult<Vec<PendingCashOut>> {
        let mut condition = Condition::all().add(WalletCol::Amount.gt(0.0));
        if let Some(cursor) = cursor {
            condition = condition.add(WalletCol::Id.lt(cursor));
        }

        let rows = Wallets::find()
            .filter(condition)
            .order_by_desc(WalletCol::Id)
            .limit(CASH_OUT_PAGE)
            .find_also_related(Shops)
            .all(&self.orm)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(wallet, shop)| PendingCashOut {
                wallet: wallet_from_entity(wallet),
                shop: shop.map(shop_from_entity),
            })
            .collect())
    }

    pub fn cash_out_page_size(&self) -> u64 {
        CASH_OUT_PAGE
    }
}

/// `balance = balance + net` on the shop's wallet, then the fresh row.
async fn credit_wallet<C: ConnectionTrait>(conn: &C, shop_id: Uuid, net: f64) -> AppResult<WalletModel> {
    let result = Wallets::update_many()
        .col_expr(WalletCol::Balance, Expr::col(WalletCol::Balance).add(net))
        .col_expr(WalletCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(WalletCol::ShopId.eq(shop_id))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::TransactionNotFound);
    }

    Wallets::find()
        .filter(WalletCol::ShopId.eq(shop_id))
        .one(conn)
        .await?
        .ok_or(AppError::TransactionNotFound)
}

fn wallet_from_entity(model: WalletModel) -> Wallet {
    Wallet {
        id: model.id,
        shop_id: model.shop_id,
        owner_id: model.owner_id,
        balance: model.balance,
        amount: model.amount,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn trx_from_entity(model: TrxModel) -> AppResult<TrxHistory> {
    Ok(TrxHistory {
        id: model.id,
        payment: model.payment,
        payment_type: model.payment_type.parse().map_err(anyhow::Error::from)?,
        trx_id: model.trx_id,
        shop_id: model.shop_id,
        order_id: model.order_id,
        remarks: model.remarks,
        created_by: model.created_by,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

fn shop_from_entity(model: ShopModel) -> Shop {
    Shop {
        id: model.id,
        owner_id: model.owner_id,
        name: model.name,
        base_charge: model.base_charge,
        delivery_zone: model.delivery_zone,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
