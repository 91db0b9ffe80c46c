use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::{
    charge,
    db::with_transaction,
    dto::orders::{CreateOrderRequest, StatusDraft, UpdateOrderRequest},
    entity::{
        order_statuses::{
            ActiveModel as StatusActive, Column as StatusCol, Entity as OrderStatuses,
            Model as StatusModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        rider_parcels::{Column as ParcelCol, Entity as RiderParcels},
        shops::{Entity as Shops, Model as ShopModel},
    },
    error::{AppError, AppResult},
    models::{ASSIGNMENT_ASSIGNED, ActorRef, Order, OrderStatus, StatusEntry, assignment_outcome},
    random,
};

pub const DEFAULT_PAGE_SIZE: u64 = 15;
const MAX_PAGE_SIZE: u64 = 100;
/// Fresh tracking ids tried before a collision is reported to the caller.
const TRACK_ID_ATTEMPTS: usize = 3;

/// Keyset-paginated order listing. Results come back newest first.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub shop_id: Option<Uuid>,
    /// Only orders with an id strictly lower than this one.
    pub cursor: Option<Uuid>,
    pub phone: Option<String>,
    pub track_id: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    /// Matched against the recipient area.
    pub delivery_zone: Option<String>,
    pub page_size: Option<u64>,
}

impl OrderFilter {
    pub fn page_size(&self) -> u64 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(shop_id) = self.shop_id {
            condition = condition.add(OrderCol::ShopId.eq(shop_id));
        }
        if let Some(cursor) = self.cursor {
            condition = condition.add(OrderCol::Id.lt(cursor));
        }
        if let Some(phone) = non_empty(&self.phone) {
            condition = condition.add(OrderCol::RecipientPhone.contains(phone));
        }
        if let Some(track_id) = non_empty(&self.track_id) {
            condition = condition.add(OrderCol::TrackId.contains(track_id));
        }
        if let Some(from) = self.created_from {
            condition = condition.add(OrderCol::CreatedAt.gte(from));
        }
        if let Some(to) = self.created_to {
            condition = condition.add(OrderCol::CreatedAt.lte(to));
        }
        if let Some(zone) = non_empty(&self.delivery_zone) {
            condition = condition.add(OrderCol::RecipientArea.eq(zone));
        }
        condition
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Owns the order aggregate and its append-only status log.
#[derive(Clone)]
pub struct OrderStore {
    orm: DatabaseConnection,
}

impl OrderStore {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }

    /// Inserts a new order with a generated tracking id, retrying on id collisions.
    pub async fn create(
        &self,
        shop_id: Uuid,
        command: CreateOrderRequest,
        actor: ActorRef,
    ) -> AppResult<Order> {
        let mut attempt = 1;
        loop {
            match self
                .create_with_track_id(shop_id, command.clone(), actor, random::track_id())
                .await
            {
                Err(AppError::Conflict(_)) if attempt < TRACK_ID_ATTEMPTS => {
                    tracing::warn!(shop_id = %shop_id, attempt, "track id collision, regenerating");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Single insert attempt. A taken `track_id` fails with `Conflict`.
    pub async fn create_with_track_id(
        &self,
        shop_id: Uuid,
        command: CreateOrderRequest,
        actor: ActorRef,
        track_id: String,
    ) -> AppResult<Order> {
        command.validate()?;

        let order = with_transaction(&self.orm, |txn| {
            let command = command.clone();
            let track_id = track_id.clone();
            Box::pin(async move {
                let shop = find_shop(txn, shop_id).await?;
                let now = Utc::now();
                let order_id = Uuid::now_v7();
                let charge = charge::calculate(
                    command.details.weight,
                    command.details.delivery_type,
                    &command.details.recipient_city,
                    shop.base_charge,
                );

                let mut active = OrderActive {
                    id: Set(order_id),
                    track_id: Set(track_id),
                    shop_id: Set(shop_id),
                    rider_id: Set(None),
                    merchant_id: Set(command.merchant_id),
                    charge: Set(charge),
                    current_status: Set(Some(OrderStatus::Created.as_str().to_string())),
                    is_accepted: Set(false),
                    is_picked: Set(false),
                    is_cancelled: Set(false),
                    delivered_at: Set(None),
                    updated_by: Set(actor.id()),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                    ..Default::default()
                };
                write_details(&mut active, command.details);
                active
                    .insert(txn)
                    .await
                    .map_err(|e| AppError::from(e).conflict_as("Order"))?;

                let seed = StatusDraft::new(OrderStatus::Created, "", actor);
                insert_status(txn, order_id, &seed, now).await?;

                load_order(txn, order_id).await
            })
        })
        .await?;

        tracing::info!(order_id = %order.id, shop_id = %shop_id, track_id = %order.track_id, "order created");
        Ok(order)
    }

    pub async fn by_id(&self, id: Uuid) -> AppResult<Order> {
        load_order(&self.orm, id).await
    }

    pub async fn by_track_id(&self, track_id: &str) -> AppResult<Order> {
        let model = Orders::find()
            .filter(OrderCol::TrackId.eq(track_id))
            .one(&self.orm)
            .await?
            .ok_or(AppError::NotFound("Order"))?;
        let statuses = statuses_for(&self.orm, model.id).await?;
        order_from_entity(model, statuses)
    }

    pub async fn filter(&self, filter: &OrderFilter) -> AppResult<Vec<Order>> {
        let models = Orders::find()
            .filter(filter.condition())
            .order_by_desc(OrderCol::Id)
            .limit(filter.page_size())
            .all(&self.orm)
            .await?;
        attach_statuses(&self.orm, models).await
    }

    /// Replaces the editable fields of an order owned by `shop_id`.
    pub async fn update(
        &self,
        id: Uuid,
        shop_id: Uuid,
        command: UpdateOrderRequest,
        updated_by: Uuid,
    ) -> AppResult<Order> {
        command.validate()?;

        let order = with_transaction(&self.orm, |txn| {
            let command = command.clone();
            Box::pin(async move {
                let existing = Orders::find()
                    .filter(
                        Condition::all()
                            .add(OrderCol::Id.eq(id))
                            .add(OrderCol::ShopId.eq(shop_id)),
                    )
                    .lock(LockType::Update)
                    .one(txn)
                    .await?
                    .ok_or(AppError::NotFound("Order"))?;
                if existing.delivered_at.is_some() || existing.is_picked || existing.is_cancelled {
                    return Err(AppError::OrderLocked);
                }

                let shop = find_shop(txn, shop_id).await?;
                let charge = charge::calculate(
                    command.weight,
                    command.delivery_type,
                    &command.recipient_city,
                    shop.base_charge,
                );

                let mut active: OrderActive = existing.into();
                active.charge = Set(charge);
                write_details(&mut active, command);
                active.updated_by = Set(Some(updated_by));
                active.updated_at = Set(Utc::now().into());
                active.update(txn).await?;

                load_order(txn, id).await
            })
        })
        .await?;

        tracing::info!(order_id = %id, shop_id = %shop_id, "order updated");
        Ok(order)
    }

    /// Appends a status entry. Delivered orders are frozen, so this fails with
    /// `OrderAlreadyDelivered` once settlement has happened.
    pub async fn append_status(&self, id: Uuid, draft: StatusDraft) -> AppResult<Order> {
        if draft.status == OrderStatus::Delivered {
            return Err(AppError::BadRequest(
                "Delivered is recorded through settlement".into(),
            ));
        }

        let order = with_transaction(&self.orm, |txn| {
            let draft = draft.clone();
            Box::pin(async move {
                let existing = lock_order(txn, id).await?;
                if existing.delivered_at.is_some() {
                    return Err(AppError::OrderAlreadyDelivered);
                }
                apply_status(txn, existing, &draft, Utc::now()).await?;
                load_order(txn, id).await
            })
        })
        .await?;

        tracing::info!(order_id = %id, status = %draft.status, "order status appended");
        Ok(order)
    }

    /// Shop-initiated cancellation, only while the parcel has not been picked.
    pub async fn cancel(&self, id: Uuid, shop_id: Uuid, actor: ActorRef) -> AppResult<Order> {
        let order = with_transaction(&self.orm, |txn| {
            Box::pin(async move {
                let existing = lock_order(txn, id).await?;
                if existing.shop_id != shop_id {
                    return Err(AppError::NotFound("Order"));
                }
                if existing.delivered_at.is_some() {
                    return Err(AppError::OrderAlreadyDelivered);
                }
                if existing.is_picked || existing.is_cancelled {
                    return Err(AppError::OrderLocked);
                }
                let draft = StatusDraft::new(OrderStatus::Cancelled, "", actor);
                apply_status(txn, existing, &draft, Utc::now()).await?;
                load_order(txn, id).await
            })
        })
        .await?;

        tracing::info!(order_id = %id, shop_id = %shop_id, "order cancelled");
        Ok(order)
    }
}

pub(crate) async fn find_shop<C: ConnectionTrait>(conn: &C, shop_id: Uuid) -> AppResult<ShopModel> {
    Shops::find_by_id(shop_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("Shop"))
}

/// Loads the order row `FOR UPDATE`. Only meaningful inside a transaction.
/// Copies the shop-editable fields onto the row.
fn write_details(active: &mut OrderActive, details: UpdateOrderRequest) {
    active.recipient_name = Set(details.recipient_name);
    active.recipient_phone = Set(details.recipient_phone);
    active.recipient_city = Set(details.recipient_city);
    active.recipient_thana = Set(details.recipient_thana);
    active.recipient_area = Set(details.recipient_area);
    active.recipient_zip = Set(details.recipient_zip);
    active.recipient_address = Set(details.recipient_address);
    active.package_code = Set(details.package_code);
    active.payment_status = Set(details.payment_status.as_str().to_string());
    active.price = Set(details.price);
    active.parcel_type = Set(details.parcel_type);
    active.requested_delivery_time = Set(details.requested_delivery_time.map(Into::into));
    active.pick_address = Set(details.pick_address);
    active.pick_hub = Set(details.pick_hub);
    active.comments = Set(details.comments);
    active.number_of_items = Set(details.number_of_items);
    active.delivery_type = Set(details.delivery_type.as_str().to_string());
    active.weight = Set(details.weight);
}

pub(crate) async fn lock_order<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("Order"))
}

/// Flag side effects of a status plus the prepended log entry. Leaving transit
/// closes the rider's open assignment so the order can be handed out again.
pub(crate) async fn apply_status<C: ConnectionTrait>(
    conn: &C,
    existing: OrderModel,
    draft: &StatusDraft,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let order_id = existing.id;
    let mut active: OrderActive = existing.into();
    match draft.status {
        OrderStatus::Accepted => active.is_accepted = Set(true),
        OrderStatus::Picked => active.is_picked = Set(true),
        OrderStatus::Declined | OrderStatus::Cancelled => active.is_cancelled = Set(true),
        OrderStatus::Delivered => active.delivered_at = Set(Some(now.into())),
        _ => {}
    }
    active.current_status = Set(Some(draft.status.as_str().to_string()));
    active.updated_by = Set(draft.actor.id());
    active.updated_at = Set(now.into());
    active.update(conn).await?;

    if let Some(closed) = assignment_outcome(draft.status) {
        RiderParcels::update_many()
            .col_expr(ParcelCol::Status, Expr::value(closed))
            .col_expr(ParcelCol::UpdatedAt, Expr::value(now))
            .filter(
                Condition::all()
                    .add(ParcelCol::OrderId.eq(order_id))
                    .add(ParcelCol::Status.eq(ASSIGNMENT_ASSIGNED)),
            )
            .exec(conn)
            .await?;
    }

    insert_status(conn, order_id, draft, now).await
}

pub(crate) async fn insert_status<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    draft: &StatusDraft,
    now: DateTime<Utc>,
) -> AppResult<()> {
    StatusActive {
        id: Set(Uuid::now_v7()),
        order_id: Set(order_id),
        text: Set(draft.note()),
        actor_kind: Set(draft.actor.kind().map(str::to_string)),
        actor_id: Set(draft.actor.id()),
        status: Set(draft.status.as_str().to_string()),
        created_at: Set(now.into()),
    }
    .insert(conn)
    .await?;
    Ok(())
}

pub(crate) async fn load_order<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Order> {
    let model = Orders::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    let statuses = statuses_for(conn, id).await?;
    order_from_entity(model, statuses)
}

async fn statuses_for<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Vec<StatusModel>> {
    let statuses = OrderStatuses::find()
        .filter(StatusCol::OrderId.eq(order_id))
        .order_by_desc(StatusCol::CreatedAt)
        .order_by_desc(StatusCol::Id)
        .all(conn)
        .await?;
    Ok(statuses)
}

/// Loads the status logs of a page of orders with one query and keeps the page order.
pub(crate) async fn attach_statuses<C: ConnectionTrait>(
    conn: &C,
    models: Vec<OrderModel>,
) -> AppResult<Vec<Order>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let mut by_order: HashMap<Uuid, Vec<StatusModel>> = HashMap::new();
    for status in OrderStatuses::find()
        .filter(StatusCol::OrderId.is_in(ids))
        .order_by_desc(StatusCol::CreatedAt)
        .order_by_desc(StatusCol::Id)
        .all(conn)
        .await?
    {
        by_order.entry(status.order_id).or_default().push(status);
    }

    models
        .into_iter()
        .map(|model| {
            let statuses = by_order.remove(&model.id).unwrap_or_default();
            order_from_entity(model, statuses)
        })
        .collect()
}

pub(crate) fn order_from_entity(model: OrderModel, statuses: Vec<StatusModel>) -> AppResult<Order> {
    let statuses = statuses
        .into_iter()
        .map(status_from_entity)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Order {
        id: model.id,
        track_id: model.track_id,
        shop_id: model.shop_id,
        rider_id: model.rider_id,
        merchant_id: model.merchant_id,
        recipient_name: model.recipient_name,
        recipient_phone: model.recipient_phone,
        recipient_city: model.recipient_city,
        recipient_thana: model.recipient_thana,
        recipient_area: model.recipient_area,
        recipient_zip: model.recipient_zip,
        recipient_address: model.recipient_address,
        package_code: model.package_code,
        payment_status: model.payment_status.parse().map_err(anyhow::Error::from)?,
        price: model.price,
        charge: model.charge,
        parcel_type: model.parcel_type,
        requested_delivery_time: model.requested_delivery_time.map(|dt| dt.with_timezone(&Utc)),
        pick_address: model.pick_address,
        pick_hub: model.pick_hub,
        comments: model.comments,
        number_of_items: model.number_of_items,
        delivery_type: model.delivery_type.parse().map_err(anyhow::Error::from)?,
        weight: model.weight,
        current_status: model
            .current_status
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(anyhow::Error::from)?,
        is_accepted: model.is_accepted,
        is_picked: model.is_picked,
        is_cancelled: model.is_cancelled,
        delivered_at: model.delivered_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
        statuses,
    })
}

fn status_from_entity(model: StatusModel) -> AppResult<StatusEntry> {
    Ok(StatusEntry {
        id: model.id,
        text: model.text,
        actor: ActorRef::from_parts(model.actor_kind.as_deref(), model.actor_id)
            .map_err(anyhow::Error::from)?,
        status: model.status.parse().map_err(anyhow::Error::from)?,
        time: model.created_at.with_timezone(&Utc),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_defaults_to_fifteen_and_is_clamped() {
        let mut filter = OrderFilter::default();
        assert_eq!(filter.page_size(), 15);
        filter.page_size = Some(0);
        assert_eq!(filter.page_size(), 1);
        filter.page_size = Some(10_000);
        assert_eq!(filter.page_size(), 100);
    }

    #[test]
    fn blank_text_filters_are_ignored() {
        assert_eq!(non_empty(&Some("   ".into())), None);
        assert_eq!(non_empty(&None), None);
        assert_eq!(non_empty(&Some(" 0170 ".into())), Some("0170"));
    }
}
