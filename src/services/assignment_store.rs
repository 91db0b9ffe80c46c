use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::{
    audit,
    db::with_transaction,
    dto::orders::{AssignedOrder, StatusDraft},
    entity::{
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        rider_parcels::{
            ActiveModel as ParcelActive, Column as ParcelCol, Entity as RiderParcels,
            Model as ParcelModel,
        },
    },
    error::{AppError, AppResult},
    models::{ASSIGNMENT_ASSIGNED, ActorRef, Assignment, OrderStatus},
    services::order_store::{apply_status, attach_statuses, load_order, lock_order},
};

pub const RIDER_PAGE_SIZE: u64 = 15;

/// Links riders to the parcels they carry.
#[derive(Clone)]
pub struct RiderAssignmentStore {
    orm: DatabaseConnection,
}

impl RiderAssignmentStore {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }

    /// Hands an order to a rider and moves it in transit.
    ///
    /// The order row stays locked while the existing assignments are checked,
    /// so two dispatchers racing for the same parcel cannot both succeed.
    pub async fn assign(
        &self,
        rider_id: Uuid,
        order_id: Uuid,
        assigned_by: Uuid,
    ) -> AppResult<AssignedOrder> {
        let assigned = with_transaction(&self.orm, |txn| {
            Box::pin(async move {
                let existing = lock_order(txn, order_id).await?;
                if existing.delivered_at.is_some() {
                    return Err(AppError::OrderAlreadyDelivered);
                }
                let in_transit =
                    existing.current_status.as_deref() == Some(OrderStatus::InTransit.as_str());
                let open_assignment = RiderParcels::find()
                    .filter(
                        Condition::all()
                            .add(ParcelCol::OrderId.eq(order_id))
                            .add(ParcelCol::Status.eq(ASSIGNMENT_ASSIGNED)),
                    )
                    .one(txn)
                    .await?;
                if in_transit || open_assignment.is_some() {
                    return Err(AppError::OrderAlreadyInTransit);
                }

                let now = Utc::now();
                let parcel = ParcelActive {
                    id: Set(Uuid::now_v7()),
                    rider_id: Set(rider_id),
                    order_id: Set(order_id),
                    assigned_by: Set(assigned_by),
                    status: Set(ASSIGNMENT_ASSIGNED.to_string()),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                }
                .insert(txn)
                .await?;

                let mut active: OrderActive = existing.into();
                active.rider_id = Set(Some(rider_id));
                let existing = active.update(txn).await?;

                let draft = StatusDraft::new(OrderStatus::InTransit, "", ActorRef::Rider(rider_id));
                apply_status(txn, existing, &draft, now).await?;

                Ok(AssignedOrder {
                    order: load_order(txn, order_id).await?,
                    assignment: assignment_from_entity(parcel),
                })
            })
        })
        .await?;

        tracing::info!(order_id = %order_id, rider_id = %rider_id, "order assigned to rider");
        audit::record(
            &self.orm,
            Some(assigned_by),
            "order_assigned",
            "rider_parcels",
            serde_json::json!({ "order_id": order_id, "rider_id": rider_id }),
        )
        .await;

        Ok(assigned)
    }

    /// A rider's assignments with their orders, newest first.
    pub async fn parcels_by_rider(
        &self,
        rider_id: Uuid,
        cursor: Option<Uuid>,
    ) -> AppResult<Vec<AssignedOrder>> {
        let mut condition = Condition::all().add(ParcelCol::RiderId.eq(rider_id));
        if let Some(cursor) = cursor {
            condition = condition.add(ParcelCol::Id.lt(cursor));
        }
        let parcels = RiderParcels::find()
            .filter(condition)
            .order_by_desc(ParcelCol::Id)
            .limit(RIDER_PAGE_SIZE)
            .all(&self.orm)
            .await?;
        if parcels.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<Uuid> = parcels.iter().map(|p| p.order_id).collect();
        let models = Orders::find()
            .filter(OrderCol::Id.is_in(order_ids))
            .all(&self.orm)
            .await?;
        let mut orders: HashMap<Uuid, _> = attach_statuses(&self.orm, models)
            .await?
            .into_iter()
            .map(|order| (order.id, order))
            .collect();

        Ok(parcels
            .into_iter()
            .filter_map(|parcel| {
                let order = orders.remove(&parcel.order_id)?;
                Some(AssignedOrder {
                    order,
                    assignment: assignment_from_entity(parcel),
                })
            })
            .collect())
    }
}

fn assignment_from_entity(model: ParcelModel) -> Assignment {
    Assignment {
        id: model.id,
        rider_id: model.rider_id,
        order_id: model.order_id,
        assigned_by: model.assigned_by,
        status: model.status,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
