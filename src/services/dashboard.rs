use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::orders::{Column as OrderCol, Entity as Orders},
    error::{AppError, AppResult},
    models::OrderStatus,
};

/// Order counts for one shop. Every category except `total` is disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub total: u64,
    pub delivered: u64,
    pub in_transit: u64,
    pub returned: u64,
    pub cancelled: u64,
    pub declined: u64,
    pub pending: u64,
}

#[derive(Clone)]
pub struct DashboardAggregator {
    orm: DatabaseConnection,
}

impl DashboardAggregator {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }

    /// Runs the seven counts concurrently. The first failure, or `token` firing,
    /// abandons the rest.
    pub async fn snapshot(
        &self,
        shop_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        token: &CancellationToken,
    ) -> AppResult<DashboardSnapshot> {
        let [total, delivered, in_transit, returned, cancelled, declined, pending] =
            category_conditions(shop_id, start, end);

        let counts = async {
            tokio::try_join!(
                self.count(total),
                self.count(delivered),
                self.count(in_transit),
                self.count(returned),
                self.count(cancelled),
                self.count(declined),
                self.count(pending),
            )
        };

        let (total, delivered, in_transit, returned, cancelled, declined, pending) = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(shop_id = %shop_id, "dashboard cancelled");
                return Err(AppError::Cancelled);
            }
            counts = counts => counts?,
        };

        Ok(DashboardSnapshot {
            total,
            delivered,
            in_transit,
            returned,
            cancelled,
            declined,
            pending,
        })
    }

    async fn count(&self, condition: Condition) -> AppResult<u64> {
        let count = Orders::find().filter(condition).count(&self.orm).await?;
        Ok(count)
    }
}

/// Filters for `[total, delivered, in_transit, returned, cancelled, declined, pending]`.
fn category_conditions(
    shop_id: Uuid,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> [Condition; 7] {
    let mut base = Condition::all().add(OrderCol::ShopId.eq(shop_id));
    if let Some(start) = start {
        base = base.add(OrderCol::CreatedAt.gte(start));
    }
    if let Some(end) = end {
        base = base.add(OrderCol::CreatedAt.lte(end));
    }

    let open = base.clone().add(OrderCol::DeliveredAt.is_null());
    let with_status = |status: OrderStatus| {
        open.clone()
            .add(OrderCol::CurrentStatus.eq(status.as_str()))
    };
    let pending = open.clone().add(
        Condition::any()
            .add(OrderCol::CurrentStatus.is_null())
            .add(OrderCol::CurrentStatus.is_in(OrderStatus::PENDING.map(|s| s.as_str()))),
    );

    [
        base.clone(),
        base.add(OrderCol::DeliveredAt.is_not_null()),
        with_status(OrderStatus::InTransit),
        with_status(OrderStatus::Returned),
        with_status(OrderStatus::Cancelled),
        with_status(OrderStatus::Declined),
        pending,
    ]
}

#[cfg(test)]
mod tests {
    use sea_orm::{DbBackend, QueryTrait};

    use super::*;

    /// The WHERE clause only, since the projection names every column.
    fn sql(condition: Condition) -> String {
        let sql = Orders::find()
            .filter(condition)
            .build(DbBackend::Postgres)
            .to_string();
        match sql.split_once(" WHERE ") {
            Some((_, predicate)) => predicate.to_string(),
            None => String::new(),
        }
    }

    #[test]
    fn only_the_delivered_bucket_counts_delivered_orders() {
        let [total, delivered, in_transit, returned, cancelled, declined, pending] =
            category_conditions(Uuid::nil(), None, None);

        assert!(!sql(total).contains("delivered_at"));
        assert!(sql(delivered).contains(r#""delivered_at" IS NOT NULL"#));
        for open in [in_transit, returned, cancelled, declined, pending] {
            assert!(sql(open).contains(r#""delivered_at" IS NULL"#));
        }
    }

    #[test]
    fn pending_covers_waiting_statuses_and_missing_status() {
        let [.., pending] = category_conditions(Uuid::nil(), None, None);
        let sql = sql(pending);
        assert!(sql.contains(r#""current_status" IS NULL"#));
        for status in OrderStatus::PENDING {
            assert!(sql.contains(&format!("'{status}'")));
        }
        assert!(!sql.contains("'InTransit'"));
    }

    #[test]
    fn date_range_applies_to_every_bucket() {
        let start = Utc::now();
        for condition in category_conditions(Uuid::nil(), Some(start), Some(start)) {
            let sql = sql(condition);
            assert!(sql.contains(r#""created_at" >="#));
            assert!(sql.contains(r#""created_at" <="#));
        }
    }
}
