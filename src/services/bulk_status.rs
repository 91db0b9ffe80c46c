use std::collections::HashSet;

use futures::{StreamExt, stream};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::orders::StatusDraft,
    error::{AppError, AppResult, BulkFailure},
    models::OrderStatus,
    services::order_store::OrderStore,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BulkOutcome {
    Applied,
    Failed { code: String, message: String },
    /// Never started because the batch was cancelled first.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkItem {
    pub order_id: Uuid,
    #[serde(flatten)]
    pub outcome: BulkOutcome,
}

/// Outcome per requested id, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct BulkStatusReport {
    pub items: Vec<BulkItem>,
}

impl BulkStatusReport {
    pub fn applied(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.outcome == BulkOutcome::Applied)
            .count()
    }

    pub fn failures(&self) -> Vec<BulkFailure> {
        self.items
            .iter()
            .filter_map(|item| match &item.outcome {
                BulkOutcome::Applied => None,
                BulkOutcome::Failed { code, message } => Some(BulkFailure {
                    order_id: item.order_id,
                    code: code.clone(),
                    error: message.clone(),
                }),
                BulkOutcome::Cancelled => Some(BulkFailure {
                    order_id: item.order_id,
                    code: AppError::Cancelled.code().to_string(),
                    error: AppError::Cancelled.to_string(),
                }),
            })
            .collect()
    }

    /// `PartialFailure` listing every id that was not applied.
    pub fn ensure_all_applied(self) -> AppResult<Self> {
        let failures = self.failures();
        if failures.is_empty() {
            Ok(self)
        } else {
            Err(AppError::PartialFailure(failures))
        }
    }
}

/// Largest batch accepted in one call.
pub const MAX_BULK_ORDERS: usize = 500;

/// Applies one status to many orders, at most `concurrency` at a time.
#[derive(Clone)]
pub struct BulkStatusChanger {
    orders: OrderStore,
    concurrency: usize,
}

impl BulkStatusChanger {
    pub fn new(orders: OrderStore, concurrency: usize) -> Self {
        Self {
            orders,
            concurrency: concurrency.max(1),
        }
    }

    /// Each id gets its own transaction. Ids not yet started when `token`
    /// fires are reported as cancelled; updates already running finish, and
    /// committed ones stay committed.
    pub async fn apply(
        &self,
        order_ids: Vec<Uuid>,
        draft: StatusDraft,
        token: CancellationToken,
    ) -> AppResult<BulkStatusReport> {
        if draft.status == OrderStatus::Delivered {
            return Err(AppError::BadRequest(
                "Delivered is recorded through settlement".into(),
            ));
        }

        let mut seen = HashSet::new();
        let order_ids: Vec<Uuid> = order_ids.into_iter().filter(|id| seen.insert(*id)).collect();
        check_batch_size(order_ids.len())?;

        let items: Vec<BulkItem> = stream::iter(order_ids)
            .map(|order_id| {
                let draft = draft.clone();
                let token = &token;
                async move {
                    if token.is_cancelled() {
                        return BulkItem {
                            order_id,
                            outcome: BulkOutcome::Cancelled,
                        };
                    }
                    let outcome = match self.orders.append_status(order_id, draft).await {
                        Ok(_) => BulkOutcome::Applied,
                        Err(err) => BulkOutcome::Failed {
                            code: err.code().to_string(),
                            message: err.to_string(),
                        },
                    };
                    BulkItem { order_id, outcome }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let report = BulkStatusReport { items };
        tracing::info!(
            status = %draft.status,
            requested = report.items.len(),
            applied = report.applied(),
            "bulk status change finished"
        );
        Ok(report)
    }
}

fn check_batch_size(len: usize) -> AppResult<()> {
    if len == 0 {
        return Err(AppError::BadRequest("orderIds can not be empty".into()));
    }
    if len > MAX_BULK_ORDERS {
        return Err(AppError::BadRequest(format!(
            "at most {MAX_BULK_ORDERS} orders per batch"
        )));
    }
    Ok(())
}
