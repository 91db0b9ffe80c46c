use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    services::order_store::OrderFilter,
};

/// Unix epoch milliseconds, as sent by the dashboard clients.
fn millis(value: Option<i64>, name: &str) -> AppResult<Option<DateTime<Utc>>> {
    value
        .map(|ms| {
            DateTime::from_timestamp_millis(ms)
                .ok_or_else(|| AppError::BadRequest(format!("{name} is out of range")))
        })
        .transpose()
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct OrderListQuery {
    pub cursor: Option<Uuid>,
    pub shop_id: Option<Uuid>,
    pub phone: Option<String>,
    pub track_id: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub zone: Option<String>,
    pub per_page: Option<u64>,
}

impl OrderListQuery {
    pub fn into_filter(self) -> AppResult<OrderFilter> {
        Ok(OrderFilter {
            created_from: millis(self.start_date, "startDate")?,
            created_to: millis(self.end_date, "endDate")?,
            shop_id: self.shop_id,
            cursor: self.cursor,
            phone: self.phone,
            track_id: self.track_id,
            delivery_zone: self.zone,
            page_size: self.per_page,
        })
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
}

impl DateRangeQuery {
    pub fn bounds(&self) -> AppResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        let start = millis(self.start_date, "startDate")?;
        let end = millis(self.end_date, "endDate")?;
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(AppError::BadRequest("startDate is after endDate".into()));
            }
        }
        Ok((start, end))
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CursorQuery {
    pub cursor: Option<Uuid>,
}
