use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
    /// Pass back as `cursor` to fetch the next page of a keyset listing.
    pub next_cursor: Option<Uuid>,
}

impl Meta {
    /// Meta for a keyset page; `next_cursor` is only set when the page came back full.
    pub fn keyset(per_page: u64, returned: usize, last_id: Option<Uuid>) -> Self {
        let full = returned as u64 >= per_page;
        Self {
            page: None,
            per_page: Some(per_page as i64),
            total: None,
            next_cursor: if full { last_id } else { None },
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
            next_cursor: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}
