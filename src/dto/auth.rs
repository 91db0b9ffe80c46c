use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// JWT payload issued by the identity service.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    /// Set for merchants; the shop they act for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<String>,
    pub exp: usize,
}
