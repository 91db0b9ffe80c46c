use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, Shop, TrxHistory, Wallet};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    pub shop_id: Uuid,
    /// Gross amount collected from the recipient.
    pub payment: f64,
    #[serde(default)]
    pub remarks: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IssueCashOutCodeRequest {
    pub amount: f64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CashOutRequest {
    pub code: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenWalletRequest {
    pub shop_id: Uuid,
    pub owner_id: Uuid,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Settlement {
    pub wallet: Wallet,
    pub history: TrxHistory,
    pub order: Order,
}

/// Plaintext code handed out exactly once.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCode {
    pub code: String,
    pub amount: f64,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CashOut {
    pub wallet: Wallet,
    pub history: TrxHistory,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletSummary {
    pub wallet: Wallet,
    /// Most recent first.
    pub history: Vec<TrxHistory>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PendingCashOut {
    pub wallet: Wallet,
    pub shop: Option<Shop>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingCashOutList {
    pub items: Vec<PendingCashOut>,
}
