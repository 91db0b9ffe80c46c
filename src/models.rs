use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Raised when a stored or submitted discriminant is outside the known vocabulary.
#[derive(Debug, Error)]
#[error("unknown {kind} `{value}`")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Order lifecycle vocabulary. Values are case sensitive on the wire and in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    Created,
    Accepted,
    Picked,
    InTransit,
    Delivered,
    Cancelled,
    Declined,
    Returned,
    Rescheduled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 9] = [
        OrderStatus::Created,
        OrderStatus::Accepted,
        OrderStatus::Picked,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Declined,
        OrderStatus::Returned,
        OrderStatus::Rescheduled,
    ];

    /// Statuses the dashboard reports as still waiting to move.
    pub const PENDING: [OrderStatus; 4] = [
        OrderStatus::Created,
        OrderStatus::Accepted,
        OrderStatus::Picked,
        OrderStatus::Rescheduled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "Created",
            OrderStatus::Accepted => "Accepted",
            OrderStatus::Picked => "Picked",
            OrderStatus::InTransit => "InTransit",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Declined => "Declined",
            OrderStatus::Returned => "Returned",
            OrderStatus::Rescheduled => "Rescheduled",
        }
    }

    /// Note recorded when the caller leaves the status text blank.
    pub fn default_note(&self) -> &'static str {
        match self {
            OrderStatus::Created => "Your order has been placed successfully",
            OrderStatus::Accepted => "Your order has been accepted",
            OrderStatus::Picked => "Your parcel has been picked up",
            OrderStatus::InTransit => "Rider has picked your parcel",
            OrderStatus::Delivered => "Order successfully delivered at your door",
            OrderStatus::Cancelled => "Your order has been cancelled",
            OrderStatus::Declined => "Your order has been declined",
            OrderStatus::Returned => "Your parcel has been returned",
            OrderStatus::Rescheduled => "Your delivery has been rescheduled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "order status",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PaymentMode {
    #[serde(rename = "COD")]
    Cod,
    #[serde(rename = "PAID")]
    Paid,
}

impl PaymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Cod => "COD",
            PaymentMode::Paid => "PAID",
        }
    }
}

impl FromStr for PaymentMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COD" => Ok(PaymentMode::Cod),
            "PAID" => Ok(PaymentMode::Paid),
            _ => Err(ParseEnumError {
                kind: "payment mode",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum DeliveryType {
    Regular,
    Express,
}

impl DeliveryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryType::Regular => "Regular",
            DeliveryType::Express => "Express",
        }
    }
}

impl FromStr for DeliveryType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Regular" => Ok(DeliveryType::Regular),
            "Express" => Ok(DeliveryType::Express),
            _ => Err(ParseEnumError {
                kind: "delivery type",
                value: s.to_string(),
            }),
        }
    }
}

/// Who caused a status transition. At most one actor is ever attributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ActorRef {
    #[default]
    None,
    Rider(Uuid),
    Moderator(Uuid),
    Merchant(Uuid),
    Admin(Uuid),
}

impl ActorRef {
    pub fn kind(&self) -> Option<&'static str> {
        match self {
            ActorRef::None => None,
            ActorRef::Rider(_) => Some("rider"),
            ActorRef::Moderator(_) => Some("moderator"),
            ActorRef::Merchant(_) => Some("merchant"),
            ActorRef::Admin(_) => Some("admin"),
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        match self {
            ActorRef::None => None,
            ActorRef::Rider(id)
            | ActorRef::Moderator(id)
            | ActorRef::Merchant(id)
            | ActorRef::Admin(id) => Some(*id),
        }
    }

    pub fn from_parts(kind: Option<&str>, id: Option<Uuid>) -> Result<Self, ParseEnumError> {
        match (kind, id) {
            (None, None) => Ok(ActorRef::None),
            (Some("rider"), Some(id)) => Ok(ActorRef::Rider(id)),
            (Some("moderator"), Some(id)) => Ok(ActorRef::Moderator(id)),
            (Some("merchant"), Some(id)) => Ok(ActorRef::Merchant(id)),
            (Some("admin"), Some(id)) => Ok(ActorRef::Admin(id)),
            (kind, _) => Err(ParseEnumError {
                kind: "actor reference",
                value: kind.unwrap_or("<none>").to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Moderator,
    Merchant,
    Rider,
}

impl Role {
    pub fn actor(&self, id: Uuid) -> ActorRef {
        match self {
            Role::Admin => ActorRef::Admin(id),
            Role::Moderator => ActorRef::Moderator(id),
            Role::Merchant => ActorRef::Merchant(id),
            Role::Rider => ActorRef::Rider(id),
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "moderator" => Ok(Role::Moderator),
            "merchant" => Ok(Role::Merchant),
            "rider" => Ok(Role::Rider),
            _ => Err(ParseEnumError {
                kind: "role",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TrxDirection {
    In,
    Out,
}

impl TrxDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrxDirection::In => "In",
            TrxDirection::Out => "Out",
        }
    }
}

impl FromStr for TrxDirection {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "In" => Ok(TrxDirection::In),
            "Out" => Ok(TrxDirection::Out),
            _ => Err(ParseEnumError {
                kind: "payment type",
                value: s.to_string(),
            }),
        }
    }
}

pub const ASSIGNMENT_ASSIGNED: &str = "Assigned";
/// The rider handed the parcel over.
pub const ASSIGNMENT_DELIVERED: &str = "Delivered";
/// The parcel left transit undelivered and is free for another rider.
pub const ASSIGNMENT_RELEASED: &str = "Released";

/// What happens to a rider's open assignment when its order moves to `status`.
/// `None` keeps it open.
pub fn assignment_outcome(status: OrderStatus) -> Option<&'static str> {
    match status {
        OrderStatus::InTransit => None,
        OrderStatus::Delivered => Some(ASSIGNMENT_DELIVERED),
        _ => Some(ASSIGNMENT_RELEASED),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusEntry {
    pub id: Uuid,
    pub text: String,
    #[schema(value_type = Object)]
    pub actor: ActorRef,
    pub status: OrderStatus,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub track_id: String,
    pub shop_id: Uuid,
    pub rider_id: Option<Uuid>,
    pub merchant_id: Option<Uuid>,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub recipient_city: String,
    pub recipient_thana: String,
    pub recipient_area: String,
    pub recipient_zip: String,
    pub recipient_address: String,
    pub package_code: String,
    pub payment_status: PaymentMode,
    pub price: f64,
    pub charge: f64,
    pub parcel_type: String,
    pub requested_delivery_time: Option<DateTime<Utc>>,
    pub pick_address: String,
    pub pick_hub: String,
    pub comments: String,
    pub number_of_items: i32,
    pub delivery_type: DeliveryType,
    pub weight: f64,
    pub current_status: Option<OrderStatus>,
    pub is_accepted: bool,
    pub is_picked: bool,
    pub is_cancelled: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Most recent first.
    pub statuses: Vec<StatusEntry>,
}

impl Order {
    pub fn is_delivered(&self) -> bool {
        self.delivered_at.is_some()
    }

    /// Once picked, cancelled or delivered the general fields are frozen.
    pub fn is_locked(&self) -> bool {
        self.is_delivered() || self.is_picked || self.is_cancelled
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Shop {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub base_charge: f64,
    pub delivery_zone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Assignment {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub order_id: Uuid,
    pub assigned_by: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-shop balance. The pending cash-out code and its expiry never leave the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Wallet {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub owner_id: Uuid,
    pub balance: f64,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrxHistory {
    pub id: Uuid,
    pub payment: f64,
    pub payment_type: TrxDirection,
    pub trx_id: Uuid,
    pub shop_id: Uuid,
    pub order_id: Option<Uuid>,
    pub remarks: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}
