use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{ActorRef, Assignment, DeliveryType, Order, OrderStatus, PaymentMode},
};

/// Order fields a shop supplies on creation and may still change while the order has not moved.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub recipient_name: String,
    pub recipient_phone: String,
    pub recipient_city: String,
    #[serde(default)]
    pub recipient_thana: String,
    pub recipient_area: String,
    #[serde(default)]
    pub recipient_zip: String,
    pub recipient_address: String,
    #[serde(default)]
    pub package_code: String,
    pub payment_status: PaymentMode,
    #[serde(default)]
    pub price: f64,
    pub parcel_type: String,
    pub requested_delivery_time: Option<DateTime<Utc>>,
    pub pick_address: String,
    pub pick_hub: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub number_of_items: i32,
    pub weight: f64,
    pub delivery_type: DeliveryType,
}

impl UpdateOrderRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_order_fields(self.weight, self.price, self.payment_status, &self.comments)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(flatten)]
    pub details: UpdateOrderRequest,
    pub merchant_id: Option<Uuid>,
}

impl CreateOrderRequest {
    pub fn validate(&self) -> AppResult<()> {
        self.details.validate()
    }
}

fn validate_order_fields(
    weight: f64,
    price: f64,
    payment_status: PaymentMode,
    comments: &str,
) -> AppResult<()> {
    if !(weight.is_finite() && weight > 0.0) {
        return Err(AppError::BadRequest("weight must be greater than zero".into()));
    }
    if !(price.is_finite() && price >= 0.0) {
        return Err(AppError::BadRequest("price can not be negative".into()));
    }
    if payment_status == PaymentMode::Cod && price <= 0.0 {
        return Err(AppError::BadRequest("price can not be zero".into()));
    }
    if comments.chars().count() > 300 {
        return Err(AppError::BadRequest("comments are limited to 300 characters".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub text: String,
}

/// A status transition ready to be appended to an order's log.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusDraft {
    pub status: OrderStatus,
    pub text: String,
    pub actor: ActorRef,
}

impl StatusDraft {
    pub fn new(status: OrderStatus, text: impl Into<String>, actor: ActorRef) -> Self {
        Self {
            status,
            text: text.into(),
            actor,
        }
    }

    /// The caller's note, or the status's canonical message when left blank.
    pub fn note(&self) -> String {
        let text = self.text.trim();
        if text.is_empty() {
            self.status.default_note().to_string()
        } else {
            text.to_string()
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkStatusRequest {
    pub order_ids: Vec<Uuid>,
    pub status: OrderStatus,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignOrderRequest {
    pub rider_id: Uuid,
    pub order_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssignedOrder {
    pub order: Order,
    #[serde(rename = "riderParcel")]
    pub assignment: Assignment,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RiderParcelList {
    pub items: Vec<AssignedOrder>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(payment_status: PaymentMode, price: f64, weight: f64) -> CreateOrderRequest {
        CreateOrderRequest {
            details: UpdateOrderRequest {
                recipient_name: "Rahim".into(),
                recipient_phone: "01700000000".into(),
                recipient_city: "Dhaka".into(),
                recipient_thana: String::new(),
                recipient_area: "Mirpur".into(),
                recipient_zip: String::new(),
                recipient_address: "Road 1".into(),
                package_code: String::new(),
                payment_status,
                price,
                parcel_type: "Parcel".into(),
                requested_delivery_time: None,
                pick_address: "Shop".into(),
                pick_hub: "Hub".into(),
                comments: String::new(),
                number_of_items: 1,
                weight,
                delivery_type: DeliveryType::Regular,
            },
            merchant_id: None,
        }
    }

    #[test]
    fn cod_orders_need_a_declared_price() {
        assert!(create_request(PaymentMode::Cod, 0.0, 1.0).validate().is_err());
        assert!(create_request(PaymentMode::Cod, 500.0, 1.0).validate().is_ok());
        assert!(create_request(PaymentMode::Paid, 0.0, 1.0).validate().is_ok());
    }

    #[test]
    fn weight_must_be_positive() {
        assert!(create_request(PaymentMode::Paid, 0.0, 0.0).validate().is_err());
        assert!(create_request(PaymentMode::Paid, 0.0, f64::NAN).validate().is_err());
    }

    #[test]
    fn create_body_is_the_editable_fields_plus_merchant() {
        let merchant = Uuid::now_v7();
        let body = serde_json::json!({
            "recipientName": "Rahim",
            "recipientPhone": "01700000000",
            "recipientCity": "Dhaka",
            "recipientArea": "Mirpur",
            "recipientAddress": "Road 1",
            "paymentStatus": "COD",
            "price": 500.0,
            "parcelType": "Parcel",
            "pickAddress": "Shop",
            "pickHub": "Hub",
            "weight": 1.5,
            "deliveryType": "Regular",
            "merchantId": merchant,
        });
        let request: CreateOrderRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.merchant_id, Some(merchant));
        assert_eq!(request.details.recipient_area, "Mirpur");
        assert_eq!(request.details.number_of_items, 0);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn blank_note_falls_back_to_status_message() {
        let draft = StatusDraft::new(OrderStatus::Picked, "   ", ActorRef::None);
        assert_eq!(draft.note(), OrderStatus::Picked.default_note());

        let draft = StatusDraft::new(OrderStatus::Picked, " at the hub ", ActorRef::None);
        assert_eq!(draft.note(), "at the hub");
    }
}
