use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
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
    pub payment_status: String,
    #[sea_orm(column_type = "Double")]
    pub price: f64,
    #[sea_orm(column_type = "Double")]
    pub charge: f64,
    pub parcel_type: String,
    pub requested_delivery_time: Option<DateTimeWithTimeZone>,
    pub pick_address: String,
    pub pick_hub: String,
    pub comments: String,
    pub number_of_items: i32,
    pub delivery_type: String,
    #[sea_orm(column_type = "Double")]
    pub weight: f64,
    pub current_status: Option<String>,
    pub is_accepted: bool,
    pub is_picked: bool,
    pub is_cancelled: bool,
    pub delivered_at: Option<DateTimeWithTimeZone>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shops::Entity",
        from = "Column::ShopId",
        to = "super::shops::Column::Id"
    )]
    Shops,
    #[sea_orm(has_many = "super::order_statuses::Entity")]
    OrderStatuses,
    #[sea_orm(has_many = "super::rider_parcels::Entity")]
    RiderParcels,
}

impl Related<super::shops::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shops.def()
    }
}

impl Related<super::order_statuses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderStatuses.def()
    }
}

impl Related<super::rider_parcels::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RiderParcels.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
