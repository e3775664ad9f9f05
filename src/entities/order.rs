use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchase record. Created unpaid at checkout, flipped to paid exactly
/// once by the payment finalizer under an optimistic version check.
///
/// The price breakdown is supplied by the client at creation and trusted;
/// it is re-validated against the provider-reported capture amount during
/// finalization, never recomputed.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,

    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_postal_code: String,
    pub shipping_country: String,

    pub payment_method: PaymentMethod,

    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub items_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub tax_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub shipping_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub total_price: Decimal,

    /// Provider receipt snapshot, present only after successful payment.
    /// The transaction id is globally unique so one provider proof can never
    /// settle two orders.
    #[sea_orm(nullable, unique)]
    pub payment_transaction_id: Option<String>,
    #[sea_orm(nullable)]
    pub payment_status: Option<String>,
    #[sea_orm(nullable)]
    pub payment_update_time: Option<String>,
    #[sea_orm(nullable)]
    pub payer_email: Option<String>,

    pub is_paid: bool,
    #[sea_orm(nullable)]
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    #[sea_orm(nullable)]
    pub delivered_at: Option<DateTime<Utc>>,

    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Closed set of supported payment methods. The wire values ("PayPal",
/// "Stripe") match the client SDK names.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "PayPal")]
    #[strum(serialize = "PayPal")]
    PayPal,
    #[sea_orm(string_value = "Stripe")]
    #[strum(serialize = "Stripe")]
    Stripe,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::PayPal
    }
}
