use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of an order. `film_id` is a weak reference into the catalog:
/// it is populated iff `catalog_status` is `Resolved`, and checkout never
/// fails because resolution did not succeed.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub name: String,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub unit_price: Decimal,
    #[sea_orm(nullable)]
    pub film_id: Option<Uuid>,
    pub catalog_status: CatalogStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::film::Entity",
        from = "Column::FilmId",
        to = "super::film::Column::Id"
    )]
    Film,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::film::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Film.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Outcome of the best-effort catalog lookup performed at order creation.
///
/// Distinguishes "the lookup ran and found nothing" from "the lookup was
/// aborted" so downstream consumers are not left guessing at a null.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum CatalogStatus {
    /// The line item points at an existing catalog film.
    #[sea_orm(string_value = "resolved")]
    Resolved,
    /// Lookup ran to completion and no catalog entry matched.
    #[sea_orm(string_value = "unmatched")]
    Unmatched,
    /// Lookup was aborted (for example by a read error) and never completed.
    #[sea_orm(string_value = "skipped")]
    Skipped,
}
