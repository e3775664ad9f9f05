use crate::{
    db::DbPool,
    entities::{
        film::{self, Entity as FilmEntity},
        order::{self, Entity as OrderEntity, PaymentMethod},
        order_item::{self, CatalogStatus, Entity as OrderItemEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    providers::VerifiedPayment,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Request/Response types for the order service

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    /// Ordered line items. An empty list is a validation error and persists
    /// nothing.
    #[validate(
        length(min = 1, message = "Order must contain at least one item"),
        custom = "validate_order_items"
    )]
    pub items: Vec<OrderItemInput>,
    #[validate]
    pub shipping_address: ShippingAddressInput,
    pub payment_method: PaymentMethod,
    /// Price breakdown computed client-side and trusted at creation time.
    /// It is re-validated against the provider capture during finalization,
    /// never recomputed here.
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemInput {
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    /// Optional catalog reference supplied by the client. Resolution is
    /// best-effort; a missing or stale id never blocks checkout.
    pub film_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ShippingAddressInput {
    #[validate(length(min = 1, message = "Shipping address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "Shipping city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "Shipping postal code is required"))]
    pub postal_code: String,
    #[validate(length(min = 1, message = "Shipping country is required"))]
    pub country: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub film_id: Option<Uuid>,
    pub catalog_status: CatalogStatus,
}

impl From<order_item::Model> for OrderItemResponse {
    fn from(model: order_item::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            quantity: model.quantity,
            unit_price: model.unit_price,
            film_id: model.film_id,
            catalog_status: model.catalog_status,
        }
    }
}

/// Provider receipt snapshot, present only on paid orders
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentReceiptResponse {
    pub transaction_id: String,
    pub status: String,
    pub update_time: Option<String>,
    pub payer_email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItemResponse>,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_postal_code: String,
    pub shipping_country: String,
    pub payment_method: PaymentMethod,
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
    pub payment_receipt: Option<PaymentReceiptResponse>,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderResponse {
    pub fn from_parts(order: order::Model, items: Vec<order_item::Model>) -> Self {
        let payment_receipt = order
            .payment_transaction_id
            .map(|transaction_id| PaymentReceiptResponse {
                transaction_id,
                status: order.payment_status.unwrap_or_default(),
                update_time: order.payment_update_time,
                payer_email: order.payer_email,
            });

        Self {
            id: order.id,
            user_id: order.user_id,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
            shipping_address: order.shipping_address,
            shipping_city: order.shipping_city,
            shipping_postal_code: order.shipping_postal_code,
            shipping_country: order.shipping_country,
            payment_method: order.payment_method,
            items_price: order.items_price,
            tax_price: order.tax_price,
            shipping_price: order.shipping_price,
            total_price: order.total_price,
            payment_receipt,
            is_paid: order.is_paid,
            paid_at: order.paid_at,
            is_delivered: order.is_delivered,
            delivered_at: order.delivered_at,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Service for order creation, listing, and paid-state transitions
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates an unpaid order from the caller's cart contents.
    ///
    /// Each line item gets a best-effort catalog resolution (by id when
    /// supplied, else by exact title); failures are tagged on the item and
    /// logged, never fatal. The order and its items are persisted in one
    /// transaction.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn create_order(
        &self,
        user_id: Uuid,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        // Catalog resolution happens before the transaction; it is read-only
        // and its outcome only tags the items.
        let mut resolved_items = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let (film_id, catalog_status) = self.resolve_catalog_entry(item).await;
            resolved_items.push(order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                name: Set(item.name.trim().to_string()),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                film_id: Set(film_id),
                catalog_status: Set(catalog_status),
                created_at: Set(now),
            });
        }

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to open transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let order = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(user_id),
            shipping_address: Set(request.shipping_address.address.trim().to_string()),
            shipping_city: Set(request.shipping_address.city.trim().to_string()),
            shipping_postal_code: Set(request.shipping_address.postal_code.trim().to_string()),
            shipping_country: Set(request.shipping_address.country.trim().to_string()),
            payment_method: Set(request.payment_method),
            items_price: Set(request.items_price),
            tax_price: Set(request.tax_price),
            shipping_price: Set(request.shipping_price),
            total_price: Set(request.total_price),
            payment_transaction_id: Set(None),
            payment_status: Set(None),
            payment_update_time: Set(None),
            payer_email: Set(None),
            is_paid: Set(false),
            paid_at: Set(None),
            is_delivered: Set(false),
            delivered_at: Set(None),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to insert order");
            ServiceError::DatabaseError(e)
        })?;

        OrderItemEntity::insert_many(resolved_items)
            .exec(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to insert order items");
                ServiceError::DatabaseError(e)
            })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            order_id = %order_id,
            user_id = %user_id,
            total_price = %order.total_price,
            "Order created"
        );

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderCreated(order_id)).await {
                warn!(error = %e, order_id = %order_id, "Failed to send order created event");
            }
        }

        let items = self.load_items(order_id).await?;
        Ok(OrderResponse::from_parts(order, items))
    }

    /// Lists the caller's own orders, newest first
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn my_orders(&self, user_id: Uuid) -> Result<Vec<OrderResponse>, ServiceError> {
        let db = &*self.db_pool;

        let orders = OrderEntity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .find_with_related(OrderItemEntity)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "Failed to list orders");
                ServiceError::DatabaseError(e)
            })?;

        Ok(orders
            .into_iter()
            .map(|(order, items)| OrderResponse::from_parts(order, items))
            .collect())
    }

    /// Fetches one of the caller's orders with its items
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        let order = self.find_owned_order(user_id, order_id).await?;
        let items = self.load_items(order_id).await?;
        Ok(OrderResponse::from_parts(order, items))
    }

    /// Loads an order scoped to its owning account. Another user's order id
    /// maps to NotFound so the response does not confirm the id exists.
    pub async fn find_owned_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;

        OrderEntity::find_by_id(order_id)
            .filter(order::Column::UserId.eq(user_id))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to fetch order");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    pub async fn load_items(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<order_item::Model>, ServiceError> {
        let db = &*self.db_pool;

        OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to fetch order items");
                ServiceError::DatabaseError(e)
            })
    }

    /// Flips an unpaid order to paid under an optimistic version check and
    /// records the provider receipt.
    ///
    /// The write is a compare-and-set on (id, version, is_paid = false). A
    /// lost race is re-read and classified: already paid with the same
    /// transaction id is a stable success, any other outcome is a conflict.
    /// The UNIQUE constraint on the transaction id rejects replaying one
    /// provider proof against a second order.
    #[instrument(skip(self, payment), fields(order_id = %order.id))]
    pub async fn mark_paid(
        &self,
        order: &order::Model,
        method: PaymentMethod,
        payment: &VerifiedPayment,
    ) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let result = OrderEntity::update_many()
            .col_expr(order::Column::IsPaid, Expr::value(true))
            .col_expr(order::Column::PaidAt, Expr::value(Some(now)))
            .col_expr(order::Column::PaymentMethod, Expr::value(method))
            .col_expr(
                order::Column::PaymentTransactionId,
                Expr::value(Some(payment.transaction_id.clone())),
            )
            .col_expr(
                order::Column::PaymentStatus,
                Expr::value(Some(payment.status.clone())),
            )
            .col_expr(
                order::Column::PaymentUpdateTime,
                Expr::value(payment.update_time.clone()),
            )
            .col_expr(
                order::Column::PayerEmail,
                Expr::value(payment.payer_email.clone()),
            )
            .col_expr(order::Column::Version, Expr::value(order.version + 1))
            .col_expr(order::Column::UpdatedAt, Expr::value(now))
            .filter(order::Column::Id.eq(order.id))
            .filter(order::Column::Version.eq(order.version))
            .filter(order::Column::IsPaid.eq(false))
            .exec(db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    warn!(
                        order_id = %order.id,
                        transaction_id = %payment.transaction_id,
                        "Provider transaction already settles another order"
                    );
                    ServiceError::Conflict(format!(
                        "Payment transaction {} already settles another order",
                        payment.transaction_id
                    ))
                } else {
                    error!(error = %e, order_id = %order.id, "Failed to mark order paid");
                    ServiceError::DatabaseError(e)
                }
            })?;

        if result.rows_affected == 0 {
            let current = OrderEntity::find_by_id(order.id)
                .one(db)
                .await
                .map_err(ServiceError::DatabaseError)?
                .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order.id)))?;

            if current.is_paid {
                if current.payment_transaction_id.as_deref()
                    == Some(payment.transaction_id.as_str())
                {
                    // A concurrent finalize with the same proof won the race;
                    // the stored state is exactly what we would have written.
                    info!(order_id = %order.id, "Order already paid with this transaction");
                    return Ok(current);
                }
                return Err(ServiceError::Conflict(format!(
                    "Order {} is already paid with a different transaction",
                    order.id
                )));
            }
            return Err(ServiceError::ConcurrentModification(order.id));
        }

        let updated = OrderEntity::find_by_id(order.id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order.id)))?;

        info!(
            order_id = %order.id,
            payment_method = %method,
            transaction_id = %payment.transaction_id,
            "Order marked paid"
        );

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::OrderPaid {
                    order_id: order.id,
                    payment_method: method.to_string(),
                    transaction_id: payment.transaction_id.clone(),
                })
                .await
            {
                warn!(error = %e, order_id = %order.id, "Failed to send order paid event");
            }
        }

        Ok(updated)
    }

    /// Best-effort catalog resolution for one line item.
    ///
    /// Tolerance policy: a read error aborts the lookup (`Skipped`), a clean
    /// miss is `Unmatched`; both are logged at WARN and neither blocks
    /// checkout.
    async fn resolve_catalog_entry(&self, item: &OrderItemInput) -> (Option<Uuid>, CatalogStatus) {
        let db = &*self.db_pool;

        if let Some(film_id) = item.film_id {
            match FilmEntity::find_by_id(film_id).one(db).await {
                Ok(Some(film)) => return (Some(film.id), CatalogStatus::Resolved),
                Ok(None) => {
                    // Stale id from the client; fall through to the title
                    // lookup before giving up.
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        film_id = %film_id,
                        item = %item.name,
                        "Catalog lookup by id aborted; item left unresolved"
                    );
                    return (None, CatalogStatus::Skipped);
                }
            }
        }

        match FilmEntity::find()
            .filter(film::Column::Title.eq(item.name.trim()))
            .one(db)
            .await
        {
            Ok(Some(film)) => (Some(film.id), CatalogStatus::Resolved),
            Ok(None) => {
                warn!(
                    item = %item.name,
                    "No catalog entry matched order item; persisting without reference"
                );
                (None, CatalogStatus::Unmatched)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    item = %item.name,
                    "Catalog lookup by title aborted; item left unresolved"
                );
                (None, CatalogStatus::Skipped)
            }
        }
    }
}

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    let message = err.to_string();
    message.contains("UNIQUE constraint failed") || message.contains("duplicate key")
}

fn validate_order_items(items: &[OrderItemInput]) -> Result<(), ValidationError> {
    for item in items {
        if item.name.trim().is_empty() {
            let mut err = ValidationError::new("items");
            err.message = Some("Order item name is required".into());
            return Err(err);
        }
        if item.quantity < 1 {
            let mut err = ValidationError::new("items");
            err.message = Some("Order item quantity must be at least 1".into());
            return Err(err);
        }
        if item.unit_price.is_sign_negative() {
            let mut err = ValidationError::new("items");
            err.message = Some("Order item price cannot be negative".into());
            return Err(err);
        }
    }
    Ok(())
}
