use crate::{
    db::DbPool,
    entities::{
        cart::{self, Entity as CartEntity},
        cart_item::{self, Entity as CartItemEntity},
        film::{self, Entity as FilmEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Request/Response types for the cart service

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddCartItemRequest {
    pub film_id: Uuid,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemResponse {
    pub id: Uuid,
    pub film_id: Uuid,
    pub title: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub image_url: Option<String>,
    pub line_total: Decimal,
}

impl From<cart_item::Model> for CartItemResponse {
    fn from(model: cart_item::Model) -> Self {
        let line_total = model.unit_price * Decimal::from(model.quantity);
        Self {
            id: model.id,
            film_id: model.film_id,
            title: model.title,
            quantity: model.quantity,
            unit_price: model.unit_price,
            image_url: model.image_url,
            line_total,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub id: Uuid,
    pub items: Vec<CartItemResponse>,
    /// Σ quantity × unit price, computed on read
    pub total: Decimal,
    pub item_count: i32,
}

impl CartResponse {
    fn from_parts(cart: cart::Model, items: Vec<cart_item::Model>) -> Self {
        let items: Vec<CartItemResponse> = items.into_iter().map(CartItemResponse::from).collect();
        let total = items.iter().map(|item| item.line_total).sum();
        let item_count = items.iter().map(|item| item.quantity).sum();
        Self {
            id: cart.id,
            items,
            total,
            item_count,
        }
    }
}

/// Service for the persistent per-user shopping cart.
///
/// One cart per account, created lazily on first access. Items snapshot the
/// film's price, title and image at add time so later catalog edits do not
/// rewrite a cart under the shopper.
#[derive(Clone)]
pub struct CartService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CartService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Fetches the caller's cart, creating an empty one on first access
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartResponse, ServiceError> {
        let cart = self.load_or_create_cart(user_id).await?;
        let items = self.load_items(cart.id).await?;
        Ok(CartResponse::from_parts(cart, items))
    }

    /// Adds a film to the cart, merging with an existing line for the same
    /// film. Stock is checked against the merged quantity.
    #[instrument(skip(self, request), fields(user_id = %user_id, film_id = %request.film_id))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        request: AddCartItemRequest,
    ) -> Result<CartResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;

        let film = FilmEntity::find_by_id(request.film_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, film_id = %request.film_id, "Failed to fetch film for cart");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Film {} not found", request.film_id))
            })?;

        let cart = self.load_or_create_cart(user_id).await?;
        let now = Utc::now();

        let existing = CartItemEntity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::FilmId.eq(film.id))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, cart_id = %cart.id, "Failed to fetch cart line");
                ServiceError::DatabaseError(e)
            })?;

        match existing {
            Some(item) => {
                let merged = item.quantity + request.quantity;
                check_stock(&film, merged)?;

                let item_id = item.id;
                let mut active: cart_item::ActiveModel = item.into();
                active.quantity = Set(merged);
                active.updated_at = Set(now);
                active.update(db).await.map_err(|e| {
                    error!(error = %e, cart_id = %cart.id, "Failed to update cart line");
                    ServiceError::DatabaseError(e)
                })?;

                if let Some(event_sender) = &self.event_sender {
                    if let Err(e) = event_sender
                        .send(Event::CartItemUpdated {
                            cart_id: cart.id,
                            item_id,
                        })
                        .await
                    {
                        warn!(error = %e, cart_id = %cart.id, "Failed to send cart event");
                    }
                }
            }
            None => {
                check_stock(&film, request.quantity)?;

                cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    cart_id: Set(cart.id),
                    film_id: Set(film.id),
                    quantity: Set(request.quantity),
                    unit_price: Set(film.price),
                    title: Set(film.title.clone()),
                    image_url: Set(film.image_url.clone()),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(db)
                .await
                .map_err(|e| {
                    error!(error = %e, cart_id = %cart.id, "Failed to insert cart line");
                    ServiceError::DatabaseError(e)
                })?;

                if let Some(event_sender) = &self.event_sender {
                    if let Err(e) = event_sender
                        .send(Event::CartItemAdded {
                            cart_id: cart.id,
                            film_id: film.id,
                        })
                        .await
                    {
                        warn!(error = %e, cart_id = %cart.id, "Failed to send cart event");
                    }
                }
            }
        }

        info!(cart_id = %cart.id, film_id = %film.id, "Cart item added");

        let items = self.load_items(cart.id).await?;
        Ok(CartResponse::from_parts(cart, items))
    }

    /// Sets the quantity of an existing cart line
    #[instrument(skip(self, request), fields(user_id = %user_id, item_id = %item_id))]
    pub async fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        request: UpdateCartItemRequest,
    ) -> Result<CartResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let cart = self.load_or_create_cart(user_id).await?;
        let item = self.find_owned_item(cart.id, item_id).await?;

        let film = FilmEntity::find_by_id(item.film_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, film_id = %item.film_id, "Failed to fetch film for stock check");
                ServiceError::DatabaseError(e)
            })?;
        // A film deleted after being carted no longer constrains quantity.
        if let Some(film) = &film {
            check_stock(film, request.quantity)?;
        }

        let mut active: cart_item::ActiveModel = item.into();
        active.quantity = Set(request.quantity);
        active.updated_at = Set(Utc::now());
        active.update(db).await.map_err(|e| {
            error!(error = %e, cart_id = %cart.id, "Failed to update cart line");
            ServiceError::DatabaseError(e)
        })?;

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::CartItemUpdated {
                    cart_id: cart.id,
                    item_id,
                })
                .await
            {
                warn!(error = %e, cart_id = %cart.id, "Failed to send cart event");
            }
        }

        let items = self.load_items(cart.id).await?;
        Ok(CartResponse::from_parts(cart, items))
    }

    /// Removes one line from the cart
    #[instrument(skip(self), fields(user_id = %user_id, item_id = %item_id))]
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<CartResponse, ServiceError> {
        let db = &*self.db_pool;
        let cart = self.load_or_create_cart(user_id).await?;
        let item = self.find_owned_item(cart.id, item_id).await?;

        item.delete(db).await.map_err(|e| {
            error!(error = %e, cart_id = %cart.id, "Failed to delete cart line");
            ServiceError::DatabaseError(e)
        })?;

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::CartItemRemoved {
                    cart_id: cart.id,
                    item_id,
                })
                .await
            {
                warn!(error = %e, cart_id = %cart.id, "Failed to send cart event");
            }
        }

        let items = self.load_items(cart.id).await?;
        Ok(CartResponse::from_parts(cart, items))
    }

    /// Empties the cart
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn clear(&self, user_id: Uuid) -> Result<CartResponse, ServiceError> {
        let db = &*self.db_pool;
        let cart = self.load_or_create_cart(user_id).await?;

        CartItemEntity::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(db)
            .await
            .map_err(|e| {
                error!(error = %e, cart_id = %cart.id, "Failed to clear cart");
                ServiceError::DatabaseError(e)
            })?;

        info!(cart_id = %cart.id, "Cart cleared");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::CartCleared(cart.id)).await {
                warn!(error = %e, cart_id = %cart.id, "Failed to send cart event");
            }
        }

        Ok(CartResponse::from_parts(cart, vec![]))
    }

    async fn load_or_create_cart(&self, user_id: Uuid) -> Result<cart::Model, ServiceError> {
        let db = &*self.db_pool;

        let existing = CartEntity::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "Failed to fetch cart");
                ServiceError::DatabaseError(e)
            })?;

        if let Some(cart) = existing {
            return Ok(cart);
        }

        let now = Utc::now();
        cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user_id, "Failed to create cart");
            ServiceError::DatabaseError(e)
        })
    }

    async fn find_owned_item(
        &self,
        cart_id: Uuid,
        item_id: Uuid,
    ) -> Result<cart_item::Model, ServiceError> {
        let db = &*self.db_pool;

        CartItemEntity::find_by_id(item_id)
            .filter(cart_item::Column::CartId.eq(cart_id))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, item_id = %item_id, "Failed to fetch cart line");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))
    }

    async fn load_items(&self, cart_id: Uuid) -> Result<Vec<cart_item::Model>, ServiceError> {
        let db = &*self.db_pool;

        CartItemEntity::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, cart_id = %cart_id, "Failed to fetch cart items");
                ServiceError::DatabaseError(e)
            })
    }
}

fn check_stock(film: &film::Model, requested: i32) -> Result<(), ServiceError> {
    if requested > film.stock {
        return Err(ServiceError::ValidationError(format!(
            "Only {} of \"{}\" in stock",
            film.stock, film.title
        )));
    }
    Ok(())
}
