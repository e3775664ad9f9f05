use crate::{
    config::AppConfig,
    db::DbPool,
    entities::film::{self, Entity as FilmEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Request/Response types for the film catalog service

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFilmRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub director: Option<String>,
    #[validate(range(min = 1888, max = 2100, message = "Release year is implausible"))]
    pub release_year: Option<i32>,
    #[validate(custom = "validate_non_negative_price")]
    pub price: Decimal,
    #[serde(default)]
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,
    pub description: Option<String>,
    pub country: Option<String>,
    pub runtime_minutes: Option<i32>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub image_url: Option<String>,
    pub criterion_number: Option<i32>,
    #[serde(default)]
    pub awards: Vec<String>,
    #[serde(default)]
    pub cast: Vec<String>,
    pub format: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateFilmRequest {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub director: Option<String>,
    #[validate(range(min = 1888, max = 2100, message = "Release year is implausible"))]
    pub release_year: Option<i32>,
    #[validate(custom = "validate_non_negative_price")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
    pub description: Option<String>,
    pub country: Option<String>,
    pub runtime_minutes: Option<i32>,
    pub genres: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub criterion_number: Option<i32>,
    pub awards: Option<Vec<String>>,
    pub cast: Option<Vec<String>>,
    pub format: Option<String>,
    pub language: Option<String>,
    pub featured: Option<bool>,
}

/// Catalog browse filters, straight off the query string
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct FilmListQuery {
    /// Only featured films when true
    pub featured: Option<bool>,
    /// Films whose genre list contains this genre
    pub genre: Option<String>,
    /// Case-insensitive substring over title, director and description
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FilmResponse {
    pub id: Uuid,
    pub title: String,
    pub director: Option<String>,
    pub release_year: Option<i32>,
    pub price: Decimal,
    pub stock: i32,
    pub description: Option<String>,
    pub country: Option<String>,
    pub runtime_minutes: Option<i32>,
    pub genres: Vec<String>,
    pub image_url: Option<String>,
    pub criterion_number: Option<i32>,
    pub awards: Vec<String>,
    pub cast: Vec<String>,
    pub format: Option<String>,
    pub language: Option<String>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<film::Model> for FilmResponse {
    fn from(model: film::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            director: model.director,
            release_year: model.release_year,
            price: model.price,
            stock: model.stock,
            description: model.description,
            country: model.country,
            runtime_minutes: model.runtime_minutes,
            genres: string_array(model.genres),
            image_url: model.image_url,
            criterion_number: model.criterion_number,
            awards: string_array(model.awards),
            cast: string_array(model.cast),
            format: model.format,
            language: model.language,
            featured: model.featured,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationMeta {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FilmListResponse {
    pub films: Vec<FilmResponse>,
    pub pagination: PaginationMeta,
}

/// Service for browsing and curating the film catalog
#[derive(Clone)]
pub struct FilmService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    default_page_size: u32,
    max_page_size: u32,
}

impl FilmService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        config: &AppConfig,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            default_page_size: config.api_default_page_size,
            max_page_size: config.api_max_page_size,
        }
    }

    /// Lists catalog entries with optional filters, newest first
    #[instrument(skip(self))]
    pub async fn list_films(&self, query: FilmListQuery) -> Result<FilmListResponse, ServiceError> {
        let db = &*self.db_pool;

        let page = u64::from(query.page.unwrap_or(1).max(1));
        let limit = u64::from(
            query
                .limit
                .unwrap_or(self.default_page_size)
                .clamp(1, self.max_page_size),
        );

        let mut condition = Condition::all();

        if query.featured == Some(true) {
            condition = condition.add(film::Column::Featured.eq(true));
        }

        if let Some(genre) = query.genre.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
            // Genres are stored as a JSON string array; a quoted LIKE match
            // is containment for exact genre names.
            condition = condition.add(film::Column::Genres.contains(format!("\"{}\"", genre)));
        }

        if let Some(search) = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let pattern = format!("%{}%", search.to_lowercase());
            condition = condition.add(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            film::Entity,
                            film::Column::Title,
                        ))))
                        .like(pattern.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            film::Entity,
                            film::Column::Director,
                        ))))
                        .like(pattern.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            film::Entity,
                            film::Column::Description,
                        ))))
                        .like(pattern),
                    ),
            );
        }

        let paginator = FilmEntity::find()
            .filter(condition)
            .order_by_desc(film::Column::CreatedAt)
            .paginate(db, limit);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count films");
            ServiceError::DatabaseError(e)
        })?;

        let films = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, page = page, limit = limit, "Failed to fetch films page");
            ServiceError::DatabaseError(e)
        })?;

        let pages = if total == 0 { 0 } else { (total + limit - 1) / limit };

        Ok(FilmListResponse {
            films: films.into_iter().map(FilmResponse::from).collect(),
            pagination: PaginationMeta {
                page,
                limit,
                total,
                pages,
            },
        })
    }

    /// Fetches a single film by id
    #[instrument(skip(self), fields(film_id = %film_id))]
    pub async fn get_film(&self, film_id: Uuid) -> Result<FilmResponse, ServiceError> {
        let model = self.load_film(film_id).await?;
        Ok(model.into())
    }

    /// Creates a catalog entry; titles are unique
    #[instrument(skip(self, request))]
    pub async fn create_film(&self, request: CreateFilmRequest) -> Result<FilmResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let title = request.title.trim().to_string();

        let duplicate = FilmEntity::find()
            .filter(film::Column::Title.eq(title.clone()))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to check for duplicate film title");
                ServiceError::DatabaseError(e)
            })?;
        if duplicate.is_some() {
            return Err(ServiceError::ValidationError(
                "A film with this title already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let film_id = Uuid::new_v4();

        let model = film::ActiveModel {
            id: Set(film_id),
            title: Set(title),
            director: Set(request.director),
            release_year: Set(request.release_year),
            price: Set(request.price),
            stock: Set(request.stock),
            description: Set(request.description),
            country: Set(request.country),
            runtime_minutes: Set(request.runtime_minutes),
            genres: Set(serde_json::Value::from(request.genres)),
            image_url: Set(request.image_url),
            criterion_number: Set(request.criterion_number),
            awards: Set(serde_json::Value::from(request.awards)),
            cast: Set(serde_json::Value::from(request.cast)),
            format: Set(request.format),
            language: Set(request.language),
            featured: Set(request.featured),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!(error = %e, film_id = %film_id, "Failed to create film");
            ServiceError::DatabaseError(e)
        })?;

        info!(film_id = %film_id, title = %model.title, "Film created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::FilmCreated(film_id)).await {
                warn!(error = %e, film_id = %film_id, "Failed to send film created event");
            }
        }

        Ok(model.into())
    }

    /// Partially updates a catalog entry
    #[instrument(skip(self, request), fields(film_id = %film_id))]
    pub async fn update_film(
        &self,
        film_id: Uuid,
        request: UpdateFilmRequest,
    ) -> Result<FilmResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let model = self.load_film(film_id).await?;

        if let Some(title) = request.title.as_deref().map(str::trim) {
            if title != model.title {
                let duplicate = FilmEntity::find()
                    .filter(film::Column::Title.eq(title))
                    .one(db)
                    .await
                    .map_err(|e| {
                        error!(error = %e, "Failed to check for duplicate film title");
                        ServiceError::DatabaseError(e)
                    })?;
                if duplicate.is_some() {
                    return Err(ServiceError::ValidationError(
                        "A film with this title already exists".to_string(),
                    ));
                }
            }
        }

        let mut active: film::ActiveModel = model.into();
        if let Some(title) = request.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(director) = request.director {
            active.director = Set(Some(director));
        }
        if let Some(release_year) = request.release_year {
            active.release_year = Set(Some(release_year));
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(stock) = request.stock {
            active.stock = Set(stock);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(country) = request.country {
            active.country = Set(Some(country));
        }
        if let Some(runtime_minutes) = request.runtime_minutes {
            active.runtime_minutes = Set(Some(runtime_minutes));
        }
        if let Some(genres) = request.genres {
            active.genres = Set(serde_json::Value::from(genres));
        }
        if let Some(image_url) = request.image_url {
            active.image_url = Set(Some(image_url));
        }
        if let Some(criterion_number) = request.criterion_number {
            active.criterion_number = Set(Some(criterion_number));
        }
        if let Some(awards) = request.awards {
            active.awards = Set(serde_json::Value::from(awards));
        }
        if let Some(cast) = request.cast {
            active.cast = Set(serde_json::Value::from(cast));
        }
        if let Some(format) = request.format {
            active.format = Set(Some(format));
        }
        if let Some(language) = request.language {
            active.language = Set(Some(language));
        }
        if let Some(featured) = request.featured {
            active.featured = Set(featured);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, film_id = %film_id, "Failed to update film");
            ServiceError::DatabaseError(e)
        })?;

        info!(film_id = %film_id, "Film updated");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::FilmUpdated(film_id)).await {
                warn!(error = %e, film_id = %film_id, "Failed to send film updated event");
            }
        }

        Ok(updated.into())
    }

    /// Deletes a catalog entry
    #[instrument(skip(self), fields(film_id = %film_id))]
    pub async fn delete_film(&self, film_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let result = FilmEntity::delete_by_id(film_id).exec(db).await.map_err(|e| {
            error!(error = %e, film_id = %film_id, "Failed to delete film");
            ServiceError::DatabaseError(e)
        })?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Film {} not found",
                film_id
            )));
        }

        info!(film_id = %film_id, "Film deleted");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::FilmDeleted(film_id)).await {
                warn!(error = %e, film_id = %film_id, "Failed to send film deleted event");
            }
        }

        Ok(())
    }

    async fn load_film(&self, film_id: Uuid) -> Result<film::Model, ServiceError> {
        let db = &*self.db_pool;

        FilmEntity::find_by_id(film_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, film_id = %film_id, "Failed to fetch film");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Film {} not found", film_id)))
    }
}

fn string_array(value: serde_json::Value) -> Vec<String> {
    serde_json::from_value(value).unwrap_or_default()
}

fn validate_non_negative_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() {
        let mut err = ValidationError::new("price");
        err.message = Some("Price cannot be negative".into());
        return Err(err);
    }
    Ok(())
}
