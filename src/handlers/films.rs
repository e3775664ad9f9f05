use crate::{
    auth::AuthenticatedUser,
    handlers::AppState,
    services::films::{
        CreateFilmRequest, FilmListQuery, FilmListResponse, FilmResponse, UpdateFilmRequest,
    },
    ApiResponse, ApiResult,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_films))
        .route("/", post(create_film))
        .route("/:id", get(get_film))
        .route("/:id", put(update_film))
        .route("/:id", delete(delete_film))
}

#[utoipa::path(
    get,
    path = "/api/v1/films",
    params(FilmListQuery),
    responses(
        (status = 200, description = "Film catalog page", body = crate::ApiResponse<FilmListResponse>)
    ),
    tag = "Films"
)]
pub async fn list_films(
    State(state): State<AppState>,
    Query(query): Query<FilmListQuery>,
) -> ApiResult<FilmListResponse> {
    let films = state.services.films.list_films(query).await?;
    Ok(Json(ApiResponse::success(films)))
}

#[utoipa::path(
    get,
    path = "/api/v1/films/:id",
    params(("id" = Uuid, Path, description = "Film ID")),
    responses(
        (status = 200, description = "Film details", body = crate::ApiResponse<FilmResponse>),
        (status = 404, description = "Film not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Films"
)]
pub async fn get_film(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<FilmResponse> {
    let film = state.services.films.get_film(id).await?;
    Ok(Json(ApiResponse::success(film)))
}

#[utoipa::path(
    post,
    path = "/api/v1/films",
    request_body = CreateFilmRequest,
    responses(
        (status = 201, description = "Film created", body = crate::ApiResponse<FilmResponse>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Films"
)]
pub async fn create_film(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(request): Json<CreateFilmRequest>,
) -> Result<impl IntoResponse, crate::errors::ServiceError> {
    let film = state.services.films.create_film(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(film))))
}

#[utoipa::path(
    put,
    path = "/api/v1/films/:id",
    params(("id" = Uuid, Path, description = "Film ID")),
    request_body = UpdateFilmRequest,
    responses(
        (status = 200, description = "Film updated", body = crate::ApiResponse<FilmResponse>),
        (status = 404, description = "Film not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Films"
)]
pub async fn update_film(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateFilmRequest>,
) -> ApiResult<FilmResponse> {
    let film = state.services.films.update_film(id, request).await?;
    Ok(Json(ApiResponse::success(film)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/films/:id",
    params(("id" = Uuid, Path, description = "Film ID")),
    responses(
        (status = 204, description = "Film deleted"),
        (status = 404, description = "Film not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Films"
)]
pub async fn delete_film(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, crate::errors::ServiceError> {
    state.services.films.delete_film(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
