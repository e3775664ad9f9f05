use crate::{
    auth::AuthenticatedUser,
    handlers::AppState,
    services::orders::{CreateOrderRequest, OrderResponse},
    services::payments::{
        CreatePaymentIntentRequest, FinalizePaypalRequest, FinalizeStripeRequest,
        PaymentIntentResponse, PaypalClientIdResponse, StripePublishableKeyResponse,
    },
    ApiResponse, ApiResult,
};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/myorders", get(my_orders))
        // Static segments before the `:id` capture so the router never
        // tries to parse them as order ids.
        .route("/paypal-client-id", get(paypal_client_id))
        .route("/stripe-publishable-key", get(stripe_publishable_key))
        .route("/stripe/create-payment-intent", post(create_payment_intent))
        .route("/:id", get(get_order))
        .route("/:id/pay", put(pay_order_paypal))
        .route("/:id/pay/stripe", put(pay_order_stripe))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = crate::ApiResponse<OrderResponse>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, crate::errors::ServiceError> {
    let order = state
        .services
        .orders
        .create_order(user.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/myorders",
    responses(
        (status = 200, description = "Caller's orders, newest first", body = crate::ApiResponse<Vec<OrderResponse>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn my_orders(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Vec<OrderResponse>> {
    let orders = state.services.orders.my_orders(user.user_id).await?;
    Ok(Json(ApiResponse::success(orders)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/:id",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order details", body = crate::ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.get_order(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/paypal-client-id",
    responses(
        (status = 200, description = "Public PayPal client id", body = crate::ApiResponse<PaypalClientIdResponse>),
        (status = 503, description = "PayPal not configured", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn paypal_client_id(
    State(state): State<AppState>,
) -> ApiResult<PaypalClientIdResponse> {
    let response = state.services.payments.paypal_client_id()?;
    Ok(Json(ApiResponse::success(response)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/stripe-publishable-key",
    responses(
        (status = 200, description = "Public Stripe key", body = crate::ApiResponse<StripePublishableKeyResponse>),
        (status = 503, description = "Stripe not configured", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn stripe_publishable_key(
    State(state): State<AppState>,
) -> ApiResult<StripePublishableKeyResponse> {
    let response = state.services.payments.stripe_publishable_key()?;
    Ok(Json(ApiResponse::success(response)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/stripe/create-payment-intent",
    request_body = CreatePaymentIntentRequest,
    responses(
        (status = 200, description = "Intent created", body = crate::ApiResponse<PaymentIntentResponse>),
        (status = 400, description = "Amount does not match order total", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 503, description = "Stripe not configured", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreatePaymentIntentRequest>,
) -> ApiResult<PaymentIntentResponse> {
    let response = state
        .services
        .payments
        .create_stripe_intent(&user, request)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/:id/pay",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = FinalizePaypalRequest,
    responses(
        (status = 200, description = "Order marked paid", body = crate::ApiResponse<OrderResponse>),
        (status = 402, description = "Payment not settled or amount mismatch", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order already paid with a different transaction", body = crate::errors::ErrorResponse),
        (status = 503, description = "PayPal not configured", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn pay_order_paypal(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<FinalizePaypalRequest>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .payments
        .finalize_paypal(&user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/:id/pay/stripe",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = FinalizeStripeRequest,
    responses(
        (status = 200, description = "Order marked paid", body = crate::ApiResponse<OrderResponse>),
        (status = 402, description = "Payment not settled or amount mismatch", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order already paid with a different transaction", body = crate::errors::ErrorResponse),
        (status = 503, description = "Stripe not configured", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn pay_order_stripe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<FinalizeStripeRequest>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .payments
        .finalize_stripe(&user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}
