use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FrameVault API",
        version = "1.0.0",
        description = r#"
# FrameVault Storefront API

Backend for a film storefront: account registration and login, a browsable
film catalog, a per-account shopping cart, and a checkout flow that finalizes
orders only after the payment provider confirms a settled charge for exactly
the order's total.

## Authentication

Account-scoped endpoints require a JWT issued by `/api/v1/auth/login`.
Include it in the Authorization header:

```
Authorization: Bearer <your-jwt-token>
```

## Payments

Two providers are supported: PayPal (checkout-order capture) and Stripe
(PaymentIntents). Client-reported payment results are never trusted; the
server re-fetches the charge from the provider before marking an order paid.

## Error Handling

Errors use a consistent envelope with appropriate HTTP status codes:

```json
{
  "success": false,
  "error": "Bad Request",
  "message": "Validation failed",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Auth", description = "Account registration and login"),
        (name = "Films", description = "Film catalog endpoints"),
        (name = "Cart", description = "Shopping cart endpoints"),
        (name = "Orders", description = "Order management endpoints"),
        (name = "Payments", description = "Payment initiation and finalization")
    ),
    paths(
        // Auth
        crate::handlers::auth::register,
        crate::handlers::auth::login,

        // Films
        crate::handlers::films::list_films,
        crate::handlers::films::get_film,
        crate::handlers::films::create_film,
        crate::handlers::films::update_film,
        crate::handlers::films::delete_film,

        // Cart
        crate::handlers::carts::get_cart,
        crate::handlers::carts::add_item,
        crate::handlers::carts::update_item,
        crate::handlers::carts::remove_item,
        crate::handlers::carts::clear_cart,

        // Orders and payments
        crate::handlers::orders::create_order,
        crate::handlers::orders::my_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::paypal_client_id,
        crate::handlers::orders::stripe_publishable_key,
        crate::handlers::orders::create_payment_intent,
        crate::handlers::orders::pay_order_paypal,
        crate::handlers::orders::pay_order_stripe,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::ResponseMeta,

            // Auth types
            crate::services::users::RegisterRequest,
            crate::services::users::LoginRequest,
            crate::services::users::UserProfile,
            crate::services::users::AuthResponse,

            // Film types
            crate::services::films::CreateFilmRequest,
            crate::services::films::UpdateFilmRequest,
            crate::services::films::FilmResponse,
            crate::services::films::FilmListResponse,
            crate::services::films::PaginationMeta,

            // Cart types
            crate::services::carts::AddCartItemRequest,
            crate::services::carts::UpdateCartItemRequest,
            crate::services::carts::CartItemResponse,
            crate::services::carts::CartResponse,

            // Order types
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::OrderItemInput,
            crate::services::orders::ShippingAddressInput,
            crate::services::orders::OrderItemResponse,
            crate::services::orders::PaymentReceiptResponse,
            crate::services::orders::OrderResponse,

            // Payment types
            crate::services::payments::CreatePaymentIntentRequest,
            crate::services::payments::PaymentIntentResponse,
            crate::services::payments::FinalizePaypalRequest,
            crate::services::payments::FinalizeStripeRequest,
            crate::services::payments::PaypalClientIdResponse,
            crate::services::payments::StripePublishableKeyResponse,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
