use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use framevault_api::{
    auth::AuthService,
    config::AppConfig,
    db,
    events::{self, event_channel},
    handlers::AppServices,
    providers::PaymentProviders,
    services::films::CreateFilmRequest,
    AppState,
};

const TEST_JWT_SECRET: &str =
    "framevault_test_secret_key_that_is_definitely_longer_than_sixty_four_characters_0123";

pub const TEST_PAYPAL_CLIENT_ID: &str = "test-paypal-client-id";
pub const TEST_STRIPE_PUBLISHABLE_KEY: &str = "pk_test_framevault";

/// Spins up the full application router backed by a throwaway SQLite file.
///
/// Payment providers default to unconfigured; point them at wiremock servers
/// with [`TestApp::with_providers`].
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: tempfile::TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_providers(None, None).await
    }

    /// Construct a test application whose provider clients are pointed at
    /// the given base URLs (typically wiremock servers).
    pub async fn with_providers(
        paypal_base_url: Option<String>,
        stripe_base_url: Option<String>,
    ) -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("framevault_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        if let Some(base) = paypal_base_url {
            cfg.paypal_client_id = Some(TEST_PAYPAL_CLIENT_ID.to_string());
            cfg.paypal_client_secret = Some("test-paypal-secret".to_string());
            cfg.paypal_base_url = Some(base);
        }
        if let Some(base) = stripe_base_url {
            cfg.stripe_secret_key = Some("sk_test_framevault".to_string());
            cfg.stripe_publishable_key = Some(TEST_STRIPE_PUBLISHABLE_KEY.to_string());
            cfg.stripe_base_url = Some(base);
        }

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let (event_sender, event_rx) = event_channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let providers = PaymentProviders::from_config(&cfg);
        let auth_service = Arc::new(AuthService::new(&cfg));

        let services = AppServices::new(
            db_arc.clone(),
            auth_service.clone(),
            Some(Arc::new(event_sender.clone())),
            providers,
            &cfg,
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            auth_service,
            event_sender,
            services,
        };

        let router = framevault_api::app_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Register an account and return its bearer token.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/v1/auth/register",
                Some(json!({
                    "name": name,
                    "email": email,
                    "password": password,
                })),
                None,
            )
            .await;

        let (status, body) = read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["data"]["token"]
            .as_str()
            .expect("registration response carries a token")
            .to_string()
    }

    /// Insert a catalog film directly through the service layer.
    pub async fn seed_film(&self, title: &str, price: Decimal, stock: i32) -> Uuid {
        let film = self
            .state
            .services
            .films
            .create_film(CreateFilmRequest {
                title: title.to_string(),
                director: Some("Test Director".to_string()),
                release_year: Some(1960),
                price,
                stock,
                description: None,
                country: None,
                runtime_minutes: None,
                genres: vec!["Drama".to_string()],
                image_url: None,
                criterion_number: None,
                awards: vec![],
                cast: vec![],
                format: None,
                language: None,
                featured: false,
            })
            .await
            .expect("seed film for tests");
        film.id
    }

    /// Create an unpaid order through the API, returning its id.
    pub async fn create_order(
        &self,
        token: &str,
        payment_method: &str,
        total_price: &str,
    ) -> Uuid {
        let response = self
            .request(
                Method::POST,
                "/api/v1/orders",
                Some(order_payload(payment_method, total_price)),
                Some(token),
            )
            .await;

        let (status, body) = read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "order creation failed: {body}");
        body["data"]["id"]
            .as_str()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .expect("order response carries an id")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// A single-line-item order payload whose totals add up to `total_price`.
/// The item price equals the total minus 3.99 tax and 5.00 shipping.
pub fn order_payload(payment_method: &str, total_price: &str) -> Value {
    let total: Decimal = total_price.parse().expect("valid total price");
    let tax = Decimal::new(399, 2);
    let shipping = Decimal::new(500, 2);
    let items = total - tax - shipping;

    json!({
        "items": [
            {
                "name": "Seven Samurai",
                "quantity": 1,
                "unit_price": items,
                "film_id": null
            }
        ],
        "shipping_address": {
            "address": "12 Canal Street",
            "city": "Amsterdam",
            "postal_code": "1011",
            "country": "NL"
        },
        "payment_method": payment_method,
        "items_price": items,
        "tax_price": tax,
        "shipping_price": shipping,
        "total_price": total
    })
}

/// Drain a response into its status and JSON body.
pub async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is JSON")
    };
    (status, body)
}
