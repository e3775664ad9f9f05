pub mod auth;
pub mod carts;
pub mod films;
pub mod orders;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::providers::PaymentProviders;
use crate::services::{CartService, FilmService, OrderService, PaymentService, UserService};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub films: Arc<FilmService>,
    pub carts: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        auth_service: Arc<AuthService>,
        event_sender: Option<Arc<EventSender>>,
        providers: PaymentProviders,
        config: &AppConfig,
    ) -> Self {
        let orders = Arc::new(OrderService::new(db_pool.clone(), event_sender.clone()));
        let payments = Arc::new(PaymentService::new(
            orders.clone(),
            providers,
            config.stripe_publishable_key.clone(),
            config.currency.clone(),
            event_sender.clone(),
        ));

        Self {
            users: Arc::new(UserService::new(
                db_pool.clone(),
                auth_service,
                event_sender.clone(),
            )),
            films: Arc::new(FilmService::new(
                db_pool.clone(),
                event_sender.clone(),
                config,
            )),
            carts: Arc::new(CartService::new(db_pool, event_sender)),
            orders,
            payments,
        }
    }
}
