// Storefront services
pub mod carts;
pub mod films;
pub mod users;

// Checkout and reconciliation services
pub mod orders;
pub mod payments;

pub use carts::CartService;
pub use films::FilmService;
pub use orders::OrderService;
pub use payments::PaymentService;
pub use users::UserService;
