use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Cloneable handle for publishing domain events onto the process-local queue
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Create a bounded event channel, returning the sender handle and the
/// receiver to hand to [`process_events`]
pub fn event_channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // User events
    UserRegistered(Uuid),

    // Catalog events
    FilmCreated(Uuid),
    FilmUpdated(Uuid),
    FilmDeleted(Uuid),

    // Cart events
    CartItemAdded { cart_id: Uuid, film_id: Uuid },
    CartItemUpdated { cart_id: Uuid, item_id: Uuid },
    CartItemRemoved { cart_id: Uuid, item_id: Uuid },
    CartCleared(Uuid),

    // Order events
    OrderCreated(Uuid),
    OrderPaid {
        order_id: Uuid,
        payment_method: String,
        transaction_id: String,
    },

    // Payment events
    PaymentIntentCreated {
        order_id: Uuid,
        intent_id: String,
    },
    PaymentVerificationFailed {
        order_id: Uuid,
        payment_method: String,
        reason: String,
    },
    PaymentVerified {
        order_id: Uuid,
        amount_minor: i64,
        verified_at: DateTime<Utc>,
    },
}

// Function to process incoming events. Most events only need structured
// logging today; paid orders get a dedicated handler as the hook for
// fulfillment work.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::OrderCreated(order_id) => {
                if let Err(e) = handle_order_created(order_id).await {
                    warn!(
                        order_id = %order_id,
                        error = %e,
                        "Failed to handle order created event"
                    );
                }
            }
            Event::OrderPaid {
                order_id,
                payment_method,
                transaction_id,
            } => {
                if let Err(e) = handle_order_paid(order_id, &payment_method, &transaction_id).await
                {
                    warn!(
                        order_id = %order_id,
                        error = %e,
                        "Failed to handle order paid event"
                    );
                }
            }
            Event::PaymentVerificationFailed {
                order_id,
                payment_method,
                reason,
            } => {
                warn!(
                    order_id = %order_id,
                    payment_method = %payment_method,
                    reason = %reason,
                    "Payment verification failed"
                );
            }
            Event::PaymentVerified {
                order_id,
                amount_minor,
                verified_at,
            } => {
                info!(
                    order_id = %order_id,
                    amount_minor = amount_minor,
                    verified_at = %verified_at,
                    "Payment verified against provider"
                );
            }
            Event::PaymentIntentCreated { order_id, intent_id } => {
                info!(order_id = %order_id, intent_id = %intent_id, "Payment intent created");
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    warn!("Event processing loop has ended");
}

// Handler functions for specific events

async fn handle_order_created(order_id: Uuid) -> Result<(), String> {
    info!("Processing order created event for order {}", order_id);
    Ok(())
}

async fn handle_order_paid(
    order_id: Uuid,
    payment_method: &str,
    transaction_id: &str,
) -> Result<(), String> {
    // Fulfillment kick-off point: pick/pack notification, receipt email.
    info!(
        "Order {} paid via {} (transaction {})",
        order_id, payment_method, transaction_id
    );
    Ok(())
}
