use crate::{
    auth::AuthUser,
    entities::order::PaymentMethod,
    errors::ServiceError,
    events::{Event, EventSender},
    providers::{to_minor_units, ExpectedCharge, PaymentProviders, PaymentVerifier},
    services::orders::{OrderResponse, OrderService},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Request/Response types for the payment service

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePaymentIntentRequest {
    pub order_id: Uuid,
    /// Client-claimed amount; must round to exactly the order's stored total
    pub amount: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentIntentResponse {
    /// Opaque secret for the browser SDK; the only intent field ever exposed
    pub client_secret: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct FinalizePaypalRequest {
    /// PayPal checkout-order id produced by the client SDK capture
    #[validate(length(min = 1, message = "PayPal order id is required"))]
    pub paypal_order_id: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct FinalizeStripeRequest {
    /// Stripe PaymentIntent id the client confirmed
    #[validate(length(min = 1, message = "Payment intent id is required"))]
    pub payment_intent_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaypalClientIdResponse {
    pub client_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StripePublishableKeyResponse {
    pub publishable_key: String,
}

/// Service orchestrating payment initiation and finalization.
///
/// The finalizer is the trust boundary: a client-supplied provider reference
/// is never believed until the provider itself confirms a settled charge for
/// exactly the order's total. Provider clients are injected as typed slots;
/// an unconfigured provider degrades every endpoint that needs it to a
/// configuration error.
#[derive(Clone)]
pub struct PaymentService {
    orders: Arc<OrderService>,
    providers: PaymentProviders,
    stripe_publishable_key: Option<String>,
    currency: String,
    event_sender: Option<Arc<EventSender>>,
}

impl PaymentService {
    pub fn new(
        orders: Arc<OrderService>,
        providers: PaymentProviders,
        stripe_publishable_key: Option<String>,
        currency: String,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            orders,
            providers,
            stripe_publishable_key,
            currency,
            event_sender,
        }
    }

    /// Public PayPal client identifier for the browser SDK. Side-effect-free;
    /// the secret never leaves the server.
    pub fn paypal_client_id(&self) -> Result<PaypalClientIdResponse, ServiceError> {
        let client = self.providers.paypal.get()?;
        Ok(PaypalClientIdResponse {
            client_id: client.client_id().to_string(),
        })
    }

    /// Public Stripe key for the browser SDK
    pub fn stripe_publishable_key(&self) -> Result<StripePublishableKeyResponse, ServiceError> {
        // Checkout cannot function without the publishable key, so its
        // absence is the same configuration error as a missing secret key.
        let _ = self.providers.stripe.get()?;
        let publishable_key = self
            .stripe_publishable_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ServiceError::ServiceUnavailable(
                    "Stripe publishable key is not configured; set APP__STRIPE_PUBLISHABLE_KEY"
                        .to_string(),
                )
            })?;

        Ok(StripePublishableKeyResponse {
            publishable_key: publishable_key.to_string(),
        })
    }

    /// Creates a Stripe PaymentIntent scoped to the order's total.
    ///
    /// The client-claimed amount and the stored total are both converted to
    /// minor units and must match exactly; a one-cent difference is a
    /// validation error.
    #[instrument(skip(self, user, request), fields(order_id = %request.order_id))]
    pub async fn create_stripe_intent(
        &self,
        user: &AuthUser,
        request: CreatePaymentIntentRequest,
    ) -> Result<PaymentIntentResponse, ServiceError> {
        let order = self
            .orders
            .find_owned_order(user.user_id, request.order_id)
            .await?;

        if order.is_paid {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} is already paid",
                order.id
            )));
        }

        let expected_minor = to_minor_units(order.total_price)?;
        let claimed_minor = to_minor_units(request.amount)?;
        if claimed_minor != expected_minor {
            return Err(ServiceError::ValidationError(format!(
                "Payment amount {} does not match order total {}",
                request.amount, order.total_price
            )));
        }

        let client = self.providers.stripe.get()?;
        let intent = client
            .create_payment_intent(expected_minor, &self.currency, order.id, user.user_id)
            .await?;

        let client_secret = intent.client_secret.clone().ok_or_else(|| {
            ServiceError::ExternalServiceError(format!(
                "Stripe intent {} carried no client secret",
                intent.id
            ))
        })?;

        info!(order_id = %order.id, intent_id = %intent.id, "Stripe payment intent created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::PaymentIntentCreated {
                    order_id: order.id,
                    intent_id: intent.id.clone(),
                })
                .await
            {
                warn!(error = %e, order_id = %order.id, "Failed to send intent created event");
            }
        }

        Ok(PaymentIntentResponse { client_secret })
    }

    /// Finalizes a PayPal payment: re-fetches the provider order and requires
    /// a COMPLETED capture of exactly the order's total in the settlement
    /// currency before marking the order paid.
    #[instrument(skip(self, user, request), fields(order_id = %order_id))]
    pub async fn finalize_paypal(
        &self,
        user: &AuthUser,
        order_id: Uuid,
        request: FinalizePaypalRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        self.finalize(
            user,
            order_id,
            PaymentMethod::PayPal,
            &request.paypal_order_id,
            None,
        )
        .await
    }

    /// Finalizes a Stripe payment: retrieves the PaymentIntent and requires
    /// status "succeeded" with an amount equal to the order's total. The
    /// receipt email falls back to the authenticated account's email when
    /// Stripe reports none.
    #[instrument(skip(self, user, request), fields(order_id = %order_id))]
    pub async fn finalize_stripe(
        &self,
        user: &AuthUser,
        order_id: Uuid,
        request: FinalizeStripeRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        self.finalize(
            user,
            order_id,
            PaymentMethod::Stripe,
            &request.payment_intent_id,
            user.email.clone(),
        )
        .await
    }

    /// Shared finalization path for both providers.
    ///
    /// Repeating a finalize with the proof already recorded on a paid order
    /// is a stable success; a different proof against a paid order is a
    /// conflict. Otherwise the provider is consulted and the settlement
    /// checks run before the paid-state transition.
    async fn finalize(
        &self,
        user: &AuthUser,
        order_id: Uuid,
        method: PaymentMethod,
        provider_ref: &str,
        fallback_email: Option<String>,
    ) -> Result<OrderResponse, ServiceError> {
        let order = self.orders.find_owned_order(user.user_id, order_id).await?;

        if order.is_paid {
            if order.payment_transaction_id.as_deref() == Some(provider_ref) {
                info!(order_id = %order.id, "Repeat finalization of a settled payment");
                let items = self.orders.load_items(order.id).await?;
                return Ok(OrderResponse::from_parts(order, items));
            }
            return Err(ServiceError::Conflict(format!(
                "Order {} is already paid with a different transaction",
                order.id
            )));
        }

        let expected = ExpectedCharge {
            amount_minor: to_minor_units(order.total_price)?,
            currency: self.currency.clone(),
        };

        let mut verified = match self.verifier_for(method) {
            Ok(verifier) => match verifier.verify_payment(provider_ref, &expected).await {
                Ok(verified) => verified,
                Err(e) => {
                    self.report_verification_failure(order.id, method, &e).await;
                    return Err(e);
                }
            },
            Err(e) => return Err(e),
        };

        if verified.payer_email.is_none() {
            verified.payer_email = fallback_email;
        }

        let updated = self.orders.mark_paid(&order, method, &verified).await?;
        let items = self.orders.load_items(updated.id).await?;
        Ok(OrderResponse::from_parts(updated, items))
    }

    fn verifier_for(&self, method: PaymentMethod) -> Result<&dyn PaymentVerifier, ServiceError> {
        match method {
            PaymentMethod::PayPal => Ok(self.providers.paypal.get()?),
            PaymentMethod::Stripe => Ok(self.providers.stripe.get()?),
        }
    }

    async fn report_verification_failure(
        &self,
        order_id: Uuid,
        method: PaymentMethod,
        error: &ServiceError,
    ) {
        warn!(
            order_id = %order_id,
            payment_method = %method,
            error = %error,
            "Payment verification failed; order left unpaid"
        );

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::PaymentVerificationFailed {
                    order_id,
                    payment_method: method.to_string(),
                    reason: error.to_string(),
                })
                .await
            {
                warn!(error = %e, order_id = %order_id, "Failed to send verification failure event");
            }
        }
    }
}
