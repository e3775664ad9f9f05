use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, instrument, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::providers::{PaymentVerifier, ProviderCharge};

/// Public Stripe API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.stripe.com";

/// Stripe REST client scoped to the PaymentIntents API.
///
/// Requests are form-encoded and authenticated with the secret key as the
/// basic-auth username, matching Stripe's own curl examples.
pub struct StripeClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

/// The slice of a Stripe PaymentIntent this storefront consumes
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Opaque secret handed to the browser SDK; the only intent field the
    /// API ever returns to clients
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub created: Option<i64>,
    pub receipt_email: Option<String>,
}

impl StripeClient {
    pub fn new(
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("Failed to build Stripe HTTP client: {}", e))
            })?;

        let base_url = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    /// Create a PaymentIntent for the given amount, tagged with the order
    /// and user ids so the charge can be traced back from the dashboard
    #[instrument(skip(self), fields(order_id = %order_id, amount_minor = amount_minor))]
    pub async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        order_id: Uuid,
        user_id: Uuid,
    ) -> Result<PaymentIntent, ServiceError> {
        let url = format!("{}/v1/payment_intents", self.base_url);
        let params = [
            ("amount", amount_minor.to_string()),
            ("currency", currency.to_ascii_lowercase()),
            ("metadata[orderId]", order_id.to_string()),
            ("metadata[userId]", user_id.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Stripe payment intent creation failed");
                ServiceError::ExternalServiceError(format!(
                    "Stripe payment intent creation failed: {}",
                    e
                ))
            })?;

        Self::decode_intent(response, "create").await
    }

    /// Retrieve an existing PaymentIntent by id
    #[instrument(skip(self), fields(intent_id = %intent_id))]
    pub async fn retrieve_payment_intent(
        &self,
        intent_id: &str,
    ) -> Result<PaymentIntent, ServiceError> {
        let url = format!("{}/v1/payment_intents/{}", self.base_url, intent_id);

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Stripe payment intent lookup failed");
                ServiceError::ExternalServiceError(format!(
                    "Stripe payment intent lookup failed: {}",
                    e
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            warn!(intent_id = %intent_id, "Stripe payment intent not found");
            return Err(ServiceError::PaymentFailed(format!(
                "Stripe payment intent {} was not found",
                intent_id
            )));
        }

        Self::decode_intent(response, "retrieve").await
    }

    async fn decode_intent(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<PaymentIntent, ServiceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .map(|e| e.error.message)
                .unwrap_or_else(|| format!("status {}", status));
            error!(status = %status, operation = %operation, body = %body, "Stripe API returned an error");
            return Err(ServiceError::ExternalServiceError(format!(
                "Stripe {} request failed: {}",
                operation, detail
            )));
        }

        response.json::<PaymentIntent>().await.map_err(|e| {
            error!(error = %e, operation = %operation, "Failed to decode Stripe response");
            ServiceError::ExternalServiceError(format!("Failed to decode Stripe response: {}", e))
        })
    }
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PaymentVerifier for StripeClient {
    async fn lookup_charge(&self, provider_ref: &str) -> Result<ProviderCharge, ServiceError> {
        let intent = self.retrieve_payment_intent(provider_ref).await?;
        Ok(intent.into())
    }
}

impl From<PaymentIntent> for ProviderCharge {
    fn from(intent: PaymentIntent) -> Self {
        ProviderCharge {
            settled: intent.status == "succeeded",
            transaction_id: intent.id,
            status: intent.status,
            amount_minor: intent.amount,
            currency: intent.currency.to_ascii_uppercase(),
            payer_email: intent.receipt_email,
            // Intents carry no update timestamp; synthesize one from the
            // creation epoch for the receipt
            update_time: synthesized_update_time(intent.created),
        }
    }
}

fn synthesized_update_time(created: Option<i64>) -> Option<String> {
    created
        .and_then(|epoch| DateTime::<Utc>::from_timestamp(epoch, 0))
        .map(|dt| dt.to_rfc3339())
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}
