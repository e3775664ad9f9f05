use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, instrument, warn};

use crate::errors::ServiceError;
use crate::providers::{parse_minor_units, PaymentVerifier, ProviderCharge};

/// Production REST endpoint
pub const LIVE_BASE_URL: &str = "https://api-m.paypal.com";
/// Sandbox REST endpoint, used everywhere except production
pub const SANDBOX_BASE_URL: &str = "https://api-m.sandbox.paypal.com";

/// PayPal REST client scoped to the checkout-orders API.
///
/// Every verification performs two sequential calls: a client-credentials
/// token exchange, then the order lookup. Both must succeed; there is no
/// retry, the caller simply reattempts the finalization from scratch.
pub struct PayPalClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl PayPalClient {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("Failed to build PayPal HTTP client: {}", e))
            })?;

        let base_url = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        })
    }

    /// Public client identifier, safe to expose to browsers
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Exchange the server-held client credentials for a bearer token
    #[instrument(skip(self))]
    async fn access_token(&self) -> Result<String, ServiceError> {
        let url = format!("{}/v1/oauth2/token", self.base_url);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "PayPal token request failed");
                ServiceError::ExternalServiceError(format!("PayPal token request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "PayPal token endpoint returned an error");
            return Err(ServiceError::ExternalServiceError(format!(
                "PayPal token endpoint returned {}",
                status
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to decode PayPal token response");
            ServiceError::ExternalServiceError(format!(
                "Failed to decode PayPal token response: {}",
                e
            ))
        })?;

        Ok(token.access_token)
    }

    /// Fetch a checkout order and normalize it into a [`ProviderCharge`]
    #[instrument(skip(self), fields(provider_order_id = %provider_order_id))]
    pub async fn fetch_order(&self, provider_order_id: &str) -> Result<ProviderCharge, ServiceError> {
        let token = self.access_token().await?;
        let url = format!("{}/v2/checkout/orders/{}", self.base_url, provider_order_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "PayPal order lookup failed");
                ServiceError::ExternalServiceError(format!("PayPal order lookup failed: {}", e))
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!(provider_order_id = %provider_order_id, "PayPal order not found");
            return Err(ServiceError::PaymentFailed(format!(
                "PayPal order {} was not found",
                provider_order_id
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "PayPal order endpoint returned an error");
            return Err(ServiceError::ExternalServiceError(format!(
                "PayPal order endpoint returned {}",
                status
            )));
        }

        let order: OrderResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to decode PayPal order response");
            ServiceError::ExternalServiceError(format!(
                "Failed to decode PayPal order response: {}",
                e
            ))
        })?;

        order.into_charge()
    }
}

impl std::fmt::Debug for PayPalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayPalClient")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PaymentVerifier for PayPalClient {
    async fn lookup_charge(&self, provider_ref: &str) -> Result<ProviderCharge, ServiceError> {
        self.fetch_order(provider_ref).await
    }
}

// Wire types for the slices of the checkout-orders API we consume

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    status: String,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
    payer: Option<Payer>,
    update_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    amount: Option<Amount>,
    payments: Option<PurchaseUnitPayments>,
}

#[derive(Debug, Deserialize)]
struct Amount {
    currency_code: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnitPayments {
    #[serde(default)]
    captures: Vec<Capture>,
}

#[derive(Debug, Deserialize)]
struct Capture {
    amount: Amount,
    update_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Payer {
    email_address: Option<String>,
}

impl OrderResponse {
    /// Normalize to the shared charge shape. The first capture's amount is
    /// authoritative; an order that has not produced a capture yet falls
    /// back to the order-level amount so status errors stay descriptive.
    fn into_charge(self) -> Result<ProviderCharge, ServiceError> {
        let first_unit = self.purchase_units.first();

        let capture = first_unit
            .and_then(|unit| unit.payments.as_ref())
            .and_then(|payments| payments.captures.first());

        let amount = capture
            .map(|c| &c.amount)
            .or_else(|| first_unit.and_then(|unit| unit.amount.as_ref()))
            .ok_or_else(|| {
                ServiceError::ExternalServiceError(format!(
                    "PayPal order {} carried no amount information",
                    self.id
                ))
            })?;

        let amount_minor = parse_minor_units(&amount.value)?;
        let update_time = capture
            .and_then(|c| c.update_time.clone())
            .or(self.update_time);

        Ok(ProviderCharge {
            settled: self.status == "COMPLETED",
            transaction_id: self.id,
            status: self.status,
            amount_minor,
            currency: amount.currency_code.clone(),
            payer_email: self.payer.and_then(|p| p.email_address),
            update_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed_order_json() -> &'static str {
        r#"{
            "id": "5O190127TN364715T",
            "status": "COMPLETED",
            "update_time": "2025-09-12T10:21:00Z",
            "payer": { "email_address": "payer@example.com" },
            "purchase_units": [{
                "amount": { "currency_code": "USD", "value": "43.99" },
                "payments": {
                    "captures": [{
                        "amount": { "currency_code": "USD", "value": "43.99" },
                        "update_time": "2025-09-12T10:22:30Z"
                    }]
                }
            }]
        }"#
    }

    #[test]
    fn completed_order_normalizes_to_settled_charge() {
        let order: OrderResponse = serde_json::from_str(completed_order_json()).unwrap();
        let charge = order.into_charge().unwrap();

        assert!(charge.settled);
        assert_eq!(charge.transaction_id, "5O190127TN364715T");
        assert_eq!(charge.amount_minor, 4399);
        assert_eq!(charge.currency, "USD");
        assert_eq!(charge.payer_email.as_deref(), Some("payer@example.com"));
        // Capture-level timestamp wins over the order-level one
        assert_eq!(charge.update_time.as_deref(), Some("2025-09-12T10:22:30Z"));
    }

    #[test]
    fn uncaptured_order_uses_order_level_amount() {
        let json = r#"{
            "id": "8XJ32101WL9843032",
            "status": "APPROVED",
            "purchase_units": [{
                "amount": { "currency_code": "USD", "value": "12.50" }
            }]
        }"#;

        let order: OrderResponse = serde_json::from_str(json).unwrap();
        let charge = order.into_charge().unwrap();

        assert!(!charge.settled);
        assert_eq!(charge.status, "APPROVED");
        assert_eq!(charge.amount_minor, 1250);
    }

    #[test]
    fn order_without_amount_is_an_external_error() {
        let json = r#"{ "id": "9KX01001", "status": "CREATED", "purchase_units": [] }"#;

        let order: OrderResponse = serde_json::from_str(json).unwrap();
        let err = order.into_charge().unwrap_err();
        assert!(matches!(err, ServiceError::ExternalServiceError(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = PayPalClient::new(
            "https://api-m.sandbox.paypal.com/",
            "client-id",
            "client-secret",
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(client.base_url, "https://api-m.sandbox.paypal.com");
        assert_eq!(client.client_id(), "client-id");
    }
}
