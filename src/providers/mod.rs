/*!
 * # Payment Provider Clients
 *
 * Outbound HTTP clients for the payment providers the storefront settles
 * through (PayPal and Stripe), plus the shared verification contract the
 * order finalizer runs against either of them.
 *
 * Clients are constructed once at startup from configuration and injected
 * where needed. A provider whose credentials are absent is represented by
 * an explicit [`ProviderSlot::Unavailable`] carrying the operator-facing
 * reason; calling through it yields a 503 instead of a crash or a panic.
 *
 * All monetary checks happen in integer minor units (cents). Provider
 * amounts arriving as decimal strings are parsed and converted with
 * half-away-from-zero rounding so both providers are compared identically.
 */

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use crate::config::AppConfig;
use crate::errors::ServiceError;

pub mod paypal;
pub mod stripe;

pub use paypal::PayPalClient;
pub use stripe::StripeClient;

/// Dependency-injection slot for a payment provider client.
///
/// `Unavailable` replaces the nullable-global pattern: endpoints that need
/// the provider get a typed configuration error they can surface as 503.
pub enum ProviderSlot<C> {
    Ready(Arc<C>),
    Unavailable { reason: String },
}

impl<C> ProviderSlot<C> {
    pub fn ready(client: C) -> Self {
        Self::Ready(Arc::new(client))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Access the client, or fail with the configured unavailability reason
    pub fn get(&self) -> Result<&C, ServiceError> {
        match self {
            Self::Ready(client) => Ok(client),
            Self::Unavailable { reason } => Err(ServiceError::ServiceUnavailable(reason.clone())),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

// Manual impl so `C` itself does not need to be Clone
impl<C> Clone for ProviderSlot<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Ready(client) => Self::Ready(Arc::clone(client)),
            Self::Unavailable { reason } => Self::Unavailable {
                reason: reason.clone(),
            },
        }
    }
}

impl<C> std::fmt::Debug for ProviderSlot<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("ProviderSlot::Ready"),
            Self::Unavailable { reason } => f
                .debug_struct("ProviderSlot::Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Both provider slots, built once at startup and injected into the
/// payment service
#[derive(Clone, Debug)]
pub struct PaymentProviders {
    pub paypal: ProviderSlot<PayPalClient>,
    pub stripe: ProviderSlot<StripeClient>,
}

impl PaymentProviders {
    /// Build both provider slots from configuration. Missing credentials
    /// degrade the affected slot instead of failing startup.
    pub fn from_config(config: &AppConfig) -> Self {
        let timeout = Duration::from_secs(config.provider_timeout_secs);

        let paypal_id = trimmed(config.paypal_client_id.as_deref());
        let paypal_secret = trimmed(config.paypal_client_secret.as_deref());
        let paypal = match (paypal_id, paypal_secret) {
            (Some(id), Some(secret)) => {
                let base = config.paypal_base_url.clone().unwrap_or_else(|| {
                    if config.is_production() {
                        paypal::LIVE_BASE_URL.to_string()
                    } else {
                        paypal::SANDBOX_BASE_URL.to_string()
                    }
                });
                match PayPalClient::new(base, id, secret, timeout) {
                    Ok(client) => ProviderSlot::ready(client),
                    Err(e) => {
                        error!(error = %e, "Failed to construct PayPal client");
                        ProviderSlot::unavailable(format!(
                            "PayPal client failed to initialize: {}",
                            e
                        ))
                    }
                }
            }
            _ => ProviderSlot::unavailable(
                "PayPal is not configured; set APP__PAYPAL_CLIENT_ID and APP__PAYPAL_CLIENT_SECRET",
            ),
        };

        let stripe = match trimmed(config.stripe_secret_key.as_deref()) {
            Some(key) => {
                let base = config
                    .stripe_base_url
                    .clone()
                    .unwrap_or_else(|| stripe::DEFAULT_BASE_URL.to_string());
                match StripeClient::new(base, key, timeout) {
                    Ok(client) => ProviderSlot::ready(client),
                    Err(e) => {
                        error!(error = %e, "Failed to construct Stripe client");
                        ProviderSlot::unavailable(format!(
                            "Stripe client failed to initialize: {}",
                            e
                        ))
                    }
                }
            }
            None => {
                ProviderSlot::unavailable("Stripe is not configured; set APP__STRIPE_SECRET_KEY")
            }
        };

        Self { paypal, stripe }
    }
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// What the order record says the charge should look like
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedCharge {
    pub amount_minor: i64,
    pub currency: String,
}

/// Normalized view of a charge as reported by a provider
#[derive(Debug, Clone)]
pub struct ProviderCharge {
    /// Provider-side transaction reference (PayPal order id, Stripe intent id)
    pub transaction_id: String,
    /// Raw provider status string, kept for error messages and receipts
    pub status: String,
    /// Whether the provider considers the funds captured
    pub settled: bool,
    pub amount_minor: i64,
    pub currency: String,
    pub payer_email: Option<String>,
    pub update_time: Option<String>,
}

/// Receipt data recorded on the order once verification passes
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    pub transaction_id: String,
    pub status: String,
    pub update_time: Option<String>,
    pub payer_email: Option<String>,
}

impl ProviderCharge {
    /// Run the settlement checks shared by every provider: the charge must
    /// be settled, in the expected currency, for exactly the expected
    /// amount. Failures are descriptive and safe to surface to the caller.
    pub fn settle_against(self, expected: &ExpectedCharge) -> Result<VerifiedPayment, ServiceError> {
        if !self.settled {
            return Err(ServiceError::PaymentFailed(format!(
                "Payment has not completed (provider status: {})",
                self.status
            )));
        }

        if !self.currency.eq_ignore_ascii_case(&expected.currency) {
            return Err(ServiceError::PaymentFailed(format!(
                "Payment currency mismatch: expected {}, provider reported {}",
                expected.currency, self.currency
            )));
        }

        if self.amount_minor != expected.amount_minor {
            return Err(ServiceError::PaymentFailed(format!(
                "Payment amount mismatch: expected {} minor units, provider captured {}",
                expected.amount_minor, self.amount_minor
            )));
        }

        Ok(VerifiedPayment {
            transaction_id: self.transaction_id,
            status: self.status,
            update_time: self.update_time,
            payer_email: self.payer_email,
        })
    }
}

/// Verification contract shared by every payment method.
///
/// A provider client implements `lookup_charge`; the settlement decision
/// itself is identical across providers and lives in the default
/// `verify_payment`.
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    /// Fetch the provider's view of the charge referenced by `provider_ref`
    async fn lookup_charge(&self, provider_ref: &str) -> Result<ProviderCharge, ServiceError>;

    /// Look the charge up and require it to settle the expected amount
    async fn verify_payment(
        &self,
        provider_ref: &str,
        expected: &ExpectedCharge,
    ) -> Result<VerifiedPayment, ServiceError> {
        let charge = self.lookup_charge(provider_ref).await?;
        charge.settle_against(expected)
    }
}

/// Convert a decimal amount to integer minor units (cents), rounding
/// half-away-from-zero at the cent boundary.
pub fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    let cents = (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    cents.to_i64().ok_or_else(|| {
        ServiceError::InternalError(format!("Amount {} overflows minor-unit range", amount))
    })
}

/// Parse a provider-supplied decimal amount string ("43.99") into minor units
pub fn parse_minor_units(value: &str) -> Result<i64, ServiceError> {
    let amount = Decimal::from_str(value.trim()).map_err(|_| {
        ServiceError::ExternalServiceError(format!(
            "Provider returned an unparseable amount: {:?}",
            value
        ))
    })?;
    to_minor_units(amount)
}
