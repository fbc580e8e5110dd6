//! Payment Gateway
//!
//! Abstraction over the PayPal REST API so handlers can be exercised against
//! test doubles. Every operation is a single attempt: nothing here retries.

mod paypal;

pub use paypal::PayPalClient;

use std::fmt;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sff_core::{OrderId, Quote};

use crate::config::PayPalConfig;
use crate::error::Result;
use crate::webhook::TransmissionHeaders;

/// Short-lived OAuth2 bearer token. Scoped to one logical operation.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Parameters for a single-purchase-unit CAPTURE order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteOrderRequest {
    /// Two-digit decimal string
    pub amount: String,
    pub currency: String,
    pub description: String,
    pub return_url: String,
    pub cancel_url: String,
}

impl RemoteOrderRequest {
    /// Build the gateway request for a server-priced quote
    pub fn for_quote(quote: &Quote, config: &PayPalConfig) -> Self {
        Self {
            amount: quote.amount(),
            currency: config.currency.clone(),
            description: quote.description(),
            return_url: config.return_url(),
            cancel_url: config.cancel_url(),
        }
    }
}

/// Fields extracted from a COMPLETED capture. Absent sub-fields are empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureResult {
    pub order_id: String,
    pub status: String,
    pub capture_id: String,
    pub amount: String,
    pub currency: String,
    pub payer_email: String,
}

/// Payment gateway trait (Strategy pattern)
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Exchange client credentials for a bearer token
    async fn get_access_token(&self) -> Result<AccessToken>;

    /// Create an order and return the gateway-issued id
    async fn create_remote_order(&self, order: &RemoteOrderRequest) -> Result<OrderId>;

    /// Capture an approved order; only COMPLETED is success
    async fn capture_remote_order(&self, order_id: &OrderId) -> Result<CaptureResult>;

    /// Ask the gateway whether a webhook delivery is authentic.
    ///
    /// `Ok(false)` for anything but an explicit SUCCESS, including a failed
    /// verification call. `Err` only when no token could be obtained.
    async fn verify_webhook_signature(
        &self,
        headers: &TransmissionHeaders,
        body: &str,
        webhook_id: &str,
    ) -> Result<bool>;
}
