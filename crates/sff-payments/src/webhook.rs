//! PayPal Webhook Handling
//!
//! Every delivery is verified against the gateway before anything in its
//! body is looked at. Verified events are classified and logged; none of
//! them mutate state.

use std::sync::Arc;

use reqwest::header::HeaderMap;

use crate::error::{PaymentError, Result};
use crate::gateway::PaymentGateway;

/// The five PayPal transmission headers needed for verification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransmissionHeaders {
    pub transmission_id: String,
    pub transmission_time: String,
    pub cert_url: String,
    pub auth_algo: String,
    pub transmission_sig: String,
}

impl TransmissionHeaders {
    pub const TRANSMISSION_ID: &'static str = "paypal-transmission-id";
    pub const TRANSMISSION_TIME: &'static str = "paypal-transmission-time";
    pub const CERT_URL: &'static str = "paypal-cert-url";
    pub const AUTH_ALGO: &'static str = "paypal-auth-algo";
    pub const TRANSMISSION_SIG: &'static str = "paypal-transmission-sig";

    /// Extract from request headers; any absent header is an error
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let get = |name: &'static str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .ok_or(PaymentError::MissingTransmissionHeader(name))
        };

        Ok(Self {
            transmission_id: get(Self::TRANSMISSION_ID)?,
            transmission_time: get(Self::TRANSMISSION_TIME)?,
            cert_url: get(Self::CERT_URL)?,
            auth_algo: get(Self::AUTH_ALGO)?,
            transmission_sig: get(Self::TRANSMISSION_SIG)?,
        })
    }
}

/// Classified webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    /// Order or capture completed
    PaymentCompleted {
        event_type: String,
        resource_id: String,
    },

    /// Capture denied or order declined
    PaymentFailed {
        event_type: String,
        resource_id: String,
    },

    /// Unhandled event type
    Other { event_type: String },
}

impl WebhookEvent {
    /// Classify a verified event body
    pub fn classify(event: &serde_json::Value) -> Self {
        let event_type = event["event_type"].as_str().unwrap_or_default().to_string();
        let resource_id = event["resource"]["id"].as_str().unwrap_or_default().to_string();

        match event_type.as_str() {
            "CHECKOUT.ORDER.COMPLETED" | "PAYMENT.CAPTURE.COMPLETED" => Self::PaymentCompleted {
                event_type,
                resource_id,
            },
            "PAYMENT.CAPTURE.DENIED" | "CHECKOUT.ORDER.DECLINED" => Self::PaymentFailed {
                event_type,
                resource_id,
            },
            _ => Self::Other { event_type },
        }
    }

    pub fn log(&self) {
        match self {
            Self::PaymentCompleted {
                event_type,
                resource_id,
            } => {
                tracing::info!(%event_type, %resource_id, "Payment completed");
            }
            Self::PaymentFailed {
                event_type,
                resource_id,
            } => {
                tracing::warn!(%event_type, %resource_id, "Payment failed");
            }
            Self::Other { event_type } => {
                tracing::info!(%event_type, "Unhandled webhook event");
            }
        }
    }
}

/// Outcome of handling one delivery
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Signature verified, event classified and logged
    Accepted(WebhookEvent),

    /// Verification did not return SUCCESS; the body was discarded
    Rejected,
}

/// Webhook handler
pub struct WebhookHandler {
    gateway: Arc<dyn PaymentGateway>,
    webhook_id: String,
}

impl WebhookHandler {
    pub fn new(gateway: Arc<dyn PaymentGateway>, webhook_id: impl Into<String>) -> Self {
        Self {
            gateway,
            webhook_id: webhook_id.into(),
        }
    }

    /// Verify, then classify. Only auth failures and missing headers are errors.
    pub async fn handle(&self, headers: &HeaderMap, body: &str) -> Result<WebhookOutcome> {
        let transmission = TransmissionHeaders::from_headers(headers)?;

        let verified = self
            .gateway
            .verify_webhook_signature(&transmission, body, &self.webhook_id)
            .await?;

        if !verified {
            tracing::warn!(
                transmission_id = %transmission.transmission_id,
                "Discarding unverified webhook"
            );
            return Ok(WebhookOutcome::Rejected);
        }

        let event: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| PaymentError::WebhookParse(e.to_string()))?;

        let event = WebhookEvent::classify(&event);
        event.log();

        Ok(WebhookOutcome::Accepted(event))
    }
}
