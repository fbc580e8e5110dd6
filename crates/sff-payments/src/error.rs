//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Required configuration keys are absent
    #[error("Missing configuration: {}", .0.join(", "))]
    MissingConfig(Vec<String>),

    /// Configuration present but unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Client-credentials token exchange failed
    #[error("PayPal authentication failed: {0}")]
    AuthFailed(String),

    /// Order creation rejected or unreachable
    #[error("PayPal order creation failed: {0}")]
    OrderCreateFailed(String),

    /// Capture call rejected or unreachable
    #[error("PayPal capture failed: {0}")]
    CaptureFailed(String),

    /// Capture answered with a status other than COMPLETED
    #[error("PayPal capture not completed (status {status:?})")]
    CaptureIncomplete {
        status: String,
        details: serde_json::Value,
    },

    /// A PayPal transmission header is missing from a webhook request
    #[error("Missing webhook header: {0}")]
    MissingTransmissionHeader(&'static str),

    /// Webhook body is not a JSON document
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),
}

impl PaymentError {
    /// Stable machine-readable code
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingConfig(_) => "MISSING_ENV",
            Self::Config(_) => "CONFIG_ERROR",
            Self::AuthFailed(_) => "AUTH_FAILED",
            Self::OrderCreateFailed(_) => "ORDER_CREATE_FAILED",
            Self::CaptureFailed(_) => "CAPTURE_FAILED",
            Self::CaptureIncomplete { .. } => "CAPTURE_INCOMPLETE",
            Self::MissingTransmissionHeader(_) | Self::WebhookParse(_) => "WEBHOOK_INVALID",
        }
    }

    /// Get user-friendly message. Never includes gateway bodies or credentials.
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::MissingConfig(_) | Self::Config(_) => "Payment service configuration error.",
            Self::AuthFailed(_) => "PayPal authentication failed.",
            Self::OrderCreateFailed(_) => "Failed to create PayPal order.",
            Self::CaptureFailed(_) => "Payment capture failed. Please try again.",
            Self::CaptureIncomplete { .. } => "Payment was not completed.",
            Self::MissingTransmissionHeader(_) | Self::WebhookParse(_) => {
                "Webhook verification failed."
            }
        }
    }
}
