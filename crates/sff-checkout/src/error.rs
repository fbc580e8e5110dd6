//! Checkout Error Types

use sff_core::{OrderId, OrderIdError, PricingError};
use thiserror::Error;

use crate::state::Phase;

/// Result type alias
pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Checkout errors. None of these trigger an automatic retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckoutError {
    /// A capture call is already running
    #[error("Capture already in progress")]
    CaptureInProgress,

    /// An order-creation call is already running
    #[error("A payment request is already in progress")]
    RequestInFlight,

    /// No valid selection to pay for
    #[error("Selection is incomplete or invalid")]
    NotReady,

    /// Payment already captured this session
    #[error("Order already paid")]
    AlreadyPaid,

    /// Event not accepted in the current state
    #[error("Cannot apply {event} while {from}")]
    InvalidTransition { from: Phase, event: &'static str },

    /// Approval names a different order than the one awaiting approval
    #[error("Approval for order {received} while awaiting {expected}")]
    OrderMismatch { expected: OrderId, received: OrderId },

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Invalid order id: {0}")]
    InvalidOrderId(#[from] OrderIdError),

    /// Server could not create the order
    #[error("Create order failed: {0}")]
    OrderCreateFailed(String),

    /// Server or gateway rejected the capture
    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    /// Gateway answered, but not with COMPLETED
    #[error("Capture not completed (status {status:?})")]
    CaptureIncomplete {
        status: String,
        details: serde_json::Value,
    },

    /// COMPLETED capture without a capture id; no receipt can be issued
    #[error("Capture response is missing captureID")]
    MissingCaptureId,

    /// Gateway configuration could not be loaded
    #[error("PayPal unavailable: {0}")]
    GatewayUnavailable(String),

    /// Transport-level failure talking to the storefront API
    #[error("Network error: {0}")]
    Network(String),

    /// Receipt storage failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CheckoutError {
    /// Get user-friendly message
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::CaptureInProgress | Self::RequestInFlight => {
                "Your payment is already being processed. Please wait."
            }
            Self::NotReady | Self::Pricing(_) => "Please choose a service and package first.",
            Self::AlreadyPaid => "This order is already paid.",
            Self::CaptureFailed(_)
            | Self::CaptureIncomplete { .. }
            | Self::MissingCaptureId
            | Self::OrderMismatch { .. }
            | Self::InvalidOrderId(_) => "Payment could not be completed. Please try again.",
            Self::OrderCreateFailed(_) | Self::Network(_) => {
                "Could not reach PayPal. Please try again."
            }
            Self::GatewayUnavailable(_) => "PayPal unavailable. Please refresh and try again.",
            Self::InvalidTransition { .. } | Self::Storage(_) => {
                "An error occurred. Please refresh and try again."
            }
        }
    }
}
