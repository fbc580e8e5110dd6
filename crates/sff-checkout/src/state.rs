//! Checkout States and Transitions
//!
//! The pure half of the checkout: `CheckoutState::apply` decides every edge.
//! The driver in `machine` performs the network calls and feeds their
//! outcomes back in as events.
//!
//! ```text
//! IDLE ──select──▶ READY ──pay──▶ ORDER_CREATING ──created──▶ AWAITING_APPROVAL
//!                    ▲                  │                            │ approved
//!                    │ retry            ▼ failed                     ▼
//!                  FAILED ◀──────────────────────── failed ──── CAPTURING
//!                                                                    │ captured
//!   (any) ──receipt restored──────────────────────────────────▶ PAID ◀┘
//! ```

use std::fmt;

use serde::Serialize;
use sff_core::{OrderId, Quote};

use crate::error::{CheckoutError, Result};
use crate::receipt::Receipt;

const CANCELLED_REASON: &str = "Payment cancelled";

/// State tag, for display and error reporting
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Idle,
    Ready,
    OrderCreating,
    AwaitingApproval,
    Capturing,
    Paid,
    Failed,
}

impl Phase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Ready => "READY",
            Self::OrderCreating => "ORDER_CREATING",
            Self::AwaitingApproval => "AWAITING_APPROVAL",
            Self::Capturing => "CAPTURING",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checkout state with the data each state carries
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CheckoutState {
    /// No selection, or an invalid one
    #[default]
    Idle,

    /// Valid priced selection; the pay button is enabled
    Ready(Quote),

    /// Create-order call in flight
    OrderCreating(Quote),

    /// Buyer is at PayPal. After a redirect return the quote may be unknown.
    AwaitingApproval {
        quote: Option<Quote>,
        order_id: OrderId,
    },

    /// Capture call in flight
    Capturing {
        quote: Option<Quote>,
        order_id: OrderId,
    },

    /// Terminal for the session
    Paid(Receipt),

    /// This attempt failed; the selection is kept for a retry
    Failed {
        quote: Option<Quote>,
        reason: String,
    },
}

/// One event per UI/SDK hook
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutEvent {
    /// Selection changed; `None` when it no longer prices
    SelectionChanged(Option<Quote>),
    PayRequested,
    OrderCreated(OrderId),
    OrderFailed(String),
    Approved(OrderId),
    ReceiptRestored(Receipt),
    Captured(Receipt),
    CaptureFailed(String),
    Cancelled,
    Errored(String),
    Retry,
}

impl CheckoutEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SelectionChanged(_) => "SelectionChanged",
            Self::PayRequested => "PayRequested",
            Self::OrderCreated(_) => "OrderCreated",
            Self::OrderFailed(_) => "OrderFailed",
            Self::Approved(_) => "Approved",
            Self::ReceiptRestored(_) => "ReceiptRestored",
            Self::Captured(_) => "Captured",
            Self::CaptureFailed(_) => "CaptureFailed",
            Self::Cancelled => "Cancelled",
            Self::Errored(_) => "Errored",
            Self::Retry => "Retry",
        }
    }
}

impl CheckoutState {
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::Ready(_) => Phase::Ready,
            Self::OrderCreating(_) => Phase::OrderCreating,
            Self::AwaitingApproval { .. } => Phase::AwaitingApproval,
            Self::Capturing { .. } => Phase::Capturing,
            Self::Paid(_) => Phase::Paid,
            Self::Failed { .. } => Phase::Failed,
        }
    }

    /// The priced selection this state carries, if any
    pub const fn quote(&self) -> Option<&Quote> {
        match self {
            Self::Ready(quote) | Self::OrderCreating(quote) => Some(quote),
            Self::AwaitingApproval { quote, .. }
            | Self::Capturing { quote, .. }
            | Self::Failed { quote, .. } => quote.as_ref(),
            Self::Idle | Self::Paid(_) => None,
        }
    }

    pub const fn receipt(&self) -> Option<&Receipt> {
        match self {
            Self::Paid(receipt) => Some(receipt),
            _ => None,
        }
    }

    pub const fn is_paid(&self) -> bool {
        matches!(self, Self::Paid(_))
    }

    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::OrderCreating(_) | Self::Capturing { .. })
    }

    /// Whether the pay button should be enabled
    pub const fn can_pay(&self) -> bool {
        match self {
            Self::Ready(_) => true,
            Self::AwaitingApproval { quote, .. } | Self::Failed { quote, .. } => quote.is_some(),
            _ => false,
        }
    }

    /// The intake form is enabled only once paid
    pub const fn intake_enabled(&self) -> bool {
        self.is_paid()
    }

    /// Apply an event, returning the next state or why the edge is illegal
    pub fn apply(self, event: CheckoutEvent) -> Result<Self> {
        use CheckoutEvent as E;

        let from = self.phase();
        let invalid = |event: &CheckoutEvent| CheckoutError::InvalidTransition {
            from,
            event: event.name(),
        };

        match (self, event) {
            // Paid is monotonic; restoring the same state again is a no-op
            (Self::Paid(receipt), E::ReceiptRestored(_)) => Ok(Self::Paid(receipt)),
            (Self::Paid(_), _) => Err(CheckoutError::AlreadyPaid),

            (_, E::ReceiptRestored(receipt) | E::Captured(receipt)) if !receipt.is_valid() => {
                Err(CheckoutError::MissingCaptureId)
            }
            (_, E::ReceiptRestored(receipt)) => Ok(Self::Paid(receipt)),

            (Self::OrderCreating(_), E::SelectionChanged(_) | E::PayRequested | E::Approved(_)) => {
                Err(CheckoutError::RequestInFlight)
            }
            (Self::Capturing { .. }, E::SelectionChanged(_) | E::PayRequested | E::Approved(_)) => {
                Err(CheckoutError::CaptureInProgress)
            }
            (state, E::Cancelled | E::Errored(_)) if state.is_in_flight() => {
                Err(if matches!(state, Self::Capturing { .. }) {
                    CheckoutError::CaptureInProgress
                } else {
                    CheckoutError::RequestInFlight
                })
            }

            (_, E::SelectionChanged(quote)) => Ok(quote.map_or(Self::Idle, Self::Ready)),

            (state, E::PayRequested) => match state {
                Self::Ready(quote) => Ok(Self::OrderCreating(quote)),
                Self::AwaitingApproval {
                    quote: Some(quote), ..
                }
                | Self::Failed {
                    quote: Some(quote), ..
                } => Ok(Self::OrderCreating(quote)),
                _ => Err(CheckoutError::NotReady),
            },

            (Self::OrderCreating(quote), E::OrderCreated(order_id)) => Ok(Self::AwaitingApproval {
                quote: Some(quote),
                order_id,
            }),
            (Self::OrderCreating(quote), E::OrderFailed(reason)) => Ok(Self::Failed {
                quote: Some(quote),
                reason,
            }),

            // An approval must name the order awaiting it; a redirect return
            // arrives with no order on record
            (
                Self::AwaitingApproval {
                    quote,
                    order_id: expected,
                },
                E::Approved(order_id),
            ) => {
                if order_id == expected {
                    Ok(Self::Capturing { quote, order_id })
                } else {
                    Err(CheckoutError::OrderMismatch {
                        expected,
                        received: order_id,
                    })
                }
            }
            (state @ (Self::Idle | Self::Failed { .. }), E::Approved(order_id)) => {
                Ok(Self::Capturing {
                    quote: state.quote().cloned(),
                    order_id,
                })
            }

            (Self::Capturing { order_id, .. }, E::Captured(receipt)) => {
                if receipt.is_for(&order_id) {
                    Ok(Self::Paid(receipt))
                } else {
                    Err(invalid(&E::Captured(receipt)))
                }
            }
            (Self::Capturing { quote, .. }, E::CaptureFailed(reason)) => {
                Ok(Self::Failed { quote, reason })
            }

            (state, E::Cancelled) => Ok(Self::Failed {
                quote: state.quote().cloned(),
                reason: CANCELLED_REASON.into(),
            }),
            (state, E::Errored(reason)) => Ok(Self::Failed {
                quote: state.quote().cloned(),
                reason,
            }),

            (Self::Failed { quote, .. }, E::Retry) => Ok(quote.map_or(Self::Idle, Self::Ready)),

            (_, event) => Err(invalid(&event)),
        }
    }
}
