//! ShortFormFactory Checkout
//!
//! Client-side checkout flow: price a selection, create and capture the
//! gateway order through the storefront server, persist the receipt and
//! unlock the intake form once paid.
//!
//! ```text
//! select ─▶ pay ─▶ (buyer approves at PayPal) ─▶ on_approve ─▶ PAID
//!                                                   ▲
//!            page reload / redirect return ─────────┘ (stored receipt, no capture)
//! ```

pub mod backend;
pub mod error;
pub mod loader;
pub mod machine;
pub mod receipt;
pub mod state;

pub use backend::{CheckoutBackend, HttpBackend};
pub use error::{CheckoutError, Result};
pub use loader::{GatewayHandle, GatewayLoader};
pub use machine::{CheckoutMachine, ReturnOutcome};
pub use receipt::{FileReceiptStore, MemoryReceiptStore, RECEIPT_KEY, Receipt, ReceiptStore};
pub use state::{CheckoutEvent, CheckoutState, Phase};
