//! # sff-payments
//!
//! PayPal Orders v2 integration for the ShortFormFactory checkout.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐  POST /orders   ┌──────────────┐  create  ┌──────────┐
//! │  Storefront │────────────────▶│  sff-server  │─────────▶│  PayPal  │
//! │  (checkout) │◀── orderID ─────│  (pricing)   │◀─────────│  REST    │
//! └─────────────┘                 └──────────────┘          └──────────┘
//!        │ buyer approves at PayPal (popup or redirect)
//!        ▼
//!   POST /orders/{id}/capture ──▶ capture ──▶ COMPLETED ──▶ receipt
//! ```
//!
//! Amounts are always recomputed server-side by `sff_core::Catalog`; this
//! crate only moves already-priced orders through the gateway.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sff_payments::{PayPalClient, PayPalSettings, PaymentGateway, RemoteOrderRequest};
//!
//! let config = PayPalSettings::from_env()?.resolve()?;
//! let paypal = PayPalClient::new(config)?;
//!
//! let quote = catalog.price_order("aiReel", "standard", &["rush"])?;
//! let order_id = paypal
//!     .create_remote_order(&RemoteOrderRequest::for_quote(&quote, paypal.config()))
//!     .await?;
//! ```

mod config;
mod error;
mod gateway;
mod webhook;

pub use config::{PayPalConfig, PayPalMode, PayPalSettings, DEFAULT_CURRENCY, DEFAULT_SITE_ORIGIN};
pub use error::{PaymentError, Result};
pub use gateway::{AccessToken, CaptureResult, PayPalClient, PaymentGateway, RemoteOrderRequest};
pub use webhook::{TransmissionHeaders, WebhookEvent, WebhookHandler, WebhookOutcome};
