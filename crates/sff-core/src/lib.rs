//! # sff-core
//!
//! Service catalog, server-side order pricing and the shared wire types of the
//! ShortFormFactory checkout.
//!
//! ```text
//! Selection {service, package, addons}
//!        │
//!        ▼
//! Catalog::price_order ──▶ Quote { total } ──▶ amount() = "85.00"
//! ```
//!
//! The total is always recomputed here from the catalog; whatever amount the
//! client displayed is ignored.

pub mod catalog;
pub mod error;
pub mod pricing;
pub mod wire;

pub use catalog::{Catalog, PackageTier, TierPrices};
pub use error::{CatalogError, PricingError, Result};
pub use pricing::{format_amount, Quote, BRAND_NAME};
pub use wire::{OrderId, OrderIdError};
