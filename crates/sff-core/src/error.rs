//! Error Types for Pricing and Catalog Loading

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PricingError>;

/// Rejections produced while pricing an order selection.
///
/// All of these are client-correctable and map to a 400 response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("Invalid service selected: {0:?}")]
    InvalidService(String),

    #[error("Invalid package selected: {0:?}")]
    InvalidPackage(String),

    #[error("Invalid addon: {0:?}")]
    InvalidAddon(String),

    #[error("Invalid order total")]
    InvalidTotal,
}

impl PricingError {
    /// Stable machine-readable code for HTTP error bodies
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidService(_) => "INVALID_SERVICE",
            Self::InvalidPackage(_) => "INVALID_PACKAGE",
            Self::InvalidAddon(_) => "INVALID_ADDON",
            Self::InvalidTotal => "INVALID_TOTAL",
        }
    }
}

/// Problems with externally supplied catalog data
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Catalog defines no services")]
    Empty,

    #[error("Non-positive price for {service} ({tier})")]
    NonPositivePrice { service: String, tier: String },

    #[error("Non-positive surcharge for addon {0}")]
    NonPositiveSurcharge(String),

    #[error("Catalog file error: {0}")]
    Io(#[from] std::io::Error),
}
