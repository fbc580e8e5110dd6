//! Order Pricing Service
//!
//! Recomputes the authoritative order total from a client selection.
//! A client-supplied amount is never consulted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, PackageTier};
use crate::error::{PricingError, Result};

/// Brand name shown on the gateway's approval page
pub const BRAND_NAME: &str = "ShortFormFactory";

/// A validated, priced selection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub service: String,
    pub package: PackageTier,
    /// Addon ids, deduplicated, in first-seen order
    pub addons: Vec<String>,
    pub total: Decimal,
}

impl Quote {
    /// Total as a string with exactly two fraction digits ("85.00")
    pub fn amount(&self) -> String {
        format_amount(self.total)
    }

    /// Purchase-unit description sent to the gateway
    pub fn description(&self) -> String {
        format!("{BRAND_NAME} - {} ({})", self.service, self.package)
    }
}

/// Format a decimal with exactly two fraction digits
pub fn format_amount(value: Decimal) -> String {
    let mut value = value;
    value.rescale(2);
    value.to_string()
}

impl Catalog {
    /// Validate a selection and compute its total.
    ///
    /// Validation order is service, package, then addons; the first unknown
    /// addon fails the whole request.
    pub fn price_order<S: AsRef<str>>(
        &self,
        service: &str,
        package: &str,
        addons: &[S],
    ) -> Result<Quote> {
        if !self.has_service(service) {
            return Err(PricingError::InvalidService(service.to_string()));
        }

        let tier: PackageTier = package.parse()?;

        let mut total = self
            .base_price(service, tier)
            .ok_or_else(|| PricingError::InvalidService(service.to_string()))?;

        let mut selected: Vec<String> = Vec::with_capacity(addons.len());
        for addon in addons {
            let addon = addon.as_ref();
            let surcharge = self
                .surcharge(addon)
                .ok_or_else(|| PricingError::InvalidAddon(addon.to_string()))?;

            if selected.iter().any(|a| a == addon) {
                continue;
            }
            selected.push(addon.to_string());
            total += surcharge;
        }

        // Catalog data is external configuration, so check even though
        // validated catalogs cannot produce this.
        if total <= Decimal::ZERO {
            return Err(PricingError::InvalidTotal);
        }

        tracing::debug!(
            service,
            package = %tier,
            addons = selected.len(),
            total = %total,
            "Priced order"
        );

        Ok(Quote {
            service: service.to_string(),
            package: tier,
            addons: selected,
            total,
        })
    }
}
