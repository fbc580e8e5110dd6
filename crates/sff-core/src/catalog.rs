//! Service Catalog
//!
//! Static price table: service x package tier -> base price, addon -> surcharge.
//! Uses `rust_decimal` for every amount.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, PricingError};

/// Package tier offered for every service
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageTier {
    Basic,
    Standard,
    Premium,
}

impl PackageTier {
    pub const ALL: [Self; 3] = [Self::Basic, Self::Standard, Self::Premium];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Premium => "premium",
        }
    }
}

impl fmt::Display for PackageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageTier {
    type Err = PricingError;

    /// Exact, case-sensitive match; anything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "standard" => Ok(Self::Standard),
            "premium" => Ok(Self::Premium),
            other => Err(PricingError::InvalidPackage(other.to_string())),
        }
    }
}

/// One base price per tier. Deserialization requires all three tiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierPrices {
    pub basic: Decimal,
    pub standard: Decimal,
    pub premium: Decimal,
}

impl TierPrices {
    pub const fn get(&self, tier: PackageTier) -> Decimal {
        match tier {
            PackageTier::Basic => self.basic,
            PackageTier::Standard => self.standard,
            PackageTier::Premium => self.premium,
        }
    }
}

/// Immutable price catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    services: BTreeMap<String, TierPrices>,
    addons: BTreeMap<String, Decimal>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl Catalog {
    /// The deploy-time ShortFormFactory price list
    pub fn standard() -> Self {
        let services = [
            ("aiReel", dec!(25), dec!(60), dec!(140)),
            ("socialEdit", dec!(30), dec!(70), dec!(160)),
            ("viralCaptions", dec!(20), dec!(50), dec!(110)),
            ("podcastRepurpose", dec!(40), dec!(95), dec!(220)),
            ("autoCaptions", dec!(15), dec!(35), dec!(75)),
            ("smartCut", dec!(20), dec!(50), dec!(120)),
            ("backgroundRemoval", dec!(25), dec!(60), dec!(150)),
            ("audioSync", dec!(15), dec!(40), dec!(95)),
        ]
        .into_iter()
        .map(|(id, basic, standard, premium)| {
            (id.to_string(), TierPrices { basic, standard, premium })
        })
        .collect();

        let addons = [
            ("rush", dec!(25)),
            ("extraClip", dec!(15)),
            ("extraMinute", dec!(10)),
            ("premiumCaptions", dec!(15)),
            ("colorGrade", dec!(20)),
            ("advancedEffects", dec!(25)),
            ("thumbnails", dec!(20)),
            ("musicLicense", dec!(10)),
            ("sourceFiles", dec!(15)),
        ]
        .into_iter()
        .map(|(id, surcharge)| (id.to_string(), surcharge))
        .collect();

        Self { services, addons }
    }

    /// Parse and validate a catalog supplied as external configuration
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog file (same JSON shape as [`Catalog::from_json`])
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.services.is_empty() {
            return Err(CatalogError::Empty);
        }

        for (service, prices) in &self.services {
            for tier in PackageTier::ALL {
                if prices.get(tier) <= Decimal::ZERO {
                    return Err(CatalogError::NonPositivePrice {
                        service: service.clone(),
                        tier: tier.to_string(),
                    });
                }
            }
        }

        if let Some((addon, _)) = self.addons.iter().find(|(_, s)| **s <= Decimal::ZERO) {
            return Err(CatalogError::NonPositiveSurcharge(addon.clone()));
        }

        Ok(())
    }

    /// Base price for a service at a tier
    pub fn base_price(&self, service: &str, tier: PackageTier) -> Option<Decimal> {
        self.services.get(service).map(|p| p.get(tier))
    }

    /// Surcharge for an addon
    pub fn surcharge(&self, addon: &str) -> Option<Decimal> {
        self.addons.get(addon).copied()
    }

    pub fn has_service(&self, service: &str) -> bool {
        self.services.contains_key(service)
    }

    pub fn service_ids(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn addon_ids(&self) -> impl Iterator<Item = &str> {
        self.addons.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_is_valid() {
        let catalog = Catalog::standard();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.service_ids().count(), 8);
        assert_eq!(catalog.addon_ids().count(), 9);
        assert_eq!(
            catalog.base_price("aiReel", PackageTier::Standard),
            Some(dec!(60))
        );
        assert_eq!(catalog.surcharge("rush"), Some(dec!(25)));
    }

    #[test]
    fn test_tier_parsing_is_exact() {
        assert_eq!("premium".parse::<PackageTier>(), Ok(PackageTier::Premium));
        assert!("Premium".parse::<PackageTier>().is_err());
        assert!("gold".parse::<PackageTier>().is_err());
    }

    #[test]
    fn test_from_json_accepts_strings_and_numbers() {
        let catalog = Catalog::from_json(
            r#"{
                "services": {"trailer": {"basic": "10.50", "standard": 20, "premium": 30}},
                "addons": {"rush": 5}
            }"#,
        )
        .unwrap();

        assert_eq!(
            catalog.base_price("trailer", PackageTier::Basic),
            Some(dec!(10.50))
        );
        assert_eq!(catalog.surcharge("rush"), Some(dec!(5)));
    }

    #[test]
    fn test_from_json_requires_every_tier() {
        let err = Catalog::from_json(
            r#"{"services": {"trailer": {"basic": 10, "standard": 20}}, "addons": {}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[test]
    fn test_from_json_rejects_non_positive_amounts() {
        let err = Catalog::from_json(
            r#"{"services": {"trailer": {"basic": 0, "standard": 20, "premium": 30}}, "addons": {}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::NonPositivePrice { .. }));

        let err = Catalog::from_json(
            r#"{"services": {"trailer": {"basic": 1, "standard": 2, "premium": 3}}, "addons": {"free": "-1"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::NonPositiveSurcharge(ref a) if a == "free"));
    }

    #[test]
    fn test_from_json_rejects_empty_catalog() {
        let err = Catalog::from_json(r#"{"services": {}, "addons": {}}"#).unwrap_err();
        assert!(matches!(err, CatalogError::Empty));
    }
}
