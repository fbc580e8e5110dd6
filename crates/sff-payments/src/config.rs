//! PayPal Configuration
//!
//! Loaded from environment variables. The server starts even when keys are
//! missing; every endpoint that needs them then fails closed with the
//! enumerated list of missing keys.
//!
//! # Environment Variables
//!
//! - `PAYPAL_CLIENT_ID` - REST app client id (required)
//! - `PAYPAL_CLIENT_SECRET` - REST app secret (required, never exposed)
//! - `PAYPAL_ENV` - `sandbox` or `live` (falls back to `PAYPAL_MODE`, default `live`)
//! - `PAYPAL_CURRENCY` - ISO currency code (default `USD`)
//! - `PAYPAL_WEBHOOK_ID` - webhook id used for signature verification
//! - `SITE_ORIGIN` - storefront origin for return/cancel URLs
//! - `PAYPAL_API_BASE` - explicit API base, overrides the mode's base URL

use std::fmt;
use std::str::FromStr;

use secrecy::SecretString;

use crate::error::{PaymentError, Result};

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_SITE_ORIGIN: &str = "https://shortformfactory.com";

const SANDBOX_API_BASE: &str = "https://api-m.sandbox.paypal.com";
const LIVE_API_BASE: &str = "https://api-m.paypal.com";

/// Which PayPal environment to talk to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PayPalMode {
    Sandbox,
    #[default]
    Live,
}

impl PayPalMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Live => "live",
        }
    }

    pub const fn api_base(&self) -> &'static str {
        match self {
            Self::Sandbox => SANDBOX_API_BASE,
            Self::Live => LIVE_API_BASE,
        }
    }
}

impl fmt::Display for PayPalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayPalMode {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "live" => Ok(Self::Live),
            other => Err(PaymentError::Config(format!(
                "PAYPAL_ENV must be 'sandbox' or 'live', got {other:?}"
            ))),
        }
    }
}

/// Raw settings as found in the environment, possibly incomplete
#[derive(Clone, Debug, Default)]
pub struct PayPalSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub mode: PayPalMode,
    pub currency: String,
    pub webhook_id: Option<String>,
    pub site_origin: String,
    pub api_base: Option<String>,
}

impl PayPalSettings {
    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Create from an arbitrary variable lookup. Blank values count as absent.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mode = match get("PAYPAL_ENV").or_else(|| get("PAYPAL_MODE")) {
            Some(raw) => raw.parse()?,
            None => PayPalMode::default(),
        };

        Ok(Self {
            client_id: get("PAYPAL_CLIENT_ID"),
            client_secret: get("PAYPAL_CLIENT_SECRET").map(SecretString::from),
            mode,
            currency: get("PAYPAL_CURRENCY").unwrap_or_else(|| DEFAULT_CURRENCY.into()),
            webhook_id: get("PAYPAL_WEBHOOK_ID"),
            site_origin: get("SITE_ORIGIN")
                .unwrap_or_else(|| DEFAULT_SITE_ORIGIN.into())
                .trim_end_matches('/')
                .to_string(),
            api_base: get("PAYPAL_API_BASE"),
        })
    }

    /// Missing keys needed for order creation and capture
    pub fn missing_keys(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.client_id.is_none() {
            missing.push("client_id".to_string());
        }
        if self.client_secret.is_none() {
            missing.push("client_secret".to_string());
        }
        missing
    }

    /// Missing keys needed for webhook verification
    pub fn missing_webhook_keys(&self) -> Vec<String> {
        let mut missing = self.missing_keys();
        if self.webhook_id.is_none() {
            missing.push("webhook_id".to_string());
        }
        missing
    }

    /// API base URL without a trailing slash
    pub fn api_base(&self) -> String {
        self.api_base
            .as_deref()
            .unwrap_or_else(|| self.mode.api_base())
            .trim_end_matches('/')
            .to_string()
    }

    /// Fail closed: a complete config or the list of what is missing
    pub fn resolve(&self) -> Result<PayPalConfig> {
        let missing = self.missing_keys();
        let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret)
        else {
            return Err(PaymentError::MissingConfig(missing));
        };

        Ok(PayPalConfig {
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
            mode: self.mode,
            currency: self.currency.clone(),
            webhook_id: self.webhook_id.clone(),
            site_origin: self.site_origin.clone(),
            api_base: self.api_base(),
        })
    }
}

/// Complete configuration required to call the gateway
#[derive(Clone, Debug)]
pub struct PayPalConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub mode: PayPalMode,
    pub currency: String,
    pub webhook_id: Option<String>,
    pub site_origin: String,
    pub api_base: String,
}

impl PayPalConfig {
    /// Where PayPal sends the buyer after approval
    pub fn return_url(&self) -> String {
        format!("{}/order.html?success=true", self.site_origin)
    }

    /// Where PayPal sends the buyer after cancelling
    pub fn cancel_url(&self) -> String {
        format!("{}/order.html?cancel=true", self.site_origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<PayPalSettings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        PayPalSettings::from_vars(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.mode, PayPalMode::Live);
        assert_eq!(s.currency, "USD");
        assert_eq!(s.site_origin, DEFAULT_SITE_ORIGIN);
        assert_eq!(s.api_base(), "https://api-m.paypal.com");
        assert_eq!(s.missing_keys(), vec!["client_id", "client_secret"]);
        assert_eq!(
            s.missing_webhook_keys(),
            vec!["client_id", "client_secret", "webhook_id"]
        );
    }

    #[test]
    fn test_missing_secret_only() {
        let s = settings(&[("PAYPAL_CLIENT_ID", "cid"), ("PAYPAL_CLIENT_SECRET", "  ")]).unwrap();
        assert_eq!(s.missing_keys(), vec!["client_secret"]);
        match s.resolve() {
            Err(PaymentError::MissingConfig(missing)) => assert_eq!(missing, vec!["client_secret"]),
            other => panic!("expected MissingConfig, got {other:?}"),
        }
    }

    #[test]
    fn test_sandbox_mode_and_fallback_key() {
        let s = settings(&[("PAYPAL_MODE", "sandbox")]).unwrap();
        assert_eq!(s.mode, PayPalMode::Sandbox);
        assert_eq!(s.api_base(), "https://api-m.sandbox.paypal.com");

        let s = settings(&[("PAYPAL_ENV", "live"), ("PAYPAL_MODE", "sandbox")]).unwrap();
        assert_eq!(s.mode, PayPalMode::Live);
    }

    #[test]
    fn test_invalid_mode_is_config_error() {
        assert!(matches!(
            settings(&[("PAYPAL_ENV", "production")]),
            Err(PaymentError::Config(_))
        ));
    }

    #[test]
    fn test_resolve_builds_urls() {
        let config = settings(&[
            ("PAYPAL_CLIENT_ID", "cid"),
            ("PAYPAL_CLIENT_SECRET", "shh"),
            ("SITE_ORIGIN", "https://shop.test/"),
            ("PAYPAL_API_BASE", "http://127.0.0.1:9999/"),
        ])
        .unwrap()
        .resolve()
        .unwrap();

        assert_eq!(config.api_base, "http://127.0.0.1:9999");
        assert_eq!(config.return_url(), "https://shop.test/order.html?success=true");
        assert_eq!(config.cancel_url(), "https://shop.test/order.html?cancel=true");
        assert!(!format!("{config:?}").contains("shh"));
    }
}
