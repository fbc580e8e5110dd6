//! PayPal SDK Loader
//!
//! Fetches the public gateway configuration once per session and builds the
//! SDK script URL from it. Concurrent callers share a single fetch; a failed
//! fetch is not remembered, so the next caller tries again.

use std::sync::Arc;

use sff_core::wire::PaymentConfigResponse;
use tokio::sync::OnceCell;
use url::form_urlencoded;

use crate::backend::CheckoutBackend;
use crate::error::{CheckoutError, Result};

const SDK_BASE: &str = "https://www.paypal.com/sdk/js";

/// Ready-to-use gateway client parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayHandle {
    pub client_id: String,
    pub currency: String,
    pub env: String,
}

impl GatewayHandle {
    fn from_config(config: PaymentConfigResponse) -> Result<Self> {
        if config.client_id.trim().is_empty() {
            return Err(CheckoutError::GatewayUnavailable(
                "Missing PayPal clientID".into(),
            ));
        }

        Ok(Self {
            client_id: config.client_id,
            currency: config.currency,
            env: config.env,
        })
    }

    /// Smart-buttons SDK script URL, capture intent, pay-later disabled
    pub fn sdk_url(&self) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("client-id", &self.client_id)
            .append_pair("currency", &self.currency)
            .append_pair("intent", "capture")
            .append_pair("components", "buttons")
            .append_pair("disable-funding", "paylater")
            .finish();

        format!("{SDK_BASE}?{query}")
    }
}

/// Lazily initialized gateway handle
pub struct GatewayLoader {
    backend: Arc<dyn CheckoutBackend>,
    handle: OnceCell<GatewayHandle>,
}

impl GatewayLoader {
    pub fn new(backend: Arc<dyn CheckoutBackend>) -> Self {
        Self {
            backend,
            handle: OnceCell::new(),
        }
    }

    /// Resolve the handle, fetching the config at most once on success
    pub async fn ensure_ready(&self) -> Result<&GatewayHandle> {
        self.handle
            .get_or_try_init(|| async {
                let config = self.backend.payment_config().await?;
                let handle = GatewayHandle::from_config(config)?;
                tracing::info!(env = %handle.env, currency = %handle.currency, "PayPal SDK ready");
                Ok(handle)
            })
            .await
    }

    /// The handle, if already loaded
    pub fn get(&self) -> Option<&GatewayHandle> {
        self.handle.get()
    }
}
