//! Application State

use std::sync::Arc;

use sff_core::Catalog;
use sff_payments::{PayPalClient, PayPalConfig, PayPalSettings, PaymentGateway};

/// Builds a gateway client from a resolved configuration
pub type GatewayFactory =
    Arc<dyn Fn(PayPalConfig) -> sff_payments::Result<Arc<dyn PaymentGateway>> + Send + Sync>;

/// Shared application state. Nothing here changes between requests.
#[derive(Clone)]
pub struct AppState {
    /// Prices used for every order; client totals are never trusted
    pub catalog: Arc<Catalog>,

    /// PayPal settings as loaded, possibly incomplete
    pub settings: Arc<PayPalSettings>,

    /// Gateway constructor, called per request with the resolved config
    pub gateway_factory: GatewayFactory,
}

impl AppState {
    /// State backed by the real PayPal REST client
    pub fn new(catalog: Catalog, settings: PayPalSettings) -> Self {
        Self::with_gateway(catalog, settings, |config| {
            Ok(Arc::new(PayPalClient::new(config)?) as Arc<dyn PaymentGateway>)
        })
    }

    pub fn with_gateway<F>(catalog: Catalog, settings: PayPalSettings, factory: F) -> Self
    where
        F: Fn(PayPalConfig) -> sff_payments::Result<Arc<dyn PaymentGateway>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            catalog: Arc::new(catalog),
            settings: Arc::new(settings),
            gateway_factory: Arc::new(factory),
        }
    }

    /// Resolve the settings and build a gateway, failing closed
    pub fn gateway(&self) -> sff_payments::Result<(PayPalConfig, Arc<dyn PaymentGateway>)> {
        let config = self.settings.resolve()?;
        let gateway = (self.gateway_factory)(config.clone())?;
        Ok((config, gateway))
    }
}
