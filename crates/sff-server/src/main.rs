//! ShortFormFactory Checkout Server
//!
//! Axum-based server for the PayPal checkout: server-side pricing, order
//! creation and capture, public SDK configuration and webhook verification.

mod handlers;
mod routes;
mod state;

use anyhow::Context;
use sff_core::Catalog;
use sff_payments::PayPalSettings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::state::AppState;

fn load_catalog() -> anyhow::Result<Catalog> {
    match std::env::var("SFF_CATALOG_PATH") {
        Ok(path) if !path.trim().is_empty() => {
            let catalog = Catalog::from_path(&path)
                .with_context(|| format!("loading catalog from {path}"))?;
            tracing::info!(%path, "Loaded catalog");
            Ok(catalog)
        }
        _ => Ok(Catalog::standard()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let catalog = load_catalog()?;
    tracing::info!(
        services = catalog.service_ids().count(),
        addons = catalog.addon_ids().count(),
        "Catalog ready"
    );

    let settings = PayPalSettings::from_env().context("reading PayPal settings")?;
    let missing = settings.missing_keys();
    if missing.is_empty() {
        tracing::info!(env = %settings.mode, currency = %settings.currency, "✓ PayPal configured");
    } else {
        tracing::warn!(?missing, "⚠ PayPal not configured - checkout endpoints will fail closed");
        tracing::warn!("  Set PAYPAL_CLIENT_ID and PAYPAL_CLIENT_SECRET in .env");
    }
    if settings.webhook_id.is_none() {
        tracing::warn!("⚠ PAYPAL_WEBHOOK_ID not set - webhooks will be rejected");
    }

    let app = routes::router(AppState::new(catalog, settings));

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 sff-server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                    - Health check");
    tracing::info!("  GET  /paypal-health             - PayPal configuration report");
    tracing::info!("  GET  /payment-config            - Public SDK parameters");
    tracing::info!("  POST /orders                    - Create PayPal order");
    tracing::info!("  POST /orders/{{orderID}}/capture - Capture approved order");
    tracing::info!("  POST /webhooks/paypal           - PayPal webhook");

    axum::serve(listener, app).await?;

    Ok(())
}
