//! Router

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    capture_order, create_order, health_check, payment_config, paypal_health, paypal_webhook,
};
use crate::state::AppState;

/// Build the application router. Other methods on these paths get a 405.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(health_check))
        .route("/paypal-health", get(paypal_health))
        // Checkout
        .route("/payment-config", get(payment_config))
        .route("/orders", post(create_order))
        .route("/orders/{order_id}/capture", post(capture_order))
        // Gateway callbacks
        .route("/webhooks/paypal", post(paypal_webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
