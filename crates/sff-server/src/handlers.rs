//! HTTP Handlers
//!
//! Every handler is a stateless request/response unit. Gateway failures are
//! logged here with full detail and returned to the caller as an opaque
//! message.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sff_core::wire::{
    CaptureFailure, CaptureRequest, CaptureResponse, CreateOrderRequest, CreateOrderResponse,
    ErrorResponse, MissingConfigResponse, PaymentConfigResponse,
};
use sff_core::{OrderId, OrderIdError};
use sff_payments::{PaymentError, RemoteOrderRequest, WebhookHandler, WebhookOutcome};

use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (status, Json(ErrorResponse::new(error, code)))
}

/// Gateway/config failure as an opaque response
fn payment_error(e: &PaymentError) -> ApiError {
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        e.user_message(),
        e.code(),
    )
}

fn parse_body<T>(body: &Bytes) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Rejecting malformed request body");
        api_error(StatusCode::BAD_REQUEST, "Invalid request body", "INVALID_REQUEST")
    })
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub paypal_configured: bool,
}

/// Configuration report; never carries secrets
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayPalHealthResponse {
    pub ok: bool,
    pub missing: Vec<String>,
    pub env: String,
    pub currency: String,
    pub api_base: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        paypal_configured: state.settings.missing_keys().is_empty(),
    })
}

/// `GET /paypal-health`
pub async fn paypal_health(
    State(state): State<AppState>,
) -> (StatusCode, Json<PayPalHealthResponse>) {
    let missing = state.settings.missing_keys();
    let ok = missing.is_empty();
    if !ok {
        tracing::warn!(?missing, "PayPal configuration incomplete");
    }

    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(PayPalHealthResponse {
            ok,
            missing,
            env: state.settings.mode.to_string(),
            currency: state.settings.currency.clone(),
            api_base: state.settings.api_base(),
        }),
    )
}

/// `GET /payment-config`: public client parameters only
pub async fn payment_config(
    State(state): State<AppState>,
) -> Result<Json<PaymentConfigResponse>, (StatusCode, Json<MissingConfigResponse>)> {
    let settings = &state.settings;

    match &settings.client_id {
        Some(client_id) if settings.client_secret.is_some() => Ok(Json(PaymentConfigResponse {
            client_id: client_id.clone(),
            currency: settings.currency.clone(),
            env: settings.mode.to_string(),
        })),
        _ => {
            let missing = settings.missing_keys();
            tracing::error!(?missing, "Payment config requested with incomplete setup");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MissingConfigResponse::new(missing)),
            ))
        }
    }
}

/// `POST /orders`: price server-side, then create the gateway order
pub async fn create_order(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CreateOrderResponse>, ApiError> {
    let (config, gateway) = state.gateway().map_err(|e| {
        tracing::error!(error = %e, "Cannot create order");
        payment_error(&e)
    })?;

    let request: CreateOrderRequest = parse_body(&body)?;

    let quote = state
        .catalog
        .price_order(&request.service, &request.package, &request.addons)
        .map_err(|e| {
            tracing::info!(error = %e, "Rejected order selection");
            api_error(StatusCode::BAD_REQUEST, e.to_string(), e.code())
        })?;

    let order_id = gateway
        .create_remote_order(&RemoteOrderRequest::for_quote(&quote, &config))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, service = %quote.service, "Order creation failed");
            payment_error(&e)
        })?;

    Ok(Json(CreateOrderResponse { order_id }))
}

/// `POST /orders/{orderID}/capture`
pub async fn capture_order(
    State(state): State<AppState>,
    Path(raw_order_id): Path<String>,
    body: Bytes,
) -> Result<Json<CaptureResponse>, Response> {
    let order_id = OrderId::parse(&raw_order_id).map_err(|e| {
        let status = match e {
            OrderIdError::Missing => StatusCode::INTERNAL_SERVER_ERROR,
            OrderIdError::Malformed => StatusCode::BAD_REQUEST,
        };
        api_error(status, e.to_string(), "INVALID_ORDER_ID").into_response()
    })?;

    let request: CaptureRequest = parse_body(&body).map_err(IntoResponse::into_response)?;
    let body_id = request.order_id.as_deref().map_or("", str::trim);
    if !body_id.is_empty() && body_id != order_id.as_str() {
        tracing::warn!(%order_id, %body_id, "Capture body names a different order");
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "orderID does not match the request path",
            "ORDER_ID_MISMATCH",
        )
        .into_response());
    }

    let (_, gateway) = state.gateway().map_err(|e| {
        tracing::error!(error = %e, "Cannot capture order");
        payment_error(&e).into_response()
    })?;

    match gateway.capture_remote_order(&order_id).await {
        Ok(capture) => Ok(Json(CaptureResponse {
            success: true,
            order_id: capture.order_id,
            status: capture.status,
            capture_id: capture.capture_id,
            amount: capture.amount,
            currency: capture.currency,
            payer_email: capture.payer_email,
        })),
        Err(PaymentError::CaptureIncomplete { details, .. }) => Err((
            StatusCode::BAD_REQUEST,
            Json(CaptureFailure {
                success: false,
                details,
            }),
        )
            .into_response()),
        Err(e) => {
            tracing::error!(%order_id, error = %e, "Capture failed");
            Err(payment_error(&e).into_response())
        }
    }
}

/// `POST /webhooks/paypal`: verify before reading anything from the body
pub async fn paypal_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<serde_json::Value>, ApiError> {
    let missing = state.settings.missing_webhook_keys();
    if !missing.is_empty() {
        tracing::error!(?missing, "Webhook configuration missing");
        return Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Webhook configuration missing",
            "MISSING_ENV",
        ));
    }

    let (config, gateway) = state.gateway().map_err(|e| {
        tracing::error!(error = %e, "Cannot verify webhook");
        payment_error(&e)
    })?;
    let webhook_id = config.webhook_id.unwrap_or_default();

    match WebhookHandler::new(gateway, webhook_id)
        .handle(&headers, &body)
        .await
    {
        Ok(WebhookOutcome::Accepted(_)) => Ok(Json(json!({ "received": true }))),
        Ok(WebhookOutcome::Rejected) => Err(api_error(
            StatusCode::BAD_REQUEST,
            "Webhook verification failed",
            "INVALID_SIGNATURE",
        )),
        Err(e @ (PaymentError::MissingTransmissionHeader(_) | PaymentError::WebhookParse(_))) => {
            tracing::warn!(error = %e, "Rejected webhook delivery");
            Err(api_error(StatusCode::BAD_REQUEST, e.user_message(), e.code()))
        }
        Err(e) => {
            tracing::error!(error = %e, "Webhook verification unavailable");
            Err(payment_error(&e))
        }
    }
}
