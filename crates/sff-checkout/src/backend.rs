//! Storefront API Client
//!
//! The checkout never talks to PayPal's REST API directly. Order creation
//! and capture go through the storefront server, which holds the secret.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use sff_core::OrderId;
use sff_core::wire::{
    CaptureFailure, CaptureRequest, CaptureResponse, CreateOrderRequest, CreateOrderResponse,
    ErrorResponse, MissingConfigResponse, PaymentConfigResponse,
};
use url::Url;

use crate::error::{CheckoutError, Result};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Server calls made by the checkout
#[async_trait]
pub trait CheckoutBackend: Send + Sync {
    /// Public gateway configuration (`GET /payment-config`)
    async fn payment_config(&self) -> Result<PaymentConfigResponse>;

    /// Create a gateway order for the selection (`POST /orders`)
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<OrderId>;

    /// Capture an approved order (`POST /orders/{orderID}/capture`)
    async fn capture_order(&self, order_id: &OrderId) -> Result<CaptureResponse>;
}

/// HTTP implementation against the storefront server
pub struct HttpBackend {
    http: Client,
    base_url: String,
}

impl HttpBackend {
    /// `base_url` is the server origin, e.g. `https://shortformfactory.com`
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| CheckoutError::Network(format!("invalid API base {base_url:?}: {e}")))?;

        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| CheckoutError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Best-effort extraction of the server's error message
    async fn error_message(response: Response) -> String {
        let status = response.status();
        match response.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => format!("HTTP {status}"),
        }
    }
}

fn network(e: &reqwest::Error) -> CheckoutError {
    CheckoutError::Network(e.to_string())
}

#[async_trait]
impl CheckoutBackend for HttpBackend {
    async fn payment_config(&self) -> Result<PaymentConfigResponse> {
        let response = self
            .http
            .get(self.url("/payment-config"))
            .send()
            .await
            .map_err(|e| network(&e))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<MissingConfigResponse>().await {
                Ok(body) => body.message,
                Err(_) => format!("HTTP {status}"),
            };
            tracing::warn!(%status, %message, "Payment config unavailable");
            return Err(CheckoutError::GatewayUnavailable(message));
        }

        response
            .json()
            .await
            .map_err(|e| CheckoutError::GatewayUnavailable(e.to_string()))
    }

    async fn create_order(&self, request: &CreateOrderRequest) -> Result<OrderId> {
        let response = self
            .http
            .post(self.url("/orders"))
            .json(request)
            .send()
            .await
            .map_err(|e| network(&e))?;

        if !response.status().is_success() {
            return Err(CheckoutError::OrderCreateFailed(
                Self::error_message(response).await,
            ));
        }

        let body: CreateOrderResponse = response
            .json()
            .await
            .map_err(|e| CheckoutError::OrderCreateFailed(e.to_string()))?;

        tracing::debug!(order_id = %body.order_id, "Order created");
        Ok(body.order_id)
    }

    async fn capture_order(&self, order_id: &OrderId) -> Result<CaptureResponse> {
        let response = self
            .http
            .post(self.url(&format!("/orders/{order_id}/capture")))
            .json(&CaptureRequest {
                order_id: Some(order_id.to_string()),
            })
            .send()
            .await
            .map_err(|e| network(&e))?;

        match response.status() {
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| CheckoutError::CaptureFailed(e.to_string())),
            StatusCode::BAD_REQUEST => {
                let body = response
                    .json::<serde_json::Value>()
                    .await
                    .map_err(|e| CheckoutError::CaptureFailed(e.to_string()))?;

                match serde_json::from_value::<CaptureFailure>(body.clone()) {
                    Ok(failure) => Err(CheckoutError::CaptureIncomplete {
                        status: failure.details["status"]
                            .as_str()
                            .unwrap_or_default()
                            .to_string(),
                        details: failure.details,
                    }),
                    Err(_) => Err(CheckoutError::CaptureFailed(
                        body["error"].as_str().unwrap_or("HTTP 400").to_string(),
                    )),
                }
            }
            _ => Err(CheckoutError::CaptureFailed(
                Self::error_message(response).await,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn backend() -> (MockServer, HttpBackend) {
        let server = MockServer::start().await;
        let backend = HttpBackend::new(&server.uri()).unwrap();
        (server, backend)
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(matches!(
            HttpBackend::new("not a url"),
            Err(CheckoutError::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_payment_config() {
        let (server, backend) = backend().await;
        Mock::given(method("GET"))
            .and(path("/payment-config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "clientID": "cid",
                "currency": "USD",
                "env": "sandbox"
            })))
            .mount(&server)
            .await;

        let config = backend.payment_config().await.unwrap();
        assert_eq!(config.client_id, "cid");
        assert_eq!(config.env, "sandbox");
    }

    #[tokio::test]
    async fn test_payment_config_missing_env() {
        let (server, backend) = backend().await;
        Mock::given(method("GET"))
            .and(path("/payment-config"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": "MISSING_ENV",
                "message": "PayPal configuration incomplete, missing: client_secret",
                "missing": ["client_secret"]
            })))
            .mount(&server)
            .await;

        let err = backend.payment_config().await.unwrap_err();
        assert_eq!(
            err,
            CheckoutError::GatewayUnavailable(
                "PayPal configuration incomplete, missing: client_secret".into()
            )
        );
    }

    #[tokio::test]
    async fn test_create_order_sends_addon_ids() {
        let (server, backend) = backend().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(body_json(json!({
                "service": "aiReel",
                "package": "standard",
                "addons": ["rush"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"orderID": "ABC123"})))
            .expect(1)
            .mount(&server)
            .await;

        let order_id = backend
            .create_order(&CreateOrderRequest {
                service: "aiReel".into(),
                package: "standard".into(),
                addons: vec!["rush".into()],
            })
            .await
            .unwrap();
        assert_eq!(order_id.as_str(), "ABC123");
    }

    #[tokio::test]
    async fn test_create_order_error_body() {
        let (server, backend) = backend().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "Invalid service",
                "code": "INVALID_SERVICE"
            })))
            .mount(&server)
            .await;

        let err = backend
            .create_order(&CreateOrderRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err, CheckoutError::OrderCreateFailed("Invalid service".into()));
    }

    #[tokio::test]
    async fn test_capture_completed() {
        let (server, backend) = backend().await;
        Mock::given(method("POST"))
            .and(path("/orders/ABC123/capture"))
            .and(body_json(json!({"orderID": "ABC123"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "orderID": "ABC123",
                "status": "COMPLETED",
                "captureID": "CAP987",
                "amount": "85.00",
                "currency": "USD",
                "payerEmail": ""
            })))
            .mount(&server)
            .await;

        let capture = backend
            .capture_order(&OrderId::parse("ABC123").unwrap())
            .await
            .unwrap();
        assert!(capture.success);
        assert_eq!(capture.capture_id, "CAP987");
    }

    #[tokio::test]
    async fn test_capture_incomplete() {
        let (server, backend) = backend().await;
        Mock::given(method("POST"))
            .and(path("/orders/ABC123/capture"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "success": false,
                "details": {"id": "ABC123", "status": "PENDING"}
            })))
            .mount(&server)
            .await;

        let err = backend
            .capture_order(&OrderId::parse("ABC123").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::CaptureIncomplete { ref status, .. } if status == "PENDING"
        ));
    }

    #[tokio::test]
    async fn test_capture_server_error() {
        let (server, backend) = backend().await;
        Mock::given(method("POST"))
            .and(path("/orders/ABC123/capture"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": "Failed to capture order",
                "code": "CAPTURE_FAILED"
            })))
            .mount(&server)
            .await;

        let err = backend
            .capture_order(&OrderId::parse("ABC123").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err, CheckoutError::CaptureFailed("Failed to capture order".into()));
    }
}
