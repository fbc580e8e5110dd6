//! PayPal Orders v2 client
//!
//! Thin `reqwest` wrapper around the four REST calls the checkout needs.
//! Gateway error bodies are logged here and never propagated to callers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{Client, Response};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use sff_core::{BRAND_NAME, OrderId};

use super::{AccessToken, CaptureResult, PaymentGateway, RemoteOrderRequest};
use crate::config::PayPalConfig;
use crate::error::{PaymentError, Result};
use crate::webhook::TransmissionHeaders;

const REQUEST_ID_HEADER: &str = "PayPal-Request-Id";
const STATUS_COMPLETED: &str = "COMPLETED";
const VERIFICATION_SUCCESS: &str = "SUCCESS";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// PayPal REST client
pub struct PayPalClient {
    http: Client,
    config: PayPalConfig,
}

impl PayPalClient {
    /// Create a new PayPal client
    pub fn new(config: PayPalConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| PaymentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get the configuration this client was built with
    pub const fn config(&self) -> &PayPalConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base, path)
    }

    /// Drain a failed response body for diagnostics
    async fn error_body(response: Response) -> String {
        response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {e}>"))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    intent: &'static str,
    purchase_units: [PurchaseUnitBody<'a>; 1],
    application_context: ApplicationContext<'a>,
}

#[derive(Serialize)]
struct PurchaseUnitBody<'a> {
    amount: AmountBody<'a>,
    description: &'a str,
}

#[derive(Serialize)]
struct AmountBody<'a> {
    currency_code: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct ApplicationContext<'a> {
    brand_name: &'static str,
    landing_page: &'static str,
    user_action: &'static str,
    return_url: &'a str,
    cancel_url: &'a str,
}

#[derive(Deserialize)]
struct CreatedOrder {
    #[serde(default)]
    id: String,
}

/// Read a string at a JSON pointer, empty when absent or not a string
fn str_at<'a>(raw: &'a serde_json::Value, pointer: &str) -> &'a str {
    raw.pointer(pointer)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
}

/// Pull the receipt fields out of a capture payload. Each field is read on
/// its own, so shape drift in one leaves only that field empty.
fn capture_result(raw: &serde_json::Value, requested: &OrderId) -> CaptureResult {
    let capture = "/purchase_units/0/payments/captures/0";
    let order_id = str_at(raw, "/id");

    CaptureResult {
        order_id: if order_id.is_empty() {
            requested.to_string()
        } else {
            order_id.to_string()
        },
        status: str_at(raw, "/status").to_string(),
        capture_id: str_at(raw, &format!("{capture}/id")).to_string(),
        amount: str_at(raw, &format!("{capture}/amount/value")).to_string(),
        currency: str_at(raw, &format!("{capture}/amount/currency_code")).to_string(),
        payer_email: str_at(raw, "/payer/email_address").to_string(),
    }
}

#[derive(Serialize)]
struct VerifySignatureBody<'a> {
    transmission_id: &'a str,
    transmission_time: &'a str,
    cert_url: &'a str,
    auth_algo: &'a str,
    transmission_sig: &'a str,
    webhook_id: &'a str,
    webhook_event: &'a RawValue,
}

#[derive(Deserialize)]
struct VerifySignatureResponse {
    #[serde(default)]
    verification_status: String,
}

#[async_trait]
impl PaymentGateway for PayPalClient {
    async fn get_access_token(&self) -> Result<AccessToken> {
        let response = self
            .http
            .post(self.url("/v1/oauth2/token"))
            .basic_auth(
                &self.config.client_id,
                Some(self.config.client_secret.expose_secret()),
            )
            .header(ACCEPT, "application/json")
            .header(ACCEPT_LANGUAGE, "en_US")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "PayPal auth request failed");
                PaymentError::AuthFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            tracing::error!(%status, %body, "PayPal auth error");
            return Err(PaymentError::AuthFailed(format!("status {status}")));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "PayPal auth response unreadable");
            PaymentError::AuthFailed(e.to_string())
        })?;

        token
            .access_token
            .filter(|t| !t.is_empty())
            .map(AccessToken::new)
            .ok_or_else(|| PaymentError::AuthFailed("no access_token in response".into()))
    }

    async fn create_remote_order(&self, order: &RemoteOrderRequest) -> Result<OrderId> {
        let token = self.get_access_token().await?;

        let body = CreateOrderBody {
            intent: "CAPTURE",
            purchase_units: [PurchaseUnitBody {
                amount: AmountBody {
                    currency_code: &order.currency,
                    value: &order.amount,
                },
                description: &order.description,
            }],
            application_context: ApplicationContext {
                brand_name: BRAND_NAME,
                landing_page: "NO_PREFERENCE",
                user_action: "PAY_NOW",
                return_url: &order.return_url,
                cancel_url: &order.cancel_url,
            },
        };

        let response = self
            .http
            .post(self.url("/v2/checkout/orders"))
            .bearer_auth(token.expose())
            .header(REQUEST_ID_HEADER, uuid::Uuid::new_v4().to_string())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "PayPal order creation request failed");
                PaymentError::OrderCreateFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            tracing::error!(%status, %body, "PayPal order creation error");
            return Err(PaymentError::OrderCreateFailed(format!("status {status}")));
        }

        let created: CreatedOrder = response
            .json()
            .await
            .map_err(|e| PaymentError::OrderCreateFailed(e.to_string()))?;

        let order_id = OrderId::parse(&created.id).map_err(|e| {
            tracing::error!(id = %created.id, "PayPal returned unusable order id");
            PaymentError::OrderCreateFailed(e.to_string())
        })?;

        tracing::info!(
            order_id = %order_id,
            amount = %order.amount,
            currency = %order.currency,
            "Created PayPal order"
        );

        Ok(order_id)
    }

    async fn capture_remote_order(&self, order_id: &OrderId) -> Result<CaptureResult> {
        let token = self.get_access_token().await?;

        let response = self
            .http
            .post(self.url(&format!("/v2/checkout/orders/{order_id}/capture")))
            .bearer_auth(token.expose())
            .header(CONTENT_TYPE, "application/json")
            .header(REQUEST_ID_HEADER, format!("capture-{order_id}"))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(order_id = %order_id, error = %e, "PayPal capture request failed");
                PaymentError::CaptureFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            tracing::error!(order_id = %order_id, %status, %body, "PayPal capture error");
            return Err(PaymentError::CaptureFailed(format!("status {status}")));
        }

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PaymentError::CaptureFailed(e.to_string()))?;

        let result = capture_result(&raw, order_id);

        if result.status != STATUS_COMPLETED {
            tracing::warn!(
                order_id = %order_id,
                status = %result.status,
                details = %raw,
                "PayPal capture not completed"
            );
            return Err(PaymentError::CaptureIncomplete {
                status: result.status,
                details: raw,
            });
        }

        tracing::info!(
            order_id = %result.order_id,
            capture_id = %result.capture_id,
            amount = %result.amount,
            currency = %result.currency,
            "Captured PayPal order"
        );

        Ok(result)
    }

    async fn verify_webhook_signature(
        &self,
        headers: &TransmissionHeaders,
        body: &str,
        webhook_id: &str,
    ) -> Result<bool> {
        let Ok(event) = RawValue::from_string(body.to_string()) else {
            tracing::warn!("Webhook body is not JSON; treating as unverified");
            return Ok(false);
        };

        let token = self.get_access_token().await?;

        let request = VerifySignatureBody {
            transmission_id: &headers.transmission_id,
            transmission_time: &headers.transmission_time,
            cert_url: &headers.cert_url,
            auth_algo: &headers.auth_algo,
            transmission_sig: &headers.transmission_sig,
            webhook_id,
            webhook_event: &event,
        };

        let response = match self
            .http
            .post(self.url("/v1/notifications/verify-webhook-signature"))
            .bearer_auth(token.expose())
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Webhook verification call failed");
                return Ok(false);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            tracing::warn!(%status, %body, "Webhook verification rejected");
            return Ok(false);
        }

        match response.json::<VerifySignatureResponse>().await {
            Ok(verdict) if verdict.verification_status == VERIFICATION_SUCCESS => Ok(true),
            Ok(verdict) => {
                tracing::warn!(
                    verification_status = %verdict.verification_status,
                    transmission_id = %headers.transmission_id,
                    "Webhook signature not verified"
                );
                Ok(false)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Webhook verification response unreadable");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PayPalMode;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{
        basic_auth, bearer_token, body_partial_json, body_string_contains, header, header_exists,
        method, path,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> PayPalClient {
        PayPalClient::new(PayPalConfig {
            client_id: "client-id".into(),
            client_secret: SecretString::from("client-secret"),
            mode: PayPalMode::Sandbox,
            currency: "USD".into(),
            webhook_id: Some("WH-1".into()),
            site_origin: "https://shop.test".into(),
            api_base: server.uri(),
        })
        .unwrap()
    }

    async fn mount_token(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .and(basic_auth("client-id", "client-secret"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "tok-1", "expires_in": 32400})),
            )
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    fn order_id(raw: &str) -> OrderId {
        OrderId::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_access_token() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        let token = client(&server).get_access_token().await.unwrap();
        assert_eq!(token.expose(), "tok-1");
        assert_eq!(format!("{token:?}"), "AccessToken([REDACTED])");
    }

    #[tokio::test]
    async fn test_access_token_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "invalid_client"})))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).get_access_token().await.unwrap_err();
        assert!(matches!(err, PaymentError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn test_access_token_missing_from_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"scope": "x"})))
            .mount(&server)
            .await;

        let err = client(&server).get_access_token().await.unwrap_err();
        assert!(matches!(err, PaymentError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn test_create_order() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v2/checkout/orders"))
            .and(bearer_token("tok-1"))
            .and(header_exists("PayPal-Request-Id"))
            .and(body_partial_json(json!({
                "intent": "CAPTURE",
                "purchase_units": [{
                    "amount": {"currency_code": "USD", "value": "85.00"},
                    "description": "ShortFormFactory - aiReel (standard)"
                }],
                "application_context": {
                    "brand_name": "ShortFormFactory",
                    "user_action": "PAY_NOW",
                    "return_url": "https://shop.test/order.html?success=true",
                    "cancel_url": "https://shop.test/order.html?cancel=true"
                }
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": "ABC123", "status": "CREATED"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let paypal = client(&server);
        let quote = sff_core::Catalog::standard()
            .price_order("aiReel", "standard", &["rush"])
            .unwrap();
        let request = RemoteOrderRequest::for_quote(&quote, paypal.config());

        let id = paypal.create_remote_order(&request).await.unwrap();
        assert_eq!(id.as_str(), "ABC123");
    }

    #[tokio::test]
    async fn test_create_order_failure_is_not_retried() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v2/checkout/orders"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .expect(1)
            .mount(&server)
            .await;

        let request = RemoteOrderRequest {
            amount: "25.00".into(),
            currency: "USD".into(),
            description: "d".into(),
            return_url: "r".into(),
            cancel_url: "c".into(),
        };

        let err = client(&server).create_remote_order(&request).await.unwrap_err();
        assert!(matches!(err, PaymentError::OrderCreateFailed(_)));
        assert!(!err.to_string().contains("upstream exploded"));
    }

    #[tokio::test]
    async fn test_capture_completed() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v2/checkout/orders/ABC123/capture"))
            .and(bearer_token("tok-1"))
            .and(header("PayPal-Request-Id", "capture-ABC123"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "ABC123",
                "status": "COMPLETED",
                "payer": {"email_address": "buyer@example.com"},
                "purchase_units": [{
                    "payments": {"captures": [{
                        "id": "CAP987",
                        "status": "COMPLETED",
                        "amount": {"currency_code": "USD", "value": "85.00"}
                    }]}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server)
            .capture_remote_order(&order_id("ABC123"))
            .await
            .unwrap();

        assert_eq!(
            result,
            CaptureResult {
                order_id: "ABC123".into(),
                status: "COMPLETED".into(),
                capture_id: "CAP987".into(),
                amount: "85.00".into(),
                currency: "USD".into(),
                payer_email: "buyer@example.com".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_capture_tolerates_missing_fields() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v2/checkout/orders/ABC123/capture"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"status": "COMPLETED"})))
            .mount(&server)
            .await;

        let result = client(&server)
            .capture_remote_order(&order_id("ABC123"))
            .await
            .unwrap();

        assert_eq!(result.order_id, "ABC123");
        assert_eq!(result.capture_id, "");
        assert_eq!(result.amount, "");
        assert_eq!(result.payer_email, "");
    }

    #[tokio::test]
    async fn test_capture_completed_with_unexpected_field_types() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v2/checkout/orders/ABC123/capture"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "ABC123",
                "status": "COMPLETED",
                "payer": "anonymous",
                "purchase_units": [{
                    "payments": {
                        "captures": [{
                            "id": "CAP987",
                            "amount": {"currency_code": "USD", "value": 85.0}
                        }]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let result = client(&server)
            .capture_remote_order(&order_id("ABC123"))
            .await
            .unwrap();

        assert_eq!(result.status, "COMPLETED");
        assert_eq!(result.capture_id, "CAP987");
        assert_eq!(result.currency, "USD");
        assert_eq!(result.amount, "");
        assert_eq!(result.payer_email, "");
    }

    #[tokio::test]
    async fn test_capture_incomplete_carries_payload() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        let payload = json!({"id": "ABC123", "status": "PAYER_ACTION_REQUIRED"});
        Mock::given(method("POST"))
            .and(path("/v2/checkout/orders/ABC123/capture"))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload.clone()))
            .mount(&server)
            .await;

        match client(&server).capture_remote_order(&order_id("ABC123")).await {
            Err(PaymentError::CaptureIncomplete { status, details }) => {
                assert_eq!(status, "PAYER_ACTION_REQUIRED");
                assert_eq!(details, payload);
            }
            other => panic!("expected CaptureIncomplete, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_capture_rejected() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v2/checkout/orders/ABC123/capture"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "name": "UNPROCESSABLE_ENTITY",
                "details": [{"issue": "ORDER_ALREADY_CAPTURED"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .capture_remote_order(&order_id("ABC123"))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::CaptureFailed(_)));
    }

    fn transmission() -> TransmissionHeaders {
        TransmissionHeaders {
            transmission_id: "tx-1".into(),
            transmission_time: "2024-01-01T00:00:00Z".into(),
            cert_url: "https://api.paypal.com/cert".into(),
            auth_algo: "SHA256withRSA".into(),
            transmission_sig: "sig".into(),
        }
    }

    #[tokio::test]
    async fn test_verify_webhook_success() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v1/notifications/verify-webhook-signature"))
            .and(body_partial_json(json!({
                "transmission_id": "tx-1",
                "transmission_sig": "sig",
                "webhook_id": "WH-1",
                "webhook_event": {"event_type": "PAYMENT.CAPTURE.COMPLETED"}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"verification_status": "SUCCESS"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let verified = client(&server)
            .verify_webhook_signature(
                &transmission(),
                r#"{"event_type": "PAYMENT.CAPTURE.COMPLETED"}"#,
                "WH-1",
            )
            .await
            .unwrap();
        assert!(verified);
    }

    #[tokio::test]
    async fn test_verify_webhook_failure_status() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v1/notifications/verify-webhook-signature"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"verification_status": "FAILURE"})),
            )
            .mount(&server)
            .await;

        let verified = client(&server)
            .verify_webhook_signature(&transmission(), "{}", "WH-1")
            .await
            .unwrap();
        assert!(!verified);
    }

    #[tokio::test]
    async fn test_verify_webhook_call_error_is_unverified() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v1/notifications/verify-webhook-signature"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let verified = client(&server)
            .verify_webhook_signature(&transmission(), "{}", "WH-1")
            .await
            .unwrap();
        assert!(!verified);
    }

    #[tokio::test]
    async fn test_verify_webhook_non_json_body_skips_gateway() {
        let server = MockServer::start().await;
        mount_token(&server, 0).await;

        let verified = client(&server)
            .verify_webhook_signature(&transmission(), "not json", "WH-1")
            .await
            .unwrap();
        assert!(!verified);
    }
}
