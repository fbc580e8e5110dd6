//! Wire Types
//!
//! The canonical JSON shapes exchanged between the storefront client and the
//! checkout endpoints. Both ends serialize through these types so field names
//! (`orderID`, `clientID`, ...) cannot drift apart.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum accepted length for a gateway order id
const MAX_ORDER_ID_LEN: usize = 64;

/// Gateway-issued order identifier.
///
/// Restricted to ASCII alphanumerics and `-` because it is interpolated into
/// gateway URL paths.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderId(String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderIdError {
    #[error("Missing orderID")]
    Missing,

    #[error("Malformed orderID")]
    Malformed,
}

impl OrderId {
    pub fn parse(raw: &str) -> Result<Self, OrderIdError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(OrderIdError::Missing);
        }
        if raw.len() > MAX_ORDER_ID_LEN
            || !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(OrderIdError::Malformed);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OrderId {
    type Error = OrderIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `POST /orders` body. Addons are sent as ids, never display names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub service: String,

    #[serde(default)]
    pub package: String,

    #[serde(default)]
    pub addons: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    #[serde(rename = "orderID")]
    pub order_id: OrderId,
}

/// `POST /orders/{orderID}/capture` body
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    #[serde(rename = "orderID", default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

/// Successful capture (`200`)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResponse {
    pub success: bool,

    #[serde(rename = "orderID")]
    pub order_id: String,

    pub status: String,

    #[serde(rename = "captureID", default)]
    pub capture_id: String,

    /// Two-digit decimal string, e.g. "85.00"
    #[serde(default)]
    pub amount: String,

    #[serde(default)]
    pub currency: String,

    #[serde(default)]
    pub payer_email: String,
}

/// Capture that did not complete (`400`)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptureFailure {
    pub success: bool,
    pub details: serde_json::Value,
}

/// `GET /payment-config`. There is deliberately no secret field on this type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfigResponse {
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub currency: String,
    pub env: String,
}

/// Fail-closed configuration response (`500`)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingConfigResponse {
    pub error: String,
    pub message: String,
    pub missing: Vec<String>,
}

impl MissingConfigResponse {
    pub fn new(missing: Vec<String>) -> Self {
        Self {
            error: "MISSING_ENV".into(),
            message: format!(
                "PayPal configuration incomplete, missing: {}",
                missing.join(", ")
            ),
            missing,
        }
    }
}

/// Generic error body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_id_validation() {
        assert_eq!(OrderId::parse("ABC123").unwrap().as_str(), "ABC123");
        assert_eq!(OrderId::parse("  5O1-90X ").unwrap().as_str(), "5O1-90X");
        assert_eq!(OrderId::parse("   "), Err(OrderIdError::Missing));
        assert_eq!(OrderId::parse("../v1/oauth2"), Err(OrderIdError::Malformed));
        assert_eq!(OrderId::parse(&"A".repeat(65)), Err(OrderIdError::Malformed));
    }

    #[test]
    fn test_field_names_match_wire() {
        let body = serde_json::to_value(CreateOrderResponse {
            order_id: OrderId::parse("ABC123").unwrap(),
        })
        .unwrap();
        assert_eq!(body, json!({"orderID": "ABC123"}));

        let config = serde_json::to_value(PaymentConfigResponse {
            client_id: "cid".into(),
            currency: "USD".into(),
            env: "sandbox".into(),
        })
        .unwrap();
        assert_eq!(config, json!({"clientID": "cid", "currency": "USD", "env": "sandbox"}));

        let capture: CaptureResponse = serde_json::from_value(json!({
            "success": true,
            "orderID": "ABC123",
            "status": "COMPLETED",
            "captureID": "CAP987",
            "amount": "85.00",
            "currency": "USD",
            "payerEmail": "buyer@example.com"
        }))
        .unwrap();
        assert_eq!(capture.capture_id, "CAP987");
        assert_eq!(capture.payer_email, "buyer@example.com");
    }

    #[test]
    fn test_create_order_request_defaults_missing_fields() {
        let req: CreateOrderRequest = serde_json::from_value(json!({"service": "aiReel"})).unwrap();
        assert_eq!(req.package, "");
        assert!(req.addons.is_empty());
    }

    #[test]
    fn test_order_id_rejects_bad_json_value() {
        let res: Result<CreateOrderResponse, _> =
            serde_json::from_value(json!({"orderID": "a/b"}));
        assert!(res.is_err());
    }
}
