//! Payment Receipt
//!
//! The locally persisted proof that a capture completed. It is what lets a
//! reload, or PayPal's redirect return, reach the paid state without calling
//! the gateway again.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sff_core::wire::CaptureResponse;
use sff_core::{OrderId, Quote};

use crate::error::{CheckoutError, Result};

/// Fixed storage key for the single receipt record
pub const RECEIPT_KEY: &str = "sff_paid_receipt_v1";

/// A captured payment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub paid: bool,

    /// When the capture was recorded locally
    pub ts: DateTime<Utc>,

    #[serde(rename = "orderID")]
    pub order_id: String,

    #[serde(rename = "captureID")]
    pub capture_id: String,

    #[serde(default)]
    pub payer_email: String,

    #[serde(default)]
    pub amount: String,

    #[serde(default)]
    pub currency: String,

    #[serde(default)]
    pub service: String,

    #[serde(default)]
    pub package: String,

    #[serde(default)]
    pub addons: Vec<String>,
}

impl Receipt {
    /// Build from a completed capture. The selection fields come from the
    /// quote being paid for, when one is known in this session.
    pub fn from_capture(order_id: &OrderId, capture: &CaptureResponse, quote: Option<&Quote>) -> Self {
        Self {
            paid: true,
            ts: Utc::now(),
            order_id: order_id.to_string(),
            capture_id: capture.capture_id.trim().to_string(),
            payer_email: capture.payer_email.clone(),
            amount: capture.amount.clone(),
            currency: capture.currency.clone(),
            service: quote.map(|q| q.service.clone()).unwrap_or_default(),
            package: quote.map(|q| q.package.to_string()).unwrap_or_default(),
            addons: quote.map(|q| q.addons.clone()).unwrap_or_default(),
        }
    }

    /// A paid receipt must name both the order and the capture
    pub fn is_valid(&self) -> bool {
        self.paid && !self.order_id.trim().is_empty() && !self.capture_id.trim().is_empty()
    }

    pub fn is_for(&self, order_id: &OrderId) -> bool {
        self.order_id == order_id.as_str()
    }
}

/// Durable client-side receipt storage
pub trait ReceiptStore: Send + Sync {
    /// Load the stored receipt. Corrupt records load as `None`.
    fn load(&self) -> Result<Option<Receipt>>;

    /// Store the receipt, replacing any previous one
    fn save(&self, receipt: &Receipt) -> Result<()>;

    /// Remove the stored receipt
    fn clear(&self) -> Result<()>;
}

/// In-memory receipt store (for development/testing)
#[derive(Default)]
pub struct MemoryReceiptStore {
    receipt: RwLock<Option<Receipt>>,
}

impl MemoryReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a previously persisted receipt
    pub fn with_receipt(receipt: Receipt) -> Self {
        Self {
            receipt: RwLock::new(Some(receipt)),
        }
    }
}

fn poisoned<T>(_: T) -> CheckoutError {
    CheckoutError::Storage("receipt store lock poisoned".into())
}

impl ReceiptStore for MemoryReceiptStore {
    fn load(&self) -> Result<Option<Receipt>> {
        Ok(self.receipt.read().map_err(poisoned)?.clone())
    }

    fn save(&self, receipt: &Receipt) -> Result<()> {
        *self.receipt.write().map_err(poisoned)? = Some(receipt.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.receipt.write().map_err(poisoned)? = None;
        Ok(())
    }
}

/// JSON file store: one file named after [`RECEIPT_KEY`] inside a profile
/// directory, so it survives restarts of the same profile.
pub struct FileReceiptStore {
    path: PathBuf,
}

impl FileReceiptStore {
    pub fn new(profile_dir: impl AsRef<Path>) -> Self {
        Self {
            path: profile_dir.as_ref().join(format!("{RECEIPT_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReceiptStore for FileReceiptStore {
    fn load(&self) -> Result<Option<Receipt>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CheckoutError::Storage(e.to_string())),
        };

        match serde_json::from_str(&raw) {
            Ok(receipt) => Ok(Some(receipt)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring corrupt receipt");
                Ok(None)
            }
        }
    }

    fn save(&self, receipt: &Receipt) -> Result<()> {
        let storage = |e: std::io::Error| CheckoutError::Storage(e.to_string());

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(storage)?;
        }

        let json = serde_json::to_string(receipt)
            .map_err(|e| CheckoutError::Storage(e.to_string()))?;

        // Write-then-rename so a crash never leaves a half-written record
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(storage)?;
        fs::rename(&tmp, &self.path).map_err(storage)
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CheckoutError::Storage(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn receipt(order_id: &str, capture_id: &str) -> Receipt {
        Receipt {
            paid: true,
            ts: Utc::now(),
            order_id: order_id.into(),
            capture_id: capture_id.into(),
            payer_email: "buyer@example.com".into(),
            amount: "85.00".into(),
            currency: "USD".into(),
            service: "aiReel".into(),
            package: "standard".into(),
            addons: vec!["rush".into()],
        }
    }

    #[test]
    fn test_validity() {
        assert!(receipt("ABC123", "CAP987").is_valid());
        assert!(!receipt("ABC123", "").is_valid());
        assert!(!receipt(" ", "CAP987").is_valid());

        let mut unpaid = receipt("ABC123", "CAP987");
        unpaid.paid = false;
        assert!(!unpaid.is_valid());
    }

    #[test]
    fn test_json_shape() {
        let value = serde_json::to_value(receipt("ABC123", "CAP987")).unwrap();
        assert_eq!(value["paid"], json!(true));
        assert_eq!(value["orderID"], json!("ABC123"));
        assert_eq!(value["captureID"], json!("CAP987"));
        assert_eq!(value["payerEmail"], json!("buyer@example.com"));
        assert_eq!(value["package"], json!("standard"));
        assert!(value["ts"].is_string());
    }

    #[test]
    fn test_from_capture() {
        let quote = sff_core::Catalog::standard()
            .price_order("aiReel", "standard", &["rush"])
            .unwrap();
        let capture = CaptureResponse {
            success: true,
            order_id: "ABC123".into(),
            status: "COMPLETED".into(),
            capture_id: "CAP987".into(),
            amount: "85.00".into(),
            currency: "USD".into(),
            payer_email: String::new(),
        };

        let r = Receipt::from_capture(&OrderId::parse("ABC123").unwrap(), &capture, Some(&quote));
        assert!(r.is_valid());
        assert_eq!(r.amount, "85.00");
        assert_eq!(r.service, "aiReel");
        assert_eq!(r.package, "standard");
        assert_eq!(r.addons, vec!["rush".to_string()]);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryReceiptStore::new();
        assert_eq!(store.load().unwrap(), None);

        let r = receipt("ABC123", "CAP987");
        store.save(&r).unwrap();
        assert_eq!(store.load().unwrap(), Some(r));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let r = receipt("ABC123", "CAP987");

        FileReceiptStore::new(dir.path()).save(&r).unwrap();

        let reopened = FileReceiptStore::new(dir.path());
        assert!(reopened.path().ends_with("sff_paid_receipt_v1.json"));
        assert_eq!(reopened.load().unwrap(), Some(r));

        reopened.clear().unwrap();
        reopened.clear().unwrap();
        assert_eq!(reopened.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_ignores_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileReceiptStore::new(dir.path());
        fs::write(store.path(), "{not json").unwrap();

        assert_eq!(store.load().unwrap(), None);
    }
}
