//! Checkout Driver
//!
//! Runs the network side of the checkout and feeds outcomes into
//! [`CheckoutState::apply`]. Observers follow the state through a
//! `watch` channel.
//!
//! At most one gateway request (create or capture) is in flight per
//! machine. A completed capture is persisted before the machine reports
//! `PAID`, and the intake form unlocks exactly once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sff_core::wire::CreateOrderRequest;
use sff_core::{Catalog, OrderId, Quote};
use tokio::sync::watch;
use url::form_urlencoded;

use crate::backend::CheckoutBackend;
use crate::error::{CheckoutError, Result};
use crate::loader::{GatewayHandle, GatewayLoader};
use crate::receipt::{Receipt, ReceiptStore};
use crate::state::{CheckoutEvent, CheckoutState, Phase};

const STATUS_COMPLETED: &str = "COMPLETED";
const ABANDONED_REASON: &str = "Payment request was interrupted";

/// What a page load found in its query string
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReturnOutcome {
    /// Not a gateway return
    NoReturn,

    /// Buyer cancelled at the gateway
    Cancelled,

    /// The returned order was already captured; no new capture was made
    AlreadyPaid(Receipt),

    /// The returned order was captured now
    Captured(Receipt),
}

/// Holds the in-flight flag until dropped. While armed, dropping the guard
/// also fails the attempt, so a cancelled call never leaves the state in
/// `ORDER_CREATING` or `CAPTURING`.
struct InFlightGuard<'a> {
    machine: &'a CheckoutMachine,
    on_abandon: Option<CheckoutEvent>,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(machine: &'a CheckoutMachine) -> Option<Self> {
        machine
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                machine,
                on_abandon: None,
            })
    }

    fn arm(&mut self, event: CheckoutEvent) {
        self.on_abandon = Some(event);
    }

    fn disarm(&mut self) {
        self.on_abandon = None;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(event) = self.on_abandon.take() {
            tracing::warn!(event = event.name(), "Request abandoned before completion");
            if let Err(e) = self.machine.transition(event) {
                tracing::warn!(error = %e, "Could not fail abandoned request");
            }
        }
        // Released after the state leaves the request phase
        self.machine.in_flight.store(false, Ordering::Release);
    }
}

/// Checkout session for one storefront page
pub struct CheckoutMachine {
    backend: Arc<dyn CheckoutBackend>,
    store: Arc<dyn ReceiptStore>,
    catalog: Arc<Catalog>,
    loader: GatewayLoader,
    state: watch::Sender<CheckoutState>,
    in_flight: AtomicBool,
    unlocked: AtomicBool,
}

impl CheckoutMachine {
    pub fn new(
        backend: Arc<dyn CheckoutBackend>,
        store: Arc<dyn ReceiptStore>,
        catalog: Arc<Catalog>,
    ) -> Self {
        let (state, _) = watch::channel(CheckoutState::Idle);

        Self {
            loader: GatewayLoader::new(backend.clone()),
            backend,
            store,
            catalog,
            state,
            in_flight: AtomicBool::new(false),
            unlocked: AtomicBool::new(false),
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> CheckoutState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase()
    }

    /// Follow state changes
    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.state.subscribe()
    }

    /// Intake form is enabled iff the state is `PAID`
    pub fn intake_enabled(&self) -> bool {
        self.state.borrow().intake_enabled()
    }

    /// Whether the unlock side effect has run
    pub fn intake_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::Acquire)
    }

    pub fn is_ready_to_pay(&self) -> bool {
        !self.in_flight.load(Ordering::Acquire) && self.state.borrow().can_pay()
    }

    /// Load the gateway SDK parameters; shared across concurrent callers
    pub async fn ensure_gateway_client_ready(&self) -> Result<GatewayHandle> {
        self.loader.ensure_ready().await.cloned()
    }

    /// Enter `PAID` from a stored receipt without touching the network.
    /// Returns whether a valid receipt was found.
    pub fn restore_paid_state_on_load(&self) -> Result<bool> {
        let Some(receipt) = self.store.load()? else {
            return Ok(false);
        };

        if !receipt.is_valid() {
            tracing::warn!(order_id = %receipt.order_id, "Ignoring incomplete stored receipt");
            return Ok(false);
        }

        tracing::info!(order_id = %receipt.order_id, "Restoring paid state");
        self.transition(CheckoutEvent::ReceiptRestored(receipt))?;
        self.unlock();
        Ok(true)
    }

    /// Price a selection. An invalid selection returns the state to `IDLE`.
    pub fn select(&self, request: &CreateOrderRequest) -> Result<Quote> {
        let priced = self
            .catalog
            .price_order(&request.service, &request.package, &request.addons);

        self.transition(CheckoutEvent::SelectionChanged(priced.as_ref().ok().cloned()))?;
        Ok(priced?)
    }

    pub fn clear_selection(&self) -> Result<()> {
        self.transition(CheckoutEvent::SelectionChanged(None))
            .map(|_| ())
    }

    /// Create a gateway order for the current selection
    pub async fn pay(&self) -> Result<OrderId> {
        let mut guard = InFlightGuard::acquire(self).ok_or_else(|| self.busy())?;

        self.transition(CheckoutEvent::PayRequested)?;
        guard.arm(CheckoutEvent::OrderFailed(ABANDONED_REASON.into()));

        let request = self
            .state
            .borrow()
            .quote()
            .map(order_request)
            .ok_or(CheckoutError::NotReady)?;

        match self.backend.create_order(&request).await {
            Ok(order_id) => {
                self.transition(CheckoutEvent::OrderCreated(order_id.clone()))?;
                guard.disarm();
                Ok(order_id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Create order failed");
                guard.disarm();
                self.transition(CheckoutEvent::OrderFailed(e.to_string()))?;
                Err(e)
            }
        }
    }

    /// Capture an approved order. Safe to call repeatedly: an order that is
    /// already paid yields its receipt without another capture.
    pub async fn on_approve(&self, order_id: &OrderId) -> Result<Receipt> {
        if let Some(receipt) = self.known_receipt(order_id)? {
            return Ok(receipt);
        }

        let mut guard = InFlightGuard::acquire(self).ok_or_else(|| self.busy())?;

        self.transition(CheckoutEvent::Approved(order_id.clone()))?;
        guard.arm(CheckoutEvent::CaptureFailed(ABANDONED_REASON.into()));
        let quote = self.state.borrow().quote().cloned();

        match self.capture(order_id, quote.as_ref()).await {
            Ok(receipt) => {
                self.persist(&receipt);
                self.transition(CheckoutEvent::Captured(receipt.clone()))?;
                guard.disarm();
                self.unlock();
                Ok(receipt)
            }
            Err(e) => {
                tracing::warn!(%order_id, error = %e, "Capture failed");
                guard.disarm();
                self.transition(CheckoutEvent::CaptureFailed(e.to_string()))?;
                Err(e)
            }
        }
    }

    /// Handle a page load that may be a gateway redirect return
    pub async fn handle_return(&self, query: &str) -> Result<ReturnOutcome> {
        let mut token = None;
        let mut cancelled = false;

        for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "token" if !value.trim().is_empty() => token = Some(value.into_owned()),
                "cancel" => cancelled = value == "true",
                _ => {}
            }
        }

        if cancelled {
            if let Some(receipt) = self.state.borrow().receipt() {
                return Ok(ReturnOutcome::AlreadyPaid(receipt.clone()));
            }
            self.on_cancel()?;
            return Ok(ReturnOutcome::Cancelled);
        }

        let Some(token) = token else {
            return Ok(ReturnOutcome::NoReturn);
        };
        let order_id = OrderId::parse(&token)?;

        if let Some(receipt) = self.known_receipt(&order_id)? {
            return Ok(ReturnOutcome::AlreadyPaid(receipt));
        }

        self.on_approve(&order_id)
            .await
            .map(ReturnOutcome::Captured)
    }

    pub fn on_cancel(&self) -> Result<()> {
        tracing::info!("Payment cancelled by buyer");
        self.transition(CheckoutEvent::Cancelled).map(|_| ())
    }

    /// Gateway client reported an error outside a request
    pub fn on_error(&self, reason: impl Into<String>) -> Result<()> {
        let reason = reason.into();
        tracing::warn!(%reason, "Payment error");
        self.transition(CheckoutEvent::Errored(reason)).map(|_| ())
    }

    /// Leave `FAILED`, keeping the selection
    pub fn retry(&self) -> Result<()> {
        self.transition(CheckoutEvent::Retry).map(|_| ())
    }

    async fn capture(&self, order_id: &OrderId, quote: Option<&Quote>) -> Result<Receipt> {
        let response = self.backend.capture_order(order_id).await?;

        if !response.success || response.status != STATUS_COMPLETED {
            return Err(CheckoutError::CaptureIncomplete {
                status: response.status.clone(),
                details: serde_json::to_value(&response).unwrap_or_default(),
            });
        }

        let receipt = Receipt::from_capture(order_id, &response, quote);
        if !receipt.is_valid() {
            return Err(CheckoutError::MissingCaptureId);
        }

        tracing::info!(
            %order_id,
            capture_id = %receipt.capture_id,
            amount = %receipt.amount,
            "Payment captured"
        );
        Ok(receipt)
    }

    /// Receipt for `order_id` already held in memory or in the store.
    /// Restoring from the store enters `PAID` without a capture.
    fn known_receipt(&self, order_id: &OrderId) -> Result<Option<Receipt>> {
        if let Some(receipt) = self.state.borrow().receipt() {
            return if receipt.is_for(order_id) {
                Ok(Some(receipt.clone()))
            } else {
                Err(CheckoutError::AlreadyPaid)
            };
        }

        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stored receipt");
                None
            }
        };

        match stored {
            Some(receipt) if receipt.is_valid() && receipt.is_for(order_id) => {
                tracing::info!(%order_id, "Order already paid, skipping capture");
                self.transition(CheckoutEvent::ReceiptRestored(receipt.clone()))?;
                self.unlock();
                Ok(Some(receipt))
            }
            _ => Ok(None),
        }
    }

    /// Store the receipt. A storage failure does not undo the payment.
    fn persist(&self, receipt: &Receipt) {
        match self.store.load() {
            Ok(Some(existing)) if existing.is_valid() && existing.order_id == receipt.order_id => {
                return;
            }
            Ok(Some(existing)) if existing.is_valid() => {
                tracing::warn!(
                    previous = %existing.order_id,
                    order_id = %receipt.order_id,
                    "Replacing receipt for a different order"
                );
            }
            _ => {}
        }

        if let Err(e) = self.store.save(receipt) {
            tracing::warn!(order_id = %receipt.order_id, error = %e, "Failed to persist receipt");
        }
    }

    /// Run the intake unlock side effect. Returns `true` only the first time.
    fn unlock(&self) -> bool {
        let first = !self.unlocked.swap(true, Ordering::AcqRel);
        if first {
            tracing::info!("Intake form unlocked");
        }
        first
    }

    fn busy(&self) -> CheckoutError {
        if self.phase() == Phase::Capturing {
            CheckoutError::CaptureInProgress
        } else {
            CheckoutError::RequestInFlight
        }
    }

    fn transition(&self, event: CheckoutEvent) -> Result<Phase> {
        let mut outcome = Err(CheckoutError::NotReady);

        self.state.send_if_modified(|state| {
            let from = state.phase();
            match state.clone().apply(event) {
                Ok(next) => {
                    let to = next.phase();
                    if from != to {
                        tracing::debug!(%from, %to, "Checkout transition");
                    }
                    let changed = *state != next;
                    *state = next;
                    outcome = Ok(to);
                    changed
                }
                Err(e) => {
                    outcome = Err(e);
                    false
                }
            }
        });

        outcome
    }
}

fn order_request(quote: &Quote) -> CreateOrderRequest {
    CreateOrderRequest {
        service: quote.service.clone(),
        package: quote.package.to_string(),
        addons: quote.addons.clone(),
    }
}
