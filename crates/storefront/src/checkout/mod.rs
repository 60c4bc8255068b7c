//! Checkout submission.
//!
//! # Flow
//!
//! 1. Under the visit lock: check preconditions (session, non-empty cart, no
//!    submission in flight), snapshot the order payload and move the visit
//!    to [`SubmissionState::Submitting`]
//! 2. Without any lock: submit the snapshot to the [`OrderApi`]
//! 3. Under the visit lock again: record the outcome. On success the cart is
//!    cleared and the [`OnOrderConfirmed`] handoff runs; on failure the cart
//!    is left exactly as it is
//!
//! A visit torn down during step 2 is never touched in step 3. If the
//! submission future is dropped during step 2 (the client went away), the
//! visit moves to [`SubmissionState::Failed`] so the next attempt is accepted.

pub mod client;
pub mod handoff;

use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;
use soko_core::{CartLine, OrderId, Price};
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::visit::{Visit, lock};

pub use client::{
    IDEMPOTENCY_KEY_HEADER, OrderApi, OrderApiError, OrderClient, OrderItem, OrderReceipt,
    OrderRequest,
};
pub use handoff::{
    CheckoutHandoff, ConfirmedOrder, OnOrderConfirmed, ParentFrameMessage, WhatsAppRedirect,
};

const GENERIC_FAILURE: &str = "We couldn't place your order. Please try again.";

const INTERRUPTED: &str = "Your order submission was interrupted. Please try again.";

/// Per-visit submission state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    Succeeded { order_id: OrderId },
    Failed { reason: String },
}

/// Errors placing an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// No session context for this visit.
    #[error("Open the shop from the link you received to place an order")]
    MissingSession,

    /// Nothing to order.
    #[error("Your cart is empty")]
    EmptyCart,

    /// A submission for this visit is already in flight.
    #[error("Your order is already being submitted")]
    AlreadySubmitting,

    /// The order service declined the order.
    #[error("{detail}")]
    Rejected { detail: String },

    /// The order service could not be reached or answered nonsense.
    #[error("{0}")]
    Transport(String),

    /// The visit ended while the order was in flight.
    #[error("This visit has ended")]
    VisitClosed,
}

impl CheckoutError {
    /// Stable reason code for clients.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::MissingSession => "missing_session",
            Self::EmptyCart => "empty_cart",
            Self::AlreadySubmitting => "submission_in_progress",
            Self::Rejected { .. } => "order_rejected",
            Self::Transport(_) => "order_failed",
            Self::VisitClosed => "visit_closed",
        }
    }
}

impl From<OrderApiError> for CheckoutError {
    fn from(err: OrderApiError) -> Self {
        match err {
            OrderApiError::Rejected { detail, .. } => Self::Rejected {
                detail: detail.unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            },
            OrderApiError::Http(_) | OrderApiError::InvalidResponse(_) => {
                Self::Transport(GENERIC_FAILURE.to_string())
            }
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderConfirmation {
    pub order_id: OrderId,
    pub items: Vec<OrderItem>,
    pub total: Price,
    pub handoff: CheckoutHandoff,
}

/// Places orders for visits.
pub struct CheckoutSubmitter<A = OrderClient> {
    api: A,
    on_confirmed: Arc<dyn OnOrderConfirmed>,
}

impl<A: OrderApi> CheckoutSubmitter<A> {
    #[must_use]
    pub fn new(api: A, on_confirmed: Arc<dyn OnOrderConfirmed>) -> Self {
        Self { api, on_confirmed }
    }

    /// Submit the visit's cart as an order.
    ///
    /// Takes a weak handle: if the visit is dropped or closed before the
    /// order service answers, the result is discarded.
    ///
    /// # Errors
    ///
    /// Precondition errors ([`CheckoutError::MissingSession`],
    /// [`CheckoutError::EmptyCart`], [`CheckoutError::AlreadySubmitting`])
    /// are returned without contacting the order service.
    #[instrument(skip_all)]
    pub async fn place_order(
        &self,
        visit: &Weak<Mutex<Visit>>,
    ) -> Result<OrderConfirmation, CheckoutError> {
        let (request, lines) = {
            let handle = visit.upgrade().ok_or(CheckoutError::VisitClosed)?;
            let mut visit = lock(&handle);
            let snapshot = prepare(&visit)?;
            visit.set_submission(SubmissionState::Submitting);
            snapshot
        };

        let in_flight = InFlight { visit, armed: true };
        let idempotency_key = Uuid::new_v4();
        tracing::info!(
            items = request.items.len(),
            total = %request.total,
            %idempotency_key,
            "Submitting order"
        );
        let outcome = self.api.submit(&request, idempotency_key).await;
        in_flight.disarm();

        let Some(handle) = visit.upgrade() else {
            tracing::info!("Visit dropped during submission, discarding result");
            return Err(CheckoutError::VisitClosed);
        };
        let mut visit = lock(&handle);
        if visit.is_closed() {
            tracing::info!("Visit closed during submission, discarding result");
            return Err(CheckoutError::VisitClosed);
        }

        match outcome {
            Ok(receipt) => {
                visit.cart_mut().clear();
                visit.set_submission(SubmissionState::Succeeded {
                    order_id: receipt.order_id.clone(),
                });
                drop(visit);

                tracing::info!(order_id = %receipt.order_id, "Order placed");
                let handoff = self.on_confirmed.on_order_confirmed(&ConfirmedOrder {
                    order_id: receipt.order_id.clone(),
                    lines,
                    total: request.total,
                });

                Ok(OrderConfirmation {
                    order_id: receipt.order_id,
                    items: request.items,
                    total: request.total,
                    handoff,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Order submission failed");
                let error = CheckoutError::from(e);
                visit.set_submission(SubmissionState::Failed {
                    reason: error.to_string(),
                });
                Err(error)
            }
        }
    }
}

/// Moves a visit out of `Submitting` if the submission future is dropped
/// before the order service answers.
struct InFlight<'a> {
    visit: &'a Weak<Mutex<Visit>>,
    armed: bool,
}

impl InFlight<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Some(handle) = self.visit.upgrade() else {
            return;
        };
        let mut visit = lock(&handle);
        if *visit.submission() == SubmissionState::Submitting {
            tracing::warn!("Order submission cancelled before the order service answered");
            visit.set_submission(SubmissionState::Failed {
                reason: INTERRUPTED.to_string(),
            });
        }
    }
}

/// Check preconditions and snapshot the order payload.
fn prepare(visit: &Visit) -> Result<(OrderRequest, Vec<CartLine>), CheckoutError> {
    let session = visit.session().ok_or(CheckoutError::MissingSession)?;
    let cart = visit.cart();
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    if *visit.submission() == SubmissionState::Submitting {
        return Err(CheckoutError::AlreadySubmitting);
    }

    let lines = cart.lines().to_vec();
    let request = OrderRequest {
        session: session.identity_reference().to_string(),
        user_id: session.user_id.clone(),
        contact: session.contact.clone(),
        items: lines
            .iter()
            .map(|line| OrderItem {
                product_id: line.product.id.clone(),
                quantity: line.quantity.get(),
            })
            .collect(),
        total: cart.total_price(),
    };
    Ok((request, lines))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use soko_core::{Category, Product, ProductId, Quantity, SessionContext, SessionToken, Stock};
    use tokio::sync::Notify;

    use super::*;
    use crate::cart::{CartStorage, CartStore, MemoryStorage};

    /// Order API fake that records calls and answers from a fixed outcome.
    struct RecordingApi {
        calls: AtomicUsize,
        requests: Mutex<Vec<OrderRequest>>,
        respond: fn() -> Result<OrderReceipt, OrderApiError>,
        gate: Option<Arc<Notify>>,
    }

    impl RecordingApi {
        fn new(respond: fn() -> Result<OrderReceipt, OrderApiError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                respond,
                gate: None,
            }
        }

        fn gated(respond: fn() -> Result<OrderReceipt, OrderApiError>, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(respond)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl OrderApi for RecordingApi {
        async fn submit(
            &self,
            request: &OrderRequest,
            _idempotency_key: Uuid,
        ) -> Result<OrderReceipt, OrderApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            (self.respond)()
        }
    }

    fn accepted() -> Result<OrderReceipt, OrderApiError> {
        Ok(OrderReceipt {
            order_id: OrderId::parse("ord-1").unwrap(),
        })
    }

    fn rejected() -> Result<OrderReceipt, OrderApiError> {
        Err(OrderApiError::Rejected {
            status: 422,
            detail: Some("Out of stock: Yam".to_string()),
        })
    }

    fn yam() -> Product {
        Product {
            id: ProductId::parse("yam").unwrap(),
            name: "Yam".to_string(),
            price: Price::from_minor_units(850),
            unit: "tuber".to_string(),
            category: Category::parse("tubers").unwrap(),
            description: None,
            image: None,
            available_stock: Stock::new(10),
        }
    }

    fn visit(session: Option<&str>, quantity: i64) -> Arc<Mutex<Visit>> {
        let storage: Arc<dyn CartStorage> = Arc::new(MemoryStorage::new());
        let mut cart = CartStore::restore(storage, "soko.cart.test");
        if quantity > 0 {
            cart.add(yam(), Quantity::clamped(quantity));
        }
        let session =
            session.map(|token| SessionContext::from_token(SessionToken::parse(token).unwrap()));
        Arc::new(Mutex::new(Visit::new(session, cart)))
    }

    fn submitter(api: RecordingApi) -> CheckoutSubmitter<RecordingApi> {
        CheckoutSubmitter::new(
            api,
            Arc::new(WhatsAppRedirect::new("2348000000000", soko_core::CurrencyCode::GHS)),
        )
    }

    #[tokio::test]
    async fn test_missing_session_makes_no_call() {
        let submitter = submitter(RecordingApi::new(accepted));
        let visit = visit(None, 2);

        let err = submitter.place_order(&Arc::downgrade(&visit)).await.unwrap_err();

        assert_eq!(err.reason(), "missing_session");
        assert_eq!(submitter.api.calls(), 0);
        assert_eq!(*lock(&visit).submission(), SubmissionState::Idle);
    }

    #[tokio::test]
    async fn test_empty_cart_makes_no_call() {
        let submitter = submitter(RecordingApi::new(accepted));
        let visit = visit(Some("tok"), 0);

        let err = submitter.place_order(&Arc::downgrade(&visit)).await.unwrap_err();

        assert_eq!(err, CheckoutError::EmptyCart);
        assert_eq!(submitter.api.calls(), 0);
    }

    #[tokio::test]
    async fn test_success_clears_cart_and_hands_off() {
        let submitter = submitter(RecordingApi::new(accepted));
        let visit = visit(Some("tok"), 5);

        let confirmation = submitter.place_order(&Arc::downgrade(&visit)).await.unwrap();

        assert_eq!(confirmation.order_id.as_str(), "ord-1");
        assert_eq!(confirmation.total.to_string(), "42.50");
        assert!(matches!(confirmation.handoff, CheckoutHandoff::Redirect { .. }));
        let visit = lock(&visit);
        assert!(visit.cart().is_empty());
        assert!(matches!(visit.submission(), SubmissionState::Succeeded { .. }));

        let sent = submitter.api.requests.lock().unwrap();
        assert_eq!(sent[0].session, "tok");
        assert_eq!(sent[0].items[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_rejection_leaves_cart_intact() {
        let submitter = submitter(RecordingApi::new(rejected));
        let visit = visit(Some("tok"), 2);
        let before = lock(&visit).cart().cart().clone();

        let err = submitter.place_order(&Arc::downgrade(&visit)).await.unwrap_err();

        assert_eq!(
            err,
            CheckoutError::Rejected {
                detail: "Out of stock: Yam".to_string()
            }
        );
        let visit = lock(&visit);
        assert_eq!(*visit.cart().cart(), before);
        assert_eq!(
            *visit.submission(),
            SubmissionState::Failed {
                reason: "Out of stock: Yam".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_failed_state_accepts_retry() {
        let visit = visit(Some("tok"), 2);
        let failing = submitter(RecordingApi::new(rejected));
        assert!(failing.place_order(&Arc::downgrade(&visit)).await.is_err());

        let working = submitter(RecordingApi::new(accepted));
        assert!(working.place_order(&Arc::downgrade(&visit)).await.is_ok());
    }

    #[tokio::test]
    async fn test_second_submission_while_in_flight_is_rejected() {
        let gate = Arc::new(Notify::new());
        let submitter = Arc::new(submitter(RecordingApi::gated(accepted, Arc::clone(&gate))));
        let visit = visit(Some("tok"), 2);

        let first = {
            let submitter = Arc::clone(&submitter);
            let weak = Arc::downgrade(&visit);
            tokio::spawn(async move { submitter.place_order(&weak).await })
        };
        while *lock(&visit).submission() != SubmissionState::Submitting {
            tokio::task::yield_now().await;
        }

        let second = submitter.place_order(&Arc::downgrade(&visit)).await;
        assert_eq!(second.unwrap_err(), CheckoutError::AlreadySubmitting);
        assert_eq!(submitter.api.calls(), 1);

        gate.notify_one();
        assert!(first.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_payload_is_snapshotted_before_await() {
        let gate = Arc::new(Notify::new());
        let submitter = Arc::new(submitter(RecordingApi::gated(accepted, Arc::clone(&gate))));
        let visit = visit(Some("tok"), 2);

        let task = {
            let submitter = Arc::clone(&submitter);
            let weak = Arc::downgrade(&visit);
            tokio::spawn(async move { submitter.place_order(&weak).await })
        };
        while *lock(&visit).submission() != SubmissionState::Submitting {
            tokio::task::yield_now().await;
        }

        lock(&visit).cart_mut().set_quantity(&yam().id, 9);
        gate.notify_one();

        let confirmation = task.await.unwrap().unwrap();
        assert_eq!(confirmation.items[0].quantity, 2);
        assert_eq!(confirmation.total.to_string(), "17.00");
    }

    #[tokio::test]
    async fn test_closed_visit_discards_result() {
        let gate = Arc::new(Notify::new());
        let submitter = Arc::new(submitter(RecordingApi::gated(accepted, Arc::clone(&gate))));
        let visit = visit(Some("tok"), 2);

        let task = {
            let submitter = Arc::clone(&submitter);
            let weak = Arc::downgrade(&visit);
            tokio::spawn(async move { submitter.place_order(&weak).await })
        };
        while *lock(&visit).submission() != SubmissionState::Submitting {
            tokio::task::yield_now().await;
        }

        lock(&visit).close();
        gate.notify_one();

        assert_eq!(task.await.unwrap().unwrap_err(), CheckoutError::VisitClosed);
        let visit = lock(&visit);
        assert_eq!(visit.cart().total_items(), 2);
        assert_eq!(*visit.submission(), SubmissionState::Submitting);
    }

    #[tokio::test]
    async fn test_cancelled_submission_accepts_retry() {
        let gate = Arc::new(Notify::new());
        let stalled = submitter(RecordingApi::gated(accepted, gate));
        let visit = visit(Some("tok"), 2);

        let attempt = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            stalled.place_order(&Arc::downgrade(&visit)),
        )
        .await;
        assert!(attempt.is_err());
        assert_eq!(stalled.api.calls(), 1);
        assert_eq!(
            *lock(&visit).submission(),
            SubmissionState::Failed {
                reason: INTERRUPTED.to_string()
            }
        );
        assert_eq!(lock(&visit).cart().total_items(), 2);

        let working = submitter(RecordingApi::new(accepted));
        let confirmation = working.place_order(&Arc::downgrade(&visit)).await.unwrap();
        assert_eq!(confirmation.order_id.as_str(), "ord-1");
        assert!(lock(&visit).cart().is_empty());
    }

    #[test]
    fn test_transport_error_reason_is_generic() {
        let err = CheckoutError::from(OrderApiError::InvalidResponse("bad".to_string()));
        assert_eq!(err.reason(), "order_failed");
        assert_eq!(err.to_string(), GENERIC_FAILURE);
    }
}
