//! Per-visit state: session, cart and checkout progress.
//!
//! A visit is single-writer. All access goes through its mutex in short,
//! synchronous critical sections; no lock is held across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use moka::future::Cache;
use moka::notification::RemovalCause;
use soko_core::{SessionContext, SessionToken};

use crate::cart::{CartStorage, CartStore, cart_key};
use crate::checkout::SubmissionState;

/// Visits idle for longer than this are torn down.
const VISIT_IDLE_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

const MAX_VISITS: u64 = 10_000;

/// Shared handle to a visit.
pub type VisitHandle = Arc<Mutex<Visit>>;

/// One page view.
#[derive(Debug)]
pub struct Visit {
    session: Option<SessionContext>,
    cart: CartStore,
    submission: SubmissionState,
    closed: bool,
}

impl Visit {
    /// Start a visit over an already-restored cart.
    #[must_use]
    pub const fn new(session: Option<SessionContext>, cart: CartStore) -> Self {
        Self {
            session,
            cart,
            submission: SubmissionState::Idle,
            closed: false,
        }
    }

    #[must_use]
    pub const fn session(&self) -> Option<&SessionContext> {
        self.session.as_ref()
    }

    pub fn set_session(&mut self, session: SessionContext) {
        self.session = Some(session);
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub const fn cart_mut(&mut self) -> &mut CartStore {
        &mut self.cart
    }

    #[must_use]
    pub const fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    pub fn set_submission(&mut self, state: SubmissionState) {
        self.submission = state;
    }

    /// Whether the visit has been torn down.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mark the visit torn down; in-flight results are then discarded.
    pub const fn close(&mut self) {
        self.closed = true;
    }
}

/// Lock a visit, recovering from a poisoned mutex.
pub fn lock(visit: &Mutex<Visit>) -> MutexGuard<'_, Visit> {
    visit.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Open visits keyed by session token.
pub struct VisitRegistry {
    visits: Cache<SessionToken, VisitHandle>,
    storage: Arc<dyn CartStorage>,
}

impl VisitRegistry {
    #[must_use]
    pub fn new(storage: Arc<dyn CartStorage>) -> Self {
        let visits = Cache::builder()
            .max_capacity(MAX_VISITS)
            .time_to_idle(VISIT_IDLE_TIMEOUT)
            .eviction_listener(|token: Arc<SessionToken>, visit: VisitHandle, cause| {
                if cause != RemovalCause::Replaced {
                    tracing::debug!(session = ?token, ?cause, "Visit ended");
                    lock(&visit).close();
                }
            })
            .build();

        Self { visits, storage }
    }

    /// The visit for `session`, restoring its cart on first access.
    ///
    /// An existing visit keeps its cart and picks up the newer session context.
    pub async fn open(&self, session: SessionContext) -> VisitHandle {
        let token = session.token.clone();
        let storage = Arc::clone(&self.storage);
        let initial = session.clone();

        let visit = self
            .visits
            .get_with(token, async move {
                let cart = CartStore::restore(storage, cart_key(&initial.token));
                tracing::info!(session = ?initial.token, lines = cart.lines().len(), "Visit opened");
                Arc::new(Mutex::new(Visit::new(Some(initial), cart)))
            })
            .await;

        lock(&visit).set_session(session);
        visit
    }

    /// The open visit for `token`, if any.
    pub async fn get(&self, token: &SessionToken) -> Option<VisitHandle> {
        self.visits.get(token).await
    }

    /// Tear down the visit for `token`. Returns whether one was open.
    pub async fn end_visit(&self, token: &SessionToken) -> bool {
        match self.visits.remove(token).await {
            Some(visit) => {
                lock(&visit).close();
                true
            }
            None => false,
        }
    }
}
