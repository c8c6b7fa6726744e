//! Dashboard orchestrator
//!
//! Composition root for one admin view: a store handle, the request
//! collection, the status-edit session, and an optional change-feed
//! subscription. A dashboard instance is owned and driven by a single
//! coroutine; the feed hands events over a bounded channel and
//! [`pump_events`](Dashboard::pump_events) folds them in between user
//! actions.
//!
//! The same type backs the public borrow form
//! ([`submit_request`](Dashboard::submit_request)) and the admin table;
//! callers gate the admin paths with [`crate::auth::require_user`] first.

use chrono::Utc;
use log::{error, info, warn};

use crate::collection::{RequestCollection, SortKey, StatusFilter};
use crate::entity::{BorrowRequest, NewBorrowRequest, RequestStatus};
use crate::feed::{ChangeEvent, Subscription};
use crate::session::EditSession;
use crate::store::{InventoryStore, StoreError};

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::trace;

/// One active view over the borrow-request ledger.
pub struct Dashboard<S: InventoryStore> {
    store: S,
    collection: RequestCollection,
    session: EditSession,
    subscription: Option<Subscription>,
}

impl<S: InventoryStore> Dashboard<S> {
    /// Dashboard without live updates; call [`load`](Self::load) to fill it.
    pub fn new(store: S) -> Self {
        Self {
            store,
            collection: RequestCollection::new(),
            session: EditSession::new(),
            subscription: None,
        }
    }

    /// Dashboard fed by a change-feed subscription.
    pub fn with_feed(store: S, subscription: Subscription) -> Self {
        Self {
            store,
            collection: RequestCollection::new(),
            session: EditSession::new(),
            subscription: Some(subscription),
        }
    }

    /// Replace the collection with a fresh snapshot from the store, then
    /// drain any events that queued up while the snapshot was in flight.
    /// Search, filter, sort, and an open edit session are preserved.
    ///
    /// Returns the number of requests loaded.
    ///
    /// # Errors
    ///
    /// Propagates the store failure; the previous collection contents are
    /// left in place.
    pub fn load(&mut self) -> Result<usize, StoreError> {
        let requests = self.store.list_borrow_requests()?;
        let loaded = requests.len();
        self.collection.set_all(requests);
        // Events that raced the snapshot are absorbed by upsert/delete.
        self.pump_events();
        info!("dashboard loaded {loaded} borrow requests");
        Ok(loaded)
    }

    /// Non-blocking drain of the feed subscription into the collection.
    ///
    /// Returns how many events were applied. A dashboard without a feed
    /// always returns 0.
    pub fn pump_events(&mut self) -> usize {
        let Some(subscription) = self.subscription.as_ref() else {
            return 0;
        };
        let mut applied = 0;
        for event in subscription.drain() {
            match event {
                ChangeEvent::Insert(request) | ChangeEvent::Update(request) => {
                    self.collection.apply_upsert(request);
                }
                ChangeEvent::Delete(id) => {
                    // An open edit on the deleted row stays open; the next
                    // commit surfaces NotFound and triggers a resync.
                    self.collection.apply_delete(id);
                }
            }
            applied += 1;
        }
        applied
    }

    /// The public borrow form: validate, persist as `pending`, and fold the
    /// stored row into the collection. The feed's echo of this insert later
    /// lands as an idempotent upsert.
    ///
    /// # Errors
    ///
    /// `StoreError::Validation` before any write; store failures leave the
    /// collection untouched.
    pub fn submit_request(
        &mut self,
        mut input: NewBorrowRequest,
    ) -> Result<BorrowRequest, StoreError> {
        input.normalize();
        input.validate()?;

        let stored = self.store.insert_borrow_request(input)?;
        self.collection.apply_upsert(stored.clone());

        #[cfg(feature = "metrics")]
        METRICS.record_request_submitted();
        info!(
            "submitted borrow request id={} product_id={} total={}",
            stored.id, stored.product_id, stored.total
        );
        Ok(stored)
    }

    /// Open the status-edit dialog for a request currently in the
    /// collection. Returns false when the id is not present (stale link).
    pub fn open_edit(&mut self, id: i64) -> bool {
        match self.collection.get(id) {
            Some(request) => {
                self.session.open(request.clone());
                true
            }
            None => {
                warn!("open_edit: request {id} not in the collection");
                false
            }
        }
    }

    /// Stage a status choice in the open session. No-op when closed.
    pub fn change_status(&mut self, status: RequestStatus) {
        self.session.change_status(status);
    }

    /// Commit the staged status edit.
    ///
    /// Clean or closed sessions return `Ok(None)` without touching the
    /// store. On success the collection is updated and the session stays
    /// open and clean. When the edited row vanished upstream the
    /// collection is reloaded to resync, the error is still returned, and
    /// the session is left open so the dialog can show it.
    ///
    /// # Errors
    ///
    /// Store failures pass through with the session state unchanged.
    pub fn apply_changes(&mut self) -> Result<Option<BorrowRequest>, StoreError> {
        #[cfg(feature = "tracing")]
        let _span = trace::commit_span().entered();

        match self
            .session
            .commit(&self.store, &mut self.collection, Utc::now())
        {
            Ok(committed) => {
                #[cfg(feature = "metrics")]
                if committed.is_some() {
                    METRICS.record_status_commit();
                }
                Ok(committed)
            }
            Err(err) if err.is_not_found() => {
                warn!("status commit target missing upstream; reloading request list");
                if let Err(reload_err) = self.load() {
                    error!("reload after missing commit target failed: {reload_err}");
                }
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Close the edit dialog, discarding any staged change.
    pub fn close_edit(&mut self) {
        self.session.close();
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.collection.set_search(term);
    }

    pub fn set_status_filter(&mut self, filter: StatusFilter) {
        self.collection.set_status_filter(filter);
    }

    pub fn request_sort(&mut self, key: SortKey) {
        self.collection.request_sort(key);
    }

    /// The filtered, sorted projection for rendering.
    pub fn view(&self) -> Vec<&BorrowRequest> {
        self.collection.view()
    }

    /// `(shown, total)` for the "Showing X of Y requests" line.
    pub fn counts(&self) -> (usize, usize) {
        self.collection.counts()
    }

    pub fn collection(&self) -> &RequestCollection {
        &self.collection
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
