//! Status-edit session
//!
//! The dialog flow for changing one request's status: select a row, pick a
//! tentative status, then apply or discard. One enum owns the whole state,
//! and dirtiness is derived from the data instead of being a separate flag
//! that could contradict it.

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::collection::RequestCollection;
use crate::entity::{BorrowRequest, RequestStatus};
use crate::store::{InventoryStore, StoreError};

/// Edit-dialog state. `Closed` holds nothing; `Open` holds the selected
/// row and the tentatively edited status.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EditSession {
    #[default]
    Closed,
    Open {
        selected: BorrowRequest,
        edited: RequestStatus,
    },
}

impl EditSession {
    pub fn new() -> Self {
        EditSession::Closed
    }

    /// Open the dialog on a row. The edited status starts at the row's
    /// current status, so a fresh session is never dirty.
    pub fn open(&mut self, request: BorrowRequest) {
        debug!("edit session opened for request id={}", request.id);
        *self = EditSession::Open {
            edited: request.status,
            selected: request,
        };
    }

    /// Discard all edit state. Close never saves; an uncommitted edit is
    /// intentionally lost.
    pub fn close(&mut self) {
        if self.dirty() {
            debug!("edit session closed with uncommitted changes discarded");
        }
        *self = EditSession::Closed;
    }

    pub fn is_open(&self) -> bool {
        matches!(self, EditSession::Open { .. })
    }

    pub fn selected(&self) -> Option<&BorrowRequest> {
        match self {
            EditSession::Open { selected, .. } => Some(selected),
            EditSession::Closed => None,
        }
    }

    pub fn edited_status(&self) -> Option<RequestStatus> {
        match self {
            EditSession::Open { edited, .. } => Some(*edited),
            EditSession::Closed => None,
        }
    }

    /// Set the tentative status. Ignored while closed.
    pub fn change_status(&mut self, new_status: RequestStatus) {
        match self {
            EditSession::Open { edited, .. } => *edited = new_status,
            EditSession::Closed => {
                warn!("change_status ignored: no edit session is open");
            }
        }
    }

    /// True iff the tentative status differs from the selected row's
    /// committed status.
    pub fn dirty(&self) -> bool {
        match self {
            EditSession::Open { selected, edited } => *edited != selected.status,
            EditSession::Closed => false,
        }
    }

    /// Write the edited status through the store and fold the refreshed row
    /// back into the collection.
    ///
    /// A clean or closed session is a no-op returning `Ok(None)`. On
    /// success the session stays open on the updated row (now clean) and
    /// the committed row is returned. On failure nothing changes: the
    /// session stays open and dirty with the edited status still shown,
    /// and the error goes to the caller for display.
    ///
    /// # Errors
    ///
    /// Propagates the store failure, `StoreError::NotFound` included.
    pub fn commit<S: InventoryStore>(
        &mut self,
        store: &S,
        collection: &mut RequestCollection,
        now: DateTime<Utc>,
    ) -> Result<Option<BorrowRequest>, StoreError> {
        if !self.dirty() {
            return Ok(None);
        }
        let (id, edited) = match self {
            EditSession::Open { selected, edited } => (selected.id, *edited),
            EditSession::Closed => return Ok(None),
        };

        let updated = store.update_borrow_request_status(id, edited, now)?;
        debug!("committed status {} for request id={id}", updated.status);

        collection.apply_upsert(updated.clone());
        *self = EditSession::Open {
            edited: updated.status,
            selected: updated.clone(),
        };
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{NewBorrowRequest, NewProduct, ProductStatus, SchoolClass};
    use crate::store::MemoryStore;

    fn seeded_store() -> (MemoryStore, BorrowRequest) {
        let store = MemoryStore::new();
        let product = store
            .insert_product(NewProduct {
                name: "Laptop".to_string(),
                total_stock: 5,
                status: ProductStatus::Available,
            })
            .expect("insert product");
        let request = store
            .insert_borrow_request(NewBorrowRequest {
                product_id: product.id,
                total: 2,
                requester_name: "Budi".to_string(),
                class: SchoolClass::XTkj1,
                comment: None,
            })
            .expect("insert request");
        (store, request)
    }

    #[test]
    fn test_open_starts_clean() {
        let (_, request) = seeded_store();
        let mut session = EditSession::new();
        session.open(request.clone());

        assert!(session.is_open());
        assert!(!session.dirty());
        assert_eq!(session.edited_status(), Some(request.status));
    }

    #[test]
    fn test_dirty_follows_the_edited_status() {
        let (_, request) = seeded_store();
        let mut session = EditSession::new();
        session.open(request);

        // Re-selecting the current status is not a change.
        session.change_status(RequestStatus::Pending);
        assert!(!session.dirty());

        session.change_status(RequestStatus::Borrowed);
        assert!(session.dirty());

        session.change_status(RequestStatus::Pending);
        assert!(!session.dirty(), "back to original means clean again");
    }

    #[test]
    fn test_commit_is_a_noop_when_clean() {
        let (store, request) = seeded_store();
        let mut session = EditSession::new();
        let mut collection = RequestCollection::new();
        session.open(request.clone());

        let committed = session
            .commit(&store, &mut collection, Utc::now())
            .expect("commit");
        assert!(committed.is_none());
        assert!(collection.is_empty(), "nothing folded into the collection");

        let stored = store.list_borrow_requests().expect("list");
        assert_eq!(stored[0].status, request.status, "store untouched");
    }

    #[test]
    fn test_commit_writes_through_and_stays_open_clean() {
        let (store, request) = seeded_store();
        let mut session = EditSession::new();
        let mut collection = RequestCollection::new();
        collection.set_all(vec![request.clone()]);
        session.open(request.clone());
        session.change_status(RequestStatus::Borrowed);

        let now = Utc::now();
        let committed = session
            .commit(&store, &mut collection, now)
            .expect("commit")
            .expect("a row was written");

        assert_eq!(committed.status, RequestStatus::Borrowed);
        assert_eq!(committed.updated_at, now);

        // Session stays open on the refreshed row, clean.
        assert!(session.is_open());
        assert!(!session.dirty());
        assert_eq!(
            session.selected().expect("open").status,
            RequestStatus::Borrowed
        );

        // Collection saw the same refreshed row.
        assert_eq!(
            collection.get(request.id).expect("in collection").status,
            RequestStatus::Borrowed
        );

        // Store agrees.
        let stored = store.list_borrow_requests().expect("list");
        assert_eq!(stored[0].status, RequestStatus::Borrowed);
    }

    #[test]
    fn test_commit_failure_leaves_the_session_untouched() {
        let (store, mut request) = seeded_store();
        // Point the session at a row the store no longer knows.
        request.id = 999;
        let mut session = EditSession::new();
        let mut collection = RequestCollection::new();
        session.open(request);
        session.change_status(RequestStatus::Rejected);

        let err = session
            .commit(&store, &mut collection, Utc::now())
            .unwrap_err();
        assert!(err.is_not_found());

        // Still open, still dirty, edited status still shown.
        assert!(session.is_open());
        assert!(session.dirty());
        assert_eq!(session.edited_status(), Some(RequestStatus::Rejected));
        assert!(collection.is_empty(), "failure applied nothing");
    }

    #[test]
    fn test_close_discards_edits() {
        let (_, request) = seeded_store();
        let mut session = EditSession::new();
        session.open(request);
        session.change_status(RequestStatus::Returned);

        session.close();
        assert!(!session.is_open());
        assert!(!session.dirty());
        assert_eq!(session.selected(), None);
    }

    #[test]
    fn test_change_status_while_closed_is_ignored() {
        let mut session = EditSession::new();
        session.change_status(RequestStatus::Borrowed);
        assert!(!session.is_open());
        assert_eq!(session.edited_status(), None);
    }
}
