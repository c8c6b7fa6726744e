//! Borrow-request collection
//!
//! The in-memory working set behind the dashboard table: holds every known
//! request keyed by id, folds in change-feed events idempotently, and
//! projects a searched/filtered/sorted view on demand. The collection is a
//! cache of store state, never the authority; writes go through the store
//! and come back via [`apply_upsert`](RequestCollection::apply_upsert).

use std::cmp::Ordering;

use log::debug;

use crate::entity::{BorrowRequest, RequestStatus};

/// Columns the dashboard table can sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    ProductName,
    RequesterName,
    Class,
    Total,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// The single active sort: one key, one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

/// Status filter for the view; `All` passes everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(RequestStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: RequestStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

/// Id-keyed request set plus the three view parameters.
#[derive(Debug, Default)]
pub struct RequestCollection {
    requests: Vec<BorrowRequest>,
    search: String,
    status_filter: StatusFilter,
    sort: Option<SortSpec>,
}

impl RequestCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole known set. Used on initial load and on reload
    /// after a resync; view parameters are kept.
    pub fn set_all(&mut self, requests: Vec<BorrowRequest>) {
        debug!("collection reset with {} requests", requests.len());
        self.requests = requests;
    }

    /// Insert if the id is unknown, otherwise overwrite the existing entry.
    ///
    /// Last write wins, and applying the same payload twice leaves the
    /// collection identical to applying it once. Feed updates for ids this
    /// collection has never seen land here as inserts rather than being
    /// dropped.
    pub fn apply_upsert(&mut self, request: BorrowRequest) {
        match self.requests.iter_mut().find(|r| r.id == request.id) {
            Some(existing) => {
                debug!("upsert overwrote request id={}", request.id);
                *existing = request;
            }
            None => {
                debug!("upsert inserted request id={}", request.id);
                self.requests.push(request);
            }
        }
    }

    /// Remove by id; unknown ids are a no-op. Returns whether a row left.
    pub fn apply_delete(&mut self, id: i64) -> bool {
        let before = self.requests.len();
        self.requests.retain(|r| r.id != id);
        let removed = self.requests.len() < before;
        if removed {
            debug!("delete removed request id={id}");
        }
        removed
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_status_filter(&mut self, filter: StatusFilter) {
        self.status_filter = filter;
    }

    pub fn status_filter(&self) -> StatusFilter {
        self.status_filter
    }

    /// Toggle sorting on `key`: same key ascending flips to descending,
    /// anything else (other key, or no active sort) starts ascending.
    pub fn request_sort(&mut self, key: SortKey) {
        let direction = match self.sort {
            Some(spec) if spec.key == key && spec.direction == SortDirection::Ascending => {
                SortDirection::Descending
            }
            _ => SortDirection::Ascending,
        };
        self.sort = Some(SortSpec { key, direction });
    }

    pub fn sort(&self) -> Option<SortSpec> {
        self.sort
    }

    /// The filtered and sorted projection.
    ///
    /// A row passes when the requester name, joined product name, or class
    /// label contains the search term case-insensitively, and the status
    /// filter matches. Sorting is stable: ties keep their original relative
    /// order. Pure; mutates nothing.
    pub fn view(&self) -> Vec<&BorrowRequest> {
        let term = self.search.trim().to_lowercase();
        let mut rows: Vec<&BorrowRequest> = self
            .requests
            .iter()
            .filter(|r| self.status_filter.matches(r.status))
            .filter(|r| term.is_empty() || matches_search(r, &term))
            .collect();

        if let Some(spec) = self.sort {
            rows.sort_by(|a, b| {
                let ord = compare_by_key(a, b, spec.key);
                match spec.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }
        rows
    }

    /// `(shown, total)` for the "Showing X of Y requests" footer.
    pub fn counts(&self) -> (usize, usize) {
        (self.view().len(), self.requests.len())
    }

    /// Every known request, unfiltered, in insertion order.
    pub fn all(&self) -> &[BorrowRequest] {
        &self.requests
    }

    pub fn get(&self, id: i64) -> Option<&BorrowRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

fn matches_search(request: &BorrowRequest, term_lower: &str) -> bool {
    request.requester_name.to_lowercase().contains(term_lower)
        || request.product_name().to_lowercase().contains(term_lower)
        || request.class.as_str().to_lowercase().contains(term_lower)
}

fn compare_by_key(a: &BorrowRequest, b: &BorrowRequest, key: SortKey) -> Ordering {
    match key {
        SortKey::ProductName => a.product_name().cmp(b.product_name()),
        SortKey::RequesterName => a.requester_name.cmp(&b.requester_name),
        SortKey::Class => a.class.as_str().cmp(b.class.as_str()),
        SortKey::Total => a.total.cmp(&b.total),
        SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
        // Date keys compare by instant, not by rendered text.
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ProductRef, SchoolClass};
    use chrono::{Duration, TimeZone, Utc};

    fn request(id: i64, product_name: &str, requester: &str, status: RequestStatus) -> BorrowRequest {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).single().expect("valid date")
            + Duration::minutes(id);
        BorrowRequest {
            id,
            product_id: 1,
            product: Some(ProductRef {
                id: 1,
                name: product_name.to_string(),
                total_stock: 10,
            }),
            total: 1,
            requester_name: requester.to_string(),
            class: SchoolClass::XTkj1,
            comment: None,
            status,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_search_matches_product_name_case_insensitively() {
        let mut collection = RequestCollection::new();
        collection.set_all(vec![
            request(1, "Laptop", "Budi", RequestStatus::Pending),
            request(2, "Tablet", "Siti", RequestStatus::Pending),
        ]);
        collection.set_search("lap");

        let view = collection.view();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, 1);
    }

    #[test]
    fn test_search_matches_requester_and_class() {
        let mut collection = RequestCollection::new();
        let mut other_class = request(2, "Router", "Siti", RequestStatus::Pending);
        other_class.class = SchoolClass::XiiTkj2;
        collection.set_all(vec![
            request(1, "Router", "Budi", RequestStatus::Pending),
            other_class,
        ]);

        collection.set_search("BUDI");
        assert_eq!(collection.view().len(), 1);

        collection.set_search("xii tkj");
        let view = collection.view();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, 2);
    }

    #[test]
    fn test_upsert_overwrites_by_id() {
        let mut collection = RequestCollection::new();
        collection.apply_upsert(request(7, "Laptop", "Budi", RequestStatus::Pending));
        collection.apply_upsert(request(7, "Laptop", "Budi", RequestStatus::Borrowed));

        assert_eq!(collection.len(), 1);
        assert_eq!(
            collection.get(7).expect("known id").status,
            RequestStatus::Borrowed
        );
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut collection = RequestCollection::new();
        let payload = request(3, "Switch", "Ayu", RequestStatus::Pending);
        collection.apply_upsert(payload.clone());
        let once = collection
            .all()
            .iter()
            .map(|r| (r.id, r.status))
            .collect::<Vec<_>>();

        collection.apply_upsert(payload);
        let twice = collection
            .all()
            .iter()
            .map(|r| (r.id, r.status))
            .collect::<Vec<_>>();

        assert_eq!(once, twice);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_unknown_update_lands_as_insert() {
        // An echo for an id this client never saw must not be dropped.
        let mut collection = RequestCollection::new();
        collection.set_all(vec![request(1, "Laptop", "Budi", RequestStatus::Pending)]);
        collection.apply_upsert(request(42, "Router", "Siti", RequestStatus::Borrowed));
        assert_eq!(collection.len(), 2);
        assert!(collection.get(42).is_some());
    }

    #[test]
    fn test_delete_removes_and_tolerates_unknown_ids() {
        let mut collection = RequestCollection::new();
        collection.set_all(vec![request(1, "Laptop", "Budi", RequestStatus::Pending)]);

        assert!(collection.apply_delete(1));
        assert!(!collection.apply_delete(1));
        assert!(collection.is_empty());
    }

    #[test]
    fn test_sort_toggle_starts_ascending_then_flips() {
        let mut collection = RequestCollection::new();

        collection.request_sort(SortKey::Class);
        assert_eq!(
            collection.sort(),
            Some(SortSpec {
                key: SortKey::Class,
                direction: SortDirection::Ascending
            })
        );

        collection.request_sort(SortKey::Class);
        assert_eq!(
            collection.sort().map(|s| s.direction),
            Some(SortDirection::Descending)
        );

        // Third press toggles back to ascending.
        collection.request_sort(SortKey::Class);
        assert_eq!(
            collection.sort().map(|s| s.direction),
            Some(SortDirection::Ascending)
        );
    }

    #[test]
    fn test_sorting_a_new_key_resets_to_ascending() {
        let mut collection = RequestCollection::new();
        collection.request_sort(SortKey::Class);
        collection.request_sort(SortKey::Class);
        collection.request_sort(SortKey::Total);
        assert_eq!(
            collection.sort(),
            Some(SortSpec {
                key: SortKey::Total,
                direction: SortDirection::Ascending
            })
        );
    }

    #[test]
    fn test_date_sort_compares_instants() {
        let mut collection = RequestCollection::new();
        collection.set_all(vec![
            request(2, "Laptop", "Budi", RequestStatus::Pending),
            request(1, "Tablet", "Siti", RequestStatus::Pending),
        ]);
        collection.request_sort(SortKey::CreatedAt);

        let ids: Vec<i64> = collection.view().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);

        collection.request_sort(SortKey::CreatedAt);
        let ids: Vec<i64> = collection.view().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let mut collection = RequestCollection::new();
        collection.set_all(vec![
            request(1, "Laptop", "Budi", RequestStatus::Pending),
            request(2, "Laptop", "Siti", RequestStatus::Pending),
            request(3, "Laptop", "Ayu", RequestStatus::Pending),
        ]);
        collection.request_sort(SortKey::ProductName);

        let ids: Vec<i64> = collection.view().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3], "ties keep original relative order");
    }

    #[test]
    fn test_status_filter_narrows_view() {
        let mut collection = RequestCollection::new();
        collection.set_all(vec![
            request(1, "Laptop", "Budi", RequestStatus::Pending),
            request(2, "Laptop", "Siti", RequestStatus::Borrowed),
            request(3, "Laptop", "Ayu", RequestStatus::Returned),
        ]);

        collection.set_status_filter(StatusFilter::Only(RequestStatus::Borrowed));
        let view = collection.view();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, 2);

        collection.set_status_filter(StatusFilter::All);
        assert_eq!(collection.view().len(), 3);
    }

    #[test]
    fn test_counts_report_shown_and_total() {
        let mut collection = RequestCollection::new();
        collection.set_all(vec![
            request(1, "Laptop", "Budi", RequestStatus::Pending),
            request(2, "Tablet", "Siti", RequestStatus::Borrowed),
        ]);
        collection.set_search("laptop");
        assert_eq!(collection.counts(), (1, 2));
    }

    #[test]
    fn test_orphaned_rows_stay_searchable_by_requester() {
        let mut orphan = request(5, "", "Budi", RequestStatus::Pending);
        orphan.product = None;

        let mut collection = RequestCollection::new();
        collection.set_all(vec![orphan]);
        collection.set_search("budi");
        assert_eq!(collection.view().len(), 1);

        collection.set_search("laptop");
        assert!(collection.view().is_empty());
    }

    #[test]
    fn test_view_is_pure_projection() {
        let mut collection = RequestCollection::new();
        collection.set_all(vec![
            request(2, "B", "Budi", RequestStatus::Pending),
            request(1, "A", "Siti", RequestStatus::Pending),
        ]);
        collection.request_sort(SortKey::ProductName);
        let _ = collection.view();

        // Underlying order is untouched by viewing.
        let ids: Vec<i64> = collection.all().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
