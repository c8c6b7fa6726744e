//! Change feed
//!
//! Replaces the hosted realtime channel with a polling transport: a
//! coroutine watches the store's `updated_at` watermark and fans out
//! incremental insert/update/delete events to subscribers, who fold them
//! into their collections by idempotent upsert. Subscribers that go away
//! are pruned on the next publish; a subscriber that stops pumping loses
//! events once its buffer fills and recovers with a full reload.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, warn};

use crate::entity::BorrowRequest;
use crate::store::{InventoryStore, StoreError};

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::trace;

/// Default per-subscriber buffer; enough to cover an initial-load window.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// One change to the borrow-request table.
///
/// Insert and update carry the full joined row so subscribers can upsert
/// without a follow-up fetch; delete carries only the id.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Insert(BorrowRequest),
    Update(BorrowRequest),
    Delete(i64),
}

impl ChangeEvent {
    /// The affected request id, whatever the kind.
    pub fn request_id(&self) -> i64 {
        match self {
            ChangeEvent::Insert(r) | ChangeEvent::Update(r) => r.id,
            ChangeEvent::Delete(id) => *id,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            ChangeEvent::Insert(_) => "insert",
            ChangeEvent::Update(_) => "update",
            ChangeEvent::Delete(_) => "delete",
        }
    }
}

/// Fan-out hub for [`ChangeEvent`]s. Handles are cheap clones sharing one
/// subscriber list.
#[derive(Clone)]
pub struct FeedHub {
    senders: Arc<Mutex<Vec<Sender<ChangeEvent>>>>,
    capacity: usize,
}

impl Default for FeedHub {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl FeedHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            senders: Arc::new(Mutex::new(Vec::new())),
            capacity: capacity.max(1),
        }
    }

    /// Register a subscriber and hand back its event intake.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = bounded(self.capacity);
        if let Ok(mut senders) = self.senders.lock() {
            senders.push(tx);
            self.note_subscriber_count(senders.len());
        }
        Subscription { receiver: rx }
    }

    /// Deliver one event to every live subscriber.
    ///
    /// Disconnected subscribers are pruned here; a full buffer drops the
    /// event for that subscriber only, with a warning.
    pub fn publish(&self, event: ChangeEvent) {
        let Ok(mut senders) = self.senders.lock() else {
            warn!("feed hub lock poisoned; event dropped");
            return;
        };
        #[cfg(feature = "metrics")]
        METRICS.record_feed_event();

        senders.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    "feed subscriber buffer full; dropped {} for request id={}",
                    event.kind_str(),
                    event.request_id()
                );
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("pruned disconnected feed subscriber");
                false
            }
        });
        self.note_subscriber_count(senders.len());
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().map(|s| s.len()).unwrap_or(0)
    }

    #[cfg(feature = "metrics")]
    fn note_subscriber_count(&self, count: usize) {
        METRICS.set_feed_subscribers(count);
    }

    #[cfg(not(feature = "metrics"))]
    fn note_subscriber_count(&self, _count: usize) {}
}

/// A registered feed subscriber. Dropping it (or calling
/// [`unsubscribe`](Self::unsubscribe)) disconnects the channel; the hub
/// prunes the dead sender on its next publish.
pub struct Subscription {
    receiver: Receiver<ChangeEvent>,
}

impl Subscription {
    /// Next buffered event, if any. Never blocks.
    pub fn try_next(&self) -> Option<ChangeEvent> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn next_timeout(&self, timeout: Duration) -> Option<ChangeEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Everything currently buffered, oldest first. Never blocks.
    pub fn drain(&self) -> Vec<ChangeEvent> {
        self.receiver.try_iter().collect()
    }

    /// Explicit teardown; equivalent to dropping the subscription.
    pub fn unsubscribe(self) {}
}

/// Poller bookkeeping between ticks.
struct PollState {
    /// Ids seen on the previous tick; `None` until the baseline pass.
    known: Option<HashSet<i64>>,
    watermark: DateTime<Utc>,
}

impl PollState {
    fn new() -> Self {
        Self {
            known: None,
            watermark: DateTime::<Utc>::MIN_UTC,
        }
    }
}

/// One poll pass: establish the baseline silently on first success, then
/// publish inserts/updates from the watermark query and deletes from the
/// id-set difference. Returns how many events were published.
fn poll_once<S: InventoryStore>(
    store: &S,
    hub: &FeedHub,
    state: &mut PollState,
) -> Result<usize, StoreError> {
    #[cfg(feature = "tracing")]
    let _span = trace::feed_poll_span().entered();

    let Some(known) = &mut state.known else {
        // Baseline: snapshot ids and watermark, publish nothing. Changes
        // before the poller existed belong to the subscriber's initial load.
        let rows = store.list_borrow_requests()?;
        state.watermark = rows
            .iter()
            .map(|r| r.updated_at)
            .max()
            .unwrap_or(state.watermark);
        state.known = Some(rows.into_iter().map(|r| r.id).collect());
        return Ok(0);
    };

    // Ids first: a row inserted between the two queries shows up as a
    // duplicate insert next tick, which upsert absorbs.
    let current_ids: HashSet<i64> = store.list_request_ids()?.into_iter().collect();
    let changed = store.list_requests_updated_since(state.watermark)?;

    let mut published = 0;
    let mut watermark = state.watermark;
    for row in changed {
        if row.updated_at > watermark {
            watermark = row.updated_at;
        }
        let fresh = !known.contains(&row.id) && row.created_at == row.updated_at;
        known.insert(row.id);
        let event = if fresh {
            ChangeEvent::Insert(row)
        } else {
            ChangeEvent::Update(row)
        };
        hub.publish(event);
        published += 1;
    }

    for gone in known.difference(&current_ids) {
        hub.publish(ChangeEvent::Delete(*gone));
        published += 1;
    }
    known.retain(|id| current_ids.contains(id));

    state.watermark = watermark;
    Ok(published)
}

/// Handle to a running poller coroutine.
pub struct FeedPoller {
    stop: Arc<AtomicBool>,
    handle: may::coroutine::JoinHandle<()>,
}

impl FeedPoller {
    /// Signal the loop to exit and wait for it. Returns after at most one
    /// poll interval.
    pub fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.handle.join();
    }
}

/// Spawn the polling coroutine.
///
/// The first successful pass is a silent baseline; afterwards each tick
/// publishes the rows whose `updated_at` moved past the watermark
/// (classified insert when `created_at == updated_at` and the id is new,
/// update otherwise) and a delete per id that vanished. Poll failures are
/// logged and retried on the next tick.
pub fn spawn_poller<S>(store: S, hub: FeedHub, interval: Duration) -> FeedPoller
where
    S: InventoryStore + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let handle = may::go!(move || {
        let mut state = PollState::new();
        while !flag.load(Ordering::Relaxed) {
            match poll_once(&store, &hub, &mut state) {
                Ok(0) => {}
                Ok(published) => debug!("feed poller published {published} events"),
                Err(e) => warn!("feed poll failed: {e}"),
            }
            may::coroutine::sleep(interval);
        }
        debug!("feed poller stopped");
    });
    FeedPoller { stop, handle }
}
