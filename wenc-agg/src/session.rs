//! Interactive session state
//!
//! Each new query bumps a generation counter. A result is only displayed if
//! its query is still the latest one, so a slow answer to an old query can
//! never overwrite a newer one (last query wins).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::bookmarks::BookmarkList;
use crate::types::TopicRecord;

/// Proof that a query was started at a given generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTicket {
    generation: u64,
}

impl QueryTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Default)]
pub struct Session {
    generation: AtomicU64,
    current: Mutex<Option<Arc<TopicRecord>>>,
    bookmarks: Mutex<BookmarkList>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new query, superseding any query in flight
    pub fn begin(&self) -> QueryTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        QueryTicket { generation }
    }

    /// `true` while no newer query has been started
    pub fn is_current(&self, ticket: &QueryTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
    }

    /// Display the result of `ticket`'s query if it is still current
    ///
    /// `None` (no results, search unavailable) clears the display, so the
    /// previous topic is never shown as the answer to a newer query. Stale
    /// results are dropped.
    pub fn publish(&self, ticket: &QueryTicket, record: Option<TopicRecord>) -> bool {
        let mut current = lock(&self.current);
        if !self.is_current(ticket) {
            debug!(generation = ticket.generation, "Discarding result of superseded query");
            return false;
        }
        *current = record.map(Arc::new);
        true
    }

    /// Record currently on display
    pub fn current(&self) -> Option<Arc<TopicRecord>> {
        lock(&self.current).clone()
    }

    pub fn bookmarks(&self) -> MutexGuard<'_, BookmarkList> {
        lock(&self.bookmarks)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
