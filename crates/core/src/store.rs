//! Client-side notification store.
//!
//! [`NotificationState`] is plain data; every change goes through
//! [`NotificationState::reduce`], which takes an event and returns the next
//! state. [`SharedStore`] wraps a state for use from async services and
//! drops events once its view has been unmounted.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use dashboard_client::{Notification, NotificationFilters, NotificationPage};
use dashboard_common::AppError;

use crate::command::SyncError;
use crate::selection::Selection;

/// Pagination cursor. Authoritative only right after a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// 1-based current page.
    pub page: u32,
    /// Number of pages reported by the last fetch.
    pub total_pages: u32,
    /// Number of notifications reported by the last fetch, adjusted for
    /// local deletes.
    pub total_count: u64,
    /// Set when local changes altered list membership since the last fetch.
    pub stale: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            page: 1,
            total_pages: 1,
            total_count: 0,
            stale: false,
        }
    }
}

/// Everything a notification view shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationState {
    /// Notifications currently held (one page, or the bell's recent list).
    pub notifications: Vec<Notification>,
    /// Client-maintained unread count across the user's full set.
    pub unread_count: u64,
    /// Pagination cursor.
    pub cursor: Cursor,
    /// Active filters.
    pub filters: NotificationFilters,
    /// Ids chosen for bulk actions.
    pub selection: Selection,
    /// A fetch is in flight.
    pub loading: bool,
    /// Last fetch failure. The list stays as it was.
    pub error: Option<AppError>,
    /// Last mutation failure, after its rollback.
    pub mutation_error: Option<SyncError>,
    /// Number of fetches applied so far.
    pub revision: u64,
    latest_request: u64,
    applied_request: u64,
}

/// State transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// Page or filters changed; the next fetch uses them.
    QueryChanged {
        page: u32,
        filters: NotificationFilters,
    },
    /// A fetch with sequence number `request` was issued.
    FetchStarted { request: u64 },
    /// A fetch succeeded.
    PageLoaded {
        request: u64,
        page: NotificationPage,
    },
    /// A fetch failed.
    FetchFailed { request: u64, error: AppError },
    /// One notification was marked read.
    MarkedRead { id: String, at: DateTime<Utc> },
    /// Everything was marked read.
    MarkedAllRead { at: DateTime<Utc> },
    /// One notification was deleted.
    Removed { id: String },
    /// Flip selection of one id on the current page.
    Toggled { id: String },
    /// Select the whole page, or clear if it is already selected.
    ToggledAll,
    /// Empty the selection.
    SelectionCleared,
    /// Undo an optimistic change.
    Restored(Snapshot),
    /// A mutation failed and was rolled back.
    MutationFailed(SyncError),
    /// Dismiss the fetch and mutation errors.
    ErrorsCleared,
}

/// Which notifications a snapshot covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// A single notification.
    One(String),
    /// Every notification held.
    All,
}

/// Prior state of the notifications an optimistic change touches.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    revision: u64,
    entries: Vec<(usize, Notification)>,
    selected: Vec<String>,
    unread_delta: u64,
    total_delta: u64,
    unread_before: u64,
    total_before: u64,
}

impl Snapshot {
    /// Record how much the optimistic change moved the counters.
    fn record_applied(&mut self, after: &NotificationState) {
        self.unread_delta = self.unread_before.saturating_sub(after.unread_count);
        self.total_delta = self.total_before.saturating_sub(after.cursor.total_count);
    }
}

impl NotificationState {
    /// Ids on the current page, in display order.
    pub fn page_ids(&self) -> impl Iterator<Item = &str> + Clone {
        self.notifications.iter().map(|n| n.id.as_str())
    }

    /// Look up a held notification.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }

    /// Number of unread notifications on the current page.
    #[must_use]
    pub fn unread_on_page(&self) -> usize {
        self.notifications.iter().filter(|n| n.is_unread()).count()
    }

    /// Capture what a change to `scope` could alter.
    #[must_use]
    pub fn snapshot(&self, scope: &Scope) -> Snapshot {
        let entries = self
            .notifications
            .iter()
            .enumerate()
            .filter(|(_, n)| match scope {
                Scope::One(id) => &n.id == id,
                Scope::All => true,
            })
            .map(|(index, n)| (index, n.clone()))
            .collect::<Vec<_>>();
        let selected = entries
            .iter()
            .filter(|(_, n)| self.selection.contains(&n.id))
            .map(|(_, n)| n.id.clone())
            .collect();

        Snapshot {
            revision: self.revision,
            entries,
            selected,
            unread_delta: 0,
            total_delta: 0,
            unread_before: self.unread_count,
            total_before: self.cursor.total_count,
        }
    }

    /// Apply one event and return the next state.
    #[must_use]
    pub fn reduce(mut self, event: StoreEvent) -> Self {
        match event {
            StoreEvent::QueryChanged { page, filters } => {
                self.cursor.page = page.max(1);
                self.filters = filters.normalized();
            }
            StoreEvent::FetchStarted { request } => {
                self.latest_request = self.latest_request.max(request);
                self.loading = true;
            }
            StoreEvent::PageLoaded { request, page } => {
                if request < self.applied_request {
                    debug!(request, applied = self.applied_request, "Discarding stale page");
                    return self;
                }
                self.applied_request = request;
                self.revision += 1;
                self.notifications = page.notifications;
                self.unread_count = page.unread_count;
                self.cursor = Cursor {
                    page: page.pagination.current_page.max(1),
                    total_pages: page.pagination.total_pages.max(1),
                    total_count: page.pagination.total_count,
                    stale: false,
                };
                self.selection.clear();
                self.error = None;
                self.loading = request < self.latest_request;
            }
            StoreEvent::FetchFailed { request, error } => {
                if request < self.applied_request {
                    return self;
                }
                self.error = Some(error);
                self.loading = request < self.latest_request;
            }
            StoreEvent::MarkedRead { id, at } => {
                if let Some(n) = self.notifications.iter_mut().find(|n| n.id == id)
                    && n.mark_read(at)
                {
                    self.unread_count = self.unread_count.saturating_sub(1);
                }
            }
            StoreEvent::MarkedAllRead { at } => {
                for n in &mut self.notifications {
                    n.mark_read(at);
                }
                self.unread_count = 0;
                self.selection.clear();
            }
            StoreEvent::Removed { id } => {
                if let Some(index) = self.notifications.iter().position(|n| n.id == id) {
                    let removed = self.notifications.remove(index);
                    if removed.is_unread() {
                        self.unread_count = self.unread_count.saturating_sub(1);
                    }
                    self.cursor.total_count = self.cursor.total_count.saturating_sub(1);
                    self.cursor.stale = true;
                }
                self.selection.remove(&id);
            }
            StoreEvent::Toggled { id } => {
                if self.get(&id).is_some() {
                    self.selection.toggle(&id);
                }
            }
            StoreEvent::ToggledAll => {
                let ids: Vec<String> = self.page_ids().map(str::to_string).collect();
                self.selection.toggle_all(ids.iter().map(String::as_str));
            }
            StoreEvent::SelectionCleared => self.selection.clear(),
            StoreEvent::Restored(snapshot) => return self.restore(snapshot),
            StoreEvent::MutationFailed(error) => self.mutation_error = Some(error),
            StoreEvent::ErrorsCleared => {
                self.error = None;
                self.mutation_error = None;
            }
        }
        self
    }

    fn restore(mut self, snapshot: Snapshot) -> Self {
        if snapshot.revision != self.revision {
            debug!(
                snapshot = snapshot.revision,
                current = self.revision,
                "Skipping rollback, list was refetched"
            );
            return self;
        }

        for (index, prior) in snapshot.entries {
            if let Some(current) = self.notifications.iter_mut().find(|n| n.id == prior.id) {
                *current = prior;
            } else {
                let index = index.min(self.notifications.len());
                self.notifications.insert(index, prior);
            }
        }
        for id in &snapshot.selected {
            self.selection.insert(id);
        }
        self.unread_count += snapshot.unread_delta;
        self.cursor.total_count += snapshot.total_delta;
        self
    }
}

/// A [`NotificationState`] shared between a view's services and its poller.
///
/// Once the lifecycle token is cancelled (the view unmounted), every
/// dispatch is ignored.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    state: Arc<Mutex<NotificationState>>,
    lifecycle: CancellationToken,
}

impl SharedStore {
    /// Create a store with an initial state.
    #[must_use]
    pub fn new(state: NotificationState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            lifecycle: CancellationToken::new(),
        }
    }

    /// Token cancelled when the view unmounts.
    #[must_use]
    pub fn lifecycle(&self) -> CancellationToken {
        self.lifecycle.clone()
    }

    /// Whether the view is still mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        !self.lifecycle.is_cancelled()
    }

    /// Unmount the view. Later dispatches are ignored.
    pub fn unmount(&self) {
        self.lifecycle.cancel();
    }

    /// Apply an event. Returns `false` if the view is unmounted.
    pub fn dispatch(&self, event: StoreEvent) -> bool {
        self.update(|state| *state = std::mem::take(state).reduce(event))
            .is_some()
    }

    /// Snapshot `scope`, then apply the optimistic `event`, atomically.
    /// Returns `None` if the view is unmounted.
    pub fn apply_optimistic(&self, scope: &Scope, event: StoreEvent) -> Option<Snapshot> {
        self.update(|state| {
            let mut snapshot = state.snapshot(scope);
            *state = std::mem::take(state).reduce(event);
            snapshot.record_applied(state);
            snapshot
        })
    }

    /// Read from the current state.
    pub fn read<R>(&self, f: impl FnOnce(&NotificationState) -> R) -> R {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Clone of the current state.
    #[must_use]
    pub fn state(&self) -> NotificationState {
        self.read(Clone::clone)
    }

    fn update<R>(&self, f: impl FnOnce(&mut NotificationState) -> R) -> Option<R> {
        if !self.is_mounted() {
            return None;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&mut state))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dashboard_client::test_utils::page;
    use chrono::TimeZone;
    use dashboard_client::{NotificationStatus, Pagination};
    use pretty_assertions::assert_eq;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap()
    }

    fn loaded(ids: &[(&str, bool)], unread: u64) -> NotificationState {
        NotificationState::default().reduce(StoreEvent::PageLoaded {
            request: 1,
            page: page(ids, unread),
        })
    }

    fn ids(state: &NotificationState) -> Vec<&str> {
        state.page_ids().collect()
    }

    #[test]
    fn test_page_loaded_replaces_everything() {
        let mut state = loaded(&[("1", true)], 1);
        state = state.reduce(StoreEvent::Toggled { id: "1".into() });
        state = state.reduce(StoreEvent::PageLoaded {
            request: 2,
            page: NotificationPage {
                pagination: Pagination {
                    current_page: 2,
                    total_pages: 3,
                    total_count: 25,
                },
                ..page(&[("2", false), ("3", true)], 9)
            },
        });

        assert_eq!(ids(&state), vec!["2", "3"]);
        assert_eq!(state.unread_count, 9);
        assert_eq!(state.cursor.page, 2);
        assert_eq!(state.cursor.total_count, 25);
        assert!(state.selection.is_empty());
        assert_eq!(state.revision, 2);
    }

    #[test]
    fn test_fetch_failure_keeps_list() {
        let state = loaded(&[("1", true)], 1)
            .reduce(StoreEvent::FetchStarted { request: 2 })
            .reduce(StoreEvent::FetchFailed {
                request: 2,
                error: AppError::Network("offline".into()),
            });

        assert_eq!(ids(&state), vec!["1"]);
        assert_eq!(state.error, Some(AppError::Network("offline".into())));
        assert!(!state.loading);
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let state = NotificationState::default()
            .reduce(StoreEvent::FetchStarted { request: 1 })
            .reduce(StoreEvent::FetchStarted { request: 2 })
            .reduce(StoreEvent::PageLoaded {
                request: 2,
                page: page(&[("new", true)], 1),
            })
            .reduce(StoreEvent::PageLoaded {
                request: 1,
                page: page(&[("old", true)], 5),
            });

        assert_eq!(ids(&state), vec!["new"]);
        assert_eq!(state.unread_count, 1);
        assert!(!state.loading);
    }

    #[test]
    fn test_loading_stays_while_newer_request_in_flight() {
        let state = NotificationState::default()
            .reduce(StoreEvent::FetchStarted { request: 1 })
            .reduce(StoreEvent::FetchStarted { request: 2 })
            .reduce(StoreEvent::PageLoaded {
                request: 1,
                page: page(&[("a", true)], 1),
            });
        assert!(state.loading);
    }

    #[test]
    fn test_mark_read_then_delete_scenario() {
        let state = loaded(&[("1", true), ("2", false), ("3", true)], 2);

        let state = state.reduce(StoreEvent::MarkedRead { id: "1".into(), at: at() });
        assert_eq!(state.get("1").unwrap().status, NotificationStatus::Read);
        assert_eq!(state.get("1").unwrap().read_at, Some(at()));
        assert_eq!(state.unread_count, 1);

        let state = state.reduce(StoreEvent::Removed { id: "3".into() });
        assert_eq!(ids(&state), vec!["1", "2"]);
        assert_eq!(state.unread_count, 0);
        assert!(state.cursor.stale);
    }

    #[test]
    fn test_mark_read_twice_counts_once() {
        let state = loaded(&[("1", true), ("2", true)], 2)
            .reduce(StoreEvent::MarkedRead { id: "1".into(), at: at() })
            .reduce(StoreEvent::MarkedRead { id: "1".into(), at: at() });
        assert_eq!(state.unread_count, 1);
    }

    #[test]
    fn test_unread_count_never_negative() {
        let state = loaded(&[("1", true), ("2", true)], 0)
            .reduce(StoreEvent::MarkedRead { id: "1".into(), at: at() })
            .reduce(StoreEvent::Removed { id: "2".into() });
        assert_eq!(state.unread_count, 0);
    }

    #[test]
    fn test_mark_reads_on_distinct_unread_ids() {
        let mut state = loaded(&[("a", true), ("b", true), ("c", true), ("d", true)], 3);
        for (marked, id) in ["a", "b", "c", "d"].into_iter().enumerate() {
            state = state.reduce(StoreEvent::MarkedRead { id: id.into(), at: at() });
            assert_eq!(state.unread_count, 3u64.saturating_sub(marked as u64 + 1));
        }
    }

    #[test]
    fn test_mark_all_read() {
        let mut state = loaded(&[("1", true), ("2", false), ("3", true)], 12);
        state = state.reduce(StoreEvent::ToggledAll);
        state = state.reduce(StoreEvent::MarkedAllRead { at: at() });

        assert!(state.notifications.iter().all(|n| !n.is_unread()));
        assert_eq!(state.unread_count, 0);
        assert!(state.selection.is_empty());
        assert_ne!(state.get("2").unwrap().read_at, Some(at()));
    }

    #[test]
    fn test_delete_removes_from_selection() {
        let state = loaded(&[("1", true), ("2", true)], 2)
            .reduce(StoreEvent::ToggledAll)
            .reduce(StoreEvent::Removed { id: "1".into() });
        assert_eq!(state.selection.to_vec(), vec!["2"]);
    }

    #[test]
    fn test_toggle_ignores_foreign_ids() {
        let state = loaded(&[("1", true)], 1).reduce(StoreEvent::Toggled { id: "9".into() });
        assert!(state.selection.is_empty());
    }

    #[test]
    fn test_toggle_all_twice_is_empty() {
        let state = loaded(&[("1", true), ("2", true), ("3", false)], 2)
            .reduce(StoreEvent::ToggledAll)
            .reduce(StoreEvent::ToggledAll);
        assert!(state.selection.is_empty());
    }

    #[test]
    fn test_restore_undoes_delete_in_place() {
        let state = loaded(&[("1", false), ("2", true), ("3", false)], 4)
            .reduce(StoreEvent::ToggledAll);
        let mut snapshot = state.snapshot(&Scope::One("2".into()));
        let state = state.reduce(StoreEvent::Removed { id: "2".into() });
        snapshot.record_applied(&state);

        let state = state.reduce(StoreEvent::Restored(snapshot));
        assert_eq!(ids(&state), vec!["1", "2", "3"]);
        assert_eq!(state.unread_count, 4);
        assert!(state.selection.contains("2"));
    }

    #[test]
    fn test_restore_keeps_concurrent_changes() {
        let state = loaded(&[("1", true), ("2", true)], 2);
        let mut first = state.snapshot(&Scope::One("1".into()));
        let state = state.reduce(StoreEvent::MarkedRead { id: "1".into(), at: at() });
        first.record_applied(&state);
        let state = state.reduce(StoreEvent::MarkedRead { id: "2".into(), at: at() });

        let state = state.reduce(StoreEvent::Restored(first));
        assert!(state.get("1").unwrap().is_unread());
        assert!(!state.get("2").unwrap().is_unread());
        assert_eq!(state.unread_count, 1);
    }

    #[test]
    fn test_restore_skipped_after_refetch() {
        let state = loaded(&[("1", true)], 1);
        let mut snapshot = state.snapshot(&Scope::All);
        let state = state.reduce(StoreEvent::MarkedAllRead { at: at() });
        snapshot.record_applied(&state);
        let state = state.reduce(StoreEvent::PageLoaded {
            request: 2,
            page: page(&[("1", false)], 0),
        });

        let state = state.reduce(StoreEvent::Restored(snapshot));
        assert!(!state.get("1").unwrap().is_unread());
        assert_eq!(state.unread_count, 0);
    }

    #[test]
    fn test_unmounted_store_ignores_events() {
        let store = SharedStore::default();
        assert!(store.dispatch(StoreEvent::PageLoaded {
            request: 1,
            page: page(&[("1", true)], 1),
        }));

        store.unmount();
        assert!(!store.dispatch(StoreEvent::Removed { id: "1".into() }));
        assert_eq!(store.read(|s| s.notifications.len()), 1);
        assert!(
            store
                .apply_optimistic(&Scope::All, StoreEvent::MarkedAllRead { at: at() })
                .is_none()
        );
    }

    #[test]
    fn test_query_changed_normalizes_filters() {
        let state = NotificationState::default().reduce(StoreEvent::QueryChanged {
            page: 0,
            filters: NotificationFilters {
                search: Some("  ".into()),
                ..NotificationFilters::default()
            },
        });
        assert_eq!(state.cursor.page, 1);
        assert!(state.filters.search.is_none());
    }
}
