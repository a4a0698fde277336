//! Test utilities for code built on [`NotificationApi`].
//!
//! [`ScriptedApi`] is an in-memory backend that behaves like the real
//! endpoints (filtering, pagination, unread counting) and records every
//! call. Individual calls can be made to fail, and list responses can be
//! held back to exercise ordering.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::Semaphore;

use dashboard_common::{AppError, AppResult};

use crate::api::NotificationApi;
use crate::model::{Notification, NotificationStatus, NotificationType, Priority};
use crate::wire::{ListQuery, NotificationPage, Pagination};

/// Fixed reference time used by the builders.
#[must_use]
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Build a notification. Read notifications carry a `read_at` stamp.
#[must_use]
pub fn notification(id: &str, unread: bool) -> Notification {
    let created_at = base_time();
    Notification {
        id: id.to_string(),
        title: format!("Notification {id}"),
        message: format!("Message for {id}"),
        notification_type: NotificationType::OrderCreated,
        priority: Priority::Medium,
        status: if unread {
            NotificationStatus::Unread
        } else {
            NotificationStatus::Read
        },
        created_at,
        read_at: (!unread).then(|| created_at + Duration::minutes(5)),
        data: None,
    }
}

/// Build a single-page response from `(id, unread)` pairs.
#[must_use]
pub fn page(items: &[(&str, bool)], unread_count: u64) -> NotificationPage {
    NotificationPage {
        notifications: items
            .iter()
            .map(|(id, unread)| notification(id, *unread))
            .collect(),
        unread_count,
        pagination: Pagination {
            current_page: 1,
            total_pages: 1,
            total_count: items.len() as u64,
        },
    }
}

#[derive(Default)]
struct Backend {
    notifications: Vec<Notification>,
    next_test_id: u64,
    list_queries: Vec<ListQuery>,
    recent_calls: usize,
    unread_count_calls: usize,
    mark_read_calls: Vec<String>,
    mark_all_calls: usize,
    delete_calls: Vec<String>,
    test_calls: usize,
    fail_list: bool,
    fail_recent: bool,
    fail_mark_all: bool,
    fail_mark_read: BTreeSet<String>,
    fail_delete: BTreeSet<String>,
}

fn server_error(what: &str) -> AppError {
    AppError::Api {
        status: 500,
        message: format!("{what} failed"),
    }
}

/// In-memory notification backend.
#[derive(Clone, Default)]
pub struct ScriptedApi {
    backend: Arc<Mutex<Backend>>,
    list_gate: Arc<Mutex<Option<Arc<Semaphore>>>>,
}

impl ScriptedApi {
    /// Backend holding `items` (newest first).
    #[must_use]
    pub fn with_notifications(items: Vec<Notification>) -> Self {
        let api = Self::default();
        api.backend().notifications = items;
        api
    }

    /// Backend holding `count` notifications `n1..`, all unread.
    #[must_use]
    pub fn with_unread(count: usize) -> Self {
        Self::with_notifications(
            (1..=count)
                .map(|i| notification(&format!("n{i}"), true))
                .collect(),
        )
    }

    fn backend(&self) -> std::sync::MutexGuard<'_, Backend> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the server-side notifications.
    pub fn set_notifications(&self, items: Vec<Notification>) {
        self.backend().notifications = items;
    }

    /// Server-side notifications.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.backend().notifications.clone()
    }

    /// Make list calls fail (or succeed again).
    pub fn fail_list(&self, fail: bool) {
        self.backend().fail_list = fail;
    }

    /// Make recent/unread-count calls fail (or succeed again).
    pub fn fail_recent(&self, fail: bool) {
        self.backend().fail_recent = fail;
    }

    /// Make mark-all-read fail.
    pub fn fail_mark_all(&self, fail: bool) {
        self.backend().fail_mark_all = fail;
    }

    /// Make mark-read of `id` fail.
    pub fn fail_mark_read(&self, id: &str) {
        self.backend().fail_mark_read.insert(id.to_string());
    }

    /// Make delete of `id` fail.
    pub fn fail_delete(&self, id: &str) {
        self.backend().fail_delete.insert(id.to_string());
    }

    /// Hold every list call until [`ScriptedApi::release_list`].
    pub fn hold_lists(&self) {
        *self.list_gate.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `n` held list calls through.
    pub fn release_list(&self, n: usize) {
        if let Some(gate) = self
            .list_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            gate.add_permits(n);
        }
    }

    /// Queries received by the list endpoint.
    #[must_use]
    pub fn list_queries(&self) -> Vec<ListQuery> {
        self.backend().list_queries.clone()
    }

    /// Number of list calls.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.backend().list_queries.len()
    }

    /// Number of recent-list calls.
    #[must_use]
    pub fn recent_calls(&self) -> usize {
        self.backend().recent_calls
    }

    /// Number of unread-count calls.
    #[must_use]
    pub fn unread_count_calls(&self) -> usize {
        self.backend().unread_count_calls
    }

    /// Ids passed to mark-read, in call order.
    #[must_use]
    pub fn mark_read_calls(&self) -> Vec<String> {
        self.backend().mark_read_calls.clone()
    }

    /// Number of mark-all-read calls.
    #[must_use]
    pub fn mark_all_calls(&self) -> usize {
        self.backend().mark_all_calls
    }

    /// Ids passed to delete, in call order.
    #[must_use]
    pub fn delete_calls(&self) -> Vec<String> {
        self.backend().delete_calls.clone()
    }

    /// Number of test-notification calls.
    #[must_use]
    pub fn test_calls(&self) -> usize {
        self.backend().test_calls
    }
}

fn matches(n: &Notification, query: &ListQuery) -> bool {
    let filters = &query.filters;
    if filters.status.is_some_and(|s| s != n.status) {
        return false;
    }
    if filters
        .notification_type
        .is_some_and(|t| t != n.notification_type)
    {
        return false;
    }
    if let Some(search) = &filters.search {
        let needle = search.to_lowercase();
        return n.title.to_lowercase().contains(&needle)
            || n.message.to_lowercase().contains(&needle);
    }
    true
}

#[async_trait]
impl NotificationApi for ScriptedApi {
    async fn list(&self, query: &ListQuery) -> AppResult<NotificationPage> {
        self.backend().list_queries.push(query.clone());

        let gate = self
            .list_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?
                .forget();
        }

        let backend = self.backend();
        if backend.fail_list {
            return Err(server_error("list"));
        }

        let matching: Vec<&Notification> = backend
            .notifications
            .iter()
            .filter(|n| matches(n, query))
            .collect();
        let limit = query.limit.max(1) as usize;
        let total_count = matching.len() as u64;
        let total_pages = matching.len().div_ceil(limit).max(1) as u32;
        let start = (query.page.max(1) as usize - 1) * limit;

        Ok(NotificationPage {
            notifications: matching
                .into_iter()
                .skip(start)
                .take(limit)
                .cloned()
                .collect(),
            unread_count: backend
                .notifications
                .iter()
                .filter(|n| n.is_unread())
                .count() as u64,
            pagination: Pagination {
                current_page: query.page,
                total_pages,
                total_count,
            },
        })
    }

    async fn recent(&self, limit: u32) -> AppResult<Vec<Notification>> {
        let mut backend = self.backend();
        backend.recent_calls += 1;
        if backend.fail_recent {
            return Err(server_error("recent"));
        }
        Ok(backend
            .notifications
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn unread_count(&self) -> AppResult<u64> {
        let mut backend = self.backend();
        backend.unread_count_calls += 1;
        if backend.fail_recent {
            return Err(server_error("unread count"));
        }
        Ok(backend.notifications.iter().filter(|n| n.is_unread()).count() as u64)
    }

    async fn mark_read(&self, id: &str) -> AppResult<()> {
        let mut backend = self.backend();
        backend.mark_read_calls.push(id.to_string());
        if backend.fail_mark_read.contains(id) {
            return Err(server_error("mark read"));
        }
        let now = Utc::now();
        match backend.notifications.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.mark_read(now);
                Ok(())
            }
            None => Err(AppError::Api {
                status: 404,
                message: "Notification not found".to_string(),
            }),
        }
    }

    async fn mark_all_read(&self) -> AppResult<Option<u64>> {
        let mut backend = self.backend();
        backend.mark_all_calls += 1;
        if backend.fail_mark_all {
            return Err(server_error("mark all read"));
        }
        let now = Utc::now();
        let affected = backend
            .notifications
            .iter_mut()
            .filter_map(|n| n.mark_read(now).then_some(()))
            .count();
        Ok(Some(affected as u64))
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let mut backend = self.backend();
        backend.delete_calls.push(id.to_string());
        if backend.fail_delete.contains(id) {
            return Err(server_error("delete"));
        }
        let before = backend.notifications.len();
        backend.notifications.retain(|n| n.id != id);
        if backend.notifications.len() == before {
            return Err(AppError::Api {
                status: 404,
                message: "Notification not found".to_string(),
            });
        }
        Ok(())
    }

    async fn create_test(&self) -> AppResult<Option<Notification>> {
        let mut backend = self.backend();
        backend.test_calls += 1;
        backend.next_test_id += 1;
        let mut created = notification(&format!("test-{}", backend.next_test_id), true);
        created.title = "Test notification".to_string();
        created.created_at = Utc::now();
        backend.notifications.insert(0, created.clone());
        Ok(Some(created))
    }
}
