use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::Utc;
use tokio::signal;
use tracing::{info, warn};

use dashboard_client::{Notification, NotificationApi, NotificationFilters};
use dashboard_common::config::SyncConfig;
use dashboard_core::bulk::settle;
use dashboard_core::{
    AlwaysConfirm, Confirm, DeletePrompt, NotificationBell, NotificationCenter, Poller,
    badge_text, time_ago,
};

use crate::prompt::StdinConfirm;

/// How often `watch` compares unread counts.
const WATCH_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Waits for SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, stopping"),
        () = terminate => info!("Received SIGTERM, stopping"),
    }
}

fn print_notification(n: &Notification) {
    let marker = if n.is_unread() { "*" } else { " " };
    println!(
        "{marker} {:<26} {:<10} [{}] {}",
        n.id,
        time_ago(n.created_at, Utc::now()),
        n.notification_type.label(),
        n.title
    );
    if let Some(target) = n.action_url() {
        println!("    -> {target}");
    }
}

pub async fn list(
    api: Arc<dyn NotificationApi>,
    sync: &SyncConfig,
    page: u32,
    filters: NotificationFilters,
) -> anyhow::Result<()> {
    let center = NotificationCenter::from_config(api, sync);
    center
        .set_filters(filters)
        .await
        .context("failed to fetch notifications")?;
    if page > 1 {
        center
            .go_to_page(page)
            .await
            .context("failed to fetch notifications")?;
    }

    let state = center.state();
    if state.notifications.is_empty() {
        println!("No notifications.");
    }
    for n in &state.notifications {
        print_notification(n);
    }
    println!(
        "Page {}/{} ({} total, {} unread)",
        state.cursor.page, state.cursor.total_pages, state.cursor.total_count, state.unread_count
    );
    Ok(())
}

pub async fn watch(api: Arc<dyn NotificationApi>, sync: &SyncConfig) -> anyhow::Result<()> {
    let center = Arc::new(NotificationCenter::from_config(api.clone(), sync));
    let bell = Arc::new(NotificationBell::from_config(api, sync));
    let mut center_errors = center.subscribe_errors();
    let mut bell_errors = bell.subscribe_errors();

    let poller = Poller::from_config(sync);
    let center_poll = poller.mount(center.clone());
    let bell_poll = poller.mount(bell.clone());

    let mut last_unread = None;
    let mut check = tokio::time::interval(WATCH_CHECK_INTERVAL);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            Ok(error) = center_errors.recv() => warn!(view = "center", %error, "Sync error"),
            Ok(error) = bell_errors.recv() => warn!(view = "bell", %error, "Sync error"),
            _ = check.tick() => {
                let state = bell.state();
                if state.revision > 0 && last_unread != Some(state.unread_count) {
                    info!(
                        unread = state.unread_count,
                        badge = badge_text(state.unread_count).as_deref().unwrap_or("-"),
                        "Unread count changed"
                    );
                    last_unread = Some(state.unread_count);
                }
            }
        }
    }

    center.unmount();
    bell.unmount();
    center_poll.stop().await;
    bell_poll.stop().await;
    Ok(())
}

pub async fn read(api: Arc<dyn NotificationApi>, sync: &SyncConfig, id: &str) -> anyhow::Result<()> {
    let center = NotificationCenter::from_config(api, sync);
    center
        .mark_read(id)
        .await
        .with_context(|| format!("failed to mark {id} read"))?;
    println!("Marked {id} read.");
    Ok(())
}

pub async fn read_all(api: Arc<dyn NotificationApi>, sync: &SyncConfig) -> anyhow::Result<()> {
    let center = NotificationCenter::from_config(api, sync);
    center
        .mark_all_read()
        .await
        .context("failed to mark notifications read")?;
    println!("Marked all notifications read.");
    Ok(())
}

pub async fn delete(
    api: Arc<dyn NotificationApi>,
    sync: &SyncConfig,
    ids: &[String],
    yes: bool,
) -> anyhow::Result<()> {
    let confirm: &dyn Confirm = if yes { &AlwaysConfirm } else { &StdinConfirm };

    if let [id] = ids {
        let center = NotificationCenter::from_config(api, sync);
        // Load the first page so the prompt can show the title.
        if let Err(e) = center.fetch().await {
            warn!(error = %e, "Could not load notifications");
        }
        if center
            .delete(id, confirm)
            .await
            .with_context(|| format!("failed to delete {id}"))?
        {
            println!("Deleted {id}.");
        } else {
            println!("Cancelled.");
        }
        return Ok(());
    }

    if !confirm.confirm(&DeletePrompt::Selected { count: ids.len() }) {
        println!("Cancelled.");
        return Ok(());
    }
    let report = settle(ids.to_vec(), |id| {
        let api = api.clone();
        async move { api.delete(&id).await }
    })
    .await;

    for id in &report.succeeded {
        println!("Deleted {id}.");
    }
    for (id, error) in &report.failed {
        eprintln!("Failed to delete {id}: {error}");
    }
    if !report.is_complete() {
        bail!(
            "{} of {} deletes failed",
            report.failed.len(),
            report.attempted()
        );
    }
    Ok(())
}

pub async fn test(api: Arc<dyn NotificationApi>, sync: &SyncConfig) -> anyhow::Result<()> {
    let center = NotificationCenter::from_config(api, sync);
    center
        .create_test_notification()
        .await
        .context("failed to create a test notification")?;
    let state = center.state();
    if let Some(n) = state.notifications.first() {
        print_notification(n);
    }
    println!("{} unread.", state.unread_count);
    Ok(())
}
