//! HTTP client integration tests.
//!
//! Each test runs a one-shot HTTP responder on a local port and checks
//! both the request the client sends and how it reads the response.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use dashboard_client::{
    HttpNotificationApi, ListQuery, NotificationApi, NotificationFilters, NotificationStatus,
};
use dashboard_common::config::ApiConfig;
use dashboard_common::{AppError, MemoryTokenStore, TokenKind, TokenStore};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve exactly one request with the given status line and JSON body.
/// The join handle yields the raw request head.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&head).into_owned()
    });

    (base, handle)
}

fn client(base: &str) -> HttpNotificationApi {
    let tokens = MemoryTokenStore::new();
    tokens.set(TokenKind::User, "user-token").unwrap();
    HttpNotificationApi::new(&ApiConfig::new(base), Arc::new(tokens)).unwrap()
}

#[tokio::test]
async fn test_list_sends_filters_and_decodes_page() {
    let (base, server) = serve_once(
        "200 OK",
        r#"{"success":true,"data":{"notifications":[{"_id":"n1","title":"Paid","message":"Payment received","type":"payment_processed","priority":"urgent","status":"unread","createdAt":"2026-10-01T12:00:00Z"}],"unreadCount":3,"pagination":{"currentPage":1,"totalPages":2,"totalCount":11}}}"#,
    )
    .await;

    let query = ListQuery::first_page(
        10,
        NotificationFilters {
            status: Some(NotificationStatus::Unread),
            ..NotificationFilters::default()
        },
    );
    let page = client(&base).list(&query).await.unwrap();
    let head = server.await.unwrap();

    assert!(head.starts_with("GET /api/notifications?page=1&limit=10&status=unread HTTP/1.1"));
    assert!(head.to_lowercase().contains("authorization: bearer user-token"));
    assert_eq!(page.notifications.len(), 1);
    assert_eq!(page.notifications[0].id, "n1");
    assert_eq!(page.unread_count, 3);
    assert_eq!(page.pagination.total_pages, 2);
}

#[tokio::test]
async fn test_mark_read_uses_put() {
    let (base, server) = serve_once("200 OK", r#"{"success":true}"#).await;

    client(&base).mark_read("n1").await.unwrap();
    let head = server.await.unwrap();

    assert!(head.starts_with("PUT /api/notifications/n1/read HTTP/1.1"));
}

#[tokio::test]
async fn test_mark_all_read_reports_affected_count() {
    let (base, server) =
        serve_once("200 OK", r#"{"success":true,"data":{"modifiedCount":4}}"#).await;

    let affected = client(&base).mark_all_read().await.unwrap();
    let head = server.await.unwrap();

    assert!(head.starts_with("PUT /api/notifications/mark-all-read HTTP/1.1"));
    assert_eq!(affected, Some(4));
}

#[tokio::test]
async fn test_delete_surfaces_server_message() {
    let (base, server) = serve_once(
        "404 Not Found",
        r#"{"success":false,"message":"Notification not found"}"#,
    )
    .await;

    let err = client(&base).delete("gone").await.unwrap_err();
    let head = server.await.unwrap();

    assert!(head.starts_with("DELETE /api/notifications/gone HTTP/1.1"));
    assert_eq!(
        err,
        AppError::Api {
            status: 404,
            message: "Notification not found".to_string()
        }
    );
}

#[tokio::test]
async fn test_error_without_message_uses_status_reason() {
    let (base, server) = serve_once("503 Service Unavailable", "").await;

    let err = client(&base).unread_count().await.unwrap_err();
    server.await.unwrap();

    assert_eq!(
        err,
        AppError::Api {
            status: 503,
            message: "Service Unavailable".to_string()
        }
    );
}

#[tokio::test]
async fn test_unread_count_decodes_bare_count() {
    let (base, server) = serve_once("200 OK", r#"{"count":9}"#).await;

    let count = client(&base).unread_count().await.unwrap();
    let head = server.await.unwrap();

    assert!(head.starts_with("GET /api/notifications/unread-count HTTP/1.1"));
    assert_eq!(count, 9);
}

#[tokio::test]
async fn test_malformed_body_is_reported() {
    let (base, server) = serve_once("200 OK", "not json").await;

    let err = client(&base).recent(5).await.unwrap_err();
    let head = server.await.unwrap();

    assert!(head.starts_with("GET /api/notifications/recent?limit=5 HTTP/1.1"));
    assert_eq!(err.error_code(), "MALFORMED_RESPONSE");
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = client(&base).unread_count().await.unwrap_err();
    assert_eq!(err.error_code(), "NETWORK_ERROR");
}
