//! Settled fan-out of per-id backend calls.

use std::future::Future;

use futures::future::join_all;

use dashboard_common::{AppError, AppResult};

/// Outcome of a bulk action, per id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    /// Ids whose call succeeded, in request order.
    pub succeeded: Vec<String>,
    /// Ids whose call failed, with the reason.
    pub failed: Vec<(String, AppError)>,
}

impl BulkReport {
    /// Whether every call succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of ids attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Run `call` for every id concurrently and wait for all of them.
///
/// One failure never cancels the others.
pub async fn settle<F, Fut>(ids: Vec<String>, call: F) -> BulkReport
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = AppResult<()>>,
{
    let results = join_all(ids.iter().cloned().map(&call)).await;

    let mut report = BulkReport::default();
    for (id, result) in ids.into_iter().zip(results) {
        match result {
            Ok(()) => report.succeeded.push(id),
            Err(error) => report.failed.push((id, error)),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_settle_keeps_going_after_failure() {
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let report = settle(ids, |id| async move {
            if id == "b" {
                Err(AppError::Network("reset".into()))
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(report.succeeded, vec!["a", "c"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "b");
        assert!(!report.is_complete());
        assert_eq!(report.attempted(), 3);
    }

    #[tokio::test]
    async fn test_settle_empty() {
        let report = settle(Vec::new(), |_| async { Ok(()) }).await;
        assert!(report.is_complete());
        assert_eq!(report.attempted(), 0);
    }
}
