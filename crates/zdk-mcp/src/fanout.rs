//! Concurrent per-key operations with isolated failures

use crate::error::Result;
use futures::FutureExt;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Run `op` for every key concurrently and collect a success map.
///
/// A key whose operation returns `Ok(false)`, an error, or panics maps to
/// `false`; the other keys are unaffected.
pub async fn fan_out<I, F, Fut>(keys: I, op: F) -> BTreeMap<String, bool>
where
    I: IntoIterator<Item = String>,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let tasks = keys.into_iter().map(|key| {
        let task = op(key.clone());
        async move {
            let ok = match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(ok)) => ok,
                Ok(Err(e)) => {
                    tracing::warn!(key = %key, error = %e, "Fan-out task failed");
                    false
                }
                Err(_) => {
                    tracing::error!(key = %key, "Fan-out task panicked");
                    false
                }
            };
            (key, ok)
        }
    });

    join_all(tasks).await.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::McpError;

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let keys = ["ok", "no", "err", "panic"].map(String::from);

        let results = fan_out(keys, |key| async move {
            match key.as_str() {
                "ok" => Ok(true),
                "no" => Ok(false),
                "err" => Err(McpError::NotConnected(key)),
                _ => panic!("task blew up"),
            }
        })
        .await;

        assert_eq!(results.len(), 4);
        assert!(results["ok"]);
        assert!(!results["no"]);
        assert!(!results["err"]);
        assert!(!results["panic"]);
    }

    #[tokio::test]
    async fn test_tasks_run_concurrently() {
        let keys = (0..8).map(|i| format!("server-{i}"));
        let started = std::time::Instant::now();

        let results = fan_out(keys, |_| async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Ok(true)
        })
        .await;

        assert!(results.values().all(|ok| *ok));
        assert!(started.elapsed() < std::time::Duration::from_millis(350));
    }
}
