//! Ordered teardown of connection resources

use async_trait::async_trait;
use std::sync::Arc;

/// A handle that must be released when its connection goes away
#[async_trait]
pub trait Release: Send + Sync {
    async fn release(&self) -> anyhow::Result<()>;
}

/// Resources acquired during a connection, released in reverse order.
///
/// Release errors are logged and swallowed so teardown always runs to the
/// end.
#[derive(Default)]
pub struct ExitStack {
    entries: Vec<(String, Arc<dyn Release>)>,
}

impl ExitStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly acquired resource
    pub fn push(&mut self, label: impl Into<String>, resource: Arc<dyn Release>) {
        let label = label.into();
        tracing::trace!(resource = %label, depth = self.entries.len() + 1, "Acquired resource");
        self.entries.push((label, resource));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release everything, newest first. Returns how many releases failed.
    pub async fn close(&mut self) -> usize {
        let mut failures = 0;
        while let Some((label, resource)) = self.entries.pop() {
            match resource.release().await {
                Ok(()) => tracing::trace!(resource = %label, "Released resource"),
                Err(e) => {
                    failures += 1;
                    tracing::warn!(resource = %label, error = %e, "Failed to release resource");
                }
            }
        }
        failures
    }
}

impl Drop for ExitStack {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            let labels: Vec<&str> = self.entries.iter().map(|(l, _)| l.as_str()).collect();
            tracing::warn!(resources = ?labels, "Exit stack dropped without being closed");
        }
    }
}

impl std::fmt::Debug for ExitStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(label, _)| label))
            .finish()
    }
}
