//! One MCP server connection and its lifecycle
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──▶ Connected ──disconnect──▶ Disconnected
//!                               │
//!                               └──retries exhausted──▶ Failed ──connect──▶ Connecting
//! ```

use crate::config::McpServerConfig;
use crate::error::{McpError, Result};
use crate::exit_stack::ExitStack;
use crate::retry::RetryPolicy;
use crate::transport::{McpSession, McpTransport};
use crate::types::{
    Catalog, CatalogKind, ConnectionState, McpPromptInfo, McpResourceInfo, McpToolInfo,
    ResourceContent,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use zdk_telemetry::{McpSpanAttributes, trace_mcp_connect};

#[derive(Default)]
struct Live {
    state: ConnectionState,
    session: Option<Arc<dyn McpSession>>,
    catalog: Catalog,
}

/// A configured MCP server.
///
/// Connect attempts and teardown both run under the lifecycle mutex, so
/// they never interleave. Calls only take a short read lock to grab the
/// session and run concurrently with each other.
pub struct McpServer {
    id: String,
    config: McpServerConfig,
    transport: Arc<dyn McpTransport>,
    lifecycle: Mutex<ExitStack>,
    live: RwLock<Live>,
}

impl McpServer {
    pub fn new(
        id: impl Into<String>,
        config: McpServerConfig,
        transport: Arc<dyn McpTransport>,
    ) -> Self {
        Self {
            id: id.into(),
            config,
            transport,
            lifecycle: Mutex::new(ExitStack::new()),
            live: RwLock::new(Live::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &McpServerConfig {
        &self.config
    }

    pub async fn state(&self) -> ConnectionState {
        self.live.read().await.state
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Connected
    }

    /// Connect with bounded retries. Returns `false` once retries are
    /// exhausted; the server may be connected again later.
    pub async fn connect(&self, policy: &RetryPolicy) -> bool {
        self.connect_until(policy, &CancellationToken::new())
            .await
            .is_ok()
    }

    /// Connect with bounded retries, giving up as soon as `cancel` fires.
    ///
    /// Every handle opened by a failed or cancelled attempt is released
    /// before the next attempt starts or the call returns. A connected
    /// server is returned as-is without a new handshake.
    pub async fn connect_until(&self, policy: &RetryPolicy, cancel: &CancellationToken) -> Result<()> {
        let mut resources = self.lifecycle.lock().await;

        if self.state().await == ConnectionState::Connected {
            tracing::debug!(server = %self.id, "MCP server already connected");
            return Ok(());
        }

        let attempts = policy.attempts();
        self.live.write().await.state = ConnectionState::Connecting;
        tracing::info!(
            server = %self.id,
            transport = %self.config.transport.kind(),
            attempts,
            "Connecting to MCP server"
        );

        let mut last_error = None;
        for attempt in 1..=attempts {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(McpError::Cancelled),
                outcome = self.attempt(policy, &mut *resources) => outcome,
            };

            match outcome {
                Ok((session, catalog)) => {
                    self.record_attempt(attempt, "connected");
                    tracing::info!(
                        server = %self.id,
                        attempt,
                        tools = catalog.tools.len(),
                        resources = catalog.resources.len(),
                        prompts = catalog.prompts.len(),
                        "Connected to MCP server"
                    );
                    *self.live.write().await = Live {
                        state: ConnectionState::Connected,
                        session: Some(session),
                        catalog,
                    };
                    return Ok(());
                }
                Err(McpError::Cancelled) => {
                    self.record_attempt(attempt, "cancelled");
                    resources.close().await;
                    self.live.write().await.state = ConnectionState::Disconnected;
                    tracing::info!(server = %self.id, attempt, "Connection cancelled");
                    return Err(McpError::Cancelled);
                }
                Err(e) => {
                    self.record_attempt(attempt, "failed");
                    tracing::warn!(
                        server = %self.id,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "MCP connection attempt failed"
                    );
                    resources.close().await;

                    let retryable = e.is_retryable();
                    last_error = Some(e);
                    if !retryable {
                        break;
                    }

                    if attempt < attempts {
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => {
                                self.live.write().await.state = ConnectionState::Disconnected;
                                tracing::info!(server = %self.id, "Connection cancelled between attempts");
                                return Err(McpError::Cancelled);
                            }
                            _ = tokio::time::sleep(policy.retry_delay) => {}
                        }
                    }
                }
            }
        }

        self.live.write().await.state = ConnectionState::Failed;
        let error = last_error
            .unwrap_or_else(|| McpError::connection(&self.id, "no connection attempt was made"));
        tracing::error!(server = %self.id, error = %error, "Giving up on MCP server");
        Err(error)
    }

    /// One attempt: open the transport, handshake, then discover.
    ///
    /// The connect timeout bounds the handshake and each catalog listing
    /// separately.
    async fn attempt(
        &self,
        policy: &RetryPolicy,
        resources: &mut ExitStack,
    ) -> Result<(Arc<dyn McpSession>, Catalog)> {
        let connect = self.transport.connect(&self.id, &self.config, resources);
        let session = match policy.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, connect).await.map_err(|_| {
                McpError::Timeout {
                    server: self.id.clone(),
                    timeout,
                }
            })??,
            None => connect.await?,
        };

        let catalog = self.discover(session.as_ref(), policy.connect_timeout).await;
        Ok((session, catalog))
    }

    /// List all three catalogs; a failing or stalled listing leaves only
    /// its own catalog empty.
    async fn discover(&self, session: &dyn McpSession, limit: Option<Duration>) -> Catalog {
        let (tools, resources, prompts) = tokio::join!(
            self.bounded(limit, session.list_tools()),
            self.bounded(limit, session.list_resources()),
            self.bounded(limit, session.list_prompts())
        );

        Catalog::new(
            self.listed(CatalogKind::Tools, tools),
            self.listed(CatalogKind::Resources, resources),
            self.listed(CatalogKind::Prompts, prompts),
        )
    }

    async fn bounded<T>(
        &self,
        limit: Option<Duration>,
        listing: impl Future<Output = Result<Vec<T>>>,
    ) -> Result<Vec<T>> {
        match limit {
            Some(timeout) => tokio::time::timeout(timeout, listing)
                .await
                .unwrap_or_else(|_| {
                    Err(McpError::Timeout {
                        server: self.id.clone(),
                        timeout,
                    })
                }),
            None => listing.await,
        }
    }

    fn listed<T>(&self, kind: CatalogKind, listing: Result<Vec<T>>) -> Vec<T> {
        listing.unwrap_or_else(|e| {
            tracing::warn!(
                server = %self.id,
                catalog = %kind,
                error = %e,
                "MCP discovery failed; catalog left empty"
            );
            Vec::new()
        })
    }

    fn record_attempt(&self, attempt: u32, outcome: &str) {
        trace_mcp_connect(McpSpanAttributes {
            server_id: self.id.clone(),
            transport: self.config.transport.kind().to_string(),
            attempt,
            outcome: outcome.to_string(),
        });
    }

    /// Tear the connection down. Safe to call any number of times.
    ///
    /// The server always ends up `Disconnected` with empty catalogs; the
    /// return value is `false` if any resource failed to release cleanly.
    pub async fn disconnect(&self) -> bool {
        let mut resources = self.lifecycle.lock().await;

        let previous = std::mem::take(&mut *self.live.write().await);
        let failures = resources.close().await;

        if previous.state == ConnectionState::Connected {
            tracing::info!(server = %self.id, failures, "Disconnected from MCP server");
        } else {
            tracing::debug!(server = %self.id, state = %previous.state, "Disconnect on idle MCP server");
        }
        failures == 0
    }

    pub async fn catalog(&self) -> Catalog {
        self.live.read().await.catalog.clone()
    }

    pub async fn tools(&self) -> Vec<McpToolInfo> {
        self.live.read().await.catalog.tools.values().cloned().collect()
    }

    pub async fn resources(&self) -> Vec<McpResourceInfo> {
        self.live.read().await.catalog.resources.values().cloned().collect()
    }

    pub async fn prompts(&self) -> Vec<McpPromptInfo> {
        self.live.read().await.catalog.prompts.values().cloned().collect()
    }

    /// The live session, provided the server is connected and `present`
    /// holds for its catalog
    async fn session_for(
        &self,
        present: impl FnOnce(&Catalog) -> bool,
        missing: impl FnOnce() -> McpError,
    ) -> Result<Arc<dyn McpSession>> {
        let live = self.live.read().await;
        let session = match (&live.state, &live.session) {
            (ConnectionState::Connected, Some(session)) => session.clone(),
            _ => return Err(McpError::NotConnected(self.id.clone())),
        };
        if !present(&live.catalog) {
            return Err(missing());
        }
        Ok(session)
    }

    /// Call a discovered tool and flatten its result to a string.
    ///
    /// A result the server flags as an error becomes
    /// [`McpError::ToolFailed`].
    pub async fn call_tool(&self, name: &str, args: Value) -> Result<String> {
        let session = self
            .session_for(
                |catalog| catalog.tools.contains_key(name),
                || McpError::UnknownTool {
                    server: self.id.clone(),
                    tool: name.to_string(),
                },
            )
            .await?;

        let arguments = match args {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(McpError::InvalidArguments {
                    target: name.to_string(),
                    reason: format!("expected an object, got {other}"),
                });
            }
        };

        tracing::debug!(server = %self.id, tool = %name, "Calling MCP tool");
        let output = session.call_tool(name, arguments).await?;
        let rendered = output.render();

        if output.is_error {
            tracing::debug!(server = %self.id, tool = %name, "MCP tool reported an error");
            return Err(McpError::ToolFailed {
                tool: name.to_string(),
                message: rendered,
            });
        }
        Ok(rendered)
    }

    pub async fn read_resource(&self, uri: &str) -> Result<ResourceContent> {
        let session = self
            .session_for(
                |catalog| catalog.resources.contains_key(uri),
                || McpError::UnknownResource {
                    server: self.id.clone(),
                    uri: uri.to_string(),
                },
            )
            .await?;

        tracing::debug!(server = %self.id, uri = %uri, "Reading MCP resource");
        session.read_resource(uri).await
    }

    /// Render a prompt. Arguments the prompt marks as required must be given.
    pub async fn get_prompt(&self, name: &str, args: BTreeMap<String, String>) -> Result<String> {
        let mut missing: Vec<String> = Vec::new();
        let session = self
            .session_for(
                |catalog| match catalog.prompts.get(name) {
                    Some(prompt) => {
                        missing = prompt
                            .arguments
                            .iter()
                            .filter(|arg| arg.required && !args.contains_key(&arg.name))
                            .map(|arg| arg.name.clone())
                            .collect();
                        true
                    }
                    None => false,
                },
                || McpError::UnknownPrompt {
                    server: self.id.clone(),
                    prompt: name.to_string(),
                },
            )
            .await?;

        if !missing.is_empty() {
            return Err(McpError::InvalidArguments {
                target: name.to_string(),
                reason: format!("missing required arguments: {}", missing.join(", ")),
            });
        }

        tracing::debug!(server = %self.id, prompt = %name, "Rendering MCP prompt");
        session.get_prompt(name, args).await
    }
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("id", &self.id)
            .field("transport", &self.config.transport.kind())
            .finish()
    }
}
