//! Tool chest with MCP server-backed toolsets

use crate::client::RmcpTransport;
use crate::config::{McpServerConfig, parse_config_file, validate_server_id};
use crate::error::{McpError, Result};
use crate::fanout::fan_out;
use crate::retry::RetryPolicy;
use crate::server::McpServer;
use crate::toolset::{McpToolset, server_id_from_toolset, server_toolset_name};
use crate::transport::McpTransport;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use zdk_core::{ToolCall, VendorFormat, ZConfig};
use zdk_tool::{DispatchOutput, ToolChest, ToolSchemaDescriptor};

/// A [`ToolChest`] that also manages MCP server connections.
///
/// Toolset names of the form `mcp-<server_id>` refer to configured servers.
/// Activating one connects the server (reusing a live connection) and binds
/// a toolset over its tool catalog. Deactivating only unbinds the toolset;
/// the connection stays open until [`disconnect_server`](Self::disconnect_server)
/// or [`shutdown`](Self::shutdown).
pub struct McpToolChest {
    chest: ToolChest,
    servers: DashMap<String, Arc<McpServer>>,
    transport: Arc<dyn McpTransport>,
    retry: RetryPolicy,
    default_toolsets: Vec<String>,
    cancel: CancellationToken,
}

impl McpToolChest {
    pub fn new(chest: ToolChest) -> Self {
        Self {
            chest,
            servers: DashMap::new(),
            transport: Arc::new(RmcpTransport::new()),
            retry: RetryPolicy::default(),
            default_toolsets: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Build a chest from process configuration.
    ///
    /// Servers listed in `[mcp].config_path` are added but not connected;
    /// `[toolsets].default` is remembered for
    /// [`activate_default_toolsets`](Self::activate_default_toolsets).
    pub fn from_config(config: &ZConfig, transport: Arc<dyn McpTransport>) -> Result<Self> {
        let mut chest = Self::new(ToolChest::from_config(config))
            .with_transport(transport)
            .with_retry(RetryPolicy::from_config(&config.mcp));
        chest.default_toolsets = config.toolsets.default.clone();

        if let Some(path) = &config.mcp.config_path {
            chest.load_config(path)?;
        }
        Ok(chest)
    }

    /// Use another transport for servers added from now on
    pub fn with_transport(mut self, transport: Arc<dyn McpTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The native chest holding every active toolset
    pub fn chest(&self) -> &ToolChest {
        &self.chest
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Add a server configuration. No connection is made.
    pub fn add_server(&self, server_id: impl Into<String>, config: McpServerConfig) -> Result<()> {
        let server_id = server_id.into();
        validate_server_id(&server_id)?;

        match self.servers.entry(server_id.clone()) {
            Entry::Occupied(_) => Err(McpError::DuplicateServer(server_id)),
            Entry::Vacant(slot) => {
                tracing::debug!(
                    server = %server_id,
                    transport = %config.transport.kind(),
                    "Added MCP server"
                );
                slot.insert(Arc::new(McpServer::new(
                    server_id,
                    config,
                    self.transport.clone(),
                )));
                Ok(())
            }
        }
    }

    /// Add every server listed in a YAML or JSON file.
    ///
    /// Nothing is added if the file is invalid or names an id that is
    /// already configured. Returns the number of servers added.
    pub fn load_config(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let servers = parse_config_file(path)?;

        if let Some(existing) = servers.keys().find(|id| self.servers.contains_key(*id)) {
            return Err(McpError::DuplicateServer(existing.clone()));
        }

        let count = servers.len();
        for (id, config) in servers {
            self.add_server(id, config)?;
        }

        tracing::info!(path = %path.display(), servers = count, "Loaded MCP server config");
        Ok(count)
    }

    pub fn server(&self, server_id: &str) -> Option<Arc<McpServer>> {
        self.servers.get(server_id).map(|entry| entry.value().clone())
    }

    /// Configured server ids, sorted
    pub fn server_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.servers.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Connect one server and bind its toolset.
    ///
    /// Returns `false` if the server is unknown or could not be reached;
    /// the chest itself is unaffected.
    pub async fn connect_server(&self, server_id: &str) -> bool {
        match self.try_connect_server(server_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(server = %server_id, error = %e, "Failed to connect MCP server");
                false
            }
        }
    }

    async fn try_connect_server(&self, server_id: &str) -> Result<()> {
        let server = self
            .server(server_id)
            .ok_or_else(|| McpError::UnknownServer(server_id.to_string()))?;

        let policy = self.retry.for_server(server.config());
        server.connect_until(&policy, &self.cancel).await?;
        if self.cancel.is_cancelled() {
            return Err(McpError::Cancelled);
        }

        let toolset = McpToolset::new(server).build().await?;
        let name = toolset.name().to_string();
        self.chest.bind(toolset);

        // shutdown cancels before it unbinds, so a bind that raced it is undone here
        if self.cancel.is_cancelled() {
            self.chest.unbind(&name);
            return Err(McpError::Cancelled);
        }
        Ok(())
    }

    /// Connect every configured server concurrently
    pub async fn connect_servers(&self) -> BTreeMap<String, bool> {
        fan_out(self.server_ids(), |id| async move {
            self.try_connect_server(&id).await.map(|()| true)
        })
        .await
    }

    /// Close a server's connection and unbind its toolset
    pub async fn disconnect_server(&self, server_id: &str) -> bool {
        let Some(server) = self.server(server_id) else {
            tracing::warn!(server = %server_id, "Cannot disconnect unknown MCP server");
            return false;
        };

        self.chest.unbind(&server_toolset_name(server_id));
        server.disconnect().await
    }

    /// Activate native and server-backed toolsets.
    ///
    /// `mcp-<server_id>` names connect their servers concurrently; other
    /// names go through the native registry. Returns `true` only if every
    /// name activated.
    pub async fn activate_toolsets<S: AsRef<str>>(&self, names: &[S]) -> bool {
        let (remote, native): (Vec<&str>, Vec<&str>) = names
            .iter()
            .map(AsRef::as_ref)
            .partition(|name| server_id_from_toolset(name).is_some());

        let native_ok = native.is_empty() || self.chest.activate_toolsets(native.as_slice());

        let pending: Vec<String> = remote
            .into_iter()
            .filter(|name| !self.chest.is_active(name))
            .filter_map(server_id_from_toolset)
            .map(str::to_string)
            .collect();

        let remote_ok = fan_out(pending, |id| async move {
            self.try_connect_server(&id).await.map(|()| true)
        })
        .await
        .values()
        .all(|ok| *ok);

        native_ok && remote_ok
    }

    /// Activate the toolsets named in the startup configuration
    pub async fn activate_default_toolsets(&self) -> bool {
        if self.default_toolsets.is_empty() {
            return true;
        }
        tracing::info!(toolsets = ?self.default_toolsets, "Activating default toolsets");
        self.activate_toolsets(self.default_toolsets.as_slice()).await
    }

    /// Unbind toolsets. Server connections stay open for reuse.
    pub fn deactivate_toolsets<S: AsRef<str>>(&self, names: &[S]) -> bool {
        for name in names {
            if let Some(server_id) = server_id_from_toolset(name.as_ref()) {
                tracing::debug!(server = %server_id, "Unbinding MCP toolset; connection kept");
            }
        }
        self.chest.deactivate_toolsets(names)
    }

    /// Disconnect every configured server.
    ///
    /// In-flight connection attempts are cancelled first, and the chest
    /// will not connect servers afterwards. Servers that were never
    /// connected report `true`.
    pub async fn shutdown(&self) -> BTreeMap<String, bool> {
        self.cancel.cancel();
        let ids = self.server_ids();
        tracing::info!(servers = ids.len(), "Shutting down MCP servers");

        let results = fan_out(ids, |id| async move {
            self.chest.unbind(&server_toolset_name(&id));
            match self.server(&id) {
                Some(server) => Ok(server.disconnect().await),
                None => Ok(true),
            }
        })
        .await;

        let failed = results.values().filter(|ok| !**ok).count();
        if failed > 0 {
            tracing::warn!(failed, "Some MCP servers did not shut down cleanly");
        }
        results
    }

    /// Stop in-flight and future connection attempts
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run a batch of tool calls against the active toolsets
    pub async fn dispatch(&self, calls: &[ToolCall], format: VendorFormat) -> DispatchOutput {
        self.chest.dispatch(calls, format).await
    }

    pub fn tool_schemas(&self) -> Vec<ToolSchemaDescriptor> {
        self.chest.tool_schemas()
    }

    pub fn tool_definitions(&self) -> Vec<Value> {
        self.chest.tool_definitions()
    }
}

impl std::fmt::Debug for McpToolChest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpToolChest")
            .field("chest", &self.chest)
            .field("servers", &self.server_ids())
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::StdioConnectionParams;
    use crate::testing::{ScriptedTransport, ServerScript};
    use crate::types::{CatalogKind, ConnectionState};
    use std::io::Write;
    use std::time::Duration;
    use zdk_tool::builtin::register_builtin_toolsets;

    fn chest_with(transport: Arc<ScriptedTransport>) -> McpToolChest {
        McpToolChest::new(ToolChest::new(VendorFormat::Claude))
            .with_transport(transport)
            .with_retry(RetryPolicy::new(2, Duration::ZERO))
    }

    fn stdio(command: &str) -> McpServerConfig {
        McpServerConfig::stdio(StdioConnectionParams::new(command))
    }

    #[tokio::test]
    async fn test_load_config_registers_disconnected_server() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"servers":{"echo":{"command":"echo_server"}}}"#)
            .unwrap();

        let chest = chest_with(Arc::new(ScriptedTransport::new()));
        assert_eq!(chest.load_config(file.path()).unwrap(), 1);

        let server = chest.server("echo").unwrap();
        assert_eq!(server.state().await, ConnectionState::Disconnected);
        assert!(server.catalog().await.is_empty());

        let err = chest.load_config(file.path()).unwrap_err();
        assert!(matches!(err, McpError::DuplicateServer(ref id) if id == "echo"));
    }

    #[test]
    fn test_add_server_rejects_duplicates_and_bad_ids() {
        let chest = chest_with(Arc::new(ScriptedTransport::new()));

        chest.add_server("files", stdio("files")).unwrap();
        assert!(matches!(
            chest.add_server("files", stdio("other")),
            Err(McpError::DuplicateServer(_))
        ));
        assert!(matches!(
            chest.add_server("bad__id", stdio("x")),
            Err(McpError::InvalidConfig { .. })
        ));
        assert_eq!(chest.server_ids(), vec!["files"]);
    }

    #[tokio::test]
    async fn test_connect_unknown_server() {
        let chest = chest_with(Arc::new(ScriptedTransport::new()));
        assert!(!chest.connect_server("ghost").await);
    }

    #[tokio::test]
    async fn test_connect_server_binds_toolset() {
        let transport = Arc::new(ScriptedTransport::new());
        let chest = chest_with(transport.clone());
        chest.add_server("files", stdio("files")).unwrap();

        assert!(chest.connect_server("files").await);
        assert!(chest.chest().is_active("mcp-files"));

        let names: Vec<String> = chest.tool_schemas().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["mcp-files__echo"]);
    }

    #[tokio::test]
    async fn test_mixed_activation() {
        register_builtin_toolsets();
        let transport = Arc::new(ScriptedTransport::new());
        let chest = chest_with(transport.clone());
        chest.add_server("files", stdio("files")).unwrap();

        assert!(chest.activate_toolsets(&["echo", "mcp-files"]).await);
        assert_eq!(chest.chest().active_names(), vec!["echo", "mcp-files"]);

        assert!(!chest.activate_toolsets(&["mcp-ghost", "calculator"]).await);
        assert!(chest.chest().is_active("calculator"));
    }

    #[tokio::test]
    async fn test_disconnect_server_unbinds_toolset() {
        let transport = Arc::new(ScriptedTransport::new());
        let chest = chest_with(transport.clone());
        chest.add_server("files", stdio("files")).unwrap();
        assert!(chest.connect_server("files").await);

        assert!(chest.disconnect_server("files").await);
        assert!(!chest.chest().is_active("mcp-files"));
        assert_eq!(transport.live_handles(), 0);
        assert!(!chest.disconnect_server("ghost").await);
    }

    #[tokio::test]
    async fn test_stalled_discovery_does_not_block_siblings() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .script("stuck", ServerScript::default().stall(CatalogKind::Tools)),
        );
        let chest = McpToolChest::new(ToolChest::new(VendorFormat::Claude))
            .with_transport(transport.clone())
            .with_retry(
                RetryPolicy::new(2, Duration::ZERO)
                    .with_connect_timeout(Some(Duration::from_millis(50))),
            );
        chest.add_server("good", stdio("good")).unwrap();
        chest.add_server("stuck", stdio("stuck")).unwrap();

        let results = tokio::time::timeout(Duration::from_secs(2), chest.connect_servers())
            .await
            .expect("connect_servers waited on a stalled listing");
        assert_eq!(results.get("good"), Some(&true));
        assert_eq!(results.get("stuck"), Some(&true));

        let names: Vec<String> = chest.tool_schemas().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["mcp-good__echo"]);
    }

    #[tokio::test]
    async fn test_cancelled_chest_does_not_rebind_live_server() {
        let transport = Arc::new(ScriptedTransport::new());
        let chest = chest_with(transport.clone());
        chest.add_server("files", stdio("files")).unwrap();
        assert!(chest.activate_toolsets(&["mcp-files"]).await);
        assert!(chest.deactivate_toolsets(&["mcp-files"]));

        chest.cancel();
        assert!(!chest.activate_toolsets(&["mcp-files"]).await);
        assert!(!chest.chest().is_active("mcp-files"));
        assert_eq!(transport.attempts("files"), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_pending_connects() {
        let transport =
            Arc::new(ScriptedTransport::new().script("slow", ServerScript::default().hang()));
        let chest = Arc::new(
            McpToolChest::new(ToolChest::new(VendorFormat::Claude))
                .with_transport(transport.clone())
                .with_retry(RetryPolicy::new(3, Duration::ZERO).with_connect_timeout(None)),
        );
        chest.add_server("slow", stdio("slow")).unwrap();

        let pending = {
            let chest = chest.clone();
            tokio::spawn(async move { chest.connect_server("slow").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let results = chest.shutdown().await;
        assert_eq!(results.get("slow"), Some(&true));
        assert!(!pending.await.unwrap());
        assert_eq!(transport.attempts("slow"), 1);
        assert_eq!(transport.live_handles(), 0);
    }
}
