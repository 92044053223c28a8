mod common;

use common::{init_logging, scripted_chest, server_file, stdio};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use zdk_core::{ToolCall, VendorFormat, ZConfig};
use zdk_mcp::testing::{ScriptedTransport, ServerScript};
use zdk_mcp::{CatalogKind, ConnectionState, McpError, McpResourceInfo, McpToolChest, McpToolInfo};
use zdk_tool::builtin::create_echo_tool;
use zdk_tool::{Tool, ToolsetDescriptor, ToolsetRegistry};

#[tokio::test]
async fn test_load_config_registers_one_disconnected_server() {
    let file = server_file(".json", r#"{"servers":{"echo":{"command":"echo_server"}}}"#);
    let transport = Arc::new(ScriptedTransport::new());
    let chest = scripted_chest(&transport, 3);

    assert_eq!(chest.load_config(file.path()).unwrap(), 1);
    assert_eq!(chest.server_ids(), vec!["echo"]);

    let server = chest.server("echo").unwrap();
    assert_eq!(server.state().await, ConnectionState::Disconnected);
    assert!(server.tools().await.is_empty());
    assert!(server.resources().await.is_empty());
    assert!(server.prompts().await.is_empty());

    // Loading configuration never touches the transport
    assert_eq!(transport.attempts("echo"), 0);
}

#[tokio::test]
async fn test_load_config_errors() {
    let chest = scripted_chest(&Arc::new(ScriptedTransport::new()), 1);

    assert!(matches!(
        chest.load_config("/no/such/servers.yaml"),
        Err(McpError::ConfigNotFound(_))
    ));

    let no_servers = server_file(".yaml", "mcp:\n  files: {}\n");
    assert!(matches!(
        chest.load_config(no_servers.path()),
        Err(McpError::MissingServersKey)
    ));

    let ini = server_file(".ini", "[servers]\n");
    assert!(matches!(
        chest.load_config(ini.path()),
        Err(McpError::UnsupportedFormat(_))
    ));

    assert!(chest.server_ids().is_empty());
}

#[tokio::test]
async fn test_connect_servers_isolates_failures() {
    init_logging();
    let transport = Arc::new(ScriptedTransport::new().script("bad", ServerScript::failing()));
    let chest = scripted_chest(&transport, 2);
    chest.add_server("bad", stdio("bad_server")).unwrap();
    chest.add_server("good", stdio("good_server")).unwrap();

    let results = chest.connect_servers().await;

    let expected = BTreeMap::from([("bad".to_string(), false), ("good".to_string(), true)]);
    assert_eq!(results, expected);
    assert_eq!(
        chest.server("bad").unwrap().state().await,
        ConnectionState::Failed
    );
    assert!(chest.chest().is_active("mcp-good"));
    assert!(!chest.chest().is_active("mcp-bad"));
}

#[tokio::test]
async fn test_retries_are_bounded_without_handle_growth() {
    init_logging();
    let transport = Arc::new(ScriptedTransport::new().script("down", ServerScript::failing()));
    let chest = scripted_chest(&transport, 5);
    chest.add_server("down", stdio("down_server")).unwrap();

    assert!(!chest.connect_server("down").await);
    assert_eq!(transport.attempts("down"), 5);
    assert_eq!(transport.peak_live_handles(), 1);
    assert_eq!(transport.live_handles(), 0);

    // A failed server can be retried later
    assert!(!chest.connect_server("down").await);
    assert_eq!(transport.attempts("down"), 10);
}

#[tokio::test]
async fn test_per_server_retry_override() {
    let transport = Arc::new(ScriptedTransport::new().script("down", ServerScript::failing()));
    let chest = scripted_chest(&transport, 5);
    chest
        .add_server("down", stdio("down_server").max_retries(2))
        .unwrap();

    assert!(!chest.connect_server("down").await);
    assert_eq!(transport.attempts("down"), 2);
}

#[tokio::test]
async fn test_invocation_preconditions_do_not_reach_server() {
    let transport = Arc::new(ScriptedTransport::new());
    let chest = scripted_chest(&transport, 1);
    chest.add_server("echo", stdio("echo_server")).unwrap();
    let server = chest.server("echo").unwrap();

    let err = server.call_tool("echo", json!({"message": "hi"})).await.unwrap_err();
    assert!(matches!(err, McpError::NotConnected(_)));

    assert!(chest.connect_server("echo").await);
    let err = server.call_tool("shout", json!({})).await.unwrap_err();
    assert!(matches!(err, McpError::UnknownTool { .. }));
    let err = server.read_resource("file:///missing").await.unwrap_err();
    assert!(matches!(err, McpError::UnknownResource { .. }));

    assert_eq!(transport.tool_calls(), 0);

    let echoed = server.call_tool("echo", json!({"message": "hi"})).await.unwrap();
    assert_eq!(echoed, "hi");
    assert_eq!(transport.tool_calls(), 1);
}

#[tokio::test]
async fn test_reactivation_reuses_connection() {
    init_logging();
    let transport = Arc::new(ScriptedTransport::new());
    let chest = scripted_chest(&transport, 3);
    chest.add_server("files", stdio("files_server")).unwrap();

    assert!(chest.activate_toolsets(&["mcp-files"]).await);
    assert_eq!(chest.tool_schemas().len(), 1);

    assert!(chest.deactivate_toolsets(&["mcp-files"]));
    assert!(chest.tool_schemas().is_empty());
    assert!(chest.server("files").unwrap().is_connected().await);

    assert!(chest.activate_toolsets(&["mcp-files"]).await);
    assert_eq!(chest.tool_schemas().len(), 1);
    assert_eq!(transport.attempts("files"), 1);
}

#[tokio::test]
async fn test_discovery_degrades_per_catalog() {
    let script = ServerScript::default()
        .resource(McpResourceInfo {
            uri: "file:///readme.md".to_string(),
            name: "readme".to_string(),
            description: None,
            mime_type: Some("text/markdown".to_string()),
        })
        .broken(CatalogKind::Prompts);
    let transport = Arc::new(ScriptedTransport::new().script("docs", script));
    let chest = scripted_chest(&transport, 1);
    chest.add_server("docs", stdio("docs_server")).unwrap();

    assert!(chest.connect_server("docs").await);
    let server = chest.server("docs").unwrap();

    assert_eq!(server.tools().await.len(), 1);
    assert!(server.prompts().await.is_empty());

    let resource = server.read_resource("file:///readme.md").await.unwrap();
    assert_eq!(resource.content, "contents of readme");
    assert_eq!(resource.mime_type.as_deref(), Some("text/markdown"));
}

#[tokio::test]
async fn test_shutdown_reports_every_server() {
    init_logging();
    let transport = Arc::new(ScriptedTransport::new());
    let chest = scripted_chest(&transport, 1);
    chest.add_server("live", stdio("live_server")).unwrap();
    chest.add_server("idle", stdio("idle_server")).unwrap();
    assert!(chest.connect_server("live").await);

    let results = chest.shutdown().await;

    assert_eq!(results.len(), 2);
    assert!(results.values().all(|ok| *ok));
    assert_eq!(transport.live_handles(), 0);
    assert!(chest.chest().active_names().is_empty());

    // Safe to repeat
    let again = chest.shutdown().await;
    assert!(again.values().all(|ok| *ok));
}

#[tokio::test]
async fn test_from_config_loads_server_file() {
    let file = server_file(
        ".yaml",
        "servers:\n  files:\n    command: files_server\n  search:\n    url: http://localhost:8931/mcp\n",
    );
    let mut config = ZConfig::test_defaults();
    config.mcp.config_path = Some(file.path().to_string_lossy().into_owned());
    config.mcp.max_retries = 4;
    config.toolsets.default = vec!["mcp-files".to_string()];

    let transport = Arc::new(ScriptedTransport::new());
    let chest = McpToolChest::from_config(&config, transport.clone()).unwrap();

    assert_eq!(chest.server_ids(), vec!["files", "search"]);
    assert_eq!(chest.retry_policy().max_retries, 4);
    assert_eq!(chest.chest().vendor(), config.agent.vendor);

    assert!(chest.activate_default_toolsets().await);
    assert_eq!(chest.chest().active_names(), vec!["mcp-files"]);
    assert_eq!(transport.attempts("search"), 0);
}

#[tokio::test]
async fn test_server_tools_dispatch_through_chest() {
    let script = ServerScript::default().tools(vec![
        McpToolInfo::new("lookup", "Look something up"),
        McpToolInfo::new("explode", "Always fails"),
    ]);
    let transport = Arc::new(
        ScriptedTransport::new().script("kb", script.failing_tool("explode")),
    );
    let chest = scripted_chest(&transport, 1);
    chest.add_server("kb", stdio("kb_server")).unwrap();
    assert!(chest.activate_toolsets(&["mcp-kb"]).await);

    let calls = vec![
        ToolCall::new("c1", "mcp-kb__lookup", json!({"message": "rust"})),
        ToolCall::new("c2", "mcp-kb__explode", json!({})),
    ];
    let outcomes = chest.chest().execute_calls(&calls, VendorFormat::Claude).await;

    assert_eq!(outcomes[0].content, "rust");
    assert!(!outcomes[0].is_error);
    assert!(outcomes[1].is_error);
    assert!(outcomes[1].content.starts_with("Tool mcp-kb__explode failed:"));
}

fn echo_tools() -> zdk_core::Result<Vec<Arc<dyn Tool>>> {
    Ok(vec![Arc::new(create_echo_tool()?) as Arc<dyn Tool>])
}

#[test]
fn test_registry_registration_is_idempotent() {
    let registry = ToolsetRegistry::new();

    assert!(registry.register(ToolsetDescriptor::new("echo", echo_tools)));
    assert!(!registry.register(ToolsetDescriptor::new("echo", echo_tools)));
    assert_eq!(registry.len(), 1);
}
