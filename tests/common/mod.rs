//! Shared fixtures for workspace tests

#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use zdk_core::{VendorFormat, ZConfig};
use zdk_mcp::testing::ScriptedTransport;
use zdk_mcp::{McpServerConfig, McpToolChest, RetryPolicy, StdioConnectionParams};
use zdk_telemetry::{TelemetryConfig, init_telemetry};
use zdk_tool::ToolChest;

/// Install the test subscriber once; later calls are no-ops
pub fn init_logging() {
    let observability = ZConfig::test_defaults().observability;
    init_telemetry(&TelemetryConfig {
        service_name: observability.service_name,
        json_logs: observability.json_logs,
        filter: observability.filter,
    });
}

/// Write a server file with the given extension
pub fn server_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

pub fn stdio(command: &str) -> McpServerConfig {
    McpServerConfig::stdio(StdioConnectionParams::new(command))
}

/// Chest over a scripted transport that retries without delay
pub fn scripted_chest(transport: &Arc<ScriptedTransport>, max_retries: u32) -> McpToolChest {
    McpToolChest::new(ToolChest::new(VendorFormat::Claude))
        .with_transport(transport.clone())
        .with_retry(RetryPolicy::new(max_retries, Duration::ZERO))
}
