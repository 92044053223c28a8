//! Built-in toolsets

pub mod calculator;
pub mod echo;

pub use calculator::{CALCULATOR_TOOLSET, create_calculator_tool};
pub use echo::{ECHO_TOOLSET, create_echo_tool};

use crate::registry::{ToolsetDescriptor, ToolsetRegistry};
use std::sync::Arc;
use zdk_core::Tool;

/// Register the built-in toolsets with the global registry.
///
/// Safe to call more than once.
pub fn register_builtin_toolsets() {
    let registry = ToolsetRegistry::global();

    registry.register(
        ToolsetDescriptor::new(ECHO_TOOLSET, || {
            Ok(vec![Arc::new(create_echo_tool()?) as Arc<dyn Tool>])
        })
        .description("Echoes messages back; useful for testing tool execution"),
    );
    registry.register(
        ToolsetDescriptor::new(CALCULATOR_TOOLSET, || {
            Ok(vec![Arc::new(create_calculator_tool()?) as Arc<dyn Tool>])
        })
        .description("Evaluates arithmetic expressions")
        .requires_tool_use(true),
    );
}
