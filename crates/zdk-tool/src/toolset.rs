//! Toolset instances
//!
//! A toolset is a named bundle of tools activated as a unit. Its operations
//! are advertised to the agent under qualified names of the form
//! `<toolset>__<operation>`.

use crate::schema::ToolSchemaDescriptor;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::{Arc, OnceLock, Weak};
use zdk_core::{Error, Result, Tool, ToolContext, ToolResponse};

/// Separator between toolset name and operation name
pub const TOOL_NAME_SEPARATOR: &str = "__";

/// Active toolsets of one chest, keyed by toolset name
pub(crate) type ActiveToolsets = DashMap<String, Arc<Toolset>>;

/// Build the qualified name of an operation
pub fn qualify(toolset: &str, operation: &str) -> String {
    format!("{toolset}{TOOL_NAME_SEPARATOR}{operation}")
}

/// Split a qualified name into `(toolset, operation)` at the first separator
pub fn split_qualified(name: &str) -> Option<(&str, &str)> {
    name.split_once(TOOL_NAME_SEPARATOR)
}

/// A live toolset owned by one [`ToolChest`](crate::ToolChest)
pub struct Toolset {
    name: String,
    description: String,
    tools: Vec<Arc<dyn Tool>>,
    required_toolsets: Vec<String>,
    invalid_reason: Option<String>,
    schemas: OnceLock<Vec<ToolSchemaDescriptor>>,
    owner: OnceLock<Weak<ActiveToolsets>>,
}

impl Toolset {
    pub fn new(name: impl Into<String>, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            tools,
            required_toolsets: Vec::new(),
            invalid_reason: None,
            schemas: OnceLock::new(),
            owner: OnceLock::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn with_required_toolsets(mut self, required: Vec<String>) -> Self {
        self.required_toolsets = required;
        self
    }

    pub(crate) fn invalidated(mut self, reason: String) -> Self {
        self.invalid_reason = Some(reason);
        self
    }

    pub(crate) fn attach(&self, owner: Weak<ActiveToolsets>) {
        if self.owner.set(owner).is_err() {
            tracing::debug!(toolset = %self.name, "Toolset already attached to a chest");
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn required_toolsets(&self) -> &[String] {
        &self.required_toolsets
    }

    /// Whether the toolset may be advertised to the agent
    pub fn is_valid(&self) -> bool {
        self.invalid_reason.is_none()
    }

    pub fn invalid_reason(&self) -> Option<&str> {
        self.invalid_reason.as_deref()
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    /// Unqualified operation names
    pub fn operation_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// Operation schemas under qualified names.
    ///
    /// Built on first access and fixed for the lifetime of the instance;
    /// every call returns an independent copy.
    pub fn schemas(&self) -> Vec<ToolSchemaDescriptor> {
        self.schemas
            .get_or_init(|| {
                self.tools
                    .iter()
                    .map(|tool| ToolSchemaDescriptor {
                        name: qualify(&self.name, tool.name()),
                        description: tool.description().to_string(),
                        parameters: tool.schema(),
                    })
                    .collect()
            })
            .clone()
    }

    /// Invoke an operation by plain or qualified name.
    ///
    /// A leading `<toolset>__` prefix is stripped before lookup. Null
    /// arguments are passed as an empty object.
    pub async fn call(
        &self,
        ctx: Arc<dyn ToolContext>,
        operation: &str,
        args: Value,
    ) -> Result<ToolResponse> {
        let prefix = format!("{}{}", self.name, TOOL_NAME_SEPARATOR);
        let operation = operation.strip_prefix(prefix.as_str()).unwrap_or(operation);

        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == operation)
            .ok_or_else(|| Error::UnknownOperation {
                toolset: self.name.clone(),
                operation: operation.to_string(),
            })?;

        let args = if args.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            args
        };

        tracing::debug!(
            toolset = %self.name,
            tool = %operation,
            invocation_id = %ctx.invocation_id(),
            "Invoking toolset operation"
        );

        tool.execute(ctx, args).await
    }

    /// Look up a sibling toolset active in the same chest.
    ///
    /// A missing sibling is `Ok(None)`; only a toolset without an owning
    /// chest is an error.
    pub fn get_dependency(&self, name: &str) -> Result<Option<Arc<Toolset>>> {
        let active = self
            .owner
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| Error::NoOwner(self.name.clone()))?;

        Ok(active.get(name).map(|entry| entry.value().clone()))
    }
}

impl std::fmt::Debug for Toolset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolset")
            .field("name", &self.name)
            .field("operations", &self.operation_names())
            .field("valid", &self.is_valid())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{create_calculator_tool, create_echo_tool};
    use crate::context::DefaultToolContext;
    use serde_json::json;

    fn ctx() -> Arc<dyn ToolContext> {
        Arc::new(DefaultToolContext::new("call-1", "inv-1"))
    }

    fn echo_toolset() -> Toolset {
        Toolset::new("echo", vec![Arc::new(create_echo_tool().unwrap()) as Arc<dyn Tool>])
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(qualify("mcp-files", "read"), "mcp-files__read");
        assert_eq!(split_qualified("mcp-files__read"), Some(("mcp-files", "read")));
        assert_eq!(split_qualified("a__b__c"), Some(("a", "b__c")));
        assert_eq!(split_qualified("plain"), None);
    }

    #[test]
    fn test_schemas_are_cached_copies() {
        let toolset = echo_toolset();

        let mut first = toolset.schemas();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, "echo__echo");

        first[0].name = "tampered".to_string();
        first.clear();

        let second = toolset.schemas();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].name, "echo__echo");
    }

    #[tokio::test]
    async fn test_call_strips_prefix() {
        let toolset = echo_toolset();

        let plain = toolset
            .call(ctx(), "echo", json!({"message": "hi"}))
            .await
            .unwrap();
        let qualified = toolset
            .call(ctx(), "echo__echo", json!({"message": "hi"}))
            .await
            .unwrap();

        assert_eq!(plain.result["message"], "hi");
        assert_eq!(qualified.result["message"], "hi");
    }

    #[tokio::test]
    async fn test_call_unknown_operation() {
        let toolset = echo_toolset();
        let err = toolset.call(ctx(), "shout", json!({})).await.unwrap_err();

        assert!(matches!(
            err,
            Error::UnknownOperation { ref toolset, ref operation }
                if toolset == "echo" && operation == "shout"
        ));
    }

    #[test]
    fn test_get_dependency_without_owner_fails() {
        let toolset = echo_toolset();
        assert!(matches!(
            toolset.get_dependency("calculator"),
            Err(Error::NoOwner(_))
        ));
    }

    #[test]
    fn test_get_dependency_through_owner() {
        let active: Arc<ActiveToolsets> = Arc::new(DashMap::new());
        let calculator = Arc::new(Toolset::new(
            "calculator",
            vec![Arc::new(create_calculator_tool().unwrap()) as Arc<dyn Tool>],
        ));
        let echo = Arc::new(echo_toolset());
        echo.attach(Arc::downgrade(&active));
        active.insert("calculator".to_string(), calculator);
        active.insert("echo".to_string(), echo.clone());

        let found = echo.get_dependency("calculator").unwrap();
        assert_eq!(found.unwrap().name(), "calculator");
        assert!(echo.get_dependency("search").unwrap().is_none());
    }
}
