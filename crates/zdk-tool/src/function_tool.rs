use crate::schema::{ToolSchema, parameters_schema};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use zdk_core::{Error, Result, Tool, ToolContext, ToolResponse};

/// Type alias for tool execution function
pub type ToolFn = Box<
    dyn Fn(
            Arc<dyn ToolContext>,
            Value,
        ) -> Pin<Box<dyn Future<Output = Result<ToolResponse>> + Send>>
        + Send
        + Sync,
>;

/// A function-based tool implementation
///
/// One `FunctionTool` is one row of a toolset's operation table: the
/// operation name, its description, its parameter schema and the handler.
pub struct FunctionTool {
    name: String,
    description: String,
    schema: Value,
    execute_fn: ToolFn,
}

impl FunctionTool {
    pub fn builder() -> FunctionToolBuilder {
        FunctionToolBuilder::new()
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish()
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, ctx: Arc<dyn ToolContext>, params: Value) -> Result<ToolResponse> {
        match (self.execute_fn)(ctx, params).await {
            Err(Error::InvalidArguments { reason, .. }) => Err(Error::InvalidArguments {
                tool: self.name.clone(),
                reason,
            }),
            other => other,
        }
    }
}

/// Builder for FunctionTool
pub struct FunctionToolBuilder {
    name: Option<String>,
    description: Option<String>,
    schema: Option<Value>,
    execute_fn: Option<ToolFn>,
}

impl FunctionToolBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            description: None,
            schema: None,
            execute_fn: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Derive the parameter schema from a Rust type
    pub fn params<P: JsonSchema>(mut self) -> Self {
        self.schema = Some(parameters_schema::<P>());
        self
    }

    pub fn execute<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<dyn ToolContext>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResponse>> + Send + 'static,
    {
        self.execute_fn = Some(Box::new(move |ctx, params| Box::pin(f(ctx, params))));
        self
    }

    /// Typed handler: the argument mapping is deserialized into `P` before
    /// the handler runs. Arguments that do not fit `P` fail with
    /// `Error::InvalidArguments`.
    pub fn handler<P, F, Fut>(mut self, f: F) -> Self
    where
        P: DeserializeOwned + Send + 'static,
        F: Fn(Arc<dyn ToolContext>, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResponse>> + Send + 'static,
    {
        let f = Arc::new(f);
        self.execute_fn = Some(Box::new(move |ctx, params| {
            let f = f.clone();
            Box::pin(async move {
                let params = if params.is_null() {
                    Value::Object(serde_json::Map::new())
                } else {
                    params
                };
                let typed: P =
                    serde_json::from_value(params).map_err(|e| Error::InvalidArguments {
                        tool: String::new(),
                        reason: e.to_string(),
                    })?;
                f(ctx, typed).await
            })
        }));
        self
    }

    pub fn build(self) -> Result<FunctionTool> {
        Ok(FunctionTool {
            name: self
                .name
                .ok_or_else(|| Error::config_error("Tool name is required"))?,
            description: self
                .description
                .ok_or_else(|| Error::config_error("Tool description is required"))?,
            schema: self.schema.unwrap_or_else(|| ToolSchema::new().build()),
            execute_fn: self
                .execute_fn
                .ok_or_else(|| Error::config_error("Tool execute function is required"))?,
        })
    }
}

impl Default for FunctionToolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
