//! Toolset registry
//!
//! Provides a process-wide, append-only table of toolset declarations used to
//! instantiate toolsets on demand.

use crate::toolset::Toolset;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use once_cell::sync::Lazy;
use std::sync::Arc;
use zdk_core::{Result, Tool};

/// Global toolset registry
static REGISTRY: Lazy<ToolsetRegistry> = Lazy::new(ToolsetRegistry::new);

/// Builds the operation table of a toolset instance
pub type ToolsetFactory = Arc<dyn Fn() -> Result<Vec<Arc<dyn Tool>>> + Send + Sync>;

/// Static declaration of a toolset kind.
///
/// Registered once; every activation creates a fresh [`Toolset`] from it.
#[derive(Clone)]
pub struct ToolsetDescriptor {
    name: String,
    description: String,
    required_toolsets: Vec<String>,
    required_env: Vec<String>,
    requires_tool_use: bool,
    factory: ToolsetFactory,
}

impl ToolsetDescriptor {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Vec<Arc<dyn Tool>>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            required_toolsets: Vec::new(),
            required_env: Vec::new(),
            requires_tool_use: false,
            factory: Arc::new(factory),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare a toolset that must be active before this one
    pub fn requires(mut self, toolset: impl Into<String>) -> Self {
        self.required_toolsets.push(toolset.into());
        self
    }

    /// Declare an environment variable the toolset cannot work without
    pub fn requires_env(mut self, key: impl Into<String>) -> Self {
        self.required_env.push(key.into());
        self
    }

    /// Declare that the toolset only makes sense for agents that can call tools
    pub fn requires_tool_use(mut self, required: bool) -> Self {
        self.requires_tool_use = required;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required_toolsets(&self) -> &[String] {
        &self.required_toolsets
    }

    pub fn required_env(&self) -> &[String] {
        &self.required_env
    }

    pub fn needs_tool_use(&self) -> bool {
        self.requires_tool_use
    }

    /// Create a toolset instance.
    ///
    /// Validity is fixed here: missing environment keys, or a tool-use
    /// requirement the agent cannot meet, make the instance invalid.
    pub fn instantiate(&self, tool_use_enabled: bool) -> Result<Toolset> {
        let tools = (self.factory)()?;

        let missing: Vec<&str> = self
            .required_env
            .iter()
            .filter(|key| std::env::var_os(key.as_str()).is_none())
            .map(String::as_str)
            .collect();

        let invalid_reason = if !missing.is_empty() {
            Some(format!("missing environment keys: {}", missing.join(", ")))
        } else if self.requires_tool_use && !tool_use_enabled {
            Some("agent cannot use tools".to_string())
        } else {
            None
        };

        let toolset = Toolset::new(self.name.clone(), tools)
            .with_description(self.description.clone())
            .with_required_toolsets(self.required_toolsets.clone());

        Ok(match invalid_reason {
            Some(reason) => toolset.invalidated(reason),
            None => toolset,
        })
    }
}

impl std::fmt::Debug for ToolsetDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsetDescriptor")
            .field("name", &self.name)
            .field("required_toolsets", &self.required_toolsets)
            .field("required_env", &self.required_env)
            .field("requires_tool_use", &self.requires_tool_use)
            .finish()
    }
}

/// Registry of toolset declarations keyed by toolset name
pub struct ToolsetRegistry {
    toolsets: DashMap<String, ToolsetDescriptor>,
}

impl ToolsetRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            toolsets: DashMap::new(),
        }
    }

    /// Get the global registry instance
    pub fn global() -> &'static Self {
        &REGISTRY
    }

    /// Register a toolset declaration.
    ///
    /// Returns `true` if the toolset was added; a second registration under
    /// the same name is ignored and returns `false`.
    pub fn register(&self, descriptor: ToolsetDescriptor) -> bool {
        match self.toolsets.entry(descriptor.name.clone()) {
            Entry::Occupied(_) => {
                tracing::debug!(toolset = %descriptor.name, "Toolset already registered");
                false
            }
            Entry::Vacant(slot) => {
                tracing::debug!(
                    toolset = %descriptor.name,
                    requires = ?descriptor.required_toolsets,
                    "Registered toolset"
                );
                slot.insert(descriptor);
                true
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<ToolsetDescriptor> {
        self.toolsets.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.toolsets.contains_key(name)
    }

    /// Registered toolset names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.toolsets.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.toolsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toolsets.is_empty()
    }
}

impl Default for ToolsetRegistry {
    fn default() -> Self {
        Self::new()
    }
}
