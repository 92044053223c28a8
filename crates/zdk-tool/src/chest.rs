//! Tool chest: the set of toolsets currently active for one agent

use crate::registry::ToolsetRegistry;
use crate::schema::ToolSchemaDescriptor;
use crate::toolset::{ActiveToolsets, Toolset};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use zdk_core::{VendorFormat, ZConfig};

/// Tracks active toolsets and dispatches tool calls to them.
///
/// At most one instance per toolset name is active at a time. Activation and
/// deactivation of the same name must not overlap; callers serialize them.
pub struct ToolChest {
    vendor: VendorFormat,
    tool_use_enabled: bool,
    registry: &'static ToolsetRegistry,
    active: Arc<ActiveToolsets>,
}

impl ToolChest {
    pub fn new(vendor: VendorFormat) -> Self {
        Self {
            vendor,
            tool_use_enabled: true,
            registry: ToolsetRegistry::global(),
            active: Arc::new(DashMap::new()),
        }
    }

    /// Create a chest for the agent described in the configuration
    pub fn from_config(config: &ZConfig) -> Self {
        Self::new(config.agent.vendor).with_tool_use(config.agent.tool_use)
    }

    /// Resolve toolsets from a registry other than the global one
    pub fn with_registry(mut self, registry: &'static ToolsetRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_tool_use(mut self, enabled: bool) -> Self {
        self.tool_use_enabled = enabled;
        self
    }

    pub fn vendor(&self) -> VendorFormat {
        self.vendor
    }

    pub fn tool_use_enabled(&self) -> bool {
        self.tool_use_enabled
    }

    pub fn registry(&self) -> &'static ToolsetRegistry {
        self.registry
    }

    /// Activate registered toolsets by name.
    ///
    /// Declared dependencies are activated first. Names already active are
    /// left alone. Returns `true` only if every requested toolset (and its
    /// dependencies) activated; failures are logged and do not stop the
    /// rest of the batch.
    pub fn activate_toolsets<S: AsRef<str>>(&self, names: &[S]) -> bool {
        let mut all_ok = true;
        for name in names {
            let mut visiting = Vec::new();
            if !self.activate_one(name.as_ref(), &mut visiting) {
                all_ok = false;
            }
        }
        all_ok
    }

    fn activate_one(&self, name: &str, visiting: &mut Vec<String>) -> bool {
        if self.active.contains_key(name) {
            tracing::debug!(toolset = %name, "Toolset already active");
            return true;
        }

        if visiting.iter().any(|v| v == name) {
            tracing::warn!(toolset = %name, chain = ?visiting, "Toolset dependency cycle");
            return false;
        }

        let Some(descriptor) = self.registry.get(name) else {
            tracing::warn!(toolset = %name, "Toolset is not registered");
            return false;
        };

        let mut ok = true;
        visiting.push(name.to_string());
        for dependency in descriptor.required_toolsets() {
            if !self.activate_one(dependency, visiting) {
                tracing::warn!(
                    toolset = %name,
                    dependency = %dependency,
                    "Toolset dependency could not be activated"
                );
                ok = false;
            }
        }
        visiting.pop();

        let toolset = match descriptor.instantiate(self.tool_use_enabled) {
            Ok(toolset) => toolset,
            Err(e) => {
                tracing::warn!(toolset = %name, error = %e, "Failed to instantiate toolset");
                return false;
            }
        };

        if let Some(reason) = toolset.invalid_reason() {
            tracing::warn!(
                toolset = %name,
                reason = %reason,
                "Toolset activated but invalid; its tools will not be advertised"
            );
        }

        self.bind(toolset);
        tracing::info!(toolset = %name, "Activated toolset");
        ok
    }

    /// Deactivate toolsets by name.
    ///
    /// Returns `false` if any of the names was not active.
    pub fn deactivate_toolsets<S: AsRef<str>>(&self, names: &[S]) -> bool {
        let mut all_ok = true;
        for name in names {
            if self.unbind(name.as_ref()).is_none() {
                tracing::warn!(toolset = %name.as_ref(), "Toolset was not active");
                all_ok = false;
            }
        }
        all_ok
    }

    /// Make a pre-built toolset active, replacing any toolset of the same name.
    pub fn bind(&self, toolset: Toolset) -> Arc<Toolset> {
        toolset.attach(Arc::downgrade(&self.active));
        let toolset = Arc::new(toolset);
        if self
            .active
            .insert(toolset.name().to_string(), toolset.clone())
            .is_some()
        {
            tracing::debug!(toolset = %toolset.name(), "Replaced active toolset");
        }
        toolset
    }

    /// Remove an active toolset, returning it if it was active
    pub fn unbind(&self, name: &str) -> Option<Arc<Toolset>> {
        let removed = self.active.remove(name).map(|(_, toolset)| toolset);
        if removed.is_some() {
            tracing::info!(toolset = %name, "Deactivated toolset");
        }
        removed
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains_key(name)
    }

    pub fn get_toolset(&self, name: &str) -> Option<Arc<Toolset>> {
        self.active.get(name).map(|entry| entry.value().clone())
    }

    /// Names of active toolsets, sorted
    pub fn active_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.active.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Schemas of every valid active toolset, ordered by toolset name.
    ///
    /// Recomputed from the active set on each call, so activation changes
    /// are reflected immediately.
    pub fn tool_schemas(&self) -> Vec<ToolSchemaDescriptor> {
        let mut toolsets: Vec<Arc<Toolset>> = self
            .active
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|toolset| toolset.is_valid())
            .collect();
        toolsets.sort_by(|a, b| a.name().cmp(b.name()));

        toolsets.iter().flat_map(|toolset| toolset.schemas()).collect()
    }

    /// Tool definitions in the chest's vendor format
    pub fn tool_definitions(&self) -> Vec<Value> {
        self.tool_schemas()
            .iter()
            .map(|schema| schema.to_vendor(self.vendor))
            .collect()
    }
}

impl std::fmt::Debug for ToolChest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolChest")
            .field("vendor", &self.vendor)
            .field("tool_use_enabled", &self.tool_use_enabled)
            .field("active", &self.active_names())
            .finish()
    }
}
