//! Registry mapping tool and resource names to their descriptors.
//!
//! Handlers are cloned out of the map before they are awaited, so no lock is
//! held across a suspension point and handlers may re-enter the registry.

use super::descriptor::{ResourceDescriptor, ResourceInfo, ToolDescriptor, ToolInfo, ToolOutcome};
use super::panic_message;
use crate::error::ApiError;
use futures::FutureExt;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

/// Process-wide directory of tools and resources
#[derive(Default)]
pub struct CapabilityRegistry {
    tools: RwLock<HashMap<String, ToolDescriptor>>,
    resources: RwLock<HashMap<String, ResourceDescriptor>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, overwriting any tool with the same name
    pub fn register_tool(&self, tool: ToolDescriptor) -> Result<(), ApiError> {
        if tool.name.trim().is_empty() {
            return Err(ApiError::Validation("tool name cannot be empty".to_string()));
        }
        debug!(tool = %tool.name, owner = ?tool.owner, "Registered tool");
        self.tools.write().insert(tool.name.clone(), tool);
        Ok(())
    }

    /// Register a resource, overwriting any resource with the same name
    pub fn register_resource(&self, resource: ResourceDescriptor) -> Result<(), ApiError> {
        if resource.name.trim().is_empty() {
            return Err(ApiError::Validation(
                "resource name cannot be empty".to_string(),
            ));
        }
        debug!(resource = %resource.name, owner = ?resource.owner, "Registered resource");
        self.resources
            .write()
            .insert(resource.name.clone(), resource);
        Ok(())
    }

    /// Remove a tool by name; no-op when absent
    pub fn unregister_tool(&self, name: &str) {
        if self.tools.write().remove(name).is_some() {
            debug!(tool = name, "Unregistered tool");
        }
    }

    /// Remove a resource by name; no-op when absent
    pub fn unregister_resource(&self, name: &str) {
        if self.resources.write().remove(name).is_some() {
            debug!(resource = name, "Unregistered resource");
        }
    }

    /// Remove every tool and resource owned by an agent.
    ///
    /// Returns the number of tools and resources removed.
    pub fn unregister_owned_by(&self, owner: &str) -> (usize, usize) {
        let owned = |o: &Option<String>| o.as_deref() == Some(owner);

        let removed_tools = {
            let mut tools = self.tools.write();
            let before = tools.len();
            tools.retain(|_, t| !owned(&t.owner));
            before - tools.len()
        };
        let removed_resources = {
            let mut resources = self.resources.write();
            let before = resources.len();
            resources.retain(|_, r| !owned(&r.owner));
            before - resources.len()
        };

        debug!(
            owner,
            tools = removed_tools,
            resources = removed_resources,
            "Removed agent capabilities"
        );
        (removed_tools, removed_resources)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.read().contains_key(name)
    }

    pub fn has_resource(&self, name: &str) -> bool {
        self.resources.read().contains_key(name)
    }

    /// Get a tool descriptor by name
    pub fn tool(&self, name: &str) -> Option<ToolDescriptor> {
        self.tools.read().get(name).cloned()
    }

    /// Snapshot of registered tools, sorted by name
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        let mut tools: Vec<ToolInfo> = self.tools.read().values().map(|t| t.info()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Snapshot of registered resources, sorted by name
    pub fn list_resources(&self) -> Vec<ResourceInfo> {
        let mut resources: Vec<ResourceInfo> =
            self.resources.read().values().map(|r| r.info()).collect();
        resources.sort_by(|a, b| a.name.cmp(&b.name));
        resources
    }

    /// Invoke a tool by name.
    ///
    /// Fails only with `ToolNotFound`. Handler failures, including panics, come
    /// back as an error outcome so one broken tool cannot take down the caller.
    pub async fn invoke_tool(&self, name: &str, params: Value) -> Result<ToolOutcome, ApiError> {
        let handler = self
            .tools
            .read()
            .get(name)
            .map(|t| t.handler.clone())
            .ok_or_else(|| ApiError::ToolNotFound(name.to_string()))?;

        debug!(tool = name, "Invoking tool");
        let outcome = match AssertUnwindSafe(handler.call(params)).catch_unwind().await {
            Ok(Ok(content)) => ToolOutcome::success(content),
            Ok(Err(e)) => {
                warn!(tool = name, error = %e, "Tool handler failed");
                ToolOutcome::error(e)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(tool = name, error = %message, "Tool handler panicked");
                ToolOutcome::error(message)
            }
        };
        Ok(outcome)
    }

    /// Query a resource by name.
    ///
    /// Unlike tools, handler failures propagate as `ApiError::Resource`.
    pub async fn get_resource(&self, name: &str, params: Value) -> Result<Value, ApiError> {
        let handler = self
            .resources
            .read()
            .get(name)
            .map(|r| r.handler.clone())
            .ok_or_else(|| ApiError::ResourceNotFound(name.to_string()))?;

        debug!(resource = name, "Reading resource");
        match AssertUnwindSafe(handler.call(params)).catch_unwind().await {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(e)) => Err(ApiError::Resource {
                name: name.to_string(),
                message: e.to_string(),
            }),
            Err(payload) => Err(ApiError::Resource {
                name: name.to_string(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}
