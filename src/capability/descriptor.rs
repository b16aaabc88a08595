//! Tool and resource descriptors.
//!
//! A descriptor always carries a handler; the builders are where a missing
//! name, description, or handler is rejected with `ApiError::Validation`.

use crate::error::ApiError;
use crate::types::AgentId;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Boxed future returned by every handler
pub type HandlerFuture = BoxFuture<'static, Result<Value, ApiError>>;

/// Async function from JSON params to a JSON result
#[derive(Clone)]
pub struct Handler(Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>);

impl Handler {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
    {
        Self(Arc::new(move |params| -> HandlerFuture { Box::pin(f(params)) }))
    }

    pub fn call(&self, params: Value) -> HandlerFuture {
        (self.0)(params)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

/// A named, invokable capability
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// Declarative parameter shape, for documentation only
    pub input_schema: Option<Value>,
    pub handler: Handler,
    pub owner: Option<AgentId>,
}

impl ToolDescriptor {
    pub fn builder(name: impl Into<String>) -> ToolDescriptorBuilder {
        ToolDescriptorBuilder {
            name: name.into(),
            description: String::new(),
            input_schema: None,
            handler: None,
        }
    }

    /// Check the fields every registered tool needs
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_fields("tool", &self.name, &self.description)
    }

    pub fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
            owner: self.owner.clone(),
        }
    }
}

pub struct ToolDescriptorBuilder {
    name: String,
    description: String,
    input_schema: Option<Value>,
    handler: Option<Handler>,
}

impl ToolDescriptorBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    pub fn handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
    {
        self.handler = Some(Handler::new(f));
        self
    }

    pub fn build(self) -> Result<ToolDescriptor, ApiError> {
        let handler = self.handler.ok_or_else(|| {
            ApiError::Validation(format!("tool '{}' has no handler", self.name))
        })?;
        let descriptor = ToolDescriptor {
            name: self.name,
            description: self.description,
            input_schema: self.input_schema,
            handler,
            owner: None,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}

/// A named, queryable capability
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    pub name: String,
    pub description: String,
    pub handler: Handler,
    pub owner: Option<AgentId>,
}

impl ResourceDescriptor {
    pub fn builder(name: impl Into<String>) -> ResourceDescriptorBuilder {
        ResourceDescriptorBuilder {
            name: name.into(),
            description: String::new(),
            handler: None,
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        validate_fields("resource", &self.name, &self.description)
    }

    pub fn info(&self) -> ResourceInfo {
        ResourceInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            owner: self.owner.clone(),
        }
    }
}

pub struct ResourceDescriptorBuilder {
    name: String,
    description: String,
    handler: Option<Handler>,
}

impl ResourceDescriptorBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
    {
        self.handler = Some(Handler::new(f));
        self
    }

    pub fn build(self) -> Result<ResourceDescriptor, ApiError> {
        let handler = self.handler.ok_or_else(|| {
            ApiError::Validation(format!("resource '{}' has no handler", self.name))
        })?;
        let descriptor = ResourceDescriptor {
            name: self.name,
            description: self.description,
            handler,
            owner: None,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}

fn validate_fields(kind: &str, name: &str, description: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation(format!("{} name cannot be empty", kind)));
    }
    if description.trim().is_empty() {
        return Err(ApiError::Validation(format!(
            "{} '{}' requires a description",
            kind, name
        )));
    }
    Ok(())
}

/// Serializable view of a registered tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<AgentId>,
}

/// Serializable view of a registered resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<AgentId>,
}

/// Result of a tool invocation: `{content}` or `{isError: true, content: {message}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub content: Value,
    #[serde(rename = "isError", default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ToolOutcome {
    pub fn success(content: Value) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    pub fn error(message: impl fmt::Display) -> Self {
        Self {
            content: serde_json::json!({ "message": message.to_string() }),
            is_error: true,
        }
    }

    /// Error message, if this is an error outcome
    pub fn error_message(&self) -> Option<&str> {
        if !self.is_error {
            return None;
        }
        self.content.get("message").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_requires_handler() {
        let result = ToolDescriptor::builder("echo").description("Echo").build();
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_builder_rejects_blank_name() {
        let result = ToolDescriptor::builder("  ")
            .description("Echo")
            .handler(|params| async move { Ok(params) })
            .build();
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_resource_builder_requires_description() {
        let result = ResourceDescriptor::builder("stats")
            .handler(|_| async move { Ok(json!({})) })
            .build();
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_handler_call() {
        let tool = ToolDescriptor::builder("echo")
            .description("Echo params back")
            .input_schema(json!({"type": "object"}))
            .handler(|params| async move { Ok(params) })
            .build()
            .unwrap();
        let result = tool.handler.call(json!({"x": 1})).await.unwrap();
        assert_eq!(result, json!({"x": 1}));
        assert_eq!(tool.info().input_schema, Some(json!({"type": "object"})));
    }

    #[test]
    fn test_outcome_serialization() {
        let ok = serde_json::to_value(ToolOutcome::success(json!({"x": 1}))).unwrap();
        assert_eq!(ok, json!({"content": {"x": 1}}));

        let err = ToolOutcome::error("boom");
        assert_eq!(err.error_message(), Some("boom"));
        let err = serde_json::to_value(err).unwrap();
        assert_eq!(err, json!({"content": {"message": "boom"}, "isError": true}));
    }
}
