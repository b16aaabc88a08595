//! Message router: method name → handler.

use super::envelope::{codes, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
use crate::capability::{panic_message, Handler};
use crate::error::ApiError;
use futures::FutureExt;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

/// Maps request methods to handlers and wraps every outcome in an envelope
#[derive(Default)]
pub struct MessageRouter {
    routes: RwLock<HashMap<String, Handler>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any existing handler for the method
    pub fn register_route(&self, method: impl Into<String>, handler: Handler) {
        let method = method.into();
        if self.routes.write().insert(method.clone(), handler).is_some() {
            debug!(method = %method, "Replaced route handler");
        }
    }

    /// Register an async closure as a route handler
    pub fn route<F, Fut>(&self, method: impl Into<String>, f: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
    {
        self.register_route(method, Handler::new(f));
    }

    pub fn has_route(&self, method: &str) -> bool {
        self.routes.read().contains_key(method)
    }

    /// Registered method names, sorted
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.routes.read().keys().cloned().collect();
        methods.sort();
        methods
    }

    pub fn clear(&self) {
        self.routes.write().clear();
    }

    /// Route a request to its handler.
    ///
    /// Never fails: unknown methods yield `METHOD_NOT_FOUND`, handler errors and
    /// panics yield `INTERNAL_ERROR`. The request id is always echoed back.
    pub async fn route_message(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let JsonRpcRequest {
            id, method, params, ..
        } = request;

        let handler = self.routes.read().get(&method).cloned();
        let Some(handler) = handler else {
            debug!(method = %method, "No route for method");
            return JsonRpcResponse::failure(
                id,
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", method),
            );
        };

        let params = params.unwrap_or(Value::Null);
        match AssertUnwindSafe(handler.call(params)).catch_unwind().await {
            Ok(Ok(result)) => JsonRpcResponse::success(id, result),
            Ok(Err(e)) => {
                warn!(method = %method, error = %e, "Route handler failed");
                JsonRpcResponse::failure(id, codes::INTERNAL_ERROR, e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(method = %method, error = %message, "Route handler panicked");
                JsonRpcResponse::failure(id, codes::INTERNAL_ERROR, message)
            }
        }
    }

    /// Parse one raw JSON message and route it.
    ///
    /// Malformed JSON yields `PARSE_ERROR` with a null id; well-formed JSON that is
    /// not a request yields `INVALID_REQUEST`.
    pub async fn route_raw(&self, raw: &str) -> JsonRpcResponse {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                return JsonRpcResponse::failure(
                    Value::Null,
                    codes::PARSE_ERROR,
                    format!("Parse error: {}", e),
                )
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return JsonRpcResponse::failure(
                    id,
                    codes::INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                )
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return JsonRpcResponse::failure(
                id,
                codes::INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            );
        }

        self.route_message(request).await
    }
}
