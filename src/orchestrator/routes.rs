//! Default JSON-RPC routes installed by `Orchestrator::start`.

use super::AgentTable;
use crate::capability::CapabilityRegistry;
use crate::context::SharedContext;
use crate::error::ApiError;
use crate::protocol::MessageRouter;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default = "empty_object")]
    arguments: Value,
}

#[derive(Deserialize)]
struct ReadResourceParams {
    name: String,
    #[serde(default = "empty_object")]
    params: Value,
}

#[derive(Deserialize)]
struct AgentParams {
    id: String,
}

#[derive(Deserialize)]
struct ContextGetParams {
    key: String,
}

#[derive(Deserialize)]
struct ContextSetParams {
    key: String,
    value: Value,
}

fn empty_object() -> Value {
    json!({})
}

fn parse<T: DeserializeOwned>(method: &str, params: Value) -> Result<T, ApiError> {
    serde_json::from_value(params)
        .map_err(|e| ApiError::Validation(format!("invalid params for {}: {}", method, e)))
}

async fn call_tool(registry: Arc<CapabilityRegistry>, params: Value) -> Result<Value, ApiError> {
    let call: CallToolParams = parse("tools/call", params)?;
    let outcome = registry.invoke_tool(&call.name, call.arguments).await?;
    Ok(serde_json::to_value(outcome)?)
}

async fn read_resource(
    registry: Arc<CapabilityRegistry>,
    params: Value,
) -> Result<Value, ApiError> {
    let read: ReadResourceParams = parse("resources/read", params)?;
    let contents = registry.get_resource(&read.name, read.params).await?;
    Ok(json!({ "name": read.name, "contents": contents }))
}

async fn start_agent(agents: Arc<AgentTable>, params: Value) -> Result<Value, ApiError> {
    let AgentParams { id } = parse("agents/start", params)?;
    let agent = agents.require(&id)?;
    agent.start().await?;
    agents.mark_started(&id);
    Ok(serde_json::to_value(agent.status())?)
}

async fn stop_agent(agents: Arc<AgentTable>, params: Value) -> Result<Value, ApiError> {
    let AgentParams { id } = parse("agents/stop", params)?;
    let agent = agents.require(&id)?;
    agent.stop().await?;
    Ok(serde_json::to_value(agent.status())?)
}

async fn get_context(context: SharedContext, params: Value) -> Result<Value, ApiError> {
    let ContextGetParams { key } = parse("context/get", params)?;
    let value = context.get(&key).unwrap_or(Value::Null);
    Ok(json!({ "key": key, "value": value }))
}

async fn set_context(context: SharedContext, params: Value) -> Result<Value, ApiError> {
    let ContextSetParams { key, value } = parse("context/set", params)?;
    let previous = context.set(key.clone(), value).unwrap_or(Value::Null);
    Ok(json!({ "key": key, "previous": previous }))
}

pub(super) fn install(
    router: &MessageRouter,
    registry: Arc<CapabilityRegistry>,
    agents: Arc<AgentTable>,
    context: SharedContext,
) {
    router.route("ping", |_| async move {
        Ok(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() }))
    });

    let tools = Arc::clone(&registry);
    router.route("tools/list", move |_| {
        let tools = tools.list_tools();
        async move { Ok(json!({ "tools": tools })) }
    });

    let resources = Arc::clone(&registry);
    router.route("resources/list", move |_| {
        let resources = resources.list_resources();
        async move { Ok(json!({ "resources": resources })) }
    });

    let caller = Arc::clone(&registry);
    router.route("tools/call", move |params| {
        call_tool(Arc::clone(&caller), params)
    });

    router.route("resources/read", move |params| {
        read_resource(Arc::clone(&registry), params)
    });

    let listed = Arc::clone(&agents);
    router.route("agents/list", move |_| {
        let statuses = listed.statuses();
        async move { Ok(json!({ "agents": statuses })) }
    });

    let starter = Arc::clone(&agents);
    router.route("agents/start", move |params| {
        start_agent(Arc::clone(&starter), params)
    });

    router.route("agents/stop", move |params| {
        stop_agent(Arc::clone(&agents), params)
    });

    let reader = context.clone();
    router.route("context/get", move |params| get_context(reader.clone(), params));
    router.route("context/set", move |params| set_context(context.clone(), params));
}
