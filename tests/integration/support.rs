use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use switchboard::agent::{Agent, AgentBehavior, AgentContext, AgentEvent};
use switchboard::capability::ToolDescriptor;
use switchboard::ApiError;

/// Behavior recording every event delivered to it
#[derive(Default)]
pub struct RecordingBehavior {
    pub events: Mutex<Vec<(String, String, Value)>>,
}

#[async_trait]
impl AgentBehavior for RecordingBehavior {
    async fn handle_event(
        &self,
        _ctx: &AgentContext,
        source: &str,
        event: &AgentEvent,
    ) -> Result<(), ApiError> {
        self.events
            .lock()
            .push((source.to_string(), event.name().to_string(), event.data()));
        Ok(())
    }
}

impl RecordingBehavior {
    pub fn names(&self) -> Vec<String> {
        self.events.lock().iter().map(|(_, name, _)| name.clone()).collect()
    }
}

pub fn echo_tool(name: &str) -> ToolDescriptor {
    ToolDescriptor::builder(name)
        .description("Return the params unchanged")
        .handler(|params| async move { Ok(params) })
        .build()
        .unwrap()
}

pub fn recording_agent(id: &str, tools: &[&str]) -> (Arc<Agent>, Arc<RecordingBehavior>) {
    let behavior = Arc::new(RecordingBehavior::default());
    let mut builder = Agent::builder(id).behavior(behavior.clone());
    for tool in tools {
        builder = builder.tool(echo_tool(tool));
    }
    (Arc::new(builder.build().unwrap()), behavior)
}
