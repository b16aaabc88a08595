//! Typed agent events and the channel that carries them to the orchestrator.

use crate::types::AgentId;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

/// Event emitted by an agent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AgentEvent {
    Started,
    Stopped,
    ToolRegistered { name: String },
    ResourceRegistered { name: String },
    Custom { name: String, data: Value },
}

impl AgentEvent {
    pub fn custom(name: impl Into<String>, data: Value) -> Self {
        AgentEvent::Custom {
            name: name.into(),
            data,
        }
    }

    /// Event type name used for relay matching
    pub fn name(&self) -> &str {
        match self {
            AgentEvent::Started => "started",
            AgentEvent::Stopped => "stopped",
            AgentEvent::ToolRegistered { .. } => "tool-registered",
            AgentEvent::ResourceRegistered { .. } => "resource-registered",
            AgentEvent::Custom { name, .. } => name.as_str(),
        }
    }

    pub fn data(&self) -> Value {
        match self {
            AgentEvent::Started | AgentEvent::Stopped => Value::Null,
            AgentEvent::ToolRegistered { name } | AgentEvent::ResourceRegistered { name } => {
                json!({ "name": name })
            }
            AgentEvent::Custom { data, .. } => data.clone(),
        }
    }
}

/// Event plus the id of the agent that emitted it
#[derive(Debug, Clone, PartialEq)]
pub struct AgentEnvelope {
    pub source: AgentId,
    pub event: AgentEvent,
}

/// Create the channel agents emit into
pub fn event_channel() -> (
    mpsc::UnboundedSender<AgentEnvelope>,
    mpsc::UnboundedReceiver<AgentEnvelope>,
) {
    mpsc::unbounded_channel()
}

/// Sending half bound to one agent id.
///
/// A detached emitter (no channel) drops events silently.
#[derive(Debug, Clone, Default)]
pub struct EventEmitter {
    source: AgentId,
    tx: Option<mpsc::UnboundedSender<AgentEnvelope>>,
}

impl EventEmitter {
    pub fn new(source: impl Into<AgentId>, tx: mpsc::UnboundedSender<AgentEnvelope>) -> Self {
        Self {
            source: source.into(),
            tx: Some(tx),
        }
    }

    pub fn detached(source: impl Into<AgentId>) -> Self {
        Self {
            source: source.into(),
            tx: None,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn emit(&self, event: AgentEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        let name = event.name().to_string();
        if tx
            .send(AgentEnvelope {
                source: self.source.clone(),
                event,
            })
            .is_err()
        {
            debug!(agent_id = %self.source, event = %name, "Event channel closed, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(AgentEvent::Started.name(), "started");
        assert_eq!(
            AgentEvent::ToolRegistered {
                name: "echo".into()
            }
            .name(),
            "tool-registered"
        );
        assert_eq!(
            AgentEvent::custom("analysis-completed", json!({})).name(),
            "analysis-completed"
        );
    }

    #[tokio::test]
    async fn test_emitter_tags_source() {
        let (tx, mut rx) = event_channel();
        let emitter = EventEmitter::new("a", tx);
        emitter.emit(AgentEvent::Started);

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.source, "a");
        assert_eq!(envelope.event, AgentEvent::Started);
    }

    #[test]
    fn test_detached_emitter_drops() {
        EventEmitter::detached("a").emit(AgentEvent::Stopped);
    }
}
