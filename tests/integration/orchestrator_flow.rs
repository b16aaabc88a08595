use crate::support::{echo_tool, recording_agent};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use switchboard::agent::{Agent, AgentBehavior, AgentContext, AgentState};
use switchboard::config::OrchestratorConfig;
use switchboard::{ApiError, Orchestrator};

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn echo_tool_round_trip() {
    let orchestrator = Orchestrator::default();
    let (agent, _) = recording_agent("a", &["echo"]);
    orchestrator.register_agent(agent).await.unwrap();
    orchestrator.start().await.unwrap();

    let outcome = orchestrator
        .registry()
        .invoke_tool("echo", json!({"x": 1}))
        .await
        .unwrap();
    assert_eq!(outcome.content, json!({"x": 1}));
    assert!(!outcome.is_error);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn unregister_removes_owned_capabilities() {
    let orchestrator = Orchestrator::default();
    let (a, _) = recording_agent("a", &["alpha", "beta"]);
    let (b, _) = recording_agent("b", &["gamma"]);
    orchestrator.register_agent(Arc::clone(&a)).await.unwrap();
    orchestrator.register_agent(b).await.unwrap();
    orchestrator.start().await.unwrap();
    assert_eq!(orchestrator.registry().list_tools().len(), 3);

    assert!(orchestrator.unregister_agent("a").await.unwrap());
    let tools = orchestrator.registry().list_tools();
    assert!(tools.iter().all(|t| t.owner.as_deref() != Some("a")));
    assert_eq!(tools.len(), 1);
    assert_eq!(a.state(), AgentState::Stopped);
    assert_eq!(orchestrator.agent_ids(), vec!["b"]);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn relay_fans_out_to_other_running_agents() {
    let orchestrator = Orchestrator::new(&OrchestratorConfig {
        relay_events: vec!["analysis-completed".to_string()],
    });
    let (source, source_inbox) = recording_agent("source", &[]);
    let (peer, peer_inbox) = recording_agent("peer", &[]);
    let (idle, idle_inbox) = recording_agent("idle", &[]);
    for agent in [&source, &peer, &idle] {
        orchestrator.register_agent(Arc::clone(agent)).await.unwrap();
    }
    orchestrator.start().await.unwrap();
    orchestrator.stop_agent("idle").await.unwrap();

    source.context().emit(switchboard::AgentEvent::custom(
        "analysis-completed",
        json!({"id": 7}),
    ));
    source
        .context()
        .emit(switchboard::AgentEvent::custom("not-relayed", json!({})));
    settle().await;

    assert_eq!(peer_inbox.names(), vec!["analysis-completed"]);
    assert_eq!(peer_inbox.events.lock()[0].0, "source");
    assert_eq!(peer_inbox.events.lock()[0].2, json!({"id": 7}));
    assert!(source_inbox.names().is_empty());
    assert!(idle_inbox.names().is_empty());

    // Stopped agents do not receive a replay when restarted
    orchestrator.start_agent("idle").await.unwrap();
    settle().await;
    assert!(idle_inbox.names().is_empty());

    orchestrator.shutdown().await;
}

struct RefusesToStart;

#[async_trait::async_trait]
impl AgentBehavior for RefusesToStart {
    async fn on_start(&self, _ctx: &AgentContext) -> Result<(), ApiError> {
        Err(ApiError::handler("missing credentials"))
    }
}

#[tokio::test]
async fn partial_startup_is_shut_down_cleanly() {
    let orchestrator = Orchestrator::default();
    let (first, _) = recording_agent("first", &["one"]);
    let broken = Arc::new(
        Agent::builder("broken")
            .tool(echo_tool("two"))
            .behavior(Arc::new(RefusesToStart))
            .build()
            .unwrap(),
    );
    let (never, _) = recording_agent("never", &[]);
    orchestrator.register_agent(Arc::clone(&first)).await.unwrap();
    orchestrator.register_agent(Arc::clone(&broken)).await.unwrap();
    orchestrator.register_agent(Arc::clone(&never)).await.unwrap();

    let err = orchestrator.start().await.unwrap_err();
    assert!(matches!(err, ApiError::Startup { ref agent_id, .. } if agent_id == "broken"));
    assert_eq!(first.state(), AgentState::Running);
    assert_eq!(never.state(), AgentState::Created);

    orchestrator.shutdown().await;
    assert_eq!(first.state(), AgentState::Stopped);
    assert_ne!(broken.state(), AgentState::Running);
    assert!(!orchestrator.is_running());
}

#[tokio::test]
async fn shutdown_without_start_is_safe() {
    let orchestrator = Orchestrator::default();
    let (agent, _) = recording_agent("a", &[]);
    orchestrator.register_agent(Arc::clone(&agent)).await.unwrap();
    orchestrator.shutdown().await;
    orchestrator.shutdown().await;
    assert_eq!(agent.state(), AgentState::Created);
}

#[tokio::test]
async fn notify_agents_excludes_and_skips_stopped() {
    let orchestrator = Orchestrator::default();
    let (a, inbox_a) = recording_agent("a", &[]);
    let (b, inbox_b) = recording_agent("b", &[]);
    let (c, inbox_c) = recording_agent("c", &[]);
    for agent in [&a, &b, &c] {
        orchestrator.register_agent(Arc::clone(agent)).await.unwrap();
    }
    orchestrator.start().await.unwrap();
    c.stop().await.unwrap();

    let delivered = orchestrator.notify_agents("evt", json!({"n": 1}), &["b"]).await;
    assert_eq!(delivered, vec!["a"]);
    assert_eq!(inbox_a.names(), vec!["evt"]);
    assert_eq!(inbox_a.events.lock()[0].0, "orchestrator");
    assert!(inbox_b.names().is_empty());
    assert!(inbox_c.names().is_empty());

    orchestrator.shutdown().await;
}
