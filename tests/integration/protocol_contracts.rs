use serde_json::{json, Value};
use std::sync::Arc;
use switchboard::agents::{content_agent, social_agent, SimulatedClient};
use switchboard::config::AnalysisConfig;
use switchboard::protocol::{codes, serve_lines, JsonRpcResponse};
use switchboard::Orchestrator;

async fn exchange(orchestrator: &Orchestrator, requests: &[Value]) -> Vec<JsonRpcResponse> {
    let input: String = requests.iter().map(|r| format!("{}\n", r)).collect();
    let mut output = Vec::new();
    serve_lines(orchestrator.router(), input.as_bytes(), &mut output)
        .await
        .unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn default_routes_over_line_transport() {
    let orchestrator = Orchestrator::default();
    let (content, _) = content_agent(&AnalysisConfig::default()).unwrap();
    let (social, _) = social_agent(Arc::new(SimulatedClient)).unwrap();
    orchestrator.register_agent(Arc::new(content)).await.unwrap();
    orchestrator.register_agent(Arc::new(social)).await.unwrap();
    orchestrator.start().await.unwrap();

    let responses = exchange(
        &orchestrator,
        &[
            json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "agents/list"}),
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                   "params": {"name": "get_tweet", "arguments": {"id": "99"}}}),
            json!({"jsonrpc": "2.0", "id": "x", "method": "does/not/exist"}),
            json!({"jsonrpc": "2.0", "id": 5, "method": "agents/stop",
                   "params": {"id": "social-media"}}),
        ],
    )
    .await;
    assert_eq!(responses.len(), 5);

    assert_eq!(responses[0].result.as_ref().unwrap()["status"], json!("ok"));

    let agents = responses[1].result.as_ref().unwrap()["agents"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(agents.len(), 2);
    assert!(agents.iter().all(|a| a["state"] == json!("running")));

    assert_eq!(
        responses[2].result.as_ref().unwrap()["content"]["id"],
        json!("99")
    );

    assert_eq!(responses[3].id, json!("x"));
    assert_eq!(responses[3].error_code(), Some(codes::METHOD_NOT_FOUND));

    assert_eq!(
        responses[4].result.as_ref().unwrap()["state"],
        json!("stopped")
    );

    orchestrator.shutdown().await;
}
