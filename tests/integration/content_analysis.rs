use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use switchboard::agents::{content_agent, social_agent, SimulatedClient};
use switchboard::config::AnalysisConfig;
use switchboard::types::LAST_ANALYSIS_KEY;
use switchboard::Orchestrator;

async fn orchestrator_with_agents() -> (
    Orchestrator,
    Arc<switchboard::agents::ContentAnalysis>,
    Arc<switchboard::agents::SocialMedia>,
) {
    let orchestrator = Orchestrator::default();
    let (content, analysis) = content_agent(&AnalysisConfig::default()).unwrap();
    let (social, media) = social_agent(Arc::new(SimulatedClient)).unwrap();
    orchestrator.register_agent(Arc::new(content)).await.unwrap();
    orchestrator.register_agent(Arc::new(social)).await.unwrap();
    orchestrator.start().await.unwrap();
    (orchestrator, analysis, media)
}

#[tokio::test]
async fn positive_technology_text() {
    let (orchestrator, _, _) = orchestrator_with_agents().await;
    let outcome = orchestrator
        .registry()
        .invoke_tool(
            "analyze_text",
            json!({"text": "Je suis très content de ce produit technologique"}),
        )
        .await
        .unwrap();
    assert!(!outcome.is_error);

    let result = &outcome.content["result"];
    assert_eq!(result["sentiment"]["label"], json!("positive"));
    let topics = result["topics"].as_array().unwrap();
    assert!(topics.iter().any(|t| t["name"] == json!("technologie")));

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn latest_result_is_first_page() {
    let (orchestrator, _, _) = orchestrator_with_agents().await;
    let registry = orchestrator.registry();
    for text in ["premier texte", "deuxième texte", "troisième texte"] {
        registry
            .invoke_tool("analyze_text", json!({ "text": text }))
            .await
            .unwrap();
    }

    let page = registry
        .get_resource("analysis_results", json!({"limit": 1, "offset": 0}))
        .await
        .unwrap();
    assert_eq!(page["total"], json!(3));
    let results = page["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["sequence"], json!(2));

    let last = orchestrator.context().get(LAST_ANALYSIS_KEY).unwrap();
    assert_eq!(last["id"], results[0]["id"]);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn invalid_input_becomes_error_outcome() {
    let (orchestrator, _, _) = orchestrator_with_agents().await;
    let outcome = orchestrator
        .registry()
        .invoke_tool("analyze_text", json!({"text": ""}))
        .await
        .unwrap();
    assert!(outcome.is_error);
    assert!(outcome.error_message().unwrap().contains("text"));
    orchestrator.shutdown().await;
}

#[tokio::test]
async fn completed_analyses_reach_the_social_agent() {
    let (orchestrator, analysis, media) = orchestrator_with_agents().await;
    let registry = orchestrator.registry();

    registry
        .invoke_tool("analyze_post", json!({"text": "Quel match génial", "likes": 3}))
        .await
        .unwrap();
    registry
        .invoke_tool("queue_analysis", json!({"text": "Une panne du logiciel"}))
        .await
        .unwrap();
    analysis.drain(Duration::from_secs(5)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(media.activity().analyses_observed, 2);
    let activity = registry
        .get_resource("social_activity", json!({}))
        .await
        .unwrap();
    assert_eq!(activity["analyses_observed"], json!(2));
    assert_eq!(activity["client"], json!("simulated"));

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn search_results_are_recorded() {
    let (orchestrator, _, media) = orchestrator_with_agents().await;
    let outcome = orchestrator
        .registry()
        .invoke_tool("search_tweets", json!({"query": "numérique"}))
        .await
        .unwrap();
    assert_eq!(outcome.content["count"], json!(3));
    assert_eq!(media.activity().recent_searches.len(), 1);
    orchestrator.shutdown().await;
}
