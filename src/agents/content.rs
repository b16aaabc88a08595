//! Content-analysis agent
//!
//! Exposes text, image, and post analysis as tools, a background analysis
//! queue, and the stored results as a resource. Every completed analysis is
//! written to the shared context and announced with an `analysis-completed`
//! event.

pub mod analyzer;

use self::analyzer::{AnalysisOptions, PostAnalysis};
use super::parse_params;
use crate::agent::{Agent, AgentBehavior, AgentContext, AgentEvent};
use crate::capability::{ResourceDescriptor, ToolDescriptor};
use crate::config::AnalysisConfig;
use crate::error::ApiError;
use crate::queue::{QueueStats, WorkProcessor, WorkQueue};
use crate::types::{ANALYSIS_COMPLETED, LAST_ANALYSIS_KEY};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub const CONTENT_AGENT_ID: &str = "content-analysis";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Text,
    Image,
    Post,
}

/// One stored analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub kind: AnalysisKind,
    pub timestamp: DateTime<Utc>,
    /// Insertion counter, breaks timestamp ties
    pub sequence: u64,
    pub result: Value,
}

/// A page of stored results, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPage {
    pub total: usize,
    pub results: Vec<AnalysisRecord>,
}

/// Bounded history of completed analyses
#[derive(Debug)]
pub struct AnalysisHistory {
    limit: usize,
    next_sequence: u64,
    records: VecDeque<AnalysisRecord>,
}

impl AnalysisHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            next_sequence: 0,
            records: VecDeque::new(),
        }
    }

    pub fn push(&mut self, kind: AnalysisKind, result: Value) -> AnalysisRecord {
        let record = AnalysisRecord {
            id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
            sequence: self.next_sequence,
            result,
        };
        self.next_sequence += 1;

        self.records.push_back(record.clone());
        while self.records.len() > self.limit {
            self.records.pop_front();
        }
        record
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Newest first by timestamp, ties by insertion order
    pub fn page(&self, limit: usize, offset: usize) -> AnalysisPage {
        let mut ordered: Vec<&AnalysisRecord> = self.records.iter().collect();
        ordered.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.sequence.cmp(&a.sequence))
        });
        AnalysisPage {
            total: ordered.len(),
            results: ordered
                .into_iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect(),
        }
    }
}

/// State shared by the tool handlers and the queue worker
struct AnalysisCore {
    history: RwLock<AnalysisHistory>,
    /// Set when the agent starts
    context: RwLock<Option<AgentContext>>,
}

impl AnalysisCore {
    fn record<T: Serialize>(&self, kind: AnalysisKind, analysis: &T) -> Result<Value, ApiError> {
        let result = serde_json::to_value(analysis)?;
        let record = self.history.write().push(kind, result);
        let value = serde_json::to_value(&record)?;

        let context = self.context.read().clone();
        if let Some(ctx) = context {
            ctx.shared.set(LAST_ANALYSIS_KEY, value.clone());
            ctx.emit(AgentEvent::custom(
                ANALYSIS_COMPLETED,
                json!({
                    "id": record.id,
                    "kind": record.kind,
                    "timestamp": record.timestamp,
                }),
            ));
        }

        debug!(analysis_id = %record.id, kind = ?kind, "Recorded analysis");
        Ok(value)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TextParams {
    text: String,
    #[serde(default)]
    options: AnalysisOptions,
}

#[derive(Debug, Deserialize)]
struct ImageParams {
    url: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostParams {
    text: String,
    author: Option<String>,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    shares: u64,
    #[serde(default)]
    comments: u64,
}

#[derive(Debug, Deserialize)]
struct PageParams {
    #[serde(default = "default_page_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_page_limit() -> usize {
    10
}

fn require_text(tool: &str, text: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::Validation(format!("{}: text cannot be empty", tool)));
    }
    Ok(())
}

struct QueuedAnalysis {
    text: String,
    options: AnalysisOptions,
}

struct AnalysisWorker {
    core: Arc<AnalysisCore>,
}

#[async_trait]
impl WorkProcessor<QueuedAnalysis> for AnalysisWorker {
    async fn process(&self, item: QueuedAnalysis) -> Result<(), ApiError> {
        let analysis = analyzer::analyze_text(&item.text, item.options);
        self.core.record(AnalysisKind::Text, &analysis)?;
        Ok(())
    }
}

/// Content-analysis service backing the agent's tools and resource
pub struct ContentAnalysis {
    core: Arc<AnalysisCore>,
    queue: WorkQueue<QueuedAnalysis>,
}

impl ContentAnalysis {
    pub fn new(config: &AnalysisConfig) -> Arc<Self> {
        let core = Arc::new(AnalysisCore {
            history: RwLock::new(AnalysisHistory::new(config.history_limit)),
            context: RwLock::new(None),
        });
        let worker = Arc::new(AnalysisWorker {
            core: Arc::clone(&core),
        });
        Arc::new(Self {
            core,
            queue: WorkQueue::new("content-analysis", config.queue_capacity, worker),
        })
    }

    pub fn analyze_text(&self, params: Value) -> Result<Value, ApiError> {
        let params: TextParams = parse_params("analyze_text", params)?;
        require_text("analyze_text", &params.text)?;
        let analysis = analyzer::analyze_text(&params.text, params.options);
        self.core.record(AnalysisKind::Text, &analysis)
    }

    pub fn analyze_image(&self, params: Value) -> Result<Value, ApiError> {
        let params: ImageParams = parse_params("analyze_image", params)?;
        if params.url.trim().is_empty() {
            return Err(ApiError::Validation(
                "analyze_image: url cannot be empty".to_string(),
            ));
        }
        let analysis = analyzer::analyze_image(&params.url, params.description.as_deref());
        self.core.record(AnalysisKind::Image, &analysis)
    }

    pub fn analyze_post(&self, params: Value) -> Result<Value, ApiError> {
        let params: PostParams = parse_params("analyze_post", params)?;
        require_text("analyze_post", &params.text)?;
        let analysis = PostAnalysis {
            author: params.author,
            text: analyzer::analyze_text(&params.text, AnalysisOptions::default()),
            engagement: analyzer::engagement(params.likes, params.shares, params.comments),
        };
        self.core.record(AnalysisKind::Post, &analysis)
    }

    pub fn queue_analysis(&self, params: Value) -> Result<Value, ApiError> {
        let params: TextParams = parse_params("queue_analysis", params)?;
        require_text("queue_analysis", &params.text)?;
        let position = self.queue.enqueue(QueuedAnalysis {
            text: params.text,
            options: params.options,
        })?;
        Ok(json!({ "queued": true, "position": position }))
    }

    pub fn results(&self, params: Value) -> Result<Value, ApiError> {
        let params: PageParams = parse_params("analysis_results", params)?;
        let page = self.core.history.read().page(params.limit, params.offset);
        Ok(serde_json::to_value(page)?)
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Wait for queued analyses to finish
    pub async fn drain(&self, timeout: std::time::Duration) -> Result<(), ApiError> {
        self.queue.wait_idle(Some(timeout)).await
    }

    pub fn stored(&self) -> usize {
        self.core.history.read().len()
    }
}

#[async_trait]
impl AgentBehavior for ContentAnalysis {
    async fn on_start(&self, ctx: &AgentContext) -> Result<(), ApiError> {
        *self.core.context.write() = Some(ctx.clone());
        self.queue.start();
        Ok(())
    }

    async fn on_stop(&self, _ctx: &AgentContext) -> Result<(), ApiError> {
        self.queue.stop().await;
        Ok(())
    }

    async fn handle_event(
        &self,
        _ctx: &AgentContext,
        source: &str,
        event: &AgentEvent,
    ) -> Result<(), ApiError> {
        debug!(source, event = %event.name(), "Content agent observed event");
        Ok(())
    }
}

/// Build the content-analysis agent and the service behind it
pub fn content_agent(config: &AnalysisConfig) -> Result<(Agent, Arc<ContentAnalysis>), ApiError> {
    let service = ContentAnalysis::new(config);

    let text = Arc::clone(&service);
    let image = Arc::clone(&service);
    let post = Arc::clone(&service);
    let queued = Arc::clone(&service);
    let results = Arc::clone(&service);

    let agent = Agent::builder(CONTENT_AGENT_ID)
        .kind("content")
        .tool(
            ToolDescriptor::builder("analyze_text")
                .description("Analyze sentiment, topics, and entities of a text")
                .input_schema(json!({
                    "type": "object",
                    "properties": {
                        "text": {"type": "string"},
                        "options": {
                            "type": "object",
                            "properties": {
                                "sentiment": {"type": "boolean"},
                                "topics": {"type": "boolean"},
                                "entities": {"type": "boolean"}
                            }
                        }
                    },
                    "required": ["text"]
                }))
                .handler(move |params| {
                    let service = Arc::clone(&text);
                    async move { service.analyze_text(params) }
                })
                .build()?,
        )
        .tool(
            ToolDescriptor::builder("analyze_image")
                .description("Guess format and labels of an image from its URL and description")
                .input_schema(json!({
                    "type": "object",
                    "properties": {
                        "url": {"type": "string"},
                        "description": {"type": "string"}
                    },
                    "required": ["url"]
                }))
                .handler(move |params| {
                    let service = Arc::clone(&image);
                    async move { service.analyze_image(params) }
                })
                .build()?,
        )
        .tool(
            ToolDescriptor::builder("analyze_post")
                .description("Analyze a social post's text and engagement")
                .input_schema(json!({
                    "type": "object",
                    "properties": {
                        "text": {"type": "string"},
                        "author": {"type": "string"},
                        "likes": {"type": "integer", "minimum": 0},
                        "shares": {"type": "integer", "minimum": 0},
                        "comments": {"type": "integer", "minimum": 0}
                    },
                    "required": ["text"]
                }))
                .handler(move |params| {
                    let service = Arc::clone(&post);
                    async move { service.analyze_post(params) }
                })
                .build()?,
        )
        .tool(
            ToolDescriptor::builder("queue_analysis")
                .description("Queue a text for background analysis")
                .input_schema(json!({
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"]
                }))
                .handler(move |params| {
                    let service = Arc::clone(&queued);
                    async move { service.queue_analysis(params) }
                })
                .build()?,
        )
        .resource(
            ResourceDescriptor::builder("analysis_results")
                .description("Stored analysis results, newest first")
                .handler(move |params| {
                    let service = Arc::clone(&results);
                    async move { service.results(params) }
                })
                .build()?,
        )
        .behavior(Arc::clone(&service) as Arc<dyn AgentBehavior>)
        .build()?;

    info!(
        agent_id = CONTENT_AGENT_ID,
        history_limit = config.history_limit,
        "Built content analysis agent"
    );
    Ok((agent, service))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{event_channel, AgentLink};
    use crate::capability::CapabilityRegistry;
    use crate::context::SharedContext;
    use std::time::Duration;

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            history_limit: 3,
            queue_capacity: 8,
        }
    }

    #[test]
    fn test_history_is_bounded_and_newest_first() {
        let mut history = AnalysisHistory::new(2);
        history.push(AnalysisKind::Text, json!(1));
        history.push(AnalysisKind::Text, json!(2));
        history.push(AnalysisKind::Text, json!(3));

        let page = history.page(10, 0);
        assert_eq!(page.total, 2);
        let values: Vec<Value> = page.results.iter().map(|r| r.result.clone()).collect();
        assert_eq!(values, vec![json!(3), json!(2)]);

        let page = history.page(1, 1);
        assert_eq!(page.results[0].result, json!(2));
    }

    #[test]
    fn test_empty_text_rejected() {
        let service = ContentAnalysis::new(&config());
        assert!(matches!(
            service.analyze_text(json!({"text": "  "})),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            service.analyze_text(json!({})),
            Err(ApiError::Validation(_))
        ));
        assert_eq!(service.stored(), 0);
    }

    #[test]
    fn test_analyze_post_scores_engagement() {
        let service = ContentAnalysis::new(&config());
        let value = service
            .analyze_post(json!({"text": "Super match", "likes": 5, "shares": 2, "comments": 1}))
            .unwrap();
        assert_eq!(value["kind"], json!("post"));
        assert_eq!(value["result"]["engagement"]["score"], json!(12));
        assert_eq!(value["result"]["engagement"]["level"], json!("medium"));

        let value = service
            .analyze_post(json!({"text": "Viral", "likes": u64::MAX, "shares": 1}))
            .unwrap();
        assert_eq!(value["result"]["engagement"]["score"], json!(u64::MAX));
        assert_eq!(value["result"]["engagement"]["level"], json!("high"));
    }

    #[tokio::test]
    async fn test_started_agent_publishes_results() {
        let (agent, service) = content_agent(&config()).unwrap();
        let (tx, mut rx) = event_channel();
        let shared = SharedContext::new();
        agent.attach(AgentLink {
            registry: Arc::new(CapabilityRegistry::new()),
            context: shared.clone(),
            events: tx,
        });
        agent.start().await.unwrap();

        service
            .analyze_text(json!({"text": "Quel excellent logiciel"}))
            .unwrap();
        let last = shared.get(LAST_ANALYSIS_KEY).unwrap();
        assert_eq!(last["result"]["sentiment"]["label"], json!("positive"));

        let mut completed = 0;
        while let Ok(envelope) = rx.try_recv() {
            if envelope.event.name() == ANALYSIS_COMPLETED {
                completed += 1;
            }
        }
        assert_eq!(completed, 1);
        agent.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_queued_analysis_is_processed() {
        let (agent, service) = content_agent(&config()).unwrap();
        agent.start().await.unwrap();

        let queued = service
            .queue_analysis(json!({"text": "Un problème de réseau"}))
            .unwrap();
        assert_eq!(queued["queued"], json!(true));
        service.drain(Duration::from_secs(5)).await.unwrap();

        assert_eq!(service.stored(), 1);
        assert_eq!(service.queue_stats().completed, 1);
        agent.stop().await.unwrap();
    }
}
