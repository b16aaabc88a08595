//! Social-platform agent
//!
//! Wraps a `SocialPlatformClient` behind `search_tweets` and `get_tweet` tools.
//! Without credentials a simulated client serves canned posts.

use super::parse_params;
use crate::agent::{Agent, AgentBehavior, AgentContext, AgentEvent};
use crate::capability::{ResourceDescriptor, ToolDescriptor};
use crate::config::TwitterConfig;
use crate::error::ApiError;
use crate::types::ANALYSIS_COMPLETED;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub const SOCIAL_AGENT_ID: &str = "social-media";

const MIN_RESULTS: u32 = 10;
const MAX_RESULTS: u32 = 100;
const RECENT_SEARCHES: usize = 20;

/// Platform post ids are decimal snowflakes
fn is_platform_post_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// Ids accepted by the `get_tweet` tool, for any client
fn is_safe_post_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Access to a social platform's post search
#[async_trait]
pub trait SocialPlatformClient: Send + Sync {
    /// Short name reported with results
    fn name(&self) -> &str;

    async fn search_tweets(&self, query: &str, max_results: u32) -> Result<Vec<Tweet>, ApiError>;

    async fn get_tweet(&self, id: &str) -> Result<Tweet, ApiError>;
}

/// Single-object response `{data, errors}`
#[derive(Debug, Deserialize)]
struct LookupResponse {
    data: Option<Tweet>,
    #[serde(default)]
    errors: Vec<Value>,
}

/// Search response; `data` is absent when nothing matched
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
}

/// Twitter API v2 client authenticated with an app bearer token
pub struct TwitterApiClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: String,
}

impl TwitterApiClient {
    pub fn new(config: &TwitterConfig, bearer_token: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("switchboard/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: bearer_token.into(),
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Calling Twitter API");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Transport(format!(
                "Twitter API returned {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl SocialPlatformClient for TwitterApiClient {
    fn name(&self) -> &str {
        "twitter"
    }

    async fn search_tweets(&self, query: &str, max_results: u32) -> Result<Vec<Tweet>, ApiError> {
        let params = [
            ("query", query.to_string()),
            ("max_results", max_results.to_string()),
            ("tweet.fields", "author_id,created_at".to_string()),
        ];
        let response: SearchResponse = self.get("/tweets/search/recent", &params).await?;
        Ok(response.data)
    }

    async fn get_tweet(&self, id: &str) -> Result<Tweet, ApiError> {
        if !is_platform_post_id(id) {
            return Err(ApiError::Validation(format!(
                "get_tweet: '{}' is not a numeric post id",
                id
            )));
        }
        let params = [("tweet.fields", "author_id,created_at".to_string())];
        let response: LookupResponse = self.get(&format!("/tweets/{}", id), &params).await?;
        response.data.ok_or_else(|| {
            ApiError::Transport(format!(
                "Twitter API returned no post for {}: {}",
                id,
                Value::Array(response.errors)
            ))
        })
    }
}

/// Deterministic offline client
#[derive(Debug, Default)]
pub struct SimulatedClient;

impl SimulatedClient {
    fn tweet(id: String, text: String) -> Tweet {
        Tweet {
            id,
            text,
            author_id: Some("simulated".to_string()),
            created_at: Some("2024-01-01T00:00:00Z".to_string()),
        }
    }
}

#[async_trait]
impl SocialPlatformClient for SimulatedClient {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn search_tweets(&self, query: &str, max_results: u32) -> Result<Vec<Tweet>, ApiError> {
        let count = max_results.min(3);
        Ok((1..=count)
            .map(|i| {
                Self::tweet(
                    format!("sim-{}", i),
                    format!("Publication simulée {} à propos de {}", i, query),
                )
            })
            .collect())
    }

    async fn get_tweet(&self, id: &str) -> Result<Tweet, ApiError> {
        Ok(Self::tweet(
            id.to_string(),
            format!("Publication simulée {}", id),
        ))
    }
}

/// Live client when a bearer token is configured, simulated otherwise
pub fn client_from_config(
    config: &TwitterConfig,
) -> Result<Arc<dyn SocialPlatformClient>, ApiError> {
    match config.resolved_bearer_token() {
        Some(token) => {
            info!(base_url = %config.base_url, "Using Twitter API client");
            Ok(Arc::new(TwitterApiClient::new(config, token)?))
        }
        None => {
            info!("No Twitter bearer token configured, using simulated client");
            Ok(Arc::new(SimulatedClient))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub query: String,
    pub result_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Recent searches plus analyses observed from other agents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialActivity {
    pub client: String,
    pub recent_searches: VecDeque<SearchRecord>,
    pub analyses_observed: usize,
    pub last_analysis: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    max_results: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TweetParams {
    id: String,
}

/// Social service backing the agent's tools and resource
pub struct SocialMedia {
    client: Arc<dyn SocialPlatformClient>,
    activity: RwLock<SocialActivity>,
}

impl SocialMedia {
    pub fn new(client: Arc<dyn SocialPlatformClient>) -> Arc<Self> {
        let activity = SocialActivity {
            client: client.name().to_string(),
            ..Default::default()
        };
        Arc::new(Self {
            client,
            activity: RwLock::new(activity),
        })
    }

    pub async fn search_tweets(&self, params: Value) -> Result<Value, ApiError> {
        let params: SearchParams = parse_params("search_tweets", params)?;
        if params.query.trim().is_empty() {
            return Err(ApiError::Validation(
                "search_tweets: query cannot be empty".to_string(),
            ));
        }
        let max_results = params
            .max_results
            .unwrap_or(MIN_RESULTS)
            .clamp(MIN_RESULTS, MAX_RESULTS);

        let tweets = self
            .client
            .search_tweets(&params.query, max_results)
            .await?;

        {
            let mut activity = self.activity.write();
            activity.recent_searches.push_front(SearchRecord {
                query: params.query.clone(),
                result_count: tweets.len(),
                timestamp: Utc::now(),
            });
            activity.recent_searches.truncate(RECENT_SEARCHES);
        }

        Ok(json!({
            "query": params.query,
            "source": self.client.name(),
            "count": tweets.len(),
            "tweets": tweets,
        }))
    }

    pub async fn get_tweet(&self, params: Value) -> Result<Value, ApiError> {
        let params: TweetParams = parse_params("get_tweet", params)?;
        if params.id.trim().is_empty() {
            return Err(ApiError::Validation("get_tweet: id cannot be empty".to_string()));
        }
        if !is_safe_post_id(&params.id) {
            return Err(ApiError::Validation(format!(
                "get_tweet: invalid id '{}'",
                params.id
            )));
        }
        let tweet = self.client.get_tweet(&params.id).await?;
        Ok(serde_json::to_value(tweet)?)
    }

    pub fn activity(&self) -> SocialActivity {
        self.activity.read().clone()
    }

    fn activity_value(&self) -> Result<Value, ApiError> {
        Ok(serde_json::to_value(self.activity())?)
    }
}

#[async_trait]
impl AgentBehavior for SocialMedia {
    async fn handle_event(
        &self,
        _ctx: &AgentContext,
        source: &str,
        event: &AgentEvent,
    ) -> Result<(), ApiError> {
        if event.name() != ANALYSIS_COMPLETED {
            return Ok(());
        }
        let mut activity = self.activity.write();
        activity.analyses_observed += 1;
        activity.last_analysis = Some(event.data());
        debug!(source, observed = activity.analyses_observed, "Observed completed analysis");
        Ok(())
    }
}

/// Build the social-platform agent around `client`
pub fn social_agent(
    client: Arc<dyn SocialPlatformClient>,
) -> Result<(Agent, Arc<SocialMedia>), ApiError> {
    let service = SocialMedia::new(client);

    let search = Arc::clone(&service);
    let lookup = Arc::clone(&service);
    let activity = Arc::clone(&service);

    let agent = Agent::builder(SOCIAL_AGENT_ID)
        .kind("social")
        .tool(
            ToolDescriptor::builder("search_tweets")
                .description("Search recent posts matching a query")
                .input_schema(json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string"},
                        "max_results": {"type": "integer", "minimum": MIN_RESULTS, "maximum": MAX_RESULTS}
                    },
                    "required": ["query"]
                }))
                .handler(move |params| {
                    let service = Arc::clone(&search);
                    async move { service.search_tweets(params).await }
                })
                .build()?,
        )
        .tool(
            ToolDescriptor::builder("get_tweet")
                .description("Fetch one post by id")
                .input_schema(json!({
                    "type": "object",
                    "properties": {"id": {"type": "string"}},
                    "required": ["id"]
                }))
                .handler(move |params| {
                    let service = Arc::clone(&lookup);
                    async move { service.get_tweet(params).await }
                })
                .build()?,
        )
        .resource(
            ResourceDescriptor::builder("social_activity")
                .description("Recent searches and analyses observed from other agents")
                .handler(move |_| {
                    let service = Arc::clone(&activity);
                    async move { service.activity_value() }
                })
                .build()?,
        )
        .behavior(Arc::clone(&service) as Arc<dyn AgentBehavior>)
        .build()?;

    Ok((agent, service))
}
