//! Built-in agents: content analysis and social-platform access.

pub mod content;
pub mod social;

pub use content::{content_agent, ContentAnalysis, CONTENT_AGENT_ID};
pub use social::{
    social_agent, SimulatedClient, SocialActivity, SocialMedia, SocialPlatformClient, Tweet,
    TwitterApiClient, SOCIAL_AGENT_ID,
};

use crate::config::SwitchboardConfig;
use crate::error::ApiError;
use crate::orchestrator::Orchestrator;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Deserialize handler params; `null` is read as an empty object
pub(crate) fn parse_params<T: DeserializeOwned>(name: &str, params: Value) -> Result<T, ApiError> {
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params
    };
    serde_json::from_value(params)
        .map_err(|e| ApiError::Validation(format!("{}: invalid params: {}", name, e)))
}

/// Build the built-in agents and register them with `orchestrator`
pub async fn register_default_agents(
    orchestrator: &Orchestrator,
    config: &SwitchboardConfig,
) -> Result<(), ApiError> {
    let (content, _) = content_agent(&config.analysis)?;
    orchestrator.register_agent(Arc::new(content)).await?;

    let client = social::client_from_config(&config.platforms.twitter)?;
    let (social, _) = social_agent(client)?;
    orchestrator.register_agent(Arc::new(social)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Paging {
        #[serde(default)]
        offset: usize,
    }

    #[test]
    fn test_parse_params_null_is_empty_object() {
        let paging: Paging = parse_params("t", Value::Null).unwrap();
        assert_eq!(paging.offset, 0);

        let err = parse_params::<Paging>("t", serde_json::json!({"offset": "x"})).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
