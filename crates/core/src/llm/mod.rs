pub mod anthropic;
pub mod error;
pub mod openai;

pub use error::GatewayError;

use crate::config::{LlmProviderKind, Settings};
use crate::domain::prompt::PromptContext;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAI => "openai",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait::async_trait]
pub trait CompletionGateway: Send + Sync {
    fn provider(&self) -> Provider;

    /// Model used when `LLM_MODEL` is not set.
    fn default_model(&self) -> &str;

    async fn complete(&self, model: &str, context: PromptContext) -> Result<String, GatewayError>;
}

pub fn gateway_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn CompletionGateway>> {
    Ok(match settings.llm_provider {
        LlmProviderKind::OpenAI => Arc::new(openai::OpenAiGateway::from_settings(settings)?),
        LlmProviderKind::Anthropic => Arc::new(anthropic::AnthropicGateway::from_settings(settings)?),
    })
}

/// The model named in settings, else the gateway's own default.
pub fn model_for(settings: &Settings, gateway: &dyn CompletionGateway) -> String {
    settings
        .llm_model
        .clone()
        .unwrap_or_else(|| gateway.default_model().to_string())
}
