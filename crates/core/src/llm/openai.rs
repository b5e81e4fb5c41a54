use crate::config::Settings;
use crate::domain::prompt::PromptContext;
use crate::llm::{CompletionGateway, GatewayError, Provider};
use anyhow::Context;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone)]
pub struct OpenAiGateway {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiGateway {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_openai_api_key()?.to_string();
        let base_url = std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let http = reqwest::Client::builder()
            .timeout(settings.llm_timeout)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
        })
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn request_body(model: &str, context: PromptContext) -> ChatRequest<'_> {
    ChatRequest {
        model,
        messages: context
            .into_segments()
            .into_iter()
            .map(|s| ChatMessage {
                role: s.role.as_str(),
                content: s.content,
            })
            .collect(),
    }
}

fn reply_text(text: &str) -> Result<String, GatewayError> {
    let parsed = serde_json::from_str::<ChatResponse>(text).map_err(|e| GatewayError::Malformed {
        provider: Provider::OpenAI,
        detail: e.to_string(),
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(GatewayError::Empty {
            provider: Provider::OpenAI,
        })
}

#[async_trait::async_trait]
impl CompletionGateway for OpenAiGateway {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    async fn complete(&self, model: &str, context: PromptContext) -> Result<String, GatewayError> {
        let body = request_body(model, context);
        let res = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(GatewayError::transport(Provider::OpenAI))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(GatewayError::transport(Provider::OpenAI))?;
        if !status.is_success() {
            return Err(GatewayError::Http {
                provider: Provider::OpenAI,
                status: status.as_u16(),
                body: text,
            });
        }

        reply_text(&text)
    }
}
