use crate::config::Settings;
use crate::domain::prompt::{PromptContext, Role};
use crate::llm::{CompletionGateway, GatewayError, Provider};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Debug, Clone)]
pub struct AnthropicGateway {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    max_tokens: u32,
}

impl AnthropicGateway {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let max_tokens = std::env::var("ANTHROPIC_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let http = reqwest::Client::builder()
            .timeout(settings.llm_timeout)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            max_tokens,
        })
    }

    fn headers(&self) -> Result<HeaderMap, GatewayError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key).map_err(|e| GatewayError::Malformed {
            provider: Provider::Anthropic,
            detail: format!("invalid api key header: {e}"),
        })?;
        headers.insert("x-api-key", key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        Ok(headers)
    }

    async fn create_message(
        &self,
        req: &CreateMessageRequest,
    ) -> Result<CreateMessageResponse, GatewayError> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(self.headers()?)
            .json(req)
            .send()
            .await
            .map_err(GatewayError::transport(Provider::Anthropic))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(GatewayError::transport(Provider::Anthropic))?;
        if !status.is_success() {
            return Err(GatewayError::Http {
                provider: Provider::Anthropic,
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str::<CreateMessageResponse>(&text).map_err(|e| GatewayError::Malformed {
            provider: Provider::Anthropic,
            detail: e.to_string(),
        })
    }
}

/// System segments are joined into the `system` field in order; user segments become messages.
fn build_request(model: &str, max_tokens: u32, context: PromptContext) -> CreateMessageRequest {
    let mut system = Vec::new();
    let mut messages = Vec::new();
    for segment in context.into_segments() {
        match segment.role {
            Role::System => system.push(segment.content),
            Role::User => messages.push(Message {
                role: "user",
                content: segment.content,
            }),
        }
    }

    CreateMessageRequest {
        model: model.to_string(),
        max_tokens,
        system: (!system.is_empty()).then(|| system.join("\n\n")),
        messages,
    }
}

fn response_text(res: &CreateMessageResponse) -> String {
    let mut out = String::new();
    for block in &res.content {
        if let ContentBlock::Text { text } = block {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(text);
        }
    }
    out
}

#[async_trait::async_trait]
impl CompletionGateway for AnthropicGateway {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    async fn complete(&self, model: &str, context: PromptContext) -> Result<String, GatewayError> {
        let req = build_request(model, self.max_tokens, context);
        let res = self.create_message(&req).await?;

        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            tracing::warn!(model, max_tokens = self.max_tokens, "Anthropic reply truncated at max_tokens");
        }

        let text = response_text(&res);
        let text = text.trim();
        if text.is_empty() {
            return Err(GatewayError::Empty {
                provider: Provider::Anthropic,
            });
        }
        Ok(text.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prompt::Segment;
    use serde_json::json;

    #[test]
    fn joins_system_segments_and_keeps_user_last() {
        let ctx = PromptContext::from_segments(vec![
            Segment::system("persona"),
            Segment::system("[기업 데이터]"),
            Segment::user("삼성전자 어때?"),
        ]);
        let req = build_request("claude-3-5-sonnet-latest", 1024, ctx);
        assert_eq!(req.system.as_deref(), Some("persona\n\n[기업 데이터]"));
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].content, "삼성전자 어때?");

        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn collects_text_blocks_and_ignores_others() {
        let res: CreateMessageResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "...", "signature": "x"},
                {"type": "text", "text": "첫째"},
                {"type": "text", "text": "둘째"}
            ],
            "stop_reason": "end_turn"
        }))
        .unwrap();
        assert_eq!(response_text(&res), "첫째\n둘째");
    }
}
