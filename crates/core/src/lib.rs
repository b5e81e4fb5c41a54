pub mod batch;
pub mod context;
pub mod domain;
pub mod enrich;
pub mod llm;
pub mod pipeline;
pub mod resolve;
pub mod storage;
pub mod store;
pub mod time;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    const DEFAULT_LOCAL_STORE_URL: &str = "sqlite://advisor.db?mode=rwc";
    const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum RecordBackend {
        Local,
        Live,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LlmProviderKind {
        OpenAI,
        Anthropic,
    }

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub llm_provider: LlmProviderKind,
        pub llm_model: Option<String>,
        pub llm_timeout: Duration,
        pub openai_api_key: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub record_backend: RecordBackend,
        pub local_store_url: String,
        pub market_data_base_url: Option<String>,
        pub default_persona: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let llm_provider = match std::env::var("LLM_PROVIDER") {
                Ok(v) => parse_llm_provider(&v)?,
                Err(_) => LlmProviderKind::OpenAI,
            };
            let record_backend = match std::env::var("RECORD_BACKEND") {
                Ok(v) => parse_record_backend(&v)?,
                Err(_) => RecordBackend::Local,
            };
            let llm_timeout_secs = std::env::var("LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS);

            Ok(Self {
                llm_provider,
                llm_model: std::env::var("LLM_MODEL").ok().filter(|s| !s.trim().is_empty()),
                llm_timeout: Duration::from_secs(llm_timeout_secs),
                openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
                anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
                record_backend,
                local_store_url: std::env::var("LOCAL_STORE_URL")
                    .unwrap_or_else(|_| DEFAULT_LOCAL_STORE_URL.to_string()),
                market_data_base_url: std::env::var("MARKET_DATA_BASE_URL").ok(),
                default_persona: std::env::var("DEFAULT_PERSONA").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }
    }

    fn parse_llm_provider(v: &str) -> anyhow::Result<LlmProviderKind> {
        match v.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmProviderKind::OpenAI),
            "anthropic" => Ok(LlmProviderKind::Anthropic),
            other => anyhow::bail!("unsupported LLM_PROVIDER: {other}"),
        }
    }

    fn parse_record_backend(v: &str) -> anyhow::Result<RecordBackend> {
        match v.trim().to_ascii_lowercase().as_str() {
            "local" | "sqlite" => Ok(RecordBackend::Local),
            "live" | "market" => Ok(RecordBackend::Live),
            other => anyhow::bail!("unsupported RECORD_BACKEND: {other}"),
        }
    }

}
