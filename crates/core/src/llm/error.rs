use crate::llm::Provider;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("{provider} request failed: {source}")]
    Transport {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} HTTP {status}: {body}")]
    Http {
        provider: Provider,
        status: u16,
        body: String,
    },

    #[error("{provider} response malformed: {detail}")]
    Malformed { provider: Provider, detail: String },

    #[error("{provider} returned no text")]
    Empty { provider: Provider },
}

impl GatewayError {
    pub(crate) fn transport(provider: Provider) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| GatewayError::Transport { provider, source }
    }
}
