pub mod live;
pub mod local;

use crate::config::{RecordBackend, Settings};
use crate::domain::company::CompanyKey;
use crate::domain::record::FinancialRecord;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(FinancialRecord),
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("local store query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("market data request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("market data HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("market data response malformed: {0}")]
    Decode(String),

    #[error("snapshot and history both failed (snapshot: {snapshot}; history: {history})")]
    Both { snapshot: String, history: String },
}

#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn fetch(&self, key: &CompanyKey) -> Result<FetchOutcome, StoreError>;
}

/// Builds the backend named by `RECORD_BACKEND`. The local store is migrated and seeded here.
pub async fn from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn RecordStore>> {
    match settings.record_backend {
        RecordBackend::Local => {
            let store = local::SqliteRecordStore::open(&settings.local_store_url).await?;
            Ok(Arc::new(store))
        }
        RecordBackend::Live => Ok(Arc::new(live::LiveRecordStore::from_settings(settings)?)),
    }
}
