use crate::domain::company::CompanyKey;
use crate::domain::record::{FinancialRecord, StoredReturns};
use crate::storage;
use crate::store::{FetchOutcome, RecordStore, StoreError};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Point lookups against the embedded `companies` table.
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
    // Schema creation and seeding go through here; reads do not.
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl SqliteRecordStore {
    pub async fn open(url: &str) -> anyhow::Result<Self> {
        let pool = storage::connect(url).await?;
        let store = Self::from_pool(pool);
        let seeded = store.initialize().await?;
        tracing::info!(%url, seeded, "local record store ready");
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Runs migrations and seeds an empty table. Safe to call more than once.
    pub async fn initialize(&self) -> anyhow::Result<u64> {
        let _guard = self.write_lock.lock().await;
        storage::migrate(&self.pool).await?;
        storage::seed::seed_if_empty(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CompanyRow {
    name: String,
    symbol: Option<String>,
    sector: Option<String>,
    per: Option<f64>,
    roe: Option<f64>,
    total_debt: Option<f64>,
    total_equity: Option<f64>,
    revenue: Option<f64>,
    market_cap: Option<f64>,
    risk_level: Option<String>,
    main_products: Option<String>,
    current_price: Option<f64>,
    return_1y: Option<f64>,
    return_3y: Option<f64>,
    max_return_1y: Option<f64>,
    max_loss_1y: Option<f64>,
    max_return_3y: Option<f64>,
    max_loss_3y: Option<f64>,
}

impl From<CompanyRow> for FinancialRecord {
    fn from(row: CompanyRow) -> Self {
        FinancialRecord {
            symbol: row.symbol,
            name: Some(row.name),
            sector: row.sector,
            per: row.per,
            roe: row.roe,
            total_debt: row.total_debt,
            total_equity: row.total_equity,
            revenue: row.revenue,
            market_cap: row.market_cap,
            risk_level: row.risk_level,
            description: row.main_products,
            current_price: row.current_price,
            history: Default::default(),
            stored_returns: StoredReturns {
                return_1y: row.return_1y,
                return_3y: row.return_3y,
                max_return_1y: row.max_return_1y,
                max_loss_1y: row.max_loss_1y,
                max_return_3y: row.max_return_3y,
                max_loss_3y: row.max_loss_3y,
            },
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for SqliteRecordStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn fetch(&self, key: &CompanyKey) -> Result<FetchOutcome, StoreError> {
        let row = sqlx::query_as::<_, CompanyRow>(
            "SELECT name, symbol, sector, per, roe, total_debt, total_equity, revenue, market_cap, \
                    risk_level, main_products, current_price, return_1y, return_3y, \
                    max_return_1y, max_loss_1y, max_return_3y, max_loss_3y \
             FROM companies \
             WHERE name = ?1 OR symbol = ?1 \
             LIMIT 1",
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(row) => FetchOutcome::Found(row.into()),
            None => FetchOutcome::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::seed::SEED_COMPANIES;

    async fn memory_store() -> SqliteRecordStore {
        let pool = storage::connect("sqlite::memory:").await.unwrap();
        SqliteRecordStore::from_pool(pool)
    }

    fn found(outcome: FetchOutcome) -> FinancialRecord {
        match outcome {
            FetchOutcome::Found(r) => r,
            FetchOutcome::NotFound => panic!("expected a record"),
        }
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = memory_store().await;
        let first = store.initialize().await.unwrap();
        assert_eq!(first, SEED_COMPANIES.len() as u64);
        let second = store.initialize().await.unwrap();
        assert_eq!(second, 0);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM companies")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, SEED_COMPANIES.len() as i64);
    }

    #[tokio::test]
    async fn looks_up_by_name_or_symbol() {
        let store = memory_store().await;
        store.initialize().await.unwrap();

        let by_symbol = found(store.fetch(&CompanyKey::new("005930.KS")).await.unwrap());
        let by_name = found(store.fetch(&CompanyKey::new("삼성전자")).await.unwrap());
        assert_eq!(by_symbol, by_name);
        assert_eq!(by_symbol.name.as_deref(), Some("삼성전자"));
        assert_eq!(by_symbol.sector.as_deref(), Some("반도체"));
        assert!(by_symbol.history.is_empty());
        assert_eq!(by_symbol.stored_returns.return_1y, Some(-3.1));
    }

    #[tokio::test]
    async fn missing_columns_come_back_null() {
        let store = memory_store().await;
        store.initialize().await.unwrap();

        let r = found(store.fetch(&CompanyKey::new("086520.KQ")).await.unwrap());
        assert_eq!(r.per, None);
        assert_eq!(r.total_equity, None);
        assert_eq!(r.stored_returns.return_3y, None);
        assert!(r.market_cap.is_some());
    }

    #[tokio::test]
    async fn unknown_key_is_not_found() {
        let store = memory_store().await;
        store.initialize().await.unwrap();
        let outcome = store.fetch(&CompanyKey::new("999999.KS")).await.unwrap();
        assert_eq!(outcome, FetchOutcome::NotFound);
    }

    #[tokio::test]
    async fn query_before_migration_is_a_store_error() {
        let store = memory_store().await;
        let err = store.fetch(&CompanyKey::new("005930.KS")).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }
}
