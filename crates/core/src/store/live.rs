use crate::config::Settings;
use crate::domain::company::CompanyKey;
use crate::domain::record::{FinancialRecord, PriceSeries, ReturnWindow};
use crate::store::{FetchOutcome, RecordStore, StoreError};
use crate::time::kst::{kst_date_from_unix, today_kst};
use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRIES: u32 = 2;
const MAX_RETRIES: u32 = 5;
const BASE_BACKOFF_MS: u64 = 250;
const MAX_BACKOFF: Duration = Duration::from_secs(4);
// Extra calendar days before the 3y window start so a weekend or holiday start still has a
// close on or before it.
const HISTORY_BUFFER_DAYS: i64 = 10;
const USER_AGENT: &str = "Mozilla/5.0 (compatible; advisor/0.1)";
const SNAPSHOT_MODULES: &str =
    "price,summaryDetail,financialData,summaryProfile,balanceSheetHistory";

#[derive(Debug, Clone)]
pub struct LiveRecordStore {
    http: reqwest::Client,
    base_url: String,
    retries: u32,
}

impl LiveRecordStore {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = settings
            .market_data_base_url
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("MARKET_DATA_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("MARKET_DATA_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        Self::new(base_url, Duration::from_secs(timeout_secs), retries)
    }

    pub fn new(base_url: impl Into<String>, timeout: Duration, retries: u32) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            retries: retries.clamp(1, MAX_RETRIES),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// `Ok(None)` means the provider answered 404.
    async fn get_json_once(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<Value>, StoreError> {
        let res = self.http.get(self.url(path)).query(query).send().await?;

        let status = res.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let text = res.text().await?;
        if !status.is_success() {
            return Err(StoreError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str::<Value>(&text)
            .map(Some)
            .map_err(|e| StoreError::Decode(format!("{path}: {e}")))
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Option<Value>, StoreError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.get_json_once(path, query).await {
                Ok(v) => return Ok(v),
                Err(err) => {
                    if attempt >= self.retries || !is_retryable(&err) {
                        return Err(err);
                    }
                    let backoff = backoff_delay(attempt);
                    tracing::warn!(attempt, ?backoff, %path, error = %err, "market data request failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    async fn fetch_snapshot(&self, symbol: &str) -> Result<Option<FinancialRecord>, StoreError> {
        let path = format!("/v10/finance/quoteSummary/{symbol}");
        match self.get_json(&path, &[("modules", SNAPSHOT_MODULES)]).await? {
            Some(body) => parse_snapshot(symbol, &body),
            None => Ok(None),
        }
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        today: NaiveDate,
    ) -> Result<PriceSeries, StoreError> {
        let path = format!("/v8/finance/chart/{symbol}");
        let (period1, period2) = chart_period(today);
        let (period1, period2) = (period1.to_string(), period2.to_string());
        let query = [
            ("period1", period1.as_str()),
            ("period2", period2.as_str()),
            ("interval", "1d"),
        ];
        match self.get_json(&path, &query).await? {
            Some(body) => parse_chart(body),
            None => Ok(PriceSeries::default()),
        }
    }
}

/// 250ms doubling per attempt, capped at [`MAX_BACKOFF`].
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1u64
        .checked_shl(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX);
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(factor)).min(MAX_BACKOFF)
}

/// Unix bounds for the daily chart request: the 3y window plus a buffer, through the end of `today`.
fn chart_period(today: NaiveDate) -> (i64, i64) {
    let span = ReturnWindow::ThreeYears.days() + HISTORY_BUFFER_DAYS;
    let start = today - chrono::Duration::days(span);
    let end = today + chrono::Duration::days(1);
    (
        start.and_time(NaiveTime::MIN).and_utc().timestamp(),
        end.and_time(NaiveTime::MIN).and_utc().timestamp(),
    )
}

fn is_retryable(err: &StoreError) -> bool {
    match err {
        StoreError::Transport(_) => true,
        StoreError::Http { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

#[async_trait::async_trait]
impl RecordStore for LiveRecordStore {
    fn backend_name(&self) -> &'static str {
        "live"
    }

    async fn fetch(&self, key: &CompanyKey) -> Result<FetchOutcome, StoreError> {
        let symbol = key.as_str();
        let (snapshot, history) = tokio::join!(
            self.fetch_snapshot(symbol),
            self.fetch_history(symbol, today_kst())
        );
        combine(symbol, snapshot, history)
    }
}

/// Merges the two independent lookups. A single failing side degrades to a partial record.
fn combine(
    symbol: &str,
    snapshot: Result<Option<FinancialRecord>, StoreError>,
    history: Result<PriceSeries, StoreError>,
) -> Result<FetchOutcome, StoreError> {
    match (snapshot, history) {
        (Ok(Some(mut record)), Ok(series)) => {
            record.history = series;
            Ok(FetchOutcome::Found(record))
        }
        (Ok(Some(record)), Err(err)) => {
            tracing::warn!(%symbol, error = %err, "price history unavailable; returning snapshot only");
            Ok(FetchOutcome::Found(record))
        }
        (Ok(None), Ok(series)) if !series.is_empty() => {
            tracing::warn!(%symbol, "snapshot not found; returning price history only");
            Ok(FetchOutcome::Found(history_only(symbol, series)))
        }
        (Ok(None), Ok(_)) => Ok(FetchOutcome::NotFound),
        (Ok(None), Err(err)) => {
            tracing::warn!(%symbol, error = %err, "snapshot not found and price history failed");
            Ok(FetchOutcome::NotFound)
        }
        (Err(err), Ok(series)) if !series.is_empty() => {
            tracing::warn!(%symbol, error = %err, "snapshot unavailable; returning price history only");
            Ok(FetchOutcome::Found(history_only(symbol, series)))
        }
        (Err(err), Ok(_)) => Err(err),
        (Err(snapshot), Err(history)) => Err(StoreError::Both {
            snapshot: snapshot.to_string(),
            history: history.to_string(),
        }),
    }
}

fn history_only(symbol: &str, series: PriceSeries) -> FinancialRecord {
    FinancialRecord {
        symbol: Some(symbol.to_string()),
        history: series,
        ..FinancialRecord::empty()
    }
}

pub fn risk_tier_from_beta(beta: f64) -> &'static str {
    if beta < 0.8 {
        "낮음"
    } else if beta < 1.2 {
        "중간"
    } else {
        "높음"
    }
}

/// Reads a numeric field that may be a bare number or a `{"raw": n, "fmt": ".."}` object.
fn num(v: &Value, pointer: &str) -> Option<f64> {
    let field = v.pointer(pointer)?;
    let raw = match field {
        Value::Object(map) => map.get("raw")?,
        other => other,
    };
    raw.as_f64().filter(|x| x.is_finite())
}

fn text(v: &Value, pointer: &str) -> Option<String> {
    v.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_snapshot(symbol: &str, body: &Value) -> Result<Option<FinancialRecord>, StoreError> {
    let summary = body
        .get("quoteSummary")
        .ok_or_else(|| StoreError::Decode("missing quoteSummary".to_string()))?;
    let Some(q) = summary
        .get("result")
        .and_then(Value::as_array)
        .and_then(|r| r.first())
    else {
        return Ok(None);
    };

    let beta = num(q, "/summaryDetail/beta").or_else(|| num(q, "/defaultKeyStatistics/beta"));
    let equity = num(
        q,
        "/balanceSheetHistory/balanceSheetStatements/0/totalStockholderEquity",
    );
    let debt = num(q, "/financialData/totalDebt").or_else(|| {
        num(q, "/balanceSheetHistory/balanceSheetStatements/0/totalLiab")
    });

    Ok(Some(FinancialRecord {
        symbol: Some(symbol.to_string()),
        name: text(q, "/price/longName").or_else(|| text(q, "/price/shortName")),
        sector: text(q, "/summaryProfile/sector"),
        per: num(q, "/summaryDetail/trailingPE"),
        roe: num(q, "/financialData/returnOnEquity"),
        total_debt: debt,
        total_equity: equity,
        revenue: num(q, "/financialData/totalRevenue"),
        market_cap: num(q, "/price/marketCap").or_else(|| num(q, "/summaryDetail/marketCap")),
        risk_level: beta.map(|b| risk_tier_from_beta(b).to_string()),
        description: text(q, "/summaryProfile/longBusinessSummary"),
        current_price: num(q, "/price/regularMarketPrice")
            .or_else(|| num(q, "/financialData/currentPrice")),
        ..FinancialRecord::empty()
    }))
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn parse_chart(body: Value) -> Result<PriceSeries, StoreError> {
    let env = serde_json::from_value::<ChartEnvelope>(body)
        .map_err(|e| StoreError::Decode(format!("chart: {e}")))?;

    let Some(result) = env.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(PriceSeries::default());
    };
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let points = result
        .timestamp
        .into_iter()
        .zip(closes)
        .filter_map(|(ts, close)| Some((kst_date_from_unix(ts)?, close?)));
    Ok(PriceSeries::from_points(points))
}
