pub mod descriptors;

use crate::domain::record::{EnrichedRecord, FinancialRecord, PriceSeries, ReturnWindow};
use chrono::{Duration, NaiveDate};

pub const DESCRIPTION_MAX_CHARS: usize = 200;
pub const CONTINUATION_MARKER: &str = "...";

const KRW_PER_JO: f64 = 1.0e12;

pub fn enrich(record: &FinancialRecord, today: NaiveDate) -> EnrichedRecord {
    let current = record.current_price.or_else(|| record.history.last_close());
    let stored = &record.stored_returns;

    let window = |w: ReturnWindow| WindowReturns::compute(&record.history, current, today, w);
    let one = window(ReturnWindow::OneYear);
    let three = window(ReturnWindow::ThreeYears);

    EnrichedRecord {
        name: record.name.clone(),
        symbol: record.symbol.clone(),
        sector: non_blank(record.sector.as_deref()),
        per: record.per.and_then(round2),
        roe: record.roe.and_then(fraction_to_percent),
        debt_ratio: ratio_percent(record.total_debt, record.total_equity),
        sales: record.revenue.and_then(|v| round2(v / KRW_PER_JO)),
        market_cap: record.market_cap.and_then(|v| round2(v / KRW_PER_JO)),
        risk_level: non_blank(record.risk_level.as_deref()),
        main_products: non_blank(record.description.as_deref()).map(|d| truncate_description(&d)),
        return_1y: one.trailing.or(stored.return_1y),
        return_3y: three.trailing.or(stored.return_3y),
        max_return_1y: one.max_return.or(stored.max_return_1y),
        max_loss_1y: one.max_loss.or(stored.max_loss_1y),
        max_return_3y: three.max_return.or(stored.max_return_3y),
        max_loss_3y: three.max_loss.or(stored.max_loss_3y),
    }
}

/// Two-decimal rounding; non-finite input is treated as absent.
pub fn round2(v: f64) -> Option<f64> {
    if !v.is_finite() {
        return None;
    }
    let r = (v * 100.0).round() / 100.0;
    r.is_finite().then_some(r)
}

pub fn fraction_to_percent(v: f64) -> Option<f64> {
    round2(v * 100.0)
}

/// `numerator / denominator` in percent, when both are present and the denominator is non-zero.
pub fn ratio_percent(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    if d == 0.0 {
        return None;
    }
    round2(n / d * 100.0)
}

pub fn truncate_description(text: &str) -> String {
    match text.char_indices().nth(DESCRIPTION_MAX_CHARS) {
        Some((cut, _)) => format!("{}{CONTINUATION_MARKER}", &text[..cut]),
        None => text.to_string(),
    }
}

/// `(current / price_at(today - W) - 1) * 100`, or `None` when the series has no observation on
/// or before the window start.
pub fn trailing_return(
    series: &PriceSeries,
    current: Option<f64>,
    today: NaiveDate,
    window: ReturnWindow,
) -> Option<f64> {
    WindowReturns::compute(series, current, today, window).trailing
}

#[derive(Debug, Default)]
struct WindowReturns {
    trailing: Option<f64>,
    max_return: Option<f64>,
    max_loss: Option<f64>,
}

impl WindowReturns {
    fn compute(
        series: &PriceSeries,
        current: Option<f64>,
        today: NaiveDate,
        window: ReturnWindow,
    ) -> Self {
        if series.is_empty() {
            return Self::default();
        }
        let start = today - Duration::days(window.days());
        let Some(base) = series.close_at_or_before(start).filter(|b| *b != 0.0) else {
            return Self::default();
        };

        let pct = |p: f64| round2((p / base - 1.0) * 100.0);
        let (mut hi, mut lo): (Option<f64>, Option<f64>) = (None, None);
        for p in series.closes_after(start) {
            hi = Some(hi.map_or(p, |h| h.max(p)));
            lo = Some(lo.map_or(p, |l| l.min(p)));
        }

        Self {
            trailing: current.and_then(pct),
            max_return: hi.and_then(pct),
            max_loss: lo.and_then(pct),
        }
    }
}

fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}
