use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnWindow {
    OneYear,
    ThreeYears,
}

impl ReturnWindow {
    pub fn days(self) -> i64 {
        match self {
            ReturnWindow::OneYear => 365,
            ReturnWindow::ThreeYears => 3 * 365,
        }
    }
}

/// Daily closes, ascending by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<(NaiveDate, f64)>,
}

impl PriceSeries {
    /// Builds a series from unordered observations. Non-finite closes are dropped and a later
    /// duplicate date replaces an earlier one.
    pub fn from_points(points: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        let mut points: Vec<_> = points.into_iter().filter(|(_, p)| p.is_finite()).collect();
        points.sort_by_key(|(d, _)| *d);
        let mut deduped: Vec<(NaiveDate, f64)> = Vec::with_capacity(points.len());
        for (date, close) in points {
            match deduped.last_mut() {
                Some(last) if last.0 == date => last.1 = close,
                _ => deduped.push((date, close)),
            }
        }
        Self { points: deduped }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|(_, p)| *p)
    }

    /// Last close observed on or before `date`.
    pub fn close_at_or_before(&self, date: NaiveDate) -> Option<f64> {
        let idx = self.points.partition_point(|(d, _)| *d <= date);
        idx.checked_sub(1).map(|i| self.points[i].1)
    }

    pub fn closes_after(&self, date: NaiveDate) -> impl Iterator<Item = f64> + '_ {
        let idx = self.points.partition_point(|(d, _)| *d <= date);
        self.points[idx..].iter().map(|(_, p)| *p)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredReturns {
    pub return_1y: Option<f64>,
    pub return_3y: Option<f64>,
    pub max_return_1y: Option<f64>,
    pub max_loss_1y: Option<f64>,
    pub max_return_3y: Option<f64>,
    pub max_loss_3y: Option<f64>,
}

// Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialRecord {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub per: Option<f64>,
    /// Return on equity as a fraction (0.15 == 15%).
    pub roe: Option<f64>,
    pub total_debt: Option<f64>,
    pub total_equity: Option<f64>,
    pub revenue: Option<f64>,
    /// KRW.
    pub market_cap: Option<f64>,
    pub risk_level: Option<String>,
    pub description: Option<String>,
    pub current_price: Option<f64>,
    pub history: PriceSeries,
    pub stored_returns: StoredReturns,
}

impl FinancialRecord {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Derived, response-facing view of a record. Field names are the JSON keys clients render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub sector: Option<String>,
    pub per: Option<f64>,
    /// Percent.
    pub roe: Option<f64>,
    // Debt over equity, percent.
    pub debt_ratio: Option<f64>,
    // 조원.
    pub sales: Option<f64>,
    // 조원.
    pub market_cap: Option<f64>,
    pub risk_level: Option<String>,
    pub main_products: Option<String>,
    pub return_1y: Option<f64>,
    pub return_3y: Option<f64>,
    pub max_return_1y: Option<f64>,
    pub max_loss_1y: Option<f64>,
    pub max_return_3y: Option<f64>,
    pub max_loss_3y: Option<f64>,
}

impl EnrichedRecord {
    pub fn has_metrics(&self) -> bool {
        self.sector.is_some()
            || self.per.is_some()
            || self.roe.is_some()
            || self.debt_ratio.is_some()
            || self.sales.is_some()
            || self.market_cap.is_some()
            || self.risk_level.is_some()
            || self.main_products.is_some()
            || self.return_1y.is_some()
            || self.return_3y.is_some()
            || self.max_return_1y.is_some()
            || self.max_loss_1y.is_some()
            || self.max_return_3y.is_some()
            || self.max_loss_3y.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn series_sorts_and_dedupes() {
        let s = PriceSeries::from_points([
            (d(2026, 1, 3), 3.0),
            (d(2026, 1, 1), 1.0),
            (d(2026, 1, 3), 4.0),
            (d(2026, 1, 2), f64::NAN),
        ]);
        assert_eq!(s.points(), &[(d(2026, 1, 1), 1.0), (d(2026, 1, 3), 4.0)]);
    }

    #[test]
    fn close_lookup_uses_last_observation_on_or_before() {
        let s = PriceSeries::from_points([(d(2026, 1, 2), 10.0), (d(2026, 1, 5), 12.0)]);
        assert_eq!(s.close_at_or_before(d(2026, 1, 1)), None);
        assert_eq!(s.close_at_or_before(d(2026, 1, 2)), Some(10.0));
        assert_eq!(s.close_at_or_before(d(2026, 1, 4)), Some(10.0));
        assert_eq!(s.close_at_or_before(d(2026, 2, 1)), Some(12.0));
        assert_eq!(s.closes_after(d(2026, 1, 2)).collect::<Vec<_>>(), vec![12.0]);
    }

    #[test]
    fn empty_record_has_no_metrics() {
        assert!(!EnrichedRecord::default().has_metrics());
    }
}
