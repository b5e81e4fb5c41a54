use crate::domain::record::EnrichedRecord;

pub const RISK_LABEL: &str = "위험도";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub label: &'static str,
    pub comment: &'static str,
}

/// Plain-language readings of the enriched metrics, in a fixed order.
pub fn describe(record: &EnrichedRecord) -> Vec<Descriptor> {
    let mut out = Vec::new();
    let mut push = |label, comment| out.push(Descriptor { label, comment });

    if let Some(per) = record.per {
        push(
            "PER",
            if per <= 15.0 {
                "저평가"
            } else if per <= 25.0 {
                "보통"
            } else {
                "고평가"
            },
        );
    }

    if let Some(roe) = record.roe {
        push(
            "ROE",
            if roe >= 15.0 {
                "우수"
            } else if roe >= 10.0 {
                "양호"
            } else {
                "낮음"
            },
        );
    }

    if let Some(debt) = record.debt_ratio {
        push(
            "부채비율",
            if debt < 50.0 {
                "건전"
            } else if debt < 100.0 {
                "주의"
            } else {
                "위험"
            },
        );
    }

    if let Some(sales) = record.sales {
        push("매출액", size_band(sales));
    }
    if let Some(cap) = record.market_cap {
        push("시가총액", size_band(cap));
    }

    if let Some(risk) = record.risk_level.as_deref() {
        push(
            RISK_LABEL,
            match risk {
                "낮음" => "안정적",
                "중간" => "보통",
                _ => "높음",
            },
        );
    }

    out
}

// 조원.
fn size_band(v: f64) -> &'static str {
    if v >= 100.0 {
        "대형"
    } else if v >= 50.0 {
        "중간"
    } else {
        "소형"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(record: &EnrichedRecord) -> Vec<(&'static str, &'static str)> {
        describe(record)
            .into_iter()
            .map(|d| (d.label, d.comment))
            .collect()
    }

    #[test]
    fn thresholds_follow_metric_bands() {
        let record = EnrichedRecord {
            per: Some(15.0),
            roe: Some(9.99),
            debt_ratio: Some(100.0),
            sales: Some(300.9),
            market_cap: Some(50.0),
            risk_level: Some("낮음".into()),
            ..EnrichedRecord::default()
        };
        assert_eq!(
            pairs(&record),
            vec![
                ("PER", "저평가"),
                ("ROE", "낮음"),
                ("부채비율", "위험"),
                ("매출액", "대형"),
                ("시가총액", "중간"),
                ("위험도", "안정적"),
            ]
        );
    }

    #[test]
    fn unknown_risk_tier_reads_high() {
        let record = EnrichedRecord {
            market_cap: Some(17.0),
            risk_level: Some("높음".into()),
            ..EnrichedRecord::default()
        };
        assert_eq!(pairs(&record), vec![("시가총액", "소형"), ("위험도", "높음")]);
    }

    #[test]
    fn nothing_to_describe_for_empty_record() {
        assert!(describe(&EnrichedRecord::default()).is_empty());
    }
}
