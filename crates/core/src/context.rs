use crate::batch::BatchClassification;
use crate::domain::company::ResolvedCompany;
use crate::domain::persona::{PersonaId, PersonaTemplate};
use crate::domain::profile::UserProfile;
use crate::domain::prompt::{PromptContext, Segment};
use crate::domain::record::EnrichedRecord;
use crate::enrich::descriptors;
use std::fmt::Write as _;

pub const MAX_DATA_SEGMENT_CHARS: usize = 1200;
const SEGMENT_TRUNCATION_MARKER: &str = "...";

// Persona first, data segments next, the user's message last.
pub fn assemble(
    persona: PersonaId,
    profile: UserProfile,
    company: Option<&ResolvedCompany>,
    record: Option<&EnrichedRecord>,
    user_message: &str,
) -> PromptContext {
    let mut segments = vec![persona_segment(persona, profile)];

    if let Some(summary) = record_summary(company, record) {
        segments.push(Segment::system(bound(summary)));
    }
    let allows_risk = PersonaTemplate::get(persona).allows_risk_commentary;
    if let Some(notes) = record.and_then(|r| descriptor_summary(r, allows_risk)) {
        segments.push(Segment::system(bound(notes)));
    }

    segments.push(Segment::user(user_message));
    PromptContext::from_segments(segments)
}

pub fn assemble_batch(
    profile: UserProfile,
    classification: &BatchClassification,
    instruction: &str,
) -> PromptContext {
    PromptContext::from_segments(vec![
        persona_segment(PersonaId::BatchSummarizer, profile),
        Segment::system(classification.render_enumeration()),
        Segment::user(instruction),
    ])
}

fn persona_segment(persona: PersonaId, profile: UserProfile) -> Segment {
    let template = PersonaTemplate::get(persona);
    Segment::system(template.render(&[
        ("profile", profile.label_ko()),
        ("profile_guidance", profile.guidance_ko()),
    ]))
}

fn record_summary(
    company: Option<&ResolvedCompany>,
    record: Option<&EnrichedRecord>,
) -> Option<String> {
    let has_metrics = record.is_some_and(EnrichedRecord::has_metrics);
    if company.is_none() && !has_metrics {
        return None;
    }

    let mut out = String::from("[기업 데이터]\n");

    let name = record
        .and_then(|r| r.name.clone())
        .or_else(|| company.and_then(|c| c.display_name.clone()));
    let symbol = record
        .and_then(|r| r.symbol.clone())
        .or_else(|| company.map(|c| c.key.to_string()));
    match (name, symbol) {
        (Some(n), Some(s)) if n != s => {
            let _ = writeln!(out, "종목: {n} ({s})");
        }
        (Some(n), _) | (None, Some(n)) => {
            let _ = writeln!(out, "종목: {n}");
        }
        (None, None) => {}
    }

    let Some(r) = record.filter(|r| r.has_metrics()) else {
        out.push_str("재무 데이터를 불러오지 못했습니다. 수치를 추측하지 마세요.");
        return Some(out);
    };

    let text_fields = [("업종", &r.sector), ("위험도", &r.risk_level), ("주요 제품", &r.main_products)];
    let numeric_fields = [
        ("PER", r.per, ""),
        ("ROE", r.roe, "%"),
        ("부채비율", r.debt_ratio, "%"),
        ("매출액", r.sales, "조원"),
        ("시가총액", r.market_cap, "조원"),
        ("1년 수익률", r.return_1y, "%"),
        ("3년 수익률", r.return_3y, "%"),
        ("1년 최고 수익률", r.max_return_1y, "%"),
        ("1년 최대 손실률", r.max_loss_1y, "%"),
        ("3년 최고 수익률", r.max_return_3y, "%"),
        ("3년 최대 손실률", r.max_loss_3y, "%"),
    ];

    for (label, value) in text_fields {
        if let Some(v) = value {
            let _ = writeln!(out, "{label}: {v}");
        }
    }
    for (label, value, unit) in numeric_fields {
        if let Some(v) = value {
            let _ = writeln!(out, "{label}: {v:.2}{unit}");
        }
    }

    Some(out.trim_end().to_string())
}

// Personas without risk commentary never see the risk reading.
fn descriptor_summary(record: &EnrichedRecord, allows_risk: bool) -> Option<String> {
    let mut notes = descriptors::describe(record);
    if !allows_risk {
        notes.retain(|d| d.label != descriptors::RISK_LABEL);
    }
    if notes.is_empty() {
        return None;
    }
    let mut out = String::from("[지표 해석]\n");
    for d in notes {
        let _ = writeln!(out, "{}: {}", d.label, d.comment);
    }
    Some(out.trim_end().to_string())
}

fn bound(text: String) -> String {
    match text.char_indices().nth(MAX_DATA_SEGMENT_CHARS) {
        Some((cut, _)) => format!("{}{SEGMENT_TRUNCATION_MARKER}", &text[..cut]),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::company::CompanyKey;
    use crate::domain::prompt::Role;

    fn samsung() -> ResolvedCompany {
        ResolvedCompany {
            key: CompanyKey::new("005930.KS"),
            display_name: Some("삼성전자".into()),
        }
    }

    fn metrics() -> EnrichedRecord {
        EnrichedRecord {
            name: Some("삼성전자".into()),
            symbol: Some("005930.KS".into()),
            per: Some(12.0),
            roe: Some(15.0),
            main_products: Some("메모리 반도체, 스마트폰".into()),
            ..EnrichedRecord::default()
        }
    }

    fn assert_shape(ctx: &PromptContext, user_message: &str) {
        let segs = ctx.segments();
        assert!(segs.len() >= 2);
        assert_eq!(segs[0].role, Role::System);
        assert!(segs[0].content.contains("사용자 투자 성향"));
        let last = segs.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, user_message);
        assert!(segs[..segs.len() - 1].iter().all(|s| s.role == Role::System));
    }

    #[test]
    fn persona_first_and_user_last_for_every_combination() {
        let company = samsung();
        let full = metrics();
        let empty = EnrichedRecord::default();
        let msg = "  삼성전자 어때?  ";
        for persona in [PersonaId::StrategicAdvisor, PersonaId::EducationalExplainer] {
            for c in [None, Some(&company)] {
                for r in [None, Some(&empty), Some(&full)] {
                    let ctx = assemble(persona, UserProfile::default(), c, r, msg);
                    assert_shape(&ctx, msg);
                }
            }
        }
    }

    #[test]
    fn unresolved_message_gets_persona_and_user_only() {
        let ctx = assemble(
            PersonaId::StrategicAdvisor,
            UserProfile::Aggressive,
            None,
            None,
            "요즘 시장 어때?",
        );
        assert_eq!(ctx.segments().len(), 2);
        assert!(ctx.segments()[0].content.contains("공격형"));
    }

    #[test]
    fn resolved_but_empty_record_says_data_missing() {
        let company = samsung();
        let ctx = assemble(
            PersonaId::StrategicAdvisor,
            UserProfile::default(),
            Some(&company),
            Some(&EnrichedRecord::default()),
            "삼성전자 어때?",
        );
        assert_eq!(ctx.segments().len(), 3);
        let data = &ctx.segments()[1].content;
        assert!(data.contains("종목: 삼성전자 (005930.KS)"));
        assert!(data.contains("재무 데이터를 불러오지 못했습니다"));
    }

    #[test]
    fn metrics_and_descriptors_are_separate_segments() {
        let company = samsung();
        let record = metrics();
        let ctx = assemble(
            PersonaId::EducationalExplainer,
            UserProfile::Conservative,
            Some(&company),
            Some(&record),
            "삼성전자 설명해줘",
        );
        let segs = ctx.segments();
        assert_eq!(segs.len(), 4);
        assert!(segs[0].content.contains("📘 [개념 설명]"));
        assert!(segs[1].content.contains("PER: 12.00"));
        assert!(segs[1].content.contains("ROE: 15.00%"));
        assert!(segs[1].content.contains("주요 제품: 메모리 반도체, 스마트폰"));
        assert!(segs[2].content.contains("PER: 저평가"));
        assert!(segs[2].content.contains("ROE: 우수"));
    }

    #[test]
    fn data_segments_are_bounded() {
        let record = EnrichedRecord {
            name: Some("가".repeat(5000)),
            per: Some(1.0),
            ..EnrichedRecord::default()
        };
        let ctx = assemble(
            PersonaId::StrategicAdvisor,
            UserProfile::default(),
            None,
            Some(&record),
            "q",
        );
        let data = &ctx.segments()[1].content;
        assert_eq!(
            data.chars().count(),
            MAX_DATA_SEGMENT_CHARS + SEGMENT_TRUNCATION_MARKER.len()
        );
    }

    #[test]
    fn risk_reading_follows_persona_permission() {
        let record = EnrichedRecord {
            per: Some(30.0),
            risk_level: Some("높음".into()),
            ..EnrichedRecord::default()
        };
        let notes = |persona| {
            let ctx = assemble(persona, UserProfile::default(), None, Some(&record), "q");
            ctx.segments()
                .iter()
                .find(|s| s.content.starts_with("[지표 해석]"))
                .map(|s| s.content.clone())
                .unwrap()
        };

        let advisor = notes(PersonaId::StrategicAdvisor);
        assert!(advisor.contains("위험도: 높음"));
        let explainer = notes(PersonaId::EducationalExplainer);
        assert!(explainer.contains("PER: 고평가"));
        assert!(!explainer.contains("위험도"));
    }
}
