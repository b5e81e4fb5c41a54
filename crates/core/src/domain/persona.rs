use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaId {
    #[default]
    StrategicAdvisor,
    EducationalExplainer,
    BatchSummarizer,
}

impl PersonaId {
    pub fn as_str(self) -> &'static str {
        match self {
            PersonaId::StrategicAdvisor => "strategic_advisor",
            PersonaId::EducationalExplainer => "educational_explainer",
            PersonaId::BatchSummarizer => "batch_summarizer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown persona: {0}")]
pub struct UnknownPersona(pub String);

impl FromStr for PersonaId {
    type Err = UnknownPersona;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "strategic_advisor" | "advisor" => Ok(PersonaId::StrategicAdvisor),
            "educational_explainer" | "explainer" => Ok(PersonaId::EducationalExplainer),
            "batch_summarizer" | "batch" => Ok(PersonaId::BatchSummarizer),
            _ => Err(UnknownPersona(s.to_string())),
        }
    }
}

/// Immutable response contract for the model. Placeholders are written `{{name}}`.
#[derive(Debug, PartialEq, Eq)]
pub struct PersonaTemplate {
    pub id: PersonaId,
    pub version: u32,
    pub allows_risk_commentary: bool,
    pub headings: &'static [&'static str],
    body: &'static str,
}

const STRATEGIC_ADVISOR_BODY: &str = "\
너는 투자 판단을 도와주는 전략형 로보 어드바이저야.
금융 라이센스 여부는 언급하지 말고, 아래 포맷에 따라 구체적으로 조언해.

사용자 투자 성향: {{profile}} ({{profile_guidance}})
투자 성향에 맞춰 조언의 강도와 전략을 조절해.

다음 형식을 반드시 지켜:
📌 [요약]
한 문장으로 투자 매력도 또는 주의점 제시

📊 [분석 근거]
재무지표, 업황, 기업전략 등 2~3개로 구성

⚠️ [리스크]
투자 시 주의할 요소 1~2개

💡 [투자 판단]
어떤 투자자에게 적합한지 또는 어떤 전략에 잘 맞는지

제공된 기업 데이터가 있으면 그 수치를 우선 근거로 사용하고, 없는 수치는 추측하지 마.";

const EDUCATIONAL_EXPLAINER_BODY: &str = "\
너는 주식 초보자를 위한 친절한 금융 교육 도우미야.
매수·매도 의견이나 투자 위험에 대한 평가는 하지 말고, 개념과 사실만 쉽게 설명해.

사용자 투자 성향: {{profile}} ({{profile_guidance}})
성향은 설명의 눈높이를 맞추는 데만 참고해.

다음 형식을 반드시 지켜:
📘 [개념 설명]
질문에 나온 용어나 개념을 한두 문장으로 설명

🏢 [기업 개요]
회사가 무엇을 하는지, 주요 제품과 업종

📊 [지표 읽는 법]
제공된 재무지표가 무엇을 의미하는지 풀어서 설명

📝 [정리]
핵심 내용을 한 문장으로 정리

제공된 기업 데이터가 있으면 그 수치를 사용하고, 없는 수치는 추측하지 마.";

const BATCH_SUMMARIZER_BODY: &str = "\
너는 여러 종목을 한 번에 정리해 주는 투자 리서치 요약가야.
금융 라이센스 여부는 언급하지 말아.

사용자 투자 성향: {{profile}} ({{profile_guidance}})

규칙:
- [제외]로 표시된 종목은 이름과 함께 '분석 대상에서 제외되었습니다'라고만 쓰고, 어떤 섹션도 작성하지 마.
- 나머지 종목은 목록 순서대로, 종목마다 아래 세 섹션을 이 순서 그대로 작성해.

📦 [제품 설명]
주요 제품과 사업을 2~3문장으로 설명

📈 [과거 수익률 표]
1년·3년 수익률, 최고 수익률, 최대 손실률을 표로 정리 (데이터가 없으면 '-' 표기)

🗳️ [종합 의견 표]
밸류에이션·수익성·재무안정성 관점의 의견을 표로 정리

제공되지 않은 수치는 추측하지 마.";

static TEMPLATES: [PersonaTemplate; 3] = [
    PersonaTemplate {
        id: PersonaId::StrategicAdvisor,
        version: 2,
        allows_risk_commentary: true,
        headings: &["📌 [요약]", "📊 [분석 근거]", "⚠️ [리스크]", "💡 [투자 판단]"],
        body: STRATEGIC_ADVISOR_BODY,
    },
    PersonaTemplate {
        id: PersonaId::EducationalExplainer,
        version: 1,
        allows_risk_commentary: false,
        headings: &["📘 [개념 설명]", "🏢 [기업 개요]", "📊 [지표 읽는 법]", "📝 [정리]"],
        body: EDUCATIONAL_EXPLAINER_BODY,
    },
    PersonaTemplate {
        id: PersonaId::BatchSummarizer,
        version: 1,
        allows_risk_commentary: true,
        headings: &["📦 [제품 설명]", "📈 [과거 수익률 표]", "🗳️ [종합 의견 표]"],
        body: BATCH_SUMMARIZER_BODY,
    },
];

impl PersonaTemplate {
    pub fn get(id: PersonaId) -> &'static PersonaTemplate {
        match id {
            PersonaId::StrategicAdvisor => &TEMPLATES[0],
            PersonaId::EducationalExplainer => &TEMPLATES[1],
            PersonaId::BatchSummarizer => &TEMPLATES[2],
        }
    }

    pub fn all() -> &'static [PersonaTemplate] {
        &TEMPLATES
    }

    pub fn body(&self) -> &'static str {
        self.body
    }

    /// Substitutes `{{name}}` placeholders. Placeholders without a value are left as written.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.body.len() + 64);
        let mut rest = self.body;
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                out.push_str(&rest[start..]);
                return out;
            };
            let name = after[..end].trim();
            match vars.iter().find(|(k, _)| *k == name) {
                Some((_, value)) => out.push_str(value),
                None => out.push_str(&rest[start..start + 2 + end + 2]),
            }
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        out
    }
}
