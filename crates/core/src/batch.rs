use crate::domain::persona::{PersonaId, PersonaTemplate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;

const MAX_FIELD_CHARS: usize = 300;
const MAX_FIELDS_PER_COMPANY: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct ExclusionPolicy {
    pub flag_fields: Vec<String>,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self {
            flag_fields: ["distressed", "is_distressed", "관리종목"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl ExclusionPolicy {
    pub fn excludes(&self, descriptor: &CompanyDescriptor) -> bool {
        self.flag_fields
            .iter()
            .filter_map(|f| descriptor.fields.get(f))
            .any(is_truthy)
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "y" | "yes" | "1" | "o" | "예"
        ),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedEntry {
    pub descriptor: CompanyDescriptor,
    pub eligible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchClassification {
    entries: Vec<ClassifiedEntry>,
    flag_fields: Vec<String>,
}

pub fn classify(descriptors: Vec<CompanyDescriptor>, policy: &ExclusionPolicy) -> BatchClassification {
    let entries = descriptors
        .into_iter()
        .map(|descriptor| {
            let eligible = !policy.excludes(&descriptor);
            if !eligible {
                tracing::debug!(name = %descriptor.name, "company excluded from batch");
            }
            ClassifiedEntry {
                descriptor,
                eligible,
            }
        })
        .collect();

    BatchClassification {
        entries,
        flag_fields: policy.flag_fields.clone(),
    }
}

impl BatchClassification {
    /// All entries, in input order.
    pub fn entries(&self) -> &[ClassifiedEntry] {
        &self.entries
    }

    pub fn eligible(&self) -> impl Iterator<Item = &ClassifiedEntry> {
        self.entries.iter().filter(|e| e.eligible)
    }

    pub fn excluded(&self) -> impl Iterator<Item = &ClassifiedEntry> {
        self.entries.iter().filter(|e| !e.eligible)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Numbered list of every company for the batch data segment.
    pub fn render_enumeration(&self) -> String {
        let sections = PersonaTemplate::get(PersonaId::BatchSummarizer)
            .headings
            .join(" → ");

        let mut out = String::from("[종목 목록]\n");
        let _ = writeln!(
            out,
            "총 {}개 (분석 대상 {}개, 제외 {}개)",
            self.len(),
            self.eligible().count(),
            self.excluded().count()
        );

        for (idx, entry) in self.entries.iter().enumerate() {
            let n = idx + 1;
            let name = entry.descriptor.name.trim();
            if !entry.eligible {
                let _ = writeln!(out, "{n}. {name} [제외] 이름만 언급하고 어떤 섹션도 작성하지 말 것");
                continue;
            }

            let _ = writeln!(out, "{n}. {name}");
            let fields: Vec<_> = entry
                .descriptor
                .fields
                .iter()
                .filter(|(key, _)| !self.flag_fields.iter().any(|f| f == *key))
                .collect();
            for (key, value) in fields.iter().take(MAX_FIELDS_PER_COMPANY) {
                let _ = writeln!(out, "   - {key}: {}", field_text(value));
            }
            if fields.len() > MAX_FIELDS_PER_COMPANY {
                let omitted = fields.len() - MAX_FIELDS_PER_COMPANY;
                let _ = writeln!(out, "   - (외 {omitted}개 항목 생략)");
            }
            let _ = writeln!(out, "   섹션: {sections}");
        }

        out.trim_end().to_string()
    }
}

fn field_text(v: &Value) -> String {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    };
    match s.char_indices().nth(MAX_FIELD_CHARS) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s,
    }
}
