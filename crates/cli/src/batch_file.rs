use advisor_core::batch::CompanyDescriptor;
use advisor_core::pipeline::BatchRequest;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

/// Accepts either a bare array of companies or a full `{companies, message}` request.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BatchFile {
    Companies(Vec<CompanyDescriptor>),
    Request(BatchRequest),
}

pub fn parse(text: &str, message: Option<String>) -> anyhow::Result<BatchRequest> {
    let file = serde_json::from_str::<BatchFile>(text)
        .context("batch file must be a JSON array of companies or {\"companies\": [...]}")?;

    let mut req = match file {
        BatchFile::Companies(companies) => BatchRequest {
            companies,
            message: None,
        },
        BatchFile::Request(req) => req,
    };
    if message.is_some() {
        req.message = message;
    }
    Ok(req)
}

pub fn read(path: &Path, message: Option<String>) -> anyhow::Result<BatchRequest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read batch file {}", path.display()))?;
    parse(&text, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_array() {
        let req = parse(r#"[{"name": "삼성전자"}, {"name": "카카오", "distressed": true}]"#, None).unwrap();
        assert_eq!(req.companies.len(), 2);
        assert_eq!(req.companies[1].name, "카카오");
        assert_eq!(req.message, None);
    }

    #[test]
    fn cli_message_overrides_file_message() {
        let text = r#"{"companies": [{"name": "NAVER"}], "message": "짧게"}"#;
        assert_eq!(parse(text, None).unwrap().message.as_deref(), Some("짧게"));
        let req = parse(text, Some("표로 정리".into())).unwrap();
        assert_eq!(req.message.as_deref(), Some("표로 정리"));
    }

    #[test]
    fn rejects_unnamed_companies() {
        assert!(parse(r#"[{"sector": "반도체"}]"#, None).is_err());
    }
}
