use crate::domain::company::{CompanyKey, ResolvedCompany};
use regex::Regex;
use std::sync::LazyLock;

pub const PRIMARY_MARKET_SUFFIX: &str = "KS";
pub const KNOWN_MARKET_SUFFIXES: [&str; 2] = ["KS", "KQ"];

static NUMERIC_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9])([0-9]{5,6})(?:\.([A-Za-z]{2}))?(?:$|[^0-9A-Za-z])")
        .expect("valid numeric code regex")
});

// Maximal runs of ASCII letters, digits and dots; filtered down to symbol-shaped tokens.
static ALNUM_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9.]+").expect("valid alphanumeric run regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub alias: String,
    pub symbol: String,
    pub display_name: String,
}

impl Alias {
    pub fn new(alias: &str, symbol: &str, display_name: &str) -> Self {
        Self {
            alias: alias.to_string(),
            symbol: symbol.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

pub fn default_aliases() -> Vec<Alias> {
    [
        ("삼성전자", "005930.KS", "삼성전자"),
        ("SK하이닉스", "000660.KS", "SK하이닉스"),
        ("하이닉스", "000660.KS", "SK하이닉스"),
        ("LG에너지솔루션", "373220.KS", "LG에너지솔루션"),
        ("삼성바이오로직스", "207940.KS", "삼성바이오로직스"),
        ("현대차", "005380.KS", "현대차"),
        ("현대자동차", "005380.KS", "현대차"),
        ("기아", "000270.KS", "기아"),
        ("셀트리온", "068270.KS", "셀트리온"),
        ("NAVER", "035420.KS", "NAVER"),
        ("네이버", "035420.KS", "NAVER"),
        ("카카오", "035720.KS", "카카오"),
        ("LG화학", "051910.KS", "LG화학"),
        ("POSCO홀딩스", "005490.KS", "POSCO홀딩스"),
        ("포스코홀딩스", "005490.KS", "POSCO홀딩스"),
        ("에코프로비엠", "247540.KQ", "에코프로비엠"),
        ("에코프로", "086520.KQ", "에코프로"),
    ]
    .into_iter()
    .map(|(a, s, n)| Alias::new(a, s, n))
    .collect()
}

#[derive(Debug, Clone)]
pub struct IdentifierResolver {
    // Longest alias first so that a longer name is never shadowed by its prefix.
    aliases: Vec<Alias>,
}

impl Default for IdentifierResolver {
    fn default() -> Self {
        Self::new(default_aliases())
    }
}

impl IdentifierResolver {
    pub fn new(mut aliases: Vec<Alias>) -> Self {
        aliases.retain(|a| !a.alias.is_empty());
        aliases.sort_by(|a, b| {
            b.alias
                .chars()
                .count()
                .cmp(&a.alias.chars().count())
                .then_with(|| a.alias.cmp(&b.alias))
        });
        Self { aliases }
    }

    pub fn resolve(&self, text: &str) -> Option<ResolvedCompany> {
        if let Some(hit) = self.match_alias(text) {
            tracing::debug!(alias = %hit.alias, symbol = %hit.symbol, "resolved via alias table");
            return Some(ResolvedCompany {
                key: CompanyKey::new(hit.symbol.clone()),
                display_name: Some(hit.display_name.clone()),
            });
        }

        if let Some(symbol) = match_numeric_code(text) {
            tracing::debug!(%symbol, "resolved via numeric code");
            return Some(ResolvedCompany {
                key: CompanyKey::new(symbol),
                display_name: None,
            });
        }

        if let Some(symbol) = match_alpha_symbol(text) {
            tracing::debug!(%symbol, "resolved via alphabetic symbol");
            return Some(ResolvedCompany {
                key: CompanyKey::new(symbol),
                display_name: None,
            });
        }

        None
    }

    fn match_alias(&self, text: &str) -> Option<&Alias> {
        self.aliases.iter().find(|a| text.contains(a.alias.as_str()))
    }
}

fn match_numeric_code(text: &str) -> Option<String> {
    let caps = NUMERIC_CODE_RE.captures(text)?;
    let code = caps.get(1)?.as_str();
    let suffix = caps
        .get(2)
        .map(|m| m.as_str().to_ascii_uppercase())
        .filter(|s| KNOWN_MARKET_SUFFIXES.contains(&s.as_str()))
        .unwrap_or_else(|| PRIMARY_MARKET_SUFFIX.to_string());
    Some(format!("{code}.{suffix}"))
}

fn match_alpha_symbol(text: &str) -> Option<String> {
    let tokens: Vec<&str> = ALNUM_RUN_RE
        .find_iter(text)
        .map(|m| m.as_str().trim_matches('.'))
        .filter(|t| is_symbol_shaped(t))
        .collect();

    let preferred = tokens
        .iter()
        .find(|t| t.chars().all(|c| c.is_ascii_uppercase() || c == '.'))
        .or_else(|| tokens.first())?;

    Some(preferred.to_ascii_uppercase())
}

fn is_symbol_shaped(token: &str) -> bool {
    (2..=10).contains(&token.len())
        && token.starts_with(|c: char| c.is_ascii_alphabetic())
        && token.chars().all(|c| c.is_ascii_alphabetic() || c == '.')
}
