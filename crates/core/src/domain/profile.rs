use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Risk/horizon preference held for the lifetime of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserProfile {
    Conservative,
    #[default]
    Balanced,
    Aggressive,
}

impl UserProfile {
    pub fn label_ko(self) -> &'static str {
        match self {
            UserProfile::Conservative => "안정형",
            UserProfile::Balanced => "중립형",
            UserProfile::Aggressive => "공격형",
        }
    }

    pub fn guidance_ko(self) -> &'static str {
        match self {
            UserProfile::Conservative => "원금 보전과 변동성 관리를 가장 중시하는 장기 투자자",
            UserProfile::Balanced => "수익과 위험의 균형을 추구하는 중기 투자자",
            UserProfile::Aggressive => "높은 변동성을 감수하고 성장 수익을 노리는 단기~중기 투자자",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown user profile: {0}")]
pub struct UnknownProfile(pub String);

impl FromStr for UserProfile {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" | "안정형" => Ok(UserProfile::Conservative),
            "balanced" | "neutral" | "중립형" => Ok(UserProfile::Balanced),
            "aggressive" | "공격형" => Ok(UserProfile::Aggressive),
            _ => Err(UnknownProfile(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_english_and_korean_labels() {
        assert_eq!("Aggressive".parse::<UserProfile>().unwrap(), UserProfile::Aggressive);
        assert_eq!("안정형".parse::<UserProfile>().unwrap(), UserProfile::Conservative);
        assert!("yolo".parse::<UserProfile>().is_err());
    }

    #[test]
    fn default_is_balanced() {
        assert_eq!(UserProfile::default(), UserProfile::Balanced);
        assert_eq!(
            serde_json::to_value(UserProfile::Balanced).unwrap(),
            serde_json::json!("balanced")
        );
    }
}
