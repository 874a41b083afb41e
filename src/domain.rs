//! Skill domains and their persona announcements

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Topical focus of the assistant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SkillDomain {
    DataScience,
    Business,
    #[default]
    Both,
}

impl SkillDomain {
    pub const ALL: [SkillDomain; 3] = [Self::DataScience, Self::Business, Self::Both];

    /// Wire name, as sent to the server and stored on books
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataScience => "data-science",
            Self::Business => "business",
            Self::Both => "both",
        }
    }

    /// Human-readable name of the focus area
    pub fn label(&self) -> &'static str {
        match self {
            Self::DataScience => "Data Science",
            Self::Business => "Business",
            Self::Both => "Data Science and Business",
        }
    }

    /// Announcement shown locally when the persona switches to this domain
    pub fn persona_message(&self) -> &'static str {
        match self {
            Self::DataScience => "I'll now focus on helping you with Data Science skills.",
            Self::Business => "I'll now focus on helping you with Business skills.",
            Self::Both => "I'll now focus on helping you with Data Science and Business skills.",
        }
    }
}

impl std::fmt::Display for SkillDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SkillDomain {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "data-science" | "data_science" | "datascience" | "ds" => Ok(Self::DataScience),
            "business" | "biz" => Ok(Self::Business),
            "both" => Ok(Self::Both),
            other => Err(format!(
                "unknown skill domain '{}' (expected data-science, business or both)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_both() {
        assert_eq!(SkillDomain::default(), SkillDomain::Both);
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&SkillDomain::DataScience).unwrap();
        assert_eq!(json, "\"data-science\"");
        let parsed: SkillDomain = serde_json::from_str("\"business\"").unwrap();
        assert_eq!(parsed, SkillDomain::Business);
    }

    #[test]
    fn test_parse_shorthands() {
        assert_eq!("ds".parse::<SkillDomain>().unwrap(), SkillDomain::DataScience);
        assert_eq!(" Business ".parse::<SkillDomain>().unwrap(), SkillDomain::Business);
        assert!("marketing".parse::<SkillDomain>().is_err());
    }

    #[test]
    fn test_persona_messages_are_distinct() {
        let ds = SkillDomain::DataScience.persona_message();
        let biz = SkillDomain::Business.persona_message();
        let both = SkillDomain::Both.persona_message();
        assert_ne!(ds, biz);
        assert_ne!(biz, both);
        assert!(both.contains("Data Science and Business"));
    }

    #[test]
    fn test_persona_message_names_label() {
        for domain in SkillDomain::ALL {
            assert_eq!(
                domain.persona_message(),
                format!("I'll now focus on helping you with {} skills.", domain.label())
            );
        }
    }
}
