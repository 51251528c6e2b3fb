use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    Gaming,
    Work,
    Student,
    Video,
    Portable,
}

impl UsageKind {
    pub const ALL: [UsageKind; 5] =
        [Self::Gaming, Self::Work, Self::Student, Self::Video, Self::Portable];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gaming => "gaming",
            Self::Work => "work",
            Self::Student => "student",
            Self::Video => "video",
            Self::Portable => "portable",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Gaming => "gaming",
            Self::Work => "work/coding",
            Self::Student => "student",
            Self::Video => "video editing",
            Self::Portable => "portability",
        }
    }
}

impl std::str::FromStr for UsageKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.as_str() == normalized).ok_or_else(|| {
            DomainError::UnknownValue { kind: "usage", value: value.to_string() }
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Value,
    Performance,
    Portable,
    Latest,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Performance => "performance",
            Self::Portable => "portable",
            Self::Latest => "latest",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "value" => Ok(Self::Value),
            "performance" => Ok(Self::Performance),
            "portable" => Ok(Self::Portable),
            "latest" => Ok(Self::Latest),
            _ => Err(DomainError::UnknownValue { kind: "priority", value: value.to_string() }),
        }
    }
}

/// Inclusive price range in won.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Budget {
    pub min: i64,
    pub max: i64,
}

impl Budget {
    pub fn new(min: i64, max: i64) -> Result<Self, DomainError> {
        let budget = Self { min, max };
        budget.validate()?;
        Ok(budget)
    }

    pub fn contains(&self, price: i64) -> bool {
        price >= self.min && price <= self.max
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.min < 0 {
            return Err(DomainError::InvalidQuery("budget.min must not be negative".to_string()));
        }
        if self.min > self.max {
            return Err(DomainError::InvalidQuery(
                "budget.min must not exceed budget.max".to_string(),
            ));
        }
        Ok(())
    }
}

/// Buyer's recommendation query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecommendRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
    #[serde(default)]
    pub usage: Vec<UsageKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl RecommendRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(budget) = &self.budget {
            budget.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Budget, Priority, RecommendRequest, UsageKind};
    use crate::errors::DomainError;

    #[test]
    fn usage_and_priority_parse_case_insensitively() {
        assert_eq!("Gaming".parse::<UsageKind>(), Ok(UsageKind::Gaming));
        assert_eq!(" portable ".parse::<Priority>(), Ok(Priority::Portable));
    }

    #[test]
    fn unknown_usage_is_a_domain_error() {
        assert_eq!(
            "mining".parse::<UsageKind>(),
            Err(DomainError::UnknownValue { kind: "usage", value: "mining".to_string() })
        );
    }

    #[test]
    fn inverted_budget_is_rejected() {
        assert!(Budget::new(2_000_000, 1_000_000).is_err());
        let budget = Budget::new(1_000_000, 2_000_000).expect("valid budget");
        assert!(budget.contains(1_000_000));
        assert!(budget.contains(2_000_000));
        assert!(!budget.contains(2_000_001));
    }

    #[test]
    fn request_deserializes_with_missing_fields() {
        let request: RecommendRequest =
            serde_json::from_str(r#"{"usage":["gaming","video"]}"#).expect("request json");
        assert_eq!(request.usage, vec![UsageKind::Gaming, UsageKind::Video]);
        assert!(request.budget.is_none());
        assert!(request.priority.is_none());
        assert!(request.validate().is_ok());
    }
}
