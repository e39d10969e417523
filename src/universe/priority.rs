// src/universe/priority.rs

use std::fmt;
use std::str::FromStr;

/// How essential a version is to a working base system
///
/// Ordered strictest first, so `Required < Important < Standard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Required,
    Important,
    Standard,
    Optional,
    Extra,
}

impl Priority {
    pub fn as_str(&self) -> &str {
        match self {
            Priority::Required => "required",
            Priority::Important => "important",
            Priority::Standard => "standard",
            Priority::Optional => "optional",
            Priority::Extra => "extra",
        }
    }

    /// Priority of a control field; absent or unknown values are optional
    pub fn from_field(field: Option<&str>) -> Self {
        field
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(Priority::Optional)
    }

    /// Whether this tier is at or above `reference`
    pub fn is_at_least(&self, reference: Priority) -> bool {
        *self <= reference
    }

    /// Weight used when ranking packages during conflict resolution
    pub fn score(&self) -> i64 {
        match self {
            Priority::Required => 3,
            Priority::Important => 2,
            Priority::Standard => 1,
            Priority::Optional => -1,
            Priority::Extra => -2,
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "required" => Ok(Priority::Required),
            "important" => Ok(Priority::Important),
            "standard" => Ok(Priority::Standard),
            "optional" => Ok(Priority::Optional),
            "extra" => Ok(Priority::Extra),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Required.is_at_least(Priority::Standard));
        assert!(Priority::Standard.is_at_least(Priority::Standard));
        assert!(!Priority::Optional.is_at_least(Priority::Standard));
        assert!(!Priority::Important.is_at_least(Priority::Required));
    }

    #[test]
    fn test_priority_score_follows_tier_order() {
        assert!(Priority::Required.score() > Priority::Important.score());
        assert!(Priority::Important.score() > Priority::Standard.score());
        assert!(Priority::Standard.score() > Priority::Optional.score());
        assert!(Priority::Optional.score() > Priority::Extra.score());
    }

    #[test]
    fn test_priority_from_field() {
        assert_eq!(Priority::from_field(Some("important")), Priority::Important);
        assert_eq!(Priority::from_field(Some("bogus")), Priority::Optional);
        assert_eq!(Priority::from_field(None), Priority::Optional);
    }
}
