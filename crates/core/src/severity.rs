use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Severity attached to a rule inside a rule set.
///
/// Variants are declared in ascending order, so the derived `Ord` is the
/// aggregation order: `Info < Low < Medium < High < VeryHigh < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    VeryHigh,
    Critical,
}

impl Severity {
    /// Every severity in ascending order.
    pub const ALL: [Self; 6] = [
        Self::Info,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::VeryHigh,
        Self::Critical,
    ];

    /// Return the `SCREAMING_SNAKE_CASE` representation (matches serde).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::VeryHigh => "VERY_HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown severity: {s}"))
    }
}
