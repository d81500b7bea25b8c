//! Core types shared by every check.

use serde::{Deserialize, Serialize};

/// Severity level of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::High => "HIGH",
            Level::Medium => "MEDIUM",
            Level::Low => "LOW",
        }
    }

    /// Numeric weight used by aggregating frameworks (HIGH=3, MEDIUM=2, LOW=1).
    pub fn weight(&self) -> u32 {
        match self {
            Level::High => 3,
            Level::Medium => 2,
            Level::Low => 1,
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::High
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HIGH" => Ok(Level::High),
            "MEDIUM" => Ok(Level::Medium),
            "LOW" => Ok(Level::Low),
            _ => Err(format!("unknown level: {}", s)),
        }
    }
}

/// Check families the registry searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// Checks invoked on a file path.
    File,
    /// Checks invoked on an open dataset.
    Dataset,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::File => "file",
            Family::Dataset => "dataset",
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw outcome of a scoring routine, before level and short name are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    pub achieved: u32,
    pub out_of: u32,
    pub messages: Vec<String>,
}

impl Score {
    pub fn new(achieved: u32, out_of: u32, messages: Vec<String>) -> Self {
        Self {
            achieved,
            out_of,
            messages,
        }
    }

    /// Full marks and no messages.
    pub fn full(out_of: u32) -> Self {
        Self::new(out_of, out_of, Vec::new())
    }
}

/// The scored result of invoking a check on one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub level: Level,
    pub achieved: u32,
    pub out_of: u32,
    pub short_name: String,
    /// Failure messages; empty on full success.
    #[serde(default)]
    pub messages: Vec<String>,
}

impl CheckResult {
    /// The `(achieved, out_of)` pair.
    pub fn value(&self) -> (u32, u32) {
        (self.achieved, self.out_of)
    }

    pub fn is_full(&self) -> bool {
        self.achieved == self.out_of
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse_case_insensitive() {
        assert_eq!("high".parse::<Level>(), Ok(Level::High));
        assert_eq!("Medium".parse::<Level>(), Ok(Level::Medium));
        assert_eq!("LOW".parse::<Level>(), Ok(Level::Low));
        assert!("urgent".parse::<Level>().is_err());
    }

    #[test]
    fn test_level_serde_uppercase() {
        let json = serde_json::to_string(&Level::Medium).unwrap();
        assert_eq!(json, "\"MEDIUM\"");
        let level: Level = serde_json::from_str("\"LOW\"").unwrap();
        assert_eq!(level, Level::Low);
    }

    #[test]
    fn test_level_weight_ordering() {
        assert!(Level::High.weight() > Level::Medium.weight());
        assert!(Level::Medium.weight() > Level::Low.weight());
        assert!(Level::High > Level::Low);
    }
}
