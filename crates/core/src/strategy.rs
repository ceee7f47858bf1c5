use serde::{Deserialize, Serialize};
use std::fmt;

/// Score at or above which the feed goes deeper into the current topic.
pub const DEEPER_THRESHOLD: f64 = 0.65;
/// Score at or above which the feed branches into adjacent fields.
pub const BRANCH_THRESHOLD: f64 = 0.35;

/// How the next batch of content explores the topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Mechanism-level detail building on what was already read.
    Deeper,
    /// Connections to adjacent fields.
    Branch,
    /// Lighter, novel content on a different subject.
    Pivot,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Deeper, Strategy::Branch, Strategy::Pivot];

    /// Maps an engagement score to a strategy. Lower bounds are inclusive.
    pub fn select(engagement_score: f64) -> Self {
        if engagement_score >= DEEPER_THRESHOLD {
            Strategy::Deeper
        } else if engagement_score >= BRANCH_THRESHOLD {
            Strategy::Branch
        } else {
            Strategy::Pivot
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Deeper => "deeper",
            Strategy::Branch => "branch",
            Strategy::Pivot => "pivot",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds() {
        assert_eq!(Strategy::select(1.0), Strategy::Deeper);
        assert_eq!(Strategy::select(0.65), Strategy::Deeper);
        assert_eq!(Strategy::select(0.649999), Strategy::Branch);
        assert_eq!(Strategy::select(0.5), Strategy::Branch);
        assert_eq!(Strategy::select(0.35), Strategy::Branch);
        assert_eq!(Strategy::select(0.349999), Strategy::Pivot);
        assert_eq!(Strategy::select(0.0), Strategy::Pivot);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&Strategy::Deeper).unwrap(), "\"deeper\"");
        let parsed: Strategy = serde_json::from_str("\"pivot\"").unwrap();
        assert_eq!(parsed, Strategy::Pivot);
        assert_eq!(Strategy::parse("branch"), Some(Strategy::Branch));
        assert_eq!(Strategy::parse("sideways"), None);
        assert_eq!(Strategy::Branch.to_string(), "branch");
    }
}
