//! Core identity and diagnostic types for the rule engine
//!
//! This module defines the fundamental vocabulary shared by the rule engine:
//! - [`RuleComparison`]: the five-valued result of any pairwise comparison
//! - [`OwnerId`]: opaque identity of an application version
//! - [`RuleKey`]: the `(pattern, owner)` identity of a rule in the conflict
//!   graph
//! - [`BlockedRule`] / [`InvalidRule`]: diagnostic projections

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::rule::Rule;

/// Result of comparing two rules or two path segments.
///
/// `HigherPriority` means the left-hand side must be evaluated before, and
/// can therefore shadow, the right-hand side in a first-match-wins proxy.
/// `Overlap` means the relative order cannot be determined; it is the
/// conflict signal. `Distinct` means the two never match the same request,
/// so no ordering constraint is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleComparison {
    /// Both sides match exactly the same requests
    Identical,

    /// The two sides can never match the same request
    Distinct,

    /// The left-hand side is more specific and must be emitted first
    HigherPriority,

    /// The right-hand side is more specific and must be emitted first
    LowerPriority,

    /// Relative priority cannot be determined; treated as a conflict
    Overlap,
}

impl RuleComparison {
    /// Check if this outcome establishes an ordering edge
    #[must_use]
    pub const fn is_ordering(&self) -> bool {
        matches!(self, Self::HigherPriority | Self::LowerPriority)
    }

    /// Check if this outcome is a conflict (no consistent order exists)
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Identical | Self::Overlap)
    }
}

impl fmt::Display for RuleComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identical => write!(f, "identical"),
            Self::Distinct => write!(f, "distinct"),
            Self::HigherPriority => write!(f, "higher-priority"),
            Self::LowerPriority => write!(f, "lower-priority"),
            Self::Overlap => write!(f, "overlap"),
        }
    }
}

/// Opaque identity of the application version that owns a rule.
///
/// Owner ids are stable across rebuilds, ordered, and hashable. The engine
/// never interprets their contents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Create a new owner id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for OwnerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identity of a rule in the conflict graph.
///
/// Two rules from different owners with identical pattern text are distinct
/// entities, so the key carries both. The derived ordering compares the
/// pattern first: ordered containers of `RuleKey` therefore iterate in
/// ascending alphabetic pattern order, which is the tie-break order required
/// for deterministic rule emission.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleKey {
    pattern: String,
    owner: OwnerId,
}

impl RuleKey {
    /// Create a new rule key
    pub fn new(owner: OwnerId, pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            owner,
        }
    }

    /// Get the pattern text
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Get the owning application id
    #[must_use]
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.owner, self.pattern)
    }
}

/// A rule together with the live set of rules currently blocking it.
///
/// Reporting-only projection recomputed on demand from the conflict graph;
/// it never feeds back into merging or ordering.
#[derive(Debug, Clone)]
pub struct BlockedRule {
    /// The rule waiting for its blockers to be emitted
    pub rule: Arc<Rule>,

    /// The rules that must be emitted before it, in alphabetic order
    pub blocked_by: Vec<Arc<Rule>>,
}

impl fmt::Display for BlockedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} blocked by [", self.rule.key())?;
        for (i, blocker) in self.blocked_by.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", blocker.key())?;
        }
        write!(f, "]")
    }
}

/// A raw pattern string that failed to parse into a [`Rule`].
///
/// Retained for diagnostics only; the owning application's other rules are
/// still attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidRule {
    /// The application that submitted the pattern
    pub owner: OwnerId,

    /// The raw pattern text as submitted
    pub pattern: String,

    /// Human-readable parse failure reason
    pub reason: String,
}

impl fmt::Display for InvalidRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.owner, self.pattern, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_classification() {
        assert!(RuleComparison::HigherPriority.is_ordering());
        assert!(RuleComparison::LowerPriority.is_ordering());
        assert!(!RuleComparison::Distinct.is_ordering());

        assert!(RuleComparison::Identical.is_conflict());
        assert!(RuleComparison::Overlap.is_conflict());
        assert!(!RuleComparison::HigherPriority.is_conflict());
        assert!(!RuleComparison::Distinct.is_conflict());
    }

    #[test]
    fn test_comparison_display() {
        assert_eq!(RuleComparison::Identical.to_string(), "identical");
        assert_eq!(RuleComparison::Overlap.to_string(), "overlap");
        assert_eq!(
            RuleComparison::HigherPriority.to_string(),
            "higher-priority"
        );
    }

    #[test]
    fn test_owner_id_ordering() {
        let a = OwnerId::from("app-v1");
        let b = OwnerId::from("app-v2");
        assert!(a < b);
        assert_eq!(a, OwnerId::new("app-v1"));
        assert_eq!(a.to_string(), "app-v1");
    }

    #[test]
    fn test_rule_key_orders_by_pattern_first() {
        let a = RuleKey::new(OwnerId::from("zzz"), "/aaa/**");
        let b = RuleKey::new(OwnerId::from("aaa"), "/zzz/**");
        // Pattern dominates the ordering even though the owners sort the
        // other way
        assert!(a < b);
    }

    #[test]
    fn test_rule_key_display() {
        let key = RuleKey::new(OwnerId::from("web-v3"), "/app/**");
        assert_eq!(key.to_string(), "web-v3:/app/**");
    }

    #[test]
    fn test_owner_id_serde() {
        let owner = OwnerId::from("web-v1");
        let json = serde_json::to_string(&owner).unwrap();
        assert_eq!(json, "\"web-v1\"");

        let parsed: OwnerId = serde_json::from_str("\"web-v2\"").unwrap();
        assert_eq!(parsed, OwnerId::from("web-v2"));
    }
}
