//! Rule engine module: pattern classification, conflict graph, ordering
//!
//! This module provides:
//! - Path segment classification and pairwise priority comparison
//! - Rule parsing and whole-pattern comparison
//! - The active rule set (conflict graph) with merge, delete and
//!   deterministic topological ordering
//!
//! # Architecture
//!
//! Rule patterns are `/`-rooted paths whose segments may be literals,
//! single-`*` wildcards, `*` / `**` segments, or bracketed tokens resolved
//! through a [`crate::tokens::TokenResolver`]. Comparing two rules yields a
//! [`RuleComparison`]; priority verdicts become blocking edges in a
//! [`RuleSet`], and the emission order is the alphabetically tie-broken
//! topological order of that graph. A first-match-wins proxy fed that order
//! behaves deterministically: more specific rules always precede the
//! broader rules they shadow.
//!
//! # Example
//!
//! ```
//! use route_control::rules::{Rule, RuleSet};
//! use route_control::tokens::TokenDictionary;
//! use std::sync::Arc;
//!
//! let tokens = TokenDictionary::from_entries([("make", "audi|bmw|vw")]).unwrap();
//!
//! let base = RuleSet::from_trusted([
//!     Arc::new(Rule::parse("shop-v1".into(), "10.0.0.2:80", "/", &tokens).unwrap()),
//!     Arc::new(Rule::parse("shop-v1".into(), "10.0.0.2:80", "/app/**", &tokens).unwrap()),
//! ]);
//!
//! // A more specific rule from another application blocks the broad one
//! let batch = vec![
//!     Arc::new(Rule::parse("assets-v2".into(), "10.0.0.9:80", "/app/a*", &tokens).unwrap()),
//! ];
//! let merged = base.merge_rules(&batch).unwrap();
//!
//! let ordered = merged.order_rules().unwrap();
//! let patterns: Vec<&str> = ordered.iter().map(|r| r.pattern()).collect();
//! assert_eq!(patterns, vec!["/", "/app/a*", "/app/**"]);
//! ```

pub mod rule;
pub mod ruleset;
pub mod segment;
pub mod types;

// Re-exports
pub use rule::Rule;
pub use ruleset::RuleSet;
pub use segment::{PathSegment, SegmentKind};
pub use types::{BlockedRule, InvalidRule, OwnerId, RuleComparison, RuleKey};
