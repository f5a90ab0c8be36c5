//! The active rule set: a conflict graph with deterministic ordering
//!
//! [`RuleSet`] tracks which rules block which (a rule blocks another when it
//! must be emitted first so a first-match-wins proxy evaluates it first) and
//! produces the total emission order.
//!
//! The graph is keyed by [`RuleKey`] rather than object references, so the
//! whole structure is cheaply clonable: `merge_rules` operates on a clone
//! and either returns a new consistent set or an error, leaving the receiver
//! untouched. Rules themselves are immutable and shared via `Arc`, so a
//! clone copies only the maps.
//!
//! # Example
//!
//! ```
//! use route_control::rules::{Rule, RuleSet};
//! use route_control::tokens::TokenDictionary;
//! use std::sync::Arc;
//!
//! let tokens = TokenDictionary::empty();
//! let base = vec![
//!     Arc::new(Rule::parse("a".into(), "t", "/app/**", &tokens).unwrap()),
//! ];
//! let set = RuleSet::from_trusted(base);
//!
//! let batch = vec![
//!     Arc::new(Rule::parse("b".into(), "t", "/app/a*", &tokens).unwrap()),
//! ];
//! let merged = set.merge_rules(&batch).unwrap();
//!
//! let ordered = merged.order_rules().unwrap();
//! let patterns: Vec<&str> = ordered.iter().map(|r| r.pattern()).collect();
//! assert_eq!(patterns, vec!["/app/a*", "/app/**"]);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::RuleError;

use super::rule::Rule;
use super::types::{BlockedRule, RuleComparison, RuleKey};
use super::OwnerId;

/// The conflict graph over the currently active rules.
///
/// Invariants:
/// - a rule is in `ready` iff it has no entry (or an empty entry) in
///   `blocked_by`
/// - `blocks` and `blocked_by` are exact inverses at all times
/// - every rule is either ready or has at least one blocker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    /// All rules, keyed by `(pattern, owner)`
    rules: BTreeMap<RuleKey, Arc<Rule>>,

    /// Rules with no unresolved blocker; the `RuleKey` ordering keeps this
    /// frontier in ascending alphabetic pattern order
    ready: BTreeSet<RuleKey>,

    /// rule -> rules it currently blocks (they must be emitted after it)
    blocks: BTreeMap<RuleKey, BTreeSet<RuleKey>>,

    /// rule -> rules still blocking it
    blocked_by: BTreeMap<RuleKey, BTreeSet<RuleKey>>,
}

impl RuleSet {
    /// Create an empty rule set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rule set from a trusted, mutually non-conflicting
    /// collection.
    ///
    /// No pairwise check is performed: every rule starts ready and no
    /// blocking edges exist. Use [`Self::merge_rules`] for untrusted input.
    #[must_use]
    pub fn from_trusted(rules: impl IntoIterator<Item = Arc<Rule>>) -> Self {
        let mut set = Self::new();
        for rule in rules {
            let key = rule.key();
            set.ready.insert(key.clone());
            set.rules.insert(key, rule);
        }
        set
    }

    /// Number of rules in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the set contains no rules
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check whether a rule identity is present
    #[must_use]
    pub fn contains(&self, key: &RuleKey) -> bool {
        self.rules.contains_key(key)
    }

    /// Iterate over all rules in `(pattern, owner)` order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Rule>> {
        self.rules.values()
    }

    /// Merge a batch of new rules against the current set.
    ///
    /// Each new rule is compared against every pre-existing rule — not
    /// against other rules in the same batch, which come from a single
    /// owner and are trusted to be mutually compatible. `Distinct` adds no
    /// edge; a priority verdict adds a blocking edge; `Identical` or
    /// `Overlap` aborts the whole batch.
    ///
    /// The receiver is never mutated: the merge works on a clone and the
    /// clone is returned on success. On error nothing from the batch is
    /// committed, not even the rules that compared cleanly.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::Conflict` naming both rules on the first
    /// `Identical` or `Overlap` comparison.
    pub fn merge_rules(&self, batch: &[Arc<Rule>]) -> Result<Self, RuleError> {
        let mut next = self.clone();

        for new_rule in batch {
            let new_key = new_rule.key();
            let mut blocked = false;

            for (existing_key, existing) in &self.rules {
                match new_rule.compare(existing) {
                    RuleComparison::Distinct => {}
                    RuleComparison::HigherPriority => {
                        next.blocks
                            .entry(new_key.clone())
                            .or_default()
                            .insert(existing_key.clone());
                        next.blocked_by
                            .entry(existing_key.clone())
                            .or_default()
                            .insert(new_key.clone());
                        next.ready.remove(existing_key);
                    }
                    RuleComparison::LowerPriority => {
                        next.blocks
                            .entry(existing_key.clone())
                            .or_default()
                            .insert(new_key.clone());
                        next.blocked_by
                            .entry(new_key.clone())
                            .or_default()
                            .insert(existing_key.clone());
                        blocked = true;
                    }
                    outcome => {
                        warn!(
                            "Rule conflict ({}): {} vs {}; rejecting batch",
                            outcome, new_rule, existing
                        );
                        return Err(RuleError::Conflict {
                            left: new_key.to_string(),
                            right: existing_key.to_string(),
                            outcome,
                        });
                    }
                }
            }

            if !blocked {
                next.ready.insert(new_key.clone());
            }
            next.rules.insert(new_key, Arc::clone(new_rule));
        }

        debug!(
            "Merged {} rules ({} total, {} ready)",
            batch.len(),
            next.rules.len(),
            next.ready.len()
        );
        Ok(next)
    }

    /// Remove every rule owned by `owner`, in place.
    ///
    /// Edges are dropped in both directions. Rules that lose their last
    /// blocker become ready; rules the removed rules were blocked by keep
    /// their other edges untouched.
    pub fn delete_rules(&mut self, owner: &OwnerId) {
        let removed: Vec<RuleKey> = self
            .rules
            .keys()
            .filter(|key| key.owner() == owner)
            .cloned()
            .collect();

        for key in &removed {
            self.rules.remove(key);
            self.ready.remove(key);
        }

        for key in &removed {
            if let Some(blocked) = self.blocks.remove(key) {
                for blocked_key in blocked {
                    if let Some(blockers) = self.blocked_by.get_mut(&blocked_key) {
                        blockers.remove(key);
                        if blockers.is_empty() {
                            self.blocked_by.remove(&blocked_key);
                            if self.rules.contains_key(&blocked_key) {
                                self.ready.insert(blocked_key);
                            }
                        }
                    }
                }
            }
            if let Some(blockers) = self.blocked_by.remove(key) {
                for blocker_key in blockers {
                    if let Some(blocked) = self.blocks.get_mut(&blocker_key) {
                        blocked.remove(key);
                        if blocked.is_empty() {
                            self.blocks.remove(&blocker_key);
                        }
                    }
                }
            }
        }

        debug!(
            "Deleted {} rules for {} ({} remaining)",
            removed.len(),
            owner,
            self.rules.len()
        );
    }

    /// Produce the deterministic total emission order.
    ///
    /// Kahn's algorithm over working copies of the edge maps, seeded from
    /// `ready`. The frontier is kept in ascending alphabetic pattern order,
    /// so mutually unordered rules always emit alphabetically and repeated
    /// calls return the same sequence — rendered configurations are
    /// compared byte-for-byte by digest across controller instances, which
    /// makes this determinism load-bearing.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::CyclicConflict` if the sort cannot place every
    /// rule; the caller must reject the batch that produced the set.
    pub fn order_rules(&self) -> Result<Vec<Arc<Rule>>, RuleError> {
        let mut frontier = self.ready.clone();
        let mut blocks = self.blocks.clone();
        let mut blocked_by = self.blocked_by.clone();
        let mut ordered = Vec::with_capacity(self.rules.len());

        while let Some(key) = frontier.pop_first() {
            ordered.push(Arc::clone(&self.rules[&key]));
            if let Some(released) = blocks.remove(&key) {
                for blocked_key in released {
                    if let Some(blockers) = blocked_by.get_mut(&blocked_key) {
                        blockers.remove(&key);
                        if blockers.is_empty() {
                            blocked_by.remove(&blocked_key);
                            frontier.insert(blocked_key);
                        }
                    }
                }
            }
        }

        if ordered.len() != self.rules.len() {
            return Err(RuleError::CyclicConflict {
                unresolved: self.rules.len() - ordered.len(),
            });
        }
        Ok(ordered)
    }

    /// Snapshot every rule with a non-empty blocker set (diagnostics only)
    #[must_use]
    pub fn blocked_rules(&self) -> Vec<BlockedRule> {
        self.blocked_by
            .iter()
            .filter(|(_, blockers)| !blockers.is_empty())
            .map(|(key, blockers)| BlockedRule {
                rule: Arc::clone(&self.rules[key]),
                blocked_by: blockers
                    .iter()
                    .map(|blocker| Arc::clone(&self.rules[blocker]))
                    .collect(),
            })
            .collect()
    }
}
