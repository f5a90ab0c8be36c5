//! Routing rules: pattern parsing and whole-pattern priority comparison
//!
//! A [`Rule`] maps one URL pattern to an opaque target address on behalf of
//! an owning application version. Patterns are absolute (`/`-rooted) and are
//! decomposed into [`PathSegment`]s at construction; the final component is
//! the filename position and receives stricter validation.
//!
//! Whole-pattern comparison first rules out disjoint patterns with a
//! forward scan (deferring to a reverse scan when a `**` makes positional
//! alignment meaningless), then lets filename specificity dominate, then
//! falls back to the first differing path segment.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::RuleError;
use crate::tokens::TokenResolver;

use super::segment::PathSegment;
use super::types::{OwnerId, RuleComparison, RuleKey};

/// One URL-pattern-to-target mapping owned by an application version.
///
/// Identity and equality are `(owner, pattern)`: two rules from different
/// owners with identical pattern text are distinct entities. Immutable after
/// construction.
#[derive(Debug, Clone)]
pub struct Rule {
    owner: OwnerId,
    target: String,
    pattern: String,
    segments: Vec<PathSegment>,
}

impl Rule {
    /// Parse a pattern string into a rule.
    ///
    /// The pattern must start with `/`. It is split on `/` (the empty
    /// component before the leading `/` is dropped) and the final component
    /// is marked as the filename position. A trailing `/` therefore yields
    /// an empty filename segment, which is valid and matches only the bare
    /// directory request.
    ///
    /// # Errors
    ///
    /// Returns `RuleError` if the pattern is not absolute or any segment
    /// fails classification (multiple wildcards, invalid filename).
    ///
    /// # Example
    ///
    /// ```
    /// use route_control::rules::Rule;
    /// use route_control::tokens::TokenDictionary;
    ///
    /// let tokens = TokenDictionary::empty();
    /// let rule = Rule::parse("web-v1".into(), "10.0.0.3:8080", "/app/**", &tokens).unwrap();
    /// assert_eq!(rule.pattern(), "/app/**");
    /// assert_eq!(rule.segments().len(), 2);
    /// ```
    pub fn parse(
        owner: OwnerId,
        target: impl Into<String>,
        pattern: &str,
        resolver: &dyn TokenResolver,
    ) -> Result<Self, RuleError> {
        let Some(relative) = pattern.strip_prefix('/') else {
            return Err(RuleError::PatternNotAbsolute {
                pattern: pattern.to_string(),
            });
        };

        let components: Vec<&str> = relative.split('/').collect();
        let filename_index = components.len() - 1;
        let segments = components
            .iter()
            .enumerate()
            .map(|(i, text)| PathSegment::new(text, i == filename_index, resolver))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            owner,
            target: target.into(),
            pattern: pattern.to_string(),
            segments,
        })
    }

    /// Build a rule from directory components and an optional filename.
    ///
    /// A missing filename defaults to `**`, matching everything below the
    /// directory path.
    ///
    /// # Errors
    ///
    /// Returns `RuleError` if any component fails classification.
    ///
    /// # Example
    ///
    /// ```
    /// use route_control::rules::Rule;
    /// use route_control::tokens::TokenDictionary;
    ///
    /// let tokens = TokenDictionary::empty();
    /// let rule =
    ///     Rule::from_path_parts("web-v1".into(), "10.0.0.3:8080", &["app", "js"], None, &tokens)
    ///         .unwrap();
    /// assert_eq!(rule.pattern(), "/app/js/**");
    /// ```
    pub fn from_path_parts(
        owner: OwnerId,
        target: impl Into<String>,
        directories: &[&str],
        filename: Option<&str>,
        resolver: &dyn TokenResolver,
    ) -> Result<Self, RuleError> {
        let filename = filename.unwrap_or("**");
        let mut pattern = String::new();
        for dir in directories {
            pattern.push('/');
            pattern.push_str(dir);
        }
        pattern.push('/');
        pattern.push_str(filename);
        Self::parse(owner, target, &pattern, resolver)
    }

    /// The owning application version
    #[must_use]
    pub const fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// The opaque destination address (not interpreted by the engine)
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The original pattern text
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The classified segments, leading-to-trailing
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The conflict-graph identity of this rule
    #[must_use]
    pub fn key(&self) -> RuleKey {
        RuleKey::new(self.owner.clone(), self.pattern.clone())
    }

    fn filename_segment(&self) -> &PathSegment {
        // parse() always produces at least one segment
        self.segments.last().expect("rule has no segments")
    }

    /// Compare two rules for relative matching priority.
    ///
    /// Filename specificity dominates path specificity: when the filename
    /// segments differ, their verdict is the rule verdict. Only identical
    /// filenames fall through to a left-to-right scan of the path segments.
    #[must_use]
    pub fn compare(&self, other: &Self) -> RuleComparison {
        if self.pattern == other.pattern {
            return RuleComparison::Identical;
        }
        if self.is_distinct(other) {
            return RuleComparison::Distinct;
        }

        let filenames = self.filename_segment().compare(other.filename_segment());
        if filenames != RuleComparison::Identical {
            return filenames;
        }

        for (left, right) in self.segments.iter().zip(&other.segments) {
            let verdict = left.compare(right);
            if verdict != RuleComparison::Identical {
                return verdict;
            }
        }

        // Equal patterns were handled above, so two fully identical scans
        // should be impossible; refuse to rank rather than guess.
        RuleComparison::Overlap
    }

    /// Check whether two rules can never match the same request.
    ///
    /// Walks both segment lists position-by-position up to the shorter
    /// length. A `**` on either side ends the forward scan: variable-depth
    /// matching makes positional alignment meaningless from that point, so
    /// the decision is deferred to [`Self::is_reverse_distinct`]. Without
    /// any `**`, differing path depths cannot be absorbed and the rules are
    /// distinct iff their segment counts differ.
    fn is_distinct(&self, other: &Self) -> bool {
        let shorter = self.segments.len().min(other.segments.len());
        for i in 0..shorter {
            let (left, right) = (&self.segments[i], &other.segments[i]);
            if left.is_double_star() || right.is_double_star() {
                return self.is_reverse_distinct(other);
            }
            if left.compare(right) == RuleComparison::Distinct {
                return true;
            }
        }
        self.segments.len() != other.segments.len()
    }

    /// Tail-inward distinctness scan, used once a `**` breaks forward
    /// alignment.
    ///
    /// Meeting a `**` from this direction gives up (an overlap is possible).
    /// Exhausting the shorter list without meeting one proves the `**` is
    /// anchored too far from both ends to overlap the shorter pattern. That
    /// exhaustion case is a deliberate approximation, not a sound
    /// distinctness proof: an overlap may exist at a different alignment,
    /// and downstream ordering depends on preserving the verdict as-is.
    fn is_reverse_distinct(&self, other: &Self) -> bool {
        let shorter = self.segments.len().min(other.segments.len());
        for i in 1..=shorter {
            let left = &self.segments[self.segments.len() - i];
            let right = &other.segments[other.segments.len() - i];
            if left.is_double_star() || right.is_double_star() {
                return false;
            }
            if left.compare(right) == RuleComparison::Distinct {
                return true;
            }
        }
        true
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.pattern == other.pattern
    }
}

impl Eq for Rule {}

impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.owner.hash(state);
        self.pattern.hash(state);
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} -> {}", self.owner, self.pattern, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::types::RuleComparison::{
        Distinct, HigherPriority, Identical, LowerPriority, Overlap,
    };
    use crate::tokens::TokenDictionary;

    fn dict() -> TokenDictionary {
        TokenDictionary::from_entries([("make", "audi|bmw|vw"), ("model", "[a-z0-9]+")]).unwrap()
    }

    fn rule(pattern: &str) -> Rule {
        Rule::parse("app-v1".into(), "10.0.0.1:80", pattern, &dict()).unwrap()
    }

    fn rule_for(owner: &str, pattern: &str) -> Rule {
        Rule::parse(owner.into(), "10.0.0.1:80", pattern, &dict()).unwrap()
    }

    #[test]
    fn test_parse_root() {
        let r = rule("/");
        assert_eq!(r.segments().len(), 1);
        assert_eq!(r.segments()[0].text(), "");
        assert!(r.segments()[0].is_last());
    }

    #[test]
    fn test_parse_segments() {
        let r = rule("/app/delta/index.html");
        let texts: Vec<&str> = r.segments().iter().map(PathSegment::text).collect();
        assert_eq!(texts, vec!["app", "delta", "index.html"]);
        assert!(r.segments()[2].is_last());
        assert!(!r.segments()[0].is_last());
    }

    #[test]
    fn test_parse_trailing_slash() {
        let r = rule("/a/b/c/");
        let texts: Vec<&str> = r.segments().iter().map(PathSegment::text).collect();
        assert_eq!(texts, vec!["a", "b", "c", ""]);
    }

    #[test]
    fn test_parse_rejects_relative_pattern() {
        let result = Rule::parse("app-v1".into(), "t", "app/**", &dict());
        assert!(matches!(result, Err(RuleError::PatternNotAbsolute { .. })));
    }

    #[test]
    fn test_parse_rejects_bad_filename() {
        let result = Rule::parse("app-v1".into(), "t", "/app/index", &dict());
        assert!(matches!(result, Err(RuleError::InvalidFilename { .. })));
    }

    #[test]
    fn test_from_path_parts_defaults_filename() {
        let r = Rule::from_path_parts("app-v1".into(), "t", &["app", "js"], None, &dict()).unwrap();
        assert_eq!(r.pattern(), "/app/js/**");

        let r =
            Rule::from_path_parts("app-v1".into(), "t", &["app"], Some("*.css"), &dict()).unwrap();
        assert_eq!(r.pattern(), "/app/*.css");
    }

    #[test]
    fn test_identity_is_owner_and_pattern() {
        let a = rule_for("app-v1", "/app/**");
        let b = rule_for("app-v2", "/app/**");
        let c = rule_for("app-v1", "/app/**");
        assert_ne!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_compare_identical_pattern() {
        // Same pattern text compares Identical even across owners
        let a = rule_for("app-v1", "/app/**");
        let b = rule_for("app-v2", "/app/**");
        assert_eq!(a.compare(&b), Identical);
    }

    #[test]
    fn test_filename_dominates_path() {
        // The filename verdict wins even though the path segments also
        // differ
        let specific = rule("/app/delta/index.html");
        let broad = rule("/app/**");
        assert_eq!(specific.compare(&broad), HigherPriority);
        assert_eq!(broad.compare(&specific), LowerPriority);
    }

    #[test]
    fn test_identical_filenames_fall_through_to_path_scan() {
        let deep = rule("/app/qa/**");
        let shallow = rule("/app/**");
        // Filenames are both "**" so the path scan decides: "qa" beats "**"
        assert_eq!(deep.compare(&shallow), HigherPriority);
        assert_eq!(shallow.compare(&deep), LowerPriority);
    }

    #[test]
    fn test_star_filename_loses_to_concrete() {
        let concrete = rule("/app/delta/index.html");
        let star = rule("/app/delta/*");
        assert_eq!(star.compare(&concrete), LowerPriority);
        assert_eq!(concrete.compare(&star), HigherPriority);
    }

    #[test]
    fn test_distinct_by_depth_without_double_star() {
        // No wildcard can absorb the extra segment
        let a = rule("/a/b/c/");
        let b = rule("/a/b/*");
        assert_eq!(a.compare(&b), Distinct);
        assert_eq!(b.compare(&a), Distinct);
    }

    #[test]
    fn test_reverse_scan_exhaustion_is_distinct() {
        // The `**` sits too far from both ends to be provably reachable
        // from the shorter pattern; the engine declares them distinct
        let long = rule("/a/**/c/d/a/b/");
        let short = rule("/a/b/");
        assert_eq!(long.compare(&short), Distinct);
        assert_eq!(short.compare(&long), Distinct);
    }

    #[test]
    fn test_reverse_scan_double_star_gives_up() {
        // Reverse scan meets the `**` before exhausting the shorter side,
        // so distinctness cannot be proven and priority is compared
        let anchored = rule("/app/**");
        let page = rule("/app/qa/page.html");
        assert_eq!(page.compare(&anchored), HigherPriority);
        assert_eq!(anchored.compare(&page), LowerPriority);
    }

    #[test]
    fn test_token_rules_overlap() {
        let make = rule("/[make]/**");
        let model = rule("/[model]/**");
        assert_eq!(make.compare(&model), Overlap);
    }

    #[test]
    fn test_token_vs_matching_literal() {
        let token = rule("/[make]/**");
        let literal = rule("/bmw/**");
        assert_eq!(literal.compare(&token), HigherPriority);
        assert_eq!(token.compare(&literal), LowerPriority);
    }

    #[test]
    fn test_token_vs_non_matching_literal() {
        let token = rule("/[make]/**");
        let literal = rule("/app/**");
        assert_eq!(literal.compare(&token), Distinct);
    }

    #[test]
    fn test_root_is_distinct_from_nested() {
        let root = rule("/");
        let nested = rule("/app/**");
        assert_eq!(root.compare(&nested), Distinct);
    }

    #[test]
    fn test_display() {
        let r = rule_for("web-v2", "/app/**");
        assert_eq!(r.to_string(), "web-v2:/app/** -> 10.0.0.1:80");
    }
}
