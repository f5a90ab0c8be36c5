//! Path segment classification and pairwise priority comparison
//!
//! A rule pattern is split on `/` into segments; each segment is classified
//! once at construction into exactly one [`SegmentKind`]:
//!
//! - **Empty**: the empty string (a trailing `/` produces one)
//! - **Star**: the single-segment wildcard `*`
//! - **DoubleStar**: the variable-depth wildcard `**`
//! - **Token**: a text the token resolver recognizes, e.g. `[make]`
//! - **Complete**: a literal with no wildcard
//! - **Wildcard**: a literal containing exactly one `*`
//!
//! Comparison between two segments yields a [`RuleComparison`] and drives
//! the whole-rule priority decision: more specific segments win, `*` and
//! `**` lose to anything concrete, tokens are only comparable against
//! literals their regex can test.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use regex::Regex;

use crate::error::RuleError;
use crate::tokens::TokenResolver;

use super::types::RuleComparison;

/// Classification of one `/`-delimited piece of a rule pattern
#[derive(Debug, Clone)]
pub enum SegmentKind {
    /// Empty segment (pattern had a trailing or doubled `/`)
    Empty,

    /// `*`: matches exactly one path segment
    Star,

    /// `**`: matches any number of path segments
    DoubleStar,

    /// A token recognized by the resolver; carries its compiled regex so
    /// comparisons never need resolver access
    Token(Arc<Regex>),

    /// A literal with no wildcard
    Complete,

    /// A literal containing exactly one `*`
    Wildcard,
}

impl SegmentKind {
    /// Short name used in diagnostics
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Star => "star",
            Self::DoubleStar => "double-star",
            Self::Token(_) => "token",
            Self::Complete => "complete",
            Self::Wildcard => "wildcard",
        }
    }
}

/// One `/`-delimited token of a rule pattern.
///
/// Immutable once built. Equality and hashing are based on
/// `(text, is_last)`: the same text classifies the same way in the same
/// position, so the derived classification is not part of the identity.
#[derive(Debug, Clone)]
pub struct PathSegment {
    text: String,
    is_last: bool,
    kind: SegmentKind,
    prefix: String,
    postfix: String,
}

impl PathSegment {
    /// Classify a segment.
    ///
    /// Token classification wins whenever the resolver recognizes the exact
    /// text; otherwise the segment is classified by pattern inspection.
    ///
    /// # Errors
    ///
    /// - `RuleError::MultipleWildcards` if a literal contains more than one
    ///   `*` (the sole exception being the `**` segment itself)
    /// - `RuleError::InvalidFilename` if `is_last` and the segment is a
    ///   non-empty, non-token literal that neither contains `.` nor ends
    ///   with `*`
    pub fn new(
        text: &str,
        is_last: bool,
        resolver: &dyn TokenResolver,
    ) -> Result<Self, RuleError> {
        let (kind, prefix, postfix) = Self::classify(text, resolver)?;

        if is_last && !Self::valid_filename(text, &kind) {
            return Err(RuleError::InvalidFilename {
                segment: text.to_string(),
            });
        }

        Ok(Self {
            text: text.to_string(),
            is_last,
            kind,
            prefix,
            postfix,
        })
    }

    fn classify(
        text: &str,
        resolver: &dyn TokenResolver,
    ) -> Result<(SegmentKind, String, String), RuleError> {
        if let Some(regex) = resolver.resolve(text) {
            let kind = SegmentKind::Token(Arc::new(regex.clone()));
            return Ok((kind, String::new(), String::new()));
        }

        match text {
            "" => Ok((SegmentKind::Empty, String::new(), String::new())),
            "*" => Ok((SegmentKind::Star, String::new(), String::new())),
            "**" => Ok((SegmentKind::DoubleStar, String::new(), String::new())),
            _ => match text.match_indices('*').count() {
                0 => {
                    // A literal anchors both ways in wildcard comparison.
                    Ok((SegmentKind::Complete, text.to_string(), text.to_string()))
                }
                1 => {
                    let pos = text.find('*').unwrap_or_default();
                    Ok((
                        SegmentKind::Wildcard,
                        text[..pos].to_string(),
                        text[pos + 1..].to_string(),
                    ))
                }
                _ => Err(RuleError::MultipleWildcards {
                    segment: text.to_string(),
                }),
            },
        }
    }

    /// A filename-position segment must be empty, a token, contain `.`, or
    /// end with `*` (`*` and `**` satisfy the latter).
    fn valid_filename(text: &str, kind: &SegmentKind) -> bool {
        match kind {
            SegmentKind::Empty | SegmentKind::Token(_) => true,
            _ => text.contains('.') || text.ends_with('*'),
        }
    }

    /// Original segment text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether this segment sits in the filename position of its rule
    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.is_last
    }

    /// The segment classification
    #[must_use]
    pub const fn kind(&self) -> &SegmentKind {
        &self.kind
    }

    /// Check for the `**` classification
    #[must_use]
    pub const fn is_double_star(&self) -> bool {
        matches!(self.kind, SegmentKind::DoubleStar)
    }

    /// Compare two segments for relative matching priority.
    ///
    /// Symmetric up to swapping `HigherPriority`/`LowerPriority`. The rules
    /// are evaluated in a fixed order:
    ///
    /// 1. equal text → `Identical`
    /// 2. other is `**` → `HigherPriority` (anything beats `**`)
    /// 3. self is `*` or `**` → `LowerPriority`
    /// 4. other is `*` → `HigherPriority`
    /// 5. either is empty → `Distinct`
    /// 6. both complete literals → `Distinct` (equality already excluded)
    /// 7. either is a token → token comparison
    /// 8. otherwise → wildcard prefix/postfix comparison
    #[must_use]
    pub fn compare(&self, other: &Self) -> RuleComparison {
        if self.text == other.text {
            return RuleComparison::Identical;
        }
        if matches!(other.kind, SegmentKind::DoubleStar) {
            return RuleComparison::HigherPriority;
        }
        if matches!(self.kind, SegmentKind::Star | SegmentKind::DoubleStar) {
            return RuleComparison::LowerPriority;
        }
        if matches!(other.kind, SegmentKind::Star) {
            return RuleComparison::HigherPriority;
        }
        if matches!(self.kind, SegmentKind::Empty) || matches!(other.kind, SegmentKind::Empty) {
            return RuleComparison::Distinct;
        }
        if matches!(self.kind, SegmentKind::Complete)
            && matches!(other.kind, SegmentKind::Complete)
        {
            return RuleComparison::Distinct;
        }
        if matches!(self.kind, SegmentKind::Token(_)) || matches!(other.kind, SegmentKind::Token(_))
        {
            return self.compare_token(other);
        }
        self.compare_wildcard(other)
    }

    /// Token comparison.
    ///
    /// Two opaque token classes cannot be ranked, nor can a token against a
    /// wildcard without enumerating its value set; both cases are `Overlap`
    /// and force a manual conflict. Against a complete literal the token's
    /// regex decides: a matching literal is the more specific side, a
    /// non-matching one is disjoint.
    fn compare_token(&self, other: &Self) -> RuleComparison {
        match (&self.kind, &other.kind) {
            (SegmentKind::Token(_), SegmentKind::Token(_)) => RuleComparison::Overlap,
            (SegmentKind::Token(regex), SegmentKind::Complete) => {
                if regex.is_match(&other.text) {
                    RuleComparison::LowerPriority
                } else {
                    RuleComparison::Distinct
                }
            }
            (SegmentKind::Complete, SegmentKind::Token(regex)) => {
                if regex.is_match(&self.text) {
                    RuleComparison::HigherPriority
                } else {
                    RuleComparison::Distinct
                }
            }
            _ => RuleComparison::Overlap,
        }
    }

    /// Wildcard comparison over the `prefix`/`postfix` fields.
    ///
    /// Prefixes must relate by starts-with, postfixes by ends-with; the
    /// longer substring is the more specific side. The postfix verdict is
    /// checked for disjointness first, then the prefix verdict decides
    /// unless it is `Identical`, in which case the postfix verdict does.
    fn compare_wildcard(&self, other: &Self) -> RuleComparison {
        let postfix =
            Self::compare_anchored(&self.postfix, &other.postfix, |longer, shorter| {
                longer.ends_with(shorter)
            });
        if postfix == RuleComparison::Distinct {
            return RuleComparison::Distinct;
        }
        let prefix = Self::compare_anchored(&self.prefix, &other.prefix, |longer, shorter| {
            longer.starts_with(shorter)
        });
        if prefix == RuleComparison::Identical {
            postfix
        } else {
            prefix
        }
    }

    fn compare_anchored(
        left: &str,
        right: &str,
        anchored: fn(&str, &str) -> bool,
    ) -> RuleComparison {
        if left == right {
            return RuleComparison::Identical;
        }
        let (longer, shorter) = if left.len() > right.len() {
            (left, right)
        } else {
            (right, left)
        };
        if !anchored(longer, shorter) {
            return RuleComparison::Distinct;
        }
        if left.len() > right.len() {
            RuleComparison::HigherPriority
        } else {
            RuleComparison::LowerPriority
        }
    }
}

impl PartialEq for PathSegment {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.is_last == other.is_last
    }
}

impl Eq for PathSegment {}

impl Hash for PathSegment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
        self.is_last.hash(state);
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
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

    fn seg(text: &str) -> PathSegment {
        PathSegment::new(text, false, &dict()).unwrap()
    }

    fn last(text: &str) -> PathSegment {
        PathSegment::new(text, true, &dict()).unwrap()
    }

    #[test]
    fn test_classification() {
        assert!(matches!(seg("").kind(), SegmentKind::Empty));
        assert!(matches!(seg("*").kind(), SegmentKind::Star));
        assert!(matches!(seg("**").kind(), SegmentKind::DoubleStar));
        assert!(matches!(seg("[make]").kind(), SegmentKind::Token(_)));
        assert!(matches!(seg("app").kind(), SegmentKind::Complete));
        assert!(matches!(seg("a*b").kind(), SegmentKind::Wildcard));
        // Unknown token name falls back to pattern inspection
        assert!(matches!(seg("[color]").kind(), SegmentKind::Complete));
    }

    #[test]
    fn test_wildcard_split() {
        let s = seg("ab*cd");
        assert_eq!(s.prefix, "ab");
        assert_eq!(s.postfix, "cd");

        let s = seg("a*");
        assert_eq!(s.prefix, "a");
        assert_eq!(s.postfix, "");

        let s = seg("*.html");
        assert_eq!(s.prefix, "");
        assert_eq!(s.postfix, ".html");
    }

    #[test]
    fn test_multiple_wildcards_rejected() {
        let result = PathSegment::new("a*b*c", false, &dict());
        assert!(matches!(
            result,
            Err(RuleError::MultipleWildcards { segment }) if segment == "a*b*c"
        ));
    }

    #[test]
    fn test_filename_validation() {
        // Valid filename positions
        assert!(PathSegment::new("index.html", true, &dict()).is_ok());
        assert!(PathSegment::new("a*", true, &dict()).is_ok());
        assert!(PathSegment::new("*", true, &dict()).is_ok());
        assert!(PathSegment::new("**", true, &dict()).is_ok());
        assert!(PathSegment::new("", true, &dict()).is_ok());
        assert!(PathSegment::new("[make]", true, &dict()).is_ok());
        assert!(PathSegment::new("*.css", true, &dict()).is_ok());

        // Invalid: no dot, not '*'-terminated
        assert!(matches!(
            PathSegment::new("index", true, &dict()),
            Err(RuleError::InvalidFilename { .. })
        ));
        assert!(matches!(
            PathSegment::new("a*b", true, &dict()),
            Err(RuleError::InvalidFilename { .. })
        ));

        // The same texts are fine in non-final positions
        assert!(PathSegment::new("index", false, &dict()).is_ok());
        assert!(PathSegment::new("a*b", false, &dict()).is_ok());
    }

    #[test]
    fn test_equality_on_text_and_position() {
        assert_eq!(seg("app"), seg("app"));
        assert_ne!(seg("app"), seg("apps"));
        assert_ne!(seg("a*"), last("a*"));
    }

    #[test]
    fn test_compare_identical() {
        assert_eq!(seg("app").compare(&seg("app")), Identical);
        assert_eq!(seg("**").compare(&seg("**")), Identical);
        assert_eq!(seg("[make]").compare(&seg("[make]")), Identical);
    }

    #[test]
    fn test_compare_double_star_loses_to_everything() {
        assert_eq!(seg("app").compare(&seg("**")), HigherPriority);
        assert_eq!(seg("**").compare(&seg("app")), LowerPriority);
        assert_eq!(seg("*").compare(&seg("**")), HigherPriority);
        assert_eq!(seg("[make]").compare(&seg("**")), HigherPriority);
        assert_eq!(seg("").compare(&seg("**")), HigherPriority);
        assert_eq!(seg("a*").compare(&seg("**")), HigherPriority);
    }

    #[test]
    fn test_compare_star_loses_to_concrete() {
        assert_eq!(seg("app").compare(&seg("*")), HigherPriority);
        assert_eq!(seg("*").compare(&seg("app")), LowerPriority);
        assert_eq!(seg("a*b").compare(&seg("*")), HigherPriority);
        assert_eq!(seg("[make]").compare(&seg("*")), HigherPriority);
    }

    #[test]
    fn test_compare_empty_distinct() {
        assert_eq!(seg("").compare(&seg("app")), Distinct);
        assert_eq!(seg("app").compare(&seg("")), Distinct);
        assert_eq!(seg("").compare(&seg("a*")), Distinct);
    }

    #[test]
    fn test_compare_complete_literals_distinct() {
        assert_eq!(seg("app").compare(&seg("api")), Distinct);
        assert_eq!(seg("index.html").compare(&seg("index.css")), Distinct);
    }

    #[test]
    fn test_compare_tokens() {
        // Two token classes cannot be ranked
        assert_eq!(seg("[make]").compare(&seg("[model]")), Overlap);

        // Token vs wildcard is ambiguous without a concrete value
        assert_eq!(seg("[make]").compare(&seg("a*")), Overlap);
        assert_eq!(seg("a*").compare(&seg("[make]")), Overlap);

        // Token vs complete: the literal decides through the token regex
        assert_eq!(seg("bmw").compare(&seg("[make]")), HigherPriority);
        assert_eq!(seg("[make]").compare(&seg("bmw")), LowerPriority);
        assert_eq!(seg("app").compare(&seg("[make]")), Distinct);
        assert_eq!(seg("[make]").compare(&seg("app")), Distinct);
    }

    #[test]
    fn test_compare_wildcard_prefix() {
        // Longer prefix is more specific
        assert_eq!(seg("ab*").compare(&seg("a*")), HigherPriority);
        assert_eq!(seg("a*").compare(&seg("ab*")), LowerPriority);

        // Prefixes without a starts-with relation are disjoint
        assert_eq!(seg("xy*").compare(&seg("ab*")), Distinct);
    }

    #[test]
    fn test_compare_wildcard_postfix() {
        // Equal prefixes defer to the postfix verdict
        assert_eq!(seg("a*yz").compare(&seg("a*z")), HigherPriority);
        assert_eq!(seg("a*z").compare(&seg("a*yz")), LowerPriority);

        // Disjoint postfixes dominate everything
        assert_eq!(seg("ab*x").compare(&seg("a*y")), Distinct);
    }

    #[test]
    fn test_compare_wildcard_vs_complete() {
        // A matching literal is more specific than the wildcard
        assert_eq!(seg("a*").compare(&seg("abc")), LowerPriority);
        assert_eq!(seg("abc").compare(&seg("a*")), HigherPriority);
        assert_eq!(last("*.html").compare(&last("index.html")), LowerPriority);
        assert_eq!(last("index.html").compare(&last("*.html")), HigherPriority);

        // A literal outside the wildcard shape is disjoint
        assert_eq!(seg("xy*").compare(&seg("abc")), Distinct);
        assert_eq!(last("*.css").compare(&last("index.html")), Distinct);
    }

    #[test]
    fn test_compare_symmetry() {
        let pairs = [
            ("app", "**"),
            ("*", "app"),
            ("[make]", "bmw"),
            ("ab*", "a*"),
            ("a*yz", "a*z"),
            ("app", "api"),
        ];
        for (a, b) in pairs {
            let forward = seg(a).compare(&seg(b));
            let backward = seg(b).compare(&seg(a));
            let expected = match forward {
                HigherPriority => LowerPriority,
                LowerPriority => HigherPriority,
                other => other,
            };
            assert_eq!(backward, expected, "asymmetric compare for {a} vs {b}");
        }
    }
}
