//! Token dictionary for bracketed pattern placeholders
//!
//! Rule patterns may contain bracketed tokens such as `[make]` that stand
//! for a class of concrete values. The dictionary maps each token to a
//! regular expression fragment; during segment classification a token wins
//! over pattern inspection whenever the resolver recognizes the exact
//! segment text.
//!
//! Fragments are compiled once, anchored, at dictionary construction, so
//! rule comparison never pays a compilation cost and an invalid fragment is
//! rejected at config load instead of surfacing mid-rebuild.
//!
//! # Example
//!
//! ```
//! use route_control::tokens::{TokenDictionary, TokenResolver};
//!
//! let tokens = TokenDictionary::from_entries([
//!     ("make", "audi|bmw|vw"),
//! ])
//! .unwrap();
//!
//! assert!(tokens.is_defined("[make]"));
//! assert!(!tokens.is_defined("[model]"));
//! assert!(tokens.resolve("[make]").unwrap().is_match("bmw"));
//! assert!(!tokens.resolve("[make]").unwrap().is_match("app"));
//! ```

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::ConfigError;

/// Resolver for bracketed token names.
///
/// Implementations are expected to be in-memory lookups; the engine calls
/// them during segment classification and token-vs-literal comparison.
pub trait TokenResolver {
    /// Resolve a segment text (including brackets, e.g. `[make]`) to its
    /// compiled, fully-anchored regular expression.
    fn resolve(&self, text: &str) -> Option<&Regex>;

    /// Check whether a segment text is a defined token.
    fn is_defined(&self, text: &str) -> bool {
        self.resolve(text).is_some()
    }
}

/// In-memory token dictionary.
///
/// Keys are stored in bracketed form; values are compiled with `^(?:...)$`
/// anchoring so a token matches a path segment only as a whole.
#[derive(Debug, Default)]
pub struct TokenDictionary {
    tokens: BTreeMap<String, Regex>,
}

impl TokenDictionary {
    /// Create an empty dictionary (no tokens defined)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a dictionary from `(name, fragment)` entries.
    ///
    /// Names are bare (without brackets); fragments are regex alternations
    /// or character classes describing the token's concrete values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidTokenPattern` if a fragment does not
    /// compile.
    pub fn from_entries<I, N, F>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (N, F)>,
        N: AsRef<str>,
        F: AsRef<str>,
    {
        let mut tokens = BTreeMap::new();
        for (name, fragment) in entries {
            let name = name.as_ref();
            let anchored = format!("^(?:{})$", fragment.as_ref());
            let regex = Regex::new(&anchored).map_err(|e| ConfigError::InvalidTokenPattern {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
            tokens.insert(format!("[{name}]"), regex);
        }
        Ok(Self { tokens })
    }

    /// Number of defined tokens
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if the dictionary defines no tokens
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterate over defined token names (bracketed form, sorted)
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tokens.keys().map(String::as_str)
    }
}

impl TokenResolver for TokenDictionary {
    fn resolve(&self, text: &str) -> Option<&Regex> {
        self.tokens.get(text)
    }
}
