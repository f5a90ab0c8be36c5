//! route-control: Rule conflict resolution and activation engine
//!
//! This crate is the control-plane core of a traffic-management system: it
//! observes a population of backend application versions and their desired
//! URL routing rules, resolves conflicts between those rules, and produces
//! a deterministic, ordered configuration for first-match-wins proxy
//! backends.
//!
//! # Features
//!
//! - **Pattern Classification**: `/`-rooted patterns with literals,
//!   single-`*` wildcards, `*`/`**` segments and bracketed tokens
//! - **Conflict Graph**: pairwise priority comparison builds blocking
//!   edges; ambiguous pairs are rejected instead of guessed
//! - **Deterministic Ordering**: topological sort with alphabetic
//!   tie-break, byte-stable across instances and restarts
//! - **Stable Activation**: rebuilds preserve the previous activation
//!   order and isolate per-application failures
//! - **Lock-Free Snapshots**: results publish atomically; readers never
//!   observe a partially-built set
//!
//! # Architecture
//!
//! ```text
//! Population change ──► ActivationEngine::rebuild
//!                          │  (stable order, per-app isolation)
//!                          ▼
//!                  RuleSet::merge_rules ──► conflict graph
//!                          │
//!                          ▼
//!                  RuleSet::order_rules ──► deterministic rule order
//!                          │
//!                          ▼
//!                  ActiveSnapshot (ArcSwap) ──► renderers ──► digest
//! ```
//!
//! # Quick Start
//!
//! ```
//! use route_control::pipeline::{ActivationEngine, Application};
//! use route_control::render::{content_digest, ProxyListRenderer, Renderer};
//! use route_control::tokens::TokenDictionary;
//! use std::sync::Arc;
//!
//! let tokens = Arc::new(TokenDictionary::from_entries([("make", "audi|bmw|vw")]).unwrap());
//! let engine = ActivationEngine::new(tokens);
//!
//! let snapshot = engine.rebuild(&[
//!     Application::new("shop-v1")
//!         .with_target("10.0.0.2:8080")
//!         .with_rule("/")
//!         .with_rule("/app/**"),
//!     Application::new("assets-v4")
//!         .with_target("10.0.0.9:8080")
//!         .with_rule("/app/a*"),
//! ]);
//!
//! let rendered = ProxyListRenderer::new().render(&snapshot).unwrap();
//! let digest = content_digest(&rendered);
//! assert_eq!(digest.len(), 32);
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration types and loading
//! - [`error`]: Error types
//! - [`pipeline`]: Activation pipeline and population snapshots
//! - [`render`]: Renderer contract, content digest, reference renderer
//! - [`rules`]: Segment/rule comparison and the conflict graph
//! - [`tokens`]: Token dictionary for bracketed placeholders

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod rules;
pub mod tokens;

// Re-export commonly used types at the crate root
pub use config::{Config, LogConfig};
pub use error::{ConfigError, PipelineError, RenderError, RouteControlError, RuleError};
pub use pipeline::{ActivationEngine, ActiveSnapshot, Application, RebuildOutcome};
pub use render::{content_digest, ProxyListRenderer, Renderer};
pub use rules::{
    BlockedRule, InvalidRule, OwnerId, PathSegment, Rule, RuleComparison, RuleKey, RuleSet,
    SegmentKind,
};
pub use tokens::{TokenDictionary, TokenResolver};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
