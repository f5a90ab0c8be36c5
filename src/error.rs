//! Error types for route-control
//!
//! This module defines the error hierarchy for the rule activation engine.
//! All errors are categorized by subsystem and include recovery hints.

use std::io;

use thiserror::Error;

use crate::rules::RuleComparison;

/// Top-level error type for route-control
#[derive(Debug, Error)]
pub enum RouteControlError {
    /// Configuration errors (file parsing, validation, token dictionary)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Rule parsing and conflict errors
    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    /// Activation pipeline errors (population loading)
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Renderer errors
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// I/O errors not covered by other categories
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RouteControlError {
    /// Check if this error is recoverable (can retry operation)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Rule(e) => e.is_recoverable(),
            Self::Pipeline(e) => e.is_recoverable(),
            Self::Render(e) => e.is_recoverable(),
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
            ),
        }
    }
}

/// Rule parsing and conflict errors
///
/// Parse errors are recovered per rule (the offending pattern becomes an
/// `InvalidRule` diagnostic). Conflict and cycle errors are recovered per
/// application batch: the batch is rejected for the current rebuild and the
/// previous state is retained.
#[derive(Debug, Error)]
pub enum RuleError {
    /// Pattern does not start with '/'
    #[error("pattern must start with '/': {pattern}")]
    PatternNotAbsolute { pattern: String },

    /// A segment contains more than one '*'
    #[error("segment '{segment}' contains more than one wildcard")]
    MultipleWildcards { segment: String },

    /// The filename segment is neither empty, a token, dotted, nor
    /// '*'-terminated
    #[error("filename segment '{segment}' must contain '.' or end with '*'")]
    InvalidFilename { segment: String },

    /// Two rules compared `Identical` or `Overlap`; relative priority cannot
    /// be established and the incoming batch must be rejected
    #[error("rule {left} conflicts with {right} ({outcome})")]
    Conflict {
        left: String,
        right: String,
        outcome: RuleComparison,
    },

    /// The topological sort could not place every rule
    #[error("rule set contains a cyclic conflict ({unresolved} rules unresolved)")]
    CyclicConflict { unresolved: usize },
}

impl RuleError {
    /// Check if this error is recoverable
    ///
    /// All rule errors are recoverable: parse errors are isolated to a single
    /// rule, conflict and cycle errors to a single application batch. The
    /// rebuild as a whole always completes.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        true
    }

    /// Check if this error is a parse error (vs a conflict/cycle)
    #[must_use]
    pub const fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::PatternNotAbsolute { .. }
                | Self::MultipleWildcards { .. }
                | Self::InvalidFilename { .. }
        )
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found or inaccessible
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Validation error (invalid values, missing required fields)
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// A token dictionary entry does not compile as a regular expression
    #[error("Invalid regex for token '{name}': {reason}")]
    InvalidTokenPattern { name: String, reason: String },

    /// Environment variable error
    #[error("Environment variable error: {name}: {reason}")]
    EnvError { name: String, reason: String },

    /// I/O error while reading config
    #[error("I/O error reading configuration: {0}")]
    IoError(#[from] io::Error),
}

impl ConfigError {
    /// Config errors are generally not recoverable without user intervention
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        false
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }
}

/// Activation pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Population snapshot file not found
    #[error("Population file not found: {path}")]
    PopulationNotFound { path: String },

    /// Population snapshot parsing error
    #[error("Failed to parse population snapshot: {0}")]
    PopulationParse(String),

    /// I/O error while reading the population snapshot
    #[error("I/O error reading population snapshot: {0}")]
    IoError(#[from] io::Error),
}

impl PipelineError {
    /// Check if this error is recoverable
    ///
    /// Population load failures are recoverable: the engine keeps serving the
    /// last published snapshot and the next trigger retries the load.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        true
    }
}

/// Renderer errors
#[derive(Debug, Error)]
pub enum RenderError {
    /// Output formatting failed
    #[error("Failed to render configuration: {0}")]
    Format(String),

    /// I/O error while writing rendered output
    #[error("Render I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl RenderError {
    /// Check if this error is recoverable
    ///
    /// Renderer failures never invalidate the published snapshot; the next
    /// rebuild renders again.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        true
    }

    /// Create a format error
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }
}

/// Type alias for Result with `RouteControlError`
pub type Result<T> = std::result::Result<T, RouteControlError>;
