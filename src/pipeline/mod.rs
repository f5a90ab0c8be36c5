//! Activation pipeline: stable rebuilds over the application population
//!
//! A rebuild folds the current application population into a fresh
//! [`RuleSet`], one application at a time, in a *stable activation order*:
//! owners that were successfully activated before keep their previous
//! relative order, and new owners are appended as supplied. Stability keeps
//! the emitted configuration from churning when an unrelated application
//! changes.
//!
//! Failures are isolated per application: a parse failure invalidates only
//! the offending rule, a conflict or cycle rejects only the offending
//! application's batch for this round. The working set then remains the
//! last-known-good state and processing continues.
//!
//! The result is published as an immutable [`ActiveSnapshot`] behind an
//! `ArcSwap`: readers are lock-free and only ever observe fully-built
//! snapshots. Rebuilds themselves are serialized by a mutex around the
//! pipeline state; the daemon feeds them through a `tokio::sync::watch`
//! channel, whose keep-only-the-latest semantics collapse bursts of
//! triggers into the most recent population.
//!
//! # Example
//!
//! ```
//! use route_control::pipeline::{ActivationEngine, Application};
//! use route_control::tokens::TokenDictionary;
//! use std::sync::Arc;
//!
//! let tokens = Arc::new(TokenDictionary::empty());
//! let engine = ActivationEngine::new(tokens);
//!
//! let apps = vec![
//!     Application::new("web-v1")
//!         .with_target("10.0.0.3:8080")
//!         .with_rule("/app/**"),
//! ];
//!
//! let snapshot = engine.rebuild(&apps);
//! assert_eq!(snapshot.version, 1);
//! assert_eq!(snapshot.rules.len(), 1);
//! assert_eq!(engine.version(), 1);
//! ```

pub mod population;

use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::rules::{BlockedRule, InvalidRule, OwnerId, Rule, RuleSet};
use crate::tokens::TokenDictionary;

pub use population::{
    load_population, Application, FilePopulationProvider, PopulationFile, PopulationProvider,
};

/// An application that could not be activated in a rebuild round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedApplication {
    /// The application that was rejected
    pub owner: OwnerId,

    /// Human-readable rejection reason (conflict or cycle)
    pub reason: String,
}

/// Outcome of folding one population into a rule set.
///
/// Produced by [`rebuild_population`], which is a pure function of the
/// previous activation order and the current population; the engine wraps
/// it with state management and snapshot publication.
#[derive(Debug, Default)]
pub struct RebuildOutcome {
    /// The active rules in deterministic emission order
    pub ordered: Vec<Arc<Rule>>,

    /// Rules currently waiting on higher-priority rules (diagnostics)
    pub blocked: Vec<BlockedRule>,

    /// Raw patterns that failed to parse (diagnostics)
    pub invalid: Vec<InvalidRule>,

    /// Applications rejected this round (diagnostics)
    pub rejected: Vec<RejectedApplication>,

    /// Owners folded into the active set, in activation order; feeds the
    /// next rebuild as its stability reference
    pub activation_order: Vec<OwnerId>,
}

/// Published result of a completed rebuild.
///
/// Immutable and shared; safe to read from any thread without locking.
#[derive(Debug, Default)]
pub struct ActiveSnapshot {
    /// Monotonic rebuild counter
    pub version: u64,

    /// The active rules in deterministic emission order
    pub rules: Vec<Arc<Rule>>,

    /// Rules currently blocked by higher-priority rules
    pub blocked: Vec<BlockedRule>,

    /// Raw patterns that failed to parse
    pub invalid: Vec<InvalidRule>,

    /// Applications rejected in this rebuild
    pub rejected: Vec<RejectedApplication>,

    /// Owners in activation order
    pub active_owners: Vec<OwnerId>,
}

/// Pipeline state threaded between rebuilds
#[derive(Debug, Default)]
struct ActivationState {
    previous_order: Vec<OwnerId>,
    version: u64,
}

/// The activation engine: rebuilds, state, and snapshot publication.
///
/// # Thread Safety
///
/// Rebuilds are serialized internally; concurrent `rebuild` calls queue on
/// the state mutex. Snapshot reads are lock-free and never observe a
/// partially-built set.
pub struct ActivationEngine {
    tokens: Arc<TokenDictionary>,
    snapshot: ArcSwap<ActiveSnapshot>,
    state: Mutex<ActivationState>,
}

impl ActivationEngine {
    /// Create an engine with an empty published snapshot
    #[must_use]
    pub fn new(tokens: Arc<TokenDictionary>) -> Self {
        Self {
            tokens,
            snapshot: ArcSwap::from_pointee(ActiveSnapshot::default()),
            state: Mutex::new(ActivationState::default()),
        }
    }

    /// Rebuild the active set from a population snapshot and publish the
    /// result.
    ///
    /// Always runs to completion: a population full of conflicts still
    /// produces (and publishes) a valid, possibly smaller, ordered set.
    pub fn rebuild(&self, applications: &[Application]) -> Arc<ActiveSnapshot> {
        let mut state = self.state.lock();

        let outcome = rebuild_population(&state.previous_order, applications, &self.tokens);

        state.previous_order.clone_from(&outcome.activation_order);
        state.version += 1;

        let snapshot = Arc::new(ActiveSnapshot {
            version: state.version,
            rules: outcome.ordered,
            blocked: outcome.blocked,
            invalid: outcome.invalid,
            rejected: outcome.rejected,
            active_owners: outcome.activation_order,
        });

        info!(
            "Rebuild v{} complete: {} rules active, {} blocked, {} invalid, {} applications rejected",
            snapshot.version,
            snapshot.rules.len(),
            snapshot.blocked.len(),
            snapshot.invalid.len(),
            snapshot.rejected.len()
        );

        self.snapshot.store(Arc::clone(&snapshot));
        snapshot
    }

    /// Get the current snapshot (lock-free read).
    ///
    /// The returned guard keeps the snapshot alive; use it for batch reads
    /// that must observe one consistent rebuild.
    pub fn load(&self) -> Guard<Arc<ActiveSnapshot>> {
        self.snapshot.load()
    }

    /// Current rebuild version (0 before the first rebuild)
    #[must_use]
    pub fn version(&self) -> u64 {
        self.snapshot.load().version
    }

    /// The active rules of the current snapshot, in emission order
    #[must_use]
    pub fn active_rules(&self) -> Vec<Arc<Rule>> {
        self.snapshot.load().rules.clone()
    }

    /// The blocked-rule diagnostics of the current snapshot
    #[must_use]
    pub fn blocked_rules(&self) -> Vec<BlockedRule> {
        self.snapshot.load().blocked.clone()
    }

    /// The invalid-rule diagnostics of the current snapshot
    #[must_use]
    pub fn invalid_rules(&self) -> Vec<InvalidRule> {
        self.snapshot.load().invalid.clone()
    }
}

/// Compute the activation order for a rebuild: previously activated owners
/// that are still present keep their relative order, new owners are
/// appended in the order supplied.
fn activation_order(previous: &[OwnerId], applications: &[Application]) -> Vec<OwnerId> {
    let mut order: Vec<OwnerId> = previous
        .iter()
        .filter(|owner| applications.iter().any(|app| app.owner == **owner))
        .cloned()
        .collect();
    for app in applications {
        if !order.contains(&app.owner) {
            order.push(app.owner.clone());
        }
    }
    order
}

/// Fold a population into a fresh rule set.
///
/// Pure function of `(previous_order, applications, tokens)`; see the
/// module docs for the isolation and stability rules.
#[must_use]
pub fn rebuild_population(
    previous_order: &[OwnerId],
    applications: &[Application],
    tokens: &TokenDictionary,
) -> RebuildOutcome {
    let order = activation_order(previous_order, applications);

    let mut working = RuleSet::new();
    let mut ordered: Vec<Arc<Rule>> = Vec::new();
    let mut invalid = Vec::new();
    let mut rejected = Vec::new();
    let mut activated = Vec::new();

    for owner in &order {
        let Some(app) = applications.iter().find(|app| &app.owner == owner) else {
            continue;
        };
        let Some(target) = &app.target else {
            debug!("Skipping {}: no deployed target", owner);
            continue;
        };

        // Parse this application's batch, recovering parse failures into
        // diagnostics and dropping redundant re-submissions
        let mut batch: Vec<Arc<Rule>> = Vec::new();
        for pattern in &app.raw_rules {
            match Rule::parse(owner.clone(), target.clone(), pattern, tokens) {
                Ok(rule) => {
                    let key = rule.key();
                    if working.contains(&key) || batch.iter().any(|r| r.key() == key) {
                        debug!("Skipping duplicate rule {}", key);
                        continue;
                    }
                    batch.push(Arc::new(rule));
                }
                Err(e) => {
                    warn!("Invalid rule {}:{}: {}", owner, pattern, e);
                    invalid.push(InvalidRule {
                        owner: owner.clone(),
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if batch.is_empty() {
            // Nothing new to fold, but the application is active and keeps
            // its slot in the activation order
            activated.push(owner.clone());
            continue;
        }

        let merged = match working.merge_rules(&batch) {
            Ok(merged) => merged,
            Err(e) => {
                warn!("Application {} rejected: {}", owner, e);
                rejected.push(RejectedApplication {
                    owner: owner.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match merged.order_rules() {
            Ok(emission) => {
                working = merged;
                ordered = emission;
                activated.push(owner.clone());
            }
            Err(e) => {
                warn!("Application {} rejected: {}", owner, e);
                rejected.push(RejectedApplication {
                    owner: owner.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    RebuildOutcome {
        ordered,
        blocked: working.blocked_rules(),
        invalid,
        rejected,
        activation_order: activated,
    }
}

/// Drive rebuilds from a population watch channel.
///
/// The watch channel keeps only the most recent population, so bursts of
/// triggers coalesce into a single rebuild of the latest desired state.
/// Each published snapshot is handed to `on_publish` (renderers, digest
/// writers). Returns when every sender is dropped.
pub async fn run_rebuild_loop<F>(
    engine: Arc<ActivationEngine>,
    mut population_rx: watch::Receiver<Vec<Application>>,
    mut on_publish: F,
) where
    F: FnMut(&Arc<ActiveSnapshot>),
{
    loop {
        let applications = population_rx.borrow_and_update().clone();
        let snapshot = engine.rebuild(&applications);
        on_publish(&snapshot);

        if population_rx.changed().await.is_err() {
            debug!("Population channel closed, stopping rebuild loop");
            break;
        }
    }
}
