//! Shared, atomically swapped rule set snapshots of a project.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use sieve_common::ProjectId;

use crate::persistence::{PersistenceError, RuleSetSink, apply_rule_set};
use crate::rule::{Rule, RuleId, RuleKind};
use crate::ruleset::RuleSet;
use crate::validation::{
    RuleCandidate, ValidationError, ValidationErrors, validate_reorder, validate_rule,
    validate_update,
};

/// Failure to apply a change to a project's rule set.
///
/// In both cases the previous snapshot stays current.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The change was rejected.
    #[error("invalid rule: {0}")]
    Validation(#[from] ValidationErrors),
    /// The new rule set could not be persisted.
    #[error("failed to persist rule set")]
    Persistence(#[from] PersistenceError),
}

/// The rule set of a single project.
///
/// Readers obtain the current snapshot with [`snapshot`](Self::snapshot) without blocking. Every
/// change validates against the current snapshot, persists the result through the sink and only
/// then swaps in the new snapshot. Changes are serialized.
#[derive(Debug)]
pub struct ProjectSampling<S> {
    project_id: ProjectId,
    current: ArcSwap<RuleSet>,
    writer: Mutex<()>,
    sink: S,
}

impl<S: RuleSetSink> ProjectSampling<S> {
    /// Enables dynamic sampling for a project with an empty rule set.
    pub fn new(project_id: ProjectId, sink: S) -> Self {
        Self::with_rule_set(project_id, RuleSet::new(), sink)
    }

    /// Resumes dynamic sampling for a project from a previously stored rule set.
    pub fn with_rule_set(project_id: ProjectId, rule_set: RuleSet, sink: S) -> Self {
        Self {
            project_id,
            current: ArcSwap::from_pointee(rule_set),
            writer: Mutex::new(()),
            sink,
        }
    }

    /// The project this rule set belongs to.
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// The sink changes are persisted to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Returns the current rule set.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.current.load_full()
    }

    /// Validates and appends a new rule.
    pub fn insert(&self, candidate: &RuleCandidate) -> Result<Rule, StoreError> {
        self.commit("inserted rule", |current| {
            let accepted = validate_rule(candidate, current)?;
            Ok((accepted.rule_set, accepted.rule))
        })
    }

    /// Validates and applies a change to an existing rule.
    pub fn update(&self, id: RuleId, candidate: &RuleCandidate) -> Result<Rule, StoreError> {
        self.commit("updated rule", |current| {
            let accepted = validate_update(id, candidate, current)?;
            Ok((accepted.rule_set, accepted.rule))
        })
    }

    /// Removes a rule.
    pub fn remove(&self, id: RuleId) -> Result<Rule, StoreError> {
        self.commit("removed rule", |current| {
            let mut rule_set = current.clone();
            let rule = rule_set
                .remove(id)
                .ok_or(ValidationError::UnknownRule(id))?;
            Ok((rule_set, rule))
        })
    }

    /// Replaces the order of the rules of one kind.
    pub fn reorder(&self, kind: RuleKind, order: &[RuleId]) -> Result<(), StoreError> {
        self.commit("reordered rules", |current| {
            Ok((validate_reorder(current, kind, order)?, ()))
        })
    }

    /// Disables dynamic sampling by removing all rules.
    ///
    /// The id counter is kept, so ids of removed rules are never handed out again.
    pub fn disable(&self) -> Result<(), StoreError> {
        self.commit("disabled dynamic sampling", |current| {
            let mut rule_set = current.clone();
            rule_set.clear();
            Ok((rule_set, ()))
        })
    }

    fn commit<T, F>(&self, action: &'static str, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&RuleSet) -> Result<(RuleSet, T), ValidationErrors>,
    {
        let _guard = self.writer.lock();

        let current = self.current.load();
        let (rule_set, output) = f(&**current)?;
        apply_rule_set(&self.sink, self.project_id, &rule_set)?;

        sieve_log::debug!(
            project_id = %self.project_id,
            rules = rule_set.len(),
            next_id = %rule_set.next_id(),
            "{action}"
        );

        self.current.store(Arc::new(rule_set));
        Ok(output)
    }
}
