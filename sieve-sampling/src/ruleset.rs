//! The ordered rule collection of a project.

use std::collections::BTreeSet;

use crate::rule::{Rule, RuleId, RuleKind};

/// A structural defect in a [`RuleSet`] that makes it unsafe to evaluate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvariantViolation {
    /// A tracing rule follows an individual transaction rule.
    #[error("tracing rule {id} is ordered after an individual transaction rule")]
    TracingAfterIndividual {
        /// The misplaced tracing rule.
        id: RuleId,
    },
    /// Two rules share an id.
    #[error("rule id {0} is used more than once")]
    DuplicateId(RuleId),
    /// A rule carries an id that the rule set has not handed out yet.
    #[error("rule id {id} is not below the next id {next_id}")]
    IdNotAllocated {
        /// The offending id.
        id: RuleId,
        /// The next id of the rule set.
        next_id: RuleId,
    },
    /// A rule is stored in the list of the other kind.
    #[error("rule {id} is stored with the {expected} rules")]
    WrongPartition {
        /// The misplaced rule.
        id: RuleId,
        /// The kind of the list the rule is stored in.
        expected: RuleKind,
    },
    /// A rule without conditions does not apply to all events, or the other way around.
    #[error("rule {0} has conditions that contradict its apply to all flag")]
    MissingConditions(RuleId),
    /// A rule has a sample rate outside of `(0.0, 1.0]`.
    #[error("rule {0} has an invalid sample rate")]
    InvalidSampleRate(RuleId),
}

/// The ordered sampling rules of one project.
///
/// Error rules and transaction rules are kept in separate lists. Within the transaction rules,
/// all tracing rules precede all individual transaction rules. Ids are allocated from a counter
/// that only ever grows.
///
/// A rule set is treated as an immutable snapshot. The mutating methods are crate private and only
/// called on a fresh copy while validating a change.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    error_rules: Vec<Rule>,
    transaction_rules: Vec<Rule>,
    next_id: RuleId,
}

impl RuleSet {
    /// Creates an empty rule set whose first rule will get id `1`.
    pub fn new() -> Self {
        Self {
            error_rules: Vec::new(),
            transaction_rules: Vec::new(),
            next_id: RuleId(1),
        }
    }

    /// Assembles a rule set from its parts without checking any invariants.
    ///
    /// Use [`check_invariants`](Self::check_invariants) to verify the result.
    pub fn from_parts(error_rules: Vec<Rule>, transaction_rules: Vec<Rule>, next_id: RuleId) -> Self {
        Self {
            error_rules,
            transaction_rules,
            next_id,
        }
    }

    /// The rules applied to error events, in order.
    pub fn error_rules(&self) -> &[Rule] {
        &self.error_rules
    }

    /// The rules applied to transaction events, in order.
    pub fn transaction_rules(&self) -> &[Rule] {
        &self.transaction_rules
    }

    /// The rules of the given kind, in order.
    pub fn rules(&self, kind: RuleKind) -> &[Rule] {
        match kind {
            RuleKind::Error => &self.error_rules,
            RuleKind::Transaction => &self.transaction_rules,
        }
    }

    /// The id the next accepted rule will receive.
    pub fn next_id(&self) -> RuleId {
        self.next_id
    }

    /// Looks up a rule by id.
    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.iter().find(|rule| rule.id == id)
    }

    /// Iterates all rules, error rules first.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.error_rules.iter().chain(&self.transaction_rules)
    }

    /// Returns `true` if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.error_rules.is_empty() && self.transaction_rules.is_empty()
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.error_rules.len() + self.transaction_rules.len()
    }

    /// Removes all rules, keeping the id counter.
    pub fn clear(&mut self) {
        self.error_rules.clear();
        self.transaction_rules.clear();
    }

    /// Removes the rule with the given id and returns it.
    ///
    /// Later rules move up by one position. Ids of other rules and the id counter are unaffected.
    pub fn remove(&mut self, id: RuleId) -> Option<Rule> {
        for rules in [&mut self.error_rules, &mut self.transaction_rules] {
            if let Some(index) = rules.iter().position(|rule| rule.id == id) {
                return Some(rules.remove(index));
            }
        }
        None
    }

    /// Hands out the next id, or `None` once the id space is used up.
    pub(crate) fn allocate_id(&mut self) -> Option<RuleId> {
        let id = self.next_id;
        self.next_id = RuleId(id.0.checked_add(1)?);
        Some(id)
    }

    /// Appends a rule at the end of its partition.
    pub(crate) fn insert(&mut self, rule: Rule) {
        match rule.kind {
            RuleKind::Error => self.error_rules.push(rule),
            RuleKind::Transaction if rule.tracing => {
                let index = self
                    .transaction_rules
                    .iter()
                    .rposition(|rule| rule.tracing)
                    .map_or(0, |index| index + 1);
                self.transaction_rules.insert(index, rule);
            }
            RuleKind::Transaction => self.transaction_rules.push(rule),
        }
    }

    /// Replaces the rule with the same id.
    ///
    /// The rule keeps its position unless its kind or tracing status changed, in which case it is
    /// placed like a new rule. Returns `false` if there is no such rule.
    pub(crate) fn replace(&mut self, rule: Rule) -> bool {
        let Some(current) = self.get(rule.id) else {
            return false;
        };

        if current.kind == rule.kind && current.is_tracing() == rule.is_tracing() {
            let rules = match rule.kind {
                RuleKind::Error => &mut self.error_rules,
                RuleKind::Transaction => &mut self.transaction_rules,
            };
            if let Some(slot) = rules.iter_mut().find(|r| r.id == rule.id) {
                *slot = rule;
            }
        } else {
            self.remove(rule.id);
            self.insert(rule);
        }

        true
    }

    /// Replaces the rules of one kind with the given list.
    pub(crate) fn set_rules(&mut self, kind: RuleKind, rules: Vec<Rule>) {
        match kind {
            RuleKind::Error => self.error_rules = rules,
            RuleKind::Transaction => self.transaction_rules = rules,
        }
    }

    /// Verifies the structural invariants of the rule set.
    ///
    /// Returns the first violation found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut seen = BTreeSet::new();

        for (kind, rules) in [
            (RuleKind::Error, &self.error_rules),
            (RuleKind::Transaction, &self.transaction_rules),
        ] {
            let mut individual = false;

            for rule in rules {
                if rule.kind != kind {
                    return Err(InvariantViolation::WrongPartition {
                        id: rule.id,
                        expected: kind,
                    });
                }
                if !seen.insert(rule.id) {
                    return Err(InvariantViolation::DuplicateId(rule.id));
                }
                if rule.id >= self.next_id {
                    return Err(InvariantViolation::IdNotAllocated {
                        id: rule.id,
                        next_id: self.next_id,
                    });
                }
                if rule.apply_to_all != rule.conditions.is_empty() {
                    return Err(InvariantViolation::MissingConditions(rule.id));
                }
                if !(rule.sample_rate > 0.0 && rule.sample_rate <= 1.0) {
                    return Err(InvariantViolation::InvalidSampleRate(rule.id));
                }

                if kind == RuleKind::Transaction {
                    if rule.tracing && individual {
                        return Err(InvariantViolation::TracingAfterIndividual { id: rule.id });
                    }
                    individual |= !rule.tracing;
                }
            }
        }

        Ok(())
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}
