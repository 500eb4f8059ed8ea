//! Sampling rules and the categories they may use.

use std::fmt;

use enumset::{EnumSet, enum_set};
use serde::{Deserialize, Serialize};
use sieve_event::Event;

use crate::condition::{Category, Condition};

/// The kind of events a [`Rule`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Applies to every event that is not a transaction.
    Error,
    /// Applies to transaction events.
    Transaction,
}

impl RuleKind {
    /// Returns the lowercase name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Transaction => "transaction",
        }
    }

    /// Returns the kind of rules that sample the given event.
    pub fn for_event(event: &Event) -> Self {
        if event.ty.is_transaction() {
            Self::Transaction
        } else {
            Self::Error
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identifier of a [`Rule`].
///
/// Ids are assigned by the owning [`RuleSet`](crate::RuleSet) and are never reused, so they can be
/// recorded alongside sampling decisions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct RuleId(pub u32);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Categories available on traces, and thereby to tracing rules.
pub const TRACE_CATEGORIES: EnumSet<Category> = enum_set!(
    Category::Release
        | Category::Environment
        | Category::UserId
        | Category::UserSegment
        | Category::Transactions
);

/// Returns the categories a rule of the given kind may use.
///
/// Error rules and individual transaction rules may use every category. Tracing transaction rules
/// only see the dynamic sampling context and are limited to [`TRACE_CATEGORIES`]. The `tracing`
/// flag has no effect on error rules.
pub fn allowed_categories(kind: RuleKind, tracing: bool) -> EnumSet<Category> {
    match (kind, tracing) {
        (RuleKind::Transaction, true) => TRACE_CATEGORIES,
        _ => EnumSet::all(),
    }
}

/// An accepted sampling rule.
///
/// Rules are created through [`validate_rule`](crate::validate_rule), which assigns the id and
/// guarantees that the rule is well formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// The unique identifier of this rule.
    pub id: RuleId,
    /// The kind of events this rule applies to.
    pub kind: RuleKind,
    /// For transaction rules, whether the rule matches on the trace instead of the transaction.
    pub tracing: bool,
    /// Matches every event of the kind, in which case there are no conditions.
    pub apply_to_all: bool,
    /// Conditions that all have to match.
    pub conditions: Vec<Condition>,
    /// The probability of keeping a matching event, in `(0.0, 1.0]`.
    pub sample_rate: f64,
}

impl Rule {
    /// Returns `true` if this is a tracing transaction rule.
    pub fn is_tracing(&self) -> bool {
        self.kind == RuleKind::Transaction && self.tracing
    }

    /// Returns `true` if the rule matches the event.
    ///
    /// Tracing rules match on the event's dynamic sampling context and never match events without
    /// one.
    pub fn matches(&self, event: &Event) -> bool {
        let tracing = self.is_tracing();
        if tracing && event.dsc().is_none() {
            return false;
        }

        self.apply_to_all
            || self
                .conditions
                .iter()
                .all(|condition| condition.matches(event, tracing))
    }
}
