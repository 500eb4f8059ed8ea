//! Validation of rule candidates against a project's rule set.
//!
//! A [`RuleCandidate`] is the editable, possibly incomplete form of a rule. Validation turns it
//! into an [`AcceptedRule`] with an assigned id, together with the rule set that results from
//! applying it. All problems are reported at once as [`ValidationErrors`], one per field.

use std::fmt;

use enumset::EnumSet;
use serde::{Deserialize, Serialize};
use sieve_common::validate_glob;
use sieve_filter::{LegacyBrowser, client_ips, csp};

use crate::condition::{Category, Condition, Operator};
use crate::rule::{Rule, RuleId, RuleKind, allowed_categories};
use crate::ruleset::RuleSet;

/// A rule as submitted for validation.
///
/// Every field may be missing or inconsistent. Changing the kind or the tracing flag through
/// [`set_kind`](Self::set_kind) and [`set_tracing`](Self::set_tracing) immediately drops
/// conditions that are no longer allowed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleCandidate {
    /// The kind of events the rule applies to.
    #[serde(rename = "type")]
    pub kind: Option<RuleKind>,
    /// For transaction rules, whether the rule matches on the trace.
    pub tracing: bool,
    /// Matches every event of the kind.
    pub apply_to_all: bool,
    /// Conditions that all have to match.
    pub conditions: Vec<Condition>,
    /// The probability of keeping a matching event.
    pub sample_rate: Option<f64>,
}

impl RuleCandidate {
    /// Creates an empty candidate for the given kind.
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Creates a candidate for editing an existing rule.
    pub fn from_rule(rule: &Rule) -> Self {
        Self {
            kind: Some(rule.kind),
            tracing: rule.tracing,
            apply_to_all: rule.apply_to_all,
            conditions: rule.conditions.clone(),
            sample_rate: Some(rule.sample_rate),
        }
    }

    /// Returns `true` if the candidate describes a tracing transaction rule.
    pub fn is_tracing(&self) -> bool {
        self.kind == Some(RuleKind::Transaction) && self.tracing
    }

    /// The categories conditions of this candidate may use.
    ///
    /// Without a kind, only categories allowed for every kind are returned.
    pub fn allowed_categories(&self) -> EnumSet<Category> {
        match self.kind {
            Some(kind) => allowed_categories(kind, self.tracing),
            None => {
                allowed_categories(RuleKind::Error, false)
                    & allowed_categories(RuleKind::Transaction, self.tracing)
            }
        }
    }

    /// The categories that can still be added as a new condition.
    pub fn offerable_categories(&self) -> EnumSet<Category> {
        let used: EnumSet<Category> = self.conditions.iter().map(|c| c.category).collect();
        self.allowed_categories() - used
    }

    /// Changes the tracing flag and returns the conditions that were dropped as a result.
    pub fn set_tracing(&mut self, tracing: bool) -> Vec<Condition> {
        self.tracing = tracing;
        self.drop_disallowed()
    }

    /// Changes the kind and returns the conditions that were dropped as a result.
    pub fn set_kind(&mut self, kind: RuleKind) -> Vec<Condition> {
        self.kind = Some(kind);
        self.drop_disallowed()
    }

    fn drop_disallowed(&mut self) -> Vec<Condition> {
        let allowed = self.allowed_categories();
        let (kept, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut self.conditions)
            .into_iter()
            .partition(|condition| allowed.contains(condition.category));
        self.conditions = kept;
        dropped
    }
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The rule has no kind.
    #[error("the rule type is required")]
    MissingKind,
    /// The rule has no conditions and does not apply to all events.
    #[error("at least one condition is required")]
    MissingConditions,
    /// The rule applies to all events but has conditions.
    #[error("a rule that applies to all events cannot have conditions")]
    ConditionsWithApplyToAll,
    /// A condition uses a category that is not allowed for the rule.
    #[error("condition {index}: category {category} is not allowed for this rule")]
    CategoryNotAllowed {
        /// Position of the condition.
        index: usize,
        /// The category of the condition.
        category: Category,
    },
    /// A condition uses an operator its category does not support.
    #[error("condition {index}: operator {operator} is not supported for {category}")]
    UnsupportedOperator {
        /// Position of the condition.
        index: usize,
        /// The category of the condition.
        category: Category,
        /// The configured operator.
        operator: Operator,
    },
    /// A condition has no values.
    #[error("condition {index}: {category} requires at least one value")]
    EmptyValues {
        /// Position of the condition.
        index: usize,
        /// The category of the condition.
        category: Category,
    },
    /// A condition value is malformed.
    #[error("condition {index}: invalid {category} value {value:?}: {reason}")]
    InvalidValue {
        /// Position of the condition.
        index: usize,
        /// The category of the condition.
        category: Category,
        /// The offending value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// The rule has no sample rate.
    #[error("the sample rate is required")]
    MissingSampleRate,
    /// The sample rate is outside of `(0.0, 1.0]`.
    #[error("the sample rate must be greater than 0 and at most 1, got {0}")]
    SampleRateOutOfRange(f64),
    /// A tracing rule would follow an individual transaction rule.
    #[error("tracing rule {id} cannot be ordered after individual transaction rules")]
    OrderingViolation {
        /// The misplaced tracing rule.
        id: RuleId,
    },
    /// There is no rule with the given id.
    #[error("rule {0} does not exist")]
    UnknownRule(RuleId),
    /// The rule set has handed out every id.
    #[error("no rule ids are left in this rule set")]
    IdsExhausted,
    /// A reorder does not list exactly the current rules.
    #[error("the new order must contain every {kind} rule exactly once")]
    ReorderMismatch {
        /// The kind of rules that were reordered.
        kind: RuleKind,
    },
}

impl ValidationError {
    /// The name of the field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingKind => "type",
            Self::MissingConditions
            | Self::ConditionsWithApplyToAll
            | Self::CategoryNotAllowed { .. }
            | Self::UnsupportedOperator { .. }
            | Self::EmptyValues { .. }
            | Self::InvalidValue { .. } => "conditions",
            Self::MissingSampleRate | Self::SampleRateOutOfRange(_) => "sampleRate",
            Self::OrderingViolation { .. } | Self::ReorderMismatch { .. } => "order",
            Self::UnknownRule(_) | Self::IdsExhausted => "id",
        }
    }
}

/// The complete list of problems found while validating a change.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Returns the individual errors.
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    /// Returns `true` if any error refers to the given field.
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|error| error.field() == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A validated rule together with the rule set that contains it.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedRule {
    /// The rule with its assigned id.
    pub rule: Rule,
    /// The new rule set snapshot.
    pub rule_set: RuleSet,
}

/// Validates a new rule and appends it to a copy of the rule set.
///
/// The rule receives the next id of the rule set. The given rule set is not modified.
pub fn validate_rule(
    candidate: &RuleCandidate,
    rule_set: &RuleSet,
) -> Result<AcceptedRule, ValidationErrors> {
    let mut rule_set = rule_set.clone();
    let rule = build_rule(rule_set.next_id(), candidate)?;

    if rule_set.allocate_id().is_none() {
        return Err(ValidationError::IdsExhausted.into());
    }
    rule_set.insert(rule.clone());
    check_ordering(&rule_set)?;

    Ok(AcceptedRule { rule, rule_set })
}

/// Validates a change to an existing rule.
///
/// The rule keeps its id and position, unless its kind or tracing status changes. In that case it
/// moves to the end of its new partition.
pub fn validate_update(
    id: RuleId,
    candidate: &RuleCandidate,
    rule_set: &RuleSet,
) -> Result<AcceptedRule, ValidationErrors> {
    if rule_set.get(id).is_none() {
        return Err(ValidationError::UnknownRule(id).into());
    }

    let rule = build_rule(id, candidate)?;
    let mut rule_set = rule_set.clone();
    rule_set.replace(rule.clone());
    check_ordering(&rule_set)?;

    Ok(AcceptedRule { rule, rule_set })
}

/// Validates a new order for the rules of one kind.
///
/// `order` must list every rule id of that kind exactly once. Returns the reordered rule set.
pub fn validate_reorder(
    rule_set: &RuleSet,
    kind: RuleKind,
    order: &[RuleId],
) -> Result<RuleSet, ValidationErrors> {
    let current = rule_set.rules(kind);
    if order.len() != current.len() {
        return Err(ValidationError::ReorderMismatch { kind }.into());
    }

    let mut remaining = current.to_vec();
    let mut rules = Vec::with_capacity(order.len());
    for id in order {
        let Some(index) = remaining.iter().position(|rule| rule.id == *id) else {
            return Err(ValidationError::ReorderMismatch { kind }.into());
        };
        rules.push(remaining.swap_remove(index));
    }

    let mut rule_set = rule_set.clone();
    rule_set.set_rules(kind, rules);
    check_ordering(&rule_set)?;

    Ok(rule_set)
}

fn build_rule(id: RuleId, candidate: &RuleCandidate) -> Result<Rule, ValidationErrors> {
    let mut errors = Vec::new();

    if candidate.kind.is_none() {
        errors.push(ValidationError::MissingKind);
    }

    let tracing = candidate.is_tracing();
    if candidate.apply_to_all {
        if !candidate.conditions.is_empty() {
            errors.push(ValidationError::ConditionsWithApplyToAll);
        }
    } else if candidate.conditions.is_empty() {
        errors.push(ValidationError::MissingConditions);
    } else {
        let allowed = candidate.allowed_categories();
        for (index, condition) in candidate.conditions.iter().enumerate() {
            if let Err(error) = check_condition(index, condition, allowed) {
                errors.push(error);
            }
        }
    }

    match candidate.sample_rate {
        None => errors.push(ValidationError::MissingSampleRate),
        Some(rate) if !(rate.is_finite() && rate > 0.0 && rate <= 1.0) => {
            errors.push(ValidationError::SampleRateOutOfRange(rate));
        }
        Some(_) => (),
    }

    match (candidate.kind, candidate.sample_rate) {
        (Some(kind), Some(sample_rate)) if errors.is_empty() => Ok(Rule {
            id,
            kind,
            tracing,
            apply_to_all: candidate.apply_to_all,
            conditions: candidate.conditions.clone(),
            sample_rate,
        }),
        _ => Err(ValidationErrors(errors)),
    }
}

pub(crate) fn check_condition(
    index: usize,
    condition: &Condition,
    allowed: EnumSet<Category>,
) -> Result<(), ValidationError> {
    let category = condition.category;

    if !allowed.contains(category) {
        return Err(ValidationError::CategoryNotAllowed { index, category });
    }

    if condition.operator != category.operator() {
        return Err(ValidationError::UnsupportedOperator {
            index,
            category,
            operator: condition.operator,
        });
    }

    if condition.values.is_empty() {
        return Err(ValidationError::EmptyValues { index, category });
    }

    for value in &condition.values {
        if let Err(reason) = check_value(category, value) {
            return Err(ValidationError::InvalidValue {
                index,
                category,
                value: value.clone(),
                reason,
            });
        }
    }

    Ok(())
}

fn check_value(category: Category, value: &str) -> Result<(), String> {
    match category {
        Category::Release | Category::Transactions | Category::ErrorMessages => {
            validate_glob(value).map_err(|e| e.reason().to_owned())
        }
        Category::Environment | Category::UserId | Category::UserSegment => {
            if value.is_empty() {
                Err("value must not be empty".to_owned())
            } else {
                Ok(())
            }
        }
        Category::BrowserExtensions | Category::Localhost | Category::WebCrawlers => value
            .parse::<bool>()
            .map(|_| ())
            .map_err(|_| "expected true or false".to_owned()),
        Category::LegacyBrowsers => {
            if LegacyBrowser::from(value).is_known() {
                Ok(())
            } else {
                Err("unknown browser".to_owned())
            }
        }
        Category::IpAddresses => {
            if client_ips::is_valid_network(value) {
                Ok(())
            } else {
                Err("expected an IP address or network".to_owned())
            }
        }
        Category::ContentSecurityPolicy => {
            if csp::is_valid_origin(value) {
                Ok(())
            } else {
                Err("expected an origin".to_owned())
            }
        }
    }
}

fn check_ordering(rule_set: &RuleSet) -> Result<(), ValidationErrors> {
    let mut individual = false;
    for rule in rule_set.transaction_rules() {
        if rule.tracing && individual {
            return Err(ValidationError::OrderingViolation { id: rule.id }.into());
        }
        individual |= !rule.tracing;
    }
    Ok(())
}
