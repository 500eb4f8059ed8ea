//! The persisted representation of a rule set.
//!
//! Rule sets are stored as a flat list of [`SamplingRule`]s, error rules first. Each rule carries a
//! single `and` condition whose inner conditions name the field they read:
//!
//! ```json
//! {
//!   "rules": [
//!     {
//!       "sampleRate": 0.2,
//!       "type": "error",
//!       "condition": {
//!         "op": "and",
//!         "inner": [{ "op": "glob", "name": "event.release", "value": ["1.2.3"] }]
//!       },
//!       "id": 1
//!     }
//!   ],
//!   "next_id": 2
//! }
//! ```

use std::fmt;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::condition::{Category, Condition, ConditionOptions, Operator};
use crate::rule::{Rule, RuleId, RuleKind, allowed_categories};
use crate::ruleset::RuleSet;
use crate::utils;
use crate::validation::{self, ValidationError};

/// The persisted sampling configuration of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// All rules, error rules first, each partition in evaluation order.
    pub rules: Vec<SamplingRule>,
    /// The id the next accepted rule will receive.
    pub next_id: RuleId,
}

impl SamplingConfig {
    /// Parses a configuration from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, ParseError> {
        serde_json::from_str(json).map_err(ParseError::Json)
    }

    /// Serializes the configuration to pretty printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Returns `true` if any of the rules in this configuration is unsupported.
    pub fn unsupported(&self) -> bool {
        !self.rules.iter().all(SamplingRule::supported)
    }
}

/// A persisted sampling rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingRule {
    /// The sample rate to apply when this rule matches.
    pub sample_rate: f64,

    /// Declares what the rule applies to and which fields it reads.
    #[serde(rename = "type")]
    pub ty: RuleType,

    /// The condition of the rule, always an [`RuleCondition::And`].
    pub condition: RuleCondition,

    /// The unique identifier of this rule.
    pub id: RuleId,
}

impl SamplingRule {
    fn supported(&self) -> bool {
        self.ty != RuleType::Unsupported && self.condition.supported()
    }
}

/// Defines what a persisted rule applies to.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum RuleType {
    /// An error rule.
    Error,
    /// An individual transaction rule, matching on the transaction event.
    Transaction,
    /// A tracing transaction rule, matching on the dynamic sampling context.
    Trace,
    /// A rule type written by a newer version.
    #[serde(other)]
    Unsupported,
}

impl RuleType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Transaction => "transaction",
            Self::Trace => "trace",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for [`EqCondition`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EqCondOptions {
    /// If `true`, string values are compared in case-insensitive mode.
    #[serde(default)]
    pub ignore_case: bool,
}

/// A condition that compares a field for equality with any of the values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqCondition {
    /// Path of the field that should match the value.
    pub name: String,

    /// The values to check against.
    ///
    /// A single string or boolean is accepted in place of a list when parsing.
    #[serde(deserialize_with = "deserialize_values")]
    pub value: Vec<String>,

    /// Configuration options for the condition.
    #[serde(default, skip_serializing_if = "utils::is_default")]
    pub options: EqCondOptions,
}

/// A condition that matches a field against glob patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobCondition {
    /// Path of the field that should match the value.
    pub name: String,
    /// A list of glob patterns to check.
    #[serde(deserialize_with = "deserialize_values")]
    pub value: Vec<String>,
}

/// A condition evaluated by a category specific predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomCondition {
    /// Path of the field the predicate reads.
    pub name: String,
    /// Values interpreted by the predicate.
    #[serde(deserialize_with = "deserialize_values")]
    pub value: Vec<String>,
}

/// Combines multiple conditions using logical `and`.
///
/// An empty list of conditions matches everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AndCondition {
    /// Inner rules to combine.
    pub inner: Vec<RuleCondition>,
}

/// A persisted condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "op")]
pub enum RuleCondition {
    /// A condition that compares values for equality.
    Eq(EqCondition),
    /// A condition that uses glob matching.
    Glob(GlobCondition),
    /// A condition with a category specific predicate.
    Custom(CustomCondition),
    /// Combines multiple conditions using logical `and`.
    And(AndCondition),
    /// An operator written by a newer version.
    #[serde(other)]
    Unsupported,
}

impl RuleCondition {
    /// Returns the operator name of this condition.
    pub fn op(&self) -> &'static str {
        match self {
            Self::Eq(_) => "eq",
            Self::Glob(_) => "glob",
            Self::Custom(_) => "custom",
            Self::And(_) => "and",
            Self::Unsupported => "unknown",
        }
    }

    /// Checks if the condition and all of its inner conditions are supported.
    pub fn supported(&self) -> bool {
        match self {
            Self::Unsupported => false,
            Self::And(and) => and.inner.iter().all(Self::supported),
            _ => true,
        }
    }
}

/// Persisted data that cannot be mapped onto the rule model.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The data is not valid JSON or does not have the expected shape.
    #[error("invalid sampling config")]
    Json(#[source] serde_json::Error),
    /// The rule has a type this version does not know.
    #[error("rule {id}: unsupported rule type")]
    UnsupportedRuleType {
        /// The id of the rule.
        id: RuleId,
    },
    /// A condition is not supported at its position.
    #[error("rule {id}: {op} condition is not supported here")]
    UnsupportedCondition {
        /// The id of the rule.
        id: RuleId,
        /// The operator of the condition.
        op: &'static str,
    },
    /// A condition reads a field that does not belong to any category.
    #[error("rule {id}: unknown field {name:?}")]
    UnknownField {
        /// The id of the rule.
        id: RuleId,
        /// The field name.
        name: String,
    },
    /// A condition reads an event field in a trace rule, or the other way around.
    #[error("rule {id}: field {name:?} cannot be used in a {ty} rule")]
    FieldMismatch {
        /// The id of the rule.
        id: RuleId,
        /// The field name.
        name: String,
        /// The type of the rule.
        ty: RuleType,
    },
    /// A condition uses an operator its field does not support.
    #[error("rule {id}: operator {op} is not supported for field {name:?}")]
    OperatorMismatch {
        /// The id of the rule.
        id: RuleId,
        /// The field name.
        name: String,
        /// The operator of the condition.
        op: &'static str,
    },
    /// A condition has no values or malformed values.
    #[error("rule {id}: invalid condition")]
    InvalidCondition {
        /// The id of the rule.
        id: RuleId,
        /// The problem with the condition.
        #[source]
        source: ValidationError,
    },
    /// The sample rate is outside of `(0.0, 1.0]`.
    #[error("rule {id}: invalid sample rate {sample_rate}")]
    InvalidSampleRate {
        /// The id of the rule.
        id: RuleId,
        /// The sample rate.
        sample_rate: f64,
    },
}

impl From<&Rule> for SamplingRule {
    fn from(rule: &Rule) -> Self {
        let tracing = rule.is_tracing();
        let ty = match rule.kind {
            RuleKind::Error => RuleType::Error,
            RuleKind::Transaction if tracing => RuleType::Trace,
            RuleKind::Transaction => RuleType::Transaction,
        };

        let inner = rule
            .conditions
            .iter()
            .map(|condition| {
                let category = condition.category;
                let name = category
                    .field_name(tracing)
                    .unwrap_or(category.event_field())
                    .to_owned();
                let value = condition.values.clone();

                match condition.operator {
                    Operator::Eq => RuleCondition::Eq(EqCondition {
                        name,
                        value,
                        options: EqCondOptions {
                            ignore_case: condition.options.ignore_case,
                        },
                    }),
                    Operator::Glob => RuleCondition::Glob(GlobCondition { name, value }),
                    Operator::Custom => RuleCondition::Custom(CustomCondition { name, value }),
                }
            })
            .collect();

        Self {
            sample_rate: rule.sample_rate,
            ty,
            condition: RuleCondition::And(AndCondition { inner }),
            id: rule.id,
        }
    }
}

impl TryFrom<&SamplingRule> for Rule {
    type Error = ParseError;

    fn try_from(rule: &SamplingRule) -> Result<Self, Self::Error> {
        let id = rule.id;
        let (kind, tracing) = match rule.ty {
            RuleType::Error => (RuleKind::Error, false),
            RuleType::Transaction => (RuleKind::Transaction, false),
            RuleType::Trace => (RuleKind::Transaction, true),
            RuleType::Unsupported => return Err(ParseError::UnsupportedRuleType { id }),
        };

        let RuleCondition::And(and) = &rule.condition else {
            return Err(ParseError::UnsupportedCondition {
                id,
                op: rule.condition.op(),
            });
        };

        let conditions = and
            .inner
            .iter()
            .enumerate()
            .map(|(index, inner)| parse_condition(id, rule.ty, kind, tracing, index, inner))
            .collect::<Result<Vec<_>, _>>()?;

        let sample_rate = rule.sample_rate;
        if !(sample_rate > 0.0 && sample_rate <= 1.0) {
            return Err(ParseError::InvalidSampleRate { id, sample_rate });
        }

        Ok(Rule {
            id,
            kind,
            tracing,
            apply_to_all: conditions.is_empty(),
            conditions,
            sample_rate,
        })
    }
}

fn parse_condition(
    id: RuleId,
    ty: RuleType,
    kind: RuleKind,
    tracing: bool,
    index: usize,
    condition: &RuleCondition,
) -> Result<Condition, ParseError> {
    let (operator, name, value, ignore_case) = match condition {
        RuleCondition::Eq(eq) => (Operator::Eq, &eq.name, &eq.value, eq.options.ignore_case),
        RuleCondition::Glob(glob) => (Operator::Glob, &glob.name, &glob.value, false),
        RuleCondition::Custom(custom) => (Operator::Custom, &custom.name, &custom.value, false),
        RuleCondition::And(_) | RuleCondition::Unsupported => {
            return Err(ParseError::UnsupportedCondition {
                id,
                op: condition.op(),
            });
        }
    };

    let Some((category, trace_field)) = Category::from_field_name(name) else {
        return Err(ParseError::UnknownField {
            id,
            name: name.clone(),
        });
    };

    if trace_field != tracing {
        return Err(ParseError::FieldMismatch {
            id,
            name: name.clone(),
            ty,
        });
    }

    if category.operator() != operator {
        return Err(ParseError::OperatorMismatch {
            id,
            name: name.clone(),
            op: condition.op(),
        });
    }

    let condition = Condition {
        category,
        operator,
        values: value.clone(),
        options: ConditionOptions { ignore_case },
    };

    validation::check_condition(index, &condition, allowed_categories(kind, tracing))
        .map_err(|source| ParseError::InvalidCondition { id, source })?;

    Ok(condition)
}

impl From<&RuleSet> for SamplingConfig {
    fn from(rule_set: &RuleSet) -> Self {
        Self {
            rules: rule_set.iter().map(SamplingRule::from).collect(),
            next_id: rule_set.next_id(),
        }
    }
}

impl TryFrom<&SamplingConfig> for RuleSet {
    type Error = ParseError;

    /// Maps the persisted rules onto a rule set.
    ///
    /// Rules are partitioned by kind, keeping their relative order. Ordering invariants are not
    /// checked here, see [`RuleSet::check_invariants`].
    fn try_from(config: &SamplingConfig) -> Result<Self, Self::Error> {
        let mut error_rules = Vec::new();
        let mut transaction_rules = Vec::new();

        for rule in &config.rules {
            let rule = Rule::try_from(rule)?;
            match rule.kind {
                RuleKind::Error => error_rules.push(rule),
                RuleKind::Transaction => transaction_rules.push(rule),
            }
        }

        Ok(RuleSet::from_parts(
            error_rules,
            transaction_rules,
            config.next_id,
        ))
    }
}

/// Parses a rule set from its persisted JSON representation.
pub fn parse_rule_set(json: &str) -> Result<RuleSet, ParseError> {
    RuleSet::try_from(&SamplingConfig::from_json(json)?)
}

/// Accepts a single string or boolean, or a list of them.
fn deserialize_values<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ValuesVisitor;

    impl<'de> Visitor<'de> for ValuesVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string, a boolean, or a list of them")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_owned()])
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(Value(value)) = seq.next_element()? {
                values.push(value);
            }
            Ok(values)
        }
    }

    struct Value(String);

    impl<'de> Deserialize<'de> for Value {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let mut values = deserializer.deserialize_any(ValuesVisitor)?;
            match (values.pop(), values.is_empty()) {
                (Some(value), true) => Ok(Value(value)),
                _ => Err(de::Error::custom("expected a string or a boolean")),
            }
        }
    }

    deserializer.deserialize_any(ValuesVisitor)
}
