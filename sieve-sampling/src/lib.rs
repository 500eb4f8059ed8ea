//! Dynamic sampling rules and their evaluation.
//!
//! A project keeps a [`RuleSet`]: an ordered list of [`Rule`]s that decide whether an incoming
//! event is kept or dropped. Each rule applies to either error events or transaction events, has a
//! list of [`Condition`]s that all have to match, and a sample rate.
//!
//! # Trace and Transaction Rules
//!
//! Transaction rules come in two flavors:
//! - **Tracing rules** match on the [`DynamicSamplingContext`](sieve_event::DynamicSamplingContext)
//!   of the event. All transactions of a trace share it, so either all of them are kept or none.
//! - **Individual transaction rules** match on the transaction event itself.
//!
//! Tracing rules always precede individual transaction rules. The first matching rule wins.
//!
//! # Components
//!
//! - [`Condition`]: a predicate over one event attribute, identified by its [`Category`].
//! - [`Rule`] and [`RuleSet`]: the model, with ids allocated by the rule set.
//! - [`validate_rule`]: turns a [`RuleCandidate`] into an [`AcceptedRule`] or reports all
//!   [`ValidationError`]s. [`allowed_categories`] lists the categories a rule may use.
//! - [`evaluate`]: finds the first matching rule and draws the sampling decision from a
//!   [`RandomSource`].
//! - [`ProjectSampling`]: the current snapshot of a project's rule set, swapped atomically after
//!   each validated change has been persisted through a [`RuleSetSink`].
//!
//! # Sampling Determinism
//!
//! With [`SeededRandom`], the random number is derived from the trace id for tracing rules and
//! from the event id otherwise. All transactions of a trace therefore get the same decision, and
//! evaluating the same event twice yields the same result.
//!
//! # Persisted Format
//!
//! ```json
#![doc = include_str!("../tests/fixtures/sampling_config.json")]
//! ```
#![warn(missing_docs)]

mod condition;
mod config;
mod evaluation;
mod persistence;
mod rule;
mod ruleset;
mod store;
mod utils;
mod validation;

pub use condition::*;
pub use config::*;
pub use evaluation::*;
pub use persistence::*;
pub use rule::*;
pub use ruleset::*;
pub use store::*;
pub use validation::*;
