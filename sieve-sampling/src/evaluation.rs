//! Evaluation of sampling rules against an event.

use std::fmt;

use rand::Rng;
use rand_pcg::Pcg32;
use serde::Serialize;
use sieve_event::Event;
use uuid::Uuid;

use crate::rule::{Rule, RuleKind};
use crate::ruleset::{InvariantViolation, RuleSet};

/// A source of random numbers in `[0.0, 1.0)` for sampling decisions.
///
/// The seed is the trace id for tracing rules and the event id otherwise. Sources may use it to
/// make decisions reproducible.
pub trait RandomSource {
    /// Returns a random number in `[0.0, 1.0)`.
    fn random(&self, seed: Uuid) -> f64;
}

impl<T: RandomSource + ?Sized> RandomSource for &T {
    fn random(&self, seed: Uuid) -> f64 {
        (**self).random(seed)
    }
}

impl<T: RandomSource + ?Sized> RandomSource for Box<T> {
    fn random(&self, seed: Uuid) -> f64 {
        (**self).random(seed)
    }
}

/// Derives the random number from the seed with a PCG32 generator.
///
/// The same seed always yields the same number, so all events of a trace get the same decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeededRandom;

impl RandomSource for SeededRandom {
    fn random(&self, seed: Uuid) -> f64 {
        pseudo_random_from_uuid(seed)
    }
}

/// Draws from the thread local entropy backed generator and ignores the seed.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntropyRandom;

impl RandomSource for EntropyRandom {
    fn random(&self, _seed: Uuid) -> f64 {
        rand::rng().random()
    }
}

/// Always returns the same number.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn random(&self, _seed: Uuid) -> f64 {
        self.0
    }
}

fn pseudo_random_from_uuid(id: Uuid) -> f64 {
    let big_seed = id.as_u128();
    let mut generator = Pcg32::new((big_seed >> 64) as u64, big_seed as u64);
    generator.random()
}

/// Whether a matched event is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingDecision {
    /// The event is kept.
    Keep,
    /// The event is dropped.
    Drop,
}

impl SamplingDecision {
    /// Returns `true` if the event is kept.
    pub fn is_keep(self) -> bool {
        self == Self::Keep
    }

    /// Returns `true` if the event is dropped.
    pub fn is_drop(self) -> bool {
        self == Self::Drop
    }
}

impl fmt::Display for SamplingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Keep => "keep",
            Self::Drop => "drop",
        })
    }
}

/// The first rule that matched an event and the resulting decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplingMatch<'a> {
    rule: &'a Rule,
    seed: Uuid,
    random: f64,
    decision: SamplingDecision,
}

impl<'a> SamplingMatch<'a> {
    /// The matching rule.
    pub fn rule(&self) -> &'a Rule {
        self.rule
    }

    /// The sample rate of the matching rule.
    pub fn sample_rate(&self) -> f64 {
        self.rule.sample_rate
    }

    /// The seed passed to the random source.
    pub fn seed(&self) -> Uuid {
        self.seed
    }

    /// The random number drawn for the decision.
    pub fn random(&self) -> f64 {
        self.random
    }

    /// Whether the event is kept or dropped.
    pub fn decision(&self) -> SamplingDecision {
        self.decision
    }

    /// Returns true if event should be kept.
    pub fn should_keep(&self) -> bool {
        self.decision.is_keep()
    }

    /// Returns true if event should be dropped.
    pub fn should_drop(&self) -> bool {
        self.decision.is_drop()
    }
}

/// Finds the first rule matching the event and decides whether to keep it.
///
/// Transaction events are matched against the transaction rules, all other events against the
/// error rules. Rules are tried in order and the first match wins. The event is kept if the random
/// number is below the rule's sample rate.
///
/// Returns `Ok(None)` if no rule matches, in which case the caller applies its default. The same
/// applies to events without a seed: tracing rules need the trace id of the sampling context or
/// the event id, all other rules the event id. Rule sets that violate their structural invariants
/// are not evaluated.
pub fn evaluate<'a, R>(
    event: &Event,
    rule_set: &'a RuleSet,
    random_source: &R,
) -> Result<Option<SamplingMatch<'a>>, InvariantViolation>
where
    R: RandomSource + ?Sized,
{
    rule_set.check_invariants()?;

    let kind = RuleKind::for_event(event);
    let Some(rule) = rule_set.rules(kind).iter().find(|rule| rule.matches(event)) else {
        sieve_log::trace!(%kind, "no sampling rule matched");
        return Ok(None);
    };

    let seed = match (rule.is_tracing(), event.dsc()) {
        (true, Some(dsc)) => Some(dsc.trace_id),
        _ => event.event_id,
    };
    let Some(seed) = seed else {
        sieve_log::trace!(rule_id = %rule.id, "matching event has no id to seed the decision");
        return Ok(None);
    };

    let random = random_source.random(seed);
    let decision = if random < rule.sample_rate {
        SamplingDecision::Keep
    } else {
        SamplingDecision::Drop
    };

    sieve_log::trace!(
        rule_id = %rule.id,
        sample_rate = rule.sample_rate,
        random,
        %decision,
        "applying dynamic sampling to matching event"
    );

    Ok(Some(SamplingMatch {
        rule,
        seed,
        random,
        decision,
    }))
}
