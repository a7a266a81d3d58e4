//! Hypothesis unlocks, contradiction checks, and one-shot trigger selection.
//!
//! These run as a separate pass after the evidence set changes, independent
//! of action resolution. All three operations are idempotent with respect to
//! their "already happened" sets: unlocked hypotheses are skipped, reported
//! contradictions are not re-reported, fired triggers are never re-selected.

use crate::casefile::{ContradictionId, EvidenceId, HypothesisId, TriggerId};
use crate::condition::{ConditionExpression, EvalContext};
use crate::rng::RandomSource;
use crate::scope::TriggerRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How an unlock path combines its evidence ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathKind {
    /// Satisfied by any one listed id.
    AnyOf,
    /// Satisfied only by all listed ids.
    AllOf,
}

/// One of several alternative evidence combinations that unlock a hypothesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockPath {
    pub kind: PathKind,
    pub evidence: Vec<EvidenceId>,
}

impl UnlockPath {
    pub fn any_of(evidence: impl IntoIterator<Item = EvidenceId>) -> Self {
        Self {
            kind: PathKind::AnyOf,
            evidence: evidence.into_iter().collect(),
        }
    }

    pub fn all_of(evidence: impl IntoIterator<Item = EvidenceId>) -> Self {
        Self {
            kind: PathKind::AllOf,
            evidence: evidence.into_iter().collect(),
        }
    }

    /// Check this path against the discovered evidence set.
    pub fn satisfied_by(&self, discovered: &HashSet<EvidenceId>) -> bool {
        match self.kind {
            PathKind::AnyOf => self.evidence.iter().any(|id| discovered.contains(id)),
            PathKind::AllOf => self.evidence.iter().all(|id| discovered.contains(id)),
        }
    }
}

/// Unlock rule for a single hypothesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypothesisUnlockRule {
    pub hypothesis: HypothesisId,

    /// Priority bucket; higher tiers are later-game hypotheses.
    pub tier: u8,

    pub paths: Vec<UnlockPath>,
}

impl HypothesisUnlockRule {
    pub fn new(hypothesis: impl Into<String>, tier: u8) -> Self {
        Self {
            hypothesis: HypothesisId::new(hypothesis),
            tier,
            paths: Vec::new(),
        }
    }

    pub fn with_path(mut self, path: UnlockPath) -> Self {
        self.paths.push(path);
        self
    }
}

/// Fires when all listed evidence is discovered while the named hypothesis
/// is still active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContradictionRule {
    pub id: ContradictionId,
    pub hypothesis: HypothesisId,
    pub evidence: Vec<EvidenceId>,
    pub description: String,
}

impl ContradictionRule {
    pub fn new(
        id: impl Into<String>,
        hypothesis: impl Into<String>,
        evidence: impl IntoIterator<Item = EvidenceId>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: ContradictionId::new(id),
            hypothesis: HypothesisId::new(hypothesis),
            evidence: evidence.into_iter().collect(),
            description: description.into(),
        }
    }
}

/// A one-shot narrative event (secret reveal, rare voice line).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeTrigger {
    pub id: TriggerId,

    /// Priority bucket; the highest tier with an eligible candidate wins.
    pub tier: u8,

    /// Rare triggers are preferred only on a low-probability roll.
    pub rare: bool,

    /// Optional gate; `None` is always satisfied.
    pub condition: Option<ConditionExpression>,
}

impl NarrativeTrigger {
    pub fn new(id: impl Into<String>, tier: u8) -> Self {
        Self {
            id: TriggerId::new(id),
            tier,
            rare: false,
            condition: None,
        }
    }

    pub fn rare(mut self) -> Self {
        self.rare = true;
        self
    }

    pub fn with_condition(mut self, condition: ConditionExpression) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// A hypothesis became available this pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockEvent {
    pub hypothesis: HypothesisId,
    pub tier: u8,
    /// Which declared path satisfied the rule.
    pub path_index: usize,
}

/// A contradiction condition transitioned from unmet to met.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContradictionEvent {
    pub contradiction: ContradictionId,
    pub hypothesis: HypothesisId,
    pub description: String,
}

/// Evaluate unlock rules against the discovered evidence set.
///
/// Paths are tested in declaration order and the first satisfied path wins;
/// at most one event per hypothesis per call. Already-unlocked hypotheses
/// are skipped entirely, so calling twice with unchanged evidence produces
/// no duplicate events.
pub fn check_unlocks(
    rules: &[HypothesisUnlockRule],
    discovered: &HashSet<EvidenceId>,
    already_unlocked: &HashSet<HypothesisId>,
) -> Vec<UnlockEvent> {
    let mut events = Vec::new();
    let mut seen_this_call = HashSet::new();

    for rule in rules {
        if already_unlocked.contains(&rule.hypothesis) || seen_this_call.contains(&rule.hypothesis)
        {
            continue;
        }

        if let Some(path_index) = rule
            .paths
            .iter()
            .position(|path| path.satisfied_by(discovered))
        {
            seen_this_call.insert(rule.hypothesis.clone());
            events.push(UnlockEvent {
                hypothesis: rule.hypothesis.clone(),
                tier: rule.tier,
                path_index,
            });
        }
    }

    events
}

/// Evaluate contradiction rules against the discovered evidence set.
///
/// A rule fires when every listed evidence id is discovered, its hypothesis
/// is still active, and it has not been reported before. Callers pass the
/// previously-fired set back in so a met condition is reported exactly once.
pub fn check_contradictions(
    rules: &[ContradictionRule],
    discovered: &HashSet<EvidenceId>,
    active_hypotheses: &HashSet<HypothesisId>,
    already_fired: &HashSet<ContradictionId>,
) -> Vec<ContradictionEvent> {
    rules
        .iter()
        .filter(|rule| !already_fired.contains(&rule.id))
        .filter(|rule| active_hypotheses.contains(&rule.hypothesis))
        .filter(|rule| rule.evidence.iter().all(|id| discovered.contains(id)))
        .map(|rule| ContradictionEvent {
            contradiction: rule.id.clone(),
            hypothesis: rule.hypothesis.clone(),
            description: rule.description.clone(),
        })
        .collect()
}

/// Select a one-shot trigger, if any is eligible, and mark it fired.
///
/// Eligible means unfired with a satisfied (or absent) condition. The
/// highest tier containing an eligible candidate is chosen; within it, a
/// `rare_chance` roll prefers the rare pool when a regular fallback exists,
/// and the final pick within a pool is uniform.
pub fn select_trigger(
    candidates: &[NarrativeTrigger],
    fired: &mut TriggerRecord,
    ctx: &impl EvalContext,
    rare_chance: f64,
    rng: &mut dyn RandomSource,
) -> Option<TriggerId> {
    let eligible: Vec<&NarrativeTrigger> = candidates
        .iter()
        .filter(|t| !fired.has_fired(&t.id))
        .filter(|t| t.condition.as_ref().map_or(true, |c| c.evaluate(ctx)))
        .collect();

    let top_tier = eligible.iter().map(|t| t.tier).max()?;
    let tier_pool: Vec<&NarrativeTrigger> =
        eligible.into_iter().filter(|t| t.tier == top_tier).collect();

    let (rares, regulars): (Vec<&NarrativeTrigger>, Vec<&NarrativeTrigger>) =
        tier_pool.into_iter().partition(|t| t.rare);

    let pool = if !rares.is_empty() && (regulars.is_empty() || rng.uniform() < rare_chance) {
        rares
    } else {
        regulars
    };

    let chosen = pool[rng.pick_index(pool.len())];
    fired.mark_fired(chosen.id.clone());
    Some(chosen.id.clone())
}
