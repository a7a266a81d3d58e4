//! Testing utilities for the resolution engine.
//!
//! This module provides tools for deterministic testing:
//! - [`ScriptedRandom`] replaces the RNG with queued draws
//! - [`sample_case`] builds a small, complete case in code
//!
//! Both are used by the crate's own test suites and are exported for
//! embedding applications that want scripted engine behavior in their
//! tests.

use crate::casefile::{
    ActionCategory, ActionDefinition, CaseDefinition, EvidenceId, WitnessProfile,
};
use crate::condition::ConditionExpression;
use crate::rng::RandomSource;
use crate::unlocks::{ContradictionRule, HypothesisUnlockRule, NarrativeTrigger, UnlockPath};
use std::collections::VecDeque;

/// A random source that returns scripted values in order.
///
/// When a queue runs dry, `uniform` falls back to 0.5 and `pick_index` to 0,
/// so an under-scripted test fails visibly on a mid-probability draw rather
/// than panicking.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    uniforms: VecDeque<f64>,
    indices: VecDeque<usize>,
}

impl ScriptedRandom {
    /// Create a source with scripted uniform draws.
    pub fn new(uniforms: impl IntoIterator<Item = f64>) -> Self {
        Self {
            uniforms: uniforms.into_iter().collect(),
            indices: VecDeque::new(),
        }
    }

    /// Add scripted index picks.
    pub fn with_indices(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.indices = indices.into_iter().collect();
        self
    }
}

impl RandomSource for ScriptedRandom {
    fn uniform(&mut self) -> f64 {
        self.uniforms.pop_front().unwrap_or(0.5)
    }

    fn pick_index(&mut self, len: usize) -> usize {
        self.indices
            .pop_front()
            .unwrap_or(0)
            .min(len.saturating_sub(1))
    }
}

/// Build the "frozen archive" sample case used across the test suites.
///
/// Two actions (a benign revealing charm and an invasive mind-delve), one
/// witness, two hypotheses with multi-path unlocks, one contradiction, and
/// a small trigger ladder.
pub fn sample_case() -> CaseDefinition {
    CaseDefinition::new("frozen_archive")
        .with_action(
            ActionDefinition::new("reveal_charm", "revelara", ActionCategory::Benign)
                .with_phrase("cast revelara")
                .with_phrase("reveal charm")
                .with_synonym("make the hidden visible"),
        )
        .with_action(
            ActionDefinition::new("mind_delve", "mentis", ActionCategory::Invasive)
                .with_phrase("cast mentis")
                .with_synonym("read her mind")
                .with_synonym("read his mind")
                .with_synonym("peer into her thoughts"),
        )
        .with_witness(
            WitnessProfile::new("marta", "Marta Hale", 50).with_alias("groundskeeper"),
        )
        .with_witness(WitnessProfile::new("edwin", "Edwin Voss", 80).with_alias("archivist"))
        .with_condition(
            "archive_secret",
            ConditionExpression::parse("evidence:frost_pattern OR trust>70").unwrap(),
        )
        .with_unlock_rule(
            HypothesisUnlockRule::new("inside_job", 1)
                .with_path(UnlockPath::any_of([
                    EvidenceId::new("torn_ledger"),
                    EvidenceId::new("cellar_key"),
                ]))
                .with_path(UnlockPath::all_of([
                    EvidenceId::new("frost_pattern"),
                    EvidenceId::new("witness_account"),
                ])),
        )
        .with_unlock_rule(
            HypothesisUnlockRule::new("outsider", 2).with_path(UnlockPath::all_of([
                EvidenceId::new("frost_pattern"),
                EvidenceId::new("forced_gate"),
            ])),
        )
        .with_contradiction_rule(ContradictionRule::new(
            "ledger_vs_outsider",
            "outsider",
            [
                EvidenceId::new("torn_ledger"),
                EvidenceId::new("cellar_key"),
            ],
            "The ledger places the thief inside before the gate froze over.",
        ))
        .with_trigger(
            NarrativeTrigger::new("cold_whisper", 2)
                .with_condition(ConditionExpression::parse("evidence_count>=2").unwrap()),
        )
        .with_trigger(
            NarrativeTrigger::new("archive_hum", 1)
                .rare()
                .with_condition(ConditionExpression::parse("evidence_count>=1").unwrap()),
        )
        .with_trigger(NarrativeTrigger::new("first_step", 1))
}
