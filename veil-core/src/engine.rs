//! The per-turn resolution pipeline.
//!
//! One player turn flows: free text → classifier → outcome resolver →
//! (separately) the evidence pass. The engine borrows the session's
//! [`CaseState`] for one call at a time and never performs I/O, so the
//! narrative-generation call downstream can fail or time out without
//! affecting anything decided here.

use crate::casefile::{ActionCategory, CaseDefinition, ActionId, TriggerId};
use crate::intent::{classify, PlayerActionIntent};
use crate::outcome::{ActionOutcome, OutcomeResolver};
use crate::rng::RandomSource;
use crate::state::{CaseState, EvidenceView};
use crate::unlocks::{
    check_contradictions, check_unlocks, select_trigger, ContradictionEvent, UnlockEvent,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recoverable engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An intent referenced an action id missing from the loaded catalog.
    /// Callers should treat this as ordinary narrative input.
    #[error("unknown action id `{0}`")]
    UnknownAction(ActionId),
}

/// What one turn produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnReport {
    /// The classified intent, if the input looked like an action at all.
    pub intent: Option<PlayerActionIntent>,
    pub outcome: ActionOutcome,
}

impl TurnReport {
    fn narrative() -> Self {
        Self {
            intent: None,
            outcome: ActionOutcome::no_match(),
        }
    }
}

/// Results of the evidence pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceReview {
    pub unlocks: Vec<UnlockEvent>,
    pub contradictions: Vec<ContradictionEvent>,
}

impl EvidenceReview {
    pub fn is_empty(&self) -> bool {
        self.unlocks.is_empty() && self.contradictions.is_empty()
    }
}

/// Wires the classifier, resolver, and rule engines into one pipeline.
pub struct ResolutionEngine {
    resolver: OutcomeResolver,
}

impl ResolutionEngine {
    pub fn new() -> Self {
        Self {
            resolver: OutcomeResolver::new(),
        }
    }

    /// Classify free text against the case's action catalog.
    pub fn classify(&self, case: &CaseDefinition, text: &str) -> Option<PlayerActionIntent> {
        classify(text, &case.actions)
    }

    /// Run one full turn: classify, resolve, apply the trust delta.
    ///
    /// Unrecognized input — and anything that cannot be resolved safely,
    /// like an invasive intent with no identifiable witness — degrades to a
    /// `NoMatch` outcome rather than an error.
    pub fn process_turn(
        &self,
        case: &CaseDefinition,
        state: &mut CaseState,
        text: &str,
        rng: &mut dyn RandomSource,
    ) -> TurnReport {
        let Some(intent) = self.classify(case, text) else {
            return TurnReport::narrative();
        };

        match self.resolve_intent(case, state, &intent, rng) {
            Ok(outcome) => TurnReport {
                intent: Some(intent),
                outcome,
            },
            Err(EngineError::UnknownAction(_)) => TurnReport {
                intent: Some(intent),
                outcome: ActionOutcome::no_match(),
            },
        }
    }

    /// Resolve an already-classified intent.
    ///
    /// The classifier only produces ids from the catalog, but intents can
    /// also arrive from replays or saved turns; an id the catalog no longer
    /// knows is reported rather than resolved.
    pub fn resolve_intent(
        &self,
        case: &CaseDefinition,
        state: &mut CaseState,
        intent: &PlayerActionIntent,
        rng: &mut dyn RandomSource,
    ) -> Result<ActionOutcome, EngineError> {
        let action = case
            .find_action(&intent.action)
            .ok_or_else(|| EngineError::UnknownAction(intent.action.clone()))?;

        let outcome = match action.category {
            ActionCategory::Benign => {
                let location = state.current_location.clone();
                self.resolver
                    .resolve_benign(action, intent, &location, &mut state.scopes, rng)
            }
            ActionCategory::Invasive => {
                let witness = intent
                    .target
                    .as_deref()
                    .and_then(|target| case.find_witness(target));
                match witness {
                    Some(witness) => self.resolver.resolve_invasive(
                        action,
                        intent,
                        witness,
                        &case.tuning,
                        &mut state.scopes,
                        rng,
                    ),
                    // No identifiable witness: treat as narrative input.
                    None => ActionOutcome::no_match(),
                }
            }
        };

        state.adjust_trust(outcome.trust_delta);
        Ok(outcome)
    }

    /// The independent pass over the evidence set.
    ///
    /// Run after discoveries change `state.discovered`. New unlocks and
    /// newly-met contradictions are recorded into the state, which is what
    /// makes repeated calls with unchanged evidence produce nothing.
    pub fn review_evidence(&self, case: &CaseDefinition, state: &mut CaseState) -> EvidenceReview {
        let unlocks = check_unlocks(&case.unlock_rules, &state.discovered, &state.unlocked);
        for event in &unlocks {
            state.unlocked.insert(event.hypothesis.clone());
        }

        let contradictions = check_contradictions(
            &case.contradiction_rules,
            &state.discovered,
            &state.active_hypotheses,
            &state.reported_contradictions,
        );
        for event in &contradictions {
            state.reported_contradictions.insert(event.contradiction.clone());
        }

        EvidenceReview {
            unlocks,
            contradictions,
        }
    }

    /// Pick a one-shot narrative trigger for the current state, if any.
    pub fn select_trigger(
        &self,
        case: &CaseDefinition,
        state: &mut CaseState,
        rng: &mut dyn RandomSource,
    ) -> Option<TriggerId> {
        let view = EvidenceView {
            discovered: &state.discovered,
            trust: state.trust,
        };
        select_trigger(
            &case.triggers,
            &mut state.triggers,
            &view,
            case.tuning.rare_trigger_chance,
            rng,
        )
    }
}

impl Default for ResolutionEngine {
    fn default() -> Self {
        Self::new()
    }
}
