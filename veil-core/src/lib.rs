//! Action resolution engine for the Veil occult-investigation game.
//!
//! This crate provides:
//! - Free-text intent classification against a case's action catalog
//! - Probabilistic outcome resolution with per-location and per-witness decay
//! - A trigger condition mini-language, compiled at case-load time
//! - Hypothesis unlock and contradiction evaluation over discovered evidence
//!
//! The engine is a pure function of (input text, case state, case content):
//! it performs no I/O, holds no global state, and draws randomness only
//! through an injected [`RandomSource`]. Prose rendering, transport, and
//! persistence live in the embedding application.
//!
//! # Quick Start
//!
//! ```
//! use veil_core::{CaseState, ResolutionEngine};
//! use veil_core::rng::seeded_source;
//! use veil_core::testing::sample_case;
//!
//! let case = sample_case();
//! let mut state = CaseState::new("archive");
//! let engine = ResolutionEngine::new();
//! let mut rng = seeded_source(7);
//!
//! let report = engine.process_turn(&case, &mut state, "cast revelara on the desk", &mut rng);
//! assert!(report.intent.is_some());
//!
//! // After evidence changes, run the independent evidence pass.
//! let review = engine.review_evidence(&case, &mut state);
//! assert!(review.unlocks.is_empty());
//! ```

pub mod casefile;
pub mod condition;
pub mod engine;
pub mod intent;
pub mod outcome;
pub mod rng;
pub mod scope;
pub mod state;
pub mod testing;
pub mod unlocks;

// Primary public API
pub use casefile::{
    ActionCategory, ActionDefinition, ActionId, CaseCache, CaseDefinition, CaseId, CaseLoadError,
    CaseTuning, ContradictionId, EvidenceId, HypothesisId, LocationId, TriggerId, WitnessId,
    WitnessProfile,
};
pub use condition::{ConditionError, ConditionExpression, EvalContext};
pub use engine::{EngineError, EvidenceReview, ResolutionEngine, TurnReport};
pub use intent::{classify, extract_intent, extract_target, PlayerActionIntent};
pub use outcome::{ActionOutcome, OutcomeKind, OutcomeResolver};
pub use rng::RandomSource;
pub use scope::{ScopeKey, ScopeTracker, TriggerRecord};
pub use state::CaseState;
pub use unlocks::{
    check_contradictions, check_unlocks, select_trigger, ContradictionEvent, ContradictionRule,
    HypothesisUnlockRule, NarrativeTrigger, UnlockEvent, UnlockPath,
};
