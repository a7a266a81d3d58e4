//! Probabilistic outcome resolution.
//!
//! Two outcome families share one shape: benign exploration actions decay
//! per location and reset on travel; invasive mind-delving decays per
//! witness for the whole case and carries an independent detection draw.
//! Every probability is clamped to its floor/cap before sampling, and every
//! attempt increments its scope counter whether or not it succeeds.

use crate::casefile::{ActionDefinition, CaseTuning, LocationId, WitnessProfile};
use crate::intent::PlayerActionIntent;
use crate::rng::RandomSource;
use crate::scope::{ScopeKey, ScopeTracker};
use serde::{Deserialize, Serialize};

// ============================================================================
// Probability constants
// ============================================================================

/// Benign actions: starting success rate at a fresh location.
pub const BENIGN_BASE_RATE: f64 = 0.70;
/// Benign actions: success floor under repeated attempts.
pub const BENIGN_FLOOR: f64 = 0.10;
/// Benign actions: success cap with every bonus applied.
pub const BENIGN_CAP: f64 = 0.90;
/// Bonus for naming a target ("on the desk").
pub const TARGET_BONUS: f64 = 0.10;
/// Bonus for stating a clear intent.
pub const CLARITY_BONUS: f64 = 0.10;

/// Invasive actions: starting success rate.
pub const INVASIVE_BASE_RATE: f64 = 0.30;
/// Invasive actions: success floor under repeated attempts.
pub const INVASIVE_FLOOR: f64 = 0.10;
/// Bonus for a clearly-phrased intrusion goal.
pub const INTENT_BONUS: f64 = 0.30;

/// Per-attempt decline within a scope, both families.
pub const ATTEMPT_DECLINE: f64 = 0.10;

/// Detection: base chance a witness notices an intrusion.
pub const DETECTION_BASE: f64 = 0.20;
/// Detection: weight of witness skill (skill 100 adds this much).
pub const SKILL_WEIGHT: f64 = 0.30;
/// Detection: penalty once a witness has caught the player before.
pub const REPEAT_PENALTY: f64 = 0.20;
/// Detection: hard cap.
pub const DETECTION_CAP: f64 = 0.95;

/// Flag emitted when a witness catches an intrusion.
pub const FLAG_RELATIONSHIP_DAMAGED: &str = "relationship_damaged";

// ============================================================================
// Outcome type
// ============================================================================

/// What actually happened this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeKind {
    Success,
    Failure,
    /// Not an action; ordinary narrative input.
    NoMatch,
}

/// The engine's sole return type for a resolved action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub kind: OutcomeKind,
    pub target: Option<String>,
    pub detected: bool,
    pub trust_delta: i32,
    pub flags: Vec<String>,
}

impl ActionOutcome {
    /// The outcome for input that resolved to no action at all.
    pub fn no_match() -> Self {
        Self {
            kind: OutcomeKind::NoMatch,
            target: None,
            detected: false,
            trust_delta: 0,
            flags: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.kind == OutcomeKind::Success
    }

    pub fn is_no_match(&self) -> bool {
        self.kind == OutcomeKind::NoMatch
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

// ============================================================================
// Rate formulas
// ============================================================================

/// Success rate for a benign action after `attempts` tries at the current
/// location. Decay is expected to push the raw value under the floor; the
/// clamp is the designed landing point, not an error path.
pub fn benign_success_rate(attempts: u32, has_target: bool, has_intent: bool) -> f64 {
    let bonus = if has_target { TARGET_BONUS } else { 0.0 }
        + if has_intent { CLARITY_BONUS } else { 0.0 };
    let undeclined = checked_rate(BENIGN_BASE_RATE + bonus, "benign base plus bonuses");
    (undeclined - attempts as f64 * ATTEMPT_DECLINE).clamp(BENIGN_FLOOR, BENIGN_CAP)
}

/// Success rate for an invasive action after `attempts` tries against the
/// witness. The cap comes from case tuning (validated at load).
pub fn invasive_success_rate(attempts: u32, has_intent: bool, cap: f64) -> f64 {
    let bonus = if has_intent { INTENT_BONUS } else { 0.0 };
    let undeclined = checked_rate(INVASIVE_BASE_RATE + bonus, "invasive base plus bonus");
    (undeclined - attempts as f64 * ATTEMPT_DECLINE).clamp(INVASIVE_FLOOR, cap)
}

/// Chance the witness notices the intrusion, independent of success.
pub fn detection_rate(skill: u8, previously_detected: bool) -> f64 {
    let skill_modifier = (skill as f64 / 100.0) * SKILL_WEIGHT;
    let repeat = if previously_detected { REPEAT_PENALTY } else { 0.0 };
    let raw = checked_rate(DETECTION_BASE + skill_modifier + repeat, "detection sum");
    raw.clamp(0.0, DETECTION_CAP)
}

/// Guard for configuration-derived rate components. A value outside `[0, 1]`
/// here means broken content or formula constants: clamp, log, and trip a
/// debug assertion so tests catch it.
fn checked_rate(raw: f64, what: &str) -> f64 {
    if !(0.0..=1.0).contains(&raw) {
        tracing::warn!(rate = raw, component = what, "probability outside [0, 1], clamping");
        debug_assert!(false, "{what} produced out-of-range rate {raw}");
        return raw.clamp(0.0, 1.0);
    }
    raw
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves classified intents into outcomes.
pub struct OutcomeResolver;

impl OutcomeResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a location-scoped benign action.
    pub fn resolve_benign(
        &self,
        action: &ActionDefinition,
        intent: &PlayerActionIntent,
        location: &LocationId,
        scopes: &mut ScopeTracker,
        rng: &mut dyn RandomSource,
    ) -> ActionOutcome {
        let key = ScopeKey::location(location.clone(), action.id.clone());
        let attempts = scopes.attempts(&key);
        let rate = benign_success_rate(
            attempts,
            intent.target.is_some(),
            intent.intent_phrase.is_some(),
        );

        let success = rng.uniform() < rate;
        scopes.increment(key);

        ActionOutcome {
            kind: if success {
                OutcomeKind::Success
            } else {
                OutcomeKind::Failure
            },
            target: intent.target.clone(),
            detected: false,
            trust_delta: 0,
            flags: Vec::new(),
        }
    }

    /// Resolve a witness-scoped invasive action.
    ///
    /// Success and detection are independent draws; a failed delve can still
    /// be noticed. Witness counters survive location changes by design.
    pub fn resolve_invasive(
        &self,
        action: &ActionDefinition,
        intent: &PlayerActionIntent,
        witness: &WitnessProfile,
        tuning: &CaseTuning,
        scopes: &mut ScopeTracker,
        rng: &mut dyn RandomSource,
    ) -> ActionOutcome {
        let key = ScopeKey::witness(witness.id.clone(), action.id.clone());
        let attempts = scopes.attempts(&key);
        let has_intent = intent.intent_phrase.is_some();

        let success_rate =
            invasive_success_rate(attempts, has_intent, tuning.invasive_success_cap);
        let detect_rate = detection_rate(witness.skill, scopes.is_detected(&witness.id));

        let success = rng.uniform() < success_rate;
        let detected = rng.uniform() < detect_rate;
        scopes.increment(key);

        let mut outcome = ActionOutcome {
            kind: if success {
                OutcomeKind::Success
            } else {
                OutcomeKind::Failure
            },
            target: intent.target.clone(),
            detected,
            trust_delta: 0,
            flags: Vec::new(),
        };

        if detected {
            outcome.flags.push(FLAG_RELATIONSHIP_DAMAGED.to_string());
            let penalties = &tuning.trust_penalties;
            outcome.trust_delta = penalties[rng.pick_index(penalties.len())];
            scopes.mark_detected(witness.id.clone());
        }

        outcome
    }
}

impl Default for OutcomeResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casefile::{ActionCategory, ActionId};
    use crate::testing::ScriptedRandom;

    fn benign_action() -> ActionDefinition {
        ActionDefinition::new("reveal_charm", "revelara", ActionCategory::Benign)
    }

    fn invasive_action() -> ActionDefinition {
        ActionDefinition::new("mind_delve", "mentis", ActionCategory::Invasive)
    }

    fn intent(target: Option<&str>, phrase: Option<&str>) -> PlayerActionIntent {
        PlayerActionIntent {
            action: ActionId::new("any"),
            target: target.map(String::from),
            intent_phrase: phrase.map(String::from),
            raw_text: String::new(),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_benign_rate_decays_to_floor() {
        let mut previous = benign_success_rate(0, false, false);
        assert!(close(previous, 0.70));

        for attempts in 1..10 {
            let rate = benign_success_rate(attempts, false, false);
            assert!(rate <= previous);
            previous = rate;
        }

        // Seventh attempt: 0.70 - 0.60 lands exactly on the floor.
        assert!(close(benign_success_rate(6, false, false), 0.10));
        assert!(close(benign_success_rate(9, false, false), 0.10));
    }

    #[test]
    fn test_benign_bonuses_and_cap() {
        assert!(close(benign_success_rate(0, true, false), 0.80));
        assert!(close(benign_success_rate(0, true, true), 0.90));
        // Cap holds even if bonuses would push past it.
        assert!(benign_success_rate(0, true, true) <= BENIGN_CAP);
    }

    #[test]
    fn test_invasive_rate_scenarios() {
        // Fresh witness, clear intent: 0.30 + 0.30.
        assert!(close(invasive_success_rate(0, true, 1.0), 0.60));
        // Third attempt with intent: 0.60 - 0.20.
        assert!(close(invasive_success_rate(2, true, 1.0), 0.40));
        // Deep decay floors at 0.10.
        assert!(close(invasive_success_rate(8, true, 1.0), 0.10));
        // A case-configured cap binds the fresh rate.
        assert!(close(invasive_success_rate(0, true, 0.5), 0.50));
    }

    #[test]
    fn test_detection_rate_scenarios() {
        // Skill 50: 0.20 + 0.15.
        assert!(close(detection_rate(50, false), 0.35));
        // Previously detected: + 0.20.
        assert!(close(detection_rate(50, true), 0.55));
        // Monotone in skill and repeat flag, capped at 0.95.
        assert!(detection_rate(80, false) > detection_rate(50, false));
        assert!(detection_rate(50, true) > detection_rate(50, false));
        assert!(detection_rate(100, true) <= DETECTION_CAP);
    }

    #[test]
    fn test_benign_resolution_draws_and_counts() {
        let resolver = OutcomeResolver::new();
        let action = benign_action();
        let location = LocationId::new("archive");
        let mut scopes = ScopeTracker::new();
        let the_intent = intent(Some("the desk"), None);

        // 0.79 < 0.80 (base + target bonus): success.
        let mut rng = ScriptedRandom::new([0.79]);
        let outcome =
            resolver.resolve_benign(&action, &the_intent, &location, &mut scopes, &mut rng);
        assert!(outcome.succeeded());
        assert!(!outcome.detected);

        // Second attempt: rate declined to 0.70, same draw now fails.
        let mut rng = ScriptedRandom::new([0.79]);
        let outcome =
            resolver.resolve_benign(&action, &the_intent, &location, &mut scopes, &mut rng);
        assert!(!outcome.succeeded());

        let key = ScopeKey::location(location.clone(), action.id.clone());
        assert_eq!(scopes.attempts(&key), 2);
    }

    #[test]
    fn test_invasive_detection_marks_witness() {
        let resolver = OutcomeResolver::new();
        let action = invasive_action();
        let witness = WitnessProfile::new("marta", "Marta Hale", 50);
        let tuning = CaseTuning::default();
        let mut scopes = ScopeTracker::new();
        let the_intent = intent(Some("Marta"), Some("the ledger"));

        // Success draw 0.59 < 0.60; detection draw 0.34 < 0.35; penalty
        // index 2 picks -15.
        let mut rng = ScriptedRandom::new([0.59, 0.34]).with_indices([2]);
        let outcome = resolver.resolve_invasive(
            &action,
            &the_intent,
            &witness,
            &tuning,
            &mut scopes,
            &mut rng,
        );

        assert!(outcome.succeeded());
        assert!(outcome.detected);
        assert!(outcome.has_flag(FLAG_RELATIONSHIP_DAMAGED));
        assert_eq!(outcome.trust_delta, -15);
        assert!(scopes.is_detected(&witness.id));
    }

    #[test]
    fn test_invasive_failure_can_still_be_detected() {
        let resolver = OutcomeResolver::new();
        let action = invasive_action();
        let witness = WitnessProfile::new("marta", "Marta Hale", 0);
        let tuning = CaseTuning::default();
        let mut scopes = ScopeTracker::new();
        let the_intent = intent(None, None);

        // Success draw 0.95 fails (rate 0.30); detection draw 0.10 < 0.20.
        let mut rng = ScriptedRandom::new([0.95, 0.10]).with_indices([0]);
        let outcome = resolver.resolve_invasive(
            &action,
            &the_intent,
            &witness,
            &tuning,
            &mut scopes,
            &mut rng,
        );

        assert!(!outcome.succeeded());
        assert!(outcome.detected);
        assert_eq!(outcome.trust_delta, -5);
    }

    #[test]
    fn test_witness_counters_not_reset_by_travel() {
        let resolver = OutcomeResolver::new();
        let action = invasive_action();
        let witness = WitnessProfile::new("marta", "Marta Hale", 50);
        let tuning = CaseTuning::default();
        let mut scopes = ScopeTracker::new();
        let the_intent = intent(None, None);

        let mut rng = ScriptedRandom::new([0.9, 0.9, 0.9, 0.9]);
        resolver.resolve_invasive(&action, &the_intent, &witness, &tuning, &mut scopes, &mut rng);
        resolver.resolve_invasive(&action, &the_intent, &witness, &tuning, &mut scopes, &mut rng);

        scopes.reset_locations();

        let key = ScopeKey::witness(witness.id.clone(), action.id.clone());
        assert_eq!(scopes.attempts(&key), 2);
    }
}
