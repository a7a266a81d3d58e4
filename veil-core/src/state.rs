//! Mutable per-player case state.
//!
//! A [`CaseState`] belongs to exactly one session; the engine borrows it
//! mutably for the duration of a single call and never holds on to it. The
//! whole structure round-trips through serde so the embedding application
//! can persist it however it likes.

use crate::casefile::{ContradictionId, EvidenceId, HypothesisId, LocationId};
use crate::condition::EvalContext;
use crate::scope::{ScopeTracker, TriggerRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Trust band bounds and the neutral starting value.
pub const TRUST_MIN: i32 = 0;
pub const TRUST_MAX: i32 = 100;
pub const TRUST_START: i32 = 50;

/// Everything that changes over the course of one player's case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseState {
    pub current_location: LocationId,

    /// Witness trust, clamped to `TRUST_MIN..=TRUST_MAX`.
    pub trust: i32,

    pub discovered: HashSet<EvidenceId>,

    /// Hypotheses made available by unlock rules.
    pub unlocked: HashSet<HypothesisId>,

    /// Hypotheses the player currently holds; contradictions only fire
    /// against these.
    pub active_hypotheses: HashSet<HypothesisId>,

    /// Contradictions already reported, so a met condition is surfaced once.
    pub reported_contradictions: HashSet<ContradictionId>,

    pub scopes: ScopeTracker,
    pub triggers: TriggerRecord,
}

impl CaseState {
    /// Fresh state at the case's starting location.
    pub fn new(starting_location: impl Into<String>) -> Self {
        Self {
            current_location: LocationId::new(starting_location),
            trust: TRUST_START,
            discovered: HashSet::new(),
            unlocked: HashSet::new(),
            active_hypotheses: HashSet::new(),
            reported_contradictions: HashSet::new(),
            scopes: ScopeTracker::new(),
            triggers: TriggerRecord::new(),
        }
    }

    /// Move to a location, resetting location-scoped attempt counters.
    ///
    /// Moving to the current location is a no-op; counters keep decaying.
    pub fn travel_to(&mut self, location: LocationId) {
        if self.current_location == location {
            return;
        }
        self.scopes.reset_locations();
        self.current_location = location;
    }

    /// Add evidence to the discovered set. Returns false if already known.
    pub fn discover(&mut self, evidence: EvidenceId) -> bool {
        self.discovered.insert(evidence)
    }

    /// Mark a hypothesis as actively held by the player.
    pub fn hold_hypothesis(&mut self, hypothesis: HypothesisId) {
        self.active_hypotheses.insert(hypothesis);
    }

    /// Drop a hypothesis the player no longer holds.
    pub fn drop_hypothesis(&mut self, hypothesis: &HypothesisId) {
        self.active_hypotheses.remove(hypothesis);
    }

    /// Apply a trust delta, saturating at the band edges.
    pub fn adjust_trust(&mut self, delta: i32) {
        self.trust = (self.trust + delta).clamp(TRUST_MIN, TRUST_MAX);
    }

    /// An immutable evidence/trust view for condition evaluation while other
    /// fields are mutably borrowed.
    pub fn evidence_view(&self) -> EvidenceView<'_> {
        EvidenceView {
            discovered: &self.discovered,
            trust: self.trust,
        }
    }
}

impl EvalContext for CaseState {
    fn has_evidence(&self, id: &EvidenceId) -> bool {
        self.discovered.contains(id)
    }

    fn trust(&self) -> i32 {
        self.trust
    }

    fn evidence_count(&self) -> usize {
        self.discovered.len()
    }
}

/// Borrowed snapshot of the fields conditions read.
#[derive(Debug, Clone, Copy)]
pub struct EvidenceView<'a> {
    pub discovered: &'a HashSet<EvidenceId>,
    pub trust: i32,
}

impl EvalContext for EvidenceView<'_> {
    fn has_evidence(&self, id: &EvidenceId) -> bool {
        self.discovered.contains(id)
    }

    fn trust(&self) -> i32 {
        self.trust
    }

    fn evidence_count(&self) -> usize {
        self.discovered.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casefile::ActionId;
    use crate::scope::ScopeKey;

    #[test]
    fn test_travel_resets_location_counters() {
        let mut state = CaseState::new("archive");
        let key = ScopeKey::location(LocationId::new("archive"), ActionId::new("reveal_charm"));

        state.scopes.increment(key.clone());
        state.travel_to(LocationId::new("cellar"));

        assert_eq!(state.scopes.attempts(&key), 0);
        assert_eq!(state.current_location, LocationId::new("cellar"));
    }

    #[test]
    fn test_travel_to_same_location_keeps_counters() {
        let mut state = CaseState::new("archive");
        let key = ScopeKey::location(LocationId::new("archive"), ActionId::new("reveal_charm"));

        state.scopes.increment(key.clone());
        state.travel_to(LocationId::new("archive"));

        assert_eq!(state.scopes.attempts(&key), 1);
    }

    #[test]
    fn test_trust_saturates() {
        let mut state = CaseState::new("archive");
        state.adjust_trust(-200);
        assert_eq!(state.trust, TRUST_MIN);
        state.adjust_trust(500);
        assert_eq!(state.trust, TRUST_MAX);
    }

    #[test]
    fn test_eval_context_views_discovered_evidence() {
        let mut state = CaseState::new("archive");
        assert!(state.discover(EvidenceId::new("frost_pattern")));
        assert!(!state.discover(EvidenceId::new("frost_pattern")));

        assert!(state.has_evidence(&EvidenceId::new("frost_pattern")));
        assert_eq!(state.evidence_count(), 1);

        let view = state.evidence_view();
        assert!(view.has_evidence(&EvidenceId::new("frost_pattern")));
        assert_eq!(view.trust(), TRUST_START);
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut state = CaseState::new("archive");
        state.discover(EvidenceId::new("torn_ledger"));
        state.hold_hypothesis(HypothesisId::new("inside_job"));
        state.adjust_trust(-10);

        let json = serde_json::to_string(&state).unwrap();
        let restored: CaseState = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.trust, TRUST_START - 10);
        assert!(restored.has_evidence(&EvidenceId::new("torn_ledger")));
        assert!(restored
            .active_hypotheses
            .contains(&HypothesisId::new("inside_job")));
    }
}
