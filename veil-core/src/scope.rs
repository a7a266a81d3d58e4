//! Per-entity attempt counters and the fired-trigger record.
//!
//! Counters are keyed by a tagged [`ScopeKey`] so a location id and a
//! witness id can never collide, even when case content reuses a string for
//! both. Location counters reset when the player moves; witness counters
//! persist for the whole case.

use crate::casefile::{ActionId, LocationId, TriggerId, WitnessId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Tagged key for one attempt counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKey {
    Location {
        location: LocationId,
        action: ActionId,
    },
    Witness {
        witness: WitnessId,
        action: ActionId,
    },
}

impl ScopeKey {
    pub fn location(location: LocationId, action: ActionId) -> Self {
        ScopeKey::Location { location, action }
    }

    pub fn witness(witness: WitnessId, action: ActionId) -> Self {
        ScopeKey::Witness { witness, action }
    }

    pub fn is_location(&self) -> bool {
        matches!(self, ScopeKey::Location { .. })
    }
}

/// Attempt counters and detection flags, owned by the player's session.
///
/// Counters only ever grow, except for the explicit location reset. The
/// detected flag is one-way: once a witness has caught an intrusion, every
/// later attempt against them carries the repeat penalty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeTracker {
    /// Serialized as an entry list: enum keys have no JSON map-key form.
    #[serde(with = "counter_entries")]
    counters: HashMap<ScopeKey, u32>,

    detected: HashSet<WitnessId>,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts recorded under a key so far.
    pub fn attempts(&self, key: &ScopeKey) -> u32 {
        self.counters.get(key).copied().unwrap_or(0)
    }

    /// Record one attempt and return the new count.
    pub fn increment(&mut self, key: ScopeKey) -> u32 {
        let count = self.counters.entry(key).or_insert(0);
        *count += 1;
        *count
    }

    /// Zero every location-scoped counter, for any location and action.
    ///
    /// Arrival at a location always starts from the fresh baseline, even on
    /// a return visit. Witness counters are untouched.
    pub fn reset_locations(&mut self) {
        self.counters.retain(|key, _| !key.is_location());
    }

    /// Flag a witness as having caught an intrusion.
    pub fn mark_detected(&mut self, witness: WitnessId) {
        self.detected.insert(witness);
    }

    pub fn is_detected(&self, witness: &WitnessId) -> bool {
        self.detected.contains(witness)
    }
}

mod counter_entries {
    use super::ScopeKey;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;

    pub fn serialize<S: Serializer>(
        map: &HashMap<ScopeKey, u32>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let entries: Vec<(&ScopeKey, u32)> = map.iter().map(|(k, v)| (k, *v)).collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<ScopeKey, u32>, D::Error> {
        let entries = Vec::<(ScopeKey, u32)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

/// Fired trigger ids for one player-case. Append-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerRecord {
    fired: HashSet<TriggerId>,
}

impl TriggerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_fired(&self, id: &TriggerId) -> bool {
        self.fired.contains(id)
    }

    /// Record a trigger as fired. Returns false if it already was.
    pub fn mark_fired(&mut self, id: TriggerId) -> bool {
        self.fired.insert(id)
    }

    pub fn fired_count(&self) -> usize {
        self.fired.len()
    }
}
