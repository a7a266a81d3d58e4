//! Static case content: actions, witnesses, conditions, rules, tuning.
//!
//! A [`CaseDefinition`] is built once when a case loads and is read-only for
//! the life of the process. Loading is fail-fast: a malformed condition
//! source or out-of-range tuning value aborts the load, so runtime
//! evaluation never sees unparsed content.

use crate::condition::{ConditionError, ConditionExpression};
use crate::unlocks::{ContradictionRule, HypothesisUnlockRule, NarrativeTrigger};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ID Types
// ============================================================================
//
// Every id is content-defined: it arrives with the case data as a string and
// never changes. Distinct newtypes keep location, witness, and evidence ids
// from ever colliding in a shared map.

/// Unique identifier for a case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseId(pub String);

impl CaseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a castable action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a piece of evidence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvidenceId(pub String);

impl EvidenceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EvidenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a witness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WitnessId(pub String);

impl WitnessId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WitnessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationId(pub String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a hypothesis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HypothesisId(pub String);

impl HypothesisId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HypothesisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a one-shot narrative trigger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerId(pub String);

impl TriggerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a contradiction rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContradictionId(pub String);

impl ContradictionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContradictionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Actions & Witnesses
// ============================================================================

/// Whether an action is harmless exploration or an intrusion on a witness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionCategory {
    /// Location-scoped exploration (revealing charms, detection sweeps).
    Benign,
    /// Witness-scoped intrusion (mind-delving); carries detection risk.
    Invasive,
}

/// Static description of a castable action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub id: ActionId,

    /// Canonical display name, also used for fuzzy name matching.
    pub name: String,

    pub category: ActionCategory,

    /// Canonical command phrases ("cast revelara").
    #[serde(default)]
    pub phrases: Vec<String>,

    /// Natural-language synonym phrases ("read her mind").
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl ActionDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: ActionCategory) -> Self {
        Self {
            id: ActionId::new(id),
            name: name.into(),
            category,
            phrases: Vec::new(),
            synonyms: Vec::new(),
        }
    }

    pub fn with_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.phrases.push(phrase.into());
        self
    }

    pub fn with_synonym(mut self, synonym: impl Into<String>) -> Self {
        self.synonyms.push(synonym.into());
        self
    }

    pub fn is_invasive(&self) -> bool {
        self.category == ActionCategory::Invasive
    }
}

/// A witness an invasive action can target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessProfile {
    pub id: WitnessId,
    pub name: String,

    #[serde(default)]
    pub aliases: Vec<String>,

    /// Mental resistance skill, `0..=100`. Scales detection risk.
    pub skill: u8,
}

impl WitnessProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, skill: u8) -> Self {
        Self {
            id: WitnessId::new(id),
            name: name.into(),
            aliases: Vec::new(),
            skill,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Check if a name matches this witness (case-insensitive).
    pub fn matches_name(&self, query: &str) -> bool {
        let query_lower = query.to_lowercase();
        if self.name.to_lowercase() == query_lower {
            return true;
        }
        self.aliases.iter().any(|a| a.to_lowercase() == query_lower)
    }

    /// Check if a free-text target phrase refers to this witness.
    ///
    /// Matches in either direction so "the groundskeeper" finds an alias
    /// "groundskeeper" and a bare surname finds a full name.
    pub fn matches_partial(&self, query: &str) -> bool {
        let query_lower = query.to_lowercase();
        let name_lower = self.name.to_lowercase();
        if query_lower.contains(&name_lower) || name_lower.contains(&query_lower) {
            return true;
        }
        self.aliases.iter().any(|a| {
            let alias_lower = a.to_lowercase();
            query_lower.contains(&alias_lower) || alias_lower.contains(&query_lower)
        })
    }
}

// ============================================================================
// Tuning
// ============================================================================

/// Per-case probability constants.
///
/// Case content overrides these where it diverges from the defaults; the
/// engine never hard-codes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseTuning {
    /// Upper cap on invasive success rate. Some cases cap at 0.90; the
    /// default leaves the formula uncapped below certainty.
    #[serde(default = "default_invasive_success_cap")]
    pub invasive_success_cap: f64,

    /// Trust deltas a detected intrusion draws from, uniformly.
    #[serde(default = "default_trust_penalties")]
    pub trust_penalties: Vec<i32>,

    /// Chance that a rare narrative trigger is preferred over a regular one.
    #[serde(default = "default_rare_trigger_chance")]
    pub rare_trigger_chance: f64,
}

fn default_invasive_success_cap() -> f64 {
    1.0
}

fn default_trust_penalties() -> Vec<i32> {
    vec![-5, -10, -15, -20]
}

fn default_rare_trigger_chance() -> f64 {
    0.07
}

impl Default for CaseTuning {
    fn default() -> Self {
        Self {
            invasive_success_cap: default_invasive_success_cap(),
            trust_penalties: default_trust_penalties(),
            rare_trigger_chance: default_rare_trigger_chance(),
        }
    }
}

// ============================================================================
// Case Definition & Loading
// ============================================================================

/// Errors from loading case content.
#[derive(Debug, Error)]
pub enum CaseLoadError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid condition `{name}`: {source}")]
    Condition {
        name: String,
        #[source]
        source: ConditionError,
    },

    #[error("invalid condition on trigger `{id}`: {source}")]
    TriggerCondition {
        id: TriggerId,
        #[source]
        source: ConditionError,
    },

    #[error("duplicate action id `{0}`")]
    DuplicateAction(ActionId),

    #[error("unlock path for `{0}` lists no evidence")]
    EmptyUnlockPath(HypothesisId),

    #[error("contradiction `{0}` lists no evidence")]
    EmptyContradiction(ContradictionId),

    #[error("invalid tuning: {0}")]
    Tuning(String),
}

/// Raw case content as written by case authors. Condition sources are plain
/// strings here; compilation happens in [`CaseDefinition::from_raw`].
#[derive(Debug, Clone, Deserialize)]
struct RawCase {
    id: CaseId,
    #[serde(default)]
    actions: Vec<ActionDefinition>,
    #[serde(default)]
    witnesses: Vec<WitnessProfile>,
    #[serde(default)]
    conditions: HashMap<String, String>,
    #[serde(default)]
    unlock_rules: Vec<HypothesisUnlockRule>,
    #[serde(default)]
    contradiction_rules: Vec<ContradictionRule>,
    #[serde(default)]
    triggers: Vec<RawTrigger>,
    #[serde(default)]
    tuning: CaseTuning,
}

#[derive(Debug, Clone, Deserialize)]
struct RawTrigger {
    id: TriggerId,
    tier: u8,
    #[serde(default)]
    rare: bool,
    #[serde(default)]
    condition: Option<String>,
}

/// A fully loaded, validated case.
#[derive(Debug, Clone)]
pub struct CaseDefinition {
    pub id: CaseId,
    pub actions: Vec<ActionDefinition>,
    pub witnesses: Vec<WitnessProfile>,

    /// Named conditions referenced by the embedding application (dialogue
    /// gates, scene preconditions).
    pub conditions: HashMap<String, ConditionExpression>,

    pub unlock_rules: Vec<HypothesisUnlockRule>,
    pub contradiction_rules: Vec<ContradictionRule>,
    pub triggers: Vec<NarrativeTrigger>,
    pub tuning: CaseTuning,
}

impl CaseDefinition {
    /// Create an empty case, for building content in code.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: CaseId::new(id),
            actions: Vec::new(),
            witnesses: Vec::new(),
            conditions: HashMap::new(),
            unlock_rules: Vec::new(),
            contradiction_rules: Vec::new(),
            triggers: Vec::new(),
            tuning: CaseTuning::default(),
        }
    }

    pub fn with_action(mut self, action: ActionDefinition) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_witness(mut self, witness: WitnessProfile) -> Self {
        self.witnesses.push(witness);
        self
    }

    pub fn with_condition(mut self, name: impl Into<String>, expr: ConditionExpression) -> Self {
        self.conditions.insert(name.into(), expr);
        self
    }

    pub fn with_unlock_rule(mut self, rule: HypothesisUnlockRule) -> Self {
        self.unlock_rules.push(rule);
        self
    }

    pub fn with_contradiction_rule(mut self, rule: ContradictionRule) -> Self {
        self.contradiction_rules.push(rule);
        self
    }

    pub fn with_trigger(mut self, trigger: NarrativeTrigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    pub fn with_tuning(mut self, tuning: CaseTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Load a case from a JSON string, failing fast on malformed content.
    pub fn from_json(source: &str) -> Result<Self, CaseLoadError> {
        let raw: RawCase = serde_json::from_str(source)?;
        Self::from_raw(raw)
    }

    /// Load a case from an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, CaseLoadError> {
        let raw: RawCase = serde_json::from_value(value)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawCase) -> Result<Self, CaseLoadError> {
        let mut conditions = HashMap::new();
        for (name, source) in raw.conditions {
            let expr = ConditionExpression::parse(&source)
                .map_err(|source| CaseLoadError::Condition {
                    name: name.clone(),
                    source,
                })?;
            conditions.insert(name, expr);
        }

        let mut triggers = Vec::with_capacity(raw.triggers.len());
        for trigger in raw.triggers {
            let condition = match trigger.condition {
                Some(source) => Some(ConditionExpression::parse(&source).map_err(|source| {
                    CaseLoadError::TriggerCondition {
                        id: trigger.id.clone(),
                        source,
                    }
                })?),
                None => None,
            };
            triggers.push(NarrativeTrigger {
                id: trigger.id,
                tier: trigger.tier,
                rare: trigger.rare,
                condition,
            });
        }

        let case = Self {
            id: raw.id,
            actions: raw.actions,
            witnesses: raw.witnesses,
            conditions,
            unlock_rules: raw.unlock_rules,
            contradiction_rules: raw.contradiction_rules,
            triggers,
            tuning: raw.tuning,
        };
        case.validate()?;
        Ok(case)
    }

    fn validate(&self) -> Result<(), CaseLoadError> {
        let mut seen = std::collections::HashSet::new();
        for action in &self.actions {
            if !seen.insert(&action.id) {
                return Err(CaseLoadError::DuplicateAction(action.id.clone()));
            }
        }

        for rule in &self.unlock_rules {
            if rule.paths.iter().any(|p| p.evidence.is_empty()) {
                return Err(CaseLoadError::EmptyUnlockPath(rule.hypothesis.clone()));
            }
        }

        for rule in &self.contradiction_rules {
            if rule.evidence.is_empty() {
                return Err(CaseLoadError::EmptyContradiction(rule.id.clone()));
            }
        }

        let tuning = &self.tuning;
        if !(0.0..=1.0).contains(&tuning.invasive_success_cap) {
            return Err(CaseLoadError::Tuning(format!(
                "invasive_success_cap {} outside [0, 1]",
                tuning.invasive_success_cap
            )));
        }
        if !(0.0..=1.0).contains(&tuning.rare_trigger_chance) {
            return Err(CaseLoadError::Tuning(format!(
                "rare_trigger_chance {} outside [0, 1]",
                tuning.rare_trigger_chance
            )));
        }
        if tuning.trust_penalties.is_empty() {
            return Err(CaseLoadError::Tuning(
                "trust_penalties must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Look up an action by id.
    pub fn find_action(&self, id: &ActionId) -> Option<&ActionDefinition> {
        self.actions.iter().find(|a| &a.id == id)
    }

    /// Look up a named condition.
    pub fn find_condition(&self, name: &str) -> Option<&ConditionExpression> {
        self.conditions.get(name)
    }

    /// Resolve a free-text target phrase to a witness.
    ///
    /// Exact name/alias matches win over partial ones.
    pub fn find_witness(&self, target: &str) -> Option<&WitnessProfile> {
        self.witnesses
            .iter()
            .find(|w| w.matches_name(target))
            .or_else(|| self.witnesses.iter().find(|w| w.matches_partial(target)))
    }
}

/// An explicit cache of loaded cases, owned by the caller.
///
/// There is deliberately no module-level singleton; sessions share a cache
/// only when their owner decides they do.
#[derive(Debug, Clone, Default)]
pub struct CaseCache {
    cases: HashMap<CaseId, Arc<CaseDefinition>>,
}

impl CaseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, case: CaseDefinition) -> Arc<CaseDefinition> {
        let arc = Arc::new(case);
        self.cases.insert(arc.id.clone(), Arc::clone(&arc));
        arc
    }

    pub fn get(&self, id: &CaseId) -> Option<Arc<CaseDefinition>> {
        self.cases.get(id).cloned()
    }

    /// Fetch a cached case or load it with the supplied closure.
    pub fn get_or_load(
        &mut self,
        id: &CaseId,
        load: impl FnOnce() -> Result<CaseDefinition, CaseLoadError>,
    ) -> Result<Arc<CaseDefinition>, CaseLoadError> {
        if let Some(case) = self.get(id) {
            return Ok(case);
        }
        Ok(self.insert(load()?))
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}
