//! Free-text intent classification.
//!
//! Turns raw player input into a structured [`PlayerActionIntent`], or
//! `None` when the text is ordinary narrative input. Matching runs as a
//! priority cascade — canonical phrases, fuzzy canonical names, synonym
//! phrases, fuzzy synonyms — and every candidate must also look like an
//! intentional command before it is accepted. "cast revelara on the desk"
//! and "Revelara!" classify; "do you know revelara?" and "I used revelara
//! earlier" fall through to narrative handling.

use crate::casefile::{ActionDefinition, ActionId};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};

/// Minimum similarity for a fuzzy match against a canonical action name.
pub const NAME_SIMILARITY_THRESHOLD: f64 = 0.70;

/// Minimum similarity for a fuzzy match against a synonym phrase. Lower
/// than the name threshold to tolerate typos in natural-language phrasing.
pub const SYNONYM_SIMILARITY_THRESHOLD: f64 = 0.65;

/// Verbs that mark input as an intentional command when they appear as a
/// whole word. Inflected forms ("used", "trying") deliberately don't count.
const ACTION_VERBS: [&str; 8] = [
    "cast", "use", "try", "perform", "execute", "do", "invoke", "channel",
];

/// Verbs recognized inside "to <verb> ..." intent phrases.
const INTENT_VERBS: [&str; 8] = [
    "find out",
    "learn",
    "discover",
    "see",
    "know",
    "understand",
    "uncover",
    "reveal",
];

/// A classified action intent for one turn. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerActionIntent {
    pub action: ActionId,

    /// Extracted "on X" / "at X" noun phrase, if any.
    pub target: Option<String>,

    /// Extracted "to find out about X"-style phrase, if any.
    pub intent_phrase: Option<String>,

    pub raw_text: String,
}

/// Classify free text against the action catalog.
///
/// Tiers are tried in order and the first candidate that also passes the
/// cast-intent check wins.
pub fn classify(text: &str, catalog: &[ActionDefinition]) -> Option<PlayerActionIntent> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lowered = trimmed.to_ascii_lowercase();
    let matcher = SkimMatcherV2::default();

    // Tier 1: canonical command phrase, as a substring.
    for action in catalog {
        let hit = action
            .phrases
            .iter()
            .any(|phrase| lowered.contains(&phrase.to_ascii_lowercase()));
        if hit && has_cast_intent(trimmed, &lowered, action) {
            return Some(build_intent(action, trimmed));
        }
    }

    // Tier 2: fuzzy match on the canonical name.
    for action in catalog {
        if name_similarity(&matcher, &lowered, &action.name) >= NAME_SIMILARITY_THRESHOLD
            && has_cast_intent(trimmed, &lowered, action)
        {
            return Some(build_intent(action, trimmed));
        }
    }

    // Tier 3: synonym phrase, as a substring.
    for action in catalog {
        let hit = action
            .synonyms
            .iter()
            .any(|synonym| lowered.contains(&synonym.to_ascii_lowercase()));
        if hit && has_cast_intent(trimmed, &lowered, action) {
            return Some(build_intent(action, trimmed));
        }
    }

    // Tier 4: fuzzy match on synonym phrases.
    for action in catalog {
        let hit = action.synonyms.iter().any(|synonym| {
            similarity(&matcher, &lowered, &synonym.to_ascii_lowercase())
                >= SYNONYM_SIMILARITY_THRESHOLD
        });
        if hit && has_cast_intent(trimmed, &lowered, action) {
            return Some(build_intent(action, trimmed));
        }
    }

    None
}

fn build_intent(action: &ActionDefinition, trimmed: &str) -> PlayerActionIntent {
    PlayerActionIntent {
        action: action.id.clone(),
        target: extract_target(trimmed),
        intent_phrase: extract_intent(trimmed),
        raw_text: trimmed.to_string(),
    }
}

/// Does this input read as an intentional command for the action?
///
/// Questions never do. Otherwise: an action verb anywhere, an extractable
/// target, or the action name opening the input all count.
fn has_cast_intent(trimmed: &str, lowered: &str, action: &ActionDefinition) -> bool {
    if trimmed.ends_with('?') {
        return false;
    }

    if ACTION_VERBS.iter().any(|verb| find_word(lowered, verb).is_some()) {
        return true;
    }

    // "on X" / "at X" implies deliberate casting even without a verb.
    if extract_target(trimmed).is_some() {
        return true;
    }

    // Bare imperative: "Revelara!"
    let head = lowered.trim_start_matches(|c: char| !c.is_ascii_alphanumeric());
    let name = action.name.to_ascii_lowercase();
    if let Some(rest) = head.strip_prefix(&name) {
        return !rest.starts_with(|c: char| c.is_ascii_alphanumeric());
    }

    false
}

/// Extract a cast target from "on <noun phrase>" or "at <noun phrase>".
///
/// The capture runs to the end of the input but stops short of an intent
/// clause, so "cast mentis on Marta to find out about the ledger" targets
/// "Marta", not the whole tail.
pub fn extract_target(text: &str) -> Option<String> {
    let lowered = text.to_ascii_lowercase();
    for marker in ["on", "at"] {
        if let Some(start) = find_word(&lowered, marker) {
            let rest = truncate_intent_clause(&text[start + marker.len()..]);
            if let Some(captured) = clean_capture(rest) {
                return Some(captured);
            }
        }
    }
    None
}

/// Cut a target capture where an intent clause starts.
fn truncate_intent_clause(rest: &str) -> &str {
    let lowered = rest.to_ascii_lowercase();
    let mut cut = rest.len();
    for verb in INTENT_VERBS {
        let phrase = format!("to {verb}");
        if let Some(pos) = find_word(&lowered, &phrase) {
            cut = cut.min(pos);
        }
    }
    if let Some(pos) = find_word(&lowered, "about") {
        cut = cut.min(pos);
    }
    &rest[..cut]
}

/// Extract the subject of an intrusion from an intent phrase.
///
/// Patterns are tried most-specific first; the order is load-bearing. A
/// single greedy "about (.+)" pattern would capture "about draco" instead
/// of "draco" from "... to find out about draco".
pub fn extract_intent(text: &str) -> Option<String> {
    let lowered = text.to_ascii_lowercase();

    for verb in INTENT_VERBS {
        let phrase = format!("to {verb} about");
        if let Some(captured) = capture_after(text, &lowered, &phrase) {
            return Some(captured);
        }
    }

    for verb in INTENT_VERBS {
        let phrase = format!("to {verb}");
        if let Some(captured) = capture_after(text, &lowered, &phrase) {
            return Some(captured);
        }
    }

    capture_after(text, &lowered, "about")
}

/// Capture everything after a whole-word-bounded phrase, cleaned up.
fn capture_after(original: &str, lowered: &str, phrase: &str) -> Option<String> {
    let start = find_word(lowered, phrase)?;
    clean_capture(&original[start + phrase.len()..])
}

fn clean_capture(rest: &str) -> Option<String> {
    let cleaned = rest
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Byte offset of the first occurrence of `phrase` bounded by non-word
/// characters on both sides.
fn find_word(text: &str, phrase: &str) -> Option<usize> {
    if phrase.is_empty() {
        return None;
    }
    let bytes = text.as_bytes();
    let mut from = 0;
    while let Some(offset) = text[from..].find(phrase) {
        let start = from + offset;
        let end = start + phrase.len();
        let boundary_before = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let boundary_after = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if boundary_before && boundary_after {
            return Some(start);
        }
        from = start + 1;
    }
    None
}

/// Normalized fuzzy similarity in `[0, 1]`.
///
/// Skim scores are unbounded, so each direction is normalized against the
/// pattern's self-match score; taking the better direction lets a dropped
/// character on either side still clear the thresholds.
fn similarity(matcher: &SkimMatcherV2, a: &str, b: &str) -> f64 {
    fn directed(matcher: &SkimMatcherV2, choice: &str, pattern: &str) -> f64 {
        let own = matcher.fuzzy_match(pattern, pattern).unwrap_or(0);
        if own <= 0 {
            return 0.0;
        }
        matcher.fuzzy_match(choice, pattern).unwrap_or(0) as f64 / own as f64
    }

    directed(matcher, a, b).max(directed(matcher, b, a)).min(1.0)
}

/// Best similarity between an action name and the input or any input token.
fn name_similarity(matcher: &SkimMatcherV2, lowered: &str, name: &str) -> f64 {
    let name_lower = name.to_ascii_lowercase();
    let mut best = similarity(matcher, lowered, &name_lower);
    for token in lowered.split_whitespace() {
        let token = token.trim_matches(|c: char| !c.is_ascii_alphanumeric());
        if token.is_empty() {
            continue;
        }
        best = best.max(similarity(matcher, token, &name_lower));
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casefile::ActionCategory;

    fn catalog() -> Vec<ActionDefinition> {
        vec![
            ActionDefinition::new("reveal_charm", "revelara", ActionCategory::Benign)
                .with_phrase("cast revelara")
                .with_synonym("make the hidden visible"),
            ActionDefinition::new("mind_delve", "mentis", ActionCategory::Invasive)
                .with_phrase("cast mentis")
                .with_synonym("read her mind")
                .with_synonym("read his mind")
                .with_synonym("peer into her thoughts"),
        ]
    }

    fn classify_id(text: &str) -> Option<String> {
        classify(text, &catalog()).map(|intent| intent.action.as_str().to_string())
    }

    #[test]
    fn test_canonical_phrase_with_verb() {
        let intent = classify("cast revelara on the desk", &catalog()).unwrap();
        assert_eq!(intent.action, ActionId::new("reveal_charm"));
        assert_eq!(intent.target.as_deref(), Some("the desk"));
    }

    #[test]
    fn test_bare_imperative() {
        assert_eq!(classify_id("Revelara!"), Some("reveal_charm".to_string()));
    }

    #[test]
    fn test_questions_never_classify() {
        assert_eq!(classify_id("do you know revelara?"), None);
        assert_eq!(classify_id("cast revelara?"), None);
        assert_eq!(classify_id("can i read her mind?"), None);
    }

    #[test]
    fn test_mention_without_command_shape_rejected() {
        assert_eq!(classify_id("I used revelara earlier"), None);
        assert_eq!(classify_id("my tutor liked revelara back then"), None);
    }

    #[test]
    fn test_fuzzy_name_with_typo() {
        // One dropped character still clears the 0.70 name threshold.
        assert_eq!(
            classify_id("cast revelra on the cabinet"),
            Some("reveal_charm".to_string())
        );
    }

    #[test]
    fn test_synonym_phrase() {
        let intent = classify("read her mind to find out about draco", &catalog()).unwrap();
        assert_eq!(intent.action, ActionId::new("mind_delve"));
        assert_eq!(intent.intent_phrase.as_deref(), Some("draco"));
    }

    #[test]
    fn test_fuzzy_synonym_with_typo() {
        assert_eq!(
            classify_id("try to read her minnd"),
            Some("mind_delve".to_string())
        );
    }

    #[test]
    fn test_target_presence_implies_intent() {
        // No verb and no leading name, but "on X" marks a deliberate cast.
        assert_eq!(
            classify_id("revelara quickly on the cellar door"),
            Some("reveal_charm".to_string())
        );
    }

    #[test]
    fn test_extract_target_patterns() {
        assert_eq!(
            extract_target("cast revelara on the desk."),
            Some("the desk".to_string())
        );
        assert_eq!(
            extract_target("fling the charm at the mirror!"),
            Some("the mirror".to_string())
        );
        assert_eq!(extract_target("cast revelara"), None);
        // "at" inside a word is not a marker.
        assert_eq!(extract_target("look, a cat"), None);
        // The target stops where the intent clause starts.
        assert_eq!(
            extract_target("cast mentis on Marta to find out about draco"),
            Some("Marta".to_string())
        );
    }

    #[test]
    fn test_extract_intent_specific_before_general() {
        assert_eq!(
            extract_intent("read her mind to find out about draco"),
            Some("draco".to_string())
        );
        assert_eq!(
            extract_intent("read her mind to find out where he was"),
            Some("where he was".to_string())
        );
        assert_eq!(
            extract_intent("ask her about the cellar"),
            Some("the cellar".to_string())
        );
        assert_eq!(extract_intent("read her mind"), None);
    }

    #[test]
    fn test_extract_intent_verb_variants() {
        assert_eq!(
            extract_intent("peer into her thoughts to learn about the ledger"),
            Some("the ledger".to_string())
        );
        assert_eq!(
            extract_intent("read his mind to see who he met"),
            Some("who he met".to_string())
        );
    }

    #[test]
    fn test_intent_carries_raw_text() {
        let intent = classify("  cast mentis on Marta  ", &catalog()).unwrap();
        assert_eq!(intent.raw_text, "cast mentis on Marta");
        assert_eq!(intent.target.as_deref(), Some("Marta"));
    }
}
