//! Matches spoken tokens against the trigger vocabulary.

use readalong_vocab::TriggerVocabulary;
use tracing::trace;

/// Lowercase and strip everything non-alphanumeric, so "Roared!" and
/// "roared" land on the same key.
pub fn normalize_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Canonical trigger words found in `tokens`, in token order, duplicates
/// preserved. A token matches at most one entry: an exact key match wins,
/// otherwise the first entry whose variant set contains the token. Tokens
/// with no match are silently dropped.
pub fn match_tokens(tokens: &[String], vocabulary: &TriggerVocabulary) -> Vec<String> {
    let mut matched = Vec::new();

    for token in tokens {
        let normalized = normalize_token(token);
        if normalized.is_empty() {
            continue;
        }

        if vocabulary.contains(&normalized) {
            trace!(target: "trigger", token = %normalized, "Exact trigger match");
            matched.push(normalized);
            continue;
        }

        if let Some((canonical, _)) = vocabulary
            .iter()
            .find(|(_, entry)| entry.variants.contains(&normalized))
        {
            trace!(target: "trigger", token = %normalized, canonical = %canonical, "Variant trigger match");
            matched.push(canonical.clone());
        }
    }

    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn vocab() -> TriggerVocabulary {
        let mut v = TriggerVocabulary::new();
        v.insert_global(
            "roar",
            "sounds/roar.ogg",
            HashSet::from(["roars".to_string(), "roared".to_string()]),
        );
        v.insert_global("splash", "sounds/splash.ogg", HashSet::new());
        v
    }

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_exact_match() {
        let found = match_tokens(&tokens(&["the", "roar", "echoed"]), &vocab());
        assert_eq!(found, vec!["roar"]);
    }

    #[test]
    fn test_variant_maps_to_canonical() {
        let found = match_tokens(&tokens(&["Roared!"]), &vocab());
        assert_eq!(found, vec!["roar"]);
    }

    #[test]
    fn test_normalization_strips_punctuation_and_case() {
        assert_eq!(normalize_token("Splash,"), "splash");
        assert_eq!(normalize_token("ROARED?!"), "roared");
        assert_eq!(normalize_token("--"), "");
    }

    #[test]
    fn test_unmatched_tokens_dropped_silently() {
        let found = match_tokens(&tokens(&["quiet", "meadow"]), &vocab());
        assert!(found.is_empty());
    }

    #[test]
    fn test_duplicates_preserved_in_order() {
        let found = match_tokens(&tokens(&["roar", "splash", "roared"]), &vocab());
        assert_eq!(found, vec!["roar", "splash", "roar"]);
    }

    #[test]
    fn test_one_match_per_token() {
        // "roar" is both a key and could shadow variants; only one match
        // may come back for the token.
        let found = match_tokens(&tokens(&["roar"]), &vocab());
        assert_eq!(found.len(), 1);
    }
}
