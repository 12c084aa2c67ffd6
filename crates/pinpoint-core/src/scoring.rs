//! Shared scoring primitives.
//!
//! Every strategy builds its candidate score from these stateless helpers:
//! a base text similarity, a relevance multiplier that penalises targets
//! buried inside long container text, and a handful of small utilities.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static CAMEL_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").unwrap());

/// Lowercase, trim and collapse internal whitespace.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Base similarity between two short texts in `[0, 1]`.
///
/// Exact match scores 1.0, containment in either direction 0.8, otherwise the
/// shared-word ratio scaled by 0.7.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize_text(a);
    let b = normalize_text(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return 0.8;
    }

    let words_a: HashSet<&str> = a.split(' ').collect();
    let words_b: HashSet<&str> = b.split(' ').collect();
    let shared = words_a.intersection(&words_b).count();
    if shared == 0 {
        return 0.0;
    }
    shared as f64 / words_a.len().max(words_b.len()) as f64 * 0.7
}

/// How relevance tiers are assigned when the search text is contained in a
/// longer element text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelevanceProfile {
    /// Proportion tiers 0.3 / 0.1, plus a bonus for early appearance.
    Prominence,
    /// Stricter proportion tiers 0.5 / 0.2 / 0.1, no position bonus.
    Proportion,
}

/// Relevance multiplier for `element_text` given the `search` text.
///
/// Values above 1.0 are possible with [`RelevanceProfile::Prominence`]; the
/// caller clamps the final score.
pub fn relevance(search: &str, element_text: &str, profile: RelevanceProfile) -> f64 {
    let search = normalize_text(search);
    let element = normalize_text(element_text);
    if search.is_empty() || element.is_empty() {
        return 0.5;
    }
    if search == element {
        return 1.0;
    }

    if let Some(pos) = element.find(&search) {
        let ratio = char_len(&search) as f64 / char_len(&element) as f64;
        return match profile {
            RelevanceProfile::Prominence => {
                let bonus = prominence(char_len(&element[..pos]), &search, &element);
                if ratio >= 0.3 {
                    1.0 + bonus
                } else if ratio >= 0.1 {
                    0.8 + bonus
                } else {
                    0.3 + bonus
                }
            }
            RelevanceProfile::Proportion => {
                if ratio >= 0.5 {
                    1.0
                } else if ratio >= 0.2 {
                    0.9
                } else if ratio >= 0.1 {
                    0.7
                } else {
                    0.3
                }
            }
        };
    }

    let search_words: HashSet<&str> = search.split(' ').collect();
    let element_words: HashSet<&str> = element.split(' ').collect();
    let shared = search_words.intersection(&element_words).count();
    if shared > 0 {
        return (shared as f64 / element_words.len() as f64).max(0.5);
    }
    0.5
}

/// Bonus for search text that appears early in the element text.
fn prominence(position: usize, search: &str, element: &str) -> f64 {
    let span = char_len(element).saturating_sub(char_len(search)).max(1);
    let relative = position as f64 / span as f64;
    if relative <= 0.2 {
        0.1
    } else if relative <= 0.5 {
        0.05
    } else {
        0.0
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Turn an identifier such as `client_type` or `clientType` into
/// `Client Type`. Returns `None` when the result would not add information.
pub fn identifier_to_words(identifier: &str) -> Option<String> {
    let words = split_identifier(identifier);
    if words.chars().count() > 2 && words.to_lowercase() != identifier.to_lowercase() {
        Some(words)
    } else {
        None
    }
}

/// Split on `_`, `-` and camelCase boundaries, capitalising each word.
pub fn split_identifier(identifier: &str) -> String {
    let spaced = identifier.replace(['_', '-'], " ");
    let spaced = CAMEL_BOUNDARY.replace_all(&spaced, "$1 $2");
    spaced
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

/// Clamp a score into `[0, 1]`. NaN collapses to 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 1.0)
}

/// True when any of `needles` occurs in `haystack` (already lowercase).
pub fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_tiers() {
        assert_eq!(similarity("Login", "login"), 1.0);
        assert_eq!(similarity("email", "Email address"), 0.8);
        assert_eq!(similarity("save draft now", "draft"), 0.8);
        let overlap = similarity("client type", "type of client");
        assert!((overlap - 2.0 / 3.0 * 0.7).abs() < 1e-9);
        assert_eq!(similarity("checkout", "logout"), 0.0);
        assert_eq!(similarity("", "anything"), 0.0);
    }

    #[test]
    fn test_similarity_collapses_whitespace() {
        assert_eq!(similarity("  sign   in ", "Sign In"), 1.0);
    }

    #[test]
    fn test_relevance_prominence_profile() {
        // Exact
        assert_eq!(relevance("save", "Save", RelevanceProfile::Prominence), 1.0);
        // Large share, at the start
        let r = relevance("save", "save draft", RelevanceProfile::Prominence);
        assert!((r - 1.1).abs() < 1e-9);
        // Tiny share, near the end
        let long = "a very long block of container text that ends with save";
        let r = relevance("save", long, RelevanceProfile::Prominence);
        assert!((r - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_relevance_proportion_profile() {
        assert_eq!(relevance("save", "save it", RelevanceProfile::Proportion), 1.0);
        assert_eq!(relevance("save", "please save", RelevanceProfile::Proportion), 0.9);
        assert_eq!(
            relevance("save", "one two three four save", RelevanceProfile::Proportion),
            0.7
        );
    }

    #[test]
    fn test_relevance_word_overlap_and_default() {
        let r = relevance("client type", "type of client here", RelevanceProfile::Proportion);
        assert_eq!(r, 0.5);
        let r = relevance("client type", "type client", RelevanceProfile::Proportion);
        assert_eq!(r, 1.0);
        assert_eq!(relevance("abc", "xyz", RelevanceProfile::Prominence), 0.5);
    }

    #[test]
    fn test_identifier_to_words() {
        assert_eq!(identifier_to_words("clientType").as_deref(), Some("Client Type"));
        assert_eq!(identifier_to_words("user_email").as_deref(), Some("User Email"));
        assert_eq!(identifier_to_words("first-name").as_deref(), Some("First Name"));
        // Nothing gained over the raw identifier
        assert_eq!(identifier_to_words("email"), None);
        assert_eq!(identifier_to_words("ab"), None);
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(1.4), 1.0);
        assert_eq!(clamp_score(-0.2), 0.0);
        assert_eq!(clamp_score(f64::NAN), 0.0);
        assert_eq!(clamp_score(0.42), 0.42);
    }
}
