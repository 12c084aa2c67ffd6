//! Key derivation: description normalisation, alias terms, URL patterns and
//! document file names.

use std::collections::BTreeSet;
use url::Url;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

/// Synonyms added to the term list when the pattern word appears.
const UI_SYNONYMS: &[(&str, &[&str])] = &[
    ("button", &["btn", "click", "submit"]),
    ("field", &["input", "textbox", "form"]),
    ("dropdown", &["select", "option", "menu"]),
    ("link", &["href", "anchor", "url"]),
];

/// Terms too generic to be used as alias keys on their own.
const GENERIC_TERMS: &[&str] = &["button", "field", "input", "click"];

/// Words dropped before keying learning counters.
const LEARNING_NOISE: &[&str] = &["field", "button", "dropdown", "menu", "link"];

/// Top-level and second-level domain labels recognised when turning a file
/// name back into a host.
const GENERIC_TLDS: &[&str] = &["com", "org", "net", "edu", "gov", "co"];
const COUNTRY_TLDS: &[&str] = &["au", "uk", "nz", "za", "jp", "cn"];

const MAX_FILENAME_LEN: usize = 50;

/// Lowercase, trim and drop stop words.
pub fn normalize_description(description: &str) -> String {
    description
        .to_lowercase()
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Significant words (longer than two characters) plus UI synonyms, sorted
/// and unique.
pub fn key_terms(description: &str) -> Vec<String> {
    let normalized = normalize_description(description);
    let mut terms: BTreeSet<String> = normalized
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .map(String::from)
        .collect();
    for (pattern, synonyms) in UI_SYNONYMS {
        if normalized.contains(pattern) {
            terms.extend(synonyms.iter().map(|s| s.to_string()));
        }
    }
    terms.into_iter().collect()
}

/// Every key a record for `description` is stored under: the normalised
/// description first, then the raw lowercase description when different,
/// then each long, non-generic term.
pub fn alias_keys(description: &str) -> Vec<String> {
    let normalized = normalize_description(description);
    let mut keys = vec![normalized.clone()];

    let raw = description.trim().to_lowercase();
    if raw != normalized && !raw.is_empty() {
        keys.push(raw);
    }
    for term in key_terms(description) {
        if term.chars().count() > 3 && !GENERIC_TERMS.contains(&term.as_str()) && !keys.contains(&term) {
            keys.push(term);
        }
    }
    keys
}

/// Key for the learning counters: noise words removed, short words dropped,
/// remaining words sorted.
pub fn learning_key(strategy: &str, description: &str) -> String {
    let mut normalized = description.trim().to_lowercase();
    for noise in LEARNING_NOISE {
        normalized = normalized.replace(noise, "");
    }
    let mut words: Vec<&str> = normalized
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .collect();
    words.sort_unstable();
    format!("{strategy}:{}", words.join(" "))
}

/// Coarse page scope: host, plus `:port` when present.
///
/// An address that does not parse as a URL is used as-is (trimmed).
pub fn site_pattern(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => match parsed.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            },
            None => url.trim().to_string(),
        },
        Err(_) => url.trim().to_string(),
    }
}

/// Fine page scope: site pattern plus path, query and fragment dropped.
pub fn page_pattern(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(parsed) if parsed.host_str().is_some() => {
            format!("{}{}", site_pattern(url), parsed.path())
        }
        _ => url.trim().to_string(),
    }
}

/// Opaque flat-store key: md5 of `description:site_pattern:strategy`.
pub fn legacy_key(description: &str, url: &str, strategy: &str) -> String {
    let data = format!("{}:{}:{}", description, site_pattern(url), strategy);
    format!("{:x}", md5::compute(data.as_bytes()))
}

/// Safe document file stem for a pattern: anything outside `[A-Za-z0-9_-]`
/// becomes `_`, runs of `_` collapse, at most 50 characters.
pub fn pattern_to_filename(pattern: &str) -> String {
    let replaced: String = pattern
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let collapsed = replaced
        .split('_')
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    collapsed.chars().take(MAX_FILENAME_LEN).collect()
}

/// Best-effort inverse of [`pattern_to_filename`] for a site pattern.
///
/// Recognises a generic TLD at the end (`example_com`), a compound TLD
/// (`example_co_uk`), or a trailing country TLD; everything after the TLD is
/// treated as path noise. Otherwise every `_` becomes a `.`.
pub fn filename_to_pattern(stem: &str) -> String {
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() >= 2 {
        for (i, part) in parts.iter().enumerate() {
            let last = i == parts.len() - 1;
            if GENERIC_TLDS.contains(part) {
                if !last && COUNTRY_TLDS.contains(&parts[i + 1]) {
                    return parts[..i + 2].join(".");
                }
                if last {
                    return parts.join(".");
                }
            } else if COUNTRY_TLDS.contains(part) && last {
                return parts.join(".");
            }
        }
    }
    stem.replace('_', ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_description_drops_stop_words() {
        assert_eq!(normalize_description("  Click the Save button "), "click save button");
        assert_eq!(normalize_description("Name of the user"), "name user");
    }

    #[test]
    fn test_key_terms_include_synonyms() {
        let terms = key_terms("save button");
        assert!(terms.contains(&"save".to_string()));
        assert!(terms.contains(&"btn".to_string()));
        assert!(terms.contains(&"submit".to_string()));
    }

    #[test]
    fn test_alias_keys() {
        let keys = alias_keys("The Email field");
        assert_eq!(keys[0], "email field");
        assert_eq!(keys[1], "the email field");
        assert!(keys.contains(&"email".to_string()));
        assert!(keys.contains(&"form".to_string()));
        assert!(!keys.contains(&"field".to_string()));
        assert!(!keys.contains(&"input".to_string()));
    }

    #[test]
    fn test_learning_key() {
        assert_eq!(learning_key("ButtonStrategy", "Save Draft button"), "ButtonStrategy:draft save");
        assert_eq!(learning_key("X", "email field"), learning_key("X", "EMAIL"));
    }

    #[test]
    fn test_url_patterns() {
        assert_eq!(site_pattern("https://app.example.com/login?next=/"), "app.example.com");
        assert_eq!(site_pattern("http://localhost:8080/a"), "localhost:8080");
        assert_eq!(site_pattern("not a url"), "not a url");
        assert_eq!(page_pattern("https://app.example.com/login?x=1#top"), "app.example.com/login");
        assert_eq!(page_pattern("http://localhost:8080/"), "localhost:8080/");
    }

    #[test]
    fn test_legacy_key_is_stable_md5() {
        let a = legacy_key("email field", "https://example.com/a", "FormFieldStrategy");
        let b = legacy_key("email field", "https://example.com/b", "FormFieldStrategy");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert_ne!(a, legacy_key("email field", "https://example.com/a", "ButtonStrategy"));
    }

    #[test]
    fn test_filename_mapping() {
        assert_eq!(pattern_to_filename("app.example.com"), "app_example_com");
        assert_eq!(pattern_to_filename("localhost:8080//x"), "localhost_8080_x");
        assert_eq!(pattern_to_filename(&"a".repeat(80)).len(), 50);

        assert_eq!(filename_to_pattern("app_example_com"), "app.example.com");
        assert_eq!(filename_to_pattern("shop_example_co_uk"), "shop.example.co.uk");
        assert_eq!(filename_to_pattern("site_example_au"), "site.example.au");
        assert_eq!(filename_to_pattern("intranet_local"), "intranet.local");
    }
}
