use pinpoint_common::DomProvider;

/// Element-type words that say what kind of control is wanted rather than
/// which one. They are stripped from the description before text matching.
pub const ELEMENT_TYPE_WORDS: &[&str] = &[
    "field", "button", "dropdown", "menu", "link", "checkbox", "radio", "input",
];

/// All context available to strategies for one resolution call.
///
/// Built once per `resolve()` and never mutated afterwards.
pub struct ResolutionContext<'a> {
    /// Page the call resolves against
    pub page: &'a dyn DomProvider,

    /// Lowercased description with surrounding quotes removed
    pub description: String,

    /// Description exactly as the caller passed it
    pub original_description: String,

    /// Description minus element-type words; what candidate text is scored against
    pub key_terms: String,

    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub cache_enabled: bool,
    pub debug: bool,

    /// Candidates whose matched text contains this (lowercase) are discarded
    exclusion: Option<String>,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(page: &'a dyn DomProvider, description: &str) -> Self {
        let normalized = normalize_description(description);
        let key_terms = extract_key_terms(&normalized);
        Self {
            page,
            description: normalized,
            original_description: description.to_string(),
            key_terms,
            timeout_ms: 30_000,
            max_attempts: 5,
            cache_enabled: true,
            debug: false,
            exclusion: None,
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Discard candidates whose text contains `exclusion` (case-insensitive).
    pub fn with_exclusion(mut self, exclusion: &str) -> Self {
        let exclusion = exclusion.trim().to_lowercase();
        self.exclusion = if exclusion.is_empty() {
            None
        } else {
            Some(exclusion)
        };
        self
    }

    pub fn exclusion(&self) -> Option<&str> {
        self.exclusion.as_deref()
    }

    /// True when `text` trips the exclusion filter.
    pub fn is_excluded(&self, text: &str) -> bool {
        match &self.exclusion {
            Some(excluded) => text.to_lowercase().contains(excluded.as_str()),
            None => false,
        }
    }

    /// True when the lowercase description mentions any of `words`.
    pub fn mentions_any(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.description.contains(w))
    }
}

/// Lowercase, trim, and strip surrounding double quotes.
pub fn normalize_description(description: &str) -> String {
    description
        .trim()
        .trim_matches('"')
        .trim()
        .to_lowercase()
}

/// Strip element-type words. Falls back to the whole description when
/// nothing else is left (e.g. "button").
pub fn extract_key_terms(normalized: &str) -> String {
    let terms = normalized
        .split_whitespace()
        .filter(|w| !ELEMENT_TYPE_WORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ");
    if terms.is_empty() {
        normalized.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        terms
    }
}
