use super::keys::site_pattern;
use crate::storage::now_secs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A previously resolved element.
///
/// Field names on disk follow the long-standing document layout so older
/// stores load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub selector: String,
    pub description: String,
    pub matched_text: String,
    pub strategy_name: String,
    pub score: f64,
    #[serde(default)]
    pub element_attributes: BTreeMap<String, String>,
    /// Creation time; the TTL counts from here regardless of access
    #[serde(rename = "timestamp")]
    pub created_at: f64,
    pub url_pattern: String,
    #[serde(default)]
    pub access_count: u64,
    #[serde(rename = "last_accessed", default)]
    pub last_accessed_at: f64,
}

impl CacheEntry {
    /// Fresh record for a successful resolution on the page at `url`.
    pub fn new(
        description: &str,
        url: &str,
        selector: &str,
        matched_text: &str,
        strategy_name: &str,
        score: f64,
        element_attributes: BTreeMap<String, String>,
    ) -> Self {
        let now = now_secs();
        Self {
            selector: selector.to_string(),
            description: description.to_string(),
            matched_text: matched_text.to_string(),
            strategy_name: strategy_name.to_string(),
            score,
            element_attributes,
            created_at: now,
            url_pattern: site_pattern(url),
            access_count: 1,
            last_accessed_at: now,
        }
    }

    pub fn is_expired(&self, ttl_secs: u64, now: f64) -> bool {
        now - self.created_at > ttl_secs as f64
    }

    /// Loose page check used for flat-store records.
    pub fn matches_page(&self, url: &str) -> bool {
        url.contains(&self.url_pattern) || self.url_pattern.contains(url)
    }

    pub fn touch(&mut self, now: f64) {
        self.access_count += 1;
        self.last_accessed_at = now;
    }

    /// Identity used to collapse duplicates.
    pub fn identity(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.description, self.url_pattern, self.strategy_name, self.selector
        )
    }

    /// True when `self` should survive over `other` in a duplicate pair.
    pub fn outranks(&self, other: &CacheEntry) -> bool {
        self.access_count > other.access_count
            || (self.access_count == other.access_count && self.created_at > other.created_at)
    }
}
