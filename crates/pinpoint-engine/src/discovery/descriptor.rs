use pinpoint_core::scoring::similarity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Roles that name an element type outright.
const TYPED_ROLES: &[&str] = &["button", "menuitem", "option", "combobox"];
const TYPED_TAGS: &[&str] = &["button", "input", "select", "textarea"];
const CONFIDENT_TYPES: &[&str] = &["button", "input", "select"];

/// Score an attribute containing the whole description is worth.
const ATTRIBUTE_MATCH_SCORE: f64 = 0.6;

/// One interactive element recorded by a discovery sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    pub selector: String,
    pub text_content: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub element_type: String,
    pub confidence: f64,
    pub discovery_method: String,
    #[serde(rename = "last_seen")]
    pub last_seen_at: f64,
    #[serde(default)]
    pub access_count: u64,
    /// Page pattern the element was found on; empty in older documents
    #[serde(default)]
    pub url_pattern: String,
}

impl ElementDescriptor {
    /// `max(text similarity, attribute containment) × confidence`.
    pub fn matches_description(&self, description: &str) -> f64 {
        let description = description.trim().to_lowercase();
        let text_score = if self.text_content.is_empty() {
            0.0
        } else {
            similarity(&description, &self.text_content)
        };
        let attr_score = if self
            .attributes
            .values()
            .any(|v| !v.is_empty() && v.to_lowercase().contains(&description))
        {
            ATTRIBUTE_MATCH_SCORE
        } else {
            0.0
        };
        text_score.max(attr_score) * self.confidence
    }
}

/// Semantic type from role, tag and class, most specific first.
pub fn classify_element(tag_name: &str, role: &str, class: &str) -> String {
    if TYPED_ROLES.contains(&role) {
        return role.to_string();
    }
    if TYPED_TAGS.contains(&tag_name) {
        return tag_name.to_string();
    }
    if tag_name == "a" {
        return "link".into();
    }
    let class = class.to_lowercase();
    if class.contains("button") || class.contains("btn") {
        "button".into()
    } else if class.contains("menu") || class.contains("nav") {
        "menu".into()
    } else if class.contains("dropdown") || class.contains("select") {
        "dropdown".into()
    } else {
        "interactive".into()
    }
}

/// Confidence from text length and attribute richness, capped at 1.0.
pub fn element_confidence(
    text_content: &str,
    attributes: &BTreeMap<String, String>,
    element_type: &str,
) -> f64 {
    let mut confidence: f64 = 0.5;

    let text_len = text_content.chars().count();
    if text_len > 20 {
        confidence += 0.2;
    } else if text_len > 5 {
        confidence += 0.1;
    }

    let has = |name: &str| attributes.get(name).is_some_and(|v| !v.is_empty());
    if has("id") {
        confidence += 0.2;
    }
    if has("aria-label") {
        confidence += 0.15;
    }
    if has("role") {
        confidence += 0.1;
    }
    if CONFIDENT_TYPES.contains(&element_type) {
        confidence += 0.1;
    }

    confidence.min(1.0)
}
