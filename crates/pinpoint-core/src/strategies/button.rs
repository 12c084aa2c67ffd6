//! Buttons: native buttons, ARIA buttons and styled clickables.
//!
//! Scoring multiplies the base similarity by a relevance factor, then adds a
//! type bonus and subtracts a container penalty so that a real `<button>`
//! beats the panel that happens to contain the same words.

use crate::candidate::CandidateMatch;
use crate::context::ResolutionContext;
use crate::scoring::{self, RelevanceProfile, contains_any};
use crate::strategy::{
    NESTED_TEXT_SELECTOR, NodeFacts, SelectorGroup, Strategy, candidate_or_skip, nested_text,
    query_group, trimmed_attr, trimmed_text,
};
use async_trait::async_trait;
use pinpoint_common::{DomError, NodeHandle};
use tracing::debug;

const TRIGGER_WORDS: &[&str] = &["button", "click", "submit", "login", "save", "next", "back"];
const BUTTON_CLASSES: &[&str] = &["btn", "button", "slds-button", "dx-button"];
const CONTAINER_HINTS: &[&str] = &["content", "container", "wrapper", "main", "body", "section"];
const FRAMEWORK_CONTAINERS: &[&str] = &["maincontentmark", "slds-grid", "slds-col", "slds-container"];
const MEANINGLESS_TEXT: &[&str] = &["...", "button"];

static GROUPS: &[SelectorGroup] = &[
    SelectorGroup::new(
        r#"button, input[type="button"], input[type="submit"]"#,
        "native buttons",
    ),
    SelectorGroup::new(
        r#"div[role="button"], a[role="button"], span[role="button"]"#,
        "role-based buttons",
    ),
    SelectorGroup::new(r#"a[class*="button"], a[class*="btn"]"#, "link buttons"),
    SelectorGroup::new(
        r#"[class*="button"]:not([class*="container"]):not([class*="wrapper"]), [class*="btn"]:not([class*="container"]):not([class*="wrapper"])"#,
        "styled buttons",
    ),
    SelectorGroup::new("[onclick], [tabindex]", "clickable elements"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct ButtonStrategy;

impl ButtonStrategy {
    pub fn new() -> Self {
        Self
    }

    async fn score(
        &self,
        ctx: &ResolutionContext<'_>,
        node: NodeHandle,
    ) -> Result<Option<CandidateMatch>, DomError> {
        if !ctx.page.is_visible(node).await? {
            return Ok(None);
        }
        let facts = NodeFacts::read(ctx.page, node).await?;
        let text = self.extract_text(ctx, node).await?;
        if text.is_empty() || ctx.is_excluded(&text) {
            return Ok(None);
        }

        let base = self.similarity(&ctx.key_terms, &text);
        if base <= self.threshold() {
            return Ok(None);
        }
        let relevance = scoring::relevance(&ctx.key_terms, &text, RelevanceProfile::Prominence);
        let type_bonus = type_bonus(&facts);
        let penalty = container_penalty(&text, &facts);
        let score = scoring::clamp_score(base * relevance + type_bonus - penalty + self.bonus());

        if ctx.debug {
            debug!(%node, text = %text, base, relevance, type_bonus, penalty, score, "button candidate");
        }
        if score <= self.threshold() {
            return Ok(None);
        }

        let mut info = facts.into_info();
        info.base_score = Some(base);
        info.relevance = Some(relevance);
        info.type_bonus = Some(type_bonus);
        info.container_penalty = Some(penalty);
        Ok(Some(CandidateMatch::new(
            node,
            score,
            "ButtonStrategy enhanced text match",
            text,
            self.name(),
            info,
        )))
    }
}

/// Native controls beat ARIA buttons, which beat class-name guesses.
fn type_bonus(facts: &NodeFacts) -> f64 {
    if facts.tag_name == "button" || facts.tag_name == "input" {
        return 0.2;
    }
    if facts.role.as_deref() == Some("button") {
        return 0.15;
    }
    if contains_any(&facts.class_lower(), BUTTON_CLASSES) {
        return 0.1;
    }
    0.0
}

fn container_penalty(text: &str, facts: &NodeFacts) -> f64 {
    let class = facts.class_lower();
    let id = facts.id.to_lowercase();
    let mut penalty = 0.0;
    if text.chars().count() > 100 {
        penalty += 0.2;
    }
    if contains_any(&class, CONTAINER_HINTS) {
        penalty += 0.15;
    }
    if contains_any(&id, CONTAINER_HINTS) {
        penalty += 0.15;
    }
    if contains_any(&class, FRAMEWORK_CONTAINERS) {
        penalty += 0.3;
    }
    penalty
}

#[async_trait(?Send)]
impl Strategy for ButtonStrategy {
    fn name(&self) -> &'static str {
        "ButtonStrategy"
    }

    fn priority(&self) -> u8 {
        85
    }

    async fn can_handle(&self, ctx: &ResolutionContext<'_>) -> bool {
        ctx.mentions_any(TRIGGER_WORDS)
    }

    fn selector_groups(&self) -> &'static [SelectorGroup] {
        GROUPS
    }

    async fn find_elements(&self, ctx: &ResolutionContext<'_>) -> Vec<CandidateMatch> {
        let mut matches = Vec::new();
        for group in self.selector_groups() {
            for node in query_group(ctx, self.name(), group).await {
                let result = self.score(ctx, node).await;
                let Some(m) = candidate_or_skip(self.name(), node, result) else {
                    continue;
                };
                if m.score() >= 0.9 {
                    debug!(score = m.score(), "high-confidence button match");
                    return vec![m];
                }
                matches.push(m);
            }
        }
        matches
    }

    /// aria-label, nested text span, short text content, value, title.
    async fn extract_text(
        &self,
        ctx: &ResolutionContext<'_>,
        node: NodeHandle,
    ) -> Result<String, DomError> {
        let page = ctx.page;
        let mut texts = Vec::new();
        texts.extend(trimmed_attr(page, node, "aria-label").await?);
        texts.extend(nested_text(page, node, NESTED_TEXT_SELECTOR).await?);
        if let Some(text) = trimmed_text(page, node).await? {
            if text.chars().count() < 200 {
                texts.push(text);
            }
        }
        texts.extend(trimmed_attr(page, node, "value").await?);
        texts.extend(trimmed_attr(page, node, "title").await?);

        Ok(texts
            .into_iter()
            .find(|t| !MEANINGLESS_TEXT.contains(&t.to_lowercase().as_str()))
            .unwrap_or_default())
    }

    fn threshold(&self) -> f64 {
        0.5
    }

    fn bonus(&self) -> f64 {
        0.3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(tag: &str, role: Option<&str>, class: &str, id: &str) -> NodeFacts {
        NodeFacts {
            tag_name: tag.to_string(),
            role: role.map(String::from),
            class: class.to_string(),
            id: id.to_string(),
        }
    }

    #[test]
    fn test_type_bonus_ordering() {
        assert_eq!(type_bonus(&facts("button", None, "", "")), 0.2);
        assert_eq!(type_bonus(&facts("div", Some("button"), "", "")), 0.15);
        assert_eq!(type_bonus(&facts("a", None, "btn-primary", "")), 0.1);
        assert_eq!(type_bonus(&facts("span", None, "label", "")), 0.0);
    }

    #[test]
    fn test_container_penalty() {
        assert_eq!(container_penalty("Save", &facts("button", None, "", "")), 0.0);
        let p = container_penalty("Save", &facts("div", None, "page-wrapper slds-grid", "main"));
        assert!((p - 0.6).abs() < 1e-9);
        let long = "x".repeat(101);
        assert!((container_penalty(&long, &facts("div", None, "", "")) - 0.2).abs() < 1e-9);
    }
}
