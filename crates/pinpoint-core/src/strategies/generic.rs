//! Catch-all fallback over any interactive-looking node.
//!
//! Same relevance/penalty shape as the button strategy but stricter: no
//! bonus, heavier container penalties and a 0.6 threshold. Selector tiers
//! widen until something matches, with node caps so the `*` tier stays
//! cheap.

use crate::candidate::CandidateMatch;
use crate::context::ResolutionContext;
use crate::scoring::{self, RelevanceProfile, contains_any};
use crate::strategy::{
    NodeFacts, SelectorGroup, Strategy, candidate_or_skip, query_group, trimmed_attr,
    trimmed_text,
};
use async_trait::async_trait;
use pinpoint_common::{DomError, NodeHandle};
use tracing::debug;

const UNRESTRICTED: &str = "*";
const UNRESTRICTED_CAP: usize = 20;
const TIER_CAP: usize = 50;

const CONTAINER_TAGS: &[&str] = &["div", "span", "section", "main"];
const INTERACTIVE_CLASSES: &[&str] = &["button", "btn", "clickable", "interactive"];
const CONTAINER_HINTS: &[&str] = &[
    "content", "container", "wrapper", "main", "body", "section", "grid", "col", "layout",
];
const FRAMEWORK_CONTAINERS: &[&str] = &[
    "maincontentmark",
    "slds-grid",
    "slds-col",
    "slds-container",
    "slds-page-header",
];

static GROUPS: &[SelectorGroup] = &[
    SelectorGroup::new(
        "input, button, textarea, select, a[href]",
        "standard interactive elements",
    ),
    SelectorGroup::new(
        r#"[role="button"], [role="menuitem"], [role="option"], [role="combobox"]"#,
        "ARIA interactive elements",
    ),
    SelectorGroup::new("[onclick], [tabindex]", "clickable elements"),
    SelectorGroup::new(
        r#"div[class*="button"], div[class*="menu"], div[class*="item"]"#,
        "styled interactive elements",
    ),
    SelectorGroup::new(UNRESTRICTED, "all elements"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct GenericStrategy;

impl GenericStrategy {
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
        let relevance = scoring::relevance(&ctx.key_terms, &text, RelevanceProfile::Proportion);
        let penalty = container_penalty(&text, &facts);
        let score = scoring::clamp_score(base * relevance - penalty + self.bonus());

        if ctx.debug {
            debug!(%node, text = %text, base, relevance, penalty, score, "generic candidate");
        }
        if score <= self.threshold() {
            return Ok(None);
        }

        let mut info = facts.into_info();
        info.base_score = Some(base);
        info.relevance = Some(relevance);
        info.container_penalty = Some(penalty);
        Ok(Some(CandidateMatch::new(
            node,
            score,
            "GenericStrategy enhanced text match",
            text,
            self.name(),
            info,
        )))
    }
}

fn container_penalty(text: &str, facts: &NodeFacts) -> f64 {
    let class = facts.class_lower();
    let id = facts.id.to_lowercase();
    let len = text.chars().count();
    let mut penalty = 0.0;

    if len > 100 {
        penalty += 0.4;
    } else if len > 50 {
        penalty += 0.2;
    }
    if CONTAINER_TAGS.contains(&facts.tag_name.as_str()) && !contains_any(&class, INTERACTIVE_CLASSES) {
        penalty += 0.2;
    }
    if contains_any(&class, CONTAINER_HINTS) {
        penalty += 0.3;
    }
    if contains_any(&id, CONTAINER_HINTS) {
        penalty += 0.3;
    }
    if contains_any(&class, FRAMEWORK_CONTAINERS) {
        penalty += 0.5;
    }
    penalty
}

#[async_trait(?Send)]
impl Strategy for GenericStrategy {
    fn name(&self) -> &'static str {
        "GenericStrategy"
    }

    fn priority(&self) -> u8 {
        10
    }

    async fn can_handle(&self, _ctx: &ResolutionContext<'_>) -> bool {
        true
    }

    fn selector_groups(&self) -> &'static [SelectorGroup] {
        GROUPS
    }

    async fn find_elements(&self, ctx: &ResolutionContext<'_>) -> Vec<CandidateMatch> {
        let mut matches = Vec::new();
        for group in self.selector_groups() {
            let unrestricted = group.selector == UNRESTRICTED;
            let cap = if unrestricted { UNRESTRICTED_CAP } else { TIER_CAP };

            for node in query_group(ctx, self.name(), group).await.into_iter().take(cap) {
                let result = self.score(ctx, node).await;
                let Some(m) = candidate_or_skip(self.name(), node, result) else {
                    continue;
                };
                if m.score() >= 0.9 {
                    debug!(score = m.score(), "high-confidence generic match");
                    return vec![m];
                }
                matches.push(m);
            }

            if !matches.is_empty() && !unrestricted {
                break;
            }
        }
        matches
    }

    /// Short text content, aria-label, title, value, placeholder, alt.
    async fn extract_text(
        &self,
        ctx: &ResolutionContext<'_>,
        node: NodeHandle,
    ) -> Result<String, DomError> {
        if let Some(text) = trimmed_text(ctx.page, node).await? {
            if text.chars().count() < 150 {
                return Ok(text);
            }
        }
        for attr in ["aria-label", "title", "value", "placeholder", "alt"] {
            if let Some(v) = trimmed_attr(ctx.page, node, attr).await? {
                return Ok(v);
            }
        }
        Ok(String::new())
    }

    fn threshold(&self) -> f64 {
        0.6
    }

    fn bonus(&self) -> f64 {
        0.0
    }
}
