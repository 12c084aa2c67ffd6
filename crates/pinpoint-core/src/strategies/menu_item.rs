//! Menu items and navigation entries.

use crate::candidate::CandidateMatch;
use crate::context::ResolutionContext;
use crate::strategy::{
    SelectorGroup, Strategy, candidate_or_skip, query_group, score_default, trimmed_attr,
    trimmed_text,
};
use async_trait::async_trait;
use pinpoint_common::{DomError, NodeHandle};
use tracing::debug;

const TRIGGER_WORDS: &[&str] = &["menu", "nav", "item", "option", "logout", "profile"];

static GROUPS: &[SelectorGroup] = &[
    SelectorGroup::new(r#"[role="menuitem"], [role="option"]"#, "ARIA menu items"),
    SelectorGroup::new(".dx-menu-item-text", "DevExtreme menu item text"),
    SelectorGroup::new("nav a, nav button, nav li", "navigation elements"),
    SelectorGroup::new(
        r#"[class*="menu"] a, [class*="menu"] button, [class*="menu"] li"#,
        "menu-styled elements",
    ),
    SelectorGroup::new("li a, li button, li span[onclick]", "list item links"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct MenuItemStrategy;

impl MenuItemStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait(?Send)]
impl Strategy for MenuItemStrategy {
    fn name(&self) -> &'static str {
        "MenuItemStrategy"
    }

    fn priority(&self) -> u8 {
        75
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
                let result = score_default(self, ctx, node).await;
                let Some(m) = candidate_or_skip(self.name(), node, result) else {
                    continue;
                };
                let is_menuitem = m
                    .match_info
                    .role
                    .as_deref()
                    .is_some_and(|r| r.contains("menuitem"));
                if m.score() >= 0.8 && is_menuitem {
                    debug!(score = m.score(), "high-confidence menu item match");
                    return vec![m];
                }
                matches.push(m);
            }
        }
        matches
    }

    /// Text content first; menu entries rarely label themselves otherwise.
    async fn extract_text(
        &self,
        ctx: &ResolutionContext<'_>,
        node: NodeHandle,
    ) -> Result<String, DomError> {
        if let Some(text) = trimmed_text(ctx.page, node).await? {
            return Ok(text);
        }
        for attr in ["aria-label", "title"] {
            if let Some(v) = trimmed_attr(ctx.page, node, attr).await? {
                return Ok(v);
            }
        }
        Ok(String::new())
    }

    fn threshold(&self) -> f64 {
        0.5
    }

    fn bonus(&self) -> f64 {
        0.3
    }
}
