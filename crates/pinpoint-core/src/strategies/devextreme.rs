//! DevExtreme widgets: select boxes, list items, menu items, dx buttons.
//!
//! DevExtreme renders most of its labels out of band (title attributes on
//! wrappers, labels in the surrounding form row, camelCase widget ids), so
//! text extraction walks a longer chain than the other strategies.

use crate::candidate::CandidateMatch;
use crate::context::ResolutionContext;
use crate::scoring::identifier_to_words;
use crate::strategy::{
    SelectorGroup, Strategy, candidate_or_skip, nested_text, query_group, score_default,
    trimmed_attr, trimmed_text,
};
use async_trait::async_trait;
use pinpoint_common::{DomError, DomProvider, NodeHandle};
use tracing::debug;

const MARKER_SELECTOR: &str = r#"[class*="dx-"]"#;
const DROPDOWN_WORDS: &[&str] = &["dropdown", "select", "type", "category", "choose"];
const MENU_WORDS: &[&str] = &["logout", "login", "menu", "profile", "switch"];

static GROUPS: &[SelectorGroup] = &[
    SelectorGroup::new(".dx-list-item-content", "list item content"),
    SelectorGroup::new(".dx-item-content", "item content"),
    SelectorGroup::new(
        r#"[class*="dx-selectbox"], [class*="dx-dropdowneditor"]"#,
        "dropdowns",
    ),
    SelectorGroup::new(r#"[class*="dx-button"]"#, "buttons"),
    SelectorGroup::new(r#"[class*="dx-menu-item-text"]"#, "menu item text"),
    SelectorGroup::new(
        r#"[class*="dx-textbox"], [class*="dx-texteditor"]"#,
        "text inputs",
    ),
    SelectorGroup::new(r#"[role="option"]"#, "dropdown options"),
    SelectorGroup::new(MARKER_SELECTOR, "all components"),
    SelectorGroup::new(r#"[role="combobox"]"#, "comboboxes"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct DevExtremeStrategy;

impl DevExtremeStrategy {
    pub fn new() -> Self {
        Self
    }
}

fn is_item_content(class: &str) -> bool {
    class.contains("dx-list-item-content") || class.contains("dx-item-content")
}

fn has_class_token(class: &str, token: &str) -> bool {
    class.split_whitespace().any(|c| c == token)
}

/// Nearest ancestor-or-self whose class attribute satisfies `pred`.
async fn closest(
    page: &dyn DomProvider,
    node: NodeHandle,
    pred: impl Fn(&str) -> bool,
) -> Result<Option<NodeHandle>, DomError> {
    let mut current = Some(node);
    while let Some(n) = current {
        let class = page.attribute(n, "class").await?.unwrap_or_default();
        if pred(&class) {
            return Ok(Some(n));
        }
        current = page.parent(n).await?;
    }
    Ok(None)
}

/// First non-empty `title` on an ancestor below `<body>`.
async fn ancestor_title(page: &dyn DomProvider, node: NodeHandle) -> Result<Option<String>, DomError> {
    let mut current = page.parent(node).await?;
    while let Some(n) = current {
        if page.tag_name(n).await? == "body" {
            break;
        }
        if let Some(title) = trimmed_attr(page, n, "title").await? {
            return Ok(Some(title));
        }
        current = page.parent(n).await?;
    }
    Ok(None)
}

/// Label belonging to the form row that hosts a select box.
async fn row_label(page: &dyn DomProvider, node: NodeHandle) -> Result<Option<String>, DomError> {
    let container = closest(page, node, |class| {
        has_class_token(class, "dx-selectbox") || has_class_token(class, "dx-dropdowneditor")
    })
    .await?;
    let Some(container) = container else {
        return Ok(None);
    };

    let row = closest(page, container, |class| {
        has_class_token(class, "row")
            || has_class_token(class, "form-group")
            || has_class_token(class, "col-md-19")
            || class.contains("col-")
    })
    .await?;
    if let Some(row) = row {
        if let Some(label) = nested_text(page, row, "label").await? {
            return Ok(Some(label));
        }
    }

    if let Some(parent) = page.parent(container).await? {
        return nested_text(page, parent, "label").await;
    }
    Ok(None)
}

#[async_trait(?Send)]
impl Strategy for DevExtremeStrategy {
    fn name(&self) -> &'static str {
        "DevExtremeStrategy"
    }

    fn priority(&self) -> u8 {
        90
    }

    async fn can_handle(&self, ctx: &ResolutionContext<'_>) -> bool {
        if let Ok(Some(_)) = ctx.page.query_one(MARKER_SELECTOR).await {
            return true;
        }
        ctx.mentions_any(DROPDOWN_WORDS) || ctx.mentions_any(MENU_WORDS)
    }

    fn selector_groups(&self) -> &'static [SelectorGroup] {
        GROUPS
    }

    async fn find_elements(&self, ctx: &ResolutionContext<'_>) -> Vec<CandidateMatch> {
        let mut matches = Vec::new();
        for group in self.selector_groups() {
            for node in query_group(ctx, self.name(), group).await {
                let result = score_default(self, ctx, node).await;
                let Some(mut m) = candidate_or_skip(self.name(), node, result) else {
                    continue;
                };

                if m.matched_text.to_lowercase() == ctx.description && is_item_content(&m.match_info.class) {
                    m.boost_to(0.95);
                    debug!(score = m.score(), "verbatim list item match");
                    return vec![m];
                }
                if m.score() >= 0.85 {
                    debug!(score = m.score(), "high-confidence DevExtreme match");
                    return vec![m];
                }
                matches.push(m);
            }
        }
        matches
    }

    async fn extract_text(
        &self,
        ctx: &ResolutionContext<'_>,
        node: NodeHandle,
    ) -> Result<String, DomError> {
        let page = ctx.page;

        if let Some(title) = trimmed_attr(page, node, "title").await? {
            return Ok(title);
        }

        let role = page.attribute(node, "role").await?;
        if role.as_deref() == Some("combobox") && page.tag_name(node).await? == "input" {
            if let Some(title) = ancestor_title(page, node).await? {
                return Ok(title);
            }
            if let Some(label) = row_label(page, node).await? {
                return Ok(label);
            }
        }

        if let Some(label) = trimmed_attr(page, node, "aria-label").await? {
            return Ok(label);
        }

        let class = page.attribute(node, "class").await?.unwrap_or_default().to_lowercase();
        if class.contains("dx-selectbox") || class.contains("dx-dropdowneditor") {
            if let Some(id) = trimmed_attr(page, node, "id").await? {
                if let Some(words) = identifier_to_words(&id) {
                    return Ok(words);
                }
            }
        }

        if class.contains("dx-button") {
            if let Some(text) = nested_text(page, node, ".dx-button-text").await? {
                return Ok(text);
            }
        }

        // Menu item text, list item content and plain nodes all fall back to
        // their own text content.
        if let Some(text) = trimmed_text(page, node).await? {
            return Ok(text);
        }
        Ok(trimmed_attr(page, node, "placeholder").await?.unwrap_or_default())
    }

    fn threshold(&self) -> f64 {
        0.3
    }

    fn bonus(&self) -> f64 {
        0.4
    }
}
