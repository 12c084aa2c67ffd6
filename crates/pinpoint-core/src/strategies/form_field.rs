//! Form fields: text inputs, textareas and selects.

use crate::candidate::CandidateMatch;
use crate::context::ResolutionContext;
use crate::scoring::split_identifier;
use crate::strategy::{
    SelectorGroup, Strategy, candidate_or_skip, query_group, score_default, trimmed_attr,
    trimmed_text,
};
use async_trait::async_trait;
use pinpoint_common::{DomError, DomProvider, NodeHandle};

const TRIGGER_WORDS: &[&str] = &["field", "input", "email", "password", "name", "address", "phone"];

/// Identifier fragments worth turning into words.
const MEANINGFUL_IDENTIFIERS: &[&str] =
    &["email", "password", "name", "phone", "address", "city", "zip"];

/// How many ancestors are checked for a wrapping `<label>`.
const WRAPPING_LABEL_DEPTH: usize = 4;

static GROUPS: &[SelectorGroup] = &[
    SelectorGroup::new(
        r#"input[type="text"], input[type="email"], input[type="password"], input:not([type]), textarea"#,
        "text inputs",
    ),
    SelectorGroup::new("input, textarea, select", "all form fields"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct FormFieldStrategy;

impl FormFieldStrategy {
    pub fn new() -> Self {
        Self
    }
}

/// Label text for a field, trying in order:
///
/// 1. `label[for=<id>]`
/// 2. A `<label>` ancestor a few levels up
/// 3. A `<label>` immediately before the parent or grandparent
pub async fn associated_label(
    page: &dyn DomProvider,
    node: NodeHandle,
) -> Result<Option<String>, DomError> {
    if let Some(id) = trimmed_attr(page, node, "id").await? {
        let selector = format!(r#"label[for="{}"]"#, id.replace('\\', "\\\\").replace('"', "\\\""));
        if let Ok(Some(label)) = page.query_one(&selector).await {
            if let Some(text) = trimmed_text(page, label).await? {
                return Ok(Some(text));
            }
        }
    }

    let mut current = page.parent(node).await?;
    let mut depth = 0;
    while let Some(ancestor) = current {
        let tag = page.tag_name(ancestor).await?;
        if tag == "label" {
            return trimmed_text(page, ancestor).await;
        }
        if tag == "body" || depth + 1 >= WRAPPING_LABEL_DEPTH {
            break;
        }
        current = page.parent(ancestor).await?;
        depth += 1;
    }

    let parent = page.parent(node).await?;
    let grandparent = match parent {
        Some(p) => page.parent(p).await?,
        None => None,
    };
    for level in [parent, grandparent].into_iter().flatten() {
        if let Some(sibling) = page.previous_sibling(level).await? {
            if page.tag_name(sibling).await? == "label" {
                return trimmed_text(page, sibling).await;
            }
        }
    }
    Ok(None)
}

fn readable_identifier(value: &str) -> Option<String> {
    let lower = value.to_lowercase();
    if MEANINGFUL_IDENTIFIERS.iter().any(|t| lower.contains(t)) {
        Some(split_identifier(value)).filter(|w| !w.is_empty())
    } else {
        None
    }
}

#[async_trait(?Send)]
impl Strategy for FormFieldStrategy {
    fn name(&self) -> &'static str {
        "FormFieldStrategy"
    }

    fn priority(&self) -> u8 {
        80
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
                matches.extend(candidate_or_skip(self.name(), node, result));
            }
        }
        matches
    }

    /// placeholder, associated label, aria-label, readable name / id.
    async fn extract_text(
        &self,
        ctx: &ResolutionContext<'_>,
        node: NodeHandle,
    ) -> Result<String, DomError> {
        let page = ctx.page;
        if let Some(placeholder) = trimmed_attr(page, node, "placeholder").await? {
            return Ok(placeholder);
        }
        if let Some(label) = associated_label(page, node).await? {
            return Ok(label);
        }
        if let Some(label) = trimmed_attr(page, node, "aria-label").await? {
            return Ok(label);
        }
        for attr in ["name", "id"] {
            if let Some(value) = trimmed_attr(page, node, attr).await? {
                if let Some(words) = readable_identifier(&value) {
                    return Ok(words);
                }
            }
        }
        Ok(String::new())
    }

    fn threshold(&self) -> f64 {
        0.3
    }

    fn bonus(&self) -> f64 {
        0.2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readable_identifier() {
        assert_eq!(readable_identifier("userEmail").as_deref(), Some("User Email"));
        assert_eq!(readable_identifier("zip_code").as_deref(), Some("Zip Code"));
        assert_eq!(readable_identifier("email").as_deref(), Some("Email"));
        assert_eq!(readable_identifier("field_17"), None);
    }
}
