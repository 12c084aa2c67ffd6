//! The strategy capability interface and the helpers strategies share.
//!
//! A strategy owns a fixed, ordered selector plan for one family of UI
//! patterns. It decides whether it applies to a description, queries its
//! selector groups in declared order, and scores visible nodes with its own
//! text extraction and scoring policy.

use crate::candidate::{CandidateMatch, MatchInfo};
use crate::context::ResolutionContext;
use crate::scoring;
use async_trait::async_trait;
use pinpoint_common::{DomError, DomProvider, NodeHandle};
use tracing::debug;

/// Selector that finds the text span nested inside composite buttons.
pub const NESTED_TEXT_SELECTOR: &str =
    ".dx-button-text, .button-text, .btn-text, span:not(.slds-assistive-text)";

/// One entry of a strategy's selector plan.
#[derive(Debug, Clone, Copy)]
pub struct SelectorGroup {
    pub selector: &'static str,
    pub label: &'static str,
}

impl SelectorGroup {
    pub const fn new(selector: &'static str, label: &'static str) -> Self {
        Self { selector, label }
    }
}

#[async_trait(?Send)]
pub trait Strategy {
    /// Stable name, used in stats, cache records and learning counters.
    fn name(&self) -> &'static str;

    /// Higher runs first.
    fn priority(&self) -> u8;

    /// Whether this strategy applies to the description / page.
    async fn can_handle(&self, ctx: &ResolutionContext<'_>) -> bool;

    /// Ordered selector plan.
    fn selector_groups(&self) -> &'static [SelectorGroup];

    /// Query the selector plan and return scored candidates.
    async fn find_elements(&self, ctx: &ResolutionContext<'_>) -> Vec<CandidateMatch>;

    /// Human-visible text used to match the node against the description.
    async fn extract_text(
        &self,
        ctx: &ResolutionContext<'_>,
        node: NodeHandle,
    ) -> Result<String, DomError> {
        default_text(ctx.page, node).await
    }

    /// Text similarity between the key terms and a node's text.
    fn similarity(&self, search: &str, text: &str) -> f64 {
        scoring::similarity(search, text)
    }

    /// Base similarity a node must exceed to be considered.
    fn threshold(&self) -> f64 {
        0.5
    }

    /// Added to qualifying scores.
    fn bonus(&self) -> f64 {
        0.0
    }
}

/// Tag, role, class and id of a node.
#[derive(Debug, Clone, Default)]
pub struct NodeFacts {
    pub tag_name: String,
    pub role: Option<String>,
    pub class: String,
    pub id: String,
}

impl NodeFacts {
    pub async fn read(page: &dyn DomProvider, node: NodeHandle) -> Result<Self, DomError> {
        Ok(Self {
            tag_name: page.tag_name(node).await?,
            role: page.attribute(node, "role").await?,
            class: page.attribute(node, "class").await?.unwrap_or_default(),
            id: page.attribute(node, "id").await?.unwrap_or_default(),
        })
    }

    pub fn class_lower(&self) -> String {
        self.class.to_lowercase()
    }

    pub fn into_info(self) -> MatchInfo {
        MatchInfo {
            tag_name: self.tag_name,
            role: self.role,
            class: self.class,
            id: self.id,
            ..MatchInfo::default()
        }
    }
}

/// Run a selector group. Query failures are logged and yield no nodes so
/// the strategy can move on to its next group.
pub async fn query_group(
    ctx: &ResolutionContext<'_>,
    strategy: &str,
    group: &SelectorGroup,
) -> Vec<NodeHandle> {
    match ctx.page.query_all(group.selector).await {
        Ok(nodes) => {
            debug!(strategy, group = group.label, count = nodes.len(), "selector group queried");
            nodes
        }
        Err(e) => {
            debug!(strategy, group = group.label, error = %e, "selector group failed");
            Vec::new()
        }
    }
}

/// Trimmed attribute value, `None` when absent or blank.
pub async fn trimmed_attr(
    page: &dyn DomProvider,
    node: NodeHandle,
    name: &str,
) -> Result<Option<String>, DomError> {
    Ok(page
        .attribute(node, name)
        .await?
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

/// Trimmed text content, `None` when blank.
pub async fn trimmed_text(page: &dyn DomProvider, node: NodeHandle) -> Result<Option<String>, DomError> {
    let text = page.text(node).await?;
    let text = text.trim();
    Ok(if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    })
}

/// Text of the first descendant matching `selector`.
pub async fn nested_text(
    page: &dyn DomProvider,
    node: NodeHandle,
    selector: &str,
) -> Result<Option<String>, DomError> {
    match page.query_within(node, selector).await?.first() {
        Some(inner) => trimmed_text(page, *inner).await,
        None => Ok(None),
    }
}

/// Default extraction chain: aria-label, nested label span, short direct
/// text, value, title, placeholder. First non-empty wins.
pub async fn default_text(page: &dyn DomProvider, node: NodeHandle) -> Result<String, DomError> {
    if let Some(label) = trimmed_attr(page, node, "aria-label").await? {
        return Ok(label);
    }
    if let Some(nested) = nested_text(page, node, NESTED_TEXT_SELECTOR).await? {
        return Ok(nested);
    }
    if let Some(text) = trimmed_text(page, node).await? {
        if text.chars().count() < 200 {
            return Ok(text);
        }
    }
    for attr in ["value", "title", "placeholder"] {
        if let Some(v) = trimmed_attr(page, node, attr).await? {
            return Ok(v);
        }
    }
    Ok(String::new())
}

/// Default scoring: visible, has text, base similarity above the strategy
/// threshold; score is similarity plus bonus.
pub async fn score_default<S: Strategy + ?Sized>(
    strategy: &S,
    ctx: &ResolutionContext<'_>,
    node: NodeHandle,
) -> Result<Option<CandidateMatch>, DomError> {
    if !ctx.page.is_visible(node).await? {
        return Ok(None);
    }
    let facts = NodeFacts::read(ctx.page, node).await?;
    let text = strategy.extract_text(ctx, node).await?;
    if text.is_empty() || ctx.is_excluded(&text) {
        return Ok(None);
    }

    let score = strategy.similarity(&ctx.key_terms, &text);
    if score <= strategy.threshold() {
        return Ok(None);
    }
    if ctx.debug {
        debug!(strategy = strategy.name(), %node, text = %text, score, "candidate scored");
    }
    Ok(Some(CandidateMatch::new(
        node,
        score + strategy.bonus(),
        format!("{} text match", strategy.name()),
        text,
        strategy.name(),
        facts.into_info(),
    )))
}

/// Swallow a per-candidate failure: the node simply does not match.
pub fn candidate_or_skip(
    strategy: &str,
    node: NodeHandle,
    result: Result<Option<CandidateMatch>, DomError>,
) -> Option<CandidateMatch> {
    match result {
        Ok(m) => m,
        Err(e) => {
            debug!(strategy, %node, error = %e, "candidate skipped");
            None
        }
    }
}

/// Sort strategies by descending priority. Stable for equal priorities.
pub fn sort_by_priority(strategies: &mut [Box<dyn Strategy>]) {
    strategies.sort_by(|a, b| b.priority().cmp(&a.priority()));
}
