use async_trait::async_trait;
use ego_tree::NodeId;
use pinpoint_common::{DomError, DomProvider, NodeHandle, ReadyState};
use scraper::{ElementRef, Html, Selector};
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;
use tracing::trace;

/// Tags whose content is never rendered.
const NON_RENDERED_TAGS: &[&str] = &[
    "head", "script", "style", "template", "noscript", "title", "meta", "link",
];

/// A static HTML document served through the [`DomProvider`] interface.
///
/// Handles are assigned in document order when the snapshot is parsed, so
/// the same markup always yields the same handles. Visibility is computed
/// from markup alone: `hidden`, inline `display:none` / `visibility:hidden`,
/// `input[type=hidden]` and non-rendered tags hide a node and its subtree.
pub struct HtmlSnapshot {
    url: String,
    document: Html,
    nodes: Vec<NodeId>,
    handles: HashMap<NodeId, NodeHandle>,
    queries: RefCell<Vec<String>>,
}

impl HtmlSnapshot {
    pub fn parse(url: &str, html: &str) -> Self {
        let document = Html::parse_document(html);
        let nodes: Vec<NodeId> = document
            .root_element()
            .descendants()
            .filter(|n| n.value().is_element())
            .map(|n| n.id())
            .collect();
        let handles = nodes
            .iter()
            .enumerate()
            .map(|(idx, id)| (*id, NodeHandle::new(idx as u64)))
            .collect();

        Self {
            url: url.to_string(),
            document,
            nodes,
            handles,
            queries: RefCell::new(Vec::new()),
        }
    }

    /// Number of element nodes in the document.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every selector passed to a query method, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }

    pub fn clear_queries(&self) {
        self.queries.borrow_mut().clear();
    }

    fn element(&self, node: NodeHandle) -> Result<ElementRef<'_>, DomError> {
        let id = self
            .nodes
            .get(node.raw() as usize)
            .ok_or(DomError::StaleNode(node.raw()))?;
        self.document
            .tree
            .get(*id)
            .and_then(ElementRef::wrap)
            .ok_or(DomError::StaleNode(node.raw()))
    }

    fn handle(&self, element: &ElementRef<'_>) -> Option<NodeHandle> {
        self.handles.get(&element.id()).copied()
    }

    fn selector(&self, selector: &str) -> Result<Selector, DomError> {
        self.queries.borrow_mut().push(selector.to_string());
        trace!(selector, "snapshot query");
        Selector::parse(selector).map_err(|e| DomError::invalid_selector(selector, format!("{e:?}")))
    }

    fn hides_subtree(element: &ElementRef<'_>) -> bool {
        let value = element.value();
        if NON_RENDERED_TAGS.contains(&value.name()) || value.attr("hidden").is_some() {
            return true;
        }
        if value.name() == "input"
            && value
                .attr("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
        {
            return true;
        }
        if let Some(style) = value.attr("style") {
            let style: String = style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase();
            if style.contains("display:none") || style.contains("visibility:hidden") {
                return true;
            }
        }
        false
    }
}

#[async_trait(?Send)]
impl DomProvider for HtmlSnapshot {
    async fn current_url(&self) -> Result<String, DomError> {
        Ok(self.url.clone())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<NodeHandle>, DomError> {
        let selector = self.selector(selector)?;
        Ok(self
            .document
            .select(&selector)
            .filter_map(|el| self.handle(&el))
            .collect())
    }

    async fn query_within(
        &self,
        node: NodeHandle,
        selector: &str,
    ) -> Result<Vec<NodeHandle>, DomError> {
        let scope = self.element(node)?;
        let selector = self.selector(selector)?;
        Ok(scope
            .select(&selector)
            .filter(|el| el.id() != scope.id())
            .filter_map(|el| self.handle(&el))
            .collect())
    }

    async fn is_visible(&self, node: NodeHandle) -> Result<bool, DomError> {
        let mut current = Some(self.element(node)?);
        while let Some(el) = current {
            if Self::hides_subtree(&el) {
                return Ok(false);
            }
            current = el.parent().and_then(ElementRef::wrap);
        }
        Ok(true)
    }

    async fn attribute(&self, node: NodeHandle, name: &str) -> Result<Option<String>, DomError> {
        Ok(self.element(node)?.value().attr(name).map(String::from))
    }

    async fn text(&self, node: NodeHandle) -> Result<String, DomError> {
        Ok(self.element(node)?.text().collect())
    }

    async fn tag_name(&self, node: NodeHandle) -> Result<String, DomError> {
        Ok(self.element(node)?.value().name().to_lowercase())
    }

    async fn parent(&self, node: NodeHandle) -> Result<Option<NodeHandle>, DomError> {
        let element = self.element(node)?;
        Ok(element
            .parent()
            .and_then(ElementRef::wrap)
            .and_then(|p| self.handle(&p)))
    }

    async fn children(&self, node: NodeHandle) -> Result<Vec<NodeHandle>, DomError> {
        let element = self.element(node)?;
        Ok(element
            .children()
            .filter_map(ElementRef::wrap)
            .filter_map(|c| self.handle(&c))
            .collect())
    }

    async fn wait_for_ready(&self, _state: ReadyState, _timeout: Duration) -> Result<(), DomError> {
        Ok(())
    }
}
