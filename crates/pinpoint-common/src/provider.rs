use crate::error::DomError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Opaque reference to a node owned by a [`DomProvider`].
///
/// Handles are only meaningful to the provider that produced them and only
/// for as long as the underlying document is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHandle(u64);

impl NodeHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Page readiness tiers a provider can wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    /// The document has been parsed (DOMContentLoaded).
    ContentParsed,
    /// No network activity for a short quiet period.
    NetworkIdle,
}

/// Read-only access to a live page: selector queries, per-node accessors and
/// a narrow traversal capability.
///
/// The resolution engine is single-threaded, so implementations are not
/// required to be `Send`.
#[async_trait(?Send)]
pub trait DomProvider {
    /// Address of the page currently loaded.
    async fn current_url(&self) -> Result<String, DomError>;

    /// All nodes matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<NodeHandle>, DomError>;

    /// First node matching `selector`, if any.
    async fn query_one(&self, selector: &str) -> Result<Option<NodeHandle>, DomError> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    /// Descendants of `node` matching `selector`, in document order.
    async fn query_within(
        &self,
        node: NodeHandle,
        selector: &str,
    ) -> Result<Vec<NodeHandle>, DomError>;

    async fn is_visible(&self, node: NodeHandle) -> Result<bool, DomError>;

    async fn attribute(&self, node: NodeHandle, name: &str) -> Result<Option<String>, DomError>;

    /// Concatenated text content of the node and its descendants.
    async fn text(&self, node: NodeHandle) -> Result<String, DomError>;

    /// Lowercase tag name.
    async fn tag_name(&self, node: NodeHandle) -> Result<String, DomError>;

    /// Parent element, `None` at the document root.
    async fn parent(&self, node: NodeHandle) -> Result<Option<NodeHandle>, DomError>;

    /// Element children in document order.
    async fn children(&self, node: NodeHandle) -> Result<Vec<NodeHandle>, DomError>;

    /// Element siblings (the node itself excluded), in document order.
    async fn siblings(&self, node: NodeHandle) -> Result<Vec<NodeHandle>, DomError> {
        match self.parent(node).await? {
            Some(parent) => Ok(self
                .children(parent)
                .await?
                .into_iter()
                .filter(|n| *n != node)
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    /// The element sibling immediately before `node`.
    async fn previous_sibling(&self, node: NodeHandle) -> Result<Option<NodeHandle>, DomError> {
        let Some(parent) = self.parent(node).await? else {
            return Ok(None);
        };
        let children = self.children(parent).await?;
        let position = children.iter().position(|n| *n == node);
        Ok(match position {
            Some(idx) if idx > 0 => Some(children[idx - 1]),
            _ => None,
        })
    }

    /// Wait (bounded by `timeout`) for the page to reach `state`.
    async fn wait_for_ready(&self, state: ReadyState, timeout: Duration) -> Result<(), DomError> {
        let _ = (state, timeout);
        Err(DomError::NotSupported("wait_for_ready".into()))
    }
}
