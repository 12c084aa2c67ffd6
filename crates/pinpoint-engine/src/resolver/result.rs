use pinpoint_common::{DomError, NodeHandle};
use serde::Serialize;
use thiserror::Error;

/// The element a description resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedElement {
    pub node: NodeHandle,
    /// Selector that finds the node again in a later session
    pub selector: String,
    pub score: f64,
    pub strategy: String,
    pub matched_text: String,
    pub from_cache: bool,
}

/// Outcome of a resolve call. Not finding anything is a normal result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Found(ResolvedElement),
    NotFound { description: String, attempts: u32 },
}

impl Resolution {
    pub fn found(&self) -> Option<&ResolvedElement> {
        match self {
            Resolution::Found(element) => Some(element),
            Resolution::NotFound { .. } => None,
        }
    }

    pub fn node(&self) -> Option<NodeHandle> {
        self.found().map(|e| e.node)
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Could not read page URL: {0}")]
    PageUrl(DomError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("No DOM provider supplied")]
    MissingProvider,
}
