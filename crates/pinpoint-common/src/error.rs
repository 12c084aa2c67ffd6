use thiserror::Error;

/// Errors surfaced by a [`DomProvider`](crate::DomProvider) implementation.
#[derive(Debug, Clone, Error)]
pub enum DomError {
    /// The selector could not be parsed by the provider.
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// The handle no longer refers to a live node (page changed, node detached).
    #[error("Stale node handle: {0}")]
    StaleNode(u64),

    /// A readiness wait did not complete in time.
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// The provider does not implement this capability.
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Transport / driver failure.
    #[error("Driver error: {0}")]
    Driver(String),
}

impl DomError {
    pub fn invalid_selector(selector: &str, reason: impl ToString) -> Self {
        DomError::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }
}
