pub mod error;
pub mod provider;

pub use error::DomError;
pub use provider::{DomProvider, NodeHandle, ReadyState};
