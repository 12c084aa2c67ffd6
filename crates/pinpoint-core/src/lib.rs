//! Element-resolution core: scoring primitives, the per-call resolution
//! context, the strategy interface with its five built-in strategies, and
//! selector synthesis.

pub mod candidate;
pub mod context;
pub mod scoring;
pub mod selector;
pub mod strategies;
pub mod strategy;

pub use candidate::{CandidateMatch, MatchInfo};
pub use context::ResolutionContext;
pub use strategies::default_strategies;
pub use strategy::{SelectorGroup, Strategy};
