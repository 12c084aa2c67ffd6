pub mod entry;
pub mod keys;
pub mod learning;
pub mod store;

pub use entry::CacheEntry;
pub use learning::LearningLedger;
pub use store::{CacheStats, CandidateCache, LEGACY_DOCUMENT};
