//! DOM provider over static HTML, for tests and offline resolution of saved
//! pages.

pub mod sequence;
pub mod snapshot;

pub use sequence::SnapshotSequence;
pub use snapshot::HtmlSnapshot;
