//! Element-resolution engine: the resolver loop, the persistent candidate
//! cache with its learning counters, the page discovery catalog, and
//! configuration.

pub mod cache;
pub mod config;
pub mod discovery;
pub mod resolver;
pub mod storage;

pub use cache::{CacheEntry, CacheStats, CandidateCache};
pub use config::{ConfigError, ConfigLoader, PinpointConfig};
pub use discovery::{CatalogMatch, CatalogStats, DiscoveryCatalog, ElementDescriptor};
pub use resolver::{
    BuildError, ElementResolver, Resolution, ResolveError, ResolvedElement, ResolverBuilder,
    StatsSnapshot,
};
pub use storage::StorageError;
