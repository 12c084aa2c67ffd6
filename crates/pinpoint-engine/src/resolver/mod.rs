pub mod builder;
pub mod orchestrator;
pub mod result;
pub mod stats;

pub use builder::ResolverBuilder;
pub use orchestrator::{ElementResolver, backoff_delay};
pub use result::{BuildError, Resolution, ResolveError, ResolvedElement};
pub use stats::{CACHE_LABEL, PerformanceStats, StatsSnapshot, StrategyUsageSnapshot};
