use super::orchestrator::ElementResolver;
use super::result::BuildError;
use super::stats::PerformanceStats;
use crate::cache::CandidateCache;
use crate::config::PinpointConfig;
use pinpoint_common::DomProvider;
use pinpoint_core::Strategy;
use pinpoint_core::strategies::default_strategies;
use pinpoint_core::strategy::sort_by_priority;

/// Assembles an [`ElementResolver`].
///
/// Only the DOM provider is required. Without an explicit cache the builder
/// opens one from the configured directory (or an empty, disabled one when
/// caching is off); without explicit strategies the five built-in ones are
/// used.
pub struct ResolverBuilder<P> {
    provider: Option<P>,
    config: PinpointConfig,
    strategies: Option<Vec<Box<dyn Strategy>>>,
    cache: Option<CandidateCache>,
}

impl<P> Default for ResolverBuilder<P> {
    fn default() -> Self {
        Self {
            provider: None,
            config: PinpointConfig::default(),
            strategies: None,
            cache: None,
        }
    }
}

impl<P: DomProvider> ResolverBuilder<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider: P) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn config(mut self, config: PinpointConfig) -> Self {
        self.config = config;
        self
    }

    pub fn strategies(mut self, strategies: Vec<Box<dyn Strategy>>) -> Self {
        self.strategies = Some(strategies);
        self
    }

    pub fn cache(mut self, cache: CandidateCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub async fn build(self) -> Result<ElementResolver<P>, BuildError> {
        let page = self.provider.ok_or(BuildError::MissingProvider)?;

        let mut strategies = self.strategies.unwrap_or_else(default_strategies);
        sort_by_priority(&mut strategies);

        let cache_enabled = self.config.cache.enabled;
        let cache = match self.cache {
            Some(cache) => cache,
            None if cache_enabled => CandidateCache::open(&self.config.cache).await,
            None => CandidateCache::new(&self.config.cache),
        };

        Ok(ElementResolver {
            page,
            strategies,
            cache,
            cache_enabled,
            config: self.config.resolver,
            stats: PerformanceStats::new(),
        })
    }
}
