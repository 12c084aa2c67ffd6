//! The resolve loop: cache check, stability wait, strategy sweep with retry
//! and backoff, acceptance and cache write.
//!
//! One call runs to completion before the next starts; a resolver and its
//! cache are not meant to be shared between concurrent callers.

use super::result::{Resolution, ResolveError, ResolvedElement};
use super::stats::{CACHE_LABEL, PerformanceStats, StatsSnapshot};
use crate::cache::{CacheEntry, CandidateCache};
use crate::config::ResolverConfig;
use crate::storage::StorageError;
use pinpoint_common::{DomProvider, NodeHandle, ReadyState};
use pinpoint_core::candidate::sort_by_score;
use pinpoint_core::selector::durable_selector;
use pinpoint_core::{CandidateMatch, ResolutionContext, Strategy};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Words that mark a description as a control which is usually present
/// once the document is parsed, so the network-idle wait is skipped.
const INTERACTIVE_KEYWORDS: &[&str] = &["button", "menu", "logout", "login", "submit", "click"];

/// Node attributes recorded on cache entries.
const RECORDED_ATTRIBUTES: &[&str] = &["id", "class", "role"];

pub struct ElementResolver<P> {
    pub(super) page: P,
    pub(super) strategies: Vec<Box<dyn Strategy>>,
    pub(super) cache: CandidateCache,
    pub(super) cache_enabled: bool,
    pub(super) config: ResolverConfig,
    pub(super) stats: PerformanceStats,
}

impl<P: DomProvider> ElementResolver<P> {
    /// Resolve `description` to one element on the current page.
    pub async fn resolve(
        &mut self,
        description: &str,
        timeout_ms: u64,
        max_attempts: u32,
    ) -> Result<Resolution, ResolveError> {
        self.run(description, None, timeout_ms, max_attempts).await
    }

    /// Like [`resolve`](Self::resolve), but any candidate whose text contains
    /// `exclusion` (case-insensitive) is discarded, cached or not.
    pub async fn resolve_excluding(
        &mut self,
        description: &str,
        exclusion: &str,
        timeout_ms: u64,
        max_attempts: u32,
    ) -> Result<Resolution, ResolveError> {
        self.run(description, Some(exclusion), timeout_ms, max_attempts)
            .await
    }

    /// Resolve with the configured timeout and attempt count.
    pub async fn resolve_default(&mut self, description: &str) -> Result<Resolution, ResolveError> {
        let (timeout_ms, max_attempts) = (self.config.default_timeout_ms, self.config.max_attempts);
        self.resolve(description, timeout_ms, max_attempts).await
    }

    pub fn performance_stats(&self) -> StatsSnapshot {
        let cache = self.cache_enabled.then(|| self.cache.stats());
        self.stats.snapshot(cache)
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    pub async fn clear_cache(&mut self) -> Result<(), StorageError> {
        self.cache.clear().await
    }

    pub async fn flush_cache_to_disk(&self) -> Result<(), StorageError> {
        self.cache.flush().await
    }

    pub fn strategy_confidence(&self, description: &str, strategy: &str) -> f64 {
        self.cache.strategy_confidence(description, strategy)
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn cache(&self) -> &CandidateCache {
        &self.cache
    }

    pub fn strategies(&self) -> &[Box<dyn Strategy>] {
        &self.strategies
    }

    async fn run(
        &mut self,
        description: &str,
        exclusion: Option<&str>,
        timeout_ms: u64,
        max_attempts: u32,
    ) -> Result<Resolution, ResolveError> {
        let start = Instant::now();
        let url = self
            .page
            .current_url()
            .await
            .map_err(ResolveError::PageUrl)?;

        let mut ctx = ResolutionContext::new(&self.page, description)
            .with_timeout(timeout_ms)
            .with_max_attempts(max_attempts)
            .with_cache(self.cache_enabled)
            .with_debug(self.config.debug);
        if let Some(exclusion) = exclusion {
            ctx = ctx.with_exclusion(exclusion);
        }
        debug!(description = %ctx.description, key_terms = %ctx.key_terms, "resolving");

        if ctx.cache_enabled {
            let lookup_start = Instant::now();
            if let Some(found) = check_cache(
                &mut self.cache,
                &self.strategies,
                &ctx,
                &url,
                self.config.cache_validation_score,
            )
            .await
            {
                self.stats
                    .record_strategy(CACHE_LABEL, lookup_start.elapsed(), true);
                self.stats.record_search(start.elapsed(), true, true);
                self.cache.record_success(&ctx.description, &found.strategy);
                info!(
                    description = %ctx.original_description,
                    selector = %found.selector,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "resolved from cache"
                );
                return Ok(Resolution::Found(found));
            }
        }

        wait_for_stability(&ctx, &self.config).await;

        let deadline = start + Duration::from_millis(timeout_ms);
        let mut best: Option<CandidateMatch> = None;
        let mut ran: Vec<&'static str> = Vec::new();
        let mut attempts = 0;

        for attempt in 0..max_attempts {
            if attempt > 0 && Instant::now() >= deadline {
                debug!(attempt, "deadline reached, no further attempts");
                break;
            }
            attempts += 1;
            debug!(attempt = attempt + 1, max_attempts, "sweep attempt");

            for strategy in &self.strategies {
                if !strategy.can_handle(&ctx).await {
                    continue;
                }
                if !ran.contains(&strategy.name()) {
                    ran.push(strategy.name());
                }

                let strategy_start = Instant::now();
                let mut matches = strategy.find_elements(&ctx).await;
                let elapsed = strategy_start.elapsed();
                self.stats
                    .record_strategy(strategy.name(), elapsed, !matches.is_empty());

                if matches.is_empty() {
                    continue;
                }
                sort_by_score(&mut matches);
                let top = matches.swap_remove(0);
                debug!(
                    strategy = strategy.name(),
                    score = top.score(),
                    text = %top.matched_text,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "strategy produced matches"
                );

                let top_score = top.score();
                if best.as_ref().is_none_or(|b| top_score > b.score()) {
                    best = Some(top);
                }
                if top_score >= self.config.early_stop_score {
                    debug!(strategy = strategy.name(), "high confidence match, stopping sweep");
                    break;
                }
            }

            if best
                .as_ref()
                .is_some_and(|b| b.score() >= self.config.accept_score)
            {
                break;
            }

            if attempt + 1 < max_attempts {
                let backoff = backoff_delay(attempt, self.config.backoff_cap_secs);
                debug!(backoff_secs = backoff.as_secs(), "waiting before retry");
                tokio::time::sleep(backoff).await;
                wait_for_stability(&ctx, &self.config).await;
            }
        }

        let Some(winner) = best else {
            for name in &ran {
                self.cache.record_failure(&ctx.description, name);
            }
            self.stats.record_search(start.elapsed(), false, false);
            info!(
                description = %ctx.original_description,
                attempts,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "element not found"
            );
            return Ok(Resolution::NotFound {
                description: ctx.original_description.clone(),
                attempts,
            });
        };

        let selector = durable_selector(ctx.page, winner.node).await;
        if ctx.cache_enabled {
            let attributes = node_attributes(ctx.page, winner.node).await;
            self.cache
                .put(CacheEntry::new(
                    &ctx.description,
                    &url,
                    &selector,
                    &winner.matched_text,
                    &winner.strategy_name,
                    winner.score(),
                    attributes,
                ))
                .await;
        }
        self.cache
            .record_success(&ctx.description, &winner.strategy_name);
        self.stats.record_search(start.elapsed(), true, false);

        info!(
            description = %ctx.original_description,
            strategy = %winner.strategy_name,
            score = winner.score(),
            selector = %selector,
            matched_by = %winner.matched_by,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "element resolved"
        );
        Ok(Resolution::Found(ResolvedElement {
            node: winner.node,
            selector,
            score: winner.score(),
            strategy: winner.strategy_name,
            matched_text: winner.matched_text,
            from_cache: false,
        }))
    }
}

/// `min(2^attempt, cap)` seconds.
pub fn backoff_delay(attempt: u32, cap_secs: u64) -> Duration {
    let secs = 1u64.checked_shl(attempt).unwrap_or(u64::MAX).min(cap_secs);
    Duration::from_secs(secs)
}

/// First cached record, in strategy priority order, whose node is still on
/// the page, visible, and still reads like the description.
///
/// Records are inspected without touching them; only the accepted one
/// counts as a cache hit. A selector rejected once is not re-checked for
/// the remaining strategies.
async fn check_cache(
    cache: &mut CandidateCache,
    strategies: &[Box<dyn Strategy>],
    ctx: &ResolutionContext<'_>,
    url: &str,
    validation_score: f64,
) -> Option<ResolvedElement> {
    let mut rejected: HashSet<String> = HashSet::new();

    for strategy in strategies {
        if !strategy.can_handle(ctx).await {
            continue;
        }
        let Some(entry) = cache.peek(&ctx.description, url, strategy.name()) else {
            continue;
        };
        if !rejected.insert(entry.selector.clone()) {
            continue;
        }

        let node = match ctx.page.query_one(&entry.selector).await {
            Ok(Some(node)) => node,
            Ok(None) => {
                debug!(selector = %entry.selector, "cached element no longer present");
                continue;
            }
            Err(e) => {
                warn!(selector = %entry.selector, error = %e, "cached selector failed, dropping record");
                cache.invalidate(&ctx.description, url, strategy.name());
                continue;
            }
        };
        if !ctx.page.is_visible(node).await.unwrap_or(false) {
            debug!(selector = %entry.selector, "cached element not visible");
            continue;
        }

        let text = match strategy.extract_text(ctx, node).await {
            Ok(text) => text,
            Err(e) => {
                debug!(selector = %entry.selector, error = %e, "cached element unreadable");
                continue;
            }
        };
        if text.is_empty() || ctx.is_excluded(&text) {
            continue;
        }
        let similarity = strategy.similarity(&ctx.key_terms, &text);
        if similarity < validation_score {
            debug!(text = %text, similarity, "cached element text drifted");
            continue;
        }

        // Counts the hit and bumps the record's access data
        cache.get(&ctx.description, url, strategy.name());
        return Some(ResolvedElement {
            node,
            selector: entry.selector,
            score: entry.score,
            strategy: entry.strategy_name,
            matched_text: text,
            from_cache: true,
        });
    }

    cache.record_miss();
    None
}

/// Bounded readiness waits. Failures only cost time, never the resolve.
async fn wait_for_stability(ctx: &ResolutionContext<'_>, config: &ResolverConfig) {
    let parsed = Duration::from_millis(config.content_ready_timeout_ms);
    bounded_wait(ctx.page, ReadyState::ContentParsed, parsed).await;

    if is_likely_interactive(&ctx.description) {
        debug!("skipping network-idle wait for interactive element");
        return;
    }
    let idle = Duration::from_millis(config.network_idle_timeout_ms);
    bounded_wait(ctx.page, ReadyState::NetworkIdle, idle).await;
}

/// The provider is asked to honour `limit`; the timeout enforces it.
async fn bounded_wait(page: &dyn DomProvider, state: ReadyState, limit: Duration) {
    match tokio::time::timeout(limit, page.wait_for_ready(state, limit)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(?state, error = %e, "readiness wait failed"),
        Err(_) => debug!(?state, limit_ms = limit.as_millis() as u64, "readiness wait timed out"),
    }
}

fn is_likely_interactive(description: &str) -> bool {
    let description = description.to_lowercase();
    INTERACTIVE_KEYWORDS.iter().any(|k| description.contains(k))
        || description.split_whitespace().count() <= 2
}

async fn node_attributes(page: &dyn DomProvider, node: NodeHandle) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    if let Ok(tag) = page.tag_name(node).await {
        attributes.insert("tag".to_string(), tag);
    }
    for name in RECORDED_ATTRIBUTES {
        if let Ok(Some(value)) = page.attribute(node, name).await {
            attributes.insert(name.to_string(), value);
        }
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay() {
        let delays: Vec<u64> = (0..5).map(|a| backoff_delay(a, 5).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 5, 5]);
        assert_eq!(backoff_delay(70, 5).as_secs(), 5);
    }

    #[test]
    fn test_is_likely_interactive() {
        assert!(is_likely_interactive("login button"));
        assert!(is_likely_interactive("email"));
        assert!(is_likely_interactive("the main navigation menu"));
        assert!(!is_likely_interactive("customer account number field"));
    }
}
