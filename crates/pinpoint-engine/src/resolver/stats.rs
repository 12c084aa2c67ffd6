use crate::cache::CacheStats;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Label under which cache-served resolutions are tallied.
pub const CACHE_LABEL: &str = "cache";

#[derive(Debug, Clone, Default)]
struct StrategyUsage {
    attempts: u64,
    successes: u64,
    total_time: Duration,
}

/// Counters owned by one resolver.
#[derive(Debug, Clone, Default)]
pub struct PerformanceStats {
    total_searches: u64,
    cache_hits: u64,
    successful_searches: u64,
    total_search_time: Duration,
    strategy_usage: BTreeMap<String, StrategyUsage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyUsageSnapshot {
    pub attempts: u64,
    pub successes: u64,
    pub avg_time_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total_searches: u64,
    pub cache_hits: u64,
    pub successful_searches: u64,
    pub average_search_time_ms: f64,
    pub success_rate: f64,
    pub cache_hit_rate: f64,
    pub strategy_usage: BTreeMap<String, StrategyUsageSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
}

impl PerformanceStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one finished resolve call.
    pub fn record_search(&mut self, elapsed: Duration, success: bool, from_cache: bool) {
        self.total_searches += 1;
        self.total_search_time += elapsed;
        if success {
            self.successful_searches += 1;
        }
        if from_cache {
            self.cache_hits += 1;
        }
    }

    /// Count one strategy run. `success` means it produced at least one match.
    pub fn record_strategy(&mut self, name: &str, elapsed: Duration, success: bool) {
        let usage = self.strategy_usage.entry(name.to_string()).or_default();
        usage.attempts += 1;
        usage.total_time += elapsed;
        if success {
            usage.successes += 1;
        }
    }

    pub fn total_searches(&self) -> u64 {
        self.total_searches
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn snapshot(&self, cache: Option<CacheStats>) -> StatsSnapshot {
        let searches = self.total_searches as f64;
        let ratio = |n: u64| if searches > 0.0 { n as f64 / searches } else { 0.0 };
        StatsSnapshot {
            total_searches: self.total_searches,
            cache_hits: self.cache_hits,
            successful_searches: self.successful_searches,
            average_search_time_ms: if searches > 0.0 {
                self.total_search_time.as_secs_f64() * 1000.0 / searches
            } else {
                0.0
            },
            success_rate: ratio(self.successful_searches),
            cache_hit_rate: ratio(self.cache_hits),
            strategy_usage: self
                .strategy_usage
                .iter()
                .map(|(name, usage)| {
                    let avg_time_ms = if usage.attempts > 0 {
                        usage.total_time.as_secs_f64() * 1000.0 / usage.attempts as f64
                    } else {
                        0.0
                    };
                    (
                        name.clone(),
                        StrategyUsageSnapshot {
                            attempts: usage.attempts,
                            successes: usage.successes,
                            avg_time_ms,
                        },
                    )
                })
                .collect(),
            cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_rates() {
        let mut stats = PerformanceStats::new();
        stats.record_search(Duration::from_millis(10), true, true);
        stats.record_search(Duration::from_millis(30), false, false);
        stats.record_strategy("ButtonStrategy", Duration::from_millis(4), true);
        stats.record_strategy("ButtonStrategy", Duration::from_millis(8), false);

        let snap = stats.snapshot(None);
        assert_eq!(snap.total_searches, 2);
        assert_eq!(snap.success_rate, 0.5);
        assert_eq!(snap.cache_hit_rate, 0.5);
        assert!((snap.average_search_time_ms - 20.0).abs() < 1e-6);
        let usage = &snap.strategy_usage["ButtonStrategy"];
        assert_eq!((usage.attempts, usage.successes), (2, 1));
        assert!((usage.avg_time_ms - 6.0).abs() < 1e-6);

        stats.reset();
        assert_eq!(stats.snapshot(None).total_searches, 0);
    }
}
