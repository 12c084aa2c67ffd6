use super::keys::learning_key;
use std::collections::HashMap;

/// Success / failure tallies per (strategy, description).
#[derive(Debug, Default, Clone)]
pub struct LearningLedger {
    successes: HashMap<String, u64>,
    failures: HashMap<String, u64>,
}

impl LearningLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, description: &str, strategy: &str) {
        *self
            .successes
            .entry(learning_key(strategy, description))
            .or_default() += 1;
    }

    pub fn record_failure(&mut self, description: &str, strategy: &str) {
        *self
            .failures
            .entry(learning_key(strategy, description))
            .or_default() += 1;
    }

    /// `successes / (successes + failures)`, 0.5 when never seen.
    pub fn confidence(&self, description: &str, strategy: &str) -> f64 {
        let key = learning_key(strategy, description);
        let successes = self.successes.get(&key).copied().unwrap_or(0);
        let failures = self.failures.get(&key).copied().unwrap_or(0);
        let total = successes + failures;
        if total == 0 {
            return 0.5;
        }
        successes as f64 / total as f64
    }

    pub fn clear(&mut self) {
        self.successes.clear();
        self.failures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence() {
        let mut ledger = LearningLedger::new();
        assert_eq!(ledger.confidence("save button", "ButtonStrategy"), 0.5);

        ledger.record_success("save button", "ButtonStrategy");
        ledger.record_success("Save", "ButtonStrategy");
        ledger.record_failure("save button", "ButtonStrategy");
        assert!((ledger.confidence("save", "ButtonStrategy") - 2.0 / 3.0).abs() < 1e-9);

        // Other strategies are tallied independently
        assert_eq!(ledger.confidence("save button", "GenericStrategy"), 0.5);
    }
}
