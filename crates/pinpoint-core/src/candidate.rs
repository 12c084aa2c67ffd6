use crate::scoring::clamp_score;
use pinpoint_common::NodeHandle;
use serde::Serialize;

/// Node facts and score breakdown attached to a match.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchInfo {
    pub tag_name: String,
    pub role: Option<String>,
    pub class: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_bonus: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_penalty: Option<f64>,
}

/// A scored candidate produced by a strategy.
///
/// Lives only for the resolve call that produced it; `node` is owned by the
/// page.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateMatch {
    pub node: NodeHandle,
    score: f64,
    pub matched_by: String,
    pub matched_text: String,
    pub strategy_name: String,
    pub match_info: MatchInfo,
}

impl CandidateMatch {
    pub fn new(
        node: NodeHandle,
        score: f64,
        matched_by: impl Into<String>,
        matched_text: impl Into<String>,
        strategy_name: impl Into<String>,
        match_info: MatchInfo,
    ) -> Self {
        Self {
            node,
            score: clamp_score(score),
            matched_by: matched_by.into(),
            matched_text: matched_text.into(),
            strategy_name: strategy_name.into(),
            match_info,
        }
    }

    /// Score in `[0, 1]`.
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Raise the score to at least `floor` (still clamped).
    pub fn boost_to(&mut self, floor: f64) {
        self.score = clamp_score(self.score.max(floor));
    }
}

/// Sort matches by descending score. Stable, so equal scores keep
/// production order.
pub fn sort_by_score(matches: &mut [CandidateMatch]) {
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_match(raw: u64, score: f64) -> CandidateMatch {
        CandidateMatch::new(
            NodeHandle::new(raw),
            score,
            "test",
            "text",
            "Test",
            MatchInfo::default(),
        )
    }

    #[test]
    fn test_score_clamped_at_construction() {
        assert_eq!(make_match(1, 1.7).score(), 1.0);
        assert_eq!(make_match(1, -0.3).score(), 0.0);
    }

    #[test]
    fn test_boost_to() {
        let mut m = make_match(1, 0.6);
        m.boost_to(0.95);
        assert_eq!(m.score(), 0.95);
        m.boost_to(0.5);
        assert_eq!(m.score(), 0.95);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let mut matches = vec![make_match(1, 0.7), make_match(2, 0.9), make_match(3, 0.7)];
        sort_by_score(&mut matches);
        let order: Vec<u64> = matches.iter().map(|m| m.node.raw()).collect();
        assert_eq!(order, vec![2, 1, 3]);
    }
}
