use crate::core::{
    filters::{is_eligible_candidate, ExclusionSet},
    scoring::calculate_match_score,
};
use crate::models::{InteractionHistory, ScoredCandidate, ScoringWeights, UserProfile};

/// Reason prepended to candidates who already liked the requester
pub const ALREADY_LIKED_YOU: &str = "Already liked you";

/// Result of the ranking process
#[derive(Debug)]
pub struct RankResult {
    pub candidates: Vec<ScoredCandidate>,
    /// Profiles in the pool before exclusion
    pub total_candidates: usize,
    /// Profiles left after exclusion, before truncation
    pub eligible_candidates: usize,
}

/// Candidate ranker
///
/// # Pipeline Stages
/// 1. Exclusion (self, liked, blocked either way, matched)
/// 2. Scoring
/// 3. Boost for users who already liked the requester
/// 4. Stable sort by score, descending, and truncation
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: ScoringWeights,
}

impl Matcher {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn with_default_weights() -> Self {
        Self {
            weights: ScoringWeights::default(),
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Rank `pool` for `requester`
    ///
    /// Equal scores keep the order of `pool`.
    pub fn rank(
        &self,
        requester: &UserProfile,
        history: &InteractionHistory,
        pool: Vec<UserProfile>,
        limit: usize,
    ) -> RankResult {
        let total_candidates = pool.len();
        let exclusions = ExclusionSet::build(&requester.user_id, history);

        let mut scored: Vec<ScoredCandidate> = pool
            .iter()
            .filter(|profile| is_eligible_candidate(profile, &exclusions))
            .map(|profile| {
                let mut candidate = calculate_match_score(requester, profile, &self.weights);
                if history.liked_by_pending.contains(&candidate.profile.user_id) {
                    candidate.score += self.weights.liked_you_boost;
                    candidate.reasons.insert(0, ALREADY_LIKED_YOU.to_string());
                }
                candidate
            })
            .collect();

        let eligible_candidates = scored.len();

        // sort_by is stable
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        scored.truncate(limit);

        RankResult {
            candidates: scored,
            total_candidates,
            eligible_candidates,
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}
