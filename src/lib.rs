//! StudyBuddy Match - matching and like-reciprocity service for the StudyBuddy app
//!
//! The library ranks study partners for a student, records likes and declines,
//! turns mutual likes into matches with a chat, and tracks the daily swipe quota.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{calculate_match_score, haversine_distance, MatchError, Matcher, QuotaPolicy};
pub use models::{LikeOutcome, MatchRecord, ScoredCandidate, ScoringWeights, UserProfile};
pub use services::{InMemoryStore, MatchService, MatchStore, PostgresStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let distance = haversine_distance(21.0285, 105.8542, 21.0285, 105.8542);
        assert!(distance < 0.01);
        assert_eq!(Matcher::default().weights(), &ScoringWeights::default());
    }
}
