// Core algorithm exports
pub mod distance;
pub mod error;
pub mod filters;
pub mod matcher;
pub mod quota;
pub mod scoring;

pub use distance::{distance_between, haversine_distance};
pub use error::MatchError;
pub use filters::{is_eligible_candidate, ExclusionSet};
pub use matcher::{Matcher, RankResult, ALREADY_LIKED_YOU};
pub use quota::{QuotaExceeded, QuotaPolicy, SwipeState, SwipeStatus, SwipeTally};
pub use scoring::{calculate_match_score, distance_score, interest_score, shared_interest_count};
