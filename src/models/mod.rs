// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    sorted_pair, BlockEdge, ChatKind, ChatRecord, DeclineEdge, GeoPoint, InteractionHistory, LikeCommit,
    LikeEdge, LikeOutcome, MatchRecord, ReviewStatus, ScoredCandidate, ScoringWeights, SwipeAction, UserProfile,
};
pub use requests::{BlockRequest, FindCandidatesRequest, InteractionRequest, SwipeCountRequest, SwipeDecisionRequest};
pub use responses::{
    AckResponse, ErrorResponse, FindCandidatesResponse, HealthResponse, MatchesResponse, SwipeCountResponse,
    SwipeDecisionResponse,
};
