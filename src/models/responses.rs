use serde::{Deserialize, Serialize};
use crate::models::domain::{LikeOutcome, MatchRecord, ScoredCandidate};

/// Response for the candidates endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindCandidatesResponse {
    pub candidates: Vec<ScoredCandidate>,
    pub total_results: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Swipe counter as shown to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeCountResponse {
    pub count: u32,
    pub limit: u32,
    pub remaining: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeDecisionResponse {
    pub swipes: SwipeCountResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like: Option<LikeOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchesResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub matches: Vec<MatchRecord>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
}
