use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::SwipeAction;

/// Request to rank candidates for a user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FindCandidatesRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub limit: Option<u16>,
}

/// Like or decline from one user towards another
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InteractionRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "from_user_id", rename = "fromUserId")]
    pub from_user_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "to_user_id", rename = "toUserId")]
    pub to_user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BlockRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "blocker_id", rename = "blockerId")]
    pub blocker_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "blocked_id", rename = "blockedId")]
    pub blocked_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SwipeCountRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
}

/// Quota-checked like or decline
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SwipeDecisionRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "from_user_id", rename = "fromUserId")]
    pub from_user_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "to_user_id", rename = "toUserId")]
    pub to_user_id: String,
    pub action: SwipeAction,
}
