use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

use crate::core::quota::{QuotaExceeded, QuotaPolicy, SwipeState, SwipeTally};
use crate::models::{
    ChatRecord, InteractionHistory, LikeCommit, LikeEdge, LikeOutcome, MatchRecord, SwipeAction, UserProfile,
};

/// Errors that can occur when talking to a match store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("SQLx error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Quota(#[from] QuotaExceeded),

    #[error("Invalid row: {0}")]
    InvalidRow(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a quota-checked swipe
#[derive(Debug, Clone, PartialEq)]
pub struct SwipeOutcome {
    pub tally: SwipeTally,
    /// Set for likes only
    pub like: Option<LikeOutcome>,
}

/// Persistence port of the matching core
///
/// Every method is a single logical operation. `commit_like` and
/// `record_swipe` must apply their read-then-write as one atomic unit.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> StoreResult<UserProfile>;

    /// Create or replace a profile
    async fn upsert_profile(&self, profile: &UserProfile) -> StoreResult<()>;

    /// Active profiles with an approved review status
    async fn list_eligible_profiles(&self) -> StoreResult<Vec<UserProfile>>;

    /// Ids of the profiles `list_eligible_profiles` would return right now
    async fn matchable_ids(&self) -> StoreResult<HashSet<String>>;

    async fn interaction_history(&self, user_id: &str) -> StoreResult<InteractionHistory>;

    /// Upsert `from -> to`; on an unreciprocated reverse like, flip both edges
    /// and create the match and its chat, all or nothing
    async fn commit_like(&self, commit: &LikeCommit) -> StoreResult<LikeOutcome>;

    /// Write-once; repeated declines keep the first timestamp
    async fn record_decline(&self, from_user_id: &str, to_user_id: &str, at: DateTime<Utc>) -> StoreResult<()>;

    /// Write-once; repeated blocks keep the first timestamp
    async fn record_block(&self, blocker_id: &str, blocked_id: &str, at: DateTime<Utc>) -> StoreResult<()>;

    /// Load the swipe counter, advance it with `policy` and persist it
    async fn record_swipe(&self, user_id: &str, now: DateTime<Utc>, policy: &QuotaPolicy) -> StoreResult<SwipeTally>;

    /// Consume one swipe of `commit.from_user_id` and apply the like or decline
    ///
    /// Quota and edge are written together or not at all.
    async fn commit_swipe(
        &self,
        commit: &LikeCommit,
        action: SwipeAction,
        policy: &QuotaPolicy,
    ) -> StoreResult<SwipeOutcome>;

    async fn swipe_state(&self, user_id: &str) -> StoreResult<SwipeState>;

    async fn list_matches(&self, user_id: &str) -> StoreResult<Vec<MatchRecord>>;

    async fn get_like(&self, from_user_id: &str, to_user_id: &str) -> StoreResult<Option<LikeEdge>>;

    async fn get_chat(&self, chat_id: &str) -> StoreResult<Option<ChatRecord>>;

    async fn health_check(&self) -> StoreResult<bool>;
}
