use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::core::quota::{QuotaPolicy, SwipeStatus, SwipeTally};
use crate::core::{MatchError, Matcher};
use crate::models::{LikeCommit, LikeOutcome, MatchRecord, ScoredCandidate, SwipeAction, UserProfile};
use crate::services::cache::{CacheKey, CacheManager};
use crate::services::store::{MatchStore, SwipeOutcome};

/// Matching operations over a [`MatchStore`]
///
/// The requester id is always passed in explicitly; there is no ambient
/// session. Each call reads current state from the store.
pub struct MatchService {
    store: Arc<dyn MatchStore>,
    matcher: Matcher,
    quota: QuotaPolicy,
    pool_cache: Option<Arc<CacheManager>>,
}

impl MatchService {
    pub fn new(store: Arc<dyn MatchStore>, matcher: Matcher, quota: QuotaPolicy) -> Self {
        Self {
            store,
            matcher,
            quota,
            pool_cache: None,
        }
    }

    /// Serve the eligible-profile pool from `cache` between store reads
    pub fn with_pool_cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.pool_cache = Some(cache);
        self
    }

    pub fn store(&self) -> &Arc<dyn MatchStore> {
        &self.store
    }

    pub fn quota(&self) -> &QuotaPolicy {
        &self.quota
    }

    /// Rank candidates for `requester_id`, best first, at most `limit`
    pub async fn get_potential_matches(
        &self,
        requester_id: &str,
        limit: usize,
    ) -> Result<Vec<ScoredCandidate>, MatchError> {
        let requester = self.store.get_profile(requester_id).await?;
        let history = self.store.interaction_history(requester_id).await?;
        let pool = self.eligible_pool().await?;

        let result = self.matcher.rank(&requester, &history, pool, limit);

        tracing::info!(
            "Ranked {} candidates for user {} ({} eligible of {} in pool)",
            result.candidates.len(),
            requester_id,
            result.eligible_candidates,
            result.total_candidates
        );

        Ok(result.candidates)
    }

    /// Eligible profiles, from the cache when one is configured
    ///
    /// A cached pool is cut down to the ids that are matchable right now, so a
    /// profile deactivated or rejected after caching is never offered.
    async fn eligible_pool(&self) -> Result<Vec<UserProfile>, MatchError> {
        let Some(cache) = &self.pool_cache else {
            return Ok(self.store.list_eligible_profiles().await?);
        };

        let key = CacheKey::candidate_pool();
        let cached = match cache.get::<Vec<UserProfile>>(&key).await {
            Ok(pool) => Some(pool),
            Err(crate::services::CacheError::CacheMiss(_)) => None,
            Err(e) => {
                tracing::warn!("Candidate pool cache read failed, using store: {}", e);
                None
            }
        };

        let Some(mut pool) = cached else {
            let pool = self.store.list_eligible_profiles().await?;
            if let Err(e) = cache.set(&key, &pool).await {
                tracing::warn!("Failed to cache candidate pool: {}", e);
            }
            return Ok(pool);
        };

        let live = self.store.matchable_ids().await?;
        pool.retain(|profile| live.contains(&profile.user_id));
        Ok(pool)
    }

    /// Create or replace a profile and drop the cached pool
    pub async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), MatchError> {
        self.store.upsert_profile(profile).await?;

        if let Some(cache) = &self.pool_cache {
            if let Err(e) = cache.delete(&CacheKey::candidate_pool()).await {
                tracing::warn!("Failed to invalidate candidate pool: {}", e);
            }
        }

        tracing::debug!("Upserted profile {}", profile.user_id);
        Ok(())
    }

    /// Record that `from_id` likes `to_id`
    ///
    /// When `to_id` already liked `from_id`, both likes become reciprocated and
    /// a match with its chat is created in the same atomic unit.
    pub async fn record_like(&self, from_id: &str, to_id: &str) -> Result<LikeOutcome, MatchError> {
        self.record_like_at(from_id, to_id, Utc::now()).await
    }

    pub async fn record_like_at(
        &self,
        from_id: &str,
        to_id: &str,
        at: DateTime<Utc>,
    ) -> Result<LikeOutcome, MatchError> {
        self.check_pair(from_id, to_id).await?;
        self.commit_like(from_id, to_id, at).await
    }

    async fn commit_like(&self, from_id: &str, to_id: &str, at: DateTime<Utc>) -> Result<LikeOutcome, MatchError> {
        let commit = Self::like_commit(from_id, to_id, at);

        let outcome = self.store.commit_like(&commit).await.map_err(|e| {
            tracing::error!("Failed to record like {} -> {}: {}", from_id, to_id, e);
            MatchError::from(e)
        })?;

        Self::log_like(&commit, &outcome);

        Ok(outcome)
    }

    fn like_commit(from_id: &str, to_id: &str, at: DateTime<Utc>) -> LikeCommit {
        LikeCommit {
            from_user_id: from_id.to_string(),
            to_user_id: to_id.to_string(),
            match_id: MatchRecord::id_for(from_id, to_id),
            chat_id: uuid::Uuid::new_v4().to_string(),
            at,
        }
    }

    fn log_like(commit: &LikeCommit, outcome: &LikeOutcome) {
        if outcome.is_match {
            tracing::info!(
                "Match created between {} and {} ({})",
                commit.from_user_id,
                commit.to_user_id,
                commit.match_id
            );
        } else {
            tracing::debug!("Recorded like: {} -> {}", commit.from_user_id, commit.to_user_id);
        }
    }

    /// Record that `from_id` passed on `to_id`
    pub async fn record_decline(&self, from_id: &str, to_id: &str) -> Result<(), MatchError> {
        self.check_pair(from_id, to_id).await?;
        self.store.record_decline(from_id, to_id, Utc::now()).await?;
        Ok(())
    }

    /// Record that `blocker_id` blocked `blocked_id`, hiding both from each other
    pub async fn record_block(&self, blocker_id: &str, blocked_id: &str) -> Result<(), MatchError> {
        self.check_pair(blocker_id, blocked_id).await?;
        self.store.record_block(blocker_id, blocked_id, Utc::now()).await?;
        tracing::info!("User {} blocked {}", blocker_id, blocked_id);
        Ok(())
    }

    /// Count one swipe for `user_id`, failing once today's limit is used up
    pub async fn update_swipe_count(&self, user_id: &str) -> Result<SwipeTally, MatchError> {
        self.update_swipe_count_at(user_id, Utc::now()).await
    }

    pub async fn update_swipe_count_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SwipeTally, MatchError> {
        let tally = self.store.record_swipe(user_id, now, &self.quota).await.map_err(|e| {
            let err = MatchError::from(e);
            if let MatchError::LimitExceeded { used, limit } = &err {
                tracing::info!("User {} hit the daily swipe limit ({}/{})", user_id, used, limit);
            }
            err
        })?;

        tracing::debug!("User {} swipe count now {}/{}", user_id, tally.count, tally.limit);

        Ok(tally)
    }

    pub async fn swipe_status(&self, user_id: &str) -> Result<SwipeStatus, MatchError> {
        self.swipe_status_at(user_id, Utc::now()).await
    }

    pub async fn swipe_status_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<SwipeStatus, MatchError> {
        let state = self.store.swipe_state(user_id).await?;
        Ok(self.quota.status(state, now))
    }

    /// Consume one swipe and record the like or decline as one unit
    ///
    /// An exhausted quota fails before anything is recorded, and a failed
    /// like or decline leaves the quota untouched.
    pub async fn swipe(&self, from_id: &str, to_id: &str, action: SwipeAction) -> Result<SwipeOutcome, MatchError> {
        self.swipe_at(from_id, to_id, action, Utc::now()).await
    }

    pub async fn swipe_at(
        &self,
        from_id: &str,
        to_id: &str,
        action: SwipeAction,
        now: DateTime<Utc>,
    ) -> Result<SwipeOutcome, MatchError> {
        self.check_pair(from_id, to_id).await?;

        let commit = Self::like_commit(from_id, to_id, now);
        let outcome = self.store.commit_swipe(&commit, action, &self.quota).await.map_err(|e| {
            let err = MatchError::from(e);
            match &err {
                MatchError::LimitExceeded { used, limit } => {
                    tracing::info!("User {} hit the daily swipe limit ({}/{})", from_id, used, limit)
                }
                other => tracing::error!("Failed to record swipe {} -> {}: {}", from_id, to_id, other),
            }
            err
        })?;

        if let Some(like) = &outcome.like {
            Self::log_like(&commit, like);
        }
        tracing::debug!("User {} swipe count now {}/{}", from_id, outcome.tally.count, outcome.tally.limit);

        Ok(outcome)
    }

    pub async fn list_matches(&self, user_id: &str) -> Result<Vec<MatchRecord>, MatchError> {
        self.store.get_profile(user_id).await?;
        Ok(self.store.list_matches(user_id).await?)
    }

    pub async fn health_check(&self) -> bool {
        self.store.health_check().await.unwrap_or(false)
    }

    /// Both users must be distinct and exist
    async fn check_pair(&self, from_id: &str, to_id: &str) -> Result<(), MatchError> {
        if from_id == to_id {
            return Err(MatchError::InvalidInput(format!(
                "User {} cannot interact with themselves",
                from_id
            )));
        }
        self.store.get_profile(from_id).await?;
        self.store.get_profile(to_id).await?;
        Ok(())
    }
}
