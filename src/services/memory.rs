use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use crate::core::quota::{QuotaPolicy, SwipeState, SwipeTally};
use crate::models::{
    sorted_pair, BlockEdge, ChatKind, ChatRecord, DeclineEdge, InteractionHistory, LikeCommit, LikeEdge,
    LikeOutcome, MatchRecord, SwipeAction, UserProfile,
};
use crate::services::store::{MatchStore, StoreError, StoreResult, SwipeOutcome};

type PairKey = (String, String);

fn key(a: &str, b: &str) -> PairKey {
    (a.to_string(), b.to_string())
}

#[derive(Debug, Default)]
struct MemoryState {
    // insertion order is kept so ranking ties stay reproducible
    profiles: Vec<UserProfile>,
    likes: HashMap<PairKey, LikeEdge>,
    declines: HashMap<PairKey, DeclineEdge>,
    blocks: HashMap<PairKey, BlockEdge>,
    matches: HashMap<String, MatchRecord>,
    chats: HashMap<String, ChatRecord>,
}

impl MemoryState {
    fn profile_mut(&mut self, user_id: &str) -> Option<&mut UserProfile> {
        self.profiles.iter_mut().find(|p| p.user_id == user_id)
    }

    fn apply_like(&mut self, commit: &LikeCommit) -> LikeOutcome {
        let forward = key(&commit.from_user_id, &commit.to_user_id);
        let reverse = key(&commit.to_user_id, &commit.from_user_id);

        let is_match = self
            .likes
            .get(&reverse)
            .map(|like| !like.is_reciprocated)
            .unwrap_or(false);

        self.likes
            .entry(forward)
            .and_modify(|like| like.is_reciprocated |= is_match)
            .or_insert_with(|| LikeEdge {
                from_user_id: commit.from_user_id.clone(),
                to_user_id: commit.to_user_id.clone(),
                created_at: commit.at,
                is_reciprocated: is_match,
            });

        if !is_match {
            return LikeOutcome::no_match();
        }

        if let Some(like) = self.likes.get_mut(&reverse) {
            like.is_reciprocated = true;
        }

        if !self.matches.contains_key(&commit.match_id) {
            let (first, second) = sorted_pair(&commit.from_user_id, &commit.to_user_id);
            let users = [first.to_string(), second.to_string()];

            self.chats.insert(
                commit.chat_id.clone(),
                ChatRecord {
                    chat_id: commit.chat_id.clone(),
                    kind: ChatKind::Direct,
                    participants: users.to_vec(),
                    created_at: commit.at,
                    updated_at: commit.at,
                },
            );
            self.matches.insert(
                commit.match_id.clone(),
                MatchRecord {
                    match_id: commit.match_id.clone(),
                    users,
                    chat_id: commit.chat_id.clone(),
                    created_at: commit.at,
                    is_friend: false,
                },
            );
        }

        LikeOutcome::matched(commit.match_id.clone())
    }

    fn apply_decline(&mut self, from_user_id: &str, to_user_id: &str, at: DateTime<Utc>) {
        self.declines
            .entry(key(from_user_id, to_user_id))
            .or_insert_with(|| DeclineEdge {
                from_user_id: from_user_id.to_string(),
                to_user_id: to_user_id.to_string(),
                created_at: at,
            });
    }

    fn advance_swipe(&mut self, user_id: &str, now: DateTime<Utc>, policy: &QuotaPolicy) -> StoreResult<SwipeTally> {
        let profile = self
            .profile_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("Profile not found for user {}", user_id)))?;

        let tally = policy.advance(
            SwipeState {
                count: profile.daily_swipe_count,
                last_reset_at: profile.last_swipe_reset_at,
                is_premium: profile.is_premium,
            },
            now,
        )?;

        profile.daily_swipe_count = tally.count;
        profile.last_swipe_reset_at = Some(tally.last_reset_at);

        Ok(tally)
    }
}

/// Match store kept entirely in process memory
///
/// A single lock guards all collections, so every trait method is atomic.
/// Used by the test suites and for local runs without Postgres.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `profiles`
    pub async fn with_profiles(profiles: impl IntoIterator<Item = UserProfile>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.write().await;
            state.profiles.extend(profiles);
        }
        store
    }

    pub async fn match_count(&self) -> usize {
        self.state.read().await.matches.len()
    }

    pub async fn chat_count(&self) -> usize {
        self.state.read().await.chats.len()
    }

    pub async fn get_decline(&self, from_user_id: &str, to_user_id: &str) -> Option<DeclineEdge> {
        self.state.read().await.declines.get(&key(from_user_id, to_user_id)).cloned()
    }
}

#[async_trait]
impl MatchStore for InMemoryStore {
    async fn get_profile(&self, user_id: &str) -> StoreResult<UserProfile> {
        let state = self.state.read().await;
        state
            .profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Profile not found for user {}", user_id)))
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> StoreResult<()> {
        let mut state = self.state.write().await;
        match state.profile_mut(&profile.user_id) {
            Some(existing) => *existing = profile.clone(),
            None => state.profiles.push(profile.clone()),
        }
        Ok(())
    }

    async fn list_eligible_profiles(&self) -> StoreResult<Vec<UserProfile>> {
        let state = self.state.read().await;
        Ok(state.profiles.iter().filter(|p| p.is_matchable()).cloned().collect())
    }

    async fn matchable_ids(&self) -> StoreResult<HashSet<String>> {
        let state = self.state.read().await;
        Ok(state
            .profiles
            .iter()
            .filter(|p| p.is_matchable())
            .map(|p| p.user_id.clone())
            .collect())
    }

    async fn interaction_history(&self, user_id: &str) -> StoreResult<InteractionHistory> {
        let state = self.state.read().await;
        let mut history = InteractionHistory::default();

        for like in state.likes.values() {
            if like.from_user_id == user_id {
                history.liked.insert(like.to_user_id.clone());
            }
            if like.to_user_id == user_id && !like.is_reciprocated {
                history.liked_by_pending.insert(like.from_user_id.clone());
            }
        }

        for block in state.blocks.values() {
            if block.blocker_id == user_id {
                history.blocked.insert(block.blocked_id.clone());
            }
            if block.blocked_id == user_id {
                history.blocked.insert(block.blocker_id.clone());
            }
        }

        for record in state.matches.values() {
            if let Some(partner) = record.partner_of(user_id) {
                history.matched.insert(partner.to_string());
            }
        }

        Ok(history)
    }

    async fn commit_like(&self, commit: &LikeCommit) -> StoreResult<LikeOutcome> {
        Ok(self.state.write().await.apply_like(commit))
    }

    async fn record_decline(&self, from_user_id: &str, to_user_id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        self.state.write().await.apply_decline(from_user_id, to_user_id, at);
        Ok(())
    }

    async fn record_block(&self, blocker_id: &str, blocked_id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state
            .blocks
            .entry(key(blocker_id, blocked_id))
            .or_insert_with(|| BlockEdge {
                blocker_id: blocker_id.to_string(),
                blocked_id: blocked_id.to_string(),
                created_at: at,
            });
        Ok(())
    }

    async fn record_swipe(&self, user_id: &str, now: DateTime<Utc>, policy: &QuotaPolicy) -> StoreResult<SwipeTally> {
        self.state.write().await.advance_swipe(user_id, now, policy)
    }

    async fn commit_swipe(
        &self,
        commit: &LikeCommit,
        action: SwipeAction,
        policy: &QuotaPolicy,
    ) -> StoreResult<SwipeOutcome> {
        let mut state = self.state.write().await;

        // the edge must be writable before any quota is spent
        if !state.profiles.iter().any(|p| p.user_id == commit.to_user_id) {
            return Err(StoreError::NotFound(format!("Profile not found for user {}", commit.to_user_id)));
        }

        let tally = state.advance_swipe(&commit.from_user_id, commit.at, policy)?;

        let like = match action {
            SwipeAction::Like => Some(state.apply_like(commit)),
            SwipeAction::Decline => {
                state.apply_decline(&commit.from_user_id, &commit.to_user_id, commit.at);
                None
            }
        };

        Ok(SwipeOutcome { tally, like })
    }

    async fn swipe_state(&self, user_id: &str) -> StoreResult<SwipeState> {
        let profile = self.get_profile(user_id).await?;
        Ok(SwipeState {
            count: profile.daily_swipe_count,
            last_reset_at: profile.last_swipe_reset_at,
            is_premium: profile.is_premium,
        })
    }

    async fn list_matches(&self, user_id: &str) -> StoreResult<Vec<MatchRecord>> {
        let state = self.state.read().await;
        let mut matches: Vec<MatchRecord> = state
            .matches
            .values()
            .filter(|m| m.partner_of(user_id).is_some())
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    async fn get_like(&self, from_user_id: &str, to_user_id: &str) -> StoreResult<Option<LikeEdge>> {
        Ok(self.state.read().await.likes.get(&key(from_user_id, to_user_id)).cloned())
    }

    async fn get_chat(&self, chat_id: &str) -> StoreResult<Option<ChatRecord>> {
        Ok(self.state.read().await.chats.get(chat_id).cloned())
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(from: &str, to: &str) -> LikeCommit {
        LikeCommit {
            from_user_id: from.to_string(),
            to_user_id: to.to_string(),
            match_id: MatchRecord::id_for(from, to),
            chat_id: format!("chat-{}-{}", from, to),
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_one_sided_like() {
        let store = InMemoryStore::new();
        let outcome = store.commit_like(&commit("a", "b")).await.unwrap();

        assert_eq!(outcome, LikeOutcome::no_match());
        let like = store.get_like("a", "b").await.unwrap().unwrap();
        assert!(!like.is_reciprocated);
        assert_eq!(store.match_count().await, 0);
    }

    #[tokio::test]
    async fn test_reciprocal_like_creates_match_and_chat() {
        let store = InMemoryStore::new();
        store.commit_like(&commit("a", "b")).await.unwrap();
        let outcome = store.commit_like(&commit("b", "a")).await.unwrap();

        assert_eq!(outcome, LikeOutcome::matched("a_b".to_string()));
        assert!(store.get_like("a", "b").await.unwrap().unwrap().is_reciprocated);
        assert!(store.get_like("b", "a").await.unwrap().unwrap().is_reciprocated);

        let matches = store.list_matches("a").await.unwrap();
        assert_eq!(matches.len(), 1);
        let chat = store.get_chat(&matches[0].chat_id).await.unwrap().unwrap();
        assert_eq!(chat.participants, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_relike_after_match_keeps_state() {
        let store = InMemoryStore::new();
        store.commit_like(&commit("a", "b")).await.unwrap();
        store.commit_like(&commit("b", "a")).await.unwrap();

        let again = store.commit_like(&commit("a", "b")).await.unwrap();

        assert!(!again.is_match);
        assert!(store.get_like("a", "b").await.unwrap().unwrap().is_reciprocated);
        assert_eq!(store.match_count().await, 1);
        assert_eq!(store.chat_count().await, 1);
    }

    #[tokio::test]
    async fn test_decline_is_write_once() {
        let store = InMemoryStore::new();
        let first = Utc::now();
        store.record_decline("a", "b", first).await.unwrap();
        store.record_decline("a", "b", first + chrono::Duration::seconds(30)).await.unwrap();

        assert_eq!(store.get_decline("a", "b").await.unwrap().created_at, first);
    }

    #[tokio::test]
    async fn test_blocks_are_symmetric_in_history() {
        let store = InMemoryStore::new();
        store.record_block("a", "b", Utc::now()).await.unwrap();

        assert!(store.interaction_history("a").await.unwrap().blocked.contains("b"));
        assert!(store.interaction_history("b").await.unwrap().blocked.contains("a"));
    }

    #[tokio::test]
    async fn test_swipe_on_missing_user() {
        let store = InMemoryStore::new();
        let err = store.record_swipe("ghost", Utc::now(), &QuotaPolicy::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_commit_swipe_to_missing_user_spends_nothing() {
        let store = InMemoryStore::with_profiles(vec![UserProfile::new("s", "HUST", "Hanoi", 20)]).await;

        let err = store
            .commit_swipe(&commit("s", "ghost"), SwipeAction::Like, &QuotaPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.swipe_state("s").await.unwrap().count, 0);
        assert!(store.get_like("s", "ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_swipe_over_limit_writes_no_edge() {
        let store = InMemoryStore::with_profiles(vec![
            UserProfile::new("s", "HUST", "Hanoi", 20),
            UserProfile::new("t", "HUST", "Hanoi", 20),
        ])
        .await;
        let policy = QuotaPolicy::new(1, 2, 0);

        let outcome = store.commit_swipe(&commit("s", "t"), SwipeAction::Decline, &policy).await.unwrap();
        assert_eq!(outcome.tally.count, 1);
        assert!(outcome.like.is_none());

        let err = store.commit_swipe(&commit("s", "t"), SwipeAction::Like, &policy).await.unwrap_err();
        assert!(matches!(err, StoreError::Quota(_)));
        assert!(store.get_like("s", "t").await.unwrap().is_none());
        assert_eq!(store.swipe_state("s").await.unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_mixed_case_pair_matches() {
        let store = InMemoryStore::new();
        store.commit_like(&commit("alice", "Bob")).await.unwrap();
        let outcome = store.commit_like(&commit("Bob", "alice")).await.unwrap();

        assert_eq!(outcome, LikeOutcome::matched("Bob_alice".to_string()));
        let matches = store.list_matches("alice").await.unwrap();
        assert_eq!(matches[0].users, ["Bob".to_string(), "alice".to_string()]);
    }

    #[tokio::test]
    async fn test_matchable_ids_tracks_flags() {
        let store = InMemoryStore::with_profiles(vec![
            UserProfile::new("a", "HUST", "Hanoi", 20),
            UserProfile::new("b", "HUST", "Hanoi", 20),
        ])
        .await;

        let mut b = store.get_profile("b").await.unwrap();
        b.is_active = false;
        store.upsert_profile(&b).await.unwrap();

        let ids = store.matchable_ids().await.unwrap();
        assert!(ids.contains("a"));
        assert!(!ids.contains("b"));
    }
}
