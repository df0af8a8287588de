// Integration tests for the StudyBuddy matching service

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use studybuddy_match::core::quota::{SwipeState, SwipeTally};
use studybuddy_match::core::{MatchError, Matcher, QuotaPolicy, ALREADY_LIKED_YOU};
use studybuddy_match::models::{
    ChatRecord, InteractionHistory, LikeCommit, LikeEdge, LikeOutcome, MatchRecord, SwipeAction, UserProfile,
};
use studybuddy_match::services::{InMemoryStore, MatchService, MatchStore, StoreError, StoreResult, SwipeOutcome};

/// Store whose like writes always fail with a pool timeout
struct LikeWritesFail {
    inner: Arc<InMemoryStore>,
}

fn pool_timeout() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl MatchStore for LikeWritesFail {
    async fn get_profile(&self, user_id: &str) -> StoreResult<UserProfile> {
        self.inner.get_profile(user_id).await
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> StoreResult<()> {
        self.inner.upsert_profile(profile).await
    }

    async fn list_eligible_profiles(&self) -> StoreResult<Vec<UserProfile>> {
        self.inner.list_eligible_profiles().await
    }

    async fn matchable_ids(&self) -> StoreResult<HashSet<String>> {
        self.inner.matchable_ids().await
    }

    async fn interaction_history(&self, user_id: &str) -> StoreResult<InteractionHistory> {
        self.inner.interaction_history(user_id).await
    }

    async fn commit_like(&self, _commit: &LikeCommit) -> StoreResult<LikeOutcome> {
        Err(pool_timeout())
    }

    async fn record_decline(&self, from_user_id: &str, to_user_id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        self.inner.record_decline(from_user_id, to_user_id, at).await
    }

    async fn record_block(&self, blocker_id: &str, blocked_id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        self.inner.record_block(blocker_id, blocked_id, at).await
    }

    async fn record_swipe(&self, user_id: &str, now: DateTime<Utc>, policy: &QuotaPolicy) -> StoreResult<SwipeTally> {
        self.inner.record_swipe(user_id, now, policy).await
    }

    async fn commit_swipe(
        &self,
        _commit: &LikeCommit,
        _action: SwipeAction,
        _policy: &QuotaPolicy,
    ) -> StoreResult<SwipeOutcome> {
        Err(pool_timeout())
    }

    async fn swipe_state(&self, user_id: &str) -> StoreResult<SwipeState> {
        self.inner.swipe_state(user_id).await
    }

    async fn list_matches(&self, user_id: &str) -> StoreResult<Vec<MatchRecord>> {
        self.inner.list_matches(user_id).await
    }

    async fn get_like(&self, from_user_id: &str, to_user_id: &str) -> StoreResult<Option<LikeEdge>> {
        self.inner.get_like(from_user_id, to_user_id).await
    }

    async fn get_chat(&self, chat_id: &str) -> StoreResult<Option<ChatRecord>> {
        self.inner.get_chat(chat_id).await
    }

    async fn health_check(&self) -> StoreResult<bool> {
        self.inner.health_check().await
    }
}

fn student(id: &str) -> UserProfile {
    UserProfile::new(id, "HUST", "Hanoi", 20)
}

async fn setup(profiles: Vec<UserProfile>) -> (Arc<InMemoryStore>, MatchService) {
    let store = Arc::new(InMemoryStore::with_profiles(profiles).await);
    let service = MatchService::new(store.clone(), Matcher::with_default_weights(), QuotaPolicy::default());
    (store, service)
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

#[tokio::test]
async fn test_mutual_like_creates_one_match_and_chat() {
    let (store, service) = setup(vec![student("alice"), student("bob")]).await;

    let first = service.record_like("alice", "bob").await.unwrap();
    assert!(!first.is_match);
    assert!(first.match_id.is_none());

    let second = service.record_like("bob", "alice").await.unwrap();
    assert!(second.is_match);
    assert_eq!(second.match_id.as_deref(), Some("alice_bob"));

    let forward = store.get_like("alice", "bob").await.unwrap().unwrap();
    let reverse = store.get_like("bob", "alice").await.unwrap().unwrap();
    assert!(forward.is_reciprocated && reverse.is_reciprocated);

    let matches = service.list_matches("alice").await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].users, ["alice".to_string(), "bob".to_string()]);

    let chat = store.get_chat(&matches[0].chat_id).await.unwrap().unwrap();
    assert_eq!(chat.participants.len(), 2);

    // a repeated like on a matched pair is a no-op
    let again = service.record_like("bob", "alice").await.unwrap();
    assert!(!again.is_match);
    assert_eq!(store.match_count().await, 1);
    assert_eq!(store.chat_count().await, 1);
    assert!(store.get_like("alice", "bob").await.unwrap().unwrap().is_reciprocated);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reciprocal_likes_yield_single_match() {
    for round in 0..20 {
        let a = format!("a{}", round);
        let b = format!("b{}", round);
        let (store, service) = setup(vec![student(&a), student(&b)]).await;
        let service = Arc::new(service);

        let (left, right) = tokio::join!(
            {
                let service = service.clone();
                let (a, b) = (a.clone(), b.clone());
                tokio::spawn(async move { service.record_like(&a, &b).await })
            },
            {
                let service = service.clone();
                let (a, b) = (a.clone(), b.clone());
                tokio::spawn(async move { service.record_like(&b, &a).await })
            }
        );

        let left = left.unwrap().unwrap();
        let right = right.unwrap().unwrap();

        assert!(left.is_match ^ right.is_match, "exactly one like observes the match");
        assert_eq!(store.match_count().await, 1);
        assert_eq!(store.chat_count().await, 1);
    }
}

#[tokio::test]
async fn test_candidates_never_include_excluded_users() {
    let mut profiles = vec![student("me")];
    profiles.extend((0..100).map(|i| student(&format!("u{:03}", i))));
    let (_store, service) = setup(profiles).await;

    let mut excluded = HashSet::new();
    for i in 0..10 {
        let id = format!("u{:03}", i);
        service.record_like("me", &id).await.unwrap();
        excluded.insert(id);
    }
    for i in 10..15 {
        let id = format!("u{:03}", i);
        service.record_block("me", &id).await.unwrap();
        excluded.insert(id);
    }
    for i in 15..20 {
        let id = format!("u{:03}", i);
        service.record_block(&id, "me").await.unwrap();
        excluded.insert(id);
    }
    for i in 20..25 {
        let id = format!("u{:03}", i);
        service.record_like(&id, "me").await.unwrap();
        service.record_like("me", &id).await.unwrap();
        excluded.insert(id);
    }

    let candidates = service.get_potential_matches("me", 200).await.unwrap();

    assert_eq!(candidates.len(), 75);
    for candidate in &candidates {
        assert_ne!(candidate.profile.user_id, "me");
        assert!(!excluded.contains(&candidate.profile.user_id));
    }
}

#[tokio::test]
async fn test_declined_users_are_still_ranked() {
    let (store, service) = setup(vec![student("me"), student("them")]).await;

    service.record_decline("me", "them").await.unwrap();
    service.record_decline("me", "them").await.unwrap();

    let candidates = service.get_potential_matches("me", 10).await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert!(store.get_decline("me", "them").await.is_some());
}

#[tokio::test]
async fn test_block_hides_both_directions() {
    let (_store, service) = setup(vec![student("x"), student("y"), student("z")]).await;

    service.record_block("x", "y").await.unwrap();

    let for_x: Vec<String> = service
        .get_potential_matches("x", 10)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.profile.user_id)
        .collect();
    let for_y: Vec<String> = service
        .get_potential_matches("y", 10)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.profile.user_id)
        .collect();

    assert_eq!(for_x, vec!["z"]);
    assert_eq!(for_y, vec!["z"]);
}

#[tokio::test]
async fn test_pending_liker_is_boosted() {
    let me = UserProfile::new("me", "HUST", "Hanoi", 20);
    let schoolmate = UserProfile::new("schoolmate", "HUST", "Danang", 30);
    let admirer = UserProfile {
        is_premium: true,
        ..UserProfile::new("admirer", "NEU", "Danang", 30)
    };
    let (_store, service) = setup(vec![me, schoolmate, admirer]).await;

    service.record_like("admirer", "me").await.unwrap();

    let candidates = service.get_potential_matches("me", 10).await.unwrap();

    assert_eq!(candidates[0].profile.user_id, "admirer");
    assert!(candidates[0].score >= 250.0);
    assert_eq!(candidates[0].reasons[0], ALREADY_LIKED_YOU);
}

#[tokio::test]
async fn test_swipe_count_resets_each_day() {
    let (_store, service) = setup(vec![student("s")]).await;

    let counts: Vec<u32> = {
        let mut counts = Vec::new();
        for hour in [8, 12, 20] {
            counts.push(service.update_swipe_count_at("s", at(1, hour)).await.unwrap().count);
        }
        counts
    };
    assert_eq!(counts, vec![1, 2, 3]);

    let next_day = service.update_swipe_count_at("s", at(2, 7)).await.unwrap();
    assert_eq!(next_day.count, 1);

    let status = service.swipe_status_at("s", at(2, 9)).await.unwrap();
    assert_eq!((status.used, status.limit, status.remaining), (1, 5, 4));

    let status = service.swipe_status_at("s", at(3, 9)).await.unwrap();
    assert_eq!(status.used, 0);
}

#[tokio::test]
async fn test_swipe_limit_is_enforced() {
    let (_store, service) = setup(vec![student("s")]).await;

    for _ in 0..5 {
        service.update_swipe_count_at("s", at(1, 10)).await.unwrap();
    }

    match service.update_swipe_count_at("s", at(1, 11)).await {
        Err(MatchError::LimitExceeded { used, limit }) => assert_eq!((used, limit), (5, 5)),
        other => panic!("expected LimitExceeded, got {:?}", other),
    }

    assert_eq!(service.swipe_status_at("s", at(1, 12)).await.unwrap().used, 5);
}

#[tokio::test]
async fn test_exhausted_swipe_records_nothing() {
    let (store, service) = setup(vec![student("s"), student("t")]).await;

    for _ in 0..5 {
        service.update_swipe_count_at("s", at(1, 10)).await.unwrap();
    }

    let result = service.swipe_at("s", "t", SwipeAction::Like, at(1, 11)).await;
    assert!(matches!(result, Err(MatchError::LimitExceeded { .. })));
    assert!(store.get_like("s", "t").await.unwrap().is_none());

    let result = service.swipe_at("s", "t", SwipeAction::Decline, at(1, 11)).await;
    assert!(matches!(result, Err(MatchError::LimitExceeded { .. })));
    assert!(store.get_decline("s", "t").await.is_none());
}

#[tokio::test]
async fn test_swipe_like_counts_and_matches() {
    let (_store, service) = setup(vec![student("s"), student("t")]).await;

    service.record_like("t", "s").await.unwrap();
    let outcome = service.swipe_at("s", "t", SwipeAction::Like, at(1, 10)).await.unwrap();

    assert_eq!(outcome.tally.count, 1);
    assert!(outcome.like.unwrap().is_match);
}

#[tokio::test]
async fn test_invalid_pairs_are_rejected() {
    let (_store, service) = setup(vec![student("s")]).await;

    assert!(matches!(
        service.record_like("s", "s").await,
        Err(MatchError::InvalidInput(_))
    ));
    assert!(matches!(
        service.record_like("s", "ghost").await,
        Err(MatchError::NotFound(_))
    ));
    assert!(matches!(
        service.get_potential_matches("ghost", 10).await,
        Err(MatchError::NotFound(_))
    ));
    assert!(matches!(
        service.update_swipe_count("ghost").await,
        Err(MatchError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_failed_swipe_keeps_quota_and_edges() {
    let inner = Arc::new(InMemoryStore::with_profiles(vec![student("s"), student("t")]).await);
    let service = MatchService::new(
        Arc::new(LikeWritesFail { inner: inner.clone() }),
        Matcher::with_default_weights(),
        QuotaPolicy::default(),
    );

    let result = service.swipe_at("s", "t", SwipeAction::Like, at(1, 10)).await;
    assert!(matches!(result, Err(MatchError::TransientStore(_))));

    let status = service.swipe_status_at("s", at(1, 11)).await.unwrap();
    assert_eq!((status.used, status.remaining), (0, 5));
    assert!(inner.get_like("s", "t").await.unwrap().is_none());
}

#[tokio::test]
async fn test_mixed_case_ids_match() {
    let (_store, service) = setup(vec![student("alice"), student("Bob")]).await;

    service.record_like("alice", "Bob").await.unwrap();
    let outcome = service.record_like("Bob", "alice").await.unwrap();

    assert!(outcome.is_match);
    assert_eq!(outcome.match_id.as_deref(), Some("Bob_alice"));
    assert_eq!(service.list_matches("Bob").await.unwrap().len(), 1);
}
