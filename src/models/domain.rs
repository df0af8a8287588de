use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Last known coordinates of a user, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Moderation state of a profile; only approved profiles are matchable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

/// Student profile with the fields the matcher reads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "displayName", default)]
    pub display_name: String,
    pub school: String,
    pub location: String,
    pub age: u8,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(rename = "isPremium", default)]
    pub is_premium: bool,
    #[serde(rename = "lastLocation", default)]
    pub last_location: Option<GeoPoint>,
    #[serde(rename = "isActive", default = "default_true")]
    pub is_active: bool,
    #[serde(rename = "reviewStatus")]
    pub review_status: ReviewStatus,
    #[serde(rename = "dailySwipeCount", default)]
    pub daily_swipe_count: u32,
    #[serde(rename = "lastSwipeResetAt", default)]
    pub last_swipe_reset_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// A fresh, approved and active profile with no swipes recorded
    pub fn new(user_id: impl Into<String>, school: impl Into<String>, location: impl Into<String>, age: u8) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: String::new(),
            school: school.into(),
            location: location.into(),
            age,
            interests: Vec::new(),
            is_premium: false,
            last_location: None,
            is_active: true,
            review_status: ReviewStatus::Approved,
            daily_swipe_count: 0,
            last_swipe_reset_at: None,
        }
    }

    /// Whether the profile may be shown to other users at all
    pub fn is_matchable(&self) -> bool {
        self.is_active && self.review_status == ReviewStatus::Approved
    }
}

fn default_true() -> bool { true }

/// Directed like from one user to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeEdge {
    #[serde(rename = "fromUserId")]
    pub from_user_id: String,
    #[serde(rename = "toUserId")]
    pub to_user_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "isReciprocated")]
    pub is_reciprocated: bool,
}

/// Directed decline, recorded once per ordered pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclineEdge {
    #[serde(rename = "fromUserId")]
    pub from_user_id: String,
    #[serde(rename = "toUserId")]
    pub to_user_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Block edge. Directed on disk, symmetric in effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockEdge {
    #[serde(rename = "blockerId")]
    pub blocker_id: String,
    #[serde(rename = "blockedId")]
    pub blocked_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Mutual match between exactly two distinct users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(rename = "matchId")]
    pub match_id: String,
    /// Sorted ascending
    pub users: [String; 2],
    #[serde(rename = "chatId")]
    pub chat_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "isFriend")]
    pub is_friend: bool,
}

impl MatchRecord {
    /// Order-independent identifier for the pair `{a, b}`
    pub fn id_for(a: &str, b: &str) -> String {
        let (first, second) = sorted_pair(a, b);
        format!("{}_{}", first, second)
    }

    /// Returns the other member of the match, if `user_id` is one of them
    pub fn partner_of(&self, user_id: &str) -> Option<&str> {
        match &self.users {
            [a, b] if a == user_id => Some(b.as_str()),
            [a, b] if b == user_id => Some(a.as_str()),
            _ => None,
        }
    }
}

/// Returns the two ids in ascending byte order
pub fn sorted_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Direct,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::Direct => "direct",
        }
    }
}

/// Chat created alongside a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    #[serde(rename = "chatId")]
    pub chat_id: String,
    pub kind: ChatKind,
    pub participants: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Prior interactions of one user, loaded before ranking
#[derive(Debug, Clone, Default)]
pub struct InteractionHistory {
    /// Users the requester has liked
    pub liked: HashSet<String>,
    /// Users the requester blocked plus users who blocked the requester
    pub blocked: HashSet<String>,
    /// Match partners of the requester
    pub matched: HashSet<String>,
    /// Users whose like towards the requester is still unreciprocated
    pub liked_by_pending: HashSet<String>,
}

/// Candidate with its score and human-readable reasons
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub profile: UserProfile,
    pub score: f64,
    pub reasons: Vec<String>,
    #[serde(rename = "distanceKm")]
    pub distance_km: Option<f64>,
}

/// Scoring weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub same_school: f64,
    pub premium: f64,
    /// Points at zero distance, falling linearly to zero at `distance_falloff_km`
    pub distance: f64,
    pub distance_falloff_km: f64,
    /// Distances below this add a "Near you" reason
    pub near_threshold_km: f64,
    pub same_location: f64,
    pub per_shared_interest: f64,
    pub max_interest_bonus: f64,
    pub similar_age: f64,
    pub similar_age_years: u8,
    /// Added to candidates who already liked the requester
    pub liked_you_boost: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            same_school: 100.0,
            premium: 50.0,
            distance: 40.0,
            distance_falloff_km: 20.0,
            near_threshold_km: 5.0,
            same_location: 30.0,
            per_shared_interest: 5.0,
            max_interest_bonus: 25.0,
            similar_age: 10.0,
            similar_age_years: 2,
            liked_you_boost: 200.0,
        }
    }
}

/// Result of a like
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeOutcome {
    #[serde(rename = "isMatch")]
    pub is_match: bool,
    #[serde(rename = "matchId", skip_serializing_if = "Option::is_none")]
    pub match_id: Option<String>,
}

impl LikeOutcome {
    pub fn no_match() -> Self {
        Self { is_match: false, match_id: None }
    }

    pub fn matched(match_id: String) -> Self {
        Self { is_match: true, match_id: Some(match_id) }
    }
}

/// Everything a store needs to apply a like as one atomic unit
#[derive(Debug, Clone)]
pub struct LikeCommit {
    pub from_user_id: String,
    pub to_user_id: String,
    pub match_id: String,
    /// Used only if the like turns out to be reciprocal
    pub chat_id: String,
    pub at: DateTime<Utc>,
}

/// One swipe decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeAction {
    Like,
    Decline,
}
