use std::collections::HashSet;

use crate::core::distance::distance_between;
use crate::models::{ScoredCandidate, ScoringWeights, UserProfile};

/// Calculate the match score of `candidate` as seen by `requester`
///
/// Terms are additive and evaluated in a fixed order, which is also the order
/// reasons are appended in:
///
/// 1. same school (case-insensitive)       +100  "Same school"
/// 2. candidate is premium                 +50   "Premium"
/// 3. both locations known                 0..40 "Near you (Xkm)" below 5 km
/// 4. same area (case-insensitive)         +30   "Same area"
/// 5. shared interests, 5 each, capped     0..25 "N shared interests"
/// 6. age within 2 years                   +10   "Similar age"
pub fn calculate_match_score(
    requester: &UserProfile,
    candidate: &UserProfile,
    weights: &ScoringWeights,
) -> ScoredCandidate {
    let mut score = 0.0;
    let mut reasons = Vec::new();

    if eq_ignore_case(&requester.school, &candidate.school) {
        score += weights.same_school;
        reasons.push("Same school".to_string());
    }

    if candidate.is_premium {
        score += weights.premium;
        reasons.push("Premium".to_string());
    }

    let distance_km = match (&requester.last_location, &candidate.last_location) {
        (Some(a), Some(b)) => Some(distance_between(a, b)),
        _ => None,
    };

    if let Some(distance) = distance_km {
        score += distance_score(distance, weights);
        if distance < weights.near_threshold_km {
            reasons.push(format!("Near you ({:.1}km)", distance));
        }
    }

    if eq_ignore_case(&requester.location, &candidate.location) {
        score += weights.same_location;
        reasons.push("Same area".to_string());
    }

    let shared = shared_interest_count(requester, candidate);
    score += interest_score(shared, weights);
    if shared > 0 {
        reasons.push(format!("{} shared interests", shared));
    }

    if requester.age.abs_diff(candidate.age) <= weights.similar_age_years {
        score += weights.similar_age;
        reasons.push("Similar age".to_string());
    }

    ScoredCandidate {
        profile: candidate.clone(),
        score,
        reasons,
        distance_km,
    }
}

/// Distance term: full weight at 0 km, linear falloff, never negative
#[inline]
pub fn distance_score(distance_km: f64, weights: &ScoringWeights) -> f64 {
    (weights.distance * (1.0 - distance_km / weights.distance_falloff_km)).max(0.0)
}

/// Interest term for `shared` common tags
#[inline]
pub fn interest_score(shared: usize, weights: &ScoringWeights) -> f64 {
    (shared as f64 * weights.per_shared_interest).min(weights.max_interest_bonus)
}

/// Number of distinct interest tags both profiles carry
pub fn shared_interest_count(a: &UserProfile, b: &UserProfile) -> usize {
    let mine: HashSet<&str> = a.interests.iter().map(String::as_str).collect();
    let theirs: HashSet<&str> = b.interests.iter().map(String::as_str).collect();
    mine.intersection(&theirs).count()
}

#[inline]
fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
