use std::collections::HashSet;

use crate::models::{InteractionHistory, UserProfile};

/// Ids that must never be offered to a requester
///
/// Union of the requester's own id, users they liked, users blocked in either
/// direction and existing match partners.
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    ids: HashSet<String>,
}

impl ExclusionSet {
    pub fn build(requester_id: &str, history: &InteractionHistory) -> Self {
        let mut ids: HashSet<String> = HashSet::with_capacity(
            history.liked.len() + history.blocked.len() + history.matched.len() + 1,
        );
        ids.insert(requester_id.to_string());
        ids.extend(history.liked.iter().cloned());
        ids.extend(history.blocked.iter().cloned());
        ids.extend(history.matched.iter().cloned());

        Self { ids }
    }

    #[inline]
    pub fn contains(&self, user_id: &str) -> bool {
        self.ids.contains(user_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Check whether a profile may be ranked for the requester
///
/// Checks the flags carried by `profile` itself. Whether those flags are
/// current is up to the caller; a cached pool must be refreshed first.
#[inline]
pub fn is_eligible_candidate(profile: &UserProfile, exclusions: &ExclusionSet) -> bool {
    profile.is_matchable() && !exclusions.contains(&profile.user_id)
}
