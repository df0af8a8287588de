use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a user has no swipes left for the current day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Daily swipe limit reached: {used}/{limit}")]
pub struct QuotaExceeded {
    pub used: u32,
    pub limit: u32,
}

/// Stored swipe counter of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwipeState {
    pub count: u32,
    pub last_reset_at: Option<DateTime<Utc>>,
    pub is_premium: bool,
}

/// Counter after a swipe was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeTally {
    pub count: u32,
    pub limit: u32,
    pub last_reset_at: DateTime<Utc>,
}

impl SwipeTally {
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.count)
    }
}

/// Read-only view of today's quota
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeStatus {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
}

/// Daily swipe limits and the day boundary they reset on
#[derive(Debug, Clone, Copy)]
pub struct QuotaPolicy {
    pub free_daily_limit: u32,
    pub premium_daily_limit: u32,
    /// Calendar days are computed in this offset
    pub day_offset: FixedOffset,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            free_daily_limit: 5,
            premium_daily_limit: 10,
            day_offset: Utc.fix(),
        }
    }
}

impl QuotaPolicy {
    /// Build a policy with the day boundary at `utc_offset_minutes` from UTC
    ///
    /// Offsets outside +/-24h fall back to UTC.
    pub fn new(free_daily_limit: u32, premium_daily_limit: u32, utc_offset_minutes: i32) -> Self {
        let day_offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());

        Self {
            free_daily_limit,
            premium_daily_limit,
            day_offset,
        }
    }

    pub fn limit_for(&self, is_premium: bool) -> u32 {
        if is_premium { self.premium_daily_limit } else { self.free_daily_limit }
    }

    /// Whether `last_reset_at` falls on an earlier (or later) calendar day than `now`
    ///
    /// A missing timestamp always counts as another day.
    pub fn is_new_day(&self, last_reset_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last_reset_at {
            Some(last) => {
                last.with_timezone(&self.day_offset).date_naive()
                    != now.with_timezone(&self.day_offset).date_naive()
            }
            None => true,
        }
    }

    /// Apply one swipe to `state`
    ///
    /// First swipe of a new day resets the count to 1 and moves the reset
    /// timestamp to `now`; otherwise the count increments and the timestamp is
    /// kept. A same-day swipe at or above the tier limit is rejected.
    pub fn advance(&self, state: SwipeState, now: DateTime<Utc>) -> Result<SwipeTally, QuotaExceeded> {
        let limit = self.limit_for(state.is_premium);

        match state.last_reset_at {
            Some(last_reset_at) if !self.is_new_day(Some(last_reset_at), now) => {
                if state.count >= limit {
                    return Err(QuotaExceeded { used: state.count, limit });
                }
                Ok(SwipeTally {
                    count: state.count + 1,
                    limit,
                    last_reset_at,
                })
            }
            _ if limit == 0 => Err(QuotaExceeded { used: 0, limit }),
            _ => Ok(SwipeTally {
                count: 1,
                limit,
                last_reset_at: now,
            }),
        }
    }

    pub fn status(&self, state: SwipeState, now: DateTime<Utc>) -> SwipeStatus {
        let limit = self.limit_for(state.is_premium);
        let used = if self.is_new_day(state.last_reset_at, now) { 0 } else { state.count };

        SwipeStatus {
            used,
            limit,
            remaining: limit.saturating_sub(used),
        }
    }
}
