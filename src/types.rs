use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// GitHub API response structures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub full_name: String,
    pub stargazers_count: u32,
    pub created_at: DateTime<Utc>,
}

/// One entry of the `application/vnd.github.v3.star+json` stargazer listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarEvent {
    pub starred_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RateLimitResponse {
    pub rate: RateLimitSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    pub remaining: u32,
    pub limit: u32,
}

impl RateLimitSnapshot {
    /// Percentage of the budget left, `remaining * 100 / limit`. Zero when the
    /// limit is zero.
    pub fn remaining_pct(&self) -> u32 {
        if self.limit == 0 {
            return 0;
        }
        (self.remaining.min(self.limit) as u64 * 100 / self.limit as u64) as u32
    }

    /// Percentage of the budget already spent.
    pub fn used_pct(&self) -> u32 {
        100 - self.remaining_pct()
    }
}
