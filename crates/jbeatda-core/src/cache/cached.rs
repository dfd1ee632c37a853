use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Consider cache stale after 1 hour.
/// Stamps and profile data change rarely; an hour keeps refreshes infrequent.
const CACHE_STALE_MINUTES: i64 = 60;

/// A cached value plus the time it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        // Negative ages come from clock skew
        if minutes < 1 {
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            // 1h 30m+ rounds up to 2h
            let hours = minutes / 60 + i64::from(minutes % 60 >= 30);
            format!("{}h ago", hours)
        } else {
            // 1d 12h+ rounds up to 2d
            let days = minutes / 1440 + i64::from((minutes % 1440) / 60 >= 12);
            format!("{}d ago", days)
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > CACHE_STALE_MINUTES
    }
}
