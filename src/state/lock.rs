//! State locking for concurrent access protection.
//!
//! A lock file next to the state file prevents two `stratus` processes
//! from deploying the same stack at once. Locks expire so a crashed
//! process cannot wedge the state forever.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lock time-to-live in seconds.
pub const LOCK_TTL_SECS: i64 = 600;

/// Information about a state lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Unique lock identifier.
    pub lock_id: String,
    /// Who holds the lock.
    pub holder: String,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
    /// When the lock expires.
    pub expires_at: DateTime<Utc>,
}

impl LockInfo {
    /// Creates a new lock held by the given holder.
    #[must_use]
    pub fn new(holder: &str) -> Self {
        let now = Utc::now();
        Self {
            lock_id: Uuid::new_v4().to_string(),
            holder: holder.to_string(),
            acquired_at: now,
            expires_at: now + chrono::Duration::seconds(LOCK_TTL_SECS),
        }
    }

    /// Checks whether the lock has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Returns the remaining time until expiry in seconds.
    #[must_use]
    pub fn remaining_secs(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}

/// Generates a holder identifier for the current process.
#[must_use]
pub fn holder_id() -> String {
    let hostname = hostname::get()
        .map_or_else(|_| String::from("unknown"), |h| h.to_string_lossy().to_string());
    let pid = std::process::id();
    let suffix = &Uuid::new_v4().to_string()[..8];

    format!("{hostname}-{pid}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_lock_is_live() {
        let lock = LockInfo::new("test-holder");

        assert_eq!(lock.holder, "test-holder");
        assert!(!lock.is_expired());
        assert!(lock.remaining_secs() > 0);
    }

    #[test]
    fn test_expired_lock() {
        let mut lock = LockInfo::new("test-holder");
        lock.expires_at = Utc::now() - chrono::Duration::seconds(1);

        assert!(lock.is_expired());
        assert_eq!(lock.remaining_secs(), 0);
    }

    #[test]
    fn test_holder_ids_are_unique() {
        let id1 = holder_id();
        let id2 = holder_id();

        assert_ne!(id1, id2);
        assert!(id1.contains(&std::process::id().to_string()));
    }
}
