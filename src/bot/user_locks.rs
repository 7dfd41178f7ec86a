//! Per-user serialization of message handling.
//!
//! Two near-simultaneous greetings from the same user must not both read the
//! same stored stage and race their writes, so each user's read-decide-write
//! section runs under a per-user mutex. Different users never contend with
//! each other.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Cache of per-user mutexes guarding the read-decide-write section.
///
/// Backed by a bounded moka cache so the lock table cannot grow without
/// limit in a busy group chat. Idle entries age out; an entry's idle timer
/// restarts on every acquisition, so the TTL only has to exceed a single
/// message's bounded handling time.
#[derive(Clone)]
pub struct UserLocks {
    /// Moka cache storing `user_id` -> mutex mappings with automatic expiry.
    locks: Cache<i64, Arc<Mutex<()>>>,
}

impl UserLocks {
    /// Creates a lock cache with the given idle TTL and capacity.
    ///
    /// # Arguments
    ///
    /// * `ttl_secs` - Seconds an unused lock entry stays cached
    /// * `max_capacity` - Maximum number of lock entries
    ///
    /// # Examples
    ///
    /// ```
    /// use fruitstand::bot::UserLocks;
    ///
    /// let locks = UserLocks::new(
    ///     3600,    // 1 hour idle TTL
    ///     100_000, // max 100k entries
    /// );
    /// ```
    #[must_use]
    pub fn new(ttl_secs: u64, max_capacity: u64) -> Self {
        let locks = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(Duration::from_secs(ttl_secs))
            .build();

        Self { locks }
    }

    /// Acquires the lock for `user_id`, creating it on first use.
    ///
    /// The returned guard owns the mutex for its lifetime; dropping it lets
    /// the next message from the same user proceed.
    pub async fn acquire(&self, user_id: i64) -> OwnedMutexGuard<()> {
        self.locks
            .get_with(user_id, async { Arc::new(Mutex::new(())) })
            .await
            .lock_owned()
            .await
    }
}
