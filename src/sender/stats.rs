// Lock-free delivery statistics using atomic operations

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Counters shared by every post on one forward connection.
#[derive(Debug, Default)]
pub struct ForwardStats {
    posts: AtomicU64,
    failed_posts: AtomicU64,
    bytes_sent: AtomicU64,
    last_post_time: AtomicU64,
    connects: AtomicU64,
    connection_errors: AtomicU64,
    timeout_errors: AtomicU64,
}

impl ForwardStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one fully written entry
    pub fn record_post(&self, bytes: u64) {
        self.posts.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        self.last_post_time.store(now, Ordering::Relaxed);
    }

    pub fn record_failed_post(&self) {
        self.failed_posts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout_error(&self) {
        self.timeout_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ForwardStatsSnapshot {
        ForwardStatsSnapshot {
            posts: self.posts.load(Ordering::Relaxed),
            failed_posts: self.failed_posts.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            last_post_time: self.last_post_time.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            timeout_errors: self.timeout_errors.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of delivery statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardStatsSnapshot {
    pub posts: u64,
    pub failed_posts: u64,
    pub bytes_sent: u64,
    pub last_post_time: u64,
    pub connects: u64,
    pub connection_errors: u64,
    pub timeout_errors: u64,
}

impl ForwardStatsSnapshot {
    /// Fraction of attempted posts that were written (1.0 when idle)
    pub fn success_rate(&self) -> f64 {
        let attempted = self.posts + self.failed_posts;
        if attempted == 0 {
            return 1.0;
        }

        self.posts as f64 / attempted as f64
    }

    /// Reconnects beyond the first connection
    pub fn reconnects(&self) -> u64 {
        self.connects.saturating_sub(1)
    }
}
