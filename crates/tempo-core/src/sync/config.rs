//! Sync engine tuning knobs

use std::time::Duration;

/// Configuration for the sync engine and retention sweeps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Maximum outbox events drained per push batch
    pub push_batch_size: i64,
    /// Failed attempts before an event stops retrying
    pub max_retries: i64,
    /// Interval between periodic sync cycles
    pub sync_interval: Duration,
    /// How far back (days, by slot start time) pulls fetch time slots
    pub pull_window_days: i64,
    /// Days a tombstone survives before physical deletion
    pub deleted_retention_days: i64,
    /// Days a delivered outbox event survives before purging
    pub outbox_retention_days: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            push_batch_size: 50,
            max_retries: 5,
            sync_interval: Duration::from_secs(30),
            pull_window_days: 90,
            deleted_retention_days: 7,
            outbox_retention_days: 30,
        }
    }
}

impl SyncConfig {
    /// Override the push batch size
    #[must_use]
    pub const fn with_push_batch_size(mut self, size: i64) -> Self {
        self.push_batch_size = size;
        self
    }

    /// Override the retry cap
    #[must_use]
    pub const fn with_max_retries(mut self, retries: i64) -> Self {
        self.max_retries = retries;
        self
    }

    /// Override the cycle interval
    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Override the slot pull window
    #[must_use]
    pub const fn with_pull_window_days(mut self, days: i64) -> Self {
        self.pull_window_days = days;
        self
    }

    /// Pull window lower bound in Unix ms, relative to `now_ms`
    #[must_use]
    pub const fn pull_window_start(&self, now_ms: i64) -> i64 {
        now_ms - self.pull_window_days * 24 * 60 * 60 * 1000
    }

    /// Tombstone purge cutoff in Unix ms, relative to `now_ms`
    #[must_use]
    pub const fn deleted_cutoff(&self, now_ms: i64) -> i64 {
        now_ms - self.deleted_retention_days * 24 * 60 * 60 * 1000
    }

    /// Delivered-event purge cutoff in Unix ms, relative to `now_ms`
    #[must_use]
    pub const fn outbox_cutoff(&self, now_ms: i64) -> i64 {
        now_ms - self.outbox_retention_days * 24 * 60 * 60 * 1000
    }
}
