//! # Content Tracker
//! In-memory, TTL-bounded set of content fingerprints shared by both relay
//! directions.
//!
//! Entries are never refreshed: a repeat hit is rejected, not extended. A
//! background sweeper drops entries older than the TTL once per minute.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::normalize::{fingerprint, Fingerprint};

/// How often the sweeper runs.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

const SHARDS: usize = 16;

type Shard = Mutex<HashMap<Fingerprint, Instant>>;

/// Thread-safe, expiring set of normalized-content fingerprints.
#[derive(Debug)]
pub struct ContentTracker {
    shards: Vec<Shard>,
    ttl: Duration,
}

impl ContentTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            shards: (0..SHARDS).map(|_| Mutex::new(HashMap::new())).collect(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn shard(&self, fp: &Fingerprint) -> &Shard {
        &self.shards[fp.as_bytes()[0] as usize % SHARDS]
    }

    fn is_live(&self, inserted: Instant, now: Instant) -> bool {
        now.saturating_duration_since(inserted) <= self.ttl
    }

    /// Claim `text`. Returns `true` exactly once per live fingerprint, even
    /// under concurrent callers; later calls return `false` and leave the
    /// original timestamp untouched.
    pub fn check_and_mark(&self, text: &str) -> bool {
        let fp = fingerprint(text);
        let now = Instant::now();

        let mut shard = self.shard(&fp).lock();
        match shard.get(&fp) {
            Some(&inserted) if self.is_live(inserted, now) => {
                debug!(hash = %fp, "content already processed");
                false
            }
            _ => {
                shard.insert(fp, now);
                debug!(hash = %fp, "content marked as processed");
                true
            }
        }
    }

    /// Read-only probe; never claims.
    pub fn is_marked(&self, text: &str) -> bool {
        let fp = fingerprint(text);
        let now = Instant::now();
        let shard = self.shard(&fp).lock();
        shard
            .get(&fp)
            .is_some_and(|&inserted| self.is_live(inserted, now))
    }

    /// Number of stored entries, expired-but-unswept included.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry older than the TTL. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Sweep relative to `now`. Locks one shard at a time.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut removed = 0;
        for shard in &self.shards {
            let mut map = shard.lock();
            let before = map.len();
            map.retain(|_, inserted| self.is_live(*inserted, now));
            removed += before - map.len();
        }
        removed
    }

    /// Spawn the periodic sweeper. It stops when `cancel` fires; the tracker
    /// itself stays usable afterwards.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("tracker sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = self.sweep();
                        let entries = self.len();
                        crate::metrics::set_tracker_entries(entries);
                        if removed > 0 {
                            debug!(removed, entries, "removed expired content hashes");
                        }
                    }
                }
            }
        })
    }
}
