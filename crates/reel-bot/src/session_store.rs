//! Per-user pending video requests.
//!
//! A session links the image generated for a user to the track choice that
//! will follow. It is written when an image is generated and consumed exactly
//! once when the user picks a track.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use image::DynamicImage;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use reel_models::UserId;

use crate::metrics;

/// Generated image waiting for a track choice.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub image: DynamicImage,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct StoredSession {
    session: Session,
    stored_at: Instant,
}

/// Keyed session store shared between event tasks.
///
/// Clones share the same map. Entries live in independently locked shards,
/// so users never wait on each other, and each call touches its key under
/// one shard lock.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<UserId, StoredSession>>,
    /// Maximum session age; `None` keeps sessions until taken
    ttl: Option<Duration>,
}

impl SessionStore {
    /// Store whose sessions never expire.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Store the session for `user_id`, replacing any previous one.
    pub fn put(&self, user_id: UserId, image: DynamicImage, prompt: impl Into<String>) {
        let stored = StoredSession {
            session: Session {
                user_id,
                image,
                prompt: prompt.into(),
                created_at: Utc::now(),
            },
            stored_at: Instant::now(),
        };

        // The shard is unlocked once `insert` returns; the old bitmap is
        // freed here, outside it.
        let previous = self.sessions.insert(user_id, stored);
        debug!(user_id = %user_id, replaced = previous.is_some(), "Session stored");
        drop(previous);
    }

    /// Remove and return the session for `user_id`.
    ///
    /// An expired session is discarded and reported as absent.
    pub fn take(&self, user_id: UserId) -> Option<Session> {
        let (_, stored) = self.sessions.remove(&user_id)?;

        if self.is_expired(&stored, Instant::now()) {
            debug!(user_id = %user_id, "Discarded expired session");
            metrics::record_sessions_expired(1);
            return None;
        }

        Some(stored.session)
    }

    /// Drop every expired session and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        if self.ttl.is_none() {
            return 0;
        }

        let now = Instant::now();
        let removed = AtomicUsize::new(0);
        self.sessions.retain(|_, stored| {
            let expired = self.is_expired(stored, now);
            if expired {
                removed.fetch_add(1, Ordering::Relaxed);
            }
            !expired
        });

        let removed = removed.into_inner();
        if removed > 0 {
            info!(removed, "Purged expired sessions");
            metrics::record_sessions_expired(removed as u64);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Purge expired sessions every `period` until `shutdown` flips.
    pub fn spawn_sweeper(
        &self,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        store.purge_expired();
                    }
                    _ = shutdown.changed() => break,
                }
            }
            debug!("Session sweeper stopped");
        })
    }

    fn is_expired(&self, stored: &StoredSession, now: Instant) -> bool {
        self.ttl
            .is_some_and(|ttl| now.duration_since(stored.stored_at) >= ttl)
    }
}
