//! In-memory registry of running sessions, keyed by session key.
//!
//! Owned by [`super::BotContext`]; entries live until `end-session` or process exit.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub key: String,
    pub server_id: String,
    pub channel_id: String,
    pub master_id: String,
    pub system: String,
    pub players: Vec<String>,
    pub started_at: DateTime<Utc>,
}

/// `{channel}_{YYYYmmddHHMMSSmmm}_{seq}`; `seq` keeps keys from one registry distinct
/// within the same millisecond.
pub fn session_key(channel_id: &str, at: DateTime<Utc>, seq: u64) -> String {
    format!("{}_{}_{}", channel_id, at.format("%Y%m%d%H%M%S%3f"), seq)
}

#[derive(Debug, Default)]
pub struct ActiveSessions {
    inner: RwLock<HashMap<String, ActiveSession>>,
    next_seq: AtomicU64,
}

impl ActiveSessions {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ActiveSession>> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ActiveSession>> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn start(
        &self,
        server_id: &str,
        channel_id: &str,
        master_id: &str,
        system: &str,
    ) -> ActiveSession {
        let started_at = Utc::now();
        let session = ActiveSession {
            key: session_key(
                channel_id,
                started_at,
                self.next_seq.fetch_add(1, Ordering::Relaxed),
            ),
            server_id: server_id.to_string(),
            channel_id: channel_id.to_string(),
            master_id: master_id.to_string(),
            system: system.to_string(),
            players: Vec::new(),
            started_at,
        };
        self.write().insert(session.key.clone(), session.clone());
        session
    }

    /// Latest session started in `channel_id`.
    pub fn for_channel(&self, channel_id: &str) -> Option<ActiveSession> {
        self.read()
            .values()
            .filter(|s| s.channel_id == channel_id)
            .max_by_key(|s| s.started_at)
            .cloned()
    }

    /// Remove every session of `channel_id`, oldest first.
    pub fn end_channel(&self, channel_id: &str) -> Vec<ActiveSession> {
        let mut map = self.write();
        let keys: Vec<String> = map
            .values()
            .filter(|s| s.channel_id == channel_id)
            .map(|s| s.key.clone())
            .collect();
        let mut ended: Vec<ActiveSession> =
            keys.iter().filter_map(|k| map.remove(k)).collect();
        ended.sort_by_key(|s| s.started_at);
        ended
    }

    /// Drop one session by key, leaving the channel's other sessions alone.
    pub fn remove(&self, key: &str) -> Option<ActiveSession> {
        self.write().remove(key)
    }

    /// Add `player_id` to the channel's latest session. `false` if absent or already joined.
    pub fn join(&self, channel_id: &str, player_id: &str) -> bool {
        let mut map = self.write();
        let latest = map
            .values_mut()
            .filter(|s| s.channel_id == channel_id)
            .max_by_key(|s| s.started_at);
        match latest {
            Some(session) if !session.players.iter().any(|p| p == player_id) => {
                session.players.push(player_id.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
