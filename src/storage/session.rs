//! Campaign session rows: one per `start-session`, ended per channel.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::info;
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::schema::SESSION_COLUMNS;
use super::{format_stamp, json_column, now_micros, stamp_column, CampaignStore};
use crate::error::{RpgError, RpgResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    Active,
    Ended,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Ended => "ended",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = RpgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "ended" => Ok(SessionStatus::Ended),
            other => Err(RpgError::Persistence(format!("unknown session status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub session_key: String,
    pub server_id: String,
    pub channel_id: String,
    pub master_id: String,
    pub system: String,
    /// Defaults to `Session <MM-DD HH:MM>` when absent.
    pub campaign_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub id: i64,
    pub session_key: String,
    pub server_id: String,
    pub channel_id: String,
    pub master_id: String,
    pub system: String,
    pub campaign_name: String,
    pub status: SessionStatus,
    pub players: Vec<String>,
    pub history: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    let status: String = row.get(7)?;
    let status = status.parse::<SessionStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(SessionRecord {
        id: row.get(0)?,
        session_key: row.get(1)?,
        server_id: row.get(2)?,
        channel_id: row.get(3)?,
        master_id: row.get(4)?,
        system: row.get(5)?,
        campaign_name: row.get(6)?,
        status,
        players: json_column(row, 8)?,
        history: json_column(row, 9)?,
        created_at: stamp_column(row, 10)?,
        updated_at: stamp_column(row, 11)?,
    })
}

impl CampaignStore {
    /// Record a new active session and return its row id.
    pub async fn create_session(&self, session: NewSession) -> RpgResult<i64> {
        let op = format!(
            "create_session key={} channel={}",
            session.session_key, session.channel_id
        );
        let key = session.session_key.clone();
        let id = self
            .call(op, move |conn| {
                let now = now_micros();
                let campaign = session
                    .campaign_name
                    .clone()
                    .unwrap_or_else(|| format!("Session {}", now.format("%m-%d %H:%M")));
                let stamp = format_stamp(now);
                conn.execute(
                    "INSERT INTO sessions (
                        session_key, server_id, channel_id, master_id, system,
                        campaign_name, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        session.session_key,
                        session.server_id,
                        session.channel_id,
                        session.master_id,
                        session.system,
                        campaign,
                        stamp,
                        stamp,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        info!("session {key} recorded as row #{id}");
        Ok(id)
    }

    /// Most recent active session in `channel_id`, if any.
    pub async fn active_session(&self, channel_id: &str) -> RpgResult<Option<SessionRecord>> {
        let channel = channel_id.to_string();
        let op = format!("active_session channel={channel_id}");
        self.call(op, move |conn| {
            let record = conn
                .query_row(
                    &format!(
                        "SELECT {SESSION_COLUMNS} FROM sessions
                         WHERE channel_id = ?1 AND status = 'active'
                         ORDER BY created_at DESC, id DESC LIMIT 1"
                    ),
                    params![channel],
                    session_from_row,
                )
                .optional()?;
            Ok(record)
        })
        .await
    }

    /// Add `player_id` to the player list of the channel's active session.
    /// Returns `false` when there is no active session or the player is already listed.
    pub async fn add_session_player(&self, channel_id: &str, player_id: &str) -> RpgResult<bool> {
        let channel = channel_id.to_string();
        let player = player_id.to_string();
        let op = format!("add_session_player channel={channel_id} player={player_id}");
        self.call(op, move |conn| {
            let tx = conn.transaction()?;
            let current = tx
                .query_row(
                    "SELECT id, players FROM sessions
                     WHERE channel_id = ?1 AND status = 'active'
                     ORDER BY created_at DESC, id DESC LIMIT 1",
                    params![channel],
                    |row| Ok((row.get::<_, i64>(0)?, json_column::<Vec<String>>(row, 1)?)),
                )
                .optional()?;
            let Some((id, mut players)) = current else {
                return Ok(false);
            };
            if players.iter().any(|p| p == &player) {
                return Ok(false);
            }
            players.push(player);
            tx.execute(
                "UPDATE sessions SET players = ?1, updated_at = ?2 WHERE id = ?3",
                params![serde_json::to_string(&players)?, format_stamp(now_micros()), id],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
    }

    /// Mark every active session in `channel_id` as ended; returns how many were ended.
    pub async fn end_session(&self, channel_id: &str) -> RpgResult<usize> {
        let channel = channel_id.to_string();
        let op = format!("end_session channel={channel_id}");
        let ended = self
            .call(op, move |conn| {
                let n = conn.execute(
                    "UPDATE sessions SET status = 'ended', updated_at = ?1
                     WHERE channel_id = ?2 AND status = 'active'",
                    params![format_stamp(now_micros()), channel],
                )?;
                Ok(n)
            })
            .await?;
        if ended > 0 {
            info!("ended {ended} session(s) in channel {channel_id}");
        }
        Ok(ended)
    }
}
