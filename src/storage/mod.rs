//! # Storage Module - Campaign Persistence Layer
//!
//! Character sheets, campaign sessions and combat trackers live in a single SQLite file.
//!
//! ## Access model
//!
//! - Every operation runs on Tokio's blocking pool and opens its own connection, which is
//!   dropped when the operation finishes. Nothing holds a connection between commands.
//! - SQLite's file locking plus a busy timeout is the only coordination between
//!   concurrent handlers.
//! - Hit-point changes read, clamp and write inside one `BEGIN IMMEDIATE` transaction, so
//!   two simultaneous damage/heal commands on one sheet are applied one after the other.
//!
//! ## Scoping
//!
//! Sheets belong to an `(owner_id, server_id)` pair. Every lookup, list, delete and HP
//! change filters on both, so a sheet id guessed from another server is invisible.
//! [`CampaignStore::update_sheet`] is the one by-id operation; callers resolve ownership
//! with [`CampaignStore::get_sheet`] first.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rpgmaster::storage::{CampaignStore, NewSheet};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = CampaignStore::open("./data/rpg_campaigns.db").await?;
//!     let mut sheet = NewSheet::new("Aria", "Mage");
//!     sheet.abilities.constitution = 14;
//!     let id = store.create_sheet("player-1", "server-1", sheet).await?;
//!     let aria = store.get_sheet("player-1", "server-1", id).await?;
//!     assert_eq!(aria.map(|s| s.max_hp), Some(12));
//!     Ok(())
//! }
//! ```
//!
//! ## Errors
//!
//! Store failures come back as [`RpgError::Persistence`] and are logged here with the
//! operation name and identifiers. A missing sheet is an empty result for lookups and
//! [`RpgError::NotFound`] for HP changes.

pub mod schema;
pub mod session;
pub mod sheet;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use log::{debug, error, info};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::combat::{clamp_hp, HpChange};
use crate::error::{RpgError, RpgResult};
use crate::validation::validate_amount;
use schema::{SCHEMA, SHEET_COLUMNS};

pub use session::{NewSession, SessionRecord, SessionStatus};
pub use sheet::{
    ability_modifier, proficiency_bonus, starting_max_hp, Abilities, Ability, CharacterSheet,
    NewSheet, SheetUpdate,
};

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Row counts reported by `rpgmaster status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub sheets: u64,
    pub sessions: u64,
    pub active_sessions: u64,
    pub combat_trackers: u64,
}

/// Handle to the campaign database file. Cheap to clone; holds no open connection.
#[derive(Debug, Clone)]
pub struct CampaignStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl CampaignStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub async fn open(path: impl Into<PathBuf>) -> RpgResult<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT).await
    }

    pub async fn open_with_timeout(
        path: impl Into<PathBuf>,
        busy_timeout: Duration,
    ) -> RpgResult<Self> {
        let store = Self {
            path: path.into(),
            busy_timeout,
        };
        if let Some(parent) = store.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    RpgError::Persistence(format!("create {}: {e}", parent.display()))
                })?;
            }
        }
        store
            .call("init_schema".to_string(), |conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        info!("Campaign store ready at {}", store.path.display());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against a fresh connection on the blocking pool.
    async fn call<T, F>(&self, op: String, f: F) -> RpgResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> RpgResult<T> + Send + 'static,
    {
        let path = self.path.clone();
        let busy_timeout = self.busy_timeout;
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = Connection::open(&path)?;
            conn.busy_timeout(busy_timeout)?;
            f(&mut conn)
        })
        .await
        .unwrap_or_else(|e| Err(e.into()));
        if let Err(e @ RpgError::Persistence(_)) = &result {
            error!("store op '{}' failed: {}", op, e);
        }
        result
    }

    /// Insert a sheet for `(owner_id, server_id)` and return its id.
    pub async fn create_sheet(
        &self,
        owner_id: &str,
        server_id: &str,
        sheet: NewSheet,
    ) -> RpgResult<i64> {
        sheet.validate()?;
        let (max_hp, current_hp) = sheet.resolved_hp();
        let owner = owner_id.to_string();
        let server = server_id.to_string();
        let op = format!("create_sheet owner={owner_id} server={server_id}");
        let id = self
            .call(op, move |conn| {
                let now = format_stamp(now_micros());
                let abilities = sheet.abilities;
                conn.execute(
                    "INSERT INTO sheets (
                        owner_id, server_id, name, class, level, race,
                        strength, dexterity, constitution, intelligence, wisdom, charisma,
                        max_hp, current_hp, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                    params![
                        owner,
                        server,
                        sheet.name,
                        sheet.class,
                        sheet.level(),
                        sheet.race(),
                        abilities.strength,
                        abilities.dexterity,
                        abilities.constitution,
                        abilities.intelligence,
                        abilities.wisdom,
                        abilities.charisma,
                        max_hp,
                        current_hp,
                        now,
                        now,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        debug!("created sheet #{id} for owner={owner_id} server={server_id}");
        Ok(id)
    }

    /// All sheets of `(owner_id, server_id)`, most recently updated first.
    pub async fn list_sheets(
        &self,
        owner_id: &str,
        server_id: &str,
    ) -> RpgResult<Vec<CharacterSheet>> {
        let owner = owner_id.to_string();
        let server = server_id.to_string();
        let op = format!("list_sheets owner={owner_id} server={server_id}");
        self.call(op, move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SHEET_COLUMNS} FROM sheets
                 WHERE owner_id = ?1 AND server_id = ?2
                 ORDER BY updated_at DESC, id DESC"
            ))?;
            let rows = stmt.query_map(params![owner, server], sheet_from_row)?;
            let sheets = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(sheets)
        })
        .await
    }

    /// One sheet, only if it belongs to `(owner_id, server_id)`.
    pub async fn get_sheet(
        &self,
        owner_id: &str,
        server_id: &str,
        id: i64,
    ) -> RpgResult<Option<CharacterSheet>> {
        let owner = owner_id.to_string();
        let server = server_id.to_string();
        let op = format!("get_sheet id={id} owner={owner_id} server={server_id}");
        self.call(op, move |conn| {
            let sheet = conn
                .query_row(
                    &format!(
                        "SELECT {SHEET_COLUMNS} FROM sheets
                         WHERE owner_id = ?1 AND server_id = ?2 AND id = ?3"
                    ),
                    params![owner, server, id],
                    sheet_from_row,
                )
                .optional()?;
            Ok(sheet)
        })
        .await
    }

    /// Apply the present fields of `update` to sheet `id`.
    ///
    /// Returns `Ok(false)` without touching the row when `update` is empty or no sheet
    /// has that id. Otherwise `updated_at` moves strictly forward and current HP is
    /// re-clamped against the (possibly new) max HP.
    pub async fn update_sheet(&self, id: i64, update: SheetUpdate) -> RpgResult<bool> {
        if update.is_empty() {
            debug!("update_sheet id={id}: nothing to change");
            return Ok(false);
        }
        update.validate()?;
        let op = format!("update_sheet id={id}");
        self.call(op, move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let previous: Option<String> = tx
                .query_row("SELECT updated_at FROM sheets WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            let Some(previous) = previous else {
                return Ok(false);
            };
            let previous = parse_stamp(&previous)
                .map_err(|e| RpgError::Persistence(format!("bad updated_at on #{id}: {e}")))?;

            let assignments = update.assignments();
            let n = assignments.len();
            let set_clause = assignments
                .iter()
                .enumerate()
                .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "UPDATE sheets SET {set_clause}, updated_at = ?{} WHERE id = ?{}",
                n + 1,
                n + 2
            );
            let values = assignments
                .into_iter()
                .map(|(_, value)| value)
                .chain([
                    Value::Text(format_stamp(next_stamp(previous))),
                    Value::Integer(id),
                ]);
            tx.execute(&sql, params_from_iter(values))?;
            tx.execute(
                "UPDATE sheets SET current_hp = MAX(0, MIN(current_hp, max_hp)) WHERE id = ?1",
                [id],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
    }

    /// Delete sheet `id` if it belongs to `(owner_id, server_id)`. `Ok(false)` when
    /// nothing matched.
    pub async fn delete_sheet(&self, id: i64, owner_id: &str, server_id: &str) -> RpgResult<bool> {
        let owner = owner_id.to_string();
        let server = server_id.to_string();
        let op = format!("delete_sheet id={id} owner={owner_id} server={server_id}");
        let removed = self
            .call(op, move |conn| {
                let n = conn.execute(
                    "DELETE FROM sheets WHERE id = ?1 AND owner_id = ?2 AND server_id = ?3",
                    params![id, owner, server],
                )?;
                Ok(n > 0)
            })
            .await?;
        if removed {
            info!("deleted sheet #{id} owner={owner_id} server={server_id}");
        }
        Ok(removed)
    }

    /// Add `delta` to current HP, clamped into `[0, max_hp]`, atomically.
    pub async fn apply_hp_delta(
        &self,
        owner_id: &str,
        server_id: &str,
        id: i64,
        delta: i32,
    ) -> RpgResult<HpChange> {
        let owner = owner_id.to_string();
        let server = server_id.to_string();
        let op = format!("apply_hp_delta id={id} delta={delta} owner={owner_id} server={server_id}");
        self.call(op, move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let row = tx
                .query_row(
                    "SELECT name, current_hp, max_hp, updated_at FROM sheets
                     WHERE id = ?1 AND owner_id = ?2 AND server_id = ?3",
                    params![id, owner, server],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, i32>(1)?,
                            row.get::<_, i32>(2)?,
                            stamp_column(row, 3)?,
                        ))
                    },
                )
                .optional()?;
            let Some((name, before, max_hp, previous)) = row else {
                return Err(RpgError::NotFound { id });
            };
            let after = clamp_hp(before, max_hp, delta);
            tx.execute(
                "UPDATE sheets SET current_hp = ?1, updated_at = ?2 WHERE id = ?3",
                params![after, format_stamp(next_stamp(previous)), id],
            )?;
            tx.commit()?;
            Ok(HpChange {
                sheet_id: id,
                name,
                before,
                after,
                max_hp,
            })
        })
        .await
    }

    /// Subtract `amount` (>= 0) hit points.
    pub async fn apply_damage(
        &self,
        owner_id: &str,
        server_id: &str,
        id: i64,
        amount: i32,
    ) -> RpgResult<HpChange> {
        validate_amount(amount)?;
        self.apply_hp_delta(owner_id, server_id, id, -amount).await
    }

    /// Restore `amount` (>= 0) hit points, never above max HP.
    pub async fn apply_healing(
        &self,
        owner_id: &str,
        server_id: &str,
        id: i64,
        amount: i32,
    ) -> RpgResult<HpChange> {
        validate_amount(amount)?;
        self.apply_hp_delta(owner_id, server_id, id, amount).await
    }

    pub async fn stats(&self) -> RpgResult<StoreStats> {
        self.call("stats".to_string(), |conn| {
            let count = |sql: &str| -> rusqlite::Result<u64> {
                conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                    .map(|n| n.max(0) as u64)
            };
            Ok(StoreStats {
                sheets: count("SELECT COUNT(*) FROM sheets")?,
                sessions: count("SELECT COUNT(*) FROM sessions")?,
                active_sessions: count("SELECT COUNT(*) FROM sessions WHERE status = 'active'")?,
                combat_trackers: count("SELECT COUNT(*) FROM combat_trackers")?,
            })
        })
        .await
    }
}

pub(crate) fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A timestamp strictly after `previous`, normally just "now".
pub(crate) fn next_stamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now_micros();
    if now > previous {
        now
    } else {
        previous + chrono::Duration::microseconds(1)
    }
}

/// Fixed-width RFC3339 so that text order equals time order in SQL.
pub(crate) fn format_stamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_stamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

pub(crate) fn stamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_stamp(&raw).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn json_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn sheet_from_row(row: &Row<'_>) -> rusqlite::Result<CharacterSheet> {
    Ok(CharacterSheet {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        server_id: row.get(2)?,
        name: row.get(3)?,
        class: row.get(4)?,
        level: row.get(5)?,
        race: row.get(6)?,
        abilities: Abilities {
            strength: row.get(7)?,
            dexterity: row.get(8)?,
            constitution: row.get(9)?,
            intelligence: row.get(10)?,
            wisdom: row.get(11)?,
            charisma: row.get(12)?,
        },
        max_hp: row.get(13)?,
        current_hp: row.get(14)?,
        experience: row.get(15)?,
        currency: json_column(row, 16)?,
        inventory: json_column(row, 17)?,
        notes: row.get(18)?,
        created_at: stamp_column(row, 19)?,
        updated_at: stamp_column(row, 20)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamps_sort_lexically() {
        let a = now_micros();
        let b = next_stamp(a);
        assert!(b > a);
        assert!(format_stamp(b) > format_stamp(a));
        assert_eq!(parse_stamp(&format_stamp(a)).unwrap(), a);
    }

    #[test]
    fn next_stamp_moves_past_future_previous() {
        let future = now_micros() + chrono::Duration::seconds(60);
        assert_eq!(next_stamp(future), future + chrono::Duration::microseconds(1));
    }
}
