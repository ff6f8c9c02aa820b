//! Table definitions. Applied on every open; each statement is idempotent.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sheets (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id      TEXT    NOT NULL,
    server_id     TEXT    NOT NULL,
    name          TEXT    NOT NULL,
    class         TEXT    NOT NULL,
    level         INTEGER NOT NULL DEFAULT 1,
    race          TEXT    NOT NULL DEFAULT 'Human',
    strength      INTEGER NOT NULL DEFAULT 10,
    dexterity     INTEGER NOT NULL DEFAULT 10,
    constitution  INTEGER NOT NULL DEFAULT 10,
    intelligence  INTEGER NOT NULL DEFAULT 10,
    wisdom        INTEGER NOT NULL DEFAULT 10,
    charisma      INTEGER NOT NULL DEFAULT 10,
    max_hp        INTEGER NOT NULL DEFAULT 10,
    current_hp    INTEGER NOT NULL DEFAULT 10,
    experience    INTEGER NOT NULL DEFAULT 0,
    currency      TEXT    NOT NULL DEFAULT '{"gp":0,"sp":0,"ep":0,"cp":0}',
    inventory     TEXT    NOT NULL DEFAULT '[]',
    notes         TEXT    NOT NULL DEFAULT '',
    created_at    TEXT    NOT NULL,
    updated_at    TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sheets_owner_server ON sheets (owner_id, server_id);

CREATE TABLE IF NOT EXISTS sessions (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    session_key   TEXT    NOT NULL UNIQUE,
    server_id     TEXT    NOT NULL,
    channel_id    TEXT    NOT NULL,
    master_id     TEXT    NOT NULL,
    system        TEXT    NOT NULL,
    campaign_name TEXT    NOT NULL,
    status        TEXT    NOT NULL DEFAULT 'active',
    players       TEXT    NOT NULL DEFAULT '[]',
    history       TEXT    NOT NULL DEFAULT '[]',
    created_at    TEXT    NOT NULL,
    updated_at    TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_channel_status ON sessions (channel_id, status);

CREATE TABLE IF NOT EXISTS combat_trackers (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    session_key         TEXT    NOT NULL,
    channel_id          TEXT    NOT NULL,
    turn                INTEGER NOT NULL DEFAULT 1,
    round               INTEGER NOT NULL DEFAULT 1,
    current_participant TEXT,
    participants        TEXT    NOT NULL DEFAULT '[]',
    active              INTEGER NOT NULL DEFAULT 1,
    created_at          TEXT    NOT NULL,
    updated_at          TEXT    NOT NULL
);
"#;

/// Column list shared by every sheet SELECT; order matches `sheet_from_row`.
pub const SHEET_COLUMNS: &str = "id, owner_id, server_id, name, class, level, race, \
    strength, dexterity, constitution, intelligence, wisdom, charisma, \
    max_hp, current_hp, experience, currency, inventory, notes, created_at, updated_at";

/// Column list shared by every session SELECT; order matches `session_from_row`.
pub const SESSION_COLUMNS: &str = "id, session_key, server_id, channel_id, master_id, system, \
    campaign_name, status, players, history, created_at, updated_at";
