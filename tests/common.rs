//! Test utilities & fixtures.
//! Every store lives in its own temp dir; keep the `TempDir` alive for the test's duration.

use std::path::Path;
use std::sync::Arc;

use rpgmaster::bot::{BotCommand, BotContext, Invocation, UserRef};
use rpgmaster::config::Config;
use rpgmaster::dice::ScriptedRoller;
use rpgmaster::storage::CampaignStore;

#[allow(dead_code)]
pub const SERVER: &str = "guild-1";
#[allow(dead_code)]
pub const CHANNEL: &str = "table";

/// Config pointing at `dir`, with no log file.
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.storage.data_dir = dir.to_string_lossy().to_string();
    config.logging.file = None;
    config
}

#[allow(dead_code)]
pub async fn temp_store() -> (tempfile::TempDir, CampaignStore) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let store = CampaignStore::open(tmp.path().join("campaign.db"))
        .await
        .expect("open store");
    (tmp, store)
}

/// Bot context over a fresh store whose dice return `faces` in order (cycling).
#[allow(dead_code)] // not every test binary drives the handler
pub async fn scripted_context(
    faces: impl IntoIterator<Item = u32>,
) -> (tempfile::TempDir, Arc<BotContext>) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = test_config(tmp.path());
    let store = CampaignStore::open(config.storage.db_path())
        .await
        .expect("open store");
    let ctx = BotContext::with_roller(config, store, ScriptedRoller::new(faces));
    (tmp, Arc::new(ctx))
}

#[allow(dead_code)]
pub fn player(id: &str) -> UserRef {
    let mut name = id.to_string();
    if let Some(first) = name.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    UserRef::new(id, name)
}

#[allow(dead_code)]
pub fn invoke(user: &str, command: BotCommand) -> Invocation {
    Invocation {
        user: player(user),
        server_id: SERVER.to_string(),
        channel_id: CHANNEL.to_string(),
        command,
    }
}
