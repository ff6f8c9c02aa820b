use std::sync::Mutex;

use crate::config::Config;
use crate::dice::{DiceLimits, DieRoller, RandomRoller};
use crate::storage::CampaignStore;

use super::sessions::ActiveSessions;

/// Process-scoped state shared by every command task.
pub struct BotContext {
    pub config: Config,
    pub store: CampaignStore,
    pub sessions: ActiveSessions,
    dice: Mutex<Box<dyn DieRoller>>,
}

impl BotContext {
    pub fn new(config: Config, store: CampaignStore) -> Self {
        Self::with_roller(config, store, RandomRoller::from_entropy())
    }

    /// Use a specific die source, e.g. a scripted one in tests.
    pub fn with_roller(
        config: Config,
        store: CampaignStore,
        roller: impl DieRoller + 'static,
    ) -> Self {
        Self {
            config,
            store,
            sessions: ActiveSessions::new(),
            dice: Mutex::new(Box::new(roller)),
        }
    }

    /// Run `f` with exclusive use of the die source. Never held across an await.
    pub fn with_dice<T>(&self, f: impl FnOnce(&mut dyn DieRoller) -> T) -> T {
        let mut guard = self.dice.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut **guard)
    }

    pub fn dice_limits(&self) -> DiceLimits {
        self.config.dice.limits()
    }

    pub fn prefix(&self) -> &str {
        &self.config.bot.command_prefix
    }
}
