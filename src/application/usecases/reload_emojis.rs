use std::sync::Arc;

use tracing::info;

use crate::{
    application::services::{
        authorization::OperatorPolicy, emoji::EmojiCatalog, messenger::MessengerClient,
    },
    domain::errors::DispatchError,
};

pub struct ReloadEmojisUseCase {
    client: Arc<dyn MessengerClient>,
    emojis: Arc<EmojiCatalog>,
    policy: OperatorPolicy,
    guild_id: u64,
}

impl ReloadEmojisUseCase {
    pub fn new(
        client: Arc<dyn MessengerClient>,
        emojis: Arc<EmojiCatalog>,
        policy: OperatorPolicy,
        guild_id: u64,
    ) -> Self {
        Self {
            client,
            emojis,
            policy,
            guild_id,
        }
    }

    /// Replaces the catalog with the guild's current custom emojis and
    /// returns how many are known.
    pub async fn execute(&self, caller_id: &str) -> Result<usize, DispatchError> {
        self.policy.authorize(caller_id)?;
        self.refresh().await
    }

    /// Same as `execute`, for startup where no caller is involved.
    pub async fn refresh(&self) -> Result<usize, DispatchError> {
        let emojis = self
            .client
            .list_emojis(self.guild_id)
            .await
            .map_err(|err| DispatchError::Endpoint(format!("{err:#}")))?;
        self.emojis.replace_all(&emojis);
        info!(guild_id = self.guild_id, total = self.emojis.len(), "emoji catalog reloaded");
        Ok(self.emojis.len())
    }
}
