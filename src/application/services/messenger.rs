use async_trait::async_trait;

use crate::domain::{
    errors::SendError,
    models::{Embed, Recipient},
    value_objects::{MessageReference, RecipientId},
};

/// A custom emoji as the platform renders it inside text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomEmoji {
    pub id: u64,
    pub name: String,
    pub animated: bool,
}

impl CustomEmoji {
    pub fn token(&self) -> String {
        let prefix = if self.animated { "a" } else { "" };
        format!("<{prefix}:{}:{}>", self.name, self.id)
    }
}

/// Payload of an existing message, used as a blast template.
#[derive(Debug, Clone, Default)]
pub struct SourceMessage {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub reaction_emojis: Vec<CustomEmoji>,
}

#[async_trait]
pub trait MessengerClient: Send + Sync {
    /// Delivers `content` and/or `embed` to the recipient's direct channel.
    async fn send_direct(
        &self,
        recipient: RecipientId,
        content: Option<&str>,
        embed: Option<&Embed>,
    ) -> Result<(), SendError>;

    async fn list_members(&self, guild_id: u64) -> anyhow::Result<Vec<Recipient>>;

    /// `Ok(None)` when the message does not exist.
    async fn fetch_message(
        &self,
        reference: &MessageReference,
    ) -> anyhow::Result<Option<SourceMessage>>;

    async fn list_emojis(&self, guild_id: u64) -> anyhow::Result<Vec<CustomEmoji>>;
}
