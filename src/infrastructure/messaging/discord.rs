use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    application::services::messenger::{CustomEmoji, MessengerClient, SourceMessage},
    domain::{
        errors::SendError,
        models::{Embed, Recipient},
        value_objects::{MessageReference, RecipientId},
    },
};

const CANNOT_MESSAGE_USER: u64 = 50007;
const MEMBERS_PAGE: usize = 1000;
/// Upper bound applied to provider retry-after hints.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

pub struct DiscordClient {
    http: Client,
    base_url: String,
    token: String,
    dm_channels: RwLock<HashMap<RecipientId, String>>,
}

impl DiscordClient {
    pub fn new(token: String, base_url: String) -> anyhow::Result<Self> {
        Ok(Self {
            http: Client::builder()
                .user_agent("DiscordBot (dmblast, 0.1.0)")
                .timeout(Duration::from_secs(30))
                .build()
                .context("failed to build discord client")?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            dm_channels: RwLock::new(HashMap::new()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn dm_channel(&self, recipient: RecipientId) -> Result<String, SendError> {
        if let Some(channel) = self.dm_channels.read().await.get(&recipient) {
            return Ok(channel.clone());
        }

        let response = self
            .http
            .post(self.url("/users/@me/channels"))
            .header("Authorization", self.authorization())
            .json(&CreateDm {
                recipient_id: recipient.to_string(),
            })
            .send()
            .await
            .map_err(transport)?;
        let channel: DiscordChannel = ensure_sent(response)
            .await?
            .json()
            .await
            .map_err(transport)?;

        self.dm_channels
            .write()
            .await
            .insert(recipient, channel.id.clone());
        Ok(channel.id)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<Option<T>> {
        let response = self
            .http
            .get(self.url(path))
            .header("Authorization", self.authorization())
            .query(query)
            .send()
            .await
            .with_context(|| format!("discord request {path} failed"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("discord api returned {status} for {path}: {body}");
        }
        let payload = response
            .json()
            .await
            .with_context(|| format!("failed to decode discord response for {path}"))?;
        Ok(Some(payload))
    }
}

#[async_trait]
impl MessengerClient for DiscordClient {
    async fn send_direct(
        &self,
        recipient: RecipientId,
        content: Option<&str>,
        embed: Option<&Embed>,
    ) -> Result<(), SendError> {
        let channel = self.dm_channel(recipient).await?;
        debug!(recipient = %recipient, channel = %channel, "sending direct message");

        let response = self
            .http
            .post(self.url(&format!("/channels/{channel}/messages")))
            .header("Authorization", self.authorization())
            .json(&CreateMessage {
                content,
                embeds: embed.map(std::slice::from_ref),
            })
            .send()
            .await
            .map_err(transport)?;
        ensure_sent(response).await.map(|_| ())
    }

    async fn list_members(&self, guild_id: u64) -> anyhow::Result<Vec<Recipient>> {
        let path = format!("/guilds/{guild_id}/members");
        let mut recipients = Vec::new();
        let mut after = 0u64;

        loop {
            let page: Vec<DiscordMember> = self
                .get_json(
                    &path,
                    &[
                        ("limit", MEMBERS_PAGE.to_string()),
                        ("after", after.to_string()),
                    ],
                )
                .await?
                .ok_or_else(|| anyhow::anyhow!("guild {guild_id} not found"))?;
            let page_len = page.len();

            for member in page {
                let id = member
                    .user
                    .id
                    .parse::<u64>()
                    .with_context(|| format!("invalid member id {}", member.user.id))?;
                after = after.max(id);
                let name = member
                    .nick
                    .or(member.user.global_name)
                    .unwrap_or(member.user.username);
                recipients.push(Recipient {
                    id: RecipientId(id),
                    name,
                    bot: member.user.bot,
                });
            }

            if page_len < MEMBERS_PAGE {
                break;
            }
        }

        debug!(guild_id, members = recipients.len(), "fetched guild members");
        Ok(recipients)
    }

    async fn fetch_message(
        &self,
        reference: &MessageReference,
    ) -> anyhow::Result<Option<SourceMessage>> {
        let path = format!(
            "/channels/{}/messages/{}",
            reference.channel_id, reference.message_id
        );
        let Some(message) = self.get_json::<DiscordMessage>(&path, &[]).await? else {
            return Ok(None);
        };

        Ok(Some(SourceMessage {
            content: Some(message.content).filter(|c| !c.is_empty()),
            embeds: message.embeds,
            reaction_emojis: message
                .reactions
                .into_iter()
                .filter_map(|reaction| reaction.emoji.into_custom())
                .collect(),
        }))
    }

    async fn list_emojis(&self, guild_id: u64) -> anyhow::Result<Vec<CustomEmoji>> {
        let emojis: Vec<DiscordEmoji> = self
            .get_json(&format!("/guilds/{guild_id}/emojis"), &[])
            .await?
            .ok_or_else(|| anyhow::anyhow!("guild {guild_id} not found"))?;
        Ok(emojis.into_iter().filter_map(DiscordEmoji::into_custom).collect())
    }
}

fn transport(err: reqwest::Error) -> SendError {
    SendError::Transport(err.to_string())
}

async fn ensure_sent(response: Response) -> Result<Response, SendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let retry_after_header = response
        .headers()
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<f64>().ok());
    let body = response.text().await.unwrap_or_default();
    Err(classify(status.as_u16(), retry_after_header, &body))
}

/// Maps a failed response onto the send failure taxonomy.
fn classify(status: u16, retry_after_header: Option<f64>, body: &str) -> SendError {
    let error: DiscordError = serde_json::from_str(body).unwrap_or_default();

    if status == StatusCode::TOO_MANY_REQUESTS.as_u16() {
        let secs = error
            .retry_after
            .or(retry_after_header)
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .unwrap_or(1.0);
        let retry_after = Duration::try_from_secs_f64(secs)
            .unwrap_or(MAX_RETRY_AFTER)
            .min(MAX_RETRY_AFTER);
        return SendError::RateLimited { retry_after };
    }
    if error.code == Some(CANNOT_MESSAGE_USER) || status == StatusCode::FORBIDDEN.as_u16() {
        return SendError::Forbidden;
    }
    if status == StatusCode::NOT_FOUND.as_u16() {
        return SendError::NotFound;
    }
    SendError::Http {
        status,
        code: error.code,
        message: error.message.unwrap_or_else(|| body.to_string()),
    }
}

#[derive(Debug, Serialize)]
struct CreateDm {
    recipient_id: String,
}

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    embeds: Option<&'a [Embed]>,
}

#[derive(Debug, Deserialize)]
struct DiscordChannel {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordError {
    code: Option<u64>,
    message: Option<String>,
    retry_after: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DiscordMember {
    user: DiscordUser,
    nick: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiscordUser {
    id: String,
    username: String,
    global_name: Option<String>,
    #[serde(default)]
    bot: bool,
}

#[derive(Debug, Deserialize)]
struct DiscordMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    embeds: Vec<Embed>,
    #[serde(default)]
    reactions: Vec<DiscordReaction>,
}

#[derive(Debug, Deserialize)]
struct DiscordReaction {
    emoji: DiscordEmoji,
}

#[derive(Debug, Deserialize)]
struct DiscordEmoji {
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    animated: bool,
}

impl DiscordEmoji {
    /// Unicode emojis carry no id and need no cataloguing.
    fn into_custom(self) -> Option<CustomEmoji> {
        Some(CustomEmoji {
            id: self.id?.parse().ok()?,
            name: self.name?,
            animated: self.animated,
        })
    }
}
