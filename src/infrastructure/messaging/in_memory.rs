use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::info;

use crate::{
    application::services::messenger::{CustomEmoji, MessengerClient, SourceMessage},
    domain::{
        errors::SendError,
        models::{Embed, Recipient},
        value_objects::{MessageReference, RecipientId},
    },
};

#[derive(Debug, Clone)]
pub struct SendRecord {
    pub recipient: RecipientId,
    pub at: Instant,
    pub delivered: bool,
    pub with_content: bool,
    pub with_embed: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Messenger that delivers nowhere. Backs dry runs and lets callers script
/// per-recipient failures and inspect every send call.
#[derive(Default)]
pub struct InMemoryMessenger {
    latency: Duration,
    members: Vec<Recipient>,
    messages: HashMap<(u64, u64), SourceMessage>,
    emojis: Vec<CustomEmoji>,
    scripts: Mutex<HashMap<RecipientId, VecDeque<Result<(), SendError>>>>,
    records: Mutex<Vec<SendRecord>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemoryMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_members(mut self, members: Vec<Recipient>) -> Self {
        self.members = members;
        self
    }

    pub fn with_message(mut self, channel_id: u64, message_id: u64, message: SourceMessage) -> Self {
        self.messages.insert((channel_id, message_id), message);
        self
    }

    pub fn with_emojis(mut self, emojis: Vec<CustomEmoji>) -> Self {
        self.emojis = emojis;
        self
    }

    /// Responses returned, in order, by the next send calls to `recipient`.
    /// Once exhausted every call succeeds.
    pub fn script(&self, recipient: u64, responses: Vec<Result<(), SendError>>) {
        lock(&self.scripts)
            .entry(RecipientId(recipient))
            .or_default()
            .extend(responses);
    }

    pub fn records(&self) -> Vec<SendRecord> {
        lock(&self.records).clone()
    }

    pub fn calls_for(&self, recipient: u64) -> usize {
        lock(&self.records)
            .iter()
            .filter(|r| r.recipient == RecipientId(recipient))
            .count()
    }

    pub fn delivered_to(&self, recipient: u64) -> usize {
        lock(&self.records)
            .iter()
            .filter(|r| r.recipient == RecipientId(recipient) && r.delivered)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessengerClient for InMemoryMessenger {
    async fn send_direct(
        &self,
        recipient: RecipientId,
        content: Option<&str>,
        embed: Option<&Embed>,
    ) -> Result<(), SendError> {
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let result = lock(&self.scripts)
            .get_mut(&recipient)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(()));

        lock(&self.records).push(SendRecord {
            recipient,
            at: Instant::now(),
            delivered: result.is_ok(),
            with_content: content.is_some(),
            with_embed: embed.is_some(),
        });
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if result.is_ok() {
            info!(recipient = %recipient, "[dry-run] direct message delivered");
        }
        result
    }

    async fn list_members(&self, _guild_id: u64) -> anyhow::Result<Vec<Recipient>> {
        Ok(self.members.clone())
    }

    async fn fetch_message(
        &self,
        reference: &MessageReference,
    ) -> anyhow::Result<Option<SourceMessage>> {
        Ok(self
            .messages
            .get(&(reference.channel_id, reference.message_id))
            .cloned())
    }

    async fn list_emojis(&self, _guild_id: u64) -> anyhow::Result<Vec<CustomEmoji>> {
        Ok(self.emojis.clone())
    }
}
