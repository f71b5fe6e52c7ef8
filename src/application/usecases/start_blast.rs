use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    application::{
        handlers::dispatch_pool::DispatchPool,
        services::{
            authorization::OperatorPolicy,
            confirmation::{ConfirmationDecision, ConfirmationGate, PendingDecision},
            emoji::EmojiCatalog,
            messenger::MessengerClient,
            progress::{ProgressConfig, ProgressReporter},
            status_board::{RunStatus, RunStatusBoard},
        },
    },
    domain::{
        errors::DispatchError,
        models::{
            DispatchJob, Embed, EmbedField, EmbedFooter, EmbedImage, Recipient, RunLogEntry,
            RunSummary, parse_color,
        },
        repositories::RunLogRepository,
        value_objects::MessageReference,
    },
};

pub struct ComposeEmbedRequest {
    pub title: String,
    pub description: String,
    pub color: String,
    pub footer: String,
    pub field1_name: String,
    pub field1_value: String,
    pub field2_name: Option<String>,
    pub field2_value: Option<String>,
    pub image_url: Option<String>,
}

pub enum BlastPayload {
    Compose(ComposeEmbedRequest),
    CopyMessage {
        link_or_id: String,
        channel_id: Option<String>,
    },
}

pub struct StartBlastRequest {
    pub caller_id: String,
    pub payload: BlastPayload,
}

pub struct StartBlastResponse {
    pub run_id: Uuid,
    pub recipients: usize,
    pub prompt: String,
    pub handle: JoinHandle<RunSummary>,
}

/// Executes an authorized run once its confirmation resolves.
#[derive(Clone)]
pub struct BlastRunner {
    pool: Arc<DispatchPool>,
    board: Arc<RunStatusBoard>,
    run_log: Arc<dyn RunLogRepository>,
    progress: ProgressConfig,
}

impl BlastRunner {
    pub fn new(
        pool: Arc<DispatchPool>,
        board: Arc<RunStatusBoard>,
        run_log: Arc<dyn RunLogRepository>,
        progress: ProgressConfig,
    ) -> Self {
        Self {
            pool,
            board,
            run_log,
            progress,
        }
    }

    pub async fn run(
        &self,
        decision: PendingDecision,
        job: DispatchJob,
        recipients: Vec<Recipient>,
        operator: String,
    ) -> RunSummary {
        if decision.wait().await == ConfirmationDecision::Declined {
            let summary = RunSummary::cancelled(job.run_id, recipients.len());
            info!(run_id = %job.run_id, "DM blast cancelled");
            self.board
                .set_status(job.run_id, RunStatus::Finished(summary.clone()))
                .await;
            return summary;
        }

        self.board
            .set_status(job.run_id, RunStatus::Running { progress: None })
            .await;

        let mut reporter = ProgressReporter::new(
            job.run_id,
            self.board.clone(),
            self.progress.clone(),
            recipients.len(),
            self.pool.chunk_count(recipients.len()),
        );
        let concurrency = self.pool.config().concurrency;
        let summary = self
            .pool
            .run(&recipients, &job, concurrency, &mut reporter)
            .await;

        self.board
            .set_status(job.run_id, RunStatus::Finished(summary.clone()))
            .await;

        let entry = RunLogEntry::from_summary(&operator, &summary);
        if let Err(err) = self.run_log.append(&entry).await {
            error!(run_id = %job.run_id, error = ?err, "failed to append run log");
        }
        summary
    }
}

pub struct StartBlastUseCase {
    client: Arc<dyn MessengerClient>,
    gate: Arc<dyn ConfirmationGate>,
    emojis: Arc<EmojiCatalog>,
    policy: OperatorPolicy,
    runner: BlastRunner,
    guild_id: u64,
}

impl StartBlastUseCase {
    pub fn new(
        client: Arc<dyn MessengerClient>,
        gate: Arc<dyn ConfirmationGate>,
        emojis: Arc<EmojiCatalog>,
        policy: OperatorPolicy,
        runner: BlastRunner,
        guild_id: u64,
    ) -> Self {
        Self {
            client,
            gate,
            emojis,
            policy,
            runner,
            guild_id,
        }
    }

    /// Validates the invocation and opens the confirmation prompt. The run
    /// itself starts in the background once the operator confirms.
    pub async fn execute(
        &self,
        request: StartBlastRequest,
    ) -> Result<StartBlastResponse, DispatchError> {
        self.policy.authorize(&request.caller_id)?;

        let job = self.build_job(request.payload).await?;
        let recipients = self.resolve_recipients().await?;
        let prompt = format!(
            "Are you sure you want to send this DM blast to **{}** members?",
            recipients.len()
        );

        let run_id = job.run_id;
        let total = recipients.len();
        self.runner
            .board
            .open(run_id, &request.caller_id, total, prompt.clone())
            .await;
        let decision = self.gate.open(run_id, prompt.clone());

        let runner = self.runner.clone();
        let operator = request.caller_id;
        let handle = tokio::spawn(async move { runner.run(decision, job, recipients, operator).await });

        info!(run_id = %run_id, recipients = total, "DM blast awaiting confirmation");
        Ok(StartBlastResponse {
            run_id,
            recipients: total,
            prompt,
            handle,
        })
    }

    async fn build_job(&self, payload: BlastPayload) -> Result<DispatchJob, DispatchError> {
        match payload {
            BlastPayload::Compose(request) => {
                DispatchJob::new(None, Some(self.compose_embed(request)))
            }
            BlastPayload::CopyMessage {
                link_or_id,
                channel_id,
            } => {
                let reference = MessageReference::parse(&link_or_id, channel_id.as_deref())?;
                self.copy_message(&reference).await
            }
        }
    }

    fn compose_embed(&self, request: ComposeEmbedRequest) -> Embed {
        let clean = |text: &str| self.emojis.sanitize(text);

        let mut fields = vec![EmbedField {
            name: clean(&request.field1_name),
            value: clean(&request.field1_value),
            inline: false,
        }];
        if let (Some(name), Some(value)) = (&request.field2_name, &request.field2_value) {
            fields.push(EmbedField {
                name: clean(name),
                value: clean(value),
                inline: false,
            });
        }

        Embed {
            title: Some(clean(&request.title)),
            description: Some(clean(&request.description)),
            color: Some(parse_color(&request.color)),
            footer: Some(EmbedFooter {
                text: clean(&request.footer),
                icon_url: None,
            }),
            fields,
            image: request.image_url.map(|url| EmbedImage { url }),
            ..Embed::default()
        }
    }

    async fn copy_message(&self, reference: &MessageReference) -> Result<DispatchJob, DispatchError> {
        let message = self
            .client
            .fetch_message(reference)
            .await
            .map_err(|err| DispatchError::Endpoint(format!("{err:#}")))?
            .ok_or_else(|| {
                DispatchError::NotFound(
                    "Message not found. Please check the ID/link and try again.".to_string(),
                )
            })?;

        if let Some(content) = &message.content {
            self.emojis.add_from_text(content);
        }
        let embed = message.embeds.into_iter().next();
        if let Some(embed) = &embed {
            for text in embed.texts() {
                self.emojis.add_from_text(text);
            }
        }
        for emoji in &message.reaction_emojis {
            self.emojis.add(emoji);
        }

        DispatchJob::new(message.content, embed)
    }

    async fn resolve_recipients(&self) -> Result<Vec<Recipient>, DispatchError> {
        let members = self
            .client
            .list_members(self.guild_id)
            .await
            .map_err(|err| DispatchError::Endpoint(format!("{err:#}")))?;
        Ok(members.into_iter().filter(Recipient::is_reachable).collect())
    }
}
