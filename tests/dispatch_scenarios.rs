//! Dispatch runs driven end to end against the in-memory messenger, on a
//! paused clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dmblast::application::handlers::delivery_worker::{DeliveryWorker, WorkerConfig};
use dmblast::application::handlers::dispatch_pool::{DispatchPool, PoolConfig};
use dmblast::application::services::progress::{ProgressConfig, ProgressReporter, ProgressSink};
use dmblast::application::services::rate_governor::{GovernorConfig, RateGovernor};
use dmblast::domain::errors::SendError;
use dmblast::domain::models::{DispatchJob, ProgressSnapshot, Recipient, RunState};
use dmblast::infrastructure::messaging::in_memory::InMemoryMessenger;
use uuid::Uuid;

#[derive(Default)]
struct RecordingSink {
    snapshots: Mutex<Vec<ProgressSnapshot>>,
}

impl RecordingSink {
    fn snapshots(&self) -> Vec<ProgressSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn publish(&self, _run_id: Uuid, snapshot: &ProgressSnapshot) -> anyhow::Result<()> {
        self.snapshots.lock().unwrap().push(*snapshot);
        Ok(())
    }
}

struct Harness {
    messenger: Arc<InMemoryMessenger>,
    governor: Arc<RateGovernor>,
    pool: DispatchPool,
    sink: Arc<RecordingSink>,
}

impl Harness {
    fn new(messenger: InMemoryMessenger, governor: GovernorConfig, pool: PoolConfig) -> Self {
        let messenger = Arc::new(messenger);
        let governor = Arc::new(RateGovernor::new(governor));
        let worker = Arc::new(DeliveryWorker::new(
            messenger.clone(),
            governor.clone(),
            WorkerConfig::default(),
        ));
        Self {
            messenger,
            governor,
            pool: DispatchPool::new(worker, pool),
            sink: Arc::new(RecordingSink::default()),
        }
    }

    fn reporter(&self, job: &DispatchJob, total: usize) -> ProgressReporter {
        ProgressReporter::new(
            job.run_id,
            self.sink.clone(),
            ProgressConfig {
                every_items: 10,
                every_interval: Duration::from_secs(2),
            },
            total,
            self.pool.chunk_count(total),
        )
    }
}

fn members(count: u64) -> Vec<Recipient> {
    (1..=count)
        .map(|id| Recipient::new(id, format!("member-{id}")))
        .collect()
}

fn text_job() -> DispatchJob {
    DispatchJob::new(Some("Server event tonight!".to_string()), None).unwrap()
}

fn pool_config(chunk_size: usize, concurrency: usize) -> PoolConfig {
    PoolConfig {
        chunk_size,
        concurrency,
        ..PoolConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn every_member_is_reached_chunk_by_chunk() {
    let harness = Harness::new(
        InMemoryMessenger::new().with_latency(Duration::from_millis(20)),
        GovernorConfig::default(),
        pool_config(50, 5),
    );
    let recipients = members(250);
    let job = text_job();
    let mut reporter = harness.reporter(&job, recipients.len());

    let summary = harness
        .pool
        .run(&recipients, &job, 5, &mut reporter)
        .await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.success, 250);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.deferred, 0);
    assert_eq!(harness.messenger.total_calls(), 250);
    assert!(harness.messenger.max_in_flight() <= 5);
    assert_eq!(harness.governor.daily_count(), 250);
    assert_eq!(harness.governor.in_flight(), 0);

    let chunks: Vec<u64> = harness
        .messenger
        .records()
        .iter()
        .map(|record| (record.recipient.0 - 1) / 50)
        .collect();
    assert!(
        chunks.windows(2).all(|pair| pair[0] <= pair[1]),
        "a chunk started before the previous one resolved"
    );
}

#[tokio::test(start_paused = true)]
async fn closed_dms_count_as_failures_without_retry() {
    let messenger = InMemoryMessenger::new();
    messenger.script(7, vec![Err(SendError::Forbidden)]);
    messenger.script(
        12,
        vec![Err(SendError::Http {
            status: 500,
            code: None,
            message: "internal".to_string(),
        })],
    );
    let harness = Harness::new(messenger, GovernorConfig::default(), pool_config(10, 3));
    let recipients = members(20);
    let job = text_job();
    let mut reporter = harness.reporter(&job, recipients.len());

    let summary = harness
        .pool
        .run(&recipients, &job, 3, &mut reporter)
        .await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.success, 18);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.success + summary.failed, summary.attempted());
    assert_eq!(harness.messenger.calls_for(7), 1);
    assert_eq!(harness.messenger.calls_for(12), 1);
    assert_eq!(harness.governor.daily_count(), 18);
}

#[tokio::test(start_paused = true)]
async fn throttled_recipient_is_retried_once() {
    let messenger = InMemoryMessenger::new();
    messenger.script(
        4,
        vec![Err(SendError::RateLimited {
            retry_after: Duration::from_secs(2),
        })],
    );
    messenger.script(
        9,
        vec![
            Err(SendError::RateLimited {
                retry_after: Duration::from_secs(1),
            }),
            Err(SendError::RateLimited {
                retry_after: Duration::from_secs(1),
            }),
        ],
    );
    let harness = Harness::new(messenger, GovernorConfig::default(), pool_config(10, 4));
    let recipients = members(10);
    let job = text_job();
    let mut reporter = harness.reporter(&job, recipients.len());

    let summary = harness
        .pool
        .run(&recipients, &job, 4, &mut reporter)
        .await;

    assert_eq!(summary.success, 9);
    assert_eq!(summary.failed, 1);
    assert_eq!(harness.messenger.calls_for(4), 2);
    assert_eq!(harness.messenger.delivered_to(4), 1);
    assert_eq!(harness.messenger.calls_for(9), 2);
    assert_eq!(harness.messenger.delivered_to(9), 0);
}

#[tokio::test(start_paused = true)]
async fn run_pauses_once_the_daily_quota_is_spent() {
    let harness = Harness::new(
        InMemoryMessenger::new(),
        GovernorConfig {
            daily_cap: 30,
            ..GovernorConfig::default()
        },
        pool_config(10, 5),
    );
    let recipients = members(100);
    let job = text_job();
    let mut reporter = harness.reporter(&job, recipients.len());

    let summary = harness
        .pool
        .run(&recipients, &job, 5, &mut reporter)
        .await;

    assert_eq!(summary.state, RunState::PausedQuotaExceeded);
    assert_eq!(summary.success, 30);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.deferred, 70);
    assert_eq!(harness.governor.daily_count(), 30);
    assert_eq!(harness.messenger.total_calls(), 30);
    assert!(summary.attempted() <= summary.total);
}

#[tokio::test(start_paused = true)]
async fn quota_running_out_mid_chunk_never_overshoots() {
    let harness = Harness::new(
        InMemoryMessenger::new().with_latency(Duration::from_millis(100)),
        GovernorConfig {
            daily_cap: 23,
            ..GovernorConfig::default()
        },
        pool_config(10, 5),
    );
    let recipients = members(100);
    let job = text_job();
    let mut reporter = harness.reporter(&job, recipients.len());

    let summary = harness
        .pool
        .run(&recipients, &job, 5, &mut reporter)
        .await;

    assert_eq!(summary.state, RunState::PausedQuotaExceeded);
    assert_eq!(summary.success, 23);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.deferred, 77);
    assert_eq!(harness.governor.daily_count(), 23);
    assert_eq!(harness.governor.quota_status().reserved, 0);
    assert_eq!(harness.messenger.total_calls(), 23);
    assert!(harness.messenger.max_in_flight() <= 5);
}

#[tokio::test(start_paused = true)]
async fn throttled_embed_after_delivered_content_is_charged_once() {
    let cooldown = Duration::from_secs(5);
    let messenger = InMemoryMessenger::new();
    messenger.script(
        2,
        vec![
            Ok(()),
            Err(SendError::RateLimited {
                retry_after: Duration::from_secs(1),
            }),
        ],
    );
    let harness = Harness::new(
        messenger,
        GovernorConfig {
            daily_cap: 5,
            cooldown,
            ..GovernorConfig::default()
        },
        pool_config(5, 5),
    );
    let embed = serde_json::from_value(serde_json::json!({"title": "Patch notes"})).unwrap();
    let job = DispatchJob::new(Some("Read this".to_string()), Some(embed)).unwrap();
    let recipients = members(5);
    let mut reporter = harness.reporter(&job, recipients.len());

    let summary = harness
        .pool
        .run(&recipients, &job, 5, &mut reporter)
        .await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.success, 5);
    assert_eq!(summary.success + summary.failed, summary.attempted());
    assert_eq!(harness.governor.daily_count(), 5);
    assert_eq!(harness.messenger.calls_for(2), 3);
    assert_eq!(harness.messenger.delivered_to(2), 2);

    let sends_to_two: Vec<_> = harness
        .messenger
        .records()
        .into_iter()
        .filter(|record| record.recipient.0 == 2)
        .collect();
    let resumed = sends_to_two.last().unwrap();
    assert!(resumed.with_embed && resumed.delivered);
    assert!(resumed.at.duration_since(sends_to_two[0].at) >= cooldown);
}

#[tokio::test(start_paused = true)]
async fn repeated_recipient_waits_out_the_cooldown() {
    let cooldown = Duration::from_secs(5);
    let harness = Harness::new(
        InMemoryMessenger::new(),
        GovernorConfig {
            cooldown,
            ..GovernorConfig::default()
        },
        pool_config(10, 2),
    );
    let recipients = vec![Recipient::new(1, "twice"), Recipient::new(1, "twice")];
    let job = text_job();
    let mut reporter = harness.reporter(&job, recipients.len());

    let summary = harness
        .pool
        .run(&recipients, &job, 2, &mut reporter)
        .await;

    assert_eq!(summary.success, 2);
    let records = harness.messenger.records();
    assert_eq!(records.len(), 2);
    assert!(records[1].at.duration_since(records[0].at) >= cooldown);
}

#[tokio::test(start_paused = true)]
async fn content_and_embed_are_sent_as_separate_parts() {
    let harness = Harness::new(InMemoryMessenger::new(), GovernorConfig::default(), pool_config(10, 2));
    let embed = serde_json::from_value(serde_json::json!({"title": "Patch notes"})).unwrap();
    let job = DispatchJob::new(Some("Read this".to_string()), Some(embed)).unwrap();
    let recipients = members(3);
    let mut reporter = harness.reporter(&job, recipients.len());

    let summary = harness
        .pool
        .run(&recipients, &job, 2, &mut reporter)
        .await;

    assert_eq!(summary.success, 3);
    assert_eq!(harness.messenger.total_calls(), 6);
    let records = harness.messenger.records();
    assert_eq!(records.iter().filter(|r| r.with_content).count(), 3);
    assert_eq!(records.iter().filter(|r| r.with_embed).count(), 3);
    assert_eq!(harness.governor.daily_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn progress_only_moves_forward() {
    let messenger = InMemoryMessenger::new().with_latency(Duration::from_millis(50));
    messenger.script(33, vec![Err(SendError::NotFound)]);
    let harness = Harness::new(messenger, GovernorConfig::default(), pool_config(25, 4));
    let recipients = members(100);
    let job = text_job();
    let mut reporter = harness.reporter(&job, recipients.len());

    harness
        .pool
        .run(&recipients, &job, 4, &mut reporter)
        .await;

    let snapshots = harness.sink.snapshots();
    assert!(!snapshots.is_empty());
    for pair in snapshots.windows(2) {
        assert!(pair[0].processed <= pair[1].processed);
        assert!(pair[0].chunk <= pair[1].chunk);
    }
    let last = snapshots.last().unwrap();
    assert_eq!(last.processed, 100);
    assert_eq!(last.success, 99);
    assert_eq!(last.failed, 1);
    assert_eq!(last.chunk_count, 4);
}

#[tokio::test(start_paused = true)]
async fn empty_recipient_list_completes_immediately() {
    let harness = Harness::new(InMemoryMessenger::new(), GovernorConfig::default(), PoolConfig::default());
    let job = text_job();
    let mut reporter = harness.reporter(&job, 0);

    let summary = harness.pool.run(&[], &job, 10, &mut reporter).await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.total, 0);
    assert_eq!(summary.success, 0);
    assert_eq!(harness.messenger.total_calls(), 0);
}
