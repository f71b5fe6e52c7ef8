use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::Rng;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, OwnedSemaphorePermit, Semaphore};
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, info, warn};

use crate::domain::{models::DeliveryOutcome, value_objects::RecipientId};

#[derive(Debug, Clone)]
pub struct GovernorConfig {
    /// Deliveries allowed in flight at once across all runs.
    pub global_concurrency: usize,
    /// Minimum spacing between two sends to the same recipient.
    pub cooldown: Duration,
    pub daily_cap: u32,
    pub daily_window: Duration,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            global_concurrency: 50,
            cooldown: Duration::from_secs(5),
            daily_cap: 4900,
            daily_window: Duration::from_secs(24 * 60 * 60),
            jitter_min: Duration::from_millis(100),
            jitter_max: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    QuotaExceeded { resets_in: Duration },
    Closed,
}

pub enum Admission {
    Allow(AdmissionPermit),
    Deny(DenyReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub daily_count: u32,
    pub reserved: u32,
    pub daily_cap: u32,
    pub resets: u64,
}

#[derive(Debug)]
struct QuotaWindow {
    count: u32,
    reserved: u32,
    started: Instant,
    resets: u64,
}

impl QuotaWindow {
    /// Starts a fresh window once the current one has fully elapsed.
    fn roll(&mut self, now: Instant, window: Duration) -> bool {
        if now.saturating_duration_since(self.started) < window {
            return false;
        }
        self.count = 0;
        self.started = now;
        self.resets += 1;
        true
    }

    fn resets_in(&self, now: Instant, window: Duration) -> Duration {
        (self.started + window).saturating_duration_since(now)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

type LastSent = Arc<AsyncMutex<Option<Instant>>>;

/// Admission control shared by every delivery attempt of the process.
///
/// Holds the global in-flight budget, per-recipient cooldown stamps and the
/// rolling daily quota. Attempts for one recipient are serialised on that
/// recipient's lock, so the cooldown check and the stamp written by
/// [`RateGovernor::record_result`] cannot interleave with another attempt.
pub struct RateGovernor {
    config: GovernorConfig,
    slots: Arc<Semaphore>,
    quota: Arc<Mutex<QuotaWindow>>,
    recipients: Mutex<HashMap<RecipientId, LastSent>>,
    in_flight: Arc<AtomicUsize>,
}

impl RateGovernor {
    pub fn new(config: GovernorConfig) -> Self {
        let slots = Arc::new(Semaphore::new(config.global_concurrency.max(1)));
        Self {
            config,
            slots,
            quota: Arc::new(Mutex::new(QuotaWindow {
                count: 0,
                reserved: 0,
                started: Instant::now(),
                resets: 0,
            })),
            recipients: Mutex::new(HashMap::new()),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Waits for a global slot and the recipient's cooldown, then reserves
    /// one unit of daily quota.
    pub async fn admit(&self, recipient: RecipientId) -> Admission {
        if let Some(resets_in) = self.quota_exhausted() {
            return Admission::Deny(DenyReason::QuotaExceeded { resets_in });
        }
        self.acquire(recipient, true).await
    }

    /// Admission for the rest of a payload whose earlier parts already
    /// reached the recipient. The recipient's quota unit was charged by the
    /// first permit, so none is reserved and the cap is not consulted.
    pub async fn admit_continuation(&self, recipient: RecipientId) -> Admission {
        self.acquire(recipient, false).await
    }

    async fn acquire(&self, recipient: RecipientId, charge_quota: bool) -> Admission {
        let global = match self.slots.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return Admission::Deny(DenyReason::Closed),
        };

        let last_sent = self.last_sent_slot(recipient).lock_owned().await;
        if let Some(previous) = *last_sent {
            let ready_at = previous + self.config.cooldown;
            if ready_at > Instant::now() {
                debug!(
                    recipient = %recipient,
                    wait_ms = ready_at.saturating_duration_since(Instant::now()).as_millis() as u64,
                    "waiting for recipient cooldown"
                );
                sleep_until(ready_at).await;
            }
        }

        if charge_quota {
            let now = Instant::now();
            let mut quota = lock(&self.quota);
            if quota.roll(now, self.config.daily_window) {
                info!(resets = quota.resets, "daily quota window reset");
            }
            if quota.count + quota.reserved >= self.config.daily_cap {
                let resets_in = quota.resets_in(now, self.config.daily_window);
                warn!(
                    recipient = %recipient,
                    daily_count = quota.count,
                    resets_in_secs = resets_in.as_secs(),
                    "daily quota exhausted"
                );
                return Admission::Deny(DenyReason::QuotaExceeded { resets_in });
            }
            quota.reserved += 1;
        }

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Admission::Allow(AdmissionPermit {
            recipient,
            last_sent,
            quota: Arc::clone(&self.quota),
            in_flight: Arc::clone(&self.in_flight),
            delivered: false,
            reserved: charge_quota,
            _global: global,
        })
    }

    /// Settles a permit. A permit that delivered anything stamps the
    /// cooldown and consumes its quota unit; otherwise the unit is released.
    /// After a successful send the global slot stays occupied for a random
    /// jitter delay.
    pub async fn record_result(&self, mut permit: AdmissionPermit, outcome: &DeliveryOutcome) {
        if permit.delivered {
            *permit.last_sent = Some(Instant::now());
            permit.commit();
        }
        if outcome.is_sent() {
            let jitter = self.jitter();
            if !jitter.is_zero() {
                sleep(jitter).await;
            }
        }
        drop(permit);
    }

    /// Random delay drawn from the configured jitter range.
    pub fn jitter(&self) -> Duration {
        let min = self.config.jitter_min.as_millis() as u64;
        let max = self.config.jitter_max.as_millis() as u64;
        if max <= min {
            return self.config.jitter_min;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    /// Stops admitting; waiting and future callers are denied.
    pub fn close(&self) {
        self.slots.close();
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn quota_status(&self) -> QuotaStatus {
        let quota = lock(&self.quota);
        QuotaStatus {
            daily_count: quota.count,
            reserved: quota.reserved,
            daily_cap: self.config.daily_cap,
            resets: quota.resets,
        }
    }

    pub fn daily_count(&self) -> u32 {
        self.quota_status().daily_count
    }

    fn quota_exhausted(&self) -> Option<Duration> {
        let now = Instant::now();
        let mut quota = lock(&self.quota);
        if quota.roll(now, self.config.daily_window) {
            info!(resets = quota.resets, "daily quota window reset");
        }
        (quota.count >= self.config.daily_cap)
            .then(|| quota.resets_in(now, self.config.daily_window))
    }

    fn last_sent_slot(&self, recipient: RecipientId) -> LastSent {
        let mut recipients = lock(&self.recipients);
        Arc::clone(recipients.entry(recipient).or_default())
    }
}

/// Proof of admission for one attempt. Dropping it frees the global slot and
/// the recipient lock, and returns an unused quota reservation.
pub struct AdmissionPermit {
    recipient: RecipientId,
    last_sent: OwnedMutexGuard<Option<Instant>>,
    quota: Arc<Mutex<QuotaWindow>>,
    in_flight: Arc<AtomicUsize>,
    delivered: bool,
    reserved: bool,
    _global: OwnedSemaphorePermit,
}

impl AdmissionPermit {
    pub fn recipient(&self) -> RecipientId {
        self.recipient
    }

    /// Called once any part of the payload reached the endpoint.
    pub fn mark_delivered(&mut self) {
        self.delivered = true;
    }

    fn commit(&mut self) {
        if !self.reserved {
            return;
        }
        let mut quota = lock(&self.quota);
        quota.reserved = quota.reserved.saturating_sub(1);
        quota.count += 1;
        self.reserved = false;
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        if self.reserved {
            let mut quota = lock(&self.quota);
            quota.reserved = quota.reserved.saturating_sub(1);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
