use std::time::Duration;

use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::bundler::{ConfirmationClient, LookupOutcome};
use crate::data::PendingItem;
use crate::guardian::FinalizationNotifier;
use crate::metrics::TrackerMetrics;
use crate::queue::WorkQueue;
use crate::rate_gate::RateGate;

// How far past its deadline a parked item wakes to be expired.
const EXPIRY_GRACE: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// How long an item may stay unresolved, measured from submission.
    pub max_wait: Duration,
    /// Minimum gap between two lookups of the same key.
    pub min_interval: Duration,
    /// How often stale rate gate entries are swept.
    pub prune_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            max_wait: Duration::from_secs(60),
            min_interval: Duration::from_secs(5),
            prune_interval: Duration::from_secs(30),
        }
    }
}

/// What the worker decided for one dequeued item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Older than `max_wait`; dropped.
    Expired,
    /// Polled too recently; parked until `ready_at` without a lookup.
    Throttled { ready_at: Instant },
    /// Mined; the guardian was told and the item is done.
    Resolved { transaction_hash: String },
    /// Lookup failed or the operation is not mined yet; parked until `ready_at`.
    Retry { ready_at: Instant },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Expired => "expired",
            Outcome::Throttled { .. } => "throttled",
            Outcome::Resolved { .. } => "resolved",
            Outcome::Retry { .. } => "retry",
        }
    }
}

/// Single consumer of the work queue. Handles one item at a time.
pub struct PollWorker<C, N> {
    queue: WorkQueue,
    gate: RateGate,
    client: C,
    notifier: N,
    config: PollConfig,
    metrics: TrackerMetrics,
}

impl<C, N> PollWorker<C, N>
where
    C: ConfirmationClient,
    N: FinalizationNotifier,
{
    pub fn new(
        queue: WorkQueue,
        gate: RateGate,
        client: C,
        notifier: N,
        config: PollConfig,
        metrics: TrackerMetrics,
    ) -> Self {
        PollWorker {
            queue,
            gate,
            client,
            notifier,
            config,
            metrics,
        }
    }

    /// Drains the queue until every producer is gone.
    pub async fn run(mut self) {
        let mut prune = interval(self.config.prune_interval);
        prune.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            max_wait_s = self.config.max_wait.as_secs(),
            min_interval_s = self.config.min_interval.as_secs(),
            "Poll worker started"
        );
        loop {
            tokio::select! {
                _ = prune.tick() => self.prune(),
                next = self.queue.next() => match next {
                    Some(item) => self.handle(item).await,
                    None => {
                        info!("Work queue closed, poll worker stopping");
                        return;
                    }
                },
            }
        }
    }

    async fn handle(&mut self, item: PendingItem) {
        let outcome = self.process(&item).await;
        self.metrics.record_outcome(outcome.label());
        match outcome {
            Outcome::Throttled { ready_at } | Outcome::Retry { ready_at } => {
                self.queue.requeue_at(item, ready_at)
            }
            Outcome::Expired | Outcome::Resolved { .. } => {}
        }
        self.metrics.queue_depth.set(self.queue.len() as i64);
    }

    /// Runs one step of the item state machine.
    ///
    /// Expiry is checked before the rate gate, so an expired item is dropped
    /// without a lookup whatever its last attempt was.
    #[instrument(skip_all, fields(operation_id = %item.operation_id, chain = %item.chain))]
    pub async fn process(&self, item: &PendingItem) -> Outcome {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(item.enqueued_at);
        debug!(elapsed_ms = elapsed.as_millis() as u64, "Checking user operation");
        if elapsed > self.config.max_wait {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                "User operation not mined in time, dropping"
            );
            return Outcome::Expired;
        }

        let key = item.key();
        if let Some(ready_at) = self.gate.ready_at(&key, self.config.min_interval) {
            if ready_at > now {
                debug!("Polled too recently, deferring");
                return Outcome::Throttled {
                    ready_at: self.park_until(item, ready_at),
                };
            }
        }

        info!("Looking up user operation");
        match self.client.lookup(&item.operation_id, &item.chain).await {
            LookupOutcome::Success { transaction_hash } => {
                info!(tx_hash = %transaction_hash, "User operation mined");
                if let Err(err) = self.notifier.notify(&transaction_hash, &item.chain).await {
                    self.metrics.notify_failures.inc();
                    error!(tx_hash = %transaction_hash, error = %err, "Error updating transaction");
                }
                self.gate.remove(&key);
                Outcome::Resolved { transaction_hash }
            }
            LookupOutcome::Error { code, message } => {
                warn!(?code, %message, "Bundler returned an error");
                self.record_lookup_failure("remote_error");
                self.retry(item)
            }
            LookupOutcome::Unavailable(err) if err.is_transient() => {
                warn!(error = %err, "Bundler lookup failed");
                self.record_lookup_failure("transient");
                self.retry(item)
            }
            // Still retried; expiry bounds how long a misconfigured chain is polled.
            LookupOutcome::Unavailable(err) => {
                error!(error = %err, "Bundler lookup cannot succeed as configured");
                self.record_lookup_failure("permanent");
                self.retry(item)
            }
        }
    }

    fn retry(&self, item: &PendingItem) -> Outcome {
        let attempted_at = Instant::now();
        self.gate.stamp(item.key(), attempted_at);
        Outcome::Retry {
            ready_at: self.park_until(item, attempted_at + self.config.min_interval),
        }
    }

    /// Caps a parked item's wake time at just past its expiry deadline, so
    /// expiry is noticed on time rather than at the next rate gate opening.
    fn park_until(&self, item: &PendingItem, ready_at: Instant) -> Instant {
        ready_at.min(item.enqueued_at + self.config.max_wait + EXPIRY_GRACE)
    }

    fn record_lookup_failure(&self, kind: &str) {
        self.metrics.lookup_failures.with_label_values(&[kind]).inc();
    }

    fn prune(&self) {
        let removed = self
            .gate
            .prune(Instant::now(), self.config.max_wait + self.config.min_interval);
        if removed > 0 {
            debug!(removed, "Pruned stale rate gate entries");
        }
        self.metrics.rate_gate_entries.set(self.gate.len() as i64);
    }
}
