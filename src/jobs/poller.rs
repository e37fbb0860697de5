//! Fixed-interval job status poller
//!
//! A [`JobSubscription`] owns at most one background polling task. The task
//! fetches immediately, then one interval after each fetch completes, and
//! ends on the first terminal status. Every fetch result is published to a
//! [`tokio::sync::watch`] channel so consumers always see the latest
//! [`JobSnapshot`].
//!
//! Stopping is explicit: [`JobSubscription::cancel`], retargeting to another
//! id, and dropping the subscription all trip the task's
//! [`CancellationToken`]. A cancelled task issues no further fetches, and a
//! fetch in flight at cancellation time is abandoned without publishing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{JobId, JobStatus, JobStatusRecord, JobStatusSource};
use crate::config::JobsConfig;

/// What a subscription currently knows about its job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSnapshot {
    /// Job being observed; `None` when the subscription is disabled
    pub job_id: Option<JobId>,
    /// Last successfully fetched record
    pub record: Option<JobStatusRecord>,
    /// Error from the most recent fetch, cleared by the next success
    pub error: Option<String>,
    /// Fetches completed for the current job
    pub fetch_count: u64,
}

impl JobSnapshot {
    fn for_job(job_id: Option<JobId>) -> Self {
        Self {
            job_id,
            ..Default::default()
        }
    }

    pub fn status(&self) -> Option<&JobStatus> {
        self.record.as_ref().map(|r| &r.status)
    }

    pub fn is_terminal(&self) -> bool {
        self.record.as_ref().is_some_and(JobStatusRecord::is_terminal)
    }
}

/// How a polling task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The job reached completed or failed
    Terminal(JobStatus),
    /// The task was stopped before a terminal status was seen
    Cancelled,
    /// No job id was supplied, so nothing was polled
    Disabled,
}

/// Factory for job subscriptions sharing one status source and interval
#[derive(Clone)]
pub struct JobPoller {
    source: Arc<dyn JobStatusSource>,
    interval: Duration,
}

impl JobPoller {
    /// Default time between fetches
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(3000);

    /// Shortest interval a poller will use
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

    /// Create a poller fetching from `source` every `interval`
    ///
    /// # Arguments
    ///
    /// * `source` - Where job status rows are read from
    /// * `interval` - Time between the end of one fetch and the start of
    ///   the next; values below [`Self::MIN_INTERVAL`] are raised to it
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// use async_trait::async_trait;
    /// use reprolab::jobs::{JobId, JobPoller, JobStatusRecord, JobStatusSource};
    ///
    /// struct Done;
    ///
    /// #[async_trait]
    /// impl JobStatusSource for Done {
    ///     async fn fetch_status(&self, _: &JobId) -> reprolab::Result<JobStatusRecord> {
    ///         Ok(JobStatusRecord::new("completed"))
    ///     }
    /// }
    ///
    /// let poller = JobPoller::new(Arc::new(Done), Duration::ZERO);
    /// assert_eq!(poller.interval(), JobPoller::MIN_INTERVAL);
    /// ```
    pub fn new(source: Arc<dyn JobStatusSource>, interval: Duration) -> Self {
        if interval < Self::MIN_INTERVAL {
            tracing::warn!(
                "Job poll interval {:?} is too short, using {:?}",
                interval,
                Self::MIN_INTERVAL
            );
        }
        Self {
            source,
            interval: interval.max(Self::MIN_INTERVAL),
        }
    }

    /// Create a poller using `jobs.poll_interval_ms`
    pub fn from_config(source: Arc<dyn JobStatusSource>, config: &JobsConfig) -> Self {
        Self::new(source, Duration::from_millis(config.poll_interval_ms))
    }

    /// Time between fetches
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start observing `job_id`
    ///
    /// With `None` the subscription is disabled and performs no fetches
    /// until [`JobSubscription::retarget`] supplies an id. Must be called
    /// within a Tokio runtime when `job_id` is `Some`.
    pub fn subscribe(&self, job_id: Option<JobId>) -> JobSubscription {
        let (tx, rx) = watch::channel(JobSnapshot::default());
        let mut subscription = JobSubscription {
            poller: self.clone(),
            tx: Arc::new(tx),
            rx,
            generation: Arc::new(AtomicU64::new(0)),
            active: None,
            outcome: None,
            job_id: None,
        };
        subscription.retarget(job_id);
        subscription
    }
}

struct ActivePoll {
    token: CancellationToken,
    handle: JoinHandle<PollOutcome>,
}

/// Handle to a single job's status stream
///
/// Dropping the subscription stops its polling task.
pub struct JobSubscription {
    poller: JobPoller,
    tx: Arc<watch::Sender<JobSnapshot>>,
    rx: watch::Receiver<JobSnapshot>,
    generation: Arc<AtomicU64>,
    active: Option<ActivePoll>,
    outcome: Option<PollOutcome>,
    job_id: Option<JobId>,
}

impl JobSubscription {
    /// Job currently observed, `None` when disabled
    pub fn job_id(&self) -> Option<&JobId> {
        self.job_id.as_ref()
    }

    /// Latest snapshot
    pub fn snapshot(&self) -> JobSnapshot {
        self.rx.borrow().clone()
    }

    /// A receiver that observes every snapshot this subscription publishes,
    /// across retargets
    pub fn watch(&self) -> watch::Receiver<JobSnapshot> {
        self.rx.clone()
    }

    /// Wait for the next snapshot produced by a fetch
    ///
    /// The reset snapshot written on subscribe or retarget does not count.
    /// Never resolves once the task has stopped and nothing else publishes.
    pub async fn changed(&mut self) -> JobSnapshot {
        // The subscription owns the sender, so the channel cannot close here.
        let _ = self.rx.changed().await;
        self.rx.borrow_and_update().clone()
    }

    /// True while a polling task is running
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    /// Switch to another job, or disable with `None`
    ///
    /// Supplying the id already being observed is a no-op, so a job that
    /// reached a terminal status is not polled again. Any other change stops
    /// the current task and resets the snapshot.
    pub fn retarget(&mut self, job_id: Option<JobId>) {
        if job_id.is_some() && job_id == self.job_id {
            return;
        }

        self.stop();
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx.send_replace(JobSnapshot::for_job(job_id.clone()));
        self.rx.borrow_and_update();
        self.job_id = job_id.clone();

        let Some(job_id) = job_id else {
            tracing::debug!("Job status polling disabled");
            return;
        };

        tracing::debug!(
            "Polling job {} every {}ms",
            job_id,
            self.poller.interval.as_millis()
        );

        let token = CancellationToken::new();
        let task = PollTask {
            source: Arc::clone(&self.poller.source),
            interval: self.poller.interval,
            job_id,
            token: token.clone(),
            tx: Arc::clone(&self.tx),
            generation: Arc::clone(&self.generation),
            my_generation,
        };
        let handle = tokio::spawn(task.run());
        self.active = Some(ActivePoll { token, handle });
    }

    /// Stop polling; no fetch is issued afterwards
    ///
    /// The last snapshot stays readable.
    pub fn cancel(&mut self) {
        if let Some(active) = &self.active {
            active.token.cancel();
        }
    }

    /// Wait for the polling task to end
    ///
    /// Returns [`PollOutcome::Disabled`] when no task was started for the
    /// current id. Calling it again returns the same outcome.
    ///
    /// # Panics
    ///
    /// Resumes the panic if the polling task panicked, for example inside
    /// the status source.
    pub async fn finished(&mut self) -> PollOutcome {
        let Some(active) = self.active.as_mut() else {
            return self.outcome.clone().unwrap_or(PollOutcome::Disabled);
        };
        let outcome = match (&mut active.handle).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => {
                self.active = None;
                tracing::error!("Job polling task panicked");
                std::panic::resume_unwind(e.into_panic());
            }
            Err(e) => {
                tracing::warn!("Job polling task was aborted: {}", e);
                PollOutcome::Cancelled
            }
        };
        self.active = None;
        self.outcome = Some(outcome.clone());
        outcome
    }

    fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.token.cancel();
        }
        self.outcome = None;
    }
}

impl Drop for JobSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}

struct PollTask {
    source: Arc<dyn JobStatusSource>,
    interval: Duration,
    job_id: JobId,
    token: CancellationToken,
    tx: Arc<watch::Sender<JobSnapshot>>,
    generation: Arc<AtomicU64>,
    my_generation: u64,
}

impl PollTask {
    async fn run(self) -> PollOutcome {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => return PollOutcome::Cancelled,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                biased;
                _ = self.token.cancelled() => return PollOutcome::Cancelled,
                result = self.source.fetch_status(&self.job_id) => result,
            };

            let terminal = match result {
                Ok(record) => {
                    let terminal = record.is_terminal().then(|| record.status.clone());
                    self.publish(|snapshot| {
                        snapshot.record = Some(record);
                        snapshot.error = None;
                    });
                    terminal
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch status for job {}: {}", self.job_id, e);
                    let message = e.to_string();
                    self.publish(|snapshot| snapshot.error = Some(message));
                    None
                }
            };

            if let Some(status) = terminal {
                tracing::info!("Job {} reached terminal status {}", self.job_id, status);
                return PollOutcome::Terminal(status);
            }

            // Next fetch is one full interval after this one completed
            ticker.reset();
        }
    }

    /// Apply `update` unless this task has been superseded
    fn publish(&self, update: impl FnOnce(&mut JobSnapshot)) {
        self.tx.send_if_modified(|snapshot| {
            if self.token.is_cancelled()
                || self.generation.load(Ordering::SeqCst) != self.my_generation
            {
                return false;
            }
            update(snapshot);
            snapshot.fetch_count += 1;
            true
        });
    }
}
