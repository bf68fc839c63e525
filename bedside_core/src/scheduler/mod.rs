//! Wall-clock job scheduler.
//!
//! Jobs pair a [`Trigger`] with an action. The scheduler task checks which
//! jobs are due, spawns each due action as its own task and moves on, so a
//! slow or stuck action never holds up the others. Actions that need to
//! schedule follow-up work (for example a one-shot job that re-arms itself
//! with a freshly computed instant) do so through a [`SchedulerHandle`].

mod clock;
mod trigger;

use std::{
    fmt,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{Instrument, debug, info, warn};

pub use clock::{Clock, ManualClock, SystemClock};
pub use trigger::Trigger;

use crate::BoxError;

/// Longest the scheduler sleeps before looking at the clock again, so jumps
/// in wall-clock time are noticed.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid trigger: {0}")]
    InvalidTrigger(String),
    #[error("scheduler is no longer running")]
    Stopped,
}

pub type ActionFuture =
    Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send>>;

/// A job's action: called on every firing, each call producing a new
/// future.
pub type Action = Arc<dyn Fn() -> ActionFuture + Send + Sync>;

/// Wrap a closure returning a future into an [`Action`].
pub fn action<F, Fut>(f: F) -> Action
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Arc::new(move || -> ActionFuture { Box::pin(f()) })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Scheduled,
    Firing,
    Retired,
}

/// A snapshot of one job.
#[derive(Debug, Clone)]
pub struct JobInfo<Tz: TimeZone> {
    pub id: JobId,
    pub label: String,
    pub trigger: Trigger,
    pub next_due: DateTime<Tz>,
    pub state: JobState,
}

struct Job<Tz: TimeZone> {
    id: JobId,
    label: String,
    trigger: Trigger,
    next_due: DateTime<Tz>,
    state: JobState,
    action: Action,
}

impl<Tz: TimeZone> Job<Tz> {
    fn fire(&self) -> JoinHandle<()> {
        let action = Arc::clone(&self.action);
        let span = tracing::info_span!("job", job = %self.label, id = %self.id);

        tokio::spawn(
            async move {
                debug!("firing");
                if let Err(e) = action().await {
                    warn!(error = %e, "job failed");
                }
            }
            .instrument(span),
        )
    }
}

struct Registration {
    id: JobId,
    label: String,
    trigger: Trigger,
    action: Action,
}

/// Schedules jobs from outside the scheduler task.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    ids: Arc<AtomicU64>,
    tx: mpsc::UnboundedSender<Registration>,
}

impl SchedulerHandle {
    fn next_id(&self) -> JobId {
        JobId(self.ids.fetch_add(1, Ordering::Relaxed))
    }

    /// # Errors
    ///
    /// `SchedulerError::Stopped` if the scheduler has been dropped.
    pub fn schedule<F, Fut>(
        &self,
        label: impl Into<String>,
        trigger: Trigger,
        f: F,
    ) -> Result<JobId, SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let id = self.next_id();
        self.tx
            .send(Registration {
                id,
                label: label.into(),
                trigger,
                action: action(f),
            })
            .map_err(|_| SchedulerError::Stopped)?;
        Ok(id)
    }

    /// # Errors
    ///
    /// `SchedulerError::Stopped` if the scheduler has been dropped.
    pub fn once<F, Fut>(
        &self,
        label: impl Into<String>,
        at: DateTime<Utc>,
        f: F,
    ) -> Result<JobId, SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.schedule(label, Trigger::Once(at), f)
    }
}

pub struct Scheduler<C: Clock> {
    clock: C,
    jobs: Vec<Job<C::Tz>>,
    handle: SchedulerHandle,
    registrations: mpsc::UnboundedReceiver<Registration>,
    poll_interval: Duration,
}

impl<C: Clock> fmt::Debug for Scheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("jobs", &self.jobs.len())
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C) -> Self {
        let (tx, registrations) = mpsc::unbounded_channel();
        Self {
            clock,
            jobs: Vec::new(),
            handle: SchedulerHandle {
                ids: Arc::new(AtomicU64::new(1)),
                tx,
            },
            registrations,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn schedule<F, Fut>(
        &mut self,
        label: impl Into<String>,
        trigger: Trigger,
        f: F,
    ) -> JobId
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let id = self.handle.next_id();
        self.insert(Registration {
            id,
            label: label.into(),
            trigger,
            action: action(f),
        });
        id
    }

    pub fn once<F, Fut>(
        &mut self,
        label: impl Into<String>,
        at: DateTime<Utc>,
        f: F,
    ) -> JobId
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.schedule(label, Trigger::Once(at), f)
    }

    pub fn daily<F, Fut>(
        &mut self,
        label: impl Into<String>,
        at: NaiveTime,
        f: F,
    ) -> JobId
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.schedule(label, Trigger::Daily(at), f)
    }

    /// # Errors
    ///
    /// If the offset into the hour is out of range.
    pub fn hourly<F, Fut>(
        &mut self,
        label: impl Into<String>,
        minute: u32,
        second: u32,
        f: F,
    ) -> Result<JobId, SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let trigger = Trigger::hourly(minute, second)?;
        Ok(self.schedule(label, trigger, f))
    }

    /// # Errors
    ///
    /// If `period` is zero.
    pub fn interval<F, Fut>(
        &mut self,
        label: impl Into<String>,
        period: Duration,
        anchor: Option<NaiveTime>,
        f: F,
    ) -> Result<JobId, SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let trigger = Trigger::every(period, anchor)?;
        Ok(self.schedule(label, trigger, f))
    }

    /// Jobs that are still scheduled, soonest first.
    #[must_use]
    pub fn jobs(&self) -> Vec<JobInfo<C::Tz>> {
        let mut jobs: Vec<JobInfo<C::Tz>> = self
            .jobs
            .iter()
            .map(|job| JobInfo {
                id: job.id,
                label: job.label.clone(),
                trigger: job.trigger.clone(),
                next_due: job.next_due.clone(),
                state: job.state,
            })
            .collect();
        jobs.sort_by(|a, b| a.next_due.cmp(&b.next_due));
        jobs
    }

    #[must_use]
    pub fn next_wakeup(&self) -> Option<DateTime<C::Tz>> {
        self.jobs.iter().map(|job| job.next_due.clone()).min()
    }

    /// Take in jobs scheduled through handles, then fire every job that is
    /// due. Each firing runs as its own task; the handles are returned for
    /// callers that want to wait on them.
    pub fn tick(&mut self) -> Vec<JoinHandle<()>> {
        while let Ok(registration) = self.registrations.try_recv() {
            self.insert(registration);
        }

        let now = self.clock.now();
        let mut fired = Vec::new();

        for job in &mut self.jobs {
            if job.next_due > now {
                continue;
            }

            job.state = JobState::Firing;
            fired.push(job.fire());

            match job.trigger.next_due(&job.next_due, &now) {
                Some(next) => {
                    job.next_due = next;
                    job.state = JobState::Scheduled;
                }
                None if job.trigger.is_recurring() => {
                    warn!(
                        job = %job.label,
                        id = %job.id,
                        trigger = ?job.trigger,
                        "recurring job has no next occurrence, retiring it"
                    );
                    job.state = JobState::Retired;
                }
                None => {
                    debug!(job = %job.label, id = %job.id, "retiring job");
                    job.state = JobState::Retired;
                }
            }
        }

        self.jobs.retain(|job| job.state != JobState::Retired);
        fired
    }

    /// Fire jobs forever.
    pub async fn run(mut self) {
        info!(jobs = self.jobs.len(), "scheduler started");

        loop {
            self.tick();

            tokio::select! {
                () = tokio::time::sleep(self.idle_time()) => {}
                Some(registration) = self.registrations.recv() => {
                    self.insert(registration);
                }
            }
        }
    }

    fn idle_time(&self) -> Duration {
        let now = self.clock.now();
        self.next_wakeup()
            .map_or(self.poll_interval, |due| {
                (due - now)
                    .to_std()
                    .unwrap_or(Duration::ZERO)
                    .min(self.poll_interval)
            })
    }

    fn insert(&mut self, registration: Registration) {
        let now = self.clock.now();
        let Some(next_due) = registration.trigger.first_due(&now) else {
            warn!(job = %registration.label, "job would never fire, dropping it");
            return;
        };

        debug!(
            job = %registration.label,
            id = %registration.id,
            due = %next_due.to_rfc3339(),
            "job scheduled"
        );

        self.jobs.push(Job {
            id: registration.id,
            label: registration.label,
            trigger: registration.trigger,
            next_due,
            state: JobState::Scheduled,
            action: registration.action,
        });
    }
}
