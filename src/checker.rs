// src/checker.rs
// Trigger coordinator: startup, the scheduled tick, and /refresh all
// funnel into `run_check`. The slow page fetch runs outside the gate;
// the read-modify-write over seen state is serialized behind it.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tokio::sync::{Mutex, MutexGuard};

pub use crate::detect::RunKind;
use crate::detect::{detect, plan_run, RunPlan};
use crate::notify::{heartbeat_message, nothing_new_message, startup_message, Notifier};
use crate::source::NoticeSource;
use crate::state::SeenStore;
use crate::subscribers::SubscriberStore;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("check_runs_total", "Check invocations, any trigger.");
        describe_counter!("fetch_errors_total", "Page fetches that failed.");
        describe_counter!("notices_new_total", "Notices delivered as new.");
        describe_counter!("notices_extracted_total", "Notices parsed per pass.");
        describe_counter!("send_errors_total", "Per-recipient send failures.");
    });
}

/// Mutual-exclusion region around diff + notify + persist, with an
/// observable concurrency peak so tests can assert single-flight.
#[derive(Default)]
pub struct CheckGate {
    lock: Mutex<()>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

pub struct CheckPermit<'a> {
    gate: &'a CheckGate,
    _guard: MutexGuard<'a, ()>,
}

impl CheckGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self) -> CheckPermit<'_> {
        let guard = self.lock.lock().await;
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        CheckPermit {
            gate: self,
            _guard: guard,
        }
    }

    /// Highest number of holders observed at once. 1 means checks never
    /// overlapped.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Drop for CheckPermit<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Checker {
    source: Arc<dyn NoticeSource>,
    notifier: Notifier,
    seen: SeenStore,
    subscribers: Arc<SubscriberStore>,
    source_url: String,
    heartbeat_after: chrono::Duration,
    notify_every_run: bool,
    gate: CheckGate,
}

impl Checker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<dyn NoticeSource>,
        notifier: Notifier,
        seen: SeenStore,
        subscribers: Arc<SubscriberStore>,
        source_url: String,
        heartbeat_after: chrono::Duration,
        notify_every_run: bool,
    ) -> Self {
        ensure_metrics_described();
        Self {
            source,
            notifier,
            seen,
            subscribers,
            source_url,
            heartbeat_after,
            notify_every_run,
            gate: CheckGate::new(),
        }
    }

    pub fn gate(&self) -> &CheckGate {
        &self.gate
    }

    /// Single check pass. Never returns an error: every failure mode is
    /// logged here and the process keeps polling.
    pub async fn run_check(&self, kind: RunKind) {
        counter!("check_runs_total").increment(1);

        // Lock-free fetch; a concurrent trigger may fetch too, the gate
        // below makes the second diff see the first run's state.
        let notices = match self.source.fetch_latest().await {
            Ok(v) => v,
            Err(e) => {
                counter!("fetch_errors_total").increment(1);
                tracing::warn!(source = self.source.name(), ?kind, "fetch failed: {e:#}");
                return;
            }
        };

        let _permit = self.gate.acquire().await;

        let mut state = self.seen.load().await;
        let seen_set: HashSet<String> = state.seen.iter().cloned().collect();
        let batch = detect(&notices, &seen_set);
        let now = Utc::now();

        let plan = plan_run(
            kind,
            batch,
            state.last_event_ts,
            now,
            self.heartbeat_after,
            self.notify_every_run,
        );

        let subscribers = self.subscribers.load().await;
        match plan {
            RunPlan::Deliver(batch) => {
                counter!("notices_new_total").increment(batch.len() as u64);
                tracing::info!(new = batch.len(), total = notices.len(), ?kind, "new notices");
                self.notifier.notify_batch(&batch, &subscribers).await;
                state.last_event_ts = Some(now);
            }
            RunPlan::StartupNotice => {
                tracing::info!("started with nothing new");
                self.notifier
                    .broadcast(&subscribers, &startup_message(&self.source_url))
                    .await;
                state.last_event_ts = Some(now);
            }
            RunPlan::Heartbeat => {
                tracing::info!("heartbeat");
                self.notifier
                    .broadcast(&subscribers, heartbeat_message())
                    .await;
                state.last_event_ts = Some(now);
            }
            RunPlan::NothingNew => {
                self.notifier
                    .broadcast(&subscribers, nothing_new_message())
                    .await;
            }
            RunPlan::Silent => {
                tracing::debug!(total = notices.len(), ?kind, "nothing new");
            }
        }

        // Replace, don't merge: seen becomes exactly this pass's links.
        // An empty extraction never wipes it; an empty page read must
        // not mean "everything was removed".
        if !notices.is_empty() {
            state.seen = notices.into_iter().map(|n| n.link).collect();
        }
        self.seen.save(&state).await;
    }
}

/// Periodic trigger. Runs until the process is stopped.
pub fn spawn_scheduler(checker: Arc<Checker>, period: std::time::Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The startup check already ran; skip the interval's immediate
        // first tick.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            checker.run_check(RunKind::Scheduled).await;
        }
    })
}
