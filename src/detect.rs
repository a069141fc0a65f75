// src/detect.rs
// Novelty detection and the per-run messaging policy.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::extract::Notice;

/// What started this check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// Once at process init; gets the startup messaging policy.
    Startup,
    /// Periodic timer tick.
    Scheduled,
    /// Inbound /refresh command. Same routine as Scheduled, no
    /// startup messaging.
    Manual,
}

/// Outcome of a run, decided before any message goes out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPlan {
    /// New notices to fan out, extraction order. Stamps last_event_ts.
    Deliver(Vec<Notice>),
    /// First-ever run found nothing: say so once instead of silence.
    /// Stamps last_event_ts.
    StartupNotice,
    /// Nothing new for at least the heartbeat interval: one "still
    /// alive" message. Stamps last_event_ts so an idle hour produces
    /// one heartbeat, not one per tick.
    Heartbeat,
    /// Verbose mode only: flat "nothing new" every empty run.
    NothingNew,
    Silent,
}

/// Items whose link is not in the seen set, order preserved. Equality
/// is exact string match; trailing slashes or query strings are not
/// normalized (inherited behavior, kept on purpose).
pub fn detect(fresh: &[Notice], seen: &HashSet<String>) -> Vec<Notice> {
    fresh
        .iter()
        .filter(|n| !seen.contains(&n.link))
        .cloned()
        .collect()
}

pub fn plan_run(
    kind: RunKind,
    batch: Vec<Notice>,
    last_event_ts: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    heartbeat_after: chrono::Duration,
    notify_every_run: bool,
) -> RunPlan {
    if !batch.is_empty() {
        return RunPlan::Deliver(batch);
    }
    if notify_every_run {
        return RunPlan::NothingNew;
    }
    match last_event_ts {
        // No event ever recorded: only the startup run breaks the
        // silence, a manual refresh before that stays quiet (it gets
        // its own command acknowledgment).
        None => {
            if kind == RunKind::Startup {
                RunPlan::StartupNotice
            } else {
                RunPlan::Silent
            }
        }
        Some(ts) if now.signed_duration_since(ts) >= heartbeat_after => RunPlan::Heartbeat,
        Some(_) => RunPlan::Silent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn notice(link: &str) -> Notice {
        Notice {
            title: format!("Avviso {link}"),
            link: link.to_string(),
            date: String::new(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn detect_keeps_only_unseen_in_order() {
        let fresh = vec![notice("https://x/3"), notice("https://x/2"), notice("https://x/1")];
        let seen: HashSet<String> = ["https://x/2".to_string()].into_iter().collect();
        let batch = detect(&fresh, &seen);
        assert_eq!(
            batch.iter().map(|n| n.link.as_str()).collect::<Vec<_>>(),
            vec!["https://x/3", "https://x/1"]
        );
    }

    #[test]
    fn detect_with_empty_seen_returns_everything() {
        let fresh = vec![notice("https://x/1")];
        assert_eq!(detect(&fresh, &HashSet::new()), fresh);
    }

    #[test]
    fn link_match_is_exact_no_normalization() {
        let fresh = vec![notice("https://x/1/")];
        let seen: HashSet<String> = ["https://x/1".to_string()].into_iter().collect();
        assert_eq!(detect(&fresh, &seen).len(), 1);
    }

    #[test]
    fn nonempty_batch_always_delivers() {
        let plan = plan_run(
            RunKind::Scheduled,
            vec![notice("https://x/1")],
            None,
            t0(),
            chrono::Duration::hours(1),
            false,
        );
        assert!(matches!(plan, RunPlan::Deliver(b) if b.len() == 1));
    }

    #[test]
    fn startup_with_nothing_new_sends_startup_notice() {
        let plan = plan_run(
            RunKind::Startup,
            vec![],
            None,
            t0(),
            chrono::Duration::hours(1),
            false,
        );
        assert_eq!(plan, RunPlan::StartupNotice);
    }

    #[test]
    fn manual_run_skips_startup_policy() {
        let plan = plan_run(
            RunKind::Manual,
            vec![],
            None,
            t0(),
            chrono::Duration::hours(1),
            false,
        );
        assert_eq!(plan, RunPlan::Silent);
    }

    #[test]
    fn quiet_run_inside_heartbeat_window_is_silent() {
        let plan = plan_run(
            RunKind::Scheduled,
            vec![],
            Some(t0()),
            t0() + chrono::Duration::minutes(30),
            chrono::Duration::hours(1),
            false,
        );
        assert_eq!(plan, RunPlan::Silent);
    }

    #[test]
    fn quiet_run_past_heartbeat_window_sends_heartbeat() {
        let plan = plan_run(
            RunKind::Scheduled,
            vec![],
            Some(t0()),
            t0() + chrono::Duration::hours(1),
            chrono::Duration::hours(1),
            false,
        );
        assert_eq!(plan, RunPlan::Heartbeat);
    }

    #[test]
    fn verbose_mode_reports_every_empty_run() {
        let plan = plan_run(
            RunKind::Scheduled,
            vec![],
            Some(t0()),
            t0() + chrono::Duration::minutes(5),
            chrono::Duration::hours(1),
            true,
        );
        assert_eq!(plan, RunPlan::NothingNew);
    }
}
