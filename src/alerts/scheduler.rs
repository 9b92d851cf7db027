//! Daily alert timers
//!
//! The scheduler owns one timer task per rule. Any change to the rule set
//! rebuilds the whole timer map from a fresh store snapshot. Each firing
//! runs in its own task, so a slow or failing check never delays other
//! rules and cancelling a timer never interrupts a check already underway.
//!
//! A rebuild can land after a rule's fire instant but before the old timer
//! woke up. The replacement timer then looks back to the rebuild start
//! (less a short grace) and fires the missed instant at once. The last fired
//! instant is carried from old timer to new, so an instant is never fired
//! twice.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::rule::{AlertRule, FireTime};
use super::runner::AlertRunner;
use crate::store::{RuleStore, StoreError};

/// How far before the rebuild start a replacement timer looks for an
/// instant its predecessor did not get to fire
const MISSED_FIRE_GRACE_SECS: i64 = 60;

type LastFire = Arc<parking_lot::Mutex<Option<DateTime<Utc>>>>;

/// Active timer bound to one rule snapshot
struct ScheduledTimer {
    rule_id: String,
    fire_time: FireTime,
    /// Written by the timer task just before each check is spawned
    last_fire: LastFire,
    handle: JoinHandle<()>,
}

/// What a cancelled timer hands to its successor
#[derive(Debug, Clone, Copy)]
struct Retired {
    fire_time: FireTime,
    last_fire: Option<DateTime<Utc>>,
}

/// Public view of an active timer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerInfo {
    pub rule_id: String,
    pub fire_time: String,
    pub next_fire: DateTime<Utc>,
}

/// Counts from a completed rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RebuildSummary {
    /// Timers active after the rebuild
    pub scheduled: usize,
    /// Rules left out because they failed validation
    pub skipped: usize,
    /// Timers torn down from the previous schedule
    pub cancelled: usize,
}

/// Owns the live set of per-rule timers
pub struct AlertScheduler {
    store: Arc<dyn RuleStore>,
    runner: Arc<AlertRunner>,
    timezone: Tz,
    /// Rule ID -> timer. Holding the lock also serializes rebuilds.
    timers: Mutex<HashMap<String, ScheduledTimer>>,
}

impl AlertScheduler {
    pub fn new(store: Arc<dyn RuleStore>, runner: Arc<AlertRunner>, timezone: Tz) -> Self {
        Self {
            store,
            runner,
            timezone,
            timers: Mutex::new(HashMap::new()),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Notify the scheduler that rules were inserted, updated or deleted
    pub async fn on_rule_set_changed(&self) {
        self.rebuild().await;
    }

    /// Rebuild all timers, logging instead of returning any failure
    pub async fn rebuild(&self) {
        if let Err(e) = self.try_rebuild().await {
            tracing::error!(error = %e, "Rule store unavailable, keeping previous schedule");
        }
    }

    /// Replace every timer with one per valid rule from a fresh snapshot.
    ///
    /// The snapshot is taken before anything is cancelled, so a store error
    /// leaves the previous schedule running. Old timer tasks are awaited
    /// after being aborted, which guarantees none of them fires once this
    /// returns.
    pub async fn try_rebuild(&self) -> Result<RebuildSummary, StoreError> {
        let started = Utc::now();
        let mut timers = self.timers.lock().await;

        let rules = self.store.list_all_rules().await?;

        let retired = cancel_all(&mut timers).await;
        let mut summary = RebuildSummary {
            cancelled: retired.len(),
            ..RebuildSummary::default()
        };

        for rule in rules {
            let fire_time = match rule.validate() {
                Ok(fire_time) => fire_time,
                Err(e) => {
                    tracing::warn!(
                        rule_id = %rule.id,
                        error = %e,
                        "Skipping misconfigured alert rule"
                    );
                    summary.skipped += 1;
                    continue;
                }
            };

            let rule_id = rule.id.clone();
            let previous = retired.get(&rule_id);
            let first_after = first_arm_after(fire_time, previous, started, Utc::now());
            let last_fire: LastFire = Arc::new(parking_lot::Mutex::new(
                previous.and_then(|p| p.last_fire),
            ));

            let timer = ScheduledTimer {
                rule_id: rule_id.clone(),
                fire_time,
                last_fire: Arc::clone(&last_fire),
                handle: self.spawn_timer(rule, fire_time, first_after, last_fire),
            };

            if let Some(replaced) = timers.insert(rule_id.clone(), timer) {
                tracing::warn!(rule_id = %rule_id, "Duplicate rule ID, replacing earlier timer");
                replaced.handle.abort();
                let _ = replaced.handle.await;
            }
        }

        summary.scheduled = timers.len();
        tracing::info!(
            scheduled = summary.scheduled,
            skipped = summary.skipped,
            cancelled = summary.cancelled,
            timezone = %self.timezone,
            "Alert schedule rebuilt"
        );

        Ok(summary)
    }

    /// Cancel every timer
    pub async fn shutdown(&self) {
        let mut timers = self.timers.lock().await;
        let cancelled = cancel_all(&mut timers).await.len();
        tracing::info!(cancelled, "Alert scheduler stopped");
    }

    /// Active timers with their next fire instant, ordered by rule ID
    pub async fn active_timers(&self) -> Vec<TimerInfo> {
        let timers = self.timers.lock().await;
        let now = Utc::now();

        let mut infos: Vec<TimerInfo> = timers
            .values()
            .map(|t| TimerInfo {
                rule_id: t.rule_id.clone(),
                fire_time: t.fire_time.to_string(),
                next_fire: next_fire_after(t.fire_time, self.timezone, now),
            })
            .collect();
        infos.sort_by(|a, b| a.rule_id.cmp(&b.rule_id));
        infos
    }

    fn spawn_timer(
        &self,
        rule: AlertRule,
        fire_time: FireTime,
        first_after: DateTime<Utc>,
        last_fire: LastFire,
    ) -> JoinHandle<()> {
        let runner = Arc::clone(&self.runner);
        let timezone = self.timezone;
        let rule = Arc::new(rule);

        tokio::spawn(async move {
            let mut after = first_after;

            loop {
                let next = next_fire_after(fire_time, timezone, after);
                let delay = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);

                tracing::debug!(rule_id = %rule.id, next_fire = %next, "Alert timer armed");
                tokio::time::sleep(delay).await;

                // No await between recording and spawning, so an abort
                // cannot separate the two
                *last_fire.lock() = Some(next);
                let runner = Arc::clone(&runner);
                let check_rule = Arc::clone(&rule);
                tokio::spawn(async move {
                    runner.run_check(&check_rule).await;
                });

                // Never re-arm for an instant that already fired
                after = next.max(Utc::now());
            }
        })
    }
}

/// Abort and drain all timers, returning what each left behind
async fn cancel_all(timers: &mut HashMap<String, ScheduledTimer>) -> HashMap<String, Retired> {
    let mut handles = Vec::with_capacity(timers.len());
    let mut states = Vec::with_capacity(timers.len());
    for (rule_id, timer) in timers.drain() {
        timer.handle.abort();
        handles.push(timer.handle);
        states.push((rule_id, timer.fire_time, timer.last_fire));
    }

    futures::future::join_all(handles).await;

    states
        .into_iter()
        .map(|(rule_id, fire_time, last_fire)| {
            let last_fire = *last_fire.lock();
            (rule_id, Retired { fire_time, last_fire })
        })
        .collect()
}

/// Instant a new timer arms strictly after.
///
/// A rule keeping its fire time looks back to `started` less the grace, but
/// never to or before the instant its old timer last fired. Anything else arms
/// from `now`.
fn first_arm_after(
    fire_time: FireTime,
    previous: Option<&Retired>,
    started: DateTime<Utc>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    match previous.filter(|p| p.fire_time == fire_time) {
        Some(previous) => {
            let floor = started - chrono::Duration::seconds(MISSED_FIRE_GRACE_SECS);
            previous
                .last_fire
                .map_or(floor, |last| last.max(floor))
        }
        None => now,
    }
}

/// First instant strictly after `after` at which the local wall clock in
/// `timezone` reads `fire_time`.
///
/// A fire time inside a DST gap is moved forward by one hour; one inside a
/// DST overlap fires at the earlier of the two instants. A single daily
/// wall-clock time needs no cron expression, and resolving it against the
/// zone here keeps those two DST rules explicit.
pub fn next_fire_after(fire_time: FireTime, timezone: Tz, after: DateTime<Utc>) -> DateTime<Utc> {
    let today = after.with_timezone(&timezone).date_naive();

    for offset in 0..=2 {
        let candidate = today
            .checked_add_days(Days::new(offset))
            .and_then(|date| date.and_hms_opt(fire_time.hour(), fire_time.minute(), 0))
            .and_then(|naive| resolve_local(timezone, naive));

        if let Some(candidate) = candidate {
            if candidate > after {
                return candidate;
            }
        }
    }

    after + chrono::Duration::days(1)
}

fn resolve_local(timezone: Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    match timezone.from_local_datetime(&naive) {
        LocalResult::Single(t) => Some(t.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => timezone
            .from_local_datetime(&(naive + chrono::Duration::hours(1)))
            .earliest()
            .map(|t| t.with_timezone(&Utc)),
    }
}
