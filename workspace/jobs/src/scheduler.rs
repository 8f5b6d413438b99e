//! Time-driven trigger for the recurring-transaction run.
//!
//! `start_jobs` spawns the timer task and returns a [`SchedulerHandle`] that
//! owns it; there is no ambient global job registry. The handle's
//! `shutdown().await` is the explicit end of the lifecycle.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use sea_orm::DatabaseConnection;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::runner::process_recurring_transactions;

/// When a job fires. All wall-clock times are UTC, never user-local.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSchedule {
    /// Once a day at the given UTC wall-clock time.
    DailyAt { hour: u32, minute: u32 },
    /// On a fixed interval. Useful for tests and operational overrides.
    Every(StdDuration),
}

impl JobSchedule {
    /// The first fire time strictly after `after`. Deterministic.
    pub fn next_fire(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            JobSchedule::DailyAt { hour, minute } => {
                let time =
                    NaiveTime::from_hms_opt(*hour, *minute, 0).expect("validated at parse time");
                let today = after.date_naive().and_time(time).and_utc();
                if today > after {
                    today
                } else {
                    today + Duration::days(1)
                }
            }
            JobSchedule::Every(interval) => {
                after + Duration::from_std(*interval).expect("interval fits chrono's range")
            }
        }
    }
}

impl Default for JobSchedule {
    /// Shortly past midnight UTC, once the day's occurrences have elapsed.
    fn default() -> Self {
        JobSchedule::DailyAt { hour: 0, minute: 5 }
    }
}

/// Error parsing a schedule string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid schedule {input:?}; expected \"daily@HH:MM\" or \"every@<seconds>s\"")]
pub struct ScheduleParseError {
    input: String,
}

impl FromStr for JobSchedule {
    type Err = ScheduleParseError;

    /// Accepts `daily@HH:MM` (UTC) or `every@<seconds>s`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ScheduleParseError {
            input: s.to_string(),
        };

        if let Some(time) = s.strip_prefix("daily@") {
            let (hour, minute) = time.split_once(':').ok_or_else(err)?;
            let hour: u32 = hour.parse().map_err(|_| err())?;
            let minute: u32 = minute.parse().map_err(|_| err())?;
            if hour > 23 || minute > 59 {
                return Err(err());
            }
            return Ok(JobSchedule::DailyAt { hour, minute });
        }

        if let Some(interval) = s.strip_prefix("every@") {
            let seconds: u64 = interval
                .strip_suffix('s')
                .ok_or_else(err)?
                .parse()
                .map_err(|_| err())?;
            if seconds == 0 {
                return Err(err());
            }
            return Ok(JobSchedule::Every(StdDuration::from_secs(seconds)));
        }

        Err(err())
    }
}

impl fmt::Display for JobSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobSchedule::DailyAt { hour, minute } => write!(f, "daily@{hour:02}:{minute:02}"),
            JobSchedule::Every(interval) => write!(f, "every@{}s", interval.as_secs()),
        }
    }
}

/// Owns the spawned timer tasks. Dropping the handle without calling
/// [`SchedulerHandle::shutdown`] leaves the tasks running detached until the
/// runtime itself stops.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn job_count(&self) -> usize {
        self.tasks.len()
    }

    /// Signals every job loop to stop and waits for them to finish. A run
    /// that is already in flight completes before the task exits.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                error!("scheduled job panicked: {e}");
            }
        }
    }
}

/// Starts the background jobs and returns the handle owning them.
pub fn start_jobs(db: DatabaseConnection, schedule: JobSchedule) -> SchedulerHandle {
    let (shutdown, rx) = watch::channel(false);

    let task = spawn_job("recurring-transactions", schedule, rx, move || {
        let db = db.clone();
        async move {
            let summary = process_recurring_transactions(&db).await;
            if summary.success {
                info!(
                    processed = summary.processed_count,
                    failed = summary.failed_count,
                    "job recurring-transactions completed"
                );
            } else {
                error!(
                    error = summary.error.as_deref().unwrap_or("unknown"),
                    "job recurring-transactions failed"
                );
            }
        }
    });

    let handle = SchedulerHandle {
        shutdown,
        tasks: vec![task],
    };
    info!("{} scheduled job(s) running", handle.job_count());
    handle
}

fn spawn_job<F, Fut>(
    name: &'static str,
    schedule: JobSchedule,
    mut shutdown: watch::Receiver<bool>,
    job: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        info!("scheduling job {name} at {schedule}");
        let mut next = schedule.next_fire(Utc::now());

        loop {
            let wait = (next - Utc::now()).to_std().unwrap_or(StdDuration::ZERO);

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("job {name} stopped");
                        break;
                    }
                }
                _ = tokio::time::sleep(wait) => {
                    let fired_at = next;
                    // Runs are awaited inline, one at a time per job: the
                    // next fire is computed only after this run completes,
                    // so triggers that elapse mid-run are skipped rather
                    // than queued.
                    job().await;
                    let now = Utc::now();
                    next = schedule.next_fire(now);
                    if schedule.next_fire(fired_at) <= now {
                        warn!("job {name} overran its next trigger; skipping to {next}");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{insert_template, insert_user, setup_db, utc};
    use model::entities::transaction;
    use model::entities::transaction::RecurringInterval;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

    #[test]
    fn parses_daily_schedules() {
        let schedule: JobSchedule = "daily@00:05".parse().unwrap();
        assert_eq!(schedule, JobSchedule::DailyAt { hour: 0, minute: 5 });
        assert_eq!(schedule.to_string(), "daily@00:05");

        assert!("daily@24:00".parse::<JobSchedule>().is_err());
        assert!("daily@0005".parse::<JobSchedule>().is_err());
    }

    #[test]
    fn parses_interval_schedules() {
        let schedule: JobSchedule = "every@30s".parse().unwrap();
        assert_eq!(schedule, JobSchedule::Every(StdDuration::from_secs(30)));

        assert!("every@0s".parse::<JobSchedule>().is_err());
        assert!("every@30".parse::<JobSchedule>().is_err());
        assert!("hourly".parse::<JobSchedule>().is_err());
    }

    #[test]
    fn daily_next_fire_is_today_or_tomorrow() {
        let schedule = JobSchedule::DailyAt { hour: 0, minute: 5 };

        let before = utc(2024, 1, 1); // midnight, before 00:05
        let fire = schedule.next_fire(before);
        assert_eq!(fire, crate::testing::utc_hms(2024, 1, 1, 0, 5, 0));

        // At exactly 00:05 the next fire is tomorrow.
        let at = crate::testing::utc_hms(2024, 1, 1, 0, 5, 0);
        assert_eq!(
            schedule.next_fire(at),
            crate::testing::utc_hms(2024, 1, 2, 0, 5, 0)
        );
    }

    #[tokio::test]
    async fn runs_the_job_and_shuts_down_cleanly() {
        let db = setup_db().await;
        let user = insert_user(&db, "sched@example.com").await;
        insert_template(
            &db,
            user.id,
            "Rent",
            Some(RecurringInterval::Monthly),
            Some(utc(2024, 1, 1)),
        )
        .await;

        let handle = start_jobs(
            db.clone(),
            JobSchedule::Every(StdDuration::from_millis(20)),
        );
        assert_eq!(handle.job_count(), 1);

        tokio::time::sleep(StdDuration::from_millis(200)).await;
        handle.shutdown().await;

        // The template (due far in the past) was materialized at least once.
        let instances = transaction::Entity::find()
            .filter(transaction::Column::UserId.eq(user.id))
            .filter(transaction::Column::IsRecurring.eq(false))
            .all(&db)
            .await
            .unwrap();
        assert!(!instances.is_empty());
    }
}
