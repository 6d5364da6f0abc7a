// crates/grc-server/src/scheduler.rs
// ============================================================================
// Module: Scheduler
// Description: Periodic review scans and compliance digests.
// Purpose: Run the four background jobs on fixed UTC schedules.
// Dependencies: grc-core, tokio, tracing, time
// ============================================================================

//! ## Overview
//! Each job runs on its own task: compute the next fire time, sleep, run to
//! completion on a blocking thread, repeat. A job therefore never overlaps
//! itself. [`run_job`] is the single entry point for both the timer loop and
//! one-shot runs from the command line.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use grc_core::ControlScanHit;
use grc_core::GrcResult;
use grc_core::dates::days_past_due;
use time::Duration;
use time::OffsetDateTime;
use time::Time;
use time::UtcOffset;
use time::Weekday;
use tokio::task::JoinHandle;
use tracing::info;
use tracing::warn;

use crate::email::Recipient;
use crate::notify::DASHBOARD_LINK;
use crate::notify::control_link;
use crate::notify::daily_summary_message;
use crate::notify::due_message;
use crate::notify::overdue_message;
use crate::service::GrcService;

// ============================================================================
// SECTION: Jobs
// ============================================================================

/// Background job identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Notify owners of controls whose review is due.
    DueCheck,
    /// Alert owners of controls past the grace period.
    OverdueCheck,
    /// Summary notification and digest email for admins.
    DailyDigest,
    /// Weekly digest email for admins.
    WeeklyDigest,
}

impl JobKind {
    /// All jobs in schedule order.
    pub const ALL: [Self; 4] = [Self::DueCheck, Self::OverdueCheck, Self::DailyDigest, Self::WeeklyDigest];

    /// Returns the command-line name of the job.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DueCheck => "due-check",
            Self::OverdueCheck => "overdue-check",
            Self::DailyDigest => "daily-digest",
            Self::WeeklyDigest => "weekly-digest",
        }
    }

    /// Parses a command-line job name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// Returns the fixed schedule of the job.
    #[must_use]
    pub const fn schedule(self) -> JobSchedule {
        match self {
            Self::DueCheck => JobSchedule::Hourly {
                minute: 0,
            },
            Self::OverdueCheck => JobSchedule::Hourly {
                minute: 30,
            },
            Self::DailyDigest => JobSchedule::Daily {
                hour: 9,
                minute: 0,
            },
            Self::WeeklyDigest => JobSchedule::Weekly {
                weekday: Weekday::Monday,
                hour: 9,
                minute: 0,
            },
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Schedules
// ============================================================================

/// Recurring UTC fire times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSchedule {
    /// Every hour at `minute`.
    Hourly {
        /// Minute past the hour.
        minute: u8,
    },
    /// Every day at `hour:minute`.
    Daily {
        /// Hour of day.
        hour: u8,
        /// Minute past the hour.
        minute: u8,
    },
    /// Every week on `weekday` at `hour:minute`.
    Weekly {
        /// Day of the week.
        weekday: Weekday,
        /// Hour of day.
        hour: u8,
        /// Minute past the hour.
        minute: u8,
    },
}

impl JobSchedule {
    /// Returns the first fire time strictly after `now`, in UTC.
    #[must_use]
    pub fn next_after(self, now: OffsetDateTime) -> OffsetDateTime {
        let now = now.to_offset(UtcOffset::UTC);
        let midnight = now.replace_time(Time::MIDNIGHT);
        let (candidate, period) = match self {
            Self::Hourly {
                minute,
            } => (
                midnight + Duration::hours(i64::from(now.hour())) + Duration::minutes(i64::from(minute)),
                Duration::HOUR,
            ),
            Self::Daily {
                hour,
                minute,
            } => (midnight + clock(hour, minute), Duration::DAY),
            Self::Weekly {
                weekday,
                hour,
                minute,
            } => {
                let days_ahead = (i64::from(weekday.number_days_from_monday())
                    - i64::from(now.weekday().number_days_from_monday()))
                .rem_euclid(7);
                (midnight + Duration::days(days_ahead) + clock(hour, minute), Duration::WEEK)
            }
        };
        if candidate > now { candidate } else { candidate + period }
    }
}

/// Offset from midnight for a wall-clock time.
fn clock(hour: u8, minute: u8) -> Duration {
    Duration::hours(i64::from(hour)) + Duration::minutes(i64::from(minute))
}

// ============================================================================
// SECTION: Job Bodies
// ============================================================================

/// Outcome of one job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobReport {
    /// Controls or admins the job acted on.
    pub targets: u64,
    /// Notifications written.
    pub notifications: u64,
    /// Emails handed to the dispatcher.
    pub emails: u64,
}

/// Runs one job at `now`.
///
/// # Errors
///
/// Returns [`grc_core::GrcError`] when the underlying scan or statistics
/// query fails. Individual notification and email failures are logged only.
pub fn run_job(service: &GrcService, kind: JobKind, now: OffsetDateTime) -> GrcResult<JobReport> {
    let report = match kind {
        JobKind::DueCheck => due_check(service, now)?,
        JobKind::OverdueCheck => overdue_check(service, now)?,
        JobKind::DailyDigest => daily_digest(service, now)?,
        JobKind::WeeklyDigest => weekly_digest(service, now)?,
    };
    info!(
        job = kind.as_str(),
        targets = report.targets,
        notifications = report.notifications,
        emails = report.emails,
        "scheduled job finished"
    );
    Ok(report)
}

/// Due reminders for every control whose review date has arrived.
fn due_check(service: &GrcService, now: OffsetDateTime) -> GrcResult<JobReport> {
    let today = now.date();
    let hits = service.store().scan_due_controls(today)?;
    let mut report = JobReport::default();
    for hit in &hits {
        report.targets += 1;
        let message = due_message(&hit.control_library_id);
        if service.notifier().notify(&hit.owner_id, message, control_link(&hit.activated_control_id), now) {
            report.notifications += 1;
        }
        if let Some(recipient) = owner_recipient(hit) {
            let email = service.email().due_reminder(
                recipient,
                &hit.control_name,
                hit.next_review_due_date,
                &hit.activated_control_id,
                now,
            );
            service.email().send(email);
            report.emails += 1;
        }
    }
    Ok(report)
}

/// Urgent alerts for every control past the grace period.
fn overdue_check(service: &GrcService, now: OffsetDateTime) -> GrcResult<JobReport> {
    let today = now.date();
    let hits = service.store().scan_overdue_controls(today)?;
    let mut report = JobReport::default();
    for hit in &hits {
        report.targets += 1;
        let message = overdue_message(&hit.control_library_id);
        if service.notifier().notify(&hit.owner_id, message, control_link(&hit.activated_control_id), now) {
            report.notifications += 1;
        }
        if let Some(recipient) = owner_recipient(hit) {
            let email = service.email().overdue_alert(
                recipient,
                &hit.control_name,
                days_past_due(hit.next_review_due_date, today),
                &hit.activated_control_id,
                now,
            );
            service.email().send(email);
            report.emails += 1;
        }
    }
    Ok(report)
}

/// Dashboard summary for every administrator.
fn daily_digest(service: &GrcService, now: OffsetDateTime) -> GrcResult<JobReport> {
    let summary = service.store().dashboard_summary(now.date())?;
    let admins = service.store().list_admins()?;
    let message = daily_summary_message(&summary);
    let mut report = JobReport::default();
    for admin in &admins {
        report.targets += 1;
        if service.notifier().notify(&admin.id, message.clone(), DASHBOARD_LINK, now) {
            report.notifications += 1;
        }
        let recipient = Recipient {
            email: &admin.email,
            name: &admin.name,
        };
        service.email().send(service.email().daily_digest(recipient, &summary, now));
        report.emails += 1;
    }
    Ok(report)
}

/// Seven-day activity report for every administrator.
fn weekly_digest(service: &GrcService, now: OffsetDateTime) -> GrcResult<JobReport> {
    let stats = service.store().weekly_stats(now)?;
    let admins = service.store().list_admins()?;
    let mut report = JobReport::default();
    for admin in &admins {
        report.targets += 1;
        let recipient = Recipient {
            email: &admin.email,
            name: &admin.name,
        };
        service.email().send(service.email().weekly_digest(recipient, &stats, now));
        report.emails += 1;
    }
    Ok(report)
}

/// Email addressee for a scan hit, when the owner has an address.
fn owner_recipient(hit: &ControlScanHit) -> Option<Recipient<'_>> {
    hit.owner_email.as_deref().filter(|email| !email.trim().is_empty()).map(|email| Recipient {
        email,
        name: &hit.owner_name,
    })
}

// ============================================================================
// SECTION: Timer Loop
// ============================================================================

/// Owner of the background job tasks.
pub struct Scheduler {
    /// Service the jobs act on.
    service: Arc<GrcService>,
    /// Jobs to run.
    jobs: Vec<JobKind>,
}

impl Scheduler {
    /// Creates a scheduler running every job.
    #[must_use]
    pub fn new(service: Arc<GrcService>) -> Self {
        Self {
            service,
            jobs: JobKind::ALL.to_vec(),
        }
    }

    /// Spawns one task per job onto the current runtime.
    #[must_use]
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        self.jobs
            .into_iter()
            .map(|kind| {
                let service = Arc::clone(&self.service);
                info!(job = kind.as_str(), "scheduled job registered");
                tokio::spawn(job_loop(service, kind))
            })
            .collect()
    }
}

/// Sleeps until each fire time and runs the job.
async fn job_loop(service: Arc<GrcService>, kind: JobKind) {
    loop {
        let now = OffsetDateTime::now_utc();
        let next = kind.schedule().next_after(now);
        let wait = std::time::Duration::try_from(next - now).unwrap_or_default();
        tokio::time::sleep(wait).await;
        let job_service = Arc::clone(&service);
        let outcome =
            tokio::task::spawn_blocking(move || run_job(&job_service, kind, OffsetDateTime::now_utc()))
                .await;
        match outcome {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => warn!(job = kind.as_str(), error = %err, "scheduled job failed"),
            Err(err) => warn!(job = kind.as_str(), error = %err, "scheduled job panicked"),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn job_names_round_trip() {
        for kind in JobKind::ALL {
            assert_eq!(JobKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(JobKind::parse("hourly"), None);
    }

    #[test]
    fn due_check_fires_on_the_hour() {
        let schedule = JobKind::DueCheck.schedule();
        assert_eq!(schedule.next_after(datetime!(2026-03-02 10:15:30 UTC)), datetime!(2026-03-02 11:00 UTC));
        assert_eq!(schedule.next_after(datetime!(2026-03-02 10:00 UTC)), datetime!(2026-03-02 11:00 UTC));
        assert_eq!(schedule.next_after(datetime!(2026-03-02 23:59 UTC)), datetime!(2026-03-03 00:00 UTC));
    }

    #[test]
    fn overdue_check_fires_at_half_past() {
        let schedule = JobKind::OverdueCheck.schedule();
        assert_eq!(schedule.next_after(datetime!(2026-03-02 10:15 UTC)), datetime!(2026-03-02 10:30 UTC));
        assert_eq!(schedule.next_after(datetime!(2026-03-02 10:30 UTC)), datetime!(2026-03-02 11:30 UTC));
    }

    #[test]
    fn daily_digest_fires_at_nine() {
        let schedule = JobKind::DailyDigest.schedule();
        assert_eq!(schedule.next_after(datetime!(2026-03-02 08:59 UTC)), datetime!(2026-03-02 09:00 UTC));
        assert_eq!(schedule.next_after(datetime!(2026-03-02 09:00 UTC)), datetime!(2026-03-03 09:00 UTC));
    }

    #[test]
    fn weekly_digest_fires_monday_morning() {
        let schedule = JobKind::WeeklyDigest.schedule();
        // 2026-03-02 is a Monday.
        assert_eq!(schedule.next_after(datetime!(2026-03-02 08:00 UTC)), datetime!(2026-03-02 09:00 UTC));
        assert_eq!(schedule.next_after(datetime!(2026-03-02 09:00 UTC)), datetime!(2026-03-09 09:00 UTC));
        assert_eq!(schedule.next_after(datetime!(2026-03-05 12:00 UTC)), datetime!(2026-03-09 09:00 UTC));
    }

    #[test]
    fn schedules_normalize_to_utc() {
        let schedule = JobKind::DailyDigest.schedule();
        let local = datetime!(2026-03-02 10:30 +02:00);
        assert_eq!(schedule.next_after(local), datetime!(2026-03-02 09:00 UTC));
        let later = datetime!(2026-03-02 12:30 +02:00);
        assert_eq!(schedule.next_after(later), datetime!(2026-03-03 09:00 UTC));
    }
}
