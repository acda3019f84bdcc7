//! Hourly event reminder sweep.
//!
//! Each sweep loads active events starting within the widest reminder
//! window, derives the due [`ReminderBucket`] from the time remaining,
//! and mails every subscriber that has not received that bucket yet.
//! The `event_reminder_log` table is the dedup ledger: a send happens
//! only after this process claims the `(event, bucket, email)` row, so
//! overlapping sweeps and restarts never double-send. Failed sends
//! release their claim and are retried by a later sweep.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use marigold_core::ReminderBucket;

use crate::db;
use crate::db::RepositoryError;
use crate::services::email::EmailService;

/// Counters from one sweep run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Events inside the reminder horizon.
    pub events: usize,
    /// Reminders delivered.
    pub sent: usize,
    /// Sends that failed (claim released for retry).
    pub failed: usize,
}

/// Run one reminder sweep against the current clock.
///
/// # Errors
///
/// Returns `RepositoryError` if the event or ledger queries fail. Mail
/// failures do not abort the sweep; they are counted and retried later.
pub async fn run_sweep(pool: &PgPool, mailer: &EmailService) -> Result<SweepOutcome, RepositoryError> {
    #[allow(clippy::cast_possible_truncation)]
    const HORIZON_HOURS: i32 = ReminderBucket::OneWeek.upper_bound_hours() as i32;

    let now = Utc::now();
    let events = db::events::upcoming(pool, HORIZON_HOURS).await?;

    let mut outcome = SweepOutcome {
        events: events.len(),
        ..SweepOutcome::default()
    };

    for event in &events {
        let Some(bucket) = ReminderBucket::due(now, event.start_time) else {
            continue;
        };

        for email in db::events::reminder_recipients(pool, event.id).await? {
            if !db::events::claim_reminder(pool, event.id, bucket.label(), &email).await? {
                continue;
            }

            match mailer.send_event_reminder(&email, event, bucket.label()).await {
                Ok(()) => outcome.sent += 1,
                Err(e) => {
                    outcome.failed += 1;
                    tracing::warn!(
                        error = %e,
                        event_id = %event.id,
                        bucket = bucket.label(),
                        "failed to send event reminder"
                    );
                    if let Err(release_err) =
                        db::events::release_reminder(pool, event.id, bucket.label(), &email).await
                    {
                        tracing::error!(
                            error = %release_err,
                            event_id = %event.id,
                            bucket = bucket.label(),
                            "failed to release reminder claim after send failure"
                        );
                    }
                }
            }
        }
    }

    if outcome.sent > 0 || outcome.failed > 0 {
        tracing::info!(
            events = outcome.events,
            sent = outcome.sent,
            failed = outcome.failed,
            "reminder sweep finished"
        );
    }

    Ok(outcome)
}

/// Background task running [`run_sweep`] on a fixed cadence.
///
/// The first sweep fires immediately at startup, then every
/// `interval`. Missed ticks are skipped rather than bursted.
pub struct ReminderScheduler {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ReminderScheduler {
    /// Spawn the sweep loop.
    #[must_use]
    pub fn start(pool: PgPool, mailer: EmailService, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(interval_secs = interval.as_secs(), "reminder scheduler started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = run_sweep(&pool, &mailer).await {
                            tracing::error!(error = %e, "reminder sweep failed");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        break;
                    }
                }
            }

            tracing::info!("reminder scheduler stopped");
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stop the loop and wait for the in-flight sweep to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "reminder scheduler task aborted abnormally");
        }
    }
}
