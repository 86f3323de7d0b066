//! DrawScheduler — runs the draw and the notifications on the draw date.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::config::ScheduleConfig;
use crate::error::StoreError;
use crate::store::EventStore;

use super::engine::{DrawEngine, DrawOutcome};
use super::notify::{DispatchReport, NotificationDispatcher};

/// What a scheduled check did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduledRun {
    /// The draw date has not arrived yet.
    NotDue,
    /// The draw for this date already ran.
    AlreadyCompleted,
    /// Fewer than two participants; retried at the next fire.
    InsufficientParticipants,
    /// Drew and dispatched.
    Completed(DispatchReport),
}

pub struct DrawScheduler {
    config: ScheduleConfig,
    store: Arc<EventStore>,
    draws: Arc<DrawEngine>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl DrawScheduler {
    pub fn new(
        config: ScheduleConfig,
        store: Arc<EventStore>,
        draws: Arc<DrawEngine>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            config,
            store,
            draws,
            dispatcher,
        }
    }

    pub fn draw_date(&self) -> NaiveDate {
        self.config.draw_date
    }

    /// The current calendar day in the schedule's offset.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.config.offset).date_naive()
    }

    /// When the cron schedule fires next.
    pub fn next_fire(&self) -> Option<DateTime<FixedOffset>> {
        self.config.schedule.upcoming(self.config.offset).next()
    }

    /// First fire strictly after `fire`, or after now if `fire` is already
    /// behind the clock.
    pub fn next_fire_after(&self, fire: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        let now = Utc::now().with_timezone(&self.config.offset);
        self.config.schedule.after(&fire.max(now)).next()
    }

    /// Whether a check on `today` would run the draw. Reads only.
    pub async fn is_due(&self, today: NaiveDate) -> bool {
        let date = self.config.draw_date;
        today >= date && self.store.read(|s| s.ledger.scheduled_for != Some(date)).await
    }

    /// Run the draw-and-notify sequence if `today` is on or after the draw
    /// date and it has not already completed for that date.
    pub async fn check(&self, today: NaiveDate) -> Result<ScheduledRun, StoreError> {
        let date = self.config.draw_date;
        if today < date {
            tracing::debug!(%today, draw_date = %date, "Scheduled draw not due");
            return Ok(ScheduledRun::NotDue);
        }

        match self.draws.draw_scheduled(date).await? {
            DrawOutcome::AlreadyCompleted { .. } => {
                tracing::debug!(draw_date = %date, "Scheduled draw already completed");
                Ok(ScheduledRun::AlreadyCompleted)
            }
            DrawOutcome::Insufficient { participants } => {
                tracing::warn!(
                    participants,
                    draw_date = %date,
                    "Scheduled draw skipped; will retry at the next fire"
                );
                Ok(ScheduledRun::InsufficientParticipants)
            }
            DrawOutcome::Drawn { participants, .. } => {
                tracing::info!(participants, draw_date = %date, "Scheduled draw ran; sending results");
                let report = self.dispatcher.dispatch_current().await?;
                Ok(ScheduledRun::Completed(report))
            }
        }
    }
}

/// Spawn the scheduler task: one catch-up check right away, then a check at
/// every cron fire.
pub fn spawn_draw_ticker(scheduler: Arc<DrawScheduler>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run_check(&scheduler).await;

        let mut upcoming = scheduler.next_fire();
        loop {
            let Some(next) = upcoming else {
                tracing::warn!("Draw schedule has no upcoming fire; scheduler stopping");
                return;
            };
            let wait = next
                .signed_duration_since(Utc::now())
                .to_std()
                .unwrap_or_default();
            tracing::debug!(next = %next, "Next scheduled draw check");
            tokio::time::sleep(wait).await;

            run_check(&scheduler).await;
            // Waking a little early must not select the same fire again.
            upcoming = scheduler.next_fire_after(next);
        }
    })
}

async fn run_check(scheduler: &DrawScheduler) {
    let today = scheduler.today();
    match scheduler.check(today).await {
        Ok(ScheduledRun::Completed(report)) => {
            tracing::info!(%report, "Scheduled draw completed");
        }
        Ok(_) => {}
        Err(e) => tracing::error!("Scheduled draw check failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::testing::RecordingChannel;
    use crate::config::{DEFAULT_DRAW_SCHEDULE, GiftRules};
    use crate::registration::model::sample_profile;
    use crate::store::{EventState, MemoryStore};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, d).unwrap()
    }

    async fn scheduler_with(ids: &[&str]) -> (DrawScheduler, Arc<RecordingChannel>, Arc<EventStore>) {
        let mut state = EventState::default();
        for id in ids {
            state.profiles.insert(id.to_string(), sample_profile(id));
        }
        let store = Arc::new(
            EventStore::open(Arc::new(MemoryStore::with_state(state)))
                .await
                .unwrap(),
        );
        let channel = Arc::new(RecordingChannel::new());
        let draws = Arc::new(DrawEngine::with_seed(store.clone(), 11));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            store.clone(),
            channel.clone(),
            GiftRules::default(),
        ));
        let config = ScheduleConfig::new(day(25), DEFAULT_DRAW_SCHEDULE, 3).unwrap();
        (
            DrawScheduler::new(config, store.clone(), draws, dispatcher),
            channel,
            store,
        )
    }

    #[tokio::test]
    async fn not_due_before_draw_date() {
        let (scheduler, channel, store) = scheduler_with(&["1", "2"]).await;
        assert!(!scheduler.is_due(day(24)).await);
        assert_eq!(scheduler.check(day(24)).await.unwrap(), ScheduledRun::NotDue);
        assert!(channel.direct_messages().is_empty());
        assert!(store.read(|s| s.assignments.is_empty()).await);
    }

    #[tokio::test]
    async fn draws_and_notifies_exactly_once() {
        let (scheduler, channel, store) = scheduler_with(&["1", "2", "3"]).await;
        assert!(scheduler.is_due(day(25)).await);

        let first = scheduler.check(day(25)).await.unwrap();
        let ScheduledRun::Completed(report) = first else {
            panic!("expected a completed run, got {first:?}");
        };
        assert_eq!(report.delivered, 3);
        let drawn = store.snapshot().await.assignments;

        assert!(!scheduler.is_due(day(26)).await);
        assert_eq!(
            scheduler.check(day(26)).await.unwrap(),
            ScheduledRun::AlreadyCompleted
        );
        assert_eq!(channel.direct_messages().len(), 3);
        assert_eq!(store.snapshot().await.assignments, drawn);
    }

    #[tokio::test]
    async fn insufficient_participants_retry_later() {
        let (scheduler, channel, store) = scheduler_with(&["1"]).await;

        assert_eq!(
            scheduler.check(day(25)).await.unwrap(),
            ScheduledRun::InsufficientParticipants
        );
        assert!(scheduler.is_due(day(25)).await);

        store
            .mutate(|s| {
                s.profiles.insert("2".into(), sample_profile("2"));
            })
            .await
            .unwrap();

        assert!(matches!(
            scheduler.check(day(26)).await.unwrap(),
            ScheduledRun::Completed(_)
        ));
        assert_eq!(channel.direct_messages().len(), 2);
    }

    #[tokio::test]
    async fn next_fire_after_skips_the_current_fire() {
        let (scheduler, _, _) = scheduler_with(&[]).await;
        let next = scheduler.next_fire().unwrap();
        let after = scheduler.next_fire_after(next).unwrap();
        assert!(after > next);

        let stale = next - chrono::Duration::days(30);
        let caught_up = scheduler.next_fire_after(stale).unwrap();
        assert!(caught_up > Utc::now());
    }

    #[test]
    fn next_fire_is_in_the_future() {
        let config = ScheduleConfig::new(day(25), DEFAULT_DRAW_SCHEDULE, 3).unwrap();
        let next = config.schedule.upcoming(config.offset).next().unwrap();
        assert!(next > Utc::now());
    }
}
