//! NotificationDispatcher — tells every giver who they are buying for.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use crate::channels::{Channel, OutgoingResponse};
use crate::config::GiftRules;
use crate::error::StoreError;
use crate::registration::Profile;
use crate::store::EventStore;

use super::Assignments;

/// Per-batch delivery counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    /// Pairs whose giver or receiver no longer has a profile.
    pub skipped: usize,
    /// Givers whose message could not be delivered.
    pub failed: Vec<String>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed.len()
    }
}

impl std::fmt::Display for DispatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "delivered {}, failed {}, skipped {}",
            self.delivered,
            self.failed.len(),
            self.skipped
        )
    }
}

/// The private message a giver receives.
pub fn render_assignment(receiver: &Profile, rules: &GiftRules) -> String {
    format!(
        "🎄 Secret Santa draw results! 🎄\n\n\
         You are giving a gift to:\n\
         👤 {}\n\
         📚 Course: {}\n\
         👥 Group: {}\n\
         🎁 Wishes: {}\n\n\
         💰 Suggested gift budget: {}\n\
         📅 Hand over gifts by {}!\n\n\
         Happy holidays! 🎅",
        receiver.name, receiver.course, receiver.group, receiver.wishes, rules.budget, rules.deadline,
    )
}

/// Delivers assignment messages over a channel.
pub struct NotificationDispatcher {
    store: Arc<EventStore>,
    channel: Arc<dyn Channel>,
    rules: GiftRules,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<EventStore>, channel: Arc<dyn Channel>, rules: GiftRules) -> Self {
        Self {
            store,
            channel,
            rules,
        }
    }

    /// Send one message per pair. Each pair is tried once; a failed send is
    /// logged and does not stop the rest.
    pub async fn dispatch(
        &self,
        assignments: &Assignments,
        profiles: &BTreeMap<String, Profile>,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        for (giver, receiver) in assignments {
            let (Some(_), Some(receiver_profile)) = (profiles.get(giver), profiles.get(receiver))
            else {
                tracing::debug!(giver = %giver, receiver = %receiver, "Skipping pair with a deleted participant");
                report.skipped += 1;
                continue;
            };

            let message = OutgoingResponse::text(render_assignment(receiver_profile, &self.rules));
            match self.channel.send_direct(giver, message).await {
                Ok(()) => {
                    tracing::info!(giver = %giver, "Assignment delivered");
                    report.delivered += 1;
                }
                Err(e) => {
                    tracing::error!(giver = %giver, "Failed to deliver assignment: {}", e);
                    report.failed.push(giver.clone());
                }
            }
        }

        report
    }

    /// Dispatch the stored assignment set and record when it went out.
    pub async fn dispatch_current(&self) -> Result<DispatchReport, StoreError> {
        let (assignments, profiles) = self
            .store
            .read(|s| (s.assignments.clone(), s.profiles.clone()))
            .await;

        if assignments.is_empty() {
            tracing::warn!("No assignments to send; the draw has not run yet");
            return Ok(DispatchReport::default());
        }

        let report = self.dispatch(&assignments, &profiles).await;
        self.store
            .mutate(|s| s.ledger.notified_at = Some(Utc::now()))
            .await?;

        tracing::info!(attempted = report.attempted(), %report, "Assignment dispatch finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::testing::RecordingChannel;
    use crate::registration::model::sample_profile;
    use crate::store::{EventState, MemoryStore};

    fn pairs(list: &[(&str, &str)]) -> Assignments {
        list.iter()
            .map(|(g, r)| (g.to_string(), r.to_string()))
            .collect()
    }

    fn profiles(ids: &[(&str, &str)]) -> BTreeMap<String, Profile> {
        ids.iter()
            .map(|(id, name)| (id.to_string(), sample_profile(name)))
            .collect()
    }

    async fn dispatcher(channel: Arc<RecordingChannel>, state: EventState) -> NotificationDispatcher {
        let store = Arc::new(
            EventStore::open(Arc::new(MemoryStore::with_state(state)))
                .await
                .unwrap(),
        );
        NotificationDispatcher::new(store, channel, GiftRules::default())
    }

    #[tokio::test]
    async fn delivers_receiver_details_to_giver() {
        let channel = Arc::new(RecordingChannel::new());
        let d = dispatcher(channel.clone(), EventState::default()).await;
        let report = d
            .dispatch(
                &pairs(&[("101", "102"), ("102", "101")]),
                &profiles(&[("101", "Ann"), ("102", "Bo")]),
            )
            .await;

        assert_eq!(report.delivered, 2);
        let sent = channel.direct_messages();
        let to_ann = sent.iter().find(|(to, _)| to == "101").unwrap();
        assert!(to_ann.1.content.contains("👤 Bo"));
        assert!(to_ann.1.content.contains("Wishes: bikes"));
        assert!(to_ann.1.content.contains("500-1000 RUB"));
    }

    #[tokio::test]
    async fn deleted_receiver_is_skipped() {
        let channel = Arc::new(RecordingChannel::new());
        let d = dispatcher(channel.clone(), EventState::default()).await;
        let report = d
            .dispatch(&pairs(&[("101", "102")]), &profiles(&[("101", "Ann")]))
            .await;

        assert_eq!(report.delivered, 0);
        assert_eq!(report.skipped, 1);
        assert!(report.failed.is_empty());
        assert!(channel.direct_messages().is_empty());
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_batch() {
        let channel = Arc::new(RecordingChannel::failing_for(["102"]));
        let d = dispatcher(channel.clone(), EventState::default()).await;
        let report = d
            .dispatch(
                &pairs(&[("101", "102"), ("102", "103"), ("103", "101")]),
                &profiles(&[("101", "Ann"), ("102", "Bo"), ("103", "Cy")]),
            )
            .await;

        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, vec!["102".to_string()]);
        assert_eq!(report.attempted(), 3);
        assert_eq!(channel.direct_messages().len(), 2);
    }

    #[tokio::test]
    async fn dispatch_current_without_draw_is_noop() {
        let channel = Arc::new(RecordingChannel::new());
        let d = dispatcher(channel.clone(), EventState::default()).await;
        let report = d.dispatch_current().await.unwrap();
        assert_eq!(report, DispatchReport::default());
    }

    #[tokio::test]
    async fn dispatch_current_records_notification_time() {
        let mut state = EventState::default();
        state.profiles = profiles(&[("1", "Ann"), ("2", "Bo")]);
        state.assignments = pairs(&[("1", "2"), ("2", "1")]);
        let channel = Arc::new(RecordingChannel::new());
        let store = Arc::new(
            EventStore::open(Arc::new(MemoryStore::with_state(state)))
                .await
                .unwrap(),
        );
        let d = NotificationDispatcher::new(store.clone(), channel.clone(), GiftRules::default());

        let report = d.dispatch_current().await.unwrap();
        assert_eq!(report.delivered, 2);
        assert!(store.read(|s| s.ledger.notified_at.is_some()).await);
    }

    #[test]
    fn message_uses_configured_rules() {
        let rules = GiftRules {
            budget: "€20".into(),
            deadline: "Dec 20".into(),
        };
        let text = render_assignment(&sample_profile("Bo"), &rules);
        assert!(text.contains("€20"));
        assert!(text.contains("Dec 20"));
        assert!(text.contains("Group: G1"));
    }
}
