//! The persisted event document.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::draw::Assignments;
use crate::registration::{Profile, Session};

/// Bookkeeping for draws, used to keep the scheduled draw to one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawLedger {
    /// Number of successful draws so far.
    pub epoch: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawn_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notified_at: Option<DateTime<Utc>>,
    /// Draw date whose scheduled draw has already run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<NaiveDate>,
}

/// Everything the bot persists, written as one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventState {
    /// Participant identity → profile.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
    /// Giver identity → receiver identity.
    #[serde(default)]
    pub assignments: Assignments,
    /// In-flight conversations. Idle participants have no entry.
    #[serde(default)]
    pub sessions: BTreeMap<String, Session>,
    #[serde(default)]
    pub ledger: DrawLedger,
}

impl EventState {
    pub fn is_registered(&self, identity: &str) -> bool {
        self.profiles.contains_key(identity)
    }

    /// Drop a participant's profile, session and every assignment touching
    /// them. A giver who was assigned to them is left without a receiver.
    /// Returns `false` when they had no profile.
    pub fn remove_participant(&mut self, identity: &str) -> bool {
        if self.profiles.remove(identity).is_none() {
            return false;
        }
        self.sessions.remove(identity);
        self.assignments.remove(identity);
        self.assignments.retain(|_, receiver| receiver != identity);
        true
    }

    /// Wipe participants, assignments and sessions. The ledger is kept.
    pub fn clear_participants(&mut self) {
        self.profiles.clear();
        self.assignments.clear();
        self.sessions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::model::sample_profile;
    use crate::registration::{Session, Stage};

    fn state_with(ids: &[&str]) -> EventState {
        let mut state = EventState::default();
        for id in ids {
            state.profiles.insert(id.to_string(), sample_profile(id));
        }
        state
    }

    #[test]
    fn remove_participant_prunes_both_directions() {
        let mut state = state_with(&["1", "2", "3", "4"]);
        state.assignments = [("1", "2"), ("2", "3"), ("3", "4"), ("4", "1")]
            .into_iter()
            .map(|(g, r)| (g.to_string(), r.to_string()))
            .collect();

        assert!(state.remove_participant("2"));

        assert!(!state.profiles.contains_key("2"));
        assert!(!state.assignments.contains_key("2"));
        assert!(!state.assignments.contains_key("1"), "giver of 2 is left unassigned");
        assert_eq!(state.assignments.get("3").map(String::as_str), Some("4"));
        assert_eq!(state.assignments.get("4").map(String::as_str), Some("1"));
        assert_eq!(state.assignments.len(), 2);
    }

    #[test]
    fn remove_unknown_participant_is_noop() {
        let mut state = state_with(&["1"]);
        state.assignments.insert("1".into(), "9".into());
        let before = state.clone();
        assert!(!state.remove_participant("9"));
        assert_eq!(state, before);
    }

    #[test]
    fn remove_participant_drops_session() {
        let mut state = state_with(&["1"]);
        state.sessions.insert("1".into(), Session::at(Stage::Edit(crate::registration::EditableField::Name)));
        state.remove_participant("1");
        assert!(state.sessions.is_empty());
    }

    #[test]
    fn clear_keeps_ledger() {
        let mut state = state_with(&["1", "2"]);
        state.assignments.insert("1".into(), "2".into());
        state.sessions.insert("3".into(), Session::at(Stage::Name));
        state.ledger.epoch = 4;
        state.clear_participants();
        assert!(state.profiles.is_empty());
        assert!(state.assignments.is_empty());
        assert!(state.sessions.is_empty());
        assert_eq!(state.ledger.epoch, 4);
    }

    #[test]
    fn missing_sections_default() {
        let state: EventState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, EventState::default());
    }
}
