//! Conversation state machine — tracks which stage each participant is in.

use serde::{Deserialize, Serialize};

use super::model::EditableField;

/// Where a participant is in the conversation.
///
/// Registration progresses linearly: Idle → Name → Course → Group → Wishes →
/// Idle. Editing is a single hop: Idle → Edit(field) → Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    Name,
    Course,
    Group,
    Wishes,
    Edit(EditableField),
}

impl Stage {
    /// Next stage of the registration path. `Wishes` wraps back to `Idle`.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Self::Name => Some(Self::Course),
            Self::Course => Some(Self::Group),
            Self::Group => Some(Self::Wishes),
            Self::Wishes => Some(Self::Idle),
            Self::Idle | Self::Edit(_) => None,
        }
    }

    pub fn is_registering(&self) -> bool {
        matches!(self, Self::Name | Self::Course | Self::Group | Self::Wishes)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Name => write!(f, "name"),
            Self::Course => write!(f, "course"),
            Self::Group => write!(f, "group"),
            Self::Wishes => write!(f, "wishes"),
            Self::Edit(field) => write!(f, "edit_{field}"),
        }
    }
}

/// Fields collected so far during registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Persisted per-participant conversation session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub stage: Stage,
    #[serde(default)]
    pub draft: Draft,
}

impl Session {
    pub fn at(stage: Stage) -> Self {
        Self {
            stage,
            draft: Draft::default(),
        }
    }

    /// Record `text` for the current registration stage and move to the next.
    /// Returns the new stage, or `None` when not registering.
    pub fn record(&mut self, text: String) -> Option<Stage> {
        let next = self.stage.next()?;
        match self.stage {
            Stage::Name => self.draft.name = Some(text),
            Stage::Course => self.draft.course = Some(text),
            Stage::Group => self.draft.group = Some(text),
            // Wishes are committed straight into the profile.
            _ => {}
        }
        self.stage = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_walks_registration_path() {
        let expected = [Stage::Course, Stage::Group, Stage::Wishes, Stage::Idle];
        let mut current = Stage::Name;
        for expected_next in expected {
            let next = current.next().unwrap();
            assert_eq!(next, expected_next);
            current = next;
        }
        assert!(current.next().is_none());
    }

    #[test]
    fn edit_stage_has_no_next() {
        for field in EditableField::ALL {
            assert!(Stage::Edit(field).next().is_none());
            assert!(!Stage::Edit(field).is_registering());
        }
    }

    #[test]
    fn record_fills_draft_in_order() {
        let mut session = Session::at(Stage::Name);
        assert_eq!(session.record("Ann".into()), Some(Stage::Course));
        assert_eq!(session.record("2".into()), Some(Stage::Group));
        assert_eq!(session.record("G1".into()), Some(Stage::Wishes));
        assert_eq!(session.draft.name.as_deref(), Some("Ann"));
        assert_eq!(session.draft.course.as_deref(), Some("2"));
        assert_eq!(session.draft.group.as_deref(), Some("G1"));
    }

    #[test]
    fn record_from_idle_is_noop() {
        let mut session = Session::default();
        assert_eq!(session.record("hello".into()), None);
        assert_eq!(session, Session::default());
    }

    #[test]
    fn session_serde_roundtrip() {
        let mut session = Session::at(Stage::Name);
        session.record("Ann".into());
        let json = serde_json::to_string(&session).unwrap();
        let parsed: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, session);

        let edit = Session::at(Stage::Edit(EditableField::Wishes));
        let json = serde_json::to_string(&edit).unwrap();
        assert_eq!(serde_json::from_str::<Session>(&json).unwrap(), edit);
    }

    #[test]
    fn display_names() {
        assert_eq!(Stage::Idle.to_string(), "idle");
        assert_eq!(Stage::Edit(EditableField::Group).to_string(), "edit_group");
    }
}
