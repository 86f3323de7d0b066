//! Participant profile data model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered participant. Keyed by platform user id in the event document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    /// Free-form label, e.g. "1" or "2".
    pub course: String,
    /// Free-form label, e.g. "C10124-31.05.01(6)".
    pub group: String,
    pub wishes: String,
    pub registered_at: DateTime<Utc>,
    /// Platform username, if the participant has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

impl Profile {
    /// Render the profile card shown by "view my data".
    pub fn to_card(&self) -> String {
        format!(
            "📋 Your details:\n\n\
             Name: {}\n\
             Course: {}\n\
             Group: {}\n\
             Wishes: {}\n\
             Registered: {}",
            self.name,
            self.course,
            self.group,
            self.wishes,
            self.registered_at
                .with_timezone(&chrono::Local)
                .format("%d.%m.%Y %H:%M"),
        )
    }
}

/// The profile fields a participant can change after registering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditableField {
    Name,
    Course,
    Group,
    Wishes,
}

impl EditableField {
    pub const ALL: [EditableField; 4] = [Self::Name, Self::Course, Self::Group, Self::Wishes];

    /// Button label for the edit menu.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Course => "Course",
            Self::Group => "Group",
            Self::Wishes => "Wishes",
        }
    }

    /// Callback selector sent back by the edit menu button.
    pub fn selector(&self) -> &'static str {
        match self {
            Self::Name => "edit_name",
            Self::Course => "edit_course",
            Self::Group => "edit_group",
            Self::Wishes => "edit_wishes",
        }
    }

    pub fn from_selector(selector: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.selector() == selector)
    }

    /// Overwrite this field on `profile`, leaving every other field alone.
    pub fn set(&self, profile: &mut Profile, value: String) {
        match self {
            Self::Name => profile.name = value,
            Self::Course => profile.course = value,
            Self::Group => profile.group = value,
            Self::Wishes => profile.wishes = value,
        }
    }
}

impl std::fmt::Display for EditableField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Course => "course",
            Self::Group => "group",
            Self::Wishes => "wishes",
        };
        write!(f, "{s}")
    }
}

/// Participant count with a per-course breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantStats {
    pub total: usize,
    /// Course label → participant count, sorted by label.
    pub by_course: BTreeMap<String, usize>,
}

impl ParticipantStats {
    pub fn from_profiles<'a>(profiles: impl IntoIterator<Item = &'a Profile>) -> Self {
        let mut total = 0;
        let mut by_course = BTreeMap::new();
        for profile in profiles {
            total += 1;
            *by_course.entry(profile.course.clone()).or_insert(0) += 1;
        }
        Self { total, by_course }
    }

    pub fn render(&self) -> String {
        if self.total == 0 {
            return "No participants registered yet.".to_string();
        }
        let mut text = format!(
            "📊 Statistics:\n\nTotal participants: {}\n\nBy course:\n",
            self.total
        );
        for (course, count) in &self.by_course {
            text.push_str(&format!("Course {course}: {count}\n"));
        }
        text
    }
}

#[cfg(test)]
pub(crate) fn sample_profile(name: &str) -> Profile {
    Profile {
        name: name.to_string(),
        course: "2".to_string(),
        group: "G1".to_string(),
        wishes: "bikes".to_string(),
        registered_at: Utc::now(),
        handle: Some(name.to_lowercase()),
    }
}
