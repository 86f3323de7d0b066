//! Participant-facing texts and the reply type the engine emits.

use chrono::NaiveDate;

use super::model::{EditableField, Profile};
use super::state::Stage;

/// A button offered under a reply. Each maps to one callback selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    EditProfile,
    ViewProfile,
    EditField(EditableField),
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Self::EditProfile => "Edit my details",
            Self::ViewProfile => "View my details",
            Self::EditField(field) => field.label(),
        }
    }

    pub fn callback_data(&self) -> &'static str {
        match self {
            Self::EditProfile => "change_data",
            Self::ViewProfile => "view_data",
            Self::EditField(field) => field.selector(),
        }
    }

    pub fn from_callback(data: &str) -> Option<Self> {
        match data {
            "change_data" => Some(Self::EditProfile),
            "view_data" => Some(Self::ViewProfile),
            other => EditableField::from_selector(other).map(Self::EditField),
        }
    }
}

/// What the engine wants sent back to the participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub actions: Vec<Action>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// The usual follow-up buttons once a participant is registered.
    pub fn with_profile_actions(self) -> Self {
        self.with_actions([Action::EditProfile, Action::ViewProfile])
    }
}

pub fn already_registered() -> Reply {
    Reply::text("You are already registered! What would you like to do?").with_profile_actions()
}

/// Prompt for the field collected at `stage`.
pub fn prompt_for(stage: Stage) -> Reply {
    let text = match stage {
        Stage::Name => "Welcome to Secret Santa! 🎅\nTo register, enter your name:",
        Stage::Course => "Great! Now enter your course (for example '1' or '2'):",
        Stage::Group => "Good! Now enter your group (for example 'C10124-31.05.01(6)'):",
        Stage::Wishes => {
            "Almost done! Write your gift wishes \
             (what you like, hobbies, clothing size and so on):"
        }
        Stage::Edit(field) => return edit_prompt(field),
        Stage::Idle => return idle_hint(),
    };
    Reply::text(text)
}

pub fn registration_complete(profile: &Profile, draw_date: NaiveDate) -> Reply {
    Reply::text(format!(
        "✅ Registration complete!\n\n\
         Your details:\n\
         Name: {}\n\
         Course: {}\n\
         Group: {}\n\
         Wishes: {}\n\n\
         The draw takes place on {}",
        profile.name,
        profile.course,
        profile.group,
        profile.wishes,
        draw_date.format("%d.%m.%Y"),
    ))
    .with_profile_actions()
}

pub fn edit_menu() -> Reply {
    Reply::text("✏ What would you like to change?")
        .with_actions(EditableField::ALL.map(Action::EditField))
}

pub fn edit_prompt(field: EditableField) -> Reply {
    let text = match field {
        EditableField::Name => "Enter a new name:",
        EditableField::Course => "Enter a new course:",
        EditableField::Group => "Enter a new group:",
        EditableField::Wishes => "Enter new wishes:",
    };
    Reply::text(text)
}

pub fn edit_saved() -> Reply {
    Reply::text("✅ Changes saved!").with_profile_actions()
}

pub fn profile_card(profile: &Profile) -> Reply {
    Reply::text(profile.to_card()).with_actions([Action::EditProfile])
}

/// Confirmation for `/cancel`, worded by the stage that was dropped.
pub fn cancelled(stage: Stage) -> Reply {
    let text = match stage {
        Stage::Idle => "Nothing to cancel.",
        Stage::Edit(_) => "Editing cancelled. Your details are unchanged.",
        Stage::Name | Stage::Course | Stage::Group | Stage::Wishes => "Registration cancelled.",
    };
    Reply::text(text)
}

pub fn not_registered() -> Reply {
    Reply::text("You are not registered yet! Use /start to register.")
}

pub fn nothing_to_delete() -> Reply {
    Reply::text("You are not registered yet, nothing to delete.")
}

pub fn profile_deleted() -> Reply {
    Reply::text("✅ Your profile has been deleted.")
}

pub fn idle_hint() -> Reply {
    Reply::text("Use /start to register or /help to see what I can do.")
}

pub fn help() -> Reply {
    Reply::text(
        "🎅 Secret Santa\n\n\
         /start — register\n\
         /profile — view your details\n\
         /edit — change your details\n\
         /delete_profile — delete your profile\n\
         /stats — participant statistics\n\
         /cancel — stop the current step",
    )
}
