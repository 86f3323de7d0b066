//! Command parsing — turns an incoming message into a `Command`.

use crate::channels::{IncomingMessage, MessageKind};
use crate::registration::{Action, EditableField};

use super::access::Capability;

/// Everything the bot knows how to handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Begin registration.
    Start,
    /// Abandon the registration or edit in progress.
    Cancel,
    Help,
    /// Show the participant's profile card.
    ViewProfile,
    /// Show the field picker.
    EditMenu,
    /// Start editing one field.
    BeginEdit(EditableField),
    DeleteProfile,
    Stats,

    // Admin commands
    Draw,
    SendResults,
    ClearAll,

    /// Free text, fed to the conversation.
    Text(String),
    /// A slash command we do not know.
    Unknown(String),
    /// A button press with data we do not know.
    UnknownCallback(String),
}

impl Command {
    /// Capability the sender needs, if any.
    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            Self::Draw | Self::SendResults | Self::ClearAll => Some(Capability::Admin),
            _ => None,
        }
    }
}

/// Parses incoming messages into commands.
pub struct CommandParser;

impl CommandParser {
    pub fn parse(msg: &IncomingMessage) -> Command {
        match msg.kind {
            MessageKind::Callback => Self::parse_callback(&msg.content),
            MessageKind::Text => Self::parse_text(&msg.content),
        }
    }

    fn parse_callback(data: &str) -> Command {
        match Action::from_callback(data) {
            Some(Action::ViewProfile) => Command::ViewProfile,
            Some(Action::EditProfile) => Command::EditMenu,
            Some(Action::EditField(field)) => Command::BeginEdit(field),
            None => Command::UnknownCallback(data.to_string()),
        }
    }

    fn parse_text(content: &str) -> Command {
        let trimmed = content.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Command::Text(content.to_string());
        };

        // "/start@SantaBot extra words" → "start"
        let word = rest.split_whitespace().next().unwrap_or_default();
        let name = word.split('@').next().unwrap_or_default().to_lowercase();

        match name.as_str() {
            "start" => Command::Start,
            "cancel" => Command::Cancel,
            "help" => Command::Help,
            "profile" => Command::ViewProfile,
            "edit" => Command::EditMenu,
            "delete_profile" => Command::DeleteProfile,
            "stats" => Command::Stats,
            "draw" => Command::Draw,
            "send_results" => Command::SendResults,
            "clear_all" => Command::ClearAll,
            _ => Command::Unknown(trimmed.to_string()),
        }
    }
}
