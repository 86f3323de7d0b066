//! Channel trait and the message types that cross it.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use uuid::Uuid;

use crate::error::ChannelError;
use crate::registration::{Action, Reply};

/// How a participant produced an incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Typed text, including slash commands.
    Text,
    /// A button press; `content` holds the callback data.
    Callback,
}

/// A message received from a channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: Uuid,
    pub channel: String,
    /// Stable participant identity on this channel.
    pub user_id: String,
    /// Display name, if the platform gave one.
    pub user_name: Option<String>,
    /// Platform handle (e.g. Telegram @username) without the `@`.
    pub handle: Option<String>,
    pub content: String,
    pub kind: MessageKind,
    /// Channel-specific routing data (chat id, callback id, ...).
    pub metadata: serde_json::Value,
}

impl IncomingMessage {
    pub fn new(
        channel: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            user_id: user_id.into(),
            user_name: None,
            handle: None,
            content: content.into(),
            kind: MessageKind::Text,
            metadata: serde_json::Value::Null,
        }
    }

    /// A button press carrying `data`.
    pub fn callback(
        channel: impl Into<String>,
        user_id: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            kind: MessageKind::Callback,
            ..Self::new(channel, user_id, data)
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }
}

/// An inline button under a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl From<Action> for Button {
    fn from(action: Action) -> Self {
        Self {
            label: action.label().to_string(),
            data: action.callback_data().to_string(),
        }
    }
}

/// A message to send back through a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub content: String,
    pub buttons: Vec<Button>,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(mut self, buttons: impl IntoIterator<Item = Button>) -> Self {
        self.buttons.extend(buttons);
        self
    }
}

impl From<Reply> for OutgoingResponse {
    fn from(reply: Reply) -> Self {
        Self::text(reply.text).with_buttons(reply.actions.into_iter().map(Button::from))
    }
}

/// Stream of incoming messages from a channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A transport the bot talks to participants through.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Begin receiving messages.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Reply in the conversation `msg` came from.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    /// Send a private message to a participant who did not just write in.
    async fn send_direct(
        &self,
        user_id: &str,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
