//! In-memory channel that records what the bot sends.

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

/// Records replies and direct messages instead of delivering them.
#[derive(Default)]
pub struct RecordingChannel {
    replies: Mutex<Vec<(String, OutgoingResponse)>>,
    direct: Mutex<Vec<(String, OutgoingResponse)>>,
    unreachable: BTreeSet<String>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct messages to these users fail, as if they had blocked the bot.
    pub fn failing_for<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unreachable: users.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Replies sent in response to incoming messages, keyed by sender.
    pub fn replies(&self) -> Vec<(String, OutgoingResponse)> {
        self.replies.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Private messages delivered through `send_direct`.
    pub fn direct_messages(&self) -> Vec<(String, OutgoingResponse)> {
        self.direct.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push((msg.user_id.clone(), response));
        }
        Ok(())
    }

    async fn send_direct(
        &self,
        user_id: &str,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        if self.unreachable.contains(user_id) {
            return Err(ChannelError::SendFailed {
                name: "recording".into(),
                reason: format!("user {user_id} is unreachable"),
            });
        }
        if let Ok(mut direct) = self.direct.lock() {
            direct.push((user_id.to_string(), response));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
