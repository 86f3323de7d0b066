//! Main bot loop: reads messages from the channel and routes each command.

use std::sync::Arc;

use futures::StreamExt;

use crate::channels::{Channel, IncomingMessage, OutgoingResponse};
use crate::draw::{DrawEngine, DrawOutcome, NotificationDispatcher};
use crate::error::{ConversationError, Error};
use crate::registration::{ConversationEngine, Reply, prompts};
use crate::store::EventStore;

use super::access::AdminGate;
use super::command::{Command, CommandParser};

/// Shared components the bot routes commands to.
pub struct BotDeps {
    pub store: Arc<EventStore>,
    pub conversation: Arc<ConversationEngine>,
    pub draws: Arc<DrawEngine>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub gate: AdminGate,
}

/// Routes incoming messages to the conversation and the draw.
pub struct Bot {
    deps: BotDeps,
    channel: Arc<dyn Channel>,
}

impl Bot {
    pub fn new(deps: BotDeps, channel: Arc<dyn Channel>) -> Self {
        Self { deps, channel }
    }

    /// Run until Ctrl+C or the channel stream ends.
    pub async fn run(self) -> Result<(), Error> {
        let mut message_stream = self.channel.start().await?;

        tracing::info!(channel = self.channel.name(), "Secret Santa bot ready and listening");

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("Channel stream ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            let response = match self.handle_message(&message).await {
                Ok(Some(response)) => response,
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!(user = %message.user_id, "Error handling message: {}", e);
                    error_reply(&e)
                }
            };

            if let Err(e) = self.channel.respond(&message, response).await {
                tracing::warn!(user = %message.user_id, "Failed to send reply: {}", e);
            }
        }

        if let Err(e) = self.channel.shutdown().await {
            tracing::warn!("Channel shutdown failed: {}", e);
        }
        Ok(())
    }

    /// Handle one message and return the reply for its sender.
    pub async fn handle_message(
        &self,
        msg: &IncomingMessage,
    ) -> Result<Option<OutgoingResponse>, Error> {
        let command = CommandParser::parse(msg);
        let identity = msg.user_id.as_str();
        let handle = msg.handle.as_deref();

        tracing::debug!(
            message_id = %msg.id,
            channel = %msg.channel,
            user = %identity,
            name = ?msg.user_name,
            ?command,
            "Handling command"
        );

        if let Some(capability) = command.required_capability() {
            self.deps.gate.authorize(identity, handle, capability)?;
        }

        let conversation = &self.deps.conversation;
        let reply = match command {
            Command::Start => conversation.start(identity).await?,
            Command::Cancel => conversation.cancel(identity).await?,
            Command::Help | Command::Unknown(_) => prompts::help(),
            Command::ViewProfile => conversation.view(identity).await?,
            Command::EditMenu => conversation.edit_menu(identity).await?,
            Command::BeginEdit(field) => conversation.begin_edit(identity, field).await?,
            Command::DeleteProfile => match conversation.delete_profile(identity).await {
                Err(Error::Conversation(ConversationError::NotRegistered { .. })) => {
                    prompts::nothing_to_delete()
                }
                other => other?,
            },
            Command::Stats => Reply::text(conversation.stats().await.render()),
            Command::Draw => self.draw().await?,
            Command::SendResults => self.send_results(msg).await?,
            Command::ClearAll => self.clear_all().await?,
            Command::Text(text) => conversation
                .on_text(identity, handle, &text)
                .await?
                .unwrap_or_else(prompts::idle_hint),
            Command::UnknownCallback(data) => {
                tracing::debug!(user = %identity, data = %data, "Ignoring unknown button");
                prompts::idle_hint()
            }
        };

        Ok(Some(reply.into()))
    }

    async fn draw(&self) -> Result<Reply, Error> {
        let text = match self.deps.draws.draw().await? {
            DrawOutcome::Drawn { participants, .. } => {
                format!("✅ Draw complete! Participants: {participants}")
            }
            DrawOutcome::Insufficient { .. } => {
                "Not enough participants for the draw (at least 2 are needed).".to_string()
            }
            DrawOutcome::AlreadyCompleted { date } => {
                format!("The draw for {} has already been held.", date.format("%d.%m.%Y"))
            }
        };
        Ok(Reply::text(text))
    }

    async fn send_results(&self, msg: &IncomingMessage) -> Result<Reply, Error> {
        if self.deps.store.read(|s| s.assignments.is_empty()).await {
            return Ok(Reply::text("The draw has not been held yet. Use /draw first."));
        }

        let started = OutgoingResponse::text("Starting to send results...");
        if let Err(e) = self.channel.respond(msg, started).await {
            tracing::warn!("Failed to acknowledge /send_results: {}", e);
        }

        let report = self.deps.dispatcher.dispatch_current().await?;
        let mut text = format!(
            "✅ Results sent!\nDelivered: {}\nFailed: {}",
            report.delivered,
            report.failed.len()
        );
        if report.skipped > 0 {
            text.push_str(&format!("\nSkipped (deleted profiles): {}", report.skipped));
        }
        Ok(Reply::text(text))
    }

    async fn clear_all(&self) -> Result<Reply, Error> {
        self.deps.store.mutate(|s| s.clear_participants()).await?;
        tracing::info!("Participant list and draw cleared");
        Ok(Reply::text("✅ Participant list and draw cleared!"))
    }
}

/// What the sender sees when handling their message failed.
fn error_reply(error: &Error) -> OutgoingResponse {
    let reply = match error {
        Error::Conversation(ConversationError::NotRegistered { .. }) => prompts::not_registered(),
        Error::Conversation(ConversationError::UnexpectedStage { .. }) => prompts::idle_hint(),
        Error::Access(_) => Reply::text("This command is for administrators only."),
        _ => Reply::text("Something went wrong. Please try again later."),
    };
    reply.into()
}
