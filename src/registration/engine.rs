//! ConversationEngine — drives registration and field edits per participant.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::error::{ConversationError, Error};
use crate::store::EventStore;

use super::model::{EditableField, ParticipantStats, Profile};
use super::prompts::{self, Reply};
use super::state::{Session, Stage};

/// Runs the per-participant state machine on top of the event store.
///
/// Every transition is persisted, including the in-progress draft, so a
/// restart resumes the conversation at the same stage.
pub struct ConversationEngine {
    store: Arc<EventStore>,
    draw_date: NaiveDate,
}

impl ConversationEngine {
    pub fn new(store: Arc<EventStore>, draw_date: NaiveDate) -> Self {
        Self { store, draw_date }
    }

    /// Current stage for `identity`; `Idle` when there is no session.
    pub async fn stage(&self, identity: &str) -> Stage {
        self.store
            .read(|s| s.sessions.get(identity).map(|session| session.stage))
            .await
            .unwrap_or_default()
    }

    /// Begin registration, or offer edit/view if already registered.
    ///
    /// A registered participant is left idle, so a pending edit is dropped.
    pub async fn start(&self, identity: &str) -> Result<Reply, Error> {
        if self.store.read(|s| s.is_registered(identity)).await {
            let _ = self
                .store
                .try_mutate(|s| s.sessions.remove(identity).map(|_| ()).ok_or(()))
                .await?;
            return Ok(prompts::already_registered());
        }

        self.store
            .mutate(|s| {
                s.sessions
                    .insert(identity.to_string(), Session::at(Stage::Name))
            })
            .await?;

        tracing::debug!(identity, "Registration started");
        Ok(prompts::prompt_for(Stage::Name))
    }

    /// Consume `text` for the current registration stage.
    ///
    /// From `Wishes` the draft becomes a new profile and the session ends.
    pub async fn advance(
        &self,
        identity: &str,
        handle: Option<&str>,
        text: &str,
    ) -> Result<Reply, Error> {
        let draw_date = self.draw_date;
        let (reply, registered) = self
            .store
            .try_mutate(|s| {
                let mut session = s.sessions.get(identity).cloned().unwrap_or_default();
                if !session.stage.is_registering() {
                    return Err(ConversationError::UnexpectedStage {
                        identity: identity.to_string(),
                        stage: session.stage.to_string(),
                        expected: "registration".to_string(),
                    });
                }

                if session.stage == Stage::Wishes {
                    let draft = session.draft;
                    let profile = Profile {
                        name: draft.name.unwrap_or_default(),
                        course: draft.course.unwrap_or_default(),
                        group: draft.group.unwrap_or_default(),
                        wishes: text.to_string(),
                        registered_at: Utc::now(),
                        handle: handle.map(String::from),
                    };
                    let reply = prompts::registration_complete(&profile, draw_date);
                    s.profiles.insert(identity.to_string(), profile);
                    s.sessions.remove(identity);
                    return Ok((reply, true));
                }

                let next = session.record(text.to_string()).unwrap_or_default();
                s.sessions.insert(identity.to_string(), session);
                Ok((prompts::prompt_for(next), false))
            })
            .await??;

        if registered {
            tracing::info!(identity, "Participant registered");
        }
        Ok(reply)
    }

    /// Start editing one field of an existing profile.
    pub async fn begin_edit(&self, identity: &str, field: EditableField) -> Result<Reply, Error> {
        self.store
            .try_mutate(|s| {
                if !s.is_registered(identity) {
                    return Err(not_registered(identity));
                }
                s.sessions
                    .insert(identity.to_string(), Session::at(Stage::Edit(field)));
                Ok(())
            })
            .await??;

        Ok(prompts::edit_prompt(field))
    }

    /// Overwrite the field selected by [`begin_edit`](Self::begin_edit).
    pub async fn commit_edit(&self, identity: &str, text: &str) -> Result<Reply, Error> {
        let field = self
            .store
            .try_mutate(|s| {
                let stage = s
                    .sessions
                    .get(identity)
                    .map(|session| session.stage)
                    .unwrap_or_default();
                let Stage::Edit(field) = stage else {
                    return Err(ConversationError::UnexpectedStage {
                        identity: identity.to_string(),
                        stage: stage.to_string(),
                        expected: "edit".to_string(),
                    });
                };
                let profile = s
                    .profiles
                    .get_mut(identity)
                    .ok_or_else(|| not_registered(identity))?;
                field.set(profile, text.to_string());
                s.sessions.remove(identity);
                Ok(field)
            })
            .await??;

        tracing::info!(identity, %field, "Profile field updated");
        Ok(prompts::edit_saved())
    }

    /// Drop any in-progress flow. Always succeeds.
    pub async fn cancel(&self, identity: &str) -> Result<Reply, Error> {
        // Nothing is written when there was no session.
        let stage = self
            .store
            .try_mutate(|s| s.sessions.remove(identity).map(|session| session.stage).ok_or(()))
            .await?
            .unwrap_or_default();
        Ok(prompts::cancelled(stage))
    }

    /// Route free text by the participant's stage. `None` when idle.
    pub async fn on_text(
        &self,
        identity: &str,
        handle: Option<&str>,
        text: &str,
    ) -> Result<Option<Reply>, Error> {
        match self.stage(identity).await {
            Stage::Idle => Ok(None),
            Stage::Edit(_) => self.commit_edit(identity, text).await.map(Some),
            _ => self.advance(identity, handle, text).await.map(Some),
        }
    }

    pub async fn view(&self, identity: &str) -> Result<Reply, ConversationError> {
        self.store
            .read(|s| s.profiles.get(identity).map(prompts::profile_card))
            .await
            .ok_or_else(|| not_registered(identity))
    }

    pub async fn edit_menu(&self, identity: &str) -> Result<Reply, ConversationError> {
        if self.store.read(|s| s.is_registered(identity)).await {
            Ok(prompts::edit_menu())
        } else {
            Err(not_registered(identity))
        }
    }

    /// Remove the participant's profile and every assignment touching them.
    pub async fn delete_profile(&self, identity: &str) -> Result<Reply, Error> {
        self.store
            .try_mutate(|s| {
                if s.remove_participant(identity) {
                    Ok(())
                } else {
                    Err(not_registered(identity))
                }
            })
            .await??;

        tracing::info!(identity, "Participant deleted their profile");
        Ok(prompts::profile_deleted())
    }

    pub async fn stats(&self) -> ParticipantStats {
        self.store
            .read(|s| ParticipantStats::from_profiles(s.profiles.values()))
            .await
    }
}

fn not_registered(identity: &str) -> ConversationError {
    ConversationError::NotRegistered {
        identity: identity.to_string(),
    }
}
