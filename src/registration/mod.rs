//! Registration — the conversational flow that builds participant profiles.
//!
//! A participant walks through four prompts (name, course, group, wishes);
//! the answers become a `Profile` only once the last one arrives. Registered
//! participants can later overwrite a single field through the edit flow.

pub mod engine;
pub mod model;
pub mod prompts;
pub mod state;

pub use engine::ConversationEngine;
pub use model::{EditableField, ParticipantStats, Profile};
pub use prompts::{Action, Reply};
pub use state::{Draft, Session, Stage};
