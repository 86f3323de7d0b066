//! `StateStore` trait — load/save interface for the event document.

use async_trait::async_trait;

use crate::error::StoreError;

use super::state::EventState;

/// Backend-agnostic persistence for the whole event document.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the document. Missing or unreadable content yields an empty state.
    async fn load(&self) -> Result<EventState, StoreError>;

    /// Replace the persisted document with `state` in one step.
    async fn save(&self, state: &EventState) -> Result<(), StoreError>;
}
