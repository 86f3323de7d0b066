//! EventStore — the in-memory event state mirrored to a `StateStore`.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::StoreError;

use super::state::EventState;
use super::traits::StateStore;

/// Shared handle on the event state.
///
/// Every mutation runs under one lock and is persisted before the lock is
/// released. The closure works on a copy; the copy only replaces the live
/// state once the save succeeded, so memory never runs ahead of disk.
pub struct EventStore {
    state: Mutex<EventState>,
    backend: Arc<dyn StateStore>,
}

impl EventStore {
    /// Load the current document from `backend`.
    pub async fn open(backend: Arc<dyn StateStore>) -> Result<Self, StoreError> {
        let state = backend.load().await?;
        tracing::debug!(
            profiles = state.profiles.len(),
            assignments = state.assignments.len(),
            sessions = state.sessions.len(),
            "Event state loaded"
        );
        Ok(Self {
            state: Mutex::new(state),
            backend,
        })
    }

    /// Read from the current state.
    pub async fn read<T>(&self, f: impl FnOnce(&EventState) -> T) -> T {
        let state = self.state.lock().await;
        f(&state)
    }

    /// Apply `f`, persist the result, then publish it.
    pub async fn mutate<T>(&self, f: impl FnOnce(&mut EventState) -> T) -> Result<T, StoreError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let result = f(&mut next);
        self.backend.save(&next).await?;
        *state = next;
        Ok(result)
    }

    /// Like [`mutate`](Self::mutate), but `f` may decline by returning `Err`,
    /// in which case nothing is written.
    pub async fn try_mutate<T, E>(
        &self,
        f: impl FnOnce(&mut EventState) -> Result<T, E>,
    ) -> Result<Result<T, E>, StoreError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        match f(&mut next) {
            Ok(value) => {
                self.backend.save(&next).await?;
                *state = next;
                Ok(Ok(value))
            }
            Err(e) => Ok(Err(e)),
        }
    }

    pub async fn snapshot(&self) -> EventState {
        self.state.lock().await.clone()
    }
}
