//! Persistence layer — one JSON document holding profiles, assignments,
//! sessions and the draw ledger.

pub mod event_store;
pub mod json;
pub mod state;
pub mod traits;

pub use event_store::EventStore;
pub use json::JsonFileStore;
#[cfg(test)]
pub use json::MemoryStore;
pub use state::{DrawLedger, EventState};
pub use traits::StateStore;
