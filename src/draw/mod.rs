//! The draw — who gives to whom, and telling them.
//!
//! `DrawEngine` computes a single gift-giving cycle over every registered
//! participant, `NotificationDispatcher` sends each giver their receiver's
//! details, and `DrawScheduler` runs both once the configured date arrives.

pub mod engine;
pub mod notify;
pub mod scheduler;

use std::collections::BTreeMap;

/// Giver identity → receiver identity.
pub type Assignments = BTreeMap<String, String>;

pub use engine::{DrawEngine, DrawOutcome, is_single_cycle, perform_draw};
pub use notify::{DispatchReport, NotificationDispatcher, render_assignment};
pub use scheduler::{DrawScheduler, ScheduledRun, spawn_draw_ticker};
