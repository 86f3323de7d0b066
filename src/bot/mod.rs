//! Bot — routes participant and admin commands.

pub mod access;
pub mod bot_loop;
pub mod command;

pub use access::{AdminGate, Capability};
pub use bot_loop::{Bot, BotDeps};
pub use command::{Command, CommandParser};
