//! Secret Santa — registration, draw and notification bot.

pub mod bot;
pub mod channels;
pub mod config;
pub mod draw;
pub mod error;
pub mod registration;
pub mod store;
