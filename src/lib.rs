//! # Open Player
//!
//! Per-guild voice playback sessions for Discord.
//!
//! - [`player`]: session registry and voice-state reconciliation
//! - [`cache`]: disk-backed memoization for expensive lookups
//! - [`bot`]: serenity/songbird wiring
//! - [`config`]: environment-driven configuration

pub mod bot;
pub mod cache;
pub mod config;
pub mod error;
pub mod player;

pub use error::{PlayerError, PlayerResult};
