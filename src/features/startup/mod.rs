//! # Startup Announcement Feature
//!
//! Announces the bot in a configured channel when it comes online.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: true

pub mod notification;

pub use notification::StartupNotifier;
