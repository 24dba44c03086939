//! # Core Module
//!
//! Configuration shared by the bot binary and its features.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod config;

pub use config::{AudioConfig, Config};
