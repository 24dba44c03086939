//! # Command System
//!
//! Prefix (`!command`) handling for Discord messages.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod context;
pub mod handler;
pub mod handlers;
pub mod registry;

pub use crate::command_handler::CommandHandler;

pub use context::CommandContext;
pub use handler::PrefixCommandHandler;
pub use registry::CommandRegistry;
