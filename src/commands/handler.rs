//! Prefix command handler trait
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use async_trait::async_trait;
use serenity::model::channel::Message;
use serenity::prelude::Context;
use std::sync::Arc;

use super::context::CommandContext;

/// Trait for `!command` handlers
///
/// Handlers are registered with a [`CommandRegistry`](super::CommandRegistry)
/// and dispatched by command name (without the prefix).
#[async_trait]
pub trait PrefixCommandHandler: Send + Sync {
    /// Command name(s) this handler processes
    fn command_names(&self) -> &'static [&'static str];

    /// Handle one invocation
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared command context
    /// * `serenity_ctx` - Serenity context for Discord API calls
    /// * `msg` - The triggering message
    /// * `command` - The matched command name
    /// * `args` - Everything after the command name, trimmed
    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        msg: &Message,
        command: &str,
        args: &str,
    ) -> Result<()>;
}
