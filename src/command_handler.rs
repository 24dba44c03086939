//! Message dispatch for prefix commands
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! Every message is parsed against the configured prefix, rate limited per
//! user, and handed to the registered handler on its own request id.

use crate::commands::context::CommandContext;
use crate::commands::registry::CommandRegistry;
use crate::features::rate_limiting::RateLimiter;
use anyhow::Result;
use log::{debug, error, info, warn};
use serenity::model::channel::Message;
use serenity::prelude::Context;
use std::sync::Arc;
use uuid::Uuid;

const FAILURE_REPLY: &str = "Sorry, something went wrong while running that command.";

#[derive(Clone)]
pub struct CommandHandler {
    registry: Arc<CommandRegistry>,
    context: Arc<CommandContext>,
    prefix: String,
    rate_limiter: RateLimiter,
}

impl CommandHandler {
    pub fn new(
        registry: CommandRegistry,
        context: CommandContext,
        prefix: impl Into<String>,
        rate_limiter: RateLimiter,
    ) -> Self {
        CommandHandler {
            registry: Arc::new(registry),
            context: Arc::new(context),
            prefix: prefix.into(),
            rate_limiter,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub async fn handle_message(&self, ctx: &Context, msg: &Message) -> Result<()> {
        let Some((command, args)) = parse_command(&self.prefix, &msg.content) else {
            return Ok(());
        };

        let Some(handler) = self.registry.get(&command) else {
            debug!("Ignoring unknown command '{command}' from {}", msg.author.id);
            return Ok(());
        };

        let request_id = Uuid::new_v4();
        let user_id = msg.author.id.to_string();
        let guild_id = msg
            .guild_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "DM".to_string());

        // Arguments are never logged: !setrat carries a credential
        info!(
            "[{request_id}] 📥 Command received | User: {user_id} | Channel: {} | Guild: {guild_id} | Command: {command}",
            msg.channel_id
        );

        if !self.rate_limiter.check_rate_limit(&user_id) {
            let wait = self.rate_limiter.retry_after(&user_id);
            warn!("[{request_id}] 🚫 Rate limit exceeded for user: {user_id}");
            msg.channel_id
                .say(
                    &ctx.http,
                    format!(
                        "You're sending commands too quickly! Please wait {}s.",
                        wait.as_secs().max(1)
                    ),
                )
                .await?;
            return Ok(());
        }

        match handler
            .handle(Arc::clone(&self.context), ctx, msg, &command, args)
            .await
        {
            Ok(()) => {
                debug!("[{request_id}] ✅ Command '{command}' completed");
                Ok(())
            }
            Err(e) => {
                error!("[{request_id}] ❌ Command '{command}' failed: {e:#}");
                msg.channel_id.say(&ctx.http, FAILURE_REPLY).await?;
                Ok(())
            }
        }
    }
}

/// Split `!name rest of line` into a lowercased name and trimmed arguments
pub fn parse_command<'a>(prefix: &str, content: &'a str) -> Option<(String, &'a str)> {
    let body = content.trim_start().strip_prefix(prefix)?;
    let (name, args) = match body.find(char::is_whitespace) {
        Some(idx) => (&body[..idx], body[idx..].trim()),
        None => (body, ""),
    };

    if name.is_empty() {
        return None;
    }
    Some((name.to_lowercase(), args))
}
