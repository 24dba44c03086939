//! Utility command handlers
//!
//! Handles: time, uptime, help
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use log::info;
use serenity::model::channel::Message;
use serenity::prelude::Context;
use std::fmt::Display;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::PrefixCommandHandler;

/// Handler for utility commands: time, uptime, help
pub struct UtilityHandler;

#[async_trait]
impl PrefixCommandHandler for UtilityHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["time", "uptime", "help"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        msg: &Message,
        command: &str,
        _args: &str,
    ) -> Result<()> {
        let reply = match command {
            "time" => time_reply(&Local::now()),
            "uptime" => uptime_reply(&ctx.start_time, &Local::now()),
            "help" => help_reply(),
            _ => return Ok(()),
        };

        msg.channel_id.say(&serenity_ctx.http, reply).await?;
        info!("{command} command completed for user {}", msg.author.id);
        Ok(())
    }
}

/// RFC 1123 style timestamp, e.g. `Tue, 02 Jan 2024 15:04:05 UTC`
pub fn time_reply<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!("The current time is: {}", now.format("%a, %d %b %Y %H:%M:%S %Z"))
}

pub fn uptime_reply<Tz: TimeZone>(started: &DateTime<Tz>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    let running = now.clone().signed_duration_since(started.clone());
    format!(
        "I was started: {}, so I am running for {} now",
        started.format("%Y-%m-%d %H:%M:%S %Z"),
        format_duration(running.num_seconds().max(0) as u64)
    )
}

/// `93784` -> `1d 2h 3m 4s`; leading zero units are dropped
pub fn format_duration(total_secs: u64) -> String {
    let days = total_secs / 86400;
    let hours = (total_secs % 86400) / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

pub fn help_reply() -> String {
    r#"**Available Commands:**
`!time` - Show the current time
`!uptime` - Show how long I have been running
`!balance` - Show your Sea of Thieves balance
`!setrat <cookie>` - Store your Sea of Thieves RAT cookie (DM only)
`!sounds` - List the loaded sound clips
`!help` - Show this help message"#
        .to_string()
}
