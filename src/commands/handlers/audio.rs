//! Audio command handlers
//!
//! Handles: sounds
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serenity::model::channel::Message;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::PrefixCommandHandler;
use crate::features::audio::AudioCache;

pub struct AudioHandler;

#[async_trait]
impl PrefixCommandHandler for AudioHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["sounds"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        msg: &Message,
        _command: &str,
        _args: &str,
    ) -> Result<()> {
        debug!("Listing {} sound clips for {}", ctx.audio.len(), msg.author.id);
        msg.channel_id
            .say(&serenity_ctx.http, sounds_reply(&ctx.audio))
            .await?;
        Ok(())
    }
}

pub fn sounds_reply(audio: &AudioCache) -> String {
    if audio.is_empty() {
        return "No sound clips are loaded.".to_string();
    }

    let mut reply = String::from("**Loaded sound clips:**\n");
    for name in audio.names() {
        // names() only returns loaded clips
        if let Ok(clip) = audio.get(&name) {
            reply.push_str(&format!("• `{name}` ({} frames)\n", clip.frame_count()));
        }
    }
    reply.trim_end().to_string()
}
