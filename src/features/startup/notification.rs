//! # Feature: Startup Announcement
//!
//! Posts an "online" embed to the configured announcement channel on the first
//! Ready event. Reconnects do not announce again.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use crate::features::lifecycle::ChannelHandle;
use log::{info, warn};
use serenity::http::Http;
use serenity::model::gateway::Ready;
use serenity::model::id::ChannelId;
use serenity::utils::Color;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct StartupNotifier {
    channel: Option<ChannelHandle>,
    first_ready: AtomicBool,
}

impl StartupNotifier {
    pub fn new(channel: Option<ChannelHandle>) -> Self {
        Self {
            channel,
            first_ready: AtomicBool::new(true),
        }
    }

    /// True exactly once, and only when a channel is configured
    fn take_first_ready(&self) -> Option<&ChannelHandle> {
        let channel = self.channel.as_ref()?;
        if self.first_ready.swap(false, Ordering::SeqCst) {
            Some(channel)
        } else {
            None
        }
    }

    pub async fn send_if_enabled(&self, http: &Http, ready: &Ready, clip_count: usize) {
        let Some(channel) = self.take_first_ready() else {
            info!("Skipping startup announcement");
            return;
        };

        let description = format!(
            "**{}** v{} is online.\nType `!help` to see what I can do.",
            ready.user.name,
            env!("CARGO_PKG_VERSION")
        );

        let result = ChannelId(channel.id)
            .send_message(http, |m| {
                m.embed(|e| {
                    e.title("🏴‍☠️ Ahoy!")
                        .description(description)
                        .field("Sound clips", clip_count.to_string(), true)
                        .color(Color::DARK_GREEN)
                })
            })
            .await;

        match result {
            Ok(_) => info!("Sent startup announcement to #{}", channel.name),
            Err(e) => warn!("Failed to send startup announcement to #{}: {e}", channel.name),
        }
    }
}
