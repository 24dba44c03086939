//! Sea of Thieves command handlers
//!
//! Handles: setrat, balance
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! Replies never echo the cookie or the underlying storage/crypto error.

use anyhow::Result;
use async_trait::async_trait;
use log::{error, info, warn};
use serenity::model::channel::Message;
use serenity::model::mention::Mentionable;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::PrefixCommandHandler;
use crate::features::secrets::RAT_COOKIE;
use crate::features::sot::{format_thousands, Balance, SotError};

const SETRAT_THANKS: &str = "Thanks for setting/updating your RAT cookie.";
const SETRAT_USAGE: &str = "Usage: `!setrat <cookie>`";
const SETRAT_DM_ONLY: &str =
    "Please don't post your RAT cookie in a public channel. Send it to me as a direct message instead.";
const GENERIC_FAILURE: &str = "Sorry, something went wrong. Please try again later.";

pub struct SotHandler;

#[async_trait]
impl PrefixCommandHandler for SotHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["setrat", "balance"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        msg: &Message,
        command: &str,
        args: &str,
    ) -> Result<()> {
        match command {
            "setrat" => self.handle_setrat(&ctx, serenity_ctx, msg, args).await,
            "balance" => self.handle_balance(&ctx, serenity_ctx, msg).await,
            _ => Ok(()),
        }
    }
}

impl SotHandler {
    /// Handle !setrat command
    async fn handle_setrat(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        msg: &Message,
        args: &str,
    ) -> Result<()> {
        let user_id = msg.author.id.to_string();

        if msg.guild_id.is_some() {
            if let Err(e) = serenity_ctx
                .http
                .delete_message(msg.channel_id.0, msg.id.0)
                .await
            {
                warn!("Could not delete public !setrat message from {user_id}: {e}");
            }
            msg.channel_id.say(&serenity_ctx.http, SETRAT_DM_ONLY).await?;
            return Ok(());
        }

        if args.is_empty() {
            msg.channel_id.say(&serenity_ctx.http, SETRAT_USAGE).await?;
            return Ok(());
        }

        let reply = match ctx.preferences.set_encrypted(&user_id, RAT_COOKIE, args).await {
            Ok(()) => {
                info!("Stored RAT cookie for user {user_id}");
                SETRAT_THANKS
            }
            Err(e) => {
                error!("Failed to store RAT cookie for user {user_id}: {e}");
                GENERIC_FAILURE
            }
        };

        msg.channel_id.say(&serenity_ctx.http, reply).await?;
        Ok(())
    }

    /// Handle !balance command
    async fn handle_balance(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        msg: &Message,
    ) -> Result<()> {
        let user_id = msg.author.id.to_string();
        let mention = msg.author.mention().to_string();

        let reply = match ctx.preferences.find_decrypted(&user_id, RAT_COOKIE).await {
            Ok(Some(cookie)) => match ctx.sot.fetch_balance(&cookie).await {
                Ok(balance) => balance_reply(&mention, &balance),
                Err(SotError::AuthRejected) => expired_reply(&mention),
                Err(e) => {
                    error!("Balance lookup failed for user {user_id}: {e}");
                    format!("Sorry {mention}, I couldn't fetch your balance from the SoT API right now.")
                }
            },
            Ok(None) => no_cookie_reply(&mention),
            Err(e) => {
                error!("Failed to read RAT cookie for user {user_id}: {e}");
                format!("Sorry {mention}, {}", GENERIC_FAILURE.to_lowercase())
            }
        };

        msg.channel_id.say(&serenity_ctx.http, reply).await?;
        Ok(())
    }
}

pub fn balance_reply(mention: &str, balance: &Balance) -> String {
    format!(
        "{mention}, your current SoT balance is: {} gold, {} doubloons and {} ancient coins",
        format_thousands(balance.gold),
        format_thousands(balance.doubloons),
        format_thousands(balance.ancient_coins),
    )
}

pub fn no_cookie_reply(mention: &str) -> String {
    format!("{mention}, I don't have a RAT cookie for you yet. Send me one via DM with `!setrat <cookie>`.")
}

pub fn expired_reply(mention: &str) -> String {
    format!("{mention}, your RAT cookie seems to have expired. Please DM me a fresh one with `!setrat <cookie>`.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_reply() {
        let balance = Balance {
            gold: 1234567,
            doubloons: 1200,
            ancient_coins: 15,
        };
        assert_eq!(
            balance_reply("<@1>", &balance),
            "<@1>, your current SoT balance is: 1.234.567 gold, 1.200 doubloons and 15 ancient coins"
        );
    }

    #[test]
    fn test_hints_point_to_setrat() {
        assert!(no_cookie_reply("<@1>").contains("!setrat"));
        assert!(expired_reply("<@1>").contains("!setrat"));
    }
}
