use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use std::sync::Arc;

use sotbot::commands::{CommandContext, CommandHandler, CommandRegistry};
use sotbot::core::Config;
use sotbot::features::lifecycle::{LifecycleManager, SerenityGateway};
use sotbot::features::lifecycle::signals;
use sotbot::features::rate_limiting::RateLimiter;
use sotbot::features::sot::{AuthChecker, DirectMessageNotifier};
use sotbot::features::startup::StartupNotifier;

struct Handler {
    command_handler: Arc<CommandHandler>,
    startup_notifier: StartupNotifier,
    clip_count: usize,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        if let Err(e) = self.command_handler.handle_message(&ctx, &msg).await {
            error!("Error handling message: {e}");
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            "✅ Bot connected as {} | Guilds: {}",
            ready.user.name,
            ready.guilds.len()
        );
        self.startup_notifier
            .send_if_enabled(&ctx.http, &ready, self.clip_count)
            .await;
    }
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e:#}");
            std::process::exit(1);
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    match run(config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Startup failed: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run(config: Config) -> Result<i32> {
    info!("Starting SoT Discord Bot v{}...", sotbot::features::get_bot_version());

    let mut lifecycle: LifecycleManager<SerenityGateway<Handler>> = LifecycleManager::new();

    lifecycle.bootstrap_key(&config.key_file).await?;
    let resources = lifecycle.load_resources(&config).await?;
    info!("🔊 Loaded {} sound clips", resources.audio.len());

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let gateway = SerenityGateway::new(&config.discord_token, intents);
    let http = gateway.http();

    lifecycle
        .connect(gateway, config.announce_channel_id)
        .await?;

    let clip_count = resources.audio.len();
    let context = CommandContext::new(
        resources.preferences.clone(),
        resources.audio.clone(),
        resources.sot.clone(),
    );
    let command_handler = CommandHandler::new(
        CommandRegistry::with_default_handlers(),
        context,
        config.command_prefix.clone(),
        RateLimiter::new(config.rate_limit_max, config.rate_limit_window),
    );
    info!(
        "📋 Registered commands: {}",
        command_handler.registry().command_names().join(", ")
    );

    let handler = Handler {
        command_handler: Arc::new(command_handler),
        startup_notifier: StartupNotifier::new(lifecycle.announce_channel().cloned()),
        clip_count,
    };
    // Must be listening before the session opens
    let signals = signals::listen()?;
    lifecycle.start(handler).await?;

    let auth_checker = AuthChecker::new(
        resources.preferences.clone(),
        Arc::new(resources.sot.clone()),
        Arc::new(DirectMessageNotifier::new(http)),
    );

    let report = lifecycle
        .run_until_shutdown(signals, Arc::new(auth_checker), config.reauth_interval)
        .await?;

    if let Some(e) = &report.close_error {
        error!("Shutdown completed with errors: {e}");
    }
    info!("Goodbye.");
    Ok(report.exit_code)
}
