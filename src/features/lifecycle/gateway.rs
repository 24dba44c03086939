//! Messaging gateway seam used by the lifecycle manager
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use async_trait::async_trait;
use log::{error, info};
use serenity::client::bridge::gateway::ShardManager;
use serenity::http::Http;
use serenity::model::channel::Channel;
use serenity::prelude::{Client, EventHandler, GatewayIntents, Mutex};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway session is not open")]
    NotOpen,

    #[error("no event handler registered")]
    NoHandler,

    #[error("gateway session ended unexpectedly")]
    Disconnected,

    #[error("channel {0} is not a guild channel")]
    NotGuildChannel(u64),

    #[error("discord: {0}")]
    Discord(#[from] serenity::Error),
}

/// A resolved announcement channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    pub id: u64,
    pub name: String,
}

/// Connection to the chat gateway, owned by the lifecycle manager
#[async_trait]
pub trait Gateway: Send {
    type Handler: Send + 'static;

    /// Register the event handler; must happen before [`open`](Self::open)
    fn register_handler(&mut self, handler: Self::Handler);

    async fn resolve_channel(&self, channel_id: u64) -> Result<ChannelHandle, GatewayError>;

    async fn open(&mut self) -> Result<(), GatewayError>;

    async fn close(&mut self) -> Result<(), GatewayError>;

    /// Resolves once an open session dies on its own; pending while it is
    /// healthy or was never opened. Must be cancel safe.
    async fn stopped(&mut self) -> GatewayError;
}

/// Discord gateway backed by serenity
pub struct SerenityGateway<H> {
    token: String,
    intents: GatewayIntents,
    http: Arc<Http>,
    handler: Option<H>,
    shard_manager: Option<Arc<Mutex<ShardManager>>>,
    runner: Option<JoinHandle<serenity::Result<()>>>,
}

impl<H: EventHandler + 'static> SerenityGateway<H> {
    pub fn new(token: &str, intents: GatewayIntents) -> Self {
        Self {
            token: token.to_string(),
            intents,
            http: Arc::new(Http::new(token)),
            handler: None,
            shard_manager: None,
            runner: None,
        }
    }

    /// REST client usable before and after the websocket is open
    pub fn http(&self) -> Arc<Http> {
        Arc::clone(&self.http)
    }
}

#[async_trait]
impl<H: EventHandler + 'static> Gateway for SerenityGateway<H> {
    type Handler = H;

    fn register_handler(&mut self, handler: H) {
        self.handler = Some(handler);
    }

    async fn resolve_channel(&self, channel_id: u64) -> Result<ChannelHandle, GatewayError> {
        match self.http.get_channel(channel_id).await? {
            Channel::Guild(channel) => Ok(ChannelHandle {
                id: channel_id,
                name: channel.name,
            }),
            _ => Err(GatewayError::NotGuildChannel(channel_id)),
        }
    }

    async fn open(&mut self) -> Result<(), GatewayError> {
        let handler = self.handler.take().ok_or(GatewayError::NoHandler)?;

        // Fails fast on a bad token instead of inside the shard runner
        let current_user = self.http.get_current_user().await?;
        info!("Authenticated as {} ({})", current_user.name, current_user.id);

        let mut client = Client::builder(&self.token, self.intents)
            .event_handler(handler)
            .await?;
        self.shard_manager = Some(Arc::clone(&client.shard_manager));

        info!("Establishing WebSocket connection to Discord gateway...");
        self.runner = Some(tokio::spawn(async move { client.start().await }));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), GatewayError> {
        let shard_manager = self.shard_manager.take().ok_or(GatewayError::NotOpen)?;
        shard_manager.lock().await.shutdown_all().await;
        if let Some(runner) = self.runner.take() {
            runner.abort();
        }
        info!("Discord session closed");
        Ok(())
    }

    async fn stopped(&mut self) -> GatewayError {
        let Some(runner) = self.runner.as_mut() else {
            return std::future::pending().await;
        };
        let result = runner.await;
        self.runner = None;

        match result {
            Ok(Ok(())) => GatewayError::Disconnected,
            Ok(Err(why)) => {
                error!("Gateway connection failed: {why:?}");
                GatewayError::Discord(why)
            }
            Err(join_error) => {
                error!("Gateway runner aborted: {join_error}");
                GatewayError::Disconnected
            }
        }
    }
}
