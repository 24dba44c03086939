//! # Feature: Lifecycle Manager
//!
//! Drives the bot through startup, the main event loop and shutdown:
//!
//! `Uninitialized → KeyReady → ResourcesLoaded → Connected → Running →
//! ShuttingDown → Stopped`
//!
//! Every startup failure is returned to the caller, who treats it as fatal.
//! Only the announcement channel lookup and the session close on shutdown are
//! allowed to fail without stopping the state machine.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use super::gateway::{ChannelHandle, Gateway, GatewayError};
use super::signals::ProcessSignal;
use crate::core::{AudioConfig, Config};
use crate::database::Database;
use crate::features::audio::{AudioCache, AudioCacheLoader, AudioError};
use crate::features::secrets::{
    get_or_create_key, KeyError, PreferenceStore, SecretKey, FAILED_RAT_NOTIFY, FAILED_RAT_TRIES,
    RAT_COOKIE,
};
use crate::features::sot::SotClient;
use async_trait::async_trait;
use log::{error, info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    KeyReady,
    ResourcesLoaded,
    Connected,
    Running,
    ShuttingDown,
    Stopped,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot move to {to:?} from {from:?}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("encryption key unavailable: {0}")]
    Key(#[from] KeyError),

    #[error("failed to load audio clips: {0}")]
    Audio(#[from] AudioError),

    #[error("failed to initialise {what}: {reason:#}")]
    Resource {
        what: &'static str,
        reason: anyhow::Error,
    },

    #[error("failed to open gateway session: {0}")]
    Gateway(#[from] GatewayError),
}

/// Work fired on every timer tick of the main loop.
///
/// Runs detached: the loop never waits for it and never sees its result, so
/// implementations report problems through logging only.
#[async_trait]
pub trait PeriodicTask: Send + Sync + 'static {
    async fn run(&self);
}

/// Everything built between `KeyReady` and `ResourcesLoaded`
#[derive(Clone)]
pub struct BotResources {
    pub database: Database,
    pub preferences: PreferenceStore,
    pub audio: AudioCache,
    pub sot: SotClient,
}

/// Result of the shutdown path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// `None` when the signal source went away
    pub signal: Option<ProcessSignal>,
    /// Error from closing the session, logged but not fatal
    pub close_error: Option<String>,
    /// Always 0: shutdown succeeds regardless of close outcome
    pub exit_code: i32,
}

pub struct LifecycleManager<G: Gateway> {
    state: LifecycleState,
    key: Option<Arc<SecretKey>>,
    gateway: Option<G>,
    announce_channel: Option<ChannelHandle>,
}

impl<G: Gateway> Default for LifecycleManager<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Gateway> LifecycleManager<G> {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            key: None,
            gateway: None,
            announce_channel: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn announce_channel(&self) -> Option<&ChannelHandle> {
        self.announce_channel.as_ref()
    }

    pub fn gateway(&self) -> Option<&G> {
        self.gateway.as_ref()
    }

    fn expect_state(&self, expected: LifecycleState, to: LifecycleState) -> Result<(), LifecycleError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition {
                from: self.state,
                to,
            })
        }
    }

    fn transition(&mut self, to: LifecycleState) {
        info!("Lifecycle: {:?} → {:?}", self.state, to);
        self.state = to;
    }

    /// `Uninitialized → KeyReady`
    pub async fn bootstrap_key(&mut self, key_file: &Path) -> Result<Arc<SecretKey>, LifecycleError> {
        self.expect_state(LifecycleState::Uninitialized, LifecycleState::KeyReady)?;

        let key = Arc::new(get_or_create_key(key_file).await?);
        self.key = Some(Arc::clone(&key));
        self.transition(LifecycleState::KeyReady);
        Ok(key)
    }

    /// `KeyReady → ResourcesLoaded`: preference store, audio cache, API client
    pub async fn load_resources(&mut self, config: &Config) -> Result<BotResources, LifecycleError> {
        self.expect_state(LifecycleState::KeyReady, LifecycleState::ResourcesLoaded)?;
        let key = self.key.clone().ok_or(LifecycleError::InvalidTransition {
            from: self.state,
            to: LifecycleState::ResourcesLoaded,
        })?;

        let database = Database::new(&config.database_path)
            .await
            .map_err(|reason| LifecycleError::Resource {
                what: "preference database",
                reason,
            })?;
        let preferences = PreferenceStore::new(key, Arc::new(database.clone()))
            .with_reset_on_set(RAT_COOKIE, &[FAILED_RAT_NOTIFY, FAILED_RAT_TRIES]);

        let audio_config =
            AudioConfig::load(&config.audio_config_path).map_err(|reason| LifecycleError::Resource {
                what: "audio configuration",
                reason,
            })?;
        let mut loader = AudioCacheLoader::new();
        loader
            .load_all(&config.audio_dir, &audio_config.clips)
            .await?;
        let audio = loader.publish();

        let sot = SotClient::new().map_err(|reason| LifecycleError::Resource {
            what: "Sea of Thieves API client",
            reason,
        })?;

        self.transition(LifecycleState::ResourcesLoaded);
        Ok(BotResources {
            database,
            preferences,
            audio,
            sot,
        })
    }

    /// `ResourcesLoaded → Connected`. The announcement channel is optional and
    /// a failed lookup is only logged.
    pub async fn connect(
        &mut self,
        gateway: G,
        announce_channel_id: Option<u64>,
    ) -> Result<(), LifecycleError> {
        self.expect_state(LifecycleState::ResourcesLoaded, LifecycleState::Connected)?;

        if let Some(channel_id) = announce_channel_id {
            match gateway.resolve_channel(channel_id).await {
                Ok(channel) => {
                    info!("📢 Announcement channel: #{} ({})", channel.name, channel.id);
                    self.announce_channel = Some(channel);
                }
                Err(e) => error!("Failed to look up announcement channel {channel_id}: {e}"),
            }
        }

        self.gateway = Some(gateway);
        self.transition(LifecycleState::Connected);
        Ok(())
    }

    /// `Connected → Running`: register the handler and open the session.
    /// On failure the state stays `Connected`.
    pub async fn start(&mut self, handler: G::Handler) -> Result<(), LifecycleError> {
        self.expect_state(LifecycleState::Connected, LifecycleState::Running)?;
        let gateway = self.gateway.as_mut().ok_or(GatewayError::NotOpen)?;

        gateway.register_handler(handler);
        gateway.open().await?;

        self.transition(LifecycleState::Running);
        info!("Bot is ready and connected. Press CTRL-C to exit.");
        Ok(())
    }

    /// Block until a terminating signal arrives, firing `task` every `period`.
    ///
    /// Non-terminating signals are ignored. A signal-driven shutdown always
    /// reports exit code 0, even when closing the session fails. If the
    /// gateway session dies on its own the manager still shuts down, but the
    /// failure is returned as [`LifecycleError::Gateway`].
    pub async fn run_until_shutdown(
        &mut self,
        mut signals: mpsc::Receiver<ProcessSignal>,
        task: Arc<dyn PeriodicTask>,
        period: Duration,
    ) -> Result<ShutdownReport, LifecycleError> {
        self.expect_state(LifecycleState::Running, LifecycleState::ShuttingDown)?;
        let gateway = self.gateway.as_mut().ok_or(GatewayError::NotOpen)?;

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let received = loop {
            tokio::select! {
                signal = signals.recv() => match signal {
                    Some(signal) if signal.is_terminating() => {
                        info!("Received {signal} signal. Exiting.");
                        break Ok(Some(signal));
                    }
                    Some(signal) => {
                        info!("Ignoring {signal} signal");
                    }
                    None => {
                        warn!("Signal source closed, shutting down");
                        break Ok(None);
                    }
                },
                lost = gateway.stopped() => {
                    error!("Discord session lost: {lost}");
                    break Err(lost);
                }
                _ = ticker.tick() => {
                    let task = Arc::clone(&task);
                    tokio::spawn(async move {
                        task.run().await;
                    });
                }
            }
        };

        match received {
            Ok(signal) => Ok(self.shutdown(signal).await),
            Err(lost) => {
                self.shutdown(None).await;
                Err(LifecycleError::Gateway(lost))
            }
        }
    }

    /// `Running → ShuttingDown → Stopped`
    async fn shutdown(&mut self, signal: Option<ProcessSignal>) -> ShutdownReport {
        self.transition(LifecycleState::ShuttingDown);

        let close_error = match self.gateway.take() {
            Some(mut gateway) => match gateway.close().await {
                Ok(()) => None,
                Err(e) => {
                    error!("Failed to gracefully close discord session: {e}");
                    Some(e.to_string())
                }
            },
            None => None,
        };

        self.transition(LifecycleState::Stopped);
        ShutdownReport {
            signal,
            close_error,
            exit_code: 0,
        }
    }
}
