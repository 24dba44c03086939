//! # Features
//!
//! Each feature lives in its own module with a version header.

pub mod audio;
pub mod lifecycle;
pub mod rate_limiting;
pub mod secrets;
pub mod sot;
pub mod startup;

pub use audio::{AudioCache, AudioCacheLoader, AudioClip, AudioError};
pub use lifecycle::{
    BotResources, LifecycleManager, LifecycleState, PeriodicTask, ProcessSignal, ShutdownReport,
};
pub use rate_limiting::RateLimiter;
pub use secrets::{get_or_create_key, PreferenceStore, SecretKey};
pub use sot::{AuthChecker, SotClient};
pub use startup::StartupNotifier;

/// Bot version from Cargo.toml
pub fn get_bot_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
