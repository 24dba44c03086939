// Core layer - shared types and configuration
pub mod core;

// Features layer - all feature modules
pub mod features;

// Infrastructure
pub mod database;

// Application layer
pub mod command_handler;
pub mod commands;

pub use core::{AudioConfig, Config};
pub use database::Database;

pub use features::{
    // Audio
    AudioCache, AudioCacheLoader, AudioClip, AudioError,
    // Lifecycle
    BotResources, LifecycleManager, LifecycleState, PeriodicTask, ShutdownReport,
    // Rate limiting
    RateLimiter,
    // Secrets
    get_or_create_key, PreferenceStore, SecretKey,
    // Sea of Thieves
    AuthChecker, SotClient,
    // Startup
    StartupNotifier,
};
