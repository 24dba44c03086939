//! Shared context for command handlers
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use crate::features::audio::AudioCache;
use crate::features::secrets::PreferenceStore;
use crate::features::sot::SotClient;
use chrono::{DateTime, Local};

/// Services handed to every command task.
///
/// Built once by the binary after startup; all fields are read-only or
/// internally synchronized.
#[derive(Clone)]
pub struct CommandContext {
    pub preferences: PreferenceStore,
    pub audio: AudioCache,
    pub sot: SotClient,
    pub start_time: DateTime<Local>,
}

impl CommandContext {
    pub fn new(preferences: PreferenceStore, audio: AudioCache, sot: SotClient) -> Self {
        Self {
            preferences,
            audio,
            sot,
            start_time: Local::now(),
        }
    }
}
