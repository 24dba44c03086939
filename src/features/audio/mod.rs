//! # Audio Feature
//!
//! In-memory cache of pre-loaded DCA audio clips.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//! - **Toggleable**: true

pub mod cache;

pub use cache::{AudioCache, AudioCacheLoader, AudioClip, AudioError};
