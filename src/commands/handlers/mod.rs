//! Prefix command handler implementations
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

pub mod audio;
pub mod sot;
pub mod utility;

pub use audio::AudioHandler;
pub use sot::SotHandler;
pub use utility::UtilityHandler;
