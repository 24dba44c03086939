//! # Secrets Feature
//!
//! Deployment key bootstrap and encrypted per-user preferences.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod cipher;
pub mod error;
pub mod key;
pub mod store;

pub use error::{CryptoError, KeyError, PreferenceError, StorageError};
pub use key::{get_or_create_key, SecretKey, KEY_LEN};
pub use store::{PreferenceBackend, PreferenceStore};

/// Preference holding a user's Sea of Thieves RAT cookie
pub const RAT_COOKIE: &str = "rat_cookie";

/// Consecutive failed re-authentication probes
pub const FAILED_RAT_TRIES: &str = "failed_rat_tries";

/// Set once the user was told their cookie stopped working
pub const FAILED_RAT_NOTIFY: &str = "failed_rat_notify";
