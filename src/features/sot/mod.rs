//! # Sea of Thieves Feature
//!
//! Balance lookups and periodic RAT cookie re-authentication.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod auth_check;
pub mod client;

pub use auth_check::{AuthChecker, DirectMessageNotifier, SubjectNotifier};
pub use client::{format_thousands, AuthProbe, Balance, SotClient, SotError};
