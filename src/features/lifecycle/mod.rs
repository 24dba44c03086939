//! # Lifecycle Feature
//!
//! Startup ordering, signal-driven shutdown and the periodic timer loop.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod gateway;
pub mod manager;
pub mod signals;

pub use gateway::{ChannelHandle, Gateway, GatewayError, SerenityGateway};
pub use manager::{
    BotResources, LifecycleError, LifecycleManager, LifecycleState, PeriodicTask, ShutdownReport,
};
pub use signals::ProcessSignal;
