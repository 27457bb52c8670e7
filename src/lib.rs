pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{build_provider, PortalClient};
pub use config::{AppConfig, ProviderConfig};
pub use core::{
    engine::{NotifyEngine, RunOutcome, RunTarget},
    sender::NotificationSender,
};
pub use utils::error::{NotifyError, Result};
