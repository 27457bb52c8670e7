// Adapters layer: concrete implementations for the portal and the messaging providers.

pub mod cloud_api;
pub mod http;
pub mod portal;
pub mod telegram;
pub mod twilio;

use crate::config::toml_config::{HttpConfig, ProviderConfig};
use crate::domain::ports::MessageProvider;
use crate::utils::error::Result;

pub use cloud_api::CloudApiProvider;
pub use portal::PortalClient;
pub use telegram::TelegramProvider;
pub use twilio::TwilioProvider;

/// Picks the provider implementation named by `[provider] kind`.
pub fn build_provider(
    config: &ProviderConfig,
    http: &HttpConfig,
) -> Result<Box<dyn MessageProvider>> {
    let provider: Box<dyn MessageProvider> = match config {
        ProviderConfig::CloudApi(cfg) => Box::new(CloudApiProvider::new(cfg, http)?),
        ProviderConfig::Twilio(cfg) => Box::new(TwilioProvider::new(cfg, http)?),
        ProviderConfig::Telegram(cfg) => Box::new(TelegramProvider::new(cfg, http)?),
    };
    tracing::debug!("Using message provider: {}", provider.name());
    Ok(provider)
}
