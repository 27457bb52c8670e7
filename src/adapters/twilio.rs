use crate::adapters::http::{build_client, delivery_response, delivery_transport};
use crate::config::toml_config::{HttpConfig, TwilioConfig};
use crate::domain::model::{DeliveryResult, OutboundMessage};
use crate::domain::ports::MessageProvider;
use crate::utils::error::{NotifyError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

pub const DEFAULT_BASE_URL: &str = "https://api.twilio.com";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct WhatsAppRequest<'a> {
    from: String,
    to: String,
    body: &'a str,
}

/// Twilio Programmable Messaging, WhatsApp channel.
pub struct TwilioProvider {
    client: Client,
    endpoint: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioProvider {
    pub fn new(config: &TwilioConfig, http: &HttpConfig) -> Result<Self> {
        let account_sid = config
            .account_sid
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| NotifyError::missing("provider.account_sid"))?;
        let auth_token = config
            .auth_token
            .as_ref()
            .map(|s| s.expose())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| NotifyError::missing("provider.auth_token"))?;
        let from_number = config
            .from_number
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| NotifyError::missing("provider.from_number"))?;

        let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);

        Ok(Self {
            client: build_client(http, false)?,
            endpoint: format!(
                "{}/2010-04-01/Accounts/{}/Messages.json",
                base_url.trim_end_matches('/'),
                account_sid
            ),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from_number: from_number.to_string(),
        })
    }
}

fn whatsapp_address(digits: &str) -> String {
    format!("whatsapp:+{}", digits)
}

#[async_trait]
impl MessageProvider for TwilioProvider {
    fn name(&self) -> &'static str {
        "twilio"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryResult> {
        let form = WhatsAppRequest {
            from: whatsapp_address(&self.from_number),
            to: whatsapp_address(message.recipient.as_str()),
            body: &message.body,
        };

        tracing::debug!("Posting WhatsApp message via Twilio to {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(delivery_transport(self.name()))?;
        let json = delivery_response(self.name(), response).await?;

        Ok(DeliveryResult {
            provider: self.name(),
            message_id: json["sid"].as_str().map(str::to_string),
            status: json["status"].as_str().map(str::to_string),
        })
    }
}
