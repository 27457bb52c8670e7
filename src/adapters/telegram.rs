use crate::adapters::http::{build_client, delivery_response, delivery_transport};
use crate::config::toml_config::{HttpConfig, TelegramConfig};
use crate::domain::model::{DeliveryResult, OutboundMessage, Recipient};
use crate::domain::ports::MessageProvider;
use crate::utils::error::{NotifyError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

pub const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

pub struct TelegramProvider {
    client: Client,
    endpoint: String,
}

impl TelegramProvider {
    pub fn new(config: &TelegramConfig, http: &HttpConfig) -> Result<Self> {
        let bot_token = config
            .bot_token
            .as_ref()
            .map(|s| s.expose())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| NotifyError::missing("provider.bot_token"))?;
        let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);

        Ok(Self {
            client: build_client(http, false)?,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                base_url.trim_end_matches('/'),
                bot_token
            ),
        })
    }
}

#[async_trait]
impl MessageProvider for TelegramProvider {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn parse_recipient(&self, raw: &str) -> Result<Recipient> {
        Recipient::chat(raw)
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryResult> {
        let payload = SendMessageRequest {
            chat_id: message.recipient.as_str(),
            text: &message.body,
        };

        // endpoint 含 bot token，不寫進日誌
        tracing::debug!("Posting Telegram message to chat {}", payload.chat_id);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(delivery_transport(self.name()))?;
        let json = delivery_response(self.name(), response).await?;

        Ok(DeliveryResult {
            provider: self.name(),
            message_id: json["result"]["message_id"].as_i64().map(|id| id.to_string()),
            status: json["ok"].as_bool().map(|ok| ok.to_string()),
        })
    }
}
