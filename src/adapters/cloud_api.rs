use crate::adapters::http::{build_client, delivery_response, delivery_transport};
use crate::config::toml_config::{CloudApiConfig, HttpConfig};
use crate::domain::model::{DeliveryResult, OutboundMessage};
use crate::domain::ports::MessageProvider;
use crate::utils::error::{NotifyError, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Serialize;
use sha2::Sha256;

pub const DEFAULT_BASE_URL: &str = "https://graph.facebook.com";
pub const DEFAULT_API_VERSION: &str = "v21.0";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize)]
struct TextMessageRequest<'a> {
    messaging_product: &'static str,
    recipient_type: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextBody<'a>,
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    preview_url: bool,
    body: &'a str,
}

/// WhatsApp Business Cloud API sender.
pub struct CloudApiProvider {
    client: Client,
    endpoint: String,
    access_token: String,
    appsecret_proof: Option<String>,
}

impl CloudApiProvider {
    pub fn new(config: &CloudApiConfig, http: &HttpConfig) -> Result<Self> {
        let phone_number_id = config
            .phone_number_id
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| NotifyError::missing("provider.phone_number_id"))?;
        let access_token = config
            .access_token
            .as_ref()
            .map(|s| s.expose())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| NotifyError::missing("provider.access_token"))?;

        let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let api_version = config.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION);
        let endpoint = format!(
            "{}/{}/{}/messages",
            base_url.trim_end_matches('/'),
            api_version,
            phone_number_id
        );

        if let Some(app_id) = &config.app_id {
            tracing::debug!("Cloud API app id: {}", app_id);
        }

        Ok(Self {
            client: build_client(http, false)?,
            endpoint,
            access_token: access_token.to_string(),
            appsecret_proof: config
                .app_secret
                .as_ref()
                .map(|secret| appsecret_proof(secret.expose(), access_token)),
        })
    }
}

/// `hex(HMAC-SHA256(app_secret, access_token))`, required when the app
/// enforces "Require App Secret" on Graph API calls.
pub fn appsecret_proof(app_secret: &str, access_token: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(app_secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(access_token.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[async_trait]
impl MessageProvider for CloudApiProvider {
    fn name(&self) -> &'static str {
        "cloud_api"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryResult> {
        let payload = TextMessageRequest {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to: message.recipient.as_str(),
            kind: "text",
            text: TextBody {
                preview_url: false,
                body: &message.body,
            },
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&payload);
        if let Some(proof) = &self.appsecret_proof {
            request = request.query(&[("appsecret_proof", proof)]);
        }

        tracing::debug!("Posting WhatsApp message to {}", self.endpoint);
        let response = request
            .send()
            .await
            .map_err(delivery_transport(self.name()))?;
        let json = delivery_response(self.name(), response).await?;

        Ok(DeliveryResult {
            provider: self.name(),
            message_id: json["messages"][0]["id"].as_str().map(str::to_string),
            status: json["messages"][0]["message_status"]
                .as_str()
                .map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::Secret;
    use crate::domain::model::Recipient;
    use httpmock::prelude::*;

    fn config(base_url: String) -> CloudApiConfig {
        CloudApiConfig {
            app_id: Some("1234".to_string()),
            app_secret: Some(Secret::new("appsecret")),
            phone_number_id: Some("10987654321".to_string()),
            access_token: Some(Secret::new("EAAG-token")),
            base_url: Some(base_url),
            api_version: None,
        }
    }

    #[test]
    fn test_appsecret_proof_is_hex_sha256() {
        let proof = appsecret_proof("appsecret", "EAAG-token");
        assert_eq!(proof.len(), 64);
        assert!(proof.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(proof, appsecret_proof("appsecret", "EAAG-token"));
        assert_ne!(proof, appsecret_proof("other", "EAAG-token"));
    }

    #[test]
    fn test_missing_token_is_configuration_error() {
        let mut cfg = config("https://graph.example".to_string());
        cfg.access_token = None;
        assert!(matches!(
            CloudApiProvider::new(&cfg, &HttpConfig::default()),
            Err(NotifyError::MissingConfigError { .. })
        ));
    }

    #[tokio::test]
    async fn test_send_text_message() {
        let server = MockServer::start();
        let proof = appsecret_proof("appsecret", "EAAG-token");
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v21.0/10987654321/messages")
                .header("authorization", "Bearer EAAG-token")
                .query_param("appsecret_proof", proof.as_str())
                .json_body(serde_json::json!({
                    "messaging_product": "whatsapp",
                    "recipient_type": "individual",
                    "to": "919876543210",
                    "type": "text",
                    "text": {"preview_url": false, "body": "Attendance: 87%"}
                }));
            then.status(200).json_body(serde_json::json!({
                "messaging_product": "whatsapp",
                "contacts": [{"input": "919876543210", "wa_id": "919876543210"}],
                "messages": [{"id": "wamid.HBgM"}]
            }));
        });

        let provider = CloudApiProvider::new(&config(server.base_url()), &HttpConfig::default())
            .unwrap();
        let result = provider
            .send(&OutboundMessage {
                recipient: Recipient::phone("919876543210").unwrap(),
                body: "Attendance: 87%".to_string(),
            })
            .await
            .unwrap();

        mock.assert();
        assert_eq!(result.provider, "cloud_api");
        assert_eq!(result.message_id.as_deref(), Some("wamid.HBgM"));
    }

    #[tokio::test]
    async fn test_expired_token_is_delivery_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v21.0/10987654321/messages");
            then.status(401).json_body(serde_json::json!({
                "error": {"message": "Error validating access token: Session has expired", "code": 190}
            }));
        });

        let provider = CloudApiProvider::new(&config(server.base_url()), &HttpConfig::default())
            .unwrap();
        let result = provider
            .send(&OutboundMessage {
                recipient: Recipient::phone("919876543210").unwrap(),
                body: "hi".to_string(),
            })
            .await;

        match result {
            Err(NotifyError::DeliveryError { provider, status, body }) => {
                assert_eq!(provider, "cloud_api");
                assert_eq!(status, 401);
                assert!(body.contains("Session has expired"));
            }
            other => panic!("expected delivery error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_api_hides_url_secrets() {
        let provider = CloudApiProvider::new(
            &config("http://127.0.0.1:9".to_string()),
            &HttpConfig::default(),
        )
        .unwrap();
        let proof = appsecret_proof("appsecret", "EAAG-token");

        let err = provider
            .send(&OutboundMessage {
                recipient: Recipient::phone("919876543210").unwrap(),
                body: "hi".to_string(),
            })
            .await
            .unwrap_err();

        // appsecret_proof 是 query 參數，錯誤訊息不可帶出 URL
        let rendered = format!("{} {:?}", err, err);
        assert!(!rendered.contains(&proof));
        assert!(!rendered.contains("EAAG-token"));
        assert_eq!(err.exit_code(), 4);
    }
}
