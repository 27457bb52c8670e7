use crate::config::toml_config::HttpConfig;
use crate::utils::error::{NotifyError, Result};
use reqwest::{Client, Response};

/// Client with the run-wide timeout and user agent. Portal sessions pass
/// `cookies = true` so the login cookie carries over to the data request.
pub fn build_client(http: &HttpConfig, cookies: bool) -> Result<Client> {
    let client = Client::builder()
        .timeout(http.timeout())
        .user_agent(http.user_agent.as_str())
        .cookie_store(cookies)
        .build()?;
    Ok(client)
}

/// Maps a provider transport failure to a delivery error. The request URL is
/// dropped since provider endpoints can carry tokens or signatures.
pub fn delivery_transport(provider: &'static str) -> impl FnOnce(reqwest::Error) -> NotifyError {
    move |e| NotifyError::DeliveryTransportError {
        provider,
        source: e.without_url(),
    }
}

/// Turns a provider's non-success response into a [`NotifyError::DeliveryError`],
/// otherwise returns the JSON body (or `Null` when it is not JSON).
pub async fn delivery_response(
    provider: &'static str,
    response: Response,
) -> Result<serde_json::Value> {
    let status = response.status();
    let body = response.text().await.map_err(delivery_transport(provider))?;
    tracing::debug!("{} response status: {}", provider, status);

    if !status.is_success() {
        return Err(NotifyError::DeliveryError {
            provider,
            status: status.as_u16(),
            body: truncate(&body, 512),
        });
    }

    Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::Null))
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }
}
