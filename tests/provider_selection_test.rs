use anyhow::Result;
use attendance_notify::core::DayPeriod;
use attendance_notify::utils::validation::Validate;
use attendance_notify::{
    build_provider, AppConfig, NotificationSender, NotifyEngine, PortalClient, RunTarget,
};
use httpmock::prelude::*;
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

fn mount_portal(server: &MockServer, attendance_html: &'static str) {
    server.mock(|when, then| {
        when.method(GET).path("/login");
        then.status(200).body(
            r#"<form method="post"><input name="user"><input type="password" name="pass"></form>"#,
        );
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/login")
            .x_www_form_urlencoded_tuple("user", "student")
            .x_www_form_urlencoded_tuple("pass", "pw");
        then.status(200).body("<p>Dashboard</p>");
    });
    server.mock(|when, then| {
        when.method(GET).path("/attendance");
        then.status(200).body(attendance_html);
    });
}

async fn run_once(config: &AppConfig, period: DayPeriod) -> Result<String> {
    config.validate()?;
    let portal = PortalClient::new(&config.portal, &config.http)?;
    let provider = build_provider(&config.provider, &config.http)?;
    let sender = NotificationSender::new(provider, config.notification.utc_offset_minutes)?;
    let target = RunTarget {
        username: config.portal_username()?.to_string(),
        password: config.portal_password()?.to_string(),
        recipient: config.recipient()?.to_string(),
    };
    let outcome = NotifyEngine::new(portal, sender).run(&target, Some(period)).await?;
    Ok(outcome.body)
}

/// Secrets come from the environment while the file only names the provider.
#[tokio::test]
async fn test_cloud_api_from_file_with_secret_overlay() -> Result<()> {
    let portal = MockServer::start();
    let graph = MockServer::start();
    mount_portal(&portal, "<div>Attendance : 1180/1302 (90.63)</div>");

    let send = graph.mock(|when, then| {
        when.method(POST)
            .path("/v21.0/5550001/messages")
            .header("authorization", "Bearer EAAG-live")
            .json_body_partial(r#"{"to": "919876543210", "type": "text"}"#)
            .body_contains("90.63%");
        then.status(200)
            .json_body(serde_json::json!({"messages": [{"id": "wamid.1"}]}));
    });

    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
[portal]
login_url = "{}"
attendance_url = "{}"
username_field = "user"
password_field = "pass"

[provider]
kind = "cloud_api"
phone_number_id = "5550001"
base_url = "{}"

[http]
retry_attempts = 0
"#,
        portal.url("/login"),
        portal.url("/attendance"),
        graph.base_url()
    )?;

    let secrets: HashMap<&str, &str> = HashMap::from([
        ("PORTAL_USERNAME", "student"),
        ("PORTAL_PASSWORD", "pw"),
        ("WHATSAPP_ACCESS_TOKEN", "EAAG-live"),
        ("RECIPIENT_NUMBER", "919876543210"),
    ]);
    let mut config = AppConfig::from_file(file.path())?;
    config.apply_overrides(|key| secrets.get(key).map(|v| v.to_string()))?;

    let body = run_once(&config, DayPeriod::Evening).await?;

    send.assert();
    assert!(body.contains("Good Evening"));
    Ok(())
}

/// Telegram delivery keyed by chat id instead of a phone number.
#[tokio::test]
async fn test_telegram_environment_only() -> Result<()> {
    let portal = MockServer::start();
    let telegram = MockServer::start();
    mount_portal(&portal, "<p>Attendance: 72%</p>");

    let send = telegram.mock(|when, then| {
        when.method(POST)
            .path("/bot42:token/sendMessage")
            .json_body_partial(r#"{"chat_id": "-1001234"}"#)
            .body_contains("72%");
        then.status(200)
            .json_body(serde_json::json!({"ok": true, "result": {"message_id": 7}}));
    });

    let env: HashMap<String, String> = HashMap::from([
        ("NOTIFY_PROVIDER".to_string(), "telegram".to_string()),
        ("PORTAL_USERNAME".to_string(), "student".to_string()),
        ("PORTAL_PASSWORD".to_string(), "pw".to_string()),
        ("PORTAL_LOGIN_URL".to_string(), portal.url("/login")),
        ("PORTAL_ATTENDANCE_URL".to_string(), portal.url("/attendance")),
        ("TELEGRAM_BOT_TOKEN".to_string(), "42:token".to_string()),
        ("TELEGRAM_CHAT_ID".to_string(), "-1001234".to_string()),
    ]);
    let mut config = AppConfig::from_lookup(|key| env.get(key).cloned())?;
    config.portal.username_field = "user".to_string();
    config.portal.password_field = "pass".to_string();
    config.http.retry_attempts = 0;
    if let attendance_notify::ProviderConfig::Telegram(cfg) = &mut config.provider {
        cfg.base_url = Some(telegram.base_url());
    }

    run_once(&config, DayPeriod::Morning).await?;

    send.assert();
    Ok(())
}

/// A recipient with a leading '+' fails validation before any request.
#[tokio::test]
async fn test_invalid_recipient_fails_before_network() -> Result<()> {
    let portal = MockServer::start();
    let login = portal.mock(|when, then| {
        when.path("/login");
        then.status(200);
    });

    let env: HashMap<String, String> = HashMap::from([
        ("NOTIFY_PROVIDER".to_string(), "twilio".to_string()),
        ("PORTAL_USERNAME".to_string(), "student".to_string()),
        ("PORTAL_PASSWORD".to_string(), "pw".to_string()),
        ("PORTAL_LOGIN_URL".to_string(), portal.url("/login")),
        ("TWILIO_ACCOUNT_SID".to_string(), "AC1".to_string()),
        ("TWILIO_AUTH_TOKEN".to_string(), "tok".to_string()),
        ("TWILIO_FROM_NUMBER".to_string(), "14155238886".to_string()),
        ("RECIPIENT_NUMBER".to_string(), "+91 98765 43210".to_string()),
    ]);
    let config = AppConfig::from_lookup(|key| env.get(key).cloned())?;

    let result = run_once(&config, DayPeriod::Morning).await;

    assert!(result.is_err());
    login.assert_hits(0);
    Ok(())
}
