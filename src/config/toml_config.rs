use crate::utils::error::{NotifyError, Result};
use crate::utils::retry::RetryPolicy;
use crate::utils::validation::{
    require_non_empty, validate_chat_id, validate_phone_number, validate_range, validate_url,
    Validate,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_LOGIN_URL: &str = "https://mgit.winnou.net/index.php";
pub const DEFAULT_ATTENDANCE_URL: &str =
    "https://mgit.winnou.net/index.php?option=com_base_studentinfo&task=details&schoolid=1&Itemid=324";

/// String that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub portal: PortalConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default = "default_login_url")]
    pub login_url: String,
    #[serde(default = "default_attendance_url")]
    pub attendance_url: String,
    pub username: Option<String>,
    pub password: Option<Secret>,
    #[serde(default = "default_username_field")]
    pub username_field: String,
    #[serde(default = "default_password_field")]
    pub password_field: String,
    /// Overrides the built-in pattern that recognises a rejected login page.
    pub failure_pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderConfig {
    CloudApi(CloudApiConfig),
    Twilio(TwilioConfig),
    Telegram(TelegramConfig),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CloudApiConfig {
    pub app_id: Option<String>,
    pub app_secret: Option<Secret>,
    pub phone_number_id: Option<String>,
    pub access_token: Option<Secret>,
    pub base_url: Option<String>,
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<Secret>,
    /// Sandbox or approved sender number, digits only.
    pub from_number: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: Option<Secret>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Phone number for WhatsApp providers, chat id for Telegram.
    pub recipient: Option<String>,
    /// Civil time zone of the schedule, in minutes east of UTC.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.to_string()
}

fn default_attendance_url() -> String {
    DEFAULT_ATTENDANCE_URL.to_string()
}

fn default_username_field() -> String {
    "username".to_string()
}

fn default_password_field() -> String {
    "password".to_string()
}

fn default_utc_offset_minutes() -> i32 {
    // IST
    330
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_delay_seconds() -> u64 {
    5
}

fn default_user_agent() -> String {
    concat!("attendance-notify/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            login_url: default_login_url(),
            attendance_url: default_attendance_url(),
            username: None,
            password: None,
            username_field: default_username_field(),
            password_field: default_password_field(),
            failure_pattern: None,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            recipient: None,
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            retry_attempts: default_retry_attempts(),
            retry_delay_seconds: default_retry_delay_seconds(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            delay: Duration::from_secs(self.retry_delay_seconds),
        }
    }
}

impl ProviderConfig {
    pub fn from_kind(kind: &str) -> Result<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "cloud_api" | "whatsapp" | "cloud" => Ok(Self::CloudApi(CloudApiConfig::default())),
            "twilio" => Ok(Self::Twilio(TwilioConfig::default())),
            "telegram" => Ok(Self::Telegram(TelegramConfig::default())),
            other => Err(NotifyError::InvalidConfigValueError {
                field: "provider.kind".to_string(),
                value: other.to_string(),
                reason: "Expected one of: cloud_api, twilio, telegram".to_string(),
            }),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::CloudApi(_) => "cloud_api",
            Self::Twilio(_) => "twilio",
            Self::Telegram(_) => "telegram",
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(NotifyError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| NotifyError::ConfigurationError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Environment-only configuration, for schedulers that inject secrets
    /// without shipping a config file.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = lookup("NOTIFY_PROVIDER").unwrap_or_else(|| "cloud_api".to_string());
        let mut config = Self {
            portal: PortalConfig::default(),
            provider: ProviderConfig::from_kind(&kind)?,
            notification: NotificationConfig::default(),
            http: HttpConfig::default(),
        };
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// 替換環境變數 (例如 ${PORTAL_PASSWORD})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    /// Overlays secrets and settings from `lookup` (normally the process
    /// environment). Values present in the lookup win over the file.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(kind) = get("NOTIFY_PROVIDER") {
            let requested = ProviderConfig::from_kind(&kind)?;
            if requested.kind() != self.provider.kind() {
                self.provider = requested;
            }
        }

        if let Some(v) = get("PORTAL_USERNAME") {
            self.portal.username = Some(v);
        }
        if let Some(v) = get("PORTAL_PASSWORD") {
            self.portal.password = Some(Secret::new(v));
        }
        if let Some(v) = get("PORTAL_LOGIN_URL") {
            self.portal.login_url = v;
        }
        if let Some(v) = get("PORTAL_ATTENDANCE_URL") {
            self.portal.attendance_url = v;
        }

        match &mut self.provider {
            ProviderConfig::CloudApi(cfg) => {
                if let Some(v) = get("WHATSAPP_APP_ID") {
                    cfg.app_id = Some(v);
                }
                if let Some(v) = get("WHATSAPP_APP_SECRET") {
                    cfg.app_secret = Some(Secret::new(v));
                }
                if let Some(v) = get("WHATSAPP_PHONE_NUMBER_ID") {
                    cfg.phone_number_id = Some(v);
                }
                if let Some(v) = get("WHATSAPP_ACCESS_TOKEN") {
                    cfg.access_token = Some(Secret::new(v));
                }
            }
            ProviderConfig::Twilio(cfg) => {
                if let Some(v) = get("TWILIO_ACCOUNT_SID") {
                    cfg.account_sid = Some(v);
                }
                if let Some(v) = get("TWILIO_AUTH_TOKEN") {
                    cfg.auth_token = Some(Secret::new(v));
                }
                if let Some(v) = get("TWILIO_FROM_NUMBER") {
                    cfg.from_number = Some(v);
                }
            }
            ProviderConfig::Telegram(cfg) => {
                if let Some(v) = get("TELEGRAM_BOT_TOKEN") {
                    cfg.bot_token = Some(Secret::new(v));
                }
                if let Some(v) = get("TELEGRAM_CHAT_ID") {
                    self.notification.recipient = Some(v);
                }
            }
        }

        if let Some(v) = get("RECIPIENT_NUMBER") {
            self.notification.recipient = Some(v);
        }

        if let Some(v) = get("HTTP_TIMEOUT_SECONDS") {
            self.http.timeout_seconds = parse_number("HTTP_TIMEOUT_SECONDS", &v)?;
        }
        if let Some(v) = get("UTC_OFFSET_MINUTES") {
            self.notification.utc_offset_minutes = parse_number("UTC_OFFSET_MINUTES", &v)?;
        }

        Ok(())
    }

    pub fn portal_username(&self) -> Result<&str> {
        require_non_empty("portal.username", &self.portal.username)
    }

    pub fn portal_password(&self) -> Result<&str> {
        match &self.portal.password {
            Some(secret) if !secret.expose().is_empty() => Ok(secret.expose()),
            _ => Err(NotifyError::missing("portal.password")),
        }
    }

    pub fn recipient(&self) -> Result<&str> {
        require_non_empty("notification.recipient", &self.notification.recipient)
    }

    /// 驗證配置的合理性，須在任何網路請求之前呼叫
    pub fn validate_config(&self) -> Result<()> {
        validate_url("portal.login_url", &self.portal.login_url)?;
        validate_url("portal.attendance_url", &self.portal.attendance_url)?;
        self.portal_username()?;
        self.portal_password()?;

        if let Some(pattern) = &self.portal.failure_pattern {
            regex::Regex::new(pattern).map_err(|e| NotifyError::InvalidConfigValueError {
                field: "portal.failure_pattern".to_string(),
                value: pattern.clone(),
                reason: e.to_string(),
            })?;
        }

        let recipient = self.recipient()?;
        match &self.provider {
            ProviderConfig::CloudApi(cfg) => {
                require_non_empty("provider.phone_number_id", &cfg.phone_number_id)?;
                require_secret("provider.access_token", &cfg.access_token)?;
                if let Some(base_url) = &cfg.base_url {
                    validate_url("provider.base_url", base_url)?;
                }
                validate_phone_number("notification.recipient", recipient)?;
            }
            ProviderConfig::Twilio(cfg) => {
                require_non_empty("provider.account_sid", &cfg.account_sid)?;
                require_secret("provider.auth_token", &cfg.auth_token)?;
                let from = require_non_empty("provider.from_number", &cfg.from_number)?;
                validate_phone_number("provider.from_number", from)?;
                if let Some(base_url) = &cfg.base_url {
                    validate_url("provider.base_url", base_url)?;
                }
                validate_phone_number("notification.recipient", recipient)?;
            }
            ProviderConfig::Telegram(cfg) => {
                require_secret("provider.bot_token", &cfg.bot_token)?;
                if let Some(base_url) = &cfg.base_url {
                    validate_url("provider.base_url", base_url)?;
                }
                validate_chat_id("notification.recipient", recipient)?;
            }
        }

        validate_range("http.timeout_seconds", self.http.timeout_seconds, 1, 300)?;
        validate_range("http.retry_attempts", self.http.retry_attempts, 0, 10)?;
        validate_range(
            "notification.utc_offset_minutes",
            self.notification.utc_offset_minutes,
            -12 * 60,
            14 * 60,
        )?;

        Ok(())
    }
}

fn require_secret<'a>(field_name: &str, value: &'a Option<Secret>) -> Result<&'a str> {
    match value {
        Some(secret) if !secret.expose().trim().is_empty() => Ok(secret.expose()),
        _ => Err(NotifyError::missing(field_name)),
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| NotifyError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Expected a number".to_string(),
        })
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
