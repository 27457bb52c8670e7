use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Portal rejected the credentials: {message}")]
    AuthenticationError { message: String },

    #[error("Could not locate attendance figure: {message}")]
    ParseError { message: String },

    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Unexpected portal response from {url}: HTTP {status}")]
    PortalStatusError { url: String, status: u16 },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{provider} rejected the message: HTTP {status}: {body}")]
    DeliveryError {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Could not reach {provider}: {source}")]
    DeliveryTransportError {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Portal,
    Delivery,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl NotifyError {
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::AuthenticationError {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingConfigError {
            field: field.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigurationError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::AuthenticationError { .. }
            | Self::ParseError { .. }
            | Self::NetworkError(_)
            | Self::PortalStatusError { .. } => ErrorCategory::Portal,
            Self::DeliveryError { .. } | Self::DeliveryTransportError { .. } => {
                ErrorCategory::Delivery
            }
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 下一次排程觸發時可能自行恢復
            Self::NetworkError(_)
            | Self::PortalStatusError { .. }
            | Self::DeliveryTransportError { .. } => ErrorSeverity::Medium,
            Self::DeliveryError { status, .. } if *status == 429 || *status >= 500 => {
                ErrorSeverity::Medium
            }
            Self::IoError(_) | Self::SerializationError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// Process exit code reported to the scheduler.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration => 2,
            ErrorCategory::Portal => 3,
            ErrorCategory::Delivery => 4,
            ErrorCategory::System => 1,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::PortalStatusError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::AuthenticationError { .. } => {
                "Login to the attendance portal failed".to_string()
            }
            Self::ParseError { .. } => {
                "The attendance page did not contain a recognizable percentage".to_string()
            }
            Self::NetworkError(_) | Self::PortalStatusError { .. } => {
                "Could not reach the attendance portal".to_string()
            }
            Self::DeliveryError { provider, status, .. } => {
                format!("{} refused the message (HTTP {})", provider, status)
            }
            Self::DeliveryTransportError { provider, .. } => {
                format!("Could not reach the {} messaging API", provider)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::AuthenticationError { .. } => {
                "Check PORTAL_USERNAME / PORTAL_PASSWORD and the portal.failure_pattern setting"
            }
            Self::ParseError { .. } => {
                "Verify portal.attendance_url points at the page showing the attendance figure"
            }
            Self::NetworkError(_) | Self::PortalStatusError { .. } => {
                "The portal may be down; the next scheduled run will try again"
            }
            Self::DeliveryError { status, .. } if *status == 401 || *status == 403 => {
                "The messaging access token is expired or invalid; rotate it"
            }
            Self::DeliveryError { status, .. } if *status == 429 => {
                "The messaging provider is rate limiting; wait for the next run"
            }
            Self::DeliveryError { .. } => {
                "Check the recipient number and the provider account status"
            }
            Self::DeliveryTransportError { .. } => {
                "The messaging provider is unreachable; check network access and provider.base_url"
            }
            Self::ConfigurationError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => {
                "Set the missing or invalid value in the config file or environment"
            }
            Self::IoError(_) | Self::SerializationError(_) => {
                "Check file permissions and the config file path"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, NotifyError>;
