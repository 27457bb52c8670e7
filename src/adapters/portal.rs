use crate::adapters::http::build_client;
use crate::config::toml_config::{HttpConfig, PortalConfig};
use crate::core::extract::{
    default_failure_pattern, extract_percentage, has_password_input, page_text, parse_login_form,
};
use crate::domain::model::AttendanceRecord;
use crate::domain::ports::AttendanceSource;
use crate::utils::error::{NotifyError, Result};
use crate::utils::retry::{with_retry, RetryPolicy};
use crate::utils::validation::validate_non_empty_string;
use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use url::Url;

/// Session-based client for the attendance portal.
pub struct PortalClient {
    login_url: Url,
    attendance_url: Url,
    username_field: String,
    password_field: String,
    failure_pattern: Regex,
    http: HttpConfig,
    retry: RetryPolicy,
}

impl PortalClient {
    pub fn new(portal: &PortalConfig, http: &HttpConfig) -> Result<Self> {
        let failure_pattern = match &portal.failure_pattern {
            Some(pattern) => {
                Regex::new(pattern).map_err(|e| NotifyError::InvalidConfigValueError {
                    field: "portal.failure_pattern".to_string(),
                    value: pattern.clone(),
                    reason: e.to_string(),
                })?
            }
            None => default_failure_pattern().clone(),
        };

        Ok(Self {
            login_url: parse_url("portal.login_url", &portal.login_url)?,
            attendance_url: parse_url("portal.attendance_url", &portal.attendance_url)?,
            username_field: portal.username_field.clone(),
            password_field: portal.password_field.clone(),
            failure_pattern,
            http: http.clone(),
            retry: http.retry_policy(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_once(&self, username: &str, password: &str) -> Result<AttendanceRecord> {
        // 每次嘗試都使用新的 cookie jar
        let client = build_client(&self.http, true)?;

        self.login(&client, username, password).await?;

        tracing::debug!("Requesting attendance page: {}", self.attendance_url);
        let response = client.get(self.attendance_url.clone()).send().await?;
        let status = response.status();
        let final_url = response.url().to_string();
        tracing::debug!("Attendance page status: {} ({})", status, final_url);

        if is_auth_status(status) {
            return Err(NotifyError::authentication(format!(
                "attendance page returned HTTP {}",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(NotifyError::PortalStatusError {
                url: final_url,
                status: status.as_u16(),
            });
        }

        let html = response.text().await?;
        if has_password_input(&html) {
            return Err(NotifyError::authentication(
                "portal redirected to the login form instead of the attendance page",
            ));
        }

        let text = page_text(&html);
        let percentage = extract_percentage(&text).ok_or_else(|| {
            NotifyError::parse(format!(
                "no attendance percentage found on {} ({} bytes)",
                final_url,
                html.len()
            ))
        })?;

        AttendanceRecord::new(username, percentage, html)
    }

    async fn login(&self, client: &Client, username: &str, password: &str) -> Result<()> {
        tracing::debug!("Loading login page: {}", self.login_url);
        let response = client.get(self.login_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::PortalStatusError {
                url: self.login_url.to_string(),
                status: status.as_u16(),
            });
        }
        let page_url = response.url().clone();
        let login_page = response.text().await?;

        let form = parse_login_form(&login_page);
        let action = match form.action.as_deref() {
            Some(action) => page_url
                .join(action)
                .map_err(|e| NotifyError::parse(format!("login form action {}: {}", action, e)))?,
            None => self.login_url.clone(),
        };

        let mut fields = form.hidden_fields;
        fields.retain(|(name, _)| name != &self.username_field && name != &self.password_field);
        fields.push((self.username_field.clone(), username.to_string()));
        fields.push((self.password_field.clone(), password.to_string()));

        tracing::debug!(
            "Submitting login form to {} with {} fields",
            action,
            fields.len()
        );
        let response = client.post(action.clone()).form(&fields).send().await?;
        let status = response.status();

        if is_auth_status(status) {
            return Err(NotifyError::authentication(format!(
                "login returned HTTP {}",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(NotifyError::PortalStatusError {
                url: action.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let text = page_text(&body);
        if let Some(found) = self.failure_pattern.find(&text) {
            return Err(NotifyError::authentication(format!(
                "portal reported '{}'",
                found.as_str()
            )));
        }
        if has_password_input(&body) {
            return Err(NotifyError::authentication(
                "login form was shown again after submitting credentials",
            ));
        }

        tracing::debug!("Portal login accepted");
        Ok(())
    }
}

#[async_trait]
impl AttendanceSource for PortalClient {
    async fn fetch_attendance(&self, username: &str, password: &str) -> Result<AttendanceRecord> {
        validate_non_empty_string("portal.username", username)?;
        validate_non_empty_string("portal.password", password)?;

        let record = with_retry(self.retry, "portal fetch", move || {
            self.fetch_once(username, password)
        })
        .await?;

        tracing::info!(
            "📊 Attendance for {}: {}",
            record.student_identifier,
            record.percentage_label()
        );
        Ok(record)
    }
}

fn is_auth_status(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

fn parse_url(field: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| NotifyError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: format!("Invalid URL format: {}", e),
    })
}
