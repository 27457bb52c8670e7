use crate::utils::error::{NotifyError, Result};
use url::Url;

/// Shortest and longest digit strings accepted as a phone number with country code.
pub const MIN_PHONE_DIGITS: usize = 8;
pub const MAX_PHONE_DIGITS: usize = 15;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(NotifyError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(NotifyError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(NotifyError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| NotifyError::MissingConfigError {
        field: field_name.to_string(),
    })
}

/// Like [`validate_required_field`] but also rejects blank strings.
pub fn require_non_empty<'a>(field_name: &str, value: &'a Option<String>) -> Result<&'a str> {
    let value = validate_required_field(field_name, value)?;
    if value.trim().is_empty() {
        return Err(NotifyError::MissingConfigError {
            field: field_name.to_string(),
        });
    }
    Ok(value)
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(NotifyError::InvalidConfigValueError {
            field: field_name.to_string(),
            // 不回顯內容，欄位可能是密碼
            value: String::new(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(NotifyError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// Phone numbers must be a bare digit string including the country code.
pub fn validate_phone_number(field_name: &str, value: &str) -> Result<()> {
    let reason = if value.is_empty() {
        Some("Phone number cannot be empty".to_string())
    } else if !value.chars().all(|c| c.is_ascii_digit()) {
        Some("Phone number must contain digits only (country code included, no '+')".to_string())
    } else if value.starts_with('0') {
        Some("Phone number must start with a country code".to_string())
    } else if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&value.len()) {
        Some(format!(
            "Phone number must have between {} and {} digits",
            MIN_PHONE_DIGITS, MAX_PHONE_DIGITS
        ))
    } else {
        None
    };

    match reason {
        Some(reason) => Err(NotifyError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Telegram chat ids are integers, negative for groups and channels.
pub fn validate_chat_id(field_name: &str, value: &str) -> Result<()> {
    let digits = value.strip_prefix('-').unwrap_or(value);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(NotifyError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Chat id must be an integer".to_string(),
        });
    }
    Ok(())
}
