use crate::utils::error::{NotifyError, Result};
use crate::utils::validation::{validate_chat_id, validate_phone_number};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attendance figure scraped from the portal for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceRecord {
    pub student_identifier: String,
    pub percentage: f64,
    #[serde(skip)]
    pub raw_source: String,
}

impl AttendanceRecord {
    pub fn new(
        student_identifier: impl Into<String>,
        percentage: f64,
        raw_source: impl Into<String>,
    ) -> Result<Self> {
        if !percentage.is_finite() || !(0.0..=100.0).contains(&percentage) {
            return Err(NotifyError::parse(format!(
                "attendance value {} is outside 0-100",
                percentage
            )));
        }
        Ok(Self {
            student_identifier: student_identifier.into(),
            percentage,
            raw_source: raw_source.into(),
        })
    }

    /// `87%` for whole numbers, `87.5%` otherwise.
    pub fn percentage_label(&self) -> String {
        if self.percentage.fract() == 0.0 {
            format!("{:.0}%", self.percentage)
        } else {
            let s = format!("{:.2}", self.percentage);
            format!("{}%", s.trim_end_matches('0').trim_end_matches('.'))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPeriod {
    Morning,
    Evening,
}

impl DayPeriod {
    pub fn from_hour(hour: u32) -> Self {
        if hour < 12 {
            Self::Morning
        } else {
            Self::Evening
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Morning => "Morning",
            Self::Evening => "Evening",
        }
    }
}

impl fmt::Display for DayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for DayPeriod {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(Self::Morning),
            "evening" => Ok(Self::Evening),
            other => Err(NotifyError::InvalidConfigValueError {
                field: "period".to_string(),
                value: other.to_string(),
                reason: "Expected 'morning' or 'evening'".to_string(),
            }),
        }
    }
}

/// Validated message destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Digits only, country code first.
    Phone(String),
    Chat(String),
}

impl Recipient {
    pub fn phone(value: &str) -> Result<Self> {
        validate_phone_number("notification.recipient", value)?;
        Ok(Self::Phone(value.to_string()))
    }

    pub fn chat(value: &str) -> Result<Self> {
        validate_chat_id("notification.recipient", value)?;
        Ok(Self::Chat(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Phone(v) | Self::Chat(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub recipient: Recipient,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryResult {
    pub provider: &'static str,
    pub message_id: Option<String>,
    pub status: Option<String>,
}
