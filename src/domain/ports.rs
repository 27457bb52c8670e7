use crate::domain::model::{AttendanceRecord, DeliveryResult, OutboundMessage, Recipient};
use crate::utils::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait AttendanceSource: Send + Sync {
    async fn fetch_attendance(&self, username: &str, password: &str) -> Result<AttendanceRecord>;
}

#[async_trait]
pub trait MessageProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// WhatsApp providers address a phone number; others may override.
    fn parse_recipient(&self, raw: &str) -> Result<Recipient> {
        Recipient::phone(raw)
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryResult>;
}
