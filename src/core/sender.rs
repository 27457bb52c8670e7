use crate::core::message::render_message;
use crate::domain::model::{AttendanceRecord, DayPeriod, DeliveryResult, OutboundMessage};
use crate::domain::ports::MessageProvider;
use crate::utils::error::{NotifyError, Result};
use chrono::{FixedOffset, Utc};

pub struct NotificationSender {
    provider: Box<dyn MessageProvider>,
    utc_offset: FixedOffset,
}

impl NotificationSender {
    pub fn new(provider: Box<dyn MessageProvider>, utc_offset_minutes: i32) -> Result<Self> {
        let utc_offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            NotifyError::InvalidConfigValueError {
                field: "notification.utc_offset_minutes".to_string(),
                value: utc_offset_minutes.to_string(),
                reason: "Offset out of range".to_string(),
            }
        })?;
        Ok(Self {
            provider,
            utc_offset,
        })
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Period of the current local time in the configured zone.
    pub fn current_period(&self) -> DayPeriod {
        use chrono::Timelike;
        DayPeriod::from_hour(Utc::now().with_timezone(&self.utc_offset).hour())
    }

    /// Validates the recipient and renders the body; no network access.
    pub fn prepare(
        &self,
        record: &AttendanceRecord,
        recipient: &str,
        period: DayPeriod,
    ) -> Result<OutboundMessage> {
        let recipient = self.provider.parse_recipient(recipient)?;
        let checked_at = Utc::now().with_timezone(&self.utc_offset);
        Ok(OutboundMessage {
            recipient,
            body: render_message(record, period, checked_at),
        })
    }

    /// Sends one message. Calling it twice delivers twice.
    pub async fn send(
        &self,
        record: &AttendanceRecord,
        recipient: &str,
        period: DayPeriod,
    ) -> Result<DeliveryResult> {
        let message = self.prepare(record, recipient, period)?;
        self.deliver(&message).await
    }

    pub async fn deliver(&self, message: &OutboundMessage) -> Result<DeliveryResult> {
        let result = self.provider.send(message).await?;
        tracing::info!(
            "📨 {} accepted message for {} (id: {})",
            result.provider,
            message.recipient.as_str(),
            result.message_id.as_deref().unwrap_or("n/a")
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Recipient;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingProvider {
        sent: Arc<Mutex<Vec<OutboundMessage>>>,
    }

    #[async_trait]
    impl MessageProvider for RecordingProvider {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn send(&self, message: &OutboundMessage) -> Result<DeliveryResult> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(DeliveryResult {
                provider: "recording",
                message_id: None,
                status: None,
            })
        }
    }

    fn record() -> AttendanceRecord {
        AttendanceRecord::new("student", 87.0, "Attendance: 87%").unwrap()
    }

    #[tokio::test]
    async fn test_send_is_not_idempotent() {
        let provider = RecordingProvider::default();
        let sender = NotificationSender::new(Box::new(provider.clone()), 330).unwrap();

        sender
            .send(&record(), "919876543210", DayPeriod::Morning)
            .await
            .unwrap();
        sender
            .send(&record(), "919876543210", DayPeriod::Morning)
            .await
            .unwrap();

        let sent = provider.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].recipient, Recipient::Phone("919876543210".to_string()));
        assert!(sent[0].body.contains("87%"));
    }

    #[tokio::test]
    async fn test_invalid_recipient_never_reaches_provider() {
        let provider = RecordingProvider::default();
        let sender = NotificationSender::new(Box::new(provider.clone()), 0).unwrap();

        for bad in ["+919876543210", "98765", "phone", ""] {
            let result = sender.send(&record(), bad, DayPeriod::Evening).await;
            assert!(matches!(
                result,
                Err(NotifyError::InvalidConfigValueError { .. })
            ));
        }
        assert!(provider.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_bad_offset() {
        assert!(NotificationSender::new(Box::new(RecordingProvider::default()), 24 * 60).is_err());
    }
}
