use crate::core::sender::NotificationSender;
use crate::domain::model::{AttendanceRecord, DayPeriod, DeliveryResult};
use crate::domain::ports::AttendanceSource;
use crate::utils::error::Result;

/// Portal credentials and destination for one run.
#[derive(Clone)]
pub struct RunTarget {
    pub username: String,
    pub password: String,
    pub recipient: String,
}

impl std::fmt::Debug for RunTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunTarget")
            .field("username", &self.username)
            .field("password", &"***")
            .field("recipient", &self.recipient)
            .finish()
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub record: AttendanceRecord,
    pub period: DayPeriod,
    /// `None` on a dry run.
    pub delivery: Option<DeliveryResult>,
    pub body: String,
}

/// fetch → format → send, once.
pub struct NotifyEngine<S: AttendanceSource> {
    source: S,
    sender: NotificationSender,
    dry_run: bool,
}

impl<S: AttendanceSource> NotifyEngine<S> {
    pub fn new(source: S, sender: NotificationSender) -> Self {
        Self {
            source,
            sender,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn run(&self, target: &RunTarget, period: Option<DayPeriod>) -> Result<RunOutcome> {
        let period = period.unwrap_or_else(|| self.sender.current_period());
        tracing::info!("🚀 Starting {} attendance run", period.label().to_lowercase());

        tracing::info!("🔐 Fetching attendance from portal");
        let record = self
            .source
            .fetch_attendance(&target.username, &target.password)
            .await?;

        let message = self.sender.prepare(&record, &target.recipient, period)?;

        if self.dry_run {
            tracing::info!("🧪 Dry run, message not sent");
            return Ok(RunOutcome {
                record,
                period,
                delivery: None,
                body: message.body,
            });
        }

        tracing::info!("📤 Sending via {}", self.sender.provider_name());
        let delivery = self.sender.deliver(&message).await?;

        Ok(RunOutcome {
            record,
            period,
            delivery: Some(delivery),
            body: message.body,
        })
    }
}
