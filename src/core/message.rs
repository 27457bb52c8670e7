use crate::domain::model::{AttendanceRecord, DayPeriod};
use chrono::{DateTime, FixedOffset};

/// Renders the fixed notification template.
pub fn render_message(
    record: &AttendanceRecord,
    period: DayPeriod,
    checked_at: DateTime<FixedOffset>,
) -> String {
    format!(
        "📊 Good {period}! Attendance Update\n\n\
         Student: {student}\n\
         Current attendance: *{percentage}*\n\n\
         Checked at: {checked_at}\n\
         Sent automatically by attendance-notify",
        period = period.label(),
        student = record.student_identifier,
        percentage = record.percentage_label(),
        checked_at = checked_at.format("%Y-%m-%d %H:%M (UTC%:z)"),
    )
}
