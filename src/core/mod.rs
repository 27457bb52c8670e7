pub mod engine;
pub mod extract;
pub mod message;
pub mod sender;

pub use crate::domain::model::{AttendanceRecord, DayPeriod, DeliveryResult, OutboundMessage};
pub use crate::domain::ports::{AttendanceSource, MessageProvider};
pub use crate::utils::error::Result;
