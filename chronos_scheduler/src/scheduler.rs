use async_trait::async_trait;
use chronos_models::reminder::{Reminder, ReminderFireTime, ReminderId};
use thiserror::Error;

use crate::delivery::NotificationPayload;

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("Firing time is not in the future (delay {delay_ms} ms)")]
    InPast { delay_ms: i64 },

    #[error("Exact alarm capability is not granted")]
    ExactAlarmDenied,
}

#[derive(Debug, Clone)]
pub struct ArmRequest {
    pub reminder_id: ReminderId,
    pub fire_at: ReminderFireTime,
    pub payload: NotificationPayload,
}

impl ArmRequest {
    pub fn for_reminder(reminder: &Reminder) -> Self {
        Self {
            reminder_id: reminder.id.clone(),
            fire_at: reminder.fire_at,
            payload: NotificationPayload {
                title: reminder.title.clone(),
                notes: reminder.notes.clone(),
            },
        }
    }
}

/// One-shot timers, at most one armed per alarm key.
#[async_trait]
pub trait AlarmScheduler: Send + Sync + 'static {
    /// Registers a timer, replacing any pending one for the same key.
    async fn arm(&self, request: ArmRequest) -> Result<(), SchedulingError>;

    /// Removes a pending timer. Cancelling an unknown id does nothing.
    async fn cancel(&self, reminder_id: &str);

    async fn armed(&self) -> Vec<ReminderId>;
}
