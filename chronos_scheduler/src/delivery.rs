use async_trait::async_trait;
use thiserror::Error;

pub const REMINDER_CHANNEL_ID: &str = "reminder_channel";
pub const REMINDER_CHANNEL_NAME: &str = "Reminders";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Notification channel is unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapAction {
    OpenApp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    pub title: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: i32,
    pub channel_id: &'static str,
    pub title: String,
    pub text: String,
    pub tap_action: TapAction,
}

impl Notification {
    pub fn from_payload(id: i32, payload: &NotificationPayload) -> Self {
        let title = if payload.title.trim().is_empty() {
            "Reminder".to_string()
        } else {
            payload.title.clone()
        };

        Self {
            id,
            channel_id: REMINDER_CHANNEL_ID,
            title,
            text: payload.notes.clone().unwrap_or_default(),
            tap_action: TapAction::OpenApp,
        }
    }
}

#[async_trait]
pub trait NotificationChannel: Send + Sync + 'static {
    async fn post(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Grants the host platform gives the application.
pub trait Capabilities: Send + Sync + 'static {
    fn can_schedule_exact_alarms(&self) -> bool;
    fn can_post_notifications(&self) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct StaticCapabilities {
    pub exact_alarms: bool,
    pub post_notifications: bool,
}

impl StaticCapabilities {
    pub fn granted() -> Self {
        Self {
            exact_alarms: true,
            post_notifications: true,
        }
    }
}

impl Capabilities for StaticCapabilities {
    fn can_schedule_exact_alarms(&self) -> bool {
        self.exact_alarms
    }

    fn can_post_notifications(&self) -> bool {
        self.post_notifications
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_title_and_missing_notes_get_defaults() {
        let payload = NotificationPayload {
            title: " ".to_string(),
            notes: None,
        };

        let notification = Notification::from_payload(7, &payload);

        assert_eq!(notification.title, "Reminder");
        assert_eq!(notification.text, "");
        assert_eq!(notification.channel_id, REMINDER_CHANNEL_ID);
        assert_eq!(notification.tap_action, TapAction::OpenApp);
    }
}
