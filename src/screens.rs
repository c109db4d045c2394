use std::fmt::Write;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use chronos_app::{GreetingState, ReminderEditState};
use chronos_models::{reminder::Reminder, user::UserInfo};
use chronos_scheduler::Notification;

const DATE_TIME_FORMAT: &str = "%d %b %Y, %I:%M %p";

/// Text renderings of the application screens. Pure functions of state.
#[derive(Clone, Copy)]
pub struct Screens {
    timezone: Tz,
}

impl Screens {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn format_time(&self, time: &DateTime<Utc>) -> String {
        time.with_timezone(&self.timezone)
            .format(DATE_TIME_FORMAT)
            .to_string()
    }

    pub fn header(&self, user: Option<&UserInfo>) -> String {
        let name = user
            .and_then(|user| user.display_name.as_deref().or(user.email.as_deref()))
            .unwrap_or("Guest");

        format!("Chronos - Your AI Agent [{name}]")
    }

    pub fn reminder_list(&self, connected: bool, reminders: &[Reminder]) -> String {
        if !connected {
            return "No Internet Connection".to_string();
        }
        if reminders.is_empty() {
            return "Reminders\n  No Reminder, use `new` to add a reminder".to_string();
        }

        let mut out = String::from("Reminders");
        for (index, reminder) in reminders.iter().enumerate() {
            let _ = write!(
                out,
                "\n  {}. {}  ({})",
                index + 1,
                reminder.title,
                self.format_time(reminder.fire_at.time())
            );
            if let Some(notes) = reminder.notes.as_deref().filter(|n| !n.is_empty()) {
                let _ = write!(out, "\n     {notes}");
            }
            if let Some(image_url) = &reminder.image_url {
                let _ = write!(out, "\n     image: {image_url}");
            }
        }
        out
    }

    pub fn edit_dialog(&self, state: &ReminderEditState, can_save: bool) -> String {
        let heading = if state.is_new() {
            "Add Reminder"
        } else {
            "Edit Reminder"
        };
        let image = if state.uploading {
            "Uploading...".to_string()
        } else {
            state
                .image_url
                .clone()
                .unwrap_or_else(|| "none".to_string())
        };
        let save = if can_save { "[save]" } else { "[save disabled]" };

        format!(
            "{heading}\n  Title: {}\n  Notes (optional): {}\n  Date/Time: {}\n  Image: {image}\n  {save} [cancel]",
            state.title,
            state.notes,
            self.format_time(state.fire_at.time())
        )
    }

    /// The share sheet for a successful greeting, or the failure message.
    pub fn greeting(&self, state: &GreetingState) -> String {
        match state {
            GreetingState::Idle => String::new(),
            GreetingState::Loading => "Fetching message...".to_string(),
            GreetingState::Success(message) => format!("Share AI Message\n{message}"),
            GreetingState::Error(message) => format!("Could not fetch message: {message}"),
        }
    }

    pub fn notification(&self, notification: &Notification) -> String {
        if notification.text.is_empty() {
            format!("\u{1F514} {}", notification.title)
        } else {
            format!("\u{1F514} {}\n   {}", notification.title, notification.text)
        }
    }
}

#[cfg(test)]
mod tests {
    use chronos_app::DefaultOffset;
    use chronos_models::reminder::ReminderFireTime;

    use super::*;

    fn screens() -> Screens {
        Screens::new(chrono_tz::Europe::Prague)
    }

    fn reminder() -> Reminder {
        Reminder {
            id: "r1".to_string(),
            title: "Dentist".to_string(),
            // 2025-06-15 08:30 UTC
            fire_at: ReminderFireTime::from_millis(1_749_976_200_000).unwrap(),
            notes: Some("Bring card".to_string()),
            image_url: None,
        }
    }

    #[test]
    fn offline_list_shows_placeholder() {
        let rendered = screens().reminder_list(false, &[reminder()]);

        assert_eq!(rendered, "No Internet Connection");
    }

    #[test]
    fn times_render_in_display_timezone() {
        let rendered = screens().reminder_list(true, &[reminder()]);

        assert!(rendered.contains("1. Dentist  (15 Jun 2025, 10:30 AM)"), "{rendered}");
        assert!(rendered.contains("Bring card"));
    }

    #[test]
    fn empty_list_invites_to_add() {
        let rendered = screens().reminder_list(true, &[]);

        assert!(rendered.contains("No Reminder"));
    }

    #[test]
    fn dialog_shows_disabled_save_and_upload_progress() {
        let now = DateTime::from_timestamp_millis(0).unwrap();
        let mut state = ReminderEditState::blank(now, DefaultOffset::MULTIPLIED);
        state.uploading = true;

        let rendered = screens().edit_dialog(&state, false);

        assert!(rendered.starts_with("Add Reminder"));
        assert!(rendered.contains("Uploading..."));
        assert!(rendered.contains("[save disabled]"));
    }

    #[test]
    fn header_falls_back_to_guest() {
        assert_eq!(screens().header(None), "Chronos - Your AI Agent [Guest]");
    }
}
