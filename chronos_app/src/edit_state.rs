use chrono::{DateTime, TimeDelta, Utc};
use chronos_models::reminder::{Reminder, ReminderFireTime, ReminderId};
use chronos_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Title must not be blank")]
    BlankTitle,

    #[error("Reminder time must be in the future")]
    NotInFuture,

    #[error("Image upload is still in progress")]
    UploadInProgress,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Offset from "now" given to a blank reminder's firing time.
///
/// Two historical defaults exist: `60 + 1000` ms and `60 * 1000` ms. Both are
/// kept as presets; settings choose one or any other value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultOffset(i64);

impl DefaultOffset {
    pub const ADDITIVE: Self = Self(60 + 1000);
    pub const MULTIPLIED: Self = Self(60 * 1000);

    /// `None` for negative offsets.
    pub fn from_millis(millis: i64) -> Option<Self> {
        (millis >= 0).then_some(Self(millis))
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn delta(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.0)
    }
}

impl Default for DefaultOffset {
    fn default() -> Self {
        Self::MULTIPLIED
    }
}

/// Working copy of the reminder being created or edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderEditState {
    pub id: Option<ReminderId>,
    pub title: String,
    pub fire_at: ReminderFireTime,
    pub notes: String,
    pub image_url: Option<String>,
    pub uploading: bool,
}

impl ReminderEditState {
    pub fn blank(now: DateTime<Utc>, default_offset: DefaultOffset) -> Self {
        let fire_at = now
            .checked_add_signed(default_offset.delta())
            .unwrap_or_else(|| {
                log::warn!(
                    "Default offset of {} ms overflows, starting at the current time",
                    default_offset.as_millis()
                );
                now
            });

        Self {
            id: None,
            title: String::new(),
            fire_at: ReminderFireTime::new(fire_at),
            notes: String::new(),
            image_url: None,
            uploading: false,
        }
    }

    pub fn from_reminder(reminder: &Reminder) -> Self {
        Self {
            id: Some(reminder.id.clone()).filter(|id| !id.is_empty()),
            title: reminder.title.clone(),
            fire_at: reminder.fire_at,
            notes: reminder.notes.clone().unwrap_or_default(),
            image_url: reminder.image_url.clone(),
            uploading: false,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), SaveError> {
        if self.title.trim().is_empty() {
            return Err(SaveError::BlankTitle);
        }
        if self.uploading {
            return Err(SaveError::UploadInProgress);
        }
        if *self.fire_at.time() <= now {
            return Err(SaveError::NotInFuture);
        }
        Ok(())
    }

    pub fn can_save(&self, now: DateTime<Utc>) -> bool {
        self.validate(now).is_ok()
    }

    pub fn to_reminder(&self, id: ReminderId) -> Reminder {
        Reminder {
            id,
            title: self.title.trim().to_string(),
            fire_at: self.fire_at,
            notes: Some(self.notes.clone()).filter(|notes| !notes.trim().is_empty()),
            image_url: self.image_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_750_000_000_000).unwrap()
    }

    #[test]
    fn presets_keep_both_historical_values() {
        assert_eq!(DefaultOffset::ADDITIVE.as_millis(), 1060);
        assert_eq!(DefaultOffset::MULTIPLIED.as_millis(), 60_000);
    }

    #[test]
    fn blank_state_fires_after_default_offset() {
        let state = ReminderEditState::blank(now(), DefaultOffset::ADDITIVE);

        assert_eq!(state.fire_at.as_millis(), now().timestamp_millis() + 1060);
        assert!(state.is_new());
    }

    #[test]
    fn blank_title_is_rejected_first() {
        let mut state = ReminderEditState::blank(now(), DefaultOffset::MULTIPLIED);
        state.title = "   ".to_string();
        state.uploading = true;

        assert!(matches!(state.validate(now()), Err(SaveError::BlankTitle)));
    }

    #[test]
    fn firing_time_equal_to_now_is_rejected() {
        let mut state = ReminderEditState::blank(now(), DefaultOffset::from_millis(0).unwrap());
        state.title = "Run".to_string();

        assert!(matches!(state.validate(now()), Err(SaveError::NotInFuture)));
    }

    #[test]
    fn negative_offsets_are_rejected() {
        assert_eq!(DefaultOffset::from_millis(-1), None);
        assert_eq!(DefaultOffset::from_millis(1060), Some(DefaultOffset::ADDITIVE));
    }

    #[test]
    fn overflowing_offset_starts_at_now() {
        let offset = DefaultOffset::from_millis(i64::MAX).unwrap();

        let state = ReminderEditState::blank(now(), offset);

        assert_eq!(state.fire_at.time(), &now());
    }

    #[test]
    fn empty_notes_are_not_persisted() {
        let mut state = ReminderEditState::blank(now(), DefaultOffset::MULTIPLIED);
        state.title = " Run ".to_string();

        let reminder = state.to_reminder("r1".to_string());

        assert_eq!(reminder.title, "Run");
        assert_eq!(reminder.notes, None);
    }
}
