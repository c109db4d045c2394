use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use chronos_greeting::GreetingClient;
use chronos_models::{
    reminder::{Reminder, ReminderFireTime},
    user::UserInfo,
};
use chronos_scheduler::{AlarmScheduler, ArmRequest, Clock};
use chronos_storage::{AuthError, AuthProvider, ObjectStore, ReminderStore, StoreError, image_path};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    edit_state::{DefaultOffset, ReminderEditState, SaveError},
    greeting_state::GreetingState,
    live_reminders::{LiveReminders, RemindersObserver},
};

/// Collaborators the view-model is wired with.
pub struct ViewModelDependencies {
    pub store: Arc<dyn ReminderStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub scheduler: Arc<dyn AlarmScheduler>,
    pub greetings: Arc<dyn GreetingClient>,
    pub auth: Arc<dyn AuthProvider>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, Copy)]
pub struct ViewModelSettings {
    pub default_offset: DefaultOffset,
    pub subscription_grace: Duration,
}

impl Default for ViewModelSettings {
    fn default() -> Self {
        Self {
            default_offset: DefaultOffset::default(),
            subscription_grace: Duration::from_millis(5000),
        }
    }
}

/// Holds the UI-facing state of the reminders screen and routes user actions
/// to the store, the alarm scheduler and the greeting client.
pub struct ReminderViewModel {
    store: Arc<dyn ReminderStore>,
    objects: Arc<dyn ObjectStore>,
    scheduler: Arc<dyn AlarmScheduler>,
    greetings: Arc<dyn GreetingClient>,
    auth: Arc<dyn AuthProvider>,
    clock: Arc<dyn Clock>,
    default_offset: DefaultOffset,
    reminders: LiveReminders,
    edit_state: watch::Sender<ReminderEditState>,
    greeting_state: watch::Sender<GreetingState>,
    user_info: watch::Sender<Option<UserInfo>>,
}

impl ReminderViewModel {
    pub fn new(dependencies: ViewModelDependencies, settings: ViewModelSettings) -> Self {
        let ViewModelDependencies {
            store,
            objects,
            scheduler,
            greetings,
            auth,
            clock,
        } = dependencies;

        let blank = ReminderEditState::blank(clock.now(), settings.default_offset);
        let reminders = LiveReminders::new(Arc::clone(&store), settings.subscription_grace);

        Self {
            store,
            objects,
            scheduler,
            greetings,
            auth,
            clock,
            default_offset: settings.default_offset,
            reminders,
            edit_state: watch::channel(blank).0,
            greeting_state: watch::channel(GreetingState::Idle).0,
            user_info: watch::channel(None).0,
        }
    }

    pub fn reminders(&self) -> RemindersObserver {
        self.reminders.observe()
    }

    pub fn edit_state(&self) -> watch::Receiver<ReminderEditState> {
        self.edit_state.subscribe()
    }

    pub fn greeting_state(&self) -> watch::Receiver<GreetingState> {
        self.greeting_state.subscribe()
    }

    pub fn user_info(&self) -> watch::Receiver<Option<UserInfo>> {
        self.user_info.subscribe()
    }

    pub fn begin_edit(&self, reminder: Option<&Reminder>) {
        let state = match reminder {
            Some(reminder) => ReminderEditState::from_reminder(reminder),
            None => self.blank_edit_state(),
        };
        self.edit_state.send_replace(state);
    }

    pub fn cancel_edit(&self) {
        self.edit_state.send_replace(self.blank_edit_state());
    }

    pub fn on_title_change(&self, title: impl Into<String>) {
        let title = title.into();
        self.edit_state.send_modify(|state| state.title = title);
    }

    pub fn on_notes_change(&self, notes: impl Into<String>) {
        let notes = notes.into();
        self.edit_state.send_modify(|state| state.notes = notes);
    }

    pub fn on_fire_at_change(&self, fire_at: ReminderFireTime) {
        self.edit_state.send_modify(|state| state.fire_at = fire_at);
    }

    pub fn on_image_url_change(&self, image_url: Option<String>) {
        self.edit_state.send_modify(|state| state.image_url = image_url);
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn can_save(&self) -> bool {
        self.edit_state.borrow().can_save(self.clock.now())
    }

    /// Uploads an image for the reminder being edited and stores its URL.
    pub async fn attach_image(&self, bytes: Vec<u8>) -> Result<String, StoreError> {
        self.edit_state.send_modify(|state| state.uploading = true);

        let result = self.objects.upload(&image_path(), bytes).await;
        match &result {
            Ok(url) => self.edit_state.send_modify(|state| {
                state.image_url = Some(url.clone());
                state.uploading = false;
            }),
            Err(e) => {
                log::error!("Image upload failed: {e}");
                self.edit_state.send_modify(|state| state.uploading = false);
            }
        }

        result
    }

    pub async fn save(&self) -> Result<Reminder, SaveError> {
        let state = self.edit_state.borrow().clone();
        state.validate(self.clock.now())?;

        let saved = match &state.id {
            None => {
                let reminder = state.to_reminder(Uuid::new_v4().to_string());
                self.store.add(reminder).await?
            }
            Some(id) => {
                let reminder = state.to_reminder(id.clone());
                self.store.update(reminder).await?
            }
        };

        if let Err(e) = self.scheduler.arm(ArmRequest::for_reminder(&saved)).await {
            log::warn!("Reminder {} saved without an alarm: {e}", saved.id);
        }

        self.edit_state.send_replace(self.blank_edit_state());
        Ok(saved)
    }

    pub async fn delete(&self, reminder_id: &str) -> Result<(), StoreError> {
        self.store.delete(reminder_id).await?;
        self.scheduler.cancel(reminder_id).await;
        log::info!("Deleted reminder {reminder_id}");

        Ok(())
    }

    pub async fn request_greeting(&self, prompt: &str) {
        if prompt.trim().is_empty() {
            log::warn!("Ignoring greeting request with an empty prompt");
            self.greeting_state
                .send_replace(GreetingState::Error("Prompt must not be empty".to_string()));
            return;
        }

        self.greeting_state.send_replace(GreetingState::Loading);
        let state = match self.greetings.fetch(prompt).await {
            Ok(greeting) => GreetingState::Success(greeting),
            Err(e) => {
                log::warn!("Greeting request failed: {e}");
                GreetingState::Error(e.to_string())
            }
        };
        self.greeting_state.send_replace(state);
    }

    pub fn reset_greeting(&self) {
        self.greeting_state.send_replace(GreetingState::Idle);
    }

    /// Hands out the last greeting outcome and resets the state to idle.
    pub fn take_greeting(&self) -> GreetingState {
        self.greeting_state.send_replace(GreetingState::Idle)
    }

    pub async fn refresh_user_info(&self) -> Option<UserInfo> {
        let info = self.auth.current_user().await.as_ref().map(UserInfo::from);
        self.user_info.send_replace(info.clone());
        info
    }

    pub async fn sign_in(&self, token: &str) -> Result<UserInfo, AuthError> {
        let user = self.auth.sign_in_with_token(token).await?;
        let info = UserInfo::from(&user);
        self.user_info.send_replace(Some(info.clone()));
        self.reminders.restart();

        Ok(info)
    }

    pub async fn sign_out(&self) {
        self.auth.sign_out().await;
        self.user_info.send_replace(None);
        self.reminders.restart();
    }

    fn blank_edit_state(&self) -> ReminderEditState {
        ReminderEditState::blank(self.clock.now(), self.default_offset)
    }
}
