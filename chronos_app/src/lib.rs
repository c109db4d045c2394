pub mod edit_state;
pub mod greeting_state;
pub mod live_reminders;
pub mod view_model;

pub use edit_state::{DefaultOffset, ReminderEditState, SaveError};
pub use greeting_state::GreetingState;
pub use live_reminders::{LiveReminders, RemindersObserver};
pub use view_model::{ReminderViewModel, ViewModelDependencies, ViewModelSettings};
