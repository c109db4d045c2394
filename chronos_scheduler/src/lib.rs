pub mod clock;
pub mod delivery;
mod exact_alarm_scheduler;
mod scheduler;

pub use clock::{Clock, SystemClock, TokioClock};
pub use delivery::{
    Capabilities, DeliveryError, Notification, NotificationChannel, NotificationPayload,
    StaticCapabilities, TapAction,
};
pub use exact_alarm_scheduler::ExactAlarmScheduler;
pub use scheduler::{AlarmScheduler, ArmRequest, SchedulingError};
