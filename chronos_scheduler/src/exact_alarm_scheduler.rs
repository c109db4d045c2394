use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::TimeDelta;
use chronos_models::reminder::{ReminderFireTime, ReminderId, alarm_key};
use tokio::{
    sync::RwLock,
    task::{self, JoinHandle},
};
use tokio_util::sync::CancellationToken;

use crate::{
    clock::Clock,
    delivery::{Capabilities, Notification, NotificationChannel, NotificationPayload},
    scheduler::{AlarmScheduler, ArmRequest, SchedulingError},
};

struct ArmedAlarm {
    reminder_id: ReminderId,
    fire_at: ReminderFireTime,
    generation: u64,
    cancellation_token: CancellationToken,
    _task: JoinHandle<()>,
}

type AlarmStore = RwLock<HashMap<i32, ArmedAlarm>>;

/// Exact one-shot timers keyed by the alarm key of the reminder id. A fired
/// alarm leaves the armed set and posts its notification once.
pub struct ExactAlarmScheduler {
    alarms: Arc<AlarmStore>,
    notifications: Arc<dyn NotificationChannel>,
    capabilities: Arc<dyn Capabilities>,
    clock: Arc<dyn Clock>,
    next_generation: AtomicU64,
    shutdown: CancellationToken,
}

impl ExactAlarmScheduler {
    pub fn new(
        notifications: Arc<dyn NotificationChannel>,
        capabilities: Arc<dyn Capabilities>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            alarms: Arc::new(RwLock::new(HashMap::new())),
            notifications,
            capabilities,
            clock,
            next_generation: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        }
    }
}

impl Drop for ExactAlarmScheduler {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct AlarmTask {
    key: i32,
    generation: u64,
    reminder_id: ReminderId,
    payload: NotificationPayload,
    alarms: Arc<AlarmStore>,
    notifications: Arc<dyn NotificationChannel>,
    capabilities: Arc<dyn Capabilities>,
}

impl AlarmTask {
    async fn run(self, delay: Duration, cancellation_token: CancellationToken) {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                log::info!("Alarm for reminder {} was cancelled", self.reminder_id);
            },
            _ = tokio::time::sleep(delay) => {
                if self.take_from_armed().await {
                    self.deliver().await;
                }
            }
        }
    }

    /// False when the alarm was replaced or cancelled while its timer elapsed.
    async fn take_from_armed(&self) -> bool {
        let mut alarms = self.alarms.write().await;
        match alarms.get(&self.key) {
            Some(alarm) if alarm.generation == self.generation => {
                alarms.remove(&self.key);
                true
            }
            _ => false,
        }
    }

    async fn deliver(&self) {
        log::info!("Received alarm for reminder {}", self.reminder_id);

        if !self.capabilities.can_post_notifications() {
            log::error!(
                "Notification permission not granted, dropping reminder {}",
                self.reminder_id
            );
            return;
        }

        let notification = Notification::from_payload(self.key, &self.payload);
        match self.notifications.post(&notification).await {
            Ok(()) => log::info!("Notification shown for reminder {}", self.reminder_id),
            Err(e) => log::error!(
                "Failed to show notification for reminder {}: {e}",
                self.reminder_id
            ),
        }
    }
}

#[async_trait]
impl AlarmScheduler for ExactAlarmScheduler {
    async fn arm(&self, request: ArmRequest) -> Result<(), SchedulingError> {
        let ArmRequest {
            reminder_id,
            fire_at,
            payload,
        } = request;

        let delay = *fire_at.time() - self.clock.now();
        log::info!(
            "Scheduling reminder {reminder_id}, delay {} ms",
            delay.num_milliseconds()
        );

        if delay <= TimeDelta::zero() {
            log::warn!(
                "Cannot schedule reminder {reminder_id}: time is in the past (delay {} ms)",
                delay.num_milliseconds()
            );
            return Err(SchedulingError::InPast {
                delay_ms: delay.num_milliseconds(),
            });
        }

        if !self.capabilities.can_schedule_exact_alarms() {
            log::warn!("Failed to schedule alarm for reminder {reminder_id}: exact alarms denied");
            return Err(SchedulingError::ExactAlarmDenied);
        }

        let delay = delay
            .to_std()
            .map_err(|_| SchedulingError::InPast { delay_ms: 0 })?;
        let key = alarm_key(&reminder_id);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancellation_token = self.shutdown.child_token();

        let mut alarms = self.alarms.write().await;
        if let Some(previous) = alarms.remove(&key) {
            log::info!(
                "Replacing pending alarm for reminder {} (was due {})",
                previous.reminder_id,
                previous.fire_at.time()
            );
            previous.cancellation_token.cancel();
        }

        let alarm_task = AlarmTask {
            key,
            generation,
            reminder_id: reminder_id.clone(),
            payload,
            alarms: Arc::clone(&self.alarms),
            notifications: Arc::clone(&self.notifications),
            capabilities: Arc::clone(&self.capabilities),
        };
        let task = task::spawn(alarm_task.run(delay, cancellation_token.clone()));

        log::info!("Alarm scheduled for reminder {reminder_id} at {}", fire_at.time());
        alarms.insert(
            key,
            ArmedAlarm {
                reminder_id,
                fire_at,
                generation,
                cancellation_token,
                _task: task,
            },
        );

        Ok(())
    }

    async fn cancel(&self, reminder_id: &str) {
        let key = alarm_key(reminder_id);
        if let Some(alarm) = self.alarms.write().await.remove(&key) {
            alarm.cancellation_token.cancel();
            log::info!("Cancelled alarm for reminder {reminder_id}");
        }
    }

    async fn armed(&self) -> Vec<ReminderId> {
        self.alarms
            .read()
            .await
            .values()
            .map(|alarm| alarm.reminder_id.clone())
            .collect()
    }
}
