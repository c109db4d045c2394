use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use chronos_models::reminder::Reminder;
use chronos_storage::ReminderStore;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct SharingState {
    observers: usize,
    /// Bumped whenever the upstream is replaced or released. Snapshots from
    /// an older upstream are never published.
    generation: u64,
    upstream: Option<CancellationToken>,
    teardown: Option<CancellationToken>,
}

struct Shared {
    store: Arc<dyn ReminderStore>,
    grace: Duration,
    tx: watch::Sender<Vec<Reminder>>,
    state: Mutex<SharingState>,
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, SharingState> {
        self.state.lock().expect("Sharing state lock poisoned")
    }
}

/// One store subscription shared by every observer. It starts with the first
/// observer and is released once no observer has been attached for the grace period.
pub struct LiveReminders {
    shared: Arc<Shared>,
}

impl LiveReminders {
    pub fn new(store: Arc<dyn ReminderStore>, grace: Duration) -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self {
            shared: Arc::new(Shared {
                store,
                grace,
                tx,
                state: Mutex::new(SharingState::default()),
            }),
        }
    }

    pub fn observe(&self) -> RemindersObserver {
        let mut state = self.shared.lock();
        state.observers += 1;

        if let Some(teardown) = state.teardown.take() {
            teardown.cancel();
        }
        if state.upstream.is_none() {
            start_upstream(&self.shared, &mut state);
        }

        RemindersObserver {
            rx: self.shared.tx.subscribe(),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Re-establishes the upstream subscription, e.g. after the signed-in user changed.
    pub fn restart(&self) {
        let mut state = self.shared.lock();
        stop_upstream(&self.shared, &mut state);

        if state.observers > 0 {
            start_upstream(&self.shared, &mut state);
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.shared.lock().upstream.is_some()
    }

    pub fn current(&self) -> Vec<Reminder> {
        self.shared.tx.borrow().clone()
    }
}

pub struct RemindersObserver {
    rx: watch::Receiver<Vec<Reminder>>,
    shared: Arc<Shared>,
}

impl RemindersObserver {
    pub fn current(&self) -> Vec<Reminder> {
        self.rx.borrow().clone()
    }

    /// Waits for the next snapshot. Each snapshot replaces the previous one.
    pub async fn changed(&mut self) -> Option<Vec<Reminder>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

impl Drop for RemindersObserver {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.observers -= 1;

        if state.observers == 0 {
            let teardown = schedule_teardown(&self.shared, &mut state);
            state.teardown = teardown;
        }
    }
}

fn start_upstream(shared: &Arc<Shared>, state: &mut SharingState) {
    state.generation += 1;
    let generation = state.generation;
    let token = CancellationToken::new();
    let cancelled = token.clone();
    let shared = Arc::clone(shared);

    log::info!("Subscribing to reminder store (generation {generation})");
    tokio::spawn(async move {
        tokio::select! {
            _ = cancelled.cancelled() => {
                log::info!("Reminder store subscription {generation} released");
            },
            _ = forward_snapshots(&shared, generation) => {
                let mut state = shared.lock();
                if state.generation == generation {
                    state.upstream = None;
                }
            }
        }
    });

    state.upstream = Some(token);
}

/// Cancels the current upstream and clears the sequence. Called with the state locked.
fn stop_upstream(shared: &Shared, state: &mut SharingState) {
    state.generation += 1;
    if let Some(upstream) = state.upstream.take() {
        upstream.cancel();
    }
    shared.tx.send_replace(Vec::new());
}

async fn forward_snapshots(shared: &Shared, generation: u64) {
    let mut subscription = match shared.store.list().await {
        Ok(subscription) => subscription,
        Err(e) => {
            log::warn!("Failed to subscribe to reminders: {e}");
            return;
        }
    };

    while let Some(reminders) = subscription.next().await {
        let state = shared.lock();
        if state.generation != generation {
            return;
        }
        log::debug!("Received {} reminders", reminders.len());
        shared.tx.send_replace(reminders);
    }

    log::warn!("Reminder store subscription {generation} ended");
}

fn release(shared: &Shared, state: &mut SharingState) {
    stop_upstream(shared, state);
    state.teardown = None;
}

fn schedule_teardown(shared: &Arc<Shared>, state: &mut SharingState) -> Option<CancellationToken> {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        release(shared, state);
        return None;
    };

    let token = CancellationToken::new();
    let cancelled = token.clone();
    let shared = Arc::clone(shared);

    runtime.spawn(async move {
        tokio::select! {
            _ = cancelled.cancelled() => {},
            _ = tokio::time::sleep(shared.grace) => {
                let mut state = shared.lock();
                if state.observers == 0 && !cancelled.is_cancelled() {
                    release(&shared, &mut state);
                }
            }
        }
    });

    Some(token)
}
