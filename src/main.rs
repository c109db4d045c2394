mod appsettings;
mod connectivity;
mod console;
mod screens;

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use chrono_tz::Tz;
use chronos_app::{DefaultOffset, ReminderViewModel, ViewModelDependencies, ViewModelSettings};
use chronos_greeting::PollinationsGreetingClient;
use chronos_scheduler::{ExactAlarmScheduler, StaticCapabilities, SystemClock};
use chronos_storage::{
    DocumentReminderStore, InMemoryAuthProvider, LocalObjectStore, sqlite::SqliteDocumentStore,
};
use connectivity::ConnectivityProbe;
use console::ConsoleNotificationChannel;
use screens::Screens;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let settings = appsettings::load().context("Failed to load application settings")?;
    let timezone: Tz = settings
        .display
        .timezone
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid display timezone: {e}"))?;
    let screens = Screens::new(timezone);

    let auth = Arc::new(InMemoryAuthProvider::from_settings(
        &settings.auth.accounts,
    ));
    let documents = Arc::new(SqliteDocumentStore::connect(&settings.store.database_url).await?);
    let store = Arc::new(DocumentReminderStore::new(documents, auth.clone()));
    let objects = Arc::new(LocalObjectStore::new(settings.images.root.clone()));

    let capabilities = StaticCapabilities {
        exact_alarms: settings.scheduler.exact_alarms,
        post_notifications: settings.scheduler.post_notifications,
    };
    let scheduler = Arc::new(ExactAlarmScheduler::new(
        Arc::new(ConsoleNotificationChannel::new(screens)),
        Arc::new(capabilities),
        Arc::new(SystemClock),
    ));
    let greetings = Arc::new(PollinationsGreetingClient::new(
        reqwest::Client::new(),
        &settings.greeting.base_url,
    )?);

    let default_offset = DefaultOffset::from_millis(settings.scheduler.default_offset_ms)
        .context("scheduler.default_offset_ms must not be negative")?;
    let view_model = ReminderViewModel::new(
        ViewModelDependencies {
            store,
            objects,
            scheduler,
            greetings,
            auth,
            clock: Arc::new(SystemClock),
        },
        ViewModelSettings {
            default_offset,
            subscription_grace: Duration::from_millis(settings.store.subscription_grace_ms),
        },
    );
    view_model.refresh_user_info().await;

    let shutdown = CancellationToken::new();
    let connectivity =
        ConnectivityProbe::from_settings(&settings.connectivity).spawn(shutdown.clone());

    log::info!("Chronos started");
    let result = console::run(view_model, screens, connectivity).await;
    shutdown.cancel();

    result
}
