use std::path::PathBuf;

use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct AccountSettings {
    pub token: String,
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AuthSettings {
    pub accounts: Vec<AccountSettings>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct StoreSettings {
    pub database_url: String,
    /// How long the live reminder sequence stays subscribed after its last observer detaches.
    pub subscription_grace_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://chronos.db?mode=rwc".to_string(),
            subscription_grace_ms: 5000,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ImageSettings {
    pub root: PathBuf,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct GreetingSettings {
    pub base_url: String,
}

impl Default for GreetingSettings {
    fn default() -> Self {
        Self {
            base_url: "https://text.pollinations.ai".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SchedulerSettings {
    pub default_offset_ms: i64,
    pub exact_alarms: bool,
    pub post_notifications: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            default_offset_ms: 60 * 1000,
            exact_alarms: true,
            post_notifications: true,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DisplaySettings {
    pub timezone: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ConnectivitySettings {
    pub host: String,
    pub interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        Self {
            host: "text.pollinations.ai:443".to_string(),
            interval_ms: 10_000,
            timeout_ms: 3000,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub auth: AuthSettings,
    pub store: StoreSettings,
    pub images: ImageSettings,
    pub greeting: GreetingSettings,
    pub scheduler: SchedulerSettings,
    pub display: DisplaySettings,
    pub connectivity: ConnectivitySettings,
}
