use chronos_models::settings::Settings;
use config::{Config, ConfigError, Environment, File};

/// Layers `appsettings`, an optional `appsettings.local` and `APP__*` environment variables.
pub fn load() -> Result<Settings, ConfigError> {
    let settings = Config::builder()
        .add_source(File::with_name("appsettings").required(true))
        .add_source(File::with_name("appsettings.local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    settings.try_deserialize()
}
