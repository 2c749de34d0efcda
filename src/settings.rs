//! Runtime settings, read from an optional `settings.toml` next to the
//! binary and then from the environment (`PORT`, `MONGO_URI`, ...).
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mongo,
    Memory,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub store: StoreBackend,
    #[serde(default)]
    pub mongo_uri: Option<String>,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub password_pepper: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

fn default_port() -> u16 {
    3000
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_database() -> String {
    "expense_tracker".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings: Settings = Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.bind, "0.0.0.0");
        assert_eq!(settings.store, StoreBackend::Mongo);
        assert_eq!(settings.mongo_uri, None);
        assert_eq!(settings.database, "expense_tracker");
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.password_pepper, None);
    }

    #[test]
    fn overrides_are_honoured() {
        let settings: Settings = Config::builder()
            .set_override("port", 8081)
            .unwrap()
            .set_override("store", "memory")
            .unwrap()
            .set_override("mongo_uri", "mongodb://localhost:27017")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.port, 8081);
        assert_eq!(settings.store, StoreBackend::Memory);
        assert_eq!(
            settings.mongo_uri.as_deref(),
            Some("mongodb://localhost:27017")
        );
    }
}
