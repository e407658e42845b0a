use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use crate::notifications::NotificationSettings;
use crate::scheduler::SchedulerSettings;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub listen_addr: SocketAddr,
    pub log_dir: String,
    /// Without a database the engine runs on the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub scheduler: SchedulerSettings,
    pub notifications: NotificationSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_dir: "logs".to_string(),
            database_url: None,
            database_max_connections: 10,
            scheduler: SchedulerSettings::default(),
            notifications: NotificationSettings::default(),
        }
    }
}

// Flat environment layer; envy matches field names against lowercased keys.
#[derive(Deserialize, Default, Debug)]
struct EnvOverrides {
    listen_addr: Option<String>,
    log_dir: Option<String>,
    database_url: Option<String>,
    database_max_connections: Option<u32>,
    tick_interval_secs: Option<u64>,
    min_check_interval_secs: Option<u64>,
    probe_lease_enabled: Option<bool>,
    notification_brand: Option<String>,
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    smtp_user: Option<String>,
    smtp_password: Option<String>,
    smtp_from_email: Option<String>,
    email_api_url: Option<String>,
    email_api_key: Option<String>,
    email_api_from: Option<String>,
    sms_api_url: Option<String>,
    sms_api_key: Option<String>,
    sms_sender: Option<String>,
}

impl EnvOverrides {
    fn apply(self, config: &mut EngineConfig) -> Result<(), ConfigError> {
        if let Some(addr) = self.listen_addr {
            config.listen_addr = addr
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("LISTEN_ADDR {addr:?}: {e}")))?;
        }
        set(&mut config.log_dir, self.log_dir);
        if self.database_url.is_some() {
            config.database_url = self.database_url;
        }
        set(&mut config.database_max_connections, self.database_max_connections);

        let scheduler = &mut config.scheduler;
        set(&mut scheduler.tick_interval_secs, self.tick_interval_secs);
        set(&mut scheduler.min_check_interval_secs, self.min_check_interval_secs);
        set(&mut scheduler.lease_enabled, self.probe_lease_enabled);

        let notifications = &mut config.notifications;
        set(&mut notifications.brand, self.notification_brand);

        let smtp = &mut notifications.smtp;
        set_opt(&mut smtp.host, self.smtp_host);
        set(&mut smtp.port, self.smtp_port);
        set_opt(&mut smtp.username, self.smtp_user);
        set_opt(&mut smtp.password, self.smtp_password);
        set(&mut smtp.from_email, self.smtp_from_email);

        let email_api = &mut notifications.email_api;
        set(&mut email_api.endpoint, self.email_api_url);
        set_opt(&mut email_api.api_key, self.email_api_key);
        set_opt(&mut email_api.from_email, self.email_api_from);

        let sms_api = &mut notifications.sms_api;
        set_opt(&mut sms_api.endpoint, self.sms_api_url);
        set_opt(&mut sms_api.api_key, self.sms_api_key);
        set_opt(&mut sms_api.sender, self.sms_sender);
        Ok(())
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn set_opt<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

impl EngineConfig {
    /// Defaults, then the optional TOML file, then `.env` and the process
    /// environment. A missing file is not an error.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_sources(config_path.map(Path::new), std::env::vars())
    }

    pub fn from_sources<I>(config_path: Option<&Path>, env: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = match config_path {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => EngineConfig::default(),
        };

        let overrides: EnvOverrides = envy::from_iter(env)?;
        overrides.apply(&mut config)?;

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.tick_interval_secs < 1 {
            return Err(ConfigError::Invalid(
                "scheduler.tick_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.scheduler.min_check_interval_secs < 1 {
            return Err(ConfigError::Invalid(
                "scheduler.min_check_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.database_max_connections < 1 {
            return Err(ConfigError::Invalid(
                "database_max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref().filter(|url| !url.trim().is_empty())
    }
}
