use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::DaqError;
use crate::link::{DeviceKind, Transport};
use crate::stream::StreamRequest;
use crate::trigger::TriggerSpec;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    /// Hardware trigger gating the stream; untriggered when absent.
    #[serde(default)]
    pub trigger: Option<TriggerSpec>,
    #[serde(default)]
    pub console: ConsoleConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DeviceConfig {
    pub kind: DeviceKind,
    pub transport: Transport,
    /// IP address or serial number, depending on the transport.
    pub identifier: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StreamConfig {
    /// Analog input channels to scan, in scan-list order.
    pub channels: Vec<String>,
    pub duration_s: f64,
    /// Aggregate sample rate over all channels in Hz.
    pub total_rate_hz: f64,
    /// Scans per blocking read; omit for one read covering the duration.
    pub scans_per_read: Option<usize>,
    /// Overlap sentinel scanning with the next blocking read.
    #[serde(default)]
    pub pipelined: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConsoleConfig {
    pub verbosity: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            kind: DeviceKind::T7,
            transport: Transport::Ethernet,
            identifier: "192.168.1.128".to_string(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channels: vec![
                "AIN0".to_string(),
                "AIN1".to_string(),
                "AIN2".to_string(),
            ],
            duration_s: 1.0,
            total_rate_hz: 100e3,
            scans_per_read: None,
            pipelined: false,
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            verbosity: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Validate all configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream.channels.is_empty() {
            return Err(ConfigError::Message(
                "stream.channels must list at least one channel".to_string(),
            ));
        }
        if self.stream.duration_s <= 0.0 {
            return Err(ConfigError::Message(format!(
                "stream.duration_s must be positive, got {}",
                self.stream.duration_s
            )));
        }
        if self.stream.total_rate_hz <= 0.0 {
            return Err(ConfigError::Message(format!(
                "stream.total_rate_hz must be positive, got {}",
                self.stream.total_rate_hz
            )));
        }
        if let Some(trigger) = &self.trigger {
            if let Some(t) = trigger.timeout_s {
                if t <= 0.0 {
                    return Err(ConfigError::Message(format!(
                        "trigger.timeout_s must be positive or omitted, got {t}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Build the stream request described by this configuration.
    pub fn to_request(&self) -> Result<StreamRequest, DaqError> {
        let mut builder = StreamRequest::builder()
            .channels(self.stream.channels.clone())
            .duration_s(self.stream.duration_s)
            .total_rate_hz(self.stream.total_rate_hz);
        if let Some(scans_per_read) = self.stream.scans_per_read {
            builder = builder.scans_per_read(scans_per_read);
        }
        if let Some(trigger) = &self.trigger {
            builder = builder.trigger(trigger.clone());
        }
        builder.build()
    }
}

/// Load configuration from file with layered fallbacks: explicit path,
/// then `config.toml` in the working directory, then built-in defaults.
/// Environment variables prefixed `STREAMJACK_` override file values.
pub fn load_config(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();
    let mut config_file_found = false;

    if let Some(path) = config_path {
        if path.exists() {
            builder = builder.add_source(File::from(path));
            config_file_found = true;
        } else {
            return Err(ConfigError::Message(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
    } else if Path::new("config.toml").exists() {
        builder = builder.add_source(File::with_name("config.toml"));
        config_file_found = true;
    }

    if !config_file_found {
        builder = builder.add_source(Config::try_from(&AppConfig::default())?);
    }

    builder = builder.add_source(
        Environment::with_prefix("STREAMJACK")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let app_config = config.try_deserialize::<AppConfig>()?;
    app_config.validate()?;

    Ok(app_config)
}

/// Load configuration, falling back to defaults only when no explicit
/// path was given. An explicit path that fails to load is an error the
/// user needs to see, not something to paper over.
pub fn load_config_or_default(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match load_config(config_path) {
        Ok(config) => Ok(config),
        Err(e) if config_path.is_some() => Err(e),
        Err(_) => {
            log::warn!("No configuration file found, using defaults");
            Ok(AppConfig::default())
        }
    }
}
