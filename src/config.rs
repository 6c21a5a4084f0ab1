//! Handles application configuration loading and management.
//!
//! Two layers of configuration exist:
//! - `KioskSettings`, read from a local INI file, tells the kiosk where its backend lives.
//! - `ScreensaverConfig`, fetched from the backend as JSON, carries the dashboard URL,
//!   timings, clock placement and the optional weather/media sources. Every field has a
//!   built-in default so a partial or missing document still yields a usable config.

use std::time::Duration;

use configparser::ini::Ini;
use log::{debug, error, info};
use serde::Deserialize;

use super::errors::ConfigError;
use super::model::ClockPosition;

pub const DEFAULT_SETTINGS_PATH: &str = "/etc/ha-screensaver.conf";
/// Backend used when no settings file can be loaded.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";

const DEFAULT_VIEWPORT_WIDTH: u32 = 1920;
const DEFAULT_VIEWPORT_HEIGHT: u32 = 1080;

/// Holds the kiosk's local settings.
#[derive(Clone, Debug, PartialEq)]
pub struct KioskSettings {
    pub backend_url: String,
    pub fullscreen: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for KioskSettings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            fullscreen: true,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
        }
    }
}

/// Loads kiosk settings from the specified INI file path.
///
/// Reads settings from the `[settings]` section of the INI file. Only `backend_url`
/// is required.
///
/// # Errors
/// Returns `ConfigError` if the file cannot be read, is malformed,
/// or if `backend_url` is missing.
#[must_use = "loading settings can fail, the Result must be handled"]
pub fn load_settings(path: &str) -> Result<KioskSettings, ConfigError> {
    info!("Attempting to load kiosk settings from: {}", path);
    let content = std::fs::read_to_string(path).map_err(|e| {
        error!("Error reading settings file '{}': {}", path, e);
        ConfigError::Io(e)
    })?;
    parse_settings(&content)
}

/// Parses kiosk settings from INI text.
pub fn parse_settings(content: &str) -> Result<KioskSettings, ConfigError> {
    let mut config_parser = Ini::new();
    config_parser.read(content.to_string()).map_err(|e| {
        error!("Error parsing settings: {}", e);
        ConfigError::Parse(e)
    })?;

    let backend_url = config_parser
        .get("settings", "backend_url")
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            error!("Missing settings key 'backend_url' in section '[settings]'");
            ConfigError::MissingKey("backend_url".to_string())
        })?;
    debug!("Loaded settings value for key 'backend_url': {}", backend_url);

    let fullscreen = config_parser
        .getbool("settings", "fullscreen")
        .map_err(|message| ConfigError::InvalidValue { key: "fullscreen".to_string(), message })?
        .unwrap_or(true);

    let viewport_width = get_dimension(&config_parser, "viewport_width", DEFAULT_VIEWPORT_WIDTH)?;
    let viewport_height = get_dimension(&config_parser, "viewport_height", DEFAULT_VIEWPORT_HEIGHT)?;

    let settings = KioskSettings { backend_url, fullscreen, viewport_width, viewport_height };
    info!("Kiosk settings loaded successfully: {:?}", settings);
    Ok(settings)
}

fn get_dimension(config_parser: &Ini, key: &str, default: u32) -> Result<u32, ConfigError> {
    let value = config_parser
        .getuint("settings", key)
        .map_err(|message| ConfigError::InvalidValue { key: key.to_string(), message })?;
    match value {
        None => Ok(default),
        Some(0) => Err(ConfigError::InvalidValue { key: key.to_string(), message: "must be greater than zero".to_string() }),
        Some(v) => u32::try_from(v).map_err(|e| ConfigError::InvalidValue { key: key.to_string(), message: e.to_string() }),
    }
}

/// Screensaver configuration served by the backend.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ScreensaverConfig {
    /// The dashboard shown in the embedded frame.
    pub home_assistant_url: String,
    pub idle_timeout_seconds: u64,
    pub slide_interval_seconds: u64,
    pub clock_position: ClockPosition,
    /// Weather entity id; empty means no weather source.
    pub weather_entity: String,
    /// Media player entity id; empty means no media source.
    pub media_player_entity: String,
}

impl Default for ScreensaverConfig {
    fn default() -> Self {
        Self {
            home_assistant_url: "http://homeassistant:8123".to_string(),
            idle_timeout_seconds: 60,
            slide_interval_seconds: 5,
            clock_position: ClockPosition::BottomCenter,
            weather_entity: String::new(),
            media_player_entity: String::new(),
        }
    }
}

impl ScreensaverConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds.max(1))
    }

    pub fn slide_interval(&self) -> Duration {
        Duration::from_secs(self.slide_interval_seconds.max(1))
    }

    pub fn weather_enabled(&self) -> bool {
        !self.weather_entity.trim().is_empty()
    }

    pub fn media_enabled(&self) -> bool {
        !self.media_player_entity.trim().is_empty()
    }
}

/// Parses a JSON configuration document, merging it over the defaults.
#[must_use = "parsing configuration can fail, the Result must be handled"]
pub fn parse_screensaver_config(json: &str) -> Result<ScreensaverConfig, ConfigError> {
    let config: ScreensaverConfig = serde_json::from_str(json)?;
    debug!("Parsed screensaver config: {:?}", config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn settings_load_from_ini_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[settings]\nbackend_url = http://kiosk.local:8080/\nfullscreen = false\nviewport_width = 1280").unwrap();

        let settings = load_settings(file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.backend_url, "http://kiosk.local:8080");
        assert!(!settings.fullscreen);
        assert_eq!(settings.viewport_width, 1280);
        assert_eq!(settings.viewport_height, DEFAULT_VIEWPORT_HEIGHT);
    }

    #[test]
    fn missing_backend_url_is_reported() {
        let err = parse_settings("[settings]\nfullscreen = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(ref key) if key == "backend_url"));
    }

    #[test]
    fn missing_settings_file_is_an_io_error() {
        let err = load_settings("/nonexistent/ha-screensaver.conf").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn zero_viewport_is_rejected() {
        let err = parse_settings("[settings]\nbackend_url = http://x\nviewport_height = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn partial_config_merges_over_defaults() {
        let config = parse_screensaver_config(r#"{"idle_timeout_seconds": 120, "clock_position": "top-left"}"#).unwrap();
        assert_eq!(config.idle_timeout(), Duration::from_secs(120));
        assert_eq!(config.slide_interval(), Duration::from_secs(5));
        assert_eq!(config.clock_position, ClockPosition::TopLeft);
        assert_eq!(config.home_assistant_url, "http://homeassistant:8123");
        assert!(!config.weather_enabled());
        assert!(!config.media_enabled());
    }

    #[test]
    fn zero_durations_are_clamped() {
        let config = parse_screensaver_config(r#"{"idle_timeout_seconds": 0, "slide_interval_seconds": 0}"#).unwrap();
        assert_eq!(config.idle_timeout(), Duration::from_secs(1));
        assert_eq!(config.slide_interval(), Duration::from_secs(1));
    }

    #[test]
    fn malformed_config_is_a_parse_error() {
        assert!(matches!(parse_screensaver_config("{not json"), Err(ConfigError::Parse(_))));
    }
}
