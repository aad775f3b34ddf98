//! Application-level configuration: upstream endpoints, the catalog filter,
//! and the timing constants driving the show.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_RUSH_BACK_CONFIG_PATH";

/// Delay between event start and join-window open, and again between window
/// open and game start.
const DEFAULT_JOIN_OPEN_DELAY_MS: u64 = 30_000;
/// How long players have to answer each question.
const DEFAULT_QUESTION_TIME_MS: u64 = 10_000;
/// Pause between the answer reveal and the next question.
const DEFAULT_QUESTION_GAP_MS: u64 = 3_000;

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the external event catalog.
    pub catalog_base_url: String,
    /// Base URL of the external question bank.
    pub question_bank_base_url: String,
    /// Base URL of the external points-reporting service.
    pub points_base_url: String,
    /// Game/category name the catalog is filtered to.
    pub game_name: String,
    /// Delay from event start to join-window open, and from open to game start.
    pub join_open_delay: Duration,
    /// Answer-collection window per question.
    pub question_time: Duration,
    /// Pause between the answer reveal and the next question.
    pub question_gap: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog_base_url: "http://localhost:5001/brand".into(),
            question_bank_base_url: "http://localhost:5001/brand".into(),
            points_base_url: "http://localhost:5001/brand".into(),
            game_name: "Trivia".into(),
            join_open_delay: Duration::from_millis(DEFAULT_JOIN_OPEN_DELAY_MS),
            question_time: Duration::from_millis(DEFAULT_QUESTION_TIME_MS),
            question_gap: Duration::from_millis(DEFAULT_QUESTION_GAP_MS),
        }
    }
}

impl AppConfig {
    /// Load the configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

/// JSON representation of the configuration file. Every field is optional;
/// missing entries keep their defaults.
#[derive(Debug, Deserialize)]
struct RawConfig {
    catalog_base_url: Option<String>,
    question_bank_base_url: Option<String>,
    points_base_url: Option<String>,
    game_name: Option<String>,
    join_open_delay_ms: Option<u64>,
    question_time_ms: Option<u64>,
    question_gap_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            catalog_base_url: raw.catalog_base_url.unwrap_or(defaults.catalog_base_url),
            question_bank_base_url: raw
                .question_bank_base_url
                .unwrap_or(defaults.question_bank_base_url),
            points_base_url: raw.points_base_url.unwrap_or(defaults.points_base_url),
            game_name: raw.game_name.unwrap_or(defaults.game_name),
            join_open_delay: raw
                .join_open_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.join_open_delay),
            question_time: raw
                .question_time_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.question_time),
            question_gap: raw
                .question_gap_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.question_gap),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_raw_config_keeps_defaults_elsewhere() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"game_name": "Blitz", "question_time_ms": 5000}"#).unwrap();
        let config: AppConfig = raw.into();

        assert_eq!(config.game_name, "Blitz");
        assert_eq!(config.question_time, Duration::from_millis(5_000));
        assert_eq!(
            config.join_open_delay,
            Duration::from_millis(DEFAULT_JOIN_OPEN_DELAY_MS)
        );
        assert_eq!(config.catalog_base_url, "http://localhost:5001/brand");
    }
}
