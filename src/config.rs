//! Application-level configuration loading: draw timing, admin gate, cache location and the
//! team roster used by the in-memory record store.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "WILDCARD_DRAW_CONFIG_PATH";
/// Environment variable that overrides the configured admin key.
const ADMIN_KEY_ENV: &str = "WILDCARD_ADMIN_KEY";
/// Length of the suspense phase before an outcome is revealed.
const DEFAULT_DRAW_DELAY: Duration = Duration::from_millis(2_000);
/// Upper bound on a single record store submission.
const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Delay spent in the drawing phase; zero disables it.
    pub draw_delay: Duration,
    /// Timeout applied to record store submissions.
    pub submit_timeout: Duration,
    /// Static secret guarding the admin listing. `None` disables admin access.
    pub admin_key: Option<String>,
    /// Directory holding one progress cache file per session. `None` keeps caches in memory.
    pub cache_dir: Option<PathBuf>,
    /// Teams registered in the in-memory record store.
    pub teams: Vec<String>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        teams = app_config.teams.len(),
                        "loaded configuration"
                    );
                    app_config
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
        };

        config.with_env_overrides()
    }

    /// Configuration suited to tests: no delay, memory caches, the given teams.
    pub fn headless<I, S>(teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            draw_delay: Duration::ZERO,
            teams: teams.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(key) = env::var(ADMIN_KEY_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            self.admin_key = Some(key);
        }
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            draw_delay: DEFAULT_DRAW_DELAY,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            admin_key: None,
            cache_dir: None,
            teams: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    draw_delay_ms: Option<u64>,
    #[serde(default)]
    submit_timeout_ms: Option<u64>,
    #[serde(default)]
    admin_key: Option<String>,
    #[serde(default)]
    cache_dir: Option<PathBuf>,
    #[serde(default)]
    teams: Vec<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            draw_delay: value
                .draw_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.draw_delay),
            submit_timeout: value
                .submit_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.submit_timeout),
            admin_key: value.admin_key.filter(|key| !key.trim().is_empty()),
            cache_dir: value.cache_dir,
            teams: value
                .teams
                .into_iter()
                .map(|team| team.trim().to_string())
                .filter(|team| !team.is_empty())
                .collect(),
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
    fn raw_config_fills_missing_fields_with_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{"teams":["101"," 102 ",""]}"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.draw_delay, DEFAULT_DRAW_DELAY);
        assert_eq!(config.submit_timeout, DEFAULT_SUBMIT_TIMEOUT);
        assert_eq!(config.teams, ["101", "102"]);
        assert!(config.admin_key.is_none());
    }

    #[test]
    fn blank_admin_key_disables_admin_access() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"admin_key":"  ","draw_delay_ms":0}"#).unwrap();
        let config = AppConfig::from(raw);
        assert!(config.admin_key.is_none());
        assert_eq!(config.draw_delay, Duration::ZERO);
    }
}
