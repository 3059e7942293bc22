use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};

pub fn config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("alt-switch")
        .join("config.toml")
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Settings {
    /// Total budget for a single accessibility call, retries included.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "ax_timeout_ms")]
    pub ax_timeout: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "ax_retry_interval_ms")]
    pub ax_retry_interval: Duration,
    /// How long initial discovery waits for per-application setup.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "blocking_discovery_timeout_ms")]
    pub blocking_discovery_timeout: Duration,
    /// Delay between the first summon and building the UI. Absorbs key repeat.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "window_display_delay_ms")]
    pub window_display_delay: Duration,
    pub filters: WindowFilters,
    pub ordering: OrderingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            ax_timeout: Duration::from_secs(3),
            ax_retry_interval: Duration::from_millis(10),
            blocking_discovery_timeout: Duration::from_secs(1),
            window_display_delay: Duration::ZERO,
            filters: WindowFilters::default(),
            ordering: OrderingSettings::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppsToShow {
    #[default]
    All,
    /// Only windows of the frontmost application.
    Active,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpacesToShow {
    All,
    #[default]
    Visible,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScreensToShow {
    #[default]
    All,
    /// Only windows on the screen the switcher is shown on.
    ShowingSwitcher,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct WindowFilters {
    pub apps_to_show: AppsToShow,
    pub spaces_to_show: SpacesToShow,
    pub screens_to_show: ScreensToShow,
    pub show_minimized_windows: bool,
    pub show_hidden_windows: bool,
    pub show_fullscreen_windows: bool,
    pub show_titleless_windows: bool,
    pub excluded_bundle_ids: Vec<String>,
}

impl Default for WindowFilters {
    fn default() -> Self {
        WindowFilters {
            apps_to_show: AppsToShow::All,
            spaces_to_show: SpacesToShow::Visible,
            screens_to_show: ScreensToShow::All,
            show_minimized_windows: true,
            show_hidden_windows: true,
            show_fullscreen_windows: true,
            show_titleless_windows: false,
            excluded_bundle_ids: Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct OrderingSettings {
    /// Move a window to the front of the list whenever it gains focus.
    pub most_recent_first: bool,
}

impl Default for OrderingSettings {
    fn default() -> Self { OrderingSettings { most_recent_first: true } }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&buf).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let config: Config = toml::from_str(buf)?;
        Ok(config)
    }

    /// Returns a list of human readable problems with the config. Empty if ok.
    pub fn validate(&self) -> Vec<String> {
        let s = &self.settings;
        let mut issues = Vec::new();
        if s.ax_timeout.is_zero() {
            issues.push("settings.ax_timeout_ms must be greater than zero".to_string());
        }
        if s.ax_retry_interval > s.ax_timeout {
            issues.push(format!(
                "settings.ax_retry_interval_ms ({}) exceeds settings.ax_timeout_ms ({})",
                s.ax_retry_interval.as_millis(),
                s.ax_timeout.as_millis()
            ));
        }
        if s.blocking_discovery_timeout > Duration::from_secs(10) {
            issues.push(
                "settings.blocking_discovery_timeout_ms above 10000 stalls startup".to_string(),
            );
        }
        for id in &s.filters.excluded_bundle_ids {
            if id.trim().is_empty() {
                issues.push("settings.filters.excluded_bundle_ids contains an empty id".into());
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn parses_durations_and_filters() {
        let config = Config::parse(
            r#"
            [settings]
            ax_timeout_ms = 500
            window_display_delay_ms = 80

            [settings.filters]
            apps_to_show = "active"
            spaces_to_show = "all"
            show_minimized_windows = false
            excluded_bundle_ids = ["com.example.hidden"]

            [settings.ordering]
            most_recent_first = false
            "#,
        )
        .unwrap();
        let s = &config.settings;
        assert_eq!(s.ax_timeout, Duration::from_millis(500));
        assert_eq!(s.window_display_delay, Duration::from_millis(80));
        assert_eq!(s.ax_retry_interval, Duration::from_millis(10));
        assert_eq!(s.filters.apps_to_show, AppsToShow::Active);
        assert_eq!(s.filters.spaces_to_show, SpacesToShow::All);
        assert!(!s.filters.show_minimized_windows);
        assert!(s.filters.show_hidden_windows);
        assert_eq!(s.filters.excluded_bundle_ids, vec!["com.example.hidden".to_string()]);
        assert!(!s.ordering.most_recent_first);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(Config::parse("[settings]\nnot_a_setting = 1\n").is_err());
    }

    #[test]
    fn validate_flags_zero_timeout() {
        let mut config = Config::default();
        assert!(config.validate().is_empty());
        config.settings.ax_timeout = Duration::ZERO;
        let issues = config.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("ax_timeout_ms"));
    }

    #[test]
    fn read_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::read(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn read_reports_path_on_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[settings\n").unwrap();
        let err = Config::read(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing config file"));
    }
}
