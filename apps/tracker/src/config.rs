use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use session_core::ControllerConfig;

pub const DEFAULT_CONFIG_PATH: &str = "tracker.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_url: String,
    pub log_filter: String,
    pub command_queue_capacity: usize,
    pub event_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let controller = ControllerConfig::default();
        Self {
            database_url: "sqlite://./data/sleep.db".into(),
            log_filter: "info".into(),
            command_queue_capacity: controller.command_capacity,
            event_capacity: controller.event_capacity,
        }
    }
}

impl Settings {
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            command_capacity: self.command_queue_capacity.max(1),
            event_capacity: self.event_capacity.max(1),
        }
    }
}

/// Defaults, then the config file, then environment overrides.
///
/// An explicitly requested file must exist; the default `tracker.toml` is optional.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let (path, required) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };

    let mut settings = if path.exists() {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        toml::from_str::<Settings>(&raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?
    } else if required {
        anyhow::bail!("config file '{}' does not exist", path.display());
    } else {
        Settings::default()
    };

    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    settings.database_url = normalize_database_url(&settings.database_url);
    Ok(settings)
}

pub fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = non_empty("TRACKER__DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = non_empty("TRACKER__LOG_FILTER") {
        settings.log_filter = v;
    }
    if let Some(v) = non_empty("TRACKER__COMMAND_QUEUE_CAPACITY") {
        match v.trim().parse::<usize>() {
            Ok(parsed) => settings.command_queue_capacity = parsed,
            Err(_) => tracing::warn!(value = %v, "ignoring invalid TRACKER__COMMAND_QUEUE_CAPACITY"),
        }
    }
    if let Some(v) = non_empty("TRACKER__EVENT_CAPACITY") {
        match v.trim().parse::<usize>() {
            Ok(parsed) => settings.event_capacity = parsed,
            Err(_) => tracing::warn!(value = %v, "ignoring invalid TRACKER__EVENT_CAPACITY"),
        }
    }
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
