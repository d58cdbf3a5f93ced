use std::path::{Path, PathBuf};

use anylabeling_common::{Error, Result};
use serde_yaml::Value;
use tracing::info;

use crate::model::Settings;

/// Configuration file location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "configs/server.yaml";

/// Environment variable consulted when the file leaves `security.api_key` empty.
pub const API_KEY_ENV: &str = "XANYLABELING_API_KEY";

pub struct ConfigLoader {
    config_path: PathBuf,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::with_path(DEFAULT_CONFIG_PATH)
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn config_file_exists(&self) -> bool {
        self.config_path.exists()
    }

    /// Resolve settings from the configuration file and the process environment.
    pub fn load(&self) -> Result<LoadedConfig> {
        self.load_with_env(|name| std::env::var(name).ok())
    }

    /// Like [`load`](Self::load), reading environment variables through `env`.
    ///
    /// A missing file resolves exactly like an empty one: every field takes
    /// its default and only the API key secret may be injected.
    pub fn load_with_env<F>(&self, env: F) -> Result<LoadedConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file_found = self.config_path.exists();
        let mut settings = if file_found {
            let contents = std::fs::read_to_string(&self.config_path)?;
            parse_settings(&contents)?
        } else {
            Settings::default()
        };

        let api_key_from_env = inject_api_key(&mut settings, env);
        settings.validate()?;

        Ok(LoadedConfig {
            settings,
            report: LoadReport {
                config_path: self.config_path.clone(),
                file_found,
                api_key_from_env,
            },
        })
    }
}

/// Settings together with a record of how they were resolved.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub settings: Settings,
    pub report: LoadReport,
}

/// What the loader did. Loading runs before any subscriber is installed, so
/// the binary logs this once logging is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub config_path: PathBuf,
    pub file_found: bool,
    pub api_key_from_env: bool,
}

impl LoadReport {
    pub fn messages(&self) -> Vec<String> {
        let path = self.config_path.display();
        let mut messages = vec![if self.file_found {
            format!("loaded config from {path}")
        } else {
            format!("no config file at {path}, using defaults")
        }];
        if self.api_key_from_env {
            messages.push(format!("security.api_key taken from {API_KEY_ENV}"));
        }
        messages
    }

    pub fn log(&self) {
        for message in self.messages() {
            info!("{message}");
        }
    }
}

/// Parse a YAML document into settings. Syntax errors are `ConfigParse`;
/// shape, type and unknown-key errors are `Validation`.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    let document: Value = serde_yaml::from_str(contents)
        .map_err(|e| Error::ConfigParse(format!("failed to parse YAML config: {e}")))?;

    match document {
        Value::Null => Ok(Settings::default()),
        Value::Mapping(_) => serde_yaml::from_value(document)
            .map_err(|e| Error::Validation(e.to_string())),
        other => Err(Error::Validation(format!(
            "expected a mapping at the top level, found {}",
            value_kind(&other)
        ))),
    }
}

/// Fill an empty `security.api_key` from the environment. Returns whether it did.
fn inject_api_key<F>(settings: &mut Settings, env: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    if !settings.security.api_key.is_empty() {
        return false;
    }
    match env(API_KEY_ENV).filter(|k| !k.is_empty()) {
        Some(key) => {
            settings.security.api_key = key;
            true
        }
        None => false,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
