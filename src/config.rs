use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::constants::DEFAULT_NAV_TIMEOUT_SECS;
use crate::render::ChromiumConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
    #[error("failed to read targets file {path}: {source}")]
    ReadTargets {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse targets file {path}: {source}")]
    ParseTargets {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Targets
    pub target_url: Option<String>,
    pub targets_file: Option<PathBuf>,
    pub max_pages: u32,
    pub max_questions: Option<usize>,

    // Progress
    pub resume: bool,
    pub reset_progress: bool,

    // Output
    pub output_dir: PathBuf,
    pub diagnostics_dir: PathBuf,
    /// Visible browser window and diagnostic snapshots.
    pub debug: bool,

    // Browser
    pub chrome_path: Option<String>,
    pub nav_timeout: Duration,
}

/// One topic to crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub name: String,
    pub url: String,
    pub pages: u32,
}

#[derive(Debug, Deserialize)]
struct TargetsFile {
    #[serde(default, rename = "target")]
    targets: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    name: Option<String>,
    url: String,
    pages: Option<u32>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Targets
            target_url: optional_env("TARGET_URL"),
            targets_file: optional_env("TARGETS_FILE").map(PathBuf::from),
            max_pages: parse_env_u32("MAX_PAGES", 999)?,
            max_questions: parse_optional_env_usize("MAX_QUESTIONS")?,

            // Progress
            resume: parse_env_bool("RESUME", true)?,
            reset_progress: parse_env_bool("RESET_PROGRESS", false)?,

            // Output
            output_dir: PathBuf::from(env_or_default("OUTPUT_DIR", "./scraped_data")),
            diagnostics_dir: PathBuf::from(env_or_default("DIAGNOSTICS_DIR", "./diagnostics")),
            debug: parse_env_bool("DEBUG", false)?,

            // Browser
            chrome_path: optional_env("CHROME_PATH"),
            nav_timeout: Duration::from_secs(parse_env_u64(
                "NAV_TIMEOUT_SECS",
                DEFAULT_NAV_TIMEOUT_SECS,
            )?),
        })
    }

    /// Configuration for a single target with local defaults, for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            target_url: Some("https://community.sap.com/t5/scm-q-a/qa-p/scm-questions".to_string()),
            targets_file: None,
            max_pages: 1,
            max_questions: None,
            resume: true,
            reset_progress: false,
            output_dir: PathBuf::from("./scraped_data"),
            diagnostics_dir: PathBuf::from("./diagnostics"),
            debug: false,
            chrome_path: None,
            nav_timeout: Duration::from_secs(DEFAULT_NAV_TIMEOUT_SECS),
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_url.is_none() && self.targets_file.is_none() {
            return Err(ConfigError::MissingEnvVar("TARGET_URL".to_string()));
        }
        if let Some(url) = &self.target_url {
            validate_target_url("TARGET_URL", url)?;
        }
        if self.max_pages == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_PAGES".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.nav_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "NAV_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Topics to crawl: the targets file when set, otherwise `TARGET_URL`.
    ///
    /// # Errors
    ///
    /// Returns an error if the targets file cannot be read or parsed, or lists
    /// an invalid URL or a zero page count.
    pub fn targets(&self) -> Result<Vec<TargetSpec>, ConfigError> {
        if let Some(path) = &self.targets_file {
            return load_targets(path, self.max_pages);
        }
        let url = self
            .target_url
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("TARGET_URL".to_string()))?;
        Ok(vec![TargetSpec {
            name: url.clone(),
            url,
            pages: self.max_pages,
        }])
    }

    #[must_use]
    pub fn chromium_config(&self) -> ChromiumConfig {
        ChromiumConfig {
            chrome_path: self.chrome_path.clone(),
            visible: self.debug,
            request_timeout: self.nav_timeout,
            ..ChromiumConfig::default()
        }
    }
}

fn load_targets(path: &Path, default_pages: u32) -> Result<Vec<TargetSpec>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadTargets {
        path: path.to_path_buf(),
        source,
    })?;
    let targets = parse_targets(&raw, default_pages).map_err(|source| ConfigError::ParseTargets {
        path: path.to_path_buf(),
        source,
    })?;
    for target in &targets {
        validate_target_url("TARGETS_FILE", &target.url)?;
        if target.pages == 0 {
            return Err(ConfigError::InvalidValue {
                name: "TARGETS_FILE".to_string(),
                message: format!("target {} must crawl at least 1 page", target.name),
            });
        }
    }
    Ok(targets)
}

/// Parse `[[target]]` tables. A missing `pages` falls back to `default_pages`,
/// a missing `name` to the URL.
fn parse_targets(raw: &str, default_pages: u32) -> Result<Vec<TargetSpec>, toml::de::Error> {
    let file: TargetsFile = toml::from_str(raw)?;
    Ok(file
        .targets
        .into_iter()
        .map(|t| TargetSpec {
            name: t.name.unwrap_or_else(|| t.url.clone()),
            url: t.url,
            pages: t.pages.unwrap_or(default_pages),
        })
        .collect())
}

fn validate_target_url(name: &str, value: &str) -> Result<(), ConfigError> {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("unsupported scheme '{}' in {value}", url.scheme()),
        }),
        Err(e) => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("'{value}' is not a URL: {e}"),
        }),
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_optional_env_usize(name: &str) -> Result<Option<usize>, ConfigError> {
    optional_env(name)
        .map(|val| {
            val.parse().map_err(|e| ConfigError::ParseInt {
                name: name.to_string(),
                source: e,
            })
        })
        .transpose()
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}
