//! Configuration types for the welfare board.
//!
//! [`Config::load`] reads `~/.config/welfare-board/config.toml` (or an
//! explicit path), layered over hardcoded defaults and then over
//! `WELFARE_BOARD__SECTION__KEY` environment variables. [`Config::defaults`]
//! returns the same defaults without touching the filesystem (useful in
//! tests).

use crate::error::ConfigError;
use crate::export::RenderOptions;
use crate::validator::{parse_hhmm, TimeWindow, ValidationPolicy, WindowMode};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[watch]
inbox               = "welfare/inbox"
archive_dir         = "welfare/archive"
error_dir           = "welfare/error"
quiescence_ms       = 1500
settle_timeout_secs = 60
rescan_secs         = 30
queue_capacity      = 64
ignore_suffixes     = [".part", ".tmp"]

[output]
dir               = "welfare/output"
basename          = "welfare_board"
html_refresh_secs = 30
text_width        = 64
text_messages     = true
persist_state     = true

[policy]
window_mode  = "off"
hash_message = false

[[policy.windows]]
name  = "Morning Net"
start = "08:00"
end   = "10:00"

[[policy.windows]]
name  = "Evening Net"
start = "19:00"
end   = "21:00"

[logging]
level = "info"
"#;

const ENV_PREFIX: &str = "WELFARE_BOARD";

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub watch: WatchConfig,
    pub output: OutputConfig,
    pub policy: PolicyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    pub inbox: PathBuf,
    pub archive_dir: PathBuf,
    pub error_dir: PathBuf,
    /// How long a file must stay unchanged before it is read.
    pub quiescence_ms: u64,
    /// Give up on a file that never settles after this long.
    pub settle_timeout_secs: u64,
    /// Safety rescan of the inbox; 0 disables.
    pub rescan_secs: u64,
    pub queue_capacity: usize,
    #[serde(default)]
    pub ignore_suffixes: Vec<String>,
}

impl WatchConfig {
    pub fn quiescence(&self) -> Duration {
        Duration::from_millis(self.quiescence_ms)
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_secs(self.settle_timeout_secs)
    }

    pub fn rescan(&self) -> Option<Duration> {
        (self.rescan_secs > 0).then(|| Duration::from_secs(self.rescan_secs))
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub basename: String,
    pub html_refresh_secs: u32,
    pub text_width: usize,
    pub text_messages: bool,
    pub persist_state: bool,
}

impl OutputConfig {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            html_refresh_secs: self.html_refresh_secs,
            text_width: self.text_width,
            text_messages: self.text_messages,
        }
    }
}

/// `[policy]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub window_mode: WindowMode,
    #[serde(default)]
    pub hash_message: bool,
    /// Prior records kept per station; absent means unbounded.
    #[serde(default)]
    pub history_cap: Option<usize>,
    #[serde(default)]
    pub windows: Vec<RawWindow>,
}

/// A window as written in the file; times are checked by [`Config::validate`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawWindow {
    pub name: String,
    pub start: String,
    pub end: String,
}

/// `[logging]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load from `path`, or the per-user config file when `None`, layered on
    /// top of the built-in defaults and under environment overrides.
    ///
    /// An explicit `path` must exist; the per-user file is optional.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let required = path.is_some();
        let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);

        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(path.as_path()).required(required))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }

    /// Parse a TOML document layered over the defaults.
    pub fn from_toml(toml: &str) -> anyhow::Result<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parsed, checked time windows.
    pub fn windows(&self) -> Result<Vec<TimeWindow>, ConfigError> {
        self.policy
            .windows
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let err = |message: String| ConfigError::Window { index, message };
                if raw.name.trim().is_empty() {
                    return Err(err("name is empty".to_string()));
                }
                Ok(TimeWindow::new(
                    raw.name.trim(),
                    parse_hhmm(&raw.start).map_err(err)?,
                    parse_hhmm(&raw.end).map_err(err)?,
                ))
            })
            .collect()
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.quiescence_ms == 0 {
            return Err(ConfigError::Zero("watch.quiescence_ms"));
        }
        if self.watch.settle_timeout_secs == 0 {
            return Err(ConfigError::Zero("watch.settle_timeout_secs"));
        }
        if self.watch.queue_capacity == 0 {
            return Err(ConfigError::Zero("watch.queue_capacity"));
        }
        if self.output.text_width == 0 {
            return Err(ConfigError::Zero("output.text_width"));
        }
        let windows = self.windows()?;
        if self.policy.window_mode != WindowMode::Off && windows.is_empty() {
            return Err(ConfigError::NoWindows(self.policy.window_mode.to_string()));
        }
        Ok(())
    }

    /// Validation policy for the validator.
    pub fn validation_policy(&self) -> Result<ValidationPolicy, ConfigError> {
        Ok(ValidationPolicy {
            windows: self.windows()?,
            window_mode: self.policy.window_mode,
            hash_message: self.policy.hash_message,
        })
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("welfare-board")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
