//! Configuration and logging bootstrap for mdump.
//!
//! Configuration is TOML, discovered per workspace:
//! ```toml
//! [logging]
//! level = "info"        # or any `EnvFilter` directive string
//! json = false
//! stderr = true
//! file = "/tmp/mdump.log"
//!
//! [index]
//! dir = ".mdump/index"  # relative paths resolve against the workspace root
//! threads = 4
//! compression_threshold_bytes = 65536
//!
//! [dump]
//! output = "out/methods.json"
//! on_startup = true
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once, OnceLock};

use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt as _};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::Layer as _;

/// Name of the per-workspace metadata directory.
pub const MDUMP_DIR_NAME: &str = ".mdump";

pub const MDUMP_CONFIG_ENV_VAR: &str = "MDUMP_CONFIG_PATH";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct MdumpConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub dump: DumpConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json: bool,

    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,

    /// Append logs to this file as well. If it cannot be opened, file logging
    /// is skipped and the other sinks stay active.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            "off" | "none" => "off".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        })
    }

    /// The effective filter: the configured level, with `RUST_LOG` directives
    /// appended when set.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        match env_directives {
            Some(env_directives) => {
                let config_directives = Self::normalize_level_directives(&self.level);
                tracing_subscriber::EnvFilter::try_new(format!(
                    "{config_directives},{env_directives}"
                ))
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    /// Store directory; defaults to `.mdump/index` under the workspace root.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Extraction worker threads; defaults to one less than the number of
    /// CPUs, clamped to `1..=8`.
    #[serde(default)]
    pub threads: Option<usize>,

    /// Records at least this large are zstd-compressed on disk.
    #[serde(default = "IndexConfig::default_compression_threshold_bytes")]
    pub compression_threshold_bytes: u64,
}

impl IndexConfig {
    fn default_compression_threshold_bytes() -> u64 {
        64 * 1024
    }

    pub fn resolve_dir(&self, workspace_root: &Path) -> PathBuf {
        match &self.dir {
            Some(dir) => resolve_against(workspace_root, dir),
            None => workspace_root.join(MDUMP_DIR_NAME).join("index"),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: None,
            threads: None,
            compression_threshold_bytes: Self::default_compression_threshold_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DumpConfig {
    /// Snapshot destination; defaults to `.mdump/method-dump/methods.json`.
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Write a snapshot silently whenever the workspace finishes indexing.
    #[serde(default)]
    pub on_startup: bool,
}

impl DumpConfig {
    pub fn resolve_output(&self, workspace_root: &Path) -> Option<PathBuf> {
        self.output
            .as_deref()
            .map(|output| resolve_against(workspace_root, output))
    }
}

fn resolve_against(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // `Display` includes a source snippet; keep only the message.
        ConfigError::Toml(sanitize_toml_error_message(err.message()))
    }
}

fn sanitize_toml_error_message(message: &str) -> String {
    static QUOTED: OnceLock<Option<regex::Regex>> = OnceLock::new();
    let quoted = QUOTED.get_or_init(|| regex::Regex::new(r#""(?:\\.|[^"\\])*""#).ok());
    match quoted {
        Some(quoted) => quoted
            .replace_all(message, r#""<redacted>""#)
            .into_owned(),
        None => message.to_owned(),
    }
}

impl MdumpConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

fn config_env_lock() -> &'static ReentrantMutex<()> {
    static LOCK: OnceLock<ReentrantMutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| ReentrantMutex::new(()))
}

/// Runs `f` while holding the lock that guards [`MDUMP_CONFIG_ENV_VAR`].
///
/// Environment variables are process-global; tests that set the variable
/// wrap the mutation and the discovery in here.
pub fn with_config_env_lock<R>(f: impl FnOnce() -> R) -> R {
    let _guard = config_env_lock().lock();
    f()
}

/// Finds the config file for a workspace root.
///
/// Search order:
/// 1) `MDUMP_CONFIG_PATH` (absolute or relative to `workspace_root`)
/// 2) `mdump.toml`
/// 3) `.mdump.toml`
/// 4) `.mdump/config.toml`
pub fn discover_config_path(workspace_root: &Path) -> Option<PathBuf> {
    let _guard = config_env_lock().lock();
    if let Some(value) = std::env::var_os(MDUMP_CONFIG_ENV_VAR) {
        let path = resolve_against(workspace_root, Path::new(&value));
        return Some(path.canonicalize().unwrap_or(path));
    }

    ["mdump.toml", ".mdump.toml", ".mdump/config.toml"]
        .into_iter()
        .map(|name| workspace_root.join(name))
        .find(|path| path.is_file())
        .map(|path| path.canonicalize().unwrap_or(path))
}

/// Loads the config for a workspace root, or the defaults when none exists.
pub fn load_for_workspace(
    workspace_root: &Path,
) -> Result<(MdumpConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = discover_config_path(workspace_root) else {
        return Ok((MdumpConfig::default(), None));
    };
    let config = MdumpConfig::load_from_path(&path)?;
    tracing::debug!(target: "mdump.config", path = %path.display(), "loaded config");
    Ok((config, Some(path)))
}

static TRACING_INIT: Once = Once::new();

/// Installs the global `tracing` subscriber.
///
/// Only the first call has an effect; later calls (or a subscriber installed
/// by someone else) are left alone.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();

        let mut writer = if config.stderr {
            BoxMakeWriter::new(std::io::stderr)
        } else {
            BoxMakeWriter::new(std::io::sink)
        };
        let file = config.file.as_ref().and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });
        if let Some(file) = file {
            writer = BoxMakeWriter::new(writer.and(Mutex::new(file)));
        }

        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .boxed()
        };

        let _ = tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init();
    });
}
