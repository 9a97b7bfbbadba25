// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of djinit's optional configuration file to simplify
//! the process of serialization and deserialization. Every field has a
//! default, so an empty or missing file is a valid configuration.
//!
//! # General Layout
//!
//! ```toml
//! [runtime]
//! python = "python"
//! env_dir = "venv"
//! packages = ["django", "Pillow"]
//! editor = "code"
//!
//! [commands]
//! policy = "lenient"
//!
//! [reset]
//! database = "db.sqlite3"
//! packages = ["django", "django-widget-tweaks"]
//! lock_retry_delay_ms = 1000
//!
//! [admin]
//! email_domain = "example.com"
//! ```

use crate::command::RunPolicy;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use tracing::{debug, instrument};

/// Djinit configuration settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Runtime environment settings.
    pub runtime: RuntimeSettings,

    /// External command handling.
    pub commands: CommandSettings,

    /// Project reset settings.
    pub reset: ResetSettings,

    /// Administrator account settings.
    pub admin: AdminSettings,
}

impl Settings {
    /// Load settings from file.
    ///
    /// A missing file yields default settings.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file contents are invalid.
    /// - Return [`ConfigError::ShellExpansion`] if path fields cannot be
    ///   expanded.
    #[instrument(skip(path), level = "debug")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        match read_to_string(path.as_ref()) {
            Ok(data) => {
                debug!("load settings from {:?}", path.as_ref().display());
                data.parse()
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no settings at {:?}, use defaults", path.as_ref().display());
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::Read {
                source: err,
                path: path.as_ref().to_path_buf(),
            }),
        }
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on path fields.
        settings.runtime.env_dir = expand(&settings.runtime.env_dir)?;
        settings.reset.database = expand(&settings.reset.database)?;

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Runtime environment settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Interpreter used to create the virtual environment.
    pub python: String,

    /// Virtual environment directory, relative to project root.
    pub env_dir: PathBuf,

    /// Packages installed into a new project's environment.
    pub packages: Vec<String>,

    /// Editor to open a new project with.
    pub editor: Option<String>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            python: "python".into(),
            env_dir: PathBuf::from("venv"),
            packages: vec!["django".into(), "Pillow".into()],
            editor: Some("code".into()),
        }
    }
}

/// External command handling.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandSettings {
    /// Policy for scaffolding commands.
    ///
    /// Administrator account creation, and every reset command are always
    /// strict.
    pub policy: RunPolicy,
}

/// Project reset settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResetSettings {
    /// Database file, relative to project root.
    pub database: PathBuf,

    /// Packages installed when project has no `requirements.txt`.
    pub packages: Vec<String>,

    /// Delay before retrying removal of a locked database file.
    pub lock_retry_delay_ms: u64,
}

impl ResetSettings {
    /// Delay before retrying removal of a locked database file.
    pub fn lock_retry_delay(&self) -> Duration {
        Duration::from_millis(self.lock_retry_delay_ms)
    }
}

impl Default for ResetSettings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("db.sqlite3"),
            packages: vec!["django".into(), "django-widget-tweaks".into()],
            lock_retry_delay_ms: 1000,
        }
    }
}

/// Administrator account settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminSettings {
    /// Domain of email address derived from username when none is given.
    pub email_domain: String,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            email_domain: "example.com".into(),
        }
    }
}

fn expand(path: &Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read configuration at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
