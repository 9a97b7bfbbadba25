// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External command execution.
//!
//! Every framework tool djinit relies on, e.g., the virtual environment
//! creator, the package installer, `manage.py`, etc., is treated as an opaque
//! external command. This module builds those command lines, runs them to
//! completion one at a time, and decides what a non-zero exit status means.
//!
//! # Run Policies
//!
//! A failed command is handled in one of two ways, selected by a
//! [`RunPolicy`]:
//!
//! - __Lenient__: log a warning and keep going. Scaffolding commands whose
//!   failure will surface later anyway (a missing `settings.py` is fatal to
//!   the patching stages) run this way by default.
//! - __Strict__: abort the pipeline with [`CommandError::Failed`], which
//!   carries the captured standard error of the child.
//!
//! # Secrets
//!
//! Credentials are handed to child processes through environment variables
//! scoped to that child only. They are stored as [`Secret`] values, which
//! never reveal their contents through `Debug` or `Display`, and an
//! [`Invocation`] never includes them in its printed form.

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::{
    ffi::{OsStr, OsString},
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};
use tracing::{debug, info, instrument, warn};

/// How to treat a command that exits unsuccessfully.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPolicy {
    /// Log failure as a warning, and continue.
    #[default]
    Lenient,

    /// Abort with an error.
    Strict,
}

/// Sensitive string value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Construct new secret.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose secret contents.
    ///
    /// Only use this to hand the value over to a child process.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// Check if secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Debug for Secret {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str("Secret(<redacted>)")
    }
}

impl Display for Secret {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str("<redacted>")
    }
}

/// A single external command line.
#[derive(Clone, Debug)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    secrets: Vec<(String, Secret)>,
}

impl Invocation {
    /// Construct new invocation of target program.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            secrets: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a listing of arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run child process from target directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Inject sensitive environment variable into child process only.
    pub fn secret_env(mut self, key: impl Into<String>, value: Secret) -> Self {
        self.secrets.push((key.into(), value));
        self
    }

    /// Program to execute.
    pub fn program(&self) -> &OsStr {
        self.program.as_os_str()
    }

    /// Arguments given to program.
    pub fn get_args(&self) -> &[OsString] {
        self.args.as_slice()
    }

    /// Working directory of child process, if any.
    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Lookup secret environment variable by key.
    pub fn secret(&self, key: impl AsRef<str>) -> Option<&Secret> {
        self.secrets
            .iter()
            .find(|(name, _)| name == key.as_ref())
            .map(|(_, value)| value)
    }

    /// Check if argument list contains target argument.
    pub fn has_arg(&self, arg: impl AsRef<OsStr>) -> bool {
        self.args.iter().any(|known| known.as_os_str() == arg.as_ref())
    }
}

impl Display for Invocation {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.program.to_string_lossy().as_ref())?;
        for arg in &self.args {
            write!(fmt, " {}", arg.to_string_lossy())?;
        }

        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Exit code, `None` if terminated by signal or never started.
    pub code: Option<i32>,

    /// Captured standard output.
    pub stdout: String,

    /// Captured standard error.
    pub stderr: String,
}

impl Output {
    /// Construct successful output with given standard output.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Construct failed output with given exit code and standard error.
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Check if command exited successfully.
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Execute external commands.
///
/// Implementors only need to know how to spawn a command and capture its
/// output. Run policy handling is provided on top of that.
pub trait Runner {
    /// Policy applied by [`Runner::run`].
    fn policy(&self) -> RunPolicy;

    /// Spawn command, wait for it, and capture its output.
    ///
    /// Must not judge the exit status of the command.
    ///
    /// # Errors
    ///
    /// - Return [`CommandError::Spawn`] if the command cannot be started.
    fn execute(&self, invocation: &Invocation) -> Result<Output>;

    /// Run command under configured policy.
    ///
    /// # Errors
    ///
    /// - Return [`CommandError`] if strict policy is configured, and command
    ///   fails.
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        self.run_with(self.policy(), invocation)
    }

    /// Run command, aborting on failure regardless of configured policy.
    ///
    /// # Errors
    ///
    /// - Return [`CommandError::Spawn`] if command cannot be started.
    /// - Return [`CommandError::Failed`] if command exits unsuccessfully.
    fn run_strict(&self, invocation: &Invocation) -> Result<Output> {
        self.run_with(RunPolicy::Strict, invocation)
    }

    /// Run command under target policy.
    ///
    /// # Errors
    ///
    /// - Return [`CommandError`] if `policy` is strict, and command fails.
    fn run_with(&self, policy: RunPolicy, invocation: &Invocation) -> Result<Output> {
        let output = match self.execute(invocation) {
            Ok(output) => output,
            Err(error) if policy == RunPolicy::Lenient => {
                warn!("{error}");
                return Ok(Output::default());
            }
            Err(error) => return Err(error),
        };

        if output.is_success() {
            return Ok(output);
        }

        match policy {
            RunPolicy::Lenient => {
                warn!("command {:?} failed, continuing", invocation.to_string());
                Ok(output)
            }
            RunPolicy::Strict => Err(CommandError::Failed {
                command: invocation.to_string(),
                code: output.code,
                stderr: chomp(output.stderr),
            }),
        }
    }
}

/// Runner that executes commands as child processes.
#[derive(Debug, Default, Clone)]
pub struct CommandRunner {
    policy: RunPolicy,
}

impl CommandRunner {
    /// Construct new command runner.
    pub fn new(policy: RunPolicy) -> Self {
        Self { policy }
    }
}

impl Runner for CommandRunner {
    fn policy(&self) -> RunPolicy {
        self.policy
    }

    #[instrument(skip(self, invocation), level = "debug")]
    fn execute(&self, invocation: &Invocation) -> Result<Output> {
        let command_line = invocation.to_string();
        info!("run {command_line}");

        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template(
            "{spinner:.green} {elapsed_precise:.dim}  {msg}",
        )?);
        bar.set_message(command_line.clone());
        bar.enable_steady_tick(Duration::from_millis(100));

        let mut command = Command::new(invocation.program());
        command.args(invocation.get_args());
        if let Some(dir) = invocation.get_current_dir() {
            command.current_dir(dir);
        }
        for (key, value) in &invocation.secrets {
            command.env(key, value.expose());
        }

        let output = command.output();
        bar.finish_and_clear();
        let output = output.map_err(|err| CommandError::Spawn {
            source: err,
            command: command_line.clone(),
        })?;

        let output = Output {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(output.stdout.as_slice()).into_owned(),
            stderr: String::from_utf8_lossy(output.stderr.as_slice()).into_owned(),
        };

        for line in output.stdout.lines().filter(|line| !line.trim().is_empty()) {
            info!("{line}");
        }
        for line in output.stderr.lines().filter(|line| !line.trim().is_empty()) {
            debug!("{line}");
        }

        Ok(output)
    }
}

// INVARIANT: Chomp trailing newlines.
fn chomp(message: String) -> String {
    message.trim_end_matches(['\r', '\n']).to_string()
}

/// Command execution error types.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Command could not be started at all.
    #[error("failed to start command {command:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        command: String,
    },

    /// Command exited unsuccessfully under strict policy.
    #[error("command {command:?} failed with exit code {code:?}:\n{stderr}")]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Style template cannot be set for progress spinner.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),
}

/// Friendly result alias :3
pub type Result<T, E = CommandError> = std::result::Result<T, E>;
