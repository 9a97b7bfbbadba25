// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Existing project reset.
//!
//! The resetter throws away everything a project can regenerate, i.e., the
//! virtual environment, the SQLite database, and generated migration files,
//! and then rebuilds it from scratch. Every command it runs is strict.
//!
//! # Locked Databases
//!
//! Some platforms refuse to delete a database file that another process still
//! holds open, e.g., a development server that is still running. Removal is
//! attempted once, retried exactly once after a fixed delay, and then given up
//! on with [`ResetError::FileLocked`].

use crate::{
    command::{RunPolicy, Runner},
    config::Settings,
    environment::Environment,
    pipeline::{ensure_administrator, PipelineError, Result, StageError},
    project::Credentials,
};

use ignore::WalkBuilder;
use std::{
    ffi::OsStr,
    fmt::{Display, Formatter, Result as FmtResult},
    fs::remove_file,
    io::ErrorKind,
    path::{Path, PathBuf},
    thread::sleep,
    time::Duration,
};
use tracing::{debug, info, instrument, warn};

/// Reset pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RemoveEnvironment,
    RemoveDatabase,
    RemoveMigrations,
    CreateEnvironment,
    InstallDependencies,
    MakeMigrations,
    ApplyMigrations,
    CreateAdministrator,
}

impl Stage {
    /// Every stage in execution order.
    pub const ALL: [Stage; 8] = [
        Stage::RemoveEnvironment,
        Stage::RemoveDatabase,
        Stage::RemoveMigrations,
        Stage::CreateEnvironment,
        Stage::InstallDependencies,
        Stage::MakeMigrations,
        Stage::ApplyMigrations,
        Stage::CreateAdministrator,
    ];

    /// Human readable stage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RemoveEnvironment => "remove environment",
            Self::RemoveDatabase => "remove database",
            Self::RemoveMigrations => "remove migrations",
            Self::CreateEnvironment => "create environment",
            Self::InstallDependencies => "install dependencies",
            Self::MakeMigrations => "make migrations",
            Self::ApplyMigrations => "apply migrations",
            Self::CreateAdministrator => "create administrator",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

/// Existing project reset pipeline.
pub struct Resetter<'a, R>
where
    R: Runner + ?Sized,
{
    runner: &'a R,
    settings: &'a Settings,
    credentials: &'a Credentials,
    root: PathBuf,
    environment: Option<Environment>,
}

impl<'a, R> Resetter<'a, R>
where
    R: Runner + ?Sized,
{
    /// Construct new resetter for project inside `root`.
    pub fn new(
        runner: &'a R,
        settings: &'a Settings,
        credentials: &'a Credentials,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            settings,
            credentials,
            root: root.into(),
            environment: None,
        }
    }

    /// Run every stage in order.
    ///
    /// Returns the stages that completed.
    ///
    /// # Errors
    ///
    /// - Return [`PipelineError::Aborted`] at the first failing stage.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn run(mut self) -> Result<Vec<Stage>> {
        let mut completed = Vec::with_capacity(Stage::ALL.len());
        for stage in Stage::ALL {
            info!("{stage}");
            self.run_stage(stage)
                .map_err(|source| PipelineError::Aborted {
                    stage: stage.as_str(),
                    source,
                })?;
            completed.push(stage);
        }

        info!("project reset complete");
        Ok(completed)
    }

    fn run_stage(&mut self, stage: Stage) -> Result<(), StageError> {
        let env_dir = self.root.join(&self.settings.runtime.env_dir);
        match stage {
            Stage::RemoveEnvironment => {
                Environment::new(&env_dir)
                    .remove()
                    .map_err(StageError::io(&env_dir))?;
            }
            Stage::RemoveDatabase => {
                let database = self.root.join(&self.settings.reset.database);
                if remove_database(&database, self.settings.reset.lock_retry_delay())? {
                    info!("removed database {:?}", database.display());
                }
            }
            Stage::RemoveMigrations => {
                let count = remove_migrations(&self.root, &env_dir)?;
                info!("removed {count} migration file(s)");
            }
            Stage::CreateEnvironment => {
                let environment = Environment::create(
                    self.runner,
                    RunPolicy::Strict,
                    &self.settings.runtime.python,
                    env_dir,
                )?;
                self.environment = Some(environment);
            }
            Stage::InstallDependencies => {
                let environment = self.environment()?;
                let invocation = if self.root.join("requirements.txt").exists() {
                    info!("install from requirements.txt");
                    environment.pip_install_requirements("requirements.txt")
                } else {
                    info!("install {:?}", self.settings.reset.packages);
                    environment.pip_install(&self.settings.reset.packages)
                };
                self.runner.run_strict(&invocation.current_dir(&self.root))?;
            }
            Stage::MakeMigrations => {
                let invocation = self.environment()?.manage(["makemigrations"]);
                self.runner.run_strict(&invocation.current_dir(&self.root))?;
            }
            Stage::ApplyMigrations => {
                let invocation = self.environment()?.manage(["migrate"]);
                self.runner.run_strict(&invocation.current_dir(&self.root))?;
            }
            Stage::CreateAdministrator => {
                ensure_administrator(
                    self.runner,
                    self.environment()?,
                    &self.root,
                    self.credentials,
                )?;
            }
        }

        Ok(())
    }

    fn environment(&self) -> Result<&Environment, StageError> {
        self.environment
            .as_ref()
            .ok_or(StageError::MissingEnvironment)
    }
}

/// Remove database file, retrying once if it is locked.
///
/// Returns `false` if there was no database file to remove.
///
/// # Errors
///
/// - Return [`ResetError::FileLocked`] if file is still locked after retry.
/// - Return [`ResetError::Remove`] if file cannot be removed for any other
///   reason.
pub fn remove_database(path: impl AsRef<Path>, delay: Duration) -> Result<bool, ResetError> {
    remove_with_retry(path, delay, |path| remove_file(path))
}

/// Remove file through `remove`, retrying once after `delay` if it is locked.
///
/// # Errors
///
/// - Return [`ResetError::FileLocked`] if file is still locked after retry.
/// - Return [`ResetError::Remove`] if file cannot be removed for any other
///   reason.
#[instrument(skip(path, remove), level = "debug")]
pub fn remove_with_retry<F>(
    path: impl AsRef<Path>,
    delay: Duration,
    remove: F,
) -> Result<bool, ResetError>
where
    F: FnMut(&Path) -> std::io::Result<()>,
{
    retry_locked(path.as_ref(), delay, remove, is_locked)
}

fn retry_locked<F, L>(
    path: &Path,
    delay: Duration,
    mut remove: F,
    is_locked: L,
) -> Result<bool, ResetError>
where
    F: FnMut(&Path) -> std::io::Result<()>,
    L: Fn(&std::io::Error) -> bool,
{
    let locked = match remove(path) {
        Ok(()) => return Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
        Err(err) if is_locked(&err) => err,
        Err(err) => return Err(ResetError::remove(path, err)),
    };

    warn!(
        "{:?} is locked ({locked}), retrying in {delay:?}",
        path.display()
    );
    sleep(delay);

    match remove(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) if is_locked(&err) => Err(ResetError::FileLocked {
            path: path.to_path_buf(),
        }),
        Err(err) => Err(ResetError::remove(path, err)),
    }
}

/// Remove generated migration files below `root`.
///
/// Removes every `.py` file whose parent directory path ends with
/// "migrations", except package markers (`__init__.py`). Never descends into
/// `exclude`, which is meant to be the configured virtual environment
/// directory, nor into any other directory holding a `pyvenv.cfg`. Returns
/// the number of removed files.
///
/// # Errors
///
/// - Return [`ResetError::Walk`] if directory traversal fails.
/// - Return [`ResetError::Remove`] if a migration file cannot be removed.
#[instrument(skip(root, exclude), level = "debug")]
pub fn remove_migrations(
    root: impl AsRef<Path>,
    exclude: impl AsRef<Path>,
) -> Result<usize, ResetError> {
    let exclude = exclude.as_ref().to_path_buf();
    let walker = WalkBuilder::new(root.as_ref())
        .standard_filters(false)
        .filter_entry(move |entry| {
            entry.depth() == 0
                || (entry.path() != exclude && !entry.path().join("pyvenv.cfg").is_file())
        })
        .build();

    let mut count = 0;
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_some_and(|kind| kind.is_file()) {
            continue;
        }

        let path = entry.path();
        if path.extension() != Some(OsStr::new("py"))
            || path.file_name() == Some(OsStr::new("__init__.py"))
        {
            continue;
        }

        let in_migrations = path
            .parent()
            .is_some_and(|parent| parent.to_string_lossy().ends_with("migrations"));
        if in_migrations {
            debug!("remove {:?}", path.display());
            remove_file(path).map_err(|err| ResetError::remove(path, err))?;
            count += 1;
        }
    }

    Ok(count)
}

fn is_locked(err: &std::io::Error) -> bool {
    // INVARIANT: Only Windows sharing and lock violations (32, 33) count.
    cfg!(windows) && is_sharing_violation(err)
}

fn is_sharing_violation(err: &std::io::Error) -> bool {
    matches!(err.raw_os_error(), Some(32) | Some(33))
}

/// Project cleanup error types.
#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    /// File is still held open by another process.
    #[error("{:?} is locked by another process, close any program using it", path.display())]
    FileLocked { path: PathBuf },

    /// File cannot be removed.
    #[error("failed to remove {:?}", path.display())]
    Remove {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Directory traversal fails.
    #[error(transparent)]
    Walk(#[from] ignore::Error),
}

impl ResetError {
    fn remove(path: &Path, source: std::io::Error) -> Self {
        Self::Remove {
            source,
            path: path.to_path_buf(),
        }
    }
}
