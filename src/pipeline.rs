// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Project pipelines.
//!
//! Djinit drives two linear pipelines: the [`bootstrap`] pipeline that
//! scaffolds a brand new project, and the [`reset`] pipeline that tears down
//! and rebuilds an existing project's environment and database.
//!
//! Both pipelines run their stages strictly in order, one external process at
//! a time. There is no branching and no retrying: every stage either succeeds,
//! or the whole pipeline halts with a [`PipelineError`] naming the stage that
//! failed.

pub mod bootstrap;
pub mod reset;

use crate::{
    command::{CommandError, Runner, Secret},
    document::{Document, DocumentError},
    environment::Environment,
    patch::Outcome,
    project::{templates::ENSURE_SUPERUSER, Credentials},
    vcs::VcsError,
};

use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// State of the administrator account after it was ensured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAccount {
    /// Account was created just now.
    Created,

    /// Account already existed, and was left untouched.
    Existing,
}

/// Make sure administrator account exists.
///
/// Creates the superuser through the project's management shell only if no
/// user with the same username exists yet. Credentials are passed to the
/// shell through environment variables. Always runs strictly.
///
/// # Errors
///
/// - Return [`CommandError`] if the management shell fails.
#[instrument(skip_all, level = "debug")]
pub fn ensure_administrator<R>(
    runner: &R,
    environment: &Environment,
    root: impl AsRef<Path>,
    credentials: &Credentials,
) -> Result<AdminAccount, CommandError>
where
    R: Runner + ?Sized,
{
    info!("ensure superuser {:?}", credentials.username());
    let invocation = environment
        .manage(["shell", "-c", ENSURE_SUPERUSER])
        .current_dir(root.as_ref())
        .secret_env(
            "DJANGO_SUPERUSER_USERNAME",
            Secret::new(credentials.username()),
        )
        .secret_env("DJANGO_SUPERUSER_PASSWORD", credentials.password().clone())
        .secret_env("DJANGO_SUPERUSER_EMAIL", Secret::new(credentials.email()));

    let output = runner.run_strict(&invocation)?;
    if output.stdout.lines().any(|line| line.trim() == "exists") {
        info!("superuser {:?} already exists", credentials.username());
        return Ok(AdminAccount::Existing);
    }

    info!("created superuser {:?}", credentials.username());
    Ok(AdminAccount::Created)
}

/// Load document into slot unless it is already loaded.
fn load_document(slot: &mut Option<Document>, path: PathBuf) -> Result<&mut Document, StageError> {
    let document = match slot.take() {
        Some(document) => document,
        None => Document::open(path)?,
    };

    Ok(slot.insert(document))
}

/// Log patch outcomes, warning about patches that could not be placed.
fn report(path: &Path, outcomes: impl IntoIterator<Item = Outcome>) {
    for outcome in outcomes {
        match outcome {
            Outcome::AnchorMissing { anchor } => {
                warn!("cannot patch {:?}: anchor {anchor:?} not found", path.display());
            }
            outcome => debug!("patch {:?}: {outcome}", path.display()),
        }
    }
}

/// Pipeline error types.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Stage failed, and pipeline halted.
    #[error("aborted at stage {stage:?}")]
    Aborted {
        stage: &'static str,
        #[source]
        source: StageError,
    },
}

/// Reasons a single stage can fail.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// External command failed under strict policy.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Configuration file could not be read or written.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Repository could not be initialized.
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// Project files could not be cleaned up.
    #[error(transparent)]
    Reset(#[from] reset::ResetError),

    /// Filesystem operation failed.
    #[error("failed to write {:?}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Stage needs an environment that was never created.
    #[error("virtual environment has not been created yet")]
    MissingEnvironment,
}

impl StageError {
    fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { source, path }
    }
}

/// Friendly result alias :3
type Result<T, E = PipelineError> = std::result::Result<T, E>;
