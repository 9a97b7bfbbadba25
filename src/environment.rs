// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Isolated Python runtime environments.
//!
//! Each project owns a virtual environment directory holding its own
//! interpreter and package installer. An [`Environment`] is a handle to that
//! directory. It knows where the executables live on the current platform,
//! and builds the [`Invocation`]s every later pipeline stage needs.

use crate::command::{Invocation, RunPolicy, Runner};

use std::{
    fs::remove_dir_all,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

#[cfg(windows)]
const SCRIPTS_DIR: &str = "Scripts";
#[cfg(not(windows))]
const SCRIPTS_DIR: &str = "bin";

/// Handle to a virtual environment directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    root: PathBuf,
}

impl Environment {
    /// Construct handle to environment directory without creating it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create environment at target directory through base interpreter.
    ///
    /// # Errors
    ///
    /// - Return [`crate::command::CommandError`] if `policy` is strict, and
    ///   the command fails.
    #[instrument(skip(runner, python, root), level = "debug")]
    pub fn create<R>(
        runner: &R,
        policy: RunPolicy,
        python: impl AsRef<str>,
        root: impl Into<PathBuf>,
    ) -> crate::command::Result<Self>
    where
        R: Runner + ?Sized,
    {
        let environment = Self::new(root);
        info!("create virtual environment {:?}", environment.root.display());
        let invocation = Invocation::new(python.as_ref())
            .args(["-m", "venv"])
            .arg(environment.root.as_os_str());
        runner.run_with(policy, &invocation)?;

        Ok(environment)
    }

    /// Environment directory.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Path to environment's interpreter.
    pub fn python(&self) -> PathBuf {
        self.root.join(SCRIPTS_DIR).join("python")
    }

    /// Path to environment's package installer.
    pub fn pip(&self) -> PathBuf {
        self.root.join(SCRIPTS_DIR).join("pip")
    }

    /// Shell command that activates environment in an interactive session.
    pub fn activation_command(&self) -> String {
        let script = self.root.join(SCRIPTS_DIR).join("activate");
        if cfg!(windows) {
            script.display().to_string()
        } else {
            format!("source {}", script.display())
        }
    }

    /// Install packages by name.
    pub fn pip_install(&self, packages: impl IntoIterator<Item = impl AsRef<str>>) -> Invocation {
        Invocation::new(self.pip())
            .arg("install")
            .args(packages.into_iter().map(|package| package.as_ref().to_string()))
    }

    /// Install packages listed in requirements file.
    pub fn pip_install_requirements(&self, requirements: impl AsRef<Path>) -> Invocation {
        Invocation::new(self.pip())
            .args(["install", "-r"])
            .arg(requirements.as_ref().as_os_str())
    }

    /// List installed packages in `name==version` form.
    pub fn pip_freeze(&self) -> Invocation {
        Invocation::new(self.pip()).arg("freeze")
    }

    /// Run Django's command-line utility through environment's interpreter.
    pub fn django_admin(&self, args: impl IntoIterator<Item = impl AsRef<str>>) -> Invocation {
        Invocation::new(self.python())
            .args(["-m", "django"])
            .args(args.into_iter().map(|arg| arg.as_ref().to_string()))
    }

    /// Run project's `manage.py` through environment's interpreter.
    pub fn manage(&self, args: impl IntoIterator<Item = impl AsRef<str>>) -> Invocation {
        Invocation::new(self.python())
            .arg("manage.py")
            .args(args.into_iter().map(|arg| arg.as_ref().to_string()))
    }

    /// Remove environment directory.
    ///
    /// Returns `false` if there was nothing to remove.
    ///
    /// # Errors
    ///
    /// - Return [`std::io::Error`] if directory exists but cannot be removed.
    #[instrument(skip(self), level = "debug")]
    pub fn remove(&self) -> std::io::Result<bool> {
        match remove_dir_all(&self.root) {
            Ok(()) => {
                info!("removed virtual environment {:?}", self.root.display());
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[test]
    fn invocations_use_environment_executables() {
        let environment = Environment::new("venv");
        let scripts = Path::new("venv").join(SCRIPTS_DIR);

        let result = environment.manage(["startapp", "blog"]);
        assert_eq!(result.program(), scripts.join("python").as_os_str());
        assert!(result.has_arg("manage.py"));
        assert!(result.has_arg("blog"));

        let result = environment.pip_install(["django", "Pillow"]);
        assert_eq!(result.program(), scripts.join("pip").as_os_str());
        assert_eq!(result.get_args().len(), 3);
    }

    #[test]
    fn activation_command_points_at_scripts_dir() {
        let environment = Environment::new("venv");
        let script = Path::new("venv").join(SCRIPTS_DIR).join("activate");

        let result = environment.activation_command();
        assert!(result.ends_with(script.display().to_string().as_str()));
        assert_eq!(result.starts_with("source "), cfg!(not(windows)));
    }

    #[sealed_test]
    fn remove_missing_environment_is_noop() -> anyhow::Result<()> {
        let environment = Environment::new("venv");
        assert!(!environment.remove()?);

        std::fs::create_dir_all("venv/lib")?;
        assert!(environment.remove()?);
        assert!(!Path::new("venv").exists());

        Ok(())
    }
}
