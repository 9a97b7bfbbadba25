// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! New project scaffolding.
//!
//! The bootstrapper turns a validated [`ProjectDescriptor`] into a working
//! project: environment, generated code, patched configuration, repository,
//! database, and administrator account.
//!
//! # Document Handling
//!
//! The project's `settings.py` and `urls.py` are read into memory the first
//! time a stage needs them. Every later patch edits that in-memory copy, and
//! both files are written back once at [`Stage::WritePatchedFiles`], before
//! any stage that needs Django to see the patched configuration.

use crate::{
    command::{Invocation, RunPolicy, Runner},
    config::Settings,
    document::Document,
    environment::Environment,
    pipeline::{ensure_administrator, load_document, report, PipelineError, Result, StageError},
    project::{routes, settings, templates, ProjectDescriptor},
    vcs,
};

use mkdirp::mkdirp;
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::write,
    path::PathBuf,
};
use tracing::{info, instrument, warn};

/// Bootstrap pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PrepareRoot,
    CreateEnvironment,
    InstallDependencies,
    GenerateProject,
    GenerateApps,
    PatchRegistration,
    PatchStaticMedia,
    PatchCompression,
    EnsureAssetDirs,
    GenerateAppRoutes,
    PatchProjectRoutes,
    PatchStaticServing,
    WritePatchedFiles,
    WriteSeoModel,
    WriteIgnoreFile,
    FreezeDependencies,
    InitVersionControl,
    RunMigrations,
    CreateAdministrator,
    LaunchEditor,
}

impl Stage {
    /// Every stage in execution order.
    pub const ALL: [Stage; 20] = [
        Stage::PrepareRoot,
        Stage::CreateEnvironment,
        Stage::InstallDependencies,
        Stage::GenerateProject,
        Stage::GenerateApps,
        Stage::PatchRegistration,
        Stage::PatchStaticMedia,
        Stage::PatchCompression,
        Stage::EnsureAssetDirs,
        Stage::GenerateAppRoutes,
        Stage::PatchProjectRoutes,
        Stage::PatchStaticServing,
        Stage::WritePatchedFiles,
        Stage::WriteSeoModel,
        Stage::WriteIgnoreFile,
        Stage::FreezeDependencies,
        Stage::InitVersionControl,
        Stage::RunMigrations,
        Stage::CreateAdministrator,
        Stage::LaunchEditor,
    ];

    /// Human readable stage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrepareRoot => "prepare root",
            Self::CreateEnvironment => "create environment",
            Self::InstallDependencies => "install dependencies",
            Self::GenerateProject => "generate project",
            Self::GenerateApps => "generate apps",
            Self::PatchRegistration => "patch app registration",
            Self::PatchStaticMedia => "patch static and media settings",
            Self::PatchCompression => "patch static compression",
            Self::EnsureAssetDirs => "ensure static and media directories",
            Self::GenerateAppRoutes => "generate app routes",
            Self::PatchProjectRoutes => "patch project routes",
            Self::PatchStaticServing => "patch static serving",
            Self::WritePatchedFiles => "write patched files",
            Self::WriteSeoModel => "write seo model",
            Self::WriteIgnoreFile => "write ignore file",
            Self::FreezeDependencies => "freeze dependencies",
            Self::InitVersionControl => "initialize version control",
            Self::RunMigrations => "run migrations",
            Self::CreateAdministrator => "create administrator",
            Self::LaunchEditor => "launch editor",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

/// New project scaffolding pipeline.
pub struct Bootstrapper<'a, R>
where
    R: Runner + ?Sized,
{
    runner: &'a R,
    settings: &'a Settings,
    project: &'a ProjectDescriptor,
    root: PathBuf,
    launch_editor: bool,
    environment: Option<Environment>,
    settings_file: Option<Document>,
    urls_file: Option<Document>,
}

impl<'a, R> Bootstrapper<'a, R>
where
    R: Runner + ?Sized,
{
    /// Construct new bootstrapper generating project inside `root`.
    pub fn new(
        runner: &'a R,
        settings: &'a Settings,
        project: &'a ProjectDescriptor,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            settings,
            project,
            root: root.into(),
            launch_editor: true,
            environment: None,
            settings_file: None,
            urls_file: None,
        }
    }

    /// Open configured editor on the new project once everything is done.
    pub fn launch_editor(mut self, launch: bool) -> Self {
        self.launch_editor = launch;
        self
    }

    /// Stages that will run, in order.
    pub fn stages(&self) -> Vec<Stage> {
        let extras = self.project.extras();
        Stage::ALL
            .into_iter()
            .filter(|stage| match stage {
                Stage::PatchCompression => extras.whitenoise,
                Stage::WriteSeoModel => extras.seo_model,
                Stage::LaunchEditor => self.launch_editor && self.settings.runtime.editor.is_some(),
                _ => true,
            })
            .collect()
    }

    /// Run every stage in order.
    ///
    /// Returns the stages that completed.
    ///
    /// # Errors
    ///
    /// - Return [`PipelineError::Aborted`] at the first failing stage.
    #[instrument(skip(self), fields(project = self.project.name()))]
    pub fn run(mut self) -> Result<Vec<Stage>> {
        let stages = self.stages();
        let mut completed = Vec::with_capacity(stages.len());
        for stage in stages {
            info!("{stage}");
            self.run_stage(stage)
                .map_err(|source| PipelineError::Aborted {
                    stage: stage.as_str(),
                    source,
                })?;
            completed.push(stage);
        }

        info!("project {:?} is ready", self.project.name());
        if let Some(environment) = self.environment.as_ref() {
            info!(
                "activate the environment with: {}",
                environment.activation_command()
            );
        }

        Ok(completed)
    }

    fn run_stage(&mut self, stage: Stage) -> Result<(), StageError> {
        match stage {
            Stage::PrepareRoot => self.prepare_root(),
            Stage::CreateEnvironment => self.create_environment(),
            Stage::InstallDependencies => self.install_dependencies(),
            Stage::GenerateProject => self.generate_project(),
            Stage::GenerateApps => self.generate_apps(),
            Stage::PatchRegistration => self.patch_registration(),
            Stage::PatchStaticMedia => self.patch_static_media(),
            Stage::PatchCompression => self.patch_compression(),
            Stage::EnsureAssetDirs => self.ensure_asset_dirs(),
            Stage::GenerateAppRoutes => self.generate_app_routes(),
            Stage::PatchProjectRoutes => self.patch_project_routes(),
            Stage::PatchStaticServing => self.patch_static_serving(),
            Stage::WritePatchedFiles => self.write_patched_files(),
            Stage::WriteSeoModel => self.write_seo_model(),
            Stage::WriteIgnoreFile => self.write_ignore_file(),
            Stage::FreezeDependencies => self.freeze_dependencies(),
            Stage::InitVersionControl => self.init_version_control(),
            Stage::RunMigrations => self.run_migrations(),
            Stage::CreateAdministrator => self.create_administrator(),
            Stage::LaunchEditor => self.open_editor(),
        }
    }

    fn environment(&self) -> Result<&Environment, StageError> {
        self.environment
            .as_ref()
            .ok_or(StageError::MissingEnvironment)
    }

    fn scaffold(&self, invocation: Invocation) -> Result<(), StageError> {
        self.runner.run(&invocation.current_dir(&self.root))?;
        Ok(())
    }

    fn prepare_root(&mut self) -> Result<(), StageError> {
        mkdirp(&self.root).map_err(StageError::io(&self.root))?;
        info!(
            "project {:?} with apps {:?} in {:?}",
            self.project.name(),
            self.project.apps(),
            self.root.display()
        );

        Ok(())
    }

    fn create_environment(&mut self) -> Result<(), StageError> {
        let environment = Environment::create(
            self.runner,
            self.runner.policy(),
            &self.settings.runtime.python,
            self.root.join(&self.settings.runtime.env_dir),
        )?;
        self.environment = Some(environment);

        Ok(())
    }

    fn install_dependencies(&mut self) -> Result<(), StageError> {
        let mut packages = self.settings.runtime.packages.clone();
        if self.project.extras().whitenoise && !packages.iter().any(|p| p == "whitenoise") {
            packages.push("whitenoise".into());
        }

        let invocation = self.environment()?.pip_install(packages);
        self.scaffold(invocation)
    }

    fn generate_project(&mut self) -> Result<(), StageError> {
        let invocation = self
            .environment()?
            .django_admin(["startproject", self.project.name(), "."]);
        self.scaffold(invocation)
    }

    fn generate_apps(&mut self) -> Result<(), StageError> {
        for app in self.project.apps() {
            info!("create app {app:?}");
            let invocation = self.environment()?.manage(["startapp", app.as_str()]);
            self.scaffold(invocation)?;
        }

        Ok(())
    }

    fn patch_registration(&mut self) -> Result<(), StageError> {
        let path = self.project.settings_path(&self.root);
        let document = load_document(&mut self.settings_file, path.clone())?;
        report(&path, [settings::register_apps(document, self.project.apps())]);

        Ok(())
    }

    fn patch_static_media(&mut self) -> Result<(), StageError> {
        let path = self.project.settings_path(&self.root);
        let document = load_document(&mut self.settings_file, path.clone())?;
        report(&path, settings::configure_static_and_media(document));

        Ok(())
    }

    fn patch_compression(&mut self) -> Result<(), StageError> {
        let path = self.project.settings_path(&self.root);
        let document = load_document(&mut self.settings_file, path.clone())?;
        report(&path, settings::enable_compression(document));

        Ok(())
    }

    fn ensure_asset_dirs(&mut self) -> Result<(), StageError> {
        for name in ["static", "media"] {
            let dir = self.root.join(name);
            mkdirp(&dir).map_err(StageError::io(&dir))?;
        }

        Ok(())
    }

    fn generate_app_routes(&mut self) -> Result<(), StageError> {
        for app in self.project.apps() {
            let path = self.root.join(app).join("urls.py");
            if path.exists() {
                info!("keep existing {:?}", path.display());
                continue;
            }

            write(&path, templates::APP_URLS).map_err(StageError::io(&path))?;
        }

        Ok(())
    }

    fn patch_project_routes(&mut self) -> Result<(), StageError> {
        let path = self.project.urls_path(&self.root);
        let document = load_document(&mut self.urls_file, path.clone())?;
        report(&path, routes::register_app_routes(document, self.project.apps()));

        Ok(())
    }

    fn patch_static_serving(&mut self) -> Result<(), StageError> {
        let path = self.project.urls_path(&self.root);
        let document = load_document(&mut self.urls_file, path.clone())?;
        report(&path, routes::enable_static_serving(document));

        Ok(())
    }

    fn write_patched_files(&mut self) -> Result<(), StageError> {
        for document in [&mut self.settings_file, &mut self.urls_file]
            .into_iter()
            .flatten()
        {
            document.save()?;
        }

        Ok(())
    }

    fn write_seo_model(&mut self) -> Result<(), StageError> {
        let path = self.root.join(self.project.name()).join("seo.py");
        if path.exists() {
            info!("keep existing {:?}", path.display());
            return Ok(());
        }

        write(&path, templates::SEO_MODEL).map_err(StageError::io(&path))
    }

    fn write_ignore_file(&mut self) -> Result<(), StageError> {
        let path = self.root.join(".gitignore");
        let contents = templates::gitignore(&self.settings.runtime.env_dir);
        write(&path, contents).map_err(StageError::io(&path))
    }

    fn freeze_dependencies(&mut self) -> Result<(), StageError> {
        let invocation = self.environment()?.pip_freeze().current_dir(&self.root);
        let output = self.runner.run(&invocation)?;
        if !output.is_success() {
            return Ok(());
        }

        let path = self.root.join("requirements.txt");
        write(&path, output.stdout).map_err(StageError::io(&path))
    }

    fn init_version_control(&mut self) -> Result<(), StageError> {
        match vcs::init_and_commit(&self.root, "first commit") {
            Ok(_) => Ok(()),
            Err(error) if self.runner.policy() == RunPolicy::Lenient => {
                warn!("skip version control: {error}");
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }

    fn run_migrations(&mut self) -> Result<(), StageError> {
        let invocation = self.environment()?.manage(["migrate"]);
        self.scaffold(invocation)
    }

    fn create_administrator(&mut self) -> Result<(), StageError> {
        ensure_administrator(
            self.runner,
            self.environment()?,
            &self.root,
            self.project.credentials(),
        )?;

        Ok(())
    }

    fn open_editor(&mut self) -> Result<(), StageError> {
        let Some(editor) = self.settings.runtime.editor.as_deref() else {
            return Ok(());
        };

        let invocation = Invocation::new(editor).arg(".").current_dir(&self.root);
        self.runner.run_with(RunPolicy::Lenient, &invocation)?;

        Ok(())
    }
}
