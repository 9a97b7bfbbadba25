// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use djinit::{
    command::{CommandRunner, Secret},
    config::Settings,
    path::default_config_file,
    pipeline::{bootstrap::Bootstrapper, reset::Resetter},
    project::{split_apps, Credentials, Extras, ProjectDescriptor},
};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, PasswordDisplayMode, Text};
use std::{
    path::{absolute, PathBuf},
    process::exit,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  djinit [options] new [options]\n  djinit [options] reset [options]",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to configuration file to use instead of the default.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let settings = match self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::load(default_config_file()?)?,
        };

        match self.command {
            Command::New(opts) => run_new(opts, &settings),
            Command::Reset(opts) => run_reset(opts, &settings),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Scaffold new Django project with its applications.
    #[command(override_usage = "djinit new [options]")]
    New(NewOptions),

    /// Rebuild environment, database, and migrations of existing project.
    #[command(override_usage = "djinit reset [options]")]
    Reset(ResetOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct NewOptions {
    /// Directory to generate project in.
    #[arg(short = 'C', long, value_name = "path", default_value = ".")]
    pub directory: PathBuf,

    /// Name of project package.
    #[arg(short, long, value_name = "project_name")]
    pub name: Option<String>,

    /// Comma separated list of applications to generate.
    #[arg(short, long, value_name = "app,...")]
    pub apps: Option<String>,

    /// Username of administrator account.
    #[arg(short, long, value_name = "username")]
    pub username: Option<String>,

    /// Email of administrator account.
    #[arg(short, long, value_name = "email")]
    pub email: Option<String>,

    /// Serve compressed static files through WhiteNoise.
    #[arg(long)]
    pub whitenoise: bool,

    /// Provide abstract SEO base model for project models.
    #[arg(long)]
    pub seo_model: bool,

    /// Do not open configured editor when done.
    #[arg(long)]
    pub no_editor: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ResetOptions {
    /// Directory of project to reset.
    #[arg(short = 'C', long, value_name = "path", default_value = ".")]
    pub directory: PathBuf,

    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_new(opts: NewOptions, settings: &Settings) -> Result<()> {
    let name = match opts.name {
        Some(name) => name,
        None => Text::new("Project name:").prompt()?,
    };
    let apps = match opts.apps {
        Some(apps) => split_apps(apps),
        None => split_apps(Text::new("Apps (comma separated):").prompt()?),
    };

    let (env_username, env_password, env_email) = Credentials::from_env();
    let username = match opts.username.or(env_username) {
        Some(username) => username,
        None => Text::new("Superuser username:").prompt()?,
    };
    let password = match env_password {
        Some(password) => password,
        None => prompt_password()?,
    };
    let credentials = Credentials::new(
        username,
        password,
        opts.email.or(env_email),
        &settings.admin.email_domain,
    )?;

    let extras = Extras {
        whitenoise: opts.whitenoise,
        seo_model: opts.seo_model,
    };
    let project = ProjectDescriptor::new(name, apps, extras, credentials)?;

    let runner = CommandRunner::new(settings.commands.policy);
    let root = absolute(&opts.directory)?;
    Bootstrapper::new(&runner, settings, &project, root)
        .launch_editor(!opts.no_editor)
        .run()?;

    Ok(())
}

fn run_reset(opts: ResetOptions, settings: &Settings) -> Result<()> {
    let root = absolute(&opts.directory)?;
    if !root.join("manage.py").exists() {
        bail!("no manage.py in {:?}, not a project directory", root.display());
    }

    if !opts.yes {
        let message = format!(
            "Delete {:?}, {:?}, and all migrations in {:?}?",
            settings.runtime.env_dir.display(),
            settings.reset.database.display(),
            root.display()
        );
        let confirmed = Confirm::new(&message).with_default(false).prompt()?;
        if !confirmed {
            info!("reset cancelled");
            return Ok(());
        }
    }

    let (env_username, env_password, env_email) = Credentials::from_env();
    let username = match env_username {
        Some(username) => username,
        None => Text::new("Superuser username:").prompt()?,
    };
    let password = match env_password {
        Some(password) => password,
        None => prompt_password()?,
    };
    let email = match env_email {
        Some(email) => Some(email),
        None => Some(
            Text::new("Superuser email:")
                .with_help_message("leave blank to derive one from the username")
                .prompt()?,
        ),
    };
    let credentials = Credentials::new(username, password, email, &settings.admin.email_domain)?;

    let runner = CommandRunner::new(settings.commands.policy);
    Resetter::new(&runner, settings, &credentials, root).run()?;

    Ok(())
}

fn prompt_password() -> Result<Secret> {
    let password = Password::new("Superuser password:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()?;

    Ok(Secret::new(password))
}
