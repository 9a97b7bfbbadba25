// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{
    integration::{blog_and_shop, PASSWORD},
    workspace, MockRunner,
};

use djinit::{
    command::RunPolicy,
    config::Settings,
    pipeline::{
        bootstrap::{Bootstrapper, Stage},
        PipelineError,
    },
    project::Extras,
};

use anyhow::Result;
use git2::Repository;
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{fs::read_to_string, path::Path};

#[sealed_test]
fn bootstrap_wires_new_project() -> Result<()> {
    let settings = Settings::default();
    let project = blog_and_shop(Extras::default())?;
    let runner = MockRunner::new(RunPolicy::Lenient);

    let completed = Bootstrapper::new(&runner, &settings, &project, workspace()?)
        .launch_editor(false)
        .run()?;
    let expect = Stage::ALL
        .into_iter()
        .filter(|stage| {
            !matches!(
                stage,
                Stage::PatchCompression | Stage::WriteSeoModel | Stage::LaunchEditor
            )
        })
        .collect::<Vec<_>>();
    assert_eq!(completed, expect);
    assert_eq!(completed.first(), Some(&Stage::PrepareRoot));
    assert_eq!(Stage::PrepareRoot.to_string(), "prepare root");

    let settings_py = read_to_string("mysite/settings.py")?;
    assert!(settings_py.contains("    'django.contrib.staticfiles',\n    'blog',\n    'shop',\n]"));
    assert!(settings_py.contains("STATIC_URL = 'static/'\nSTATIC_ROOT = BASE_DIR / 'staticfiles'\n"));
    assert!(settings_py.contains("MEDIA_ROOT = BASE_DIR / 'media'"));
    assert!(!settings_py.contains("whitenoise"));

    let urls_py = read_to_string("mysite/urls.py")?;
    assert!(urls_py.contains("from django.urls import path, include\n"));
    assert!(urls_py.contains("    path('blog/', include('blog.urls')),\n"));
    assert!(urls_py.contains("    path('shop/', include('shop.urls')),\n"));
    assert!(urls_py.contains("if settings.DEBUG:"));

    assert!(Path::new("blog/urls.py").exists());
    assert!(Path::new("shop/urls.py").exists());
    assert!(Path::new("static").is_dir());
    assert!(Path::new("media").is_dir());
    assert!(!Path::new("mysite/seo.py").exists());
    assert!(read_to_string(".gitignore")?.contains("venv/\n"));
    assert_eq!(
        read_to_string("requirements.txt")?,
        "Django==5.2\nPillow==11.0.0\n"
    );
    assert_eq!(runner.users(), vec!["admin".to_string()]);

    let repo = Repository::open(".")?;
    let tree = repo.head()?.peel_to_commit()?.tree()?;
    assert!(tree.get_name("manage.py").is_some());
    assert!(tree.get_name("venv").is_none());

    Ok(())
}

#[sealed_test]
fn bootstrap_never_exposes_password() -> Result<()> {
    let settings = Settings::default();
    let project = blog_and_shop(Extras::default())?;
    let runner = MockRunner::new(RunPolicy::Lenient);

    Bootstrapper::new(&runner, &settings, &project, workspace()?)
        .launch_editor(false)
        .run()?;

    assert!(runner
        .command_lines()
        .iter()
        .all(|line| !line.contains(PASSWORD)));
    let shell = runner
        .calls()
        .into_iter()
        .find(|call| call.has_arg("shell"))
        .ok_or_else(|| anyhow::anyhow!("superuser shell never ran"))?;
    assert_eq!(
        shell
            .secret("DJANGO_SUPERUSER_PASSWORD")
            .map(|secret| secret.expose().to_string()),
        Some(PASSWORD.to_string())
    );
    assert_eq!(
        shell
            .secret("DJANGO_SUPERUSER_EMAIL")
            .map(|secret| secret.expose().to_string()),
        Some("admin@example.com".to_string())
    );

    Ok(())
}

#[sealed_test]
fn bootstrap_with_extras() -> Result<()> {
    let settings = Settings::default();
    let extras = Extras {
        whitenoise: true,
        seo_model: true,
    };
    let project = blog_and_shop(extras)?;
    let runner = MockRunner::new(RunPolicy::Lenient);

    let completed = Bootstrapper::new(&runner, &settings, &project, workspace()?)
        .launch_editor(false)
        .run()?;
    assert!(completed.contains(&Stage::PatchCompression));
    assert!(completed.contains(&Stage::WriteSeoModel));

    let install = runner
        .calls()
        .into_iter()
        .find(|call| call.has_arg("install"))
        .ok_or_else(|| anyhow::anyhow!("dependencies never installed"))?;
    assert!(install.has_arg("whitenoise"));

    let settings_py = read_to_string("mysite/settings.py")?;
    assert!(settings_py.contains(
        "    'django.middleware.security.SecurityMiddleware',\n    'whitenoise.middleware.WhiteNoiseMiddleware',\n"
    ));
    assert!(settings_py.contains(
        "STATIC_ROOT = BASE_DIR / 'staticfiles'\nSTATICFILES_DIRS = [BASE_DIR / 'static']\nSTORAGES = {\n"
    ));
    assert!(settings_py.contains("CompressedManifestStaticFilesStorage"));
    assert!(settings_py.contains("WHITENOISE_MAX_AGE = 31536000"));
    assert!(read_to_string("mysite/seo.py")?.contains("class SeoBaseModel"));

    Ok(())
}

#[sealed_test]
fn bootstrap_twice_changes_nothing() -> Result<()> {
    let settings = Settings::default();
    let project = blog_and_shop(Extras::default())?;
    let runner = MockRunner::new(RunPolicy::Lenient);

    Bootstrapper::new(&runner, &settings, &project, workspace()?)
        .launch_editor(false)
        .run()?;
    let settings_py = read_to_string("mysite/settings.py")?;
    let urls_py = read_to_string("mysite/urls.py")?;

    Bootstrapper::new(&runner, &settings, &project, workspace()?)
        .launch_editor(false)
        .run()?;
    assert_eq!(read_to_string("mysite/settings.py")?, settings_py);
    assert_eq!(read_to_string("mysite/urls.py")?, urls_py);

    // INVARIANT: Existing administrator is left alone.
    assert_eq!(runner.users(), vec!["admin".to_string()]);

    Ok(())
}

#[sealed_test]
fn strict_policy_aborts_at_failing_stage() -> Result<()> {
    let mut settings = Settings::default();
    settings.commands.policy = RunPolicy::Strict;
    let project = blog_and_shop(Extras::default())?;
    let runner = MockRunner::new(RunPolicy::Strict).fail_on("startproject");

    let result = Bootstrapper::new(&runner, &settings, &project, workspace()?)
        .launch_editor(false)
        .run();
    match result {
        Err(PipelineError::Aborted { stage, .. }) => assert_eq!(stage, "generate project"),
        Ok(_) => panic!("pipeline should abort"),
    }
    assert!(!runner.calls().iter().any(|call| call.has_arg("startapp")));

    Ok(())
}

#[sealed_test]
fn lenient_failure_surfaces_when_settings_are_missing() -> Result<()> {
    let settings = Settings::default();
    let project = blog_and_shop(Extras::default())?;
    let runner = MockRunner::new(RunPolicy::Lenient).fail_on("startproject");

    let result = Bootstrapper::new(&runner, &settings, &project, workspace()?)
        .launch_editor(false)
        .run();
    match result {
        Err(PipelineError::Aborted { stage, .. }) => assert_eq!(stage, "patch registration"),
        Ok(_) => panic!("pipeline should abort"),
    }

    Ok(())
}

#[sealed_test]
fn editor_stage_follows_configuration() -> Result<()> {
    let mut settings = Settings::default();
    let project = blog_and_shop(Extras::default())?;
    let runner = MockRunner::new(RunPolicy::Lenient);

    let stages = Bootstrapper::new(&runner, &settings, &project, workspace()?).stages();
    assert_eq!(stages.last(), Some(&Stage::LaunchEditor));

    let stages = Bootstrapper::new(&runner, &settings, &project, workspace()?)
        .launch_editor(false)
        .stages();
    assert_eq!(stages.last(), Some(&Stage::CreateAdministrator));

    settings.runtime.editor = None;
    let stages = Bootstrapper::new(&runner, &settings, &project, workspace()?).stages();
    assert_eq!(stages.last(), Some(&Stage::CreateAdministrator));

    Ok(())
}
