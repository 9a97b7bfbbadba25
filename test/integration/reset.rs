// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{integration::credentials, workspace, MockRunner};

use djinit::{
    command::RunPolicy,
    config::Settings,
    pipeline::{
        reset::{Resetter, Stage},
        PipelineError,
    },
};

use anyhow::Result;
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{
    fs::{create_dir_all, read_to_string, write},
    path::Path,
};

fn existing_project() -> Result<()> {
    write("manage.py", "#!/usr/bin/env python\n")?;
    write("db.sqlite3", "stale database")?;
    create_dir_all("venv/lib")?;
    write("venv/lib/stale.txt", "left over")?;
    create_dir_all("blog/migrations")?;
    write("blog/migrations/__init__.py", "")?;
    write("blog/migrations/0001_initial.py", "# old\n")?;
    write("blog/migrations/0002_post_slug.py", "# old\n")?;

    Ok(())
}

#[sealed_test]
fn reset_rebuilds_project() -> Result<()> {
    existing_project()?;
    write("requirements.txt", "Django==5.2\n")?;
    let settings = Settings::default();
    let credentials = credentials()?;
    let runner = MockRunner::new(RunPolicy::Lenient);

    let completed = Resetter::new(&runner, &settings, &credentials, workspace()?).run()?;
    assert_eq!(completed, Stage::ALL.to_vec());

    assert!(!Path::new("venv/lib/stale.txt").exists());
    assert!(Path::new("venv/pyvenv.cfg").exists());
    assert_eq!(read_to_string("db.sqlite3")?, "SQLite format 3");
    assert!(Path::new("blog/migrations/__init__.py").exists());
    assert!(!Path::new("blog/migrations/0002_post_slug.py").exists());
    assert_eq!(
        read_to_string("blog/migrations/0001_initial.py")?,
        "# generated\n"
    );

    let install = runner
        .calls()
        .into_iter()
        .find(|call| call.has_arg("install"))
        .ok_or_else(|| anyhow::anyhow!("dependencies never installed"))?;
    assert!(install.has_arg("-r"));
    assert!(install.has_arg("requirements.txt"));
    assert_eq!(runner.users(), vec!["admin".to_string()]);

    Ok(())
}

#[sealed_test]
fn reset_installs_default_packages_without_requirements() -> Result<()> {
    existing_project()?;
    let settings = Settings::default();
    let credentials = credentials()?;
    let runner = MockRunner::new(RunPolicy::Lenient).with_user("admin");

    Resetter::new(&runner, &settings, &credentials, workspace()?).run()?;

    let install = runner
        .calls()
        .into_iter()
        .find(|call| call.has_arg("install"))
        .ok_or_else(|| anyhow::anyhow!("dependencies never installed"))?;
    assert!(!install.has_arg("-r"));
    assert!(install.has_arg("django"));
    assert!(install.has_arg("django-widget-tweaks"));

    // INVARIANT: Existing administrator is reused, not duplicated.
    assert_eq!(runner.users(), vec!["admin".to_string()]);

    Ok(())
}

#[sealed_test]
fn reset_is_strict_regardless_of_policy() -> Result<()> {
    existing_project()?;
    let settings = Settings::default();
    let credentials = credentials()?;
    let runner = MockRunner::new(RunPolicy::Lenient).fail_on("makemigrations");

    let result = Resetter::new(&runner, &settings, &credentials, workspace()?).run();
    match result {
        Err(PipelineError::Aborted { stage, .. }) => assert_eq!(stage, "make migrations"),
        Ok(_) => panic!("reset should abort"),
    }
    assert!(!runner.calls().iter().any(|call| call.has_arg("migrate")));

    Ok(())
}
