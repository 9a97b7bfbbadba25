// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

mod bootstrap;
mod reset;

use djinit::{
    command::Secret,
    project::{Credentials, Extras, ProjectDescriptor},
};

use anyhow::Result;

pub(crate) const PASSWORD: &str = "correct-horse-battery";

pub(crate) fn credentials() -> Result<Credentials> {
    Ok(Credentials::new(
        "admin",
        Secret::new(PASSWORD),
        None,
        "example.com",
    )?)
}

pub(crate) fn blog_and_shop(extras: Extras) -> Result<ProjectDescriptor> {
    Ok(ProjectDescriptor::new(
        "mysite",
        ["blog", "shop"],
        extras,
        credentials()?,
    )?)
}
