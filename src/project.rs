// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Django project description.
//!
//! A __project descriptor__ captures everything the bootstrapper needs to
//! know about the project it is about to generate: the project name, its
//! applications, optional extras, and the administrator account to create.
//! It is built once from user input, validated before any side effect takes
//! place, and never persisted.
//!
//! # Generated Layout
//!
//! Djinit generates projects in place, i.e., `manage.py` lands in the project
//! root next to a package named after the project:
//!
//! ```text
//! <root>/
//!     manage.py
//!     <project>/settings.py
//!     <project>/urls.py
//!     <app>/urls.py
//!     static/
//!     media/
//! ```

pub mod routes;
pub mod settings;
pub mod templates;

use crate::command::Secret;

use std::{
    env,
    path::{Path, PathBuf},
};

/// Environment variable holding administrator username.
pub const ADMIN_USERNAME_VAR: &str = "DJINIT_ADMIN_USERNAME";

/// Environment variable holding administrator password.
pub const ADMIN_PASSWORD_VAR: &str = "DJINIT_ADMIN_PASSWORD";

/// Environment variable holding administrator email.
pub const ADMIN_EMAIL_VAR: &str = "DJINIT_ADMIN_EMAIL";

/// Optional additions to a generated project.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extras {
    /// Serve compressed static files through WhiteNoise.
    pub whitenoise: bool,

    /// Provide abstract SEO base model.
    pub seo_model: bool,
}

/// Administrator account credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: Secret,
    email: String,
}

impl Credentials {
    /// Construct new administrator credentials.
    ///
    /// Email defaults to `<username>@<email_domain>` when absent or blank.
    ///
    /// # Errors
    ///
    /// - Return [`ValidationError::MissingUsername`] if username is blank.
    /// - Return [`ValidationError::MissingPassword`] if password is empty.
    pub fn new(
        username: impl AsRef<str>,
        password: Secret,
        email: Option<String>,
        email_domain: impl AsRef<str>,
    ) -> Result<Self> {
        let username = username.as_ref().trim().to_string();
        if username.is_empty() {
            return Err(ValidationError::MissingUsername);
        }

        if password.is_empty() {
            return Err(ValidationError::MissingPassword);
        }

        let email = email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty())
            .unwrap_or_else(|| format!("{username}@{}", email_domain.as_ref()));

        Ok(Self {
            username,
            password,
            email,
        })
    }

    /// Pull whatever credentials are available from environment variables.
    ///
    /// Returns username, password, and email in that order. Blank values are
    /// treated as absent.
    pub fn from_env() -> (Option<String>, Option<Secret>, Option<String>) {
        let lookup = |key: &str| env::var(key).ok().filter(|value| !value.trim().is_empty());

        (
            lookup(ADMIN_USERNAME_VAR),
            lookup(ADMIN_PASSWORD_VAR).map(Secret::new),
            lookup(ADMIN_EMAIL_VAR),
        )
    }

    /// Administrator username.
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Administrator password.
    pub fn password(&self) -> &Secret {
        &self.password
    }

    /// Administrator email.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }
}

/// Everything needed to generate a new project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    name: String,
    apps: Vec<String>,
    extras: Extras,
    credentials: Credentials,
}

impl ProjectDescriptor {
    /// Construct new validated project descriptor.
    ///
    /// Duplicate application names collapse into their first occurrence.
    ///
    /// # Errors
    ///
    /// - Return [`ValidationError::MissingProjectName`] if name is blank.
    /// - Return [`ValidationError::NoApps`] if there are no applications.
    /// - Return [`ValidationError::InvalidName`] if project or application
    ///   name is not a valid Python identifier.
    /// - Return [`ValidationError::AppNamedAfterProject`] if an application
    ///   shares the project's name.
    pub fn new(
        name: impl AsRef<str>,
        apps: impl IntoIterator<Item = impl AsRef<str>>,
        extras: Extras,
        credentials: Credentials,
    ) -> Result<Self> {
        let name = name.as_ref().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::MissingProjectName);
        }
        validate_identifier(&name)?;

        let mut unique: Vec<String> = Vec::new();
        for app in apps {
            let app = app.as_ref().trim();
            if app.is_empty() || unique.iter().any(|known| known == app) {
                continue;
            }

            validate_identifier(app)?;
            if app == name {
                return Err(ValidationError::AppNamedAfterProject(name));
            }
            unique.push(app.to_string());
        }

        if unique.is_empty() {
            return Err(ValidationError::NoApps);
        }

        Ok(Self {
            name,
            apps: unique,
            extras,
            credentials,
        })
    }

    /// Project name.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Application names in order given.
    pub fn apps(&self) -> &[String] {
        self.apps.as_slice()
    }

    /// Optional extras.
    pub fn extras(&self) -> Extras {
        self.extras
    }

    /// Administrator account credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Path to project's settings module relative to root.
    pub fn settings_path(&self, root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(&self.name).join("settings.py")
    }

    /// Path to project's URL configuration relative to root.
    pub fn urls_path(&self, root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(&self.name).join("urls.py")
    }
}

/// Split comma separated application listing.
pub fn split_apps(listing: impl AsRef<str>) -> Vec<String> {
    listing
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|app| !app.is_empty())
        .map(str::to_owned)
        .collect()
}

fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic());
    if valid_start && chars.all(|c| c == '_' || c.is_ascii_alphanumeric()) {
        return Ok(());
    }

    Err(ValidationError::InvalidName(name.to_string()))
}

/// Input validation error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Project name was not given.
    #[error("project name is required")]
    MissingProjectName,

    /// No application names were given.
    #[error("at least one app is required")]
    NoApps,

    /// Name cannot be used as a Python module.
    #[error("{0:?} is not a valid Python identifier")]
    InvalidName(String),

    /// Application would shadow the project package.
    #[error("app {0:?} cannot share the project's name")]
    AppNamedAfterProject(String),

    /// Administrator username was not given.
    #[error("superuser username is required")]
    MissingUsername,

    /// Administrator password was not given.
    #[error("superuser password is required")]
    MissingPassword,
}

/// Friendly result alias :3
type Result<T, E = ValidationError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use simple_test_case::test_case;

    fn credentials() -> Credentials {
        Credentials::new("admin", Secret::new("s3cret"), None, "example.com").unwrap()
    }

    #[test]
    fn email_defaults_to_username_at_domain() -> anyhow::Result<()> {
        let result = Credentials::new(" admin ", Secret::new("pw"), Some("  ".into()), "example.com")?;
        assert_eq!(result.username(), "admin");
        assert_eq!(result.email(), "admin@example.com");

        let result = Credentials::new("admin", Secret::new("pw"), Some("a@b.org".into()), "x.com")?;
        assert_eq!(result.email(), "a@b.org");

        Ok(())
    }

    #[test]
    fn credentials_require_username_and_password() {
        let result = Credentials::new("", Secret::new("pw"), None, "example.com");
        assert_eq!(result, Err(ValidationError::MissingUsername));

        let result = Credentials::new("admin", Secret::new(""), None, "example.com");
        assert_eq!(result, Err(ValidationError::MissingPassword));
    }

    #[sealed_test(env = [
        ("DJINIT_ADMIN_USERNAME", "root"),
        ("DJINIT_ADMIN_PASSWORD", "hunter2"),
        ("DJINIT_ADMIN_EMAIL", ""),
    ])]
    fn credentials_from_env() {
        let (username, password, email) = Credentials::from_env();
        assert_eq!(username.as_deref(), Some("root"));
        assert_eq!(password.as_ref().map(Secret::expose), Some("hunter2"));
        assert_eq!(email, None);
    }

    #[test]
    fn descriptor_deduplicates_apps() -> anyhow::Result<()> {
        let result = ProjectDescriptor::new(
            "mysite",
            split_apps("blog, shop,,blog , "),
            Extras::default(),
            credentials(),
        )?;
        assert_eq!(result.apps(), ["blog".to_string(), "shop".to_string()]);
        assert_eq!(
            result.settings_path("/srv"),
            PathBuf::from("/srv/mysite/settings.py")
        );

        Ok(())
    }

    #[test_case("", "blog", ValidationError::MissingProjectName; "blank project")]
    #[test_case("mysite", " , ", ValidationError::NoApps; "no apps")]
    #[test_case("my-site", "blog", ValidationError::InvalidName("my-site".into()); "dashed project")]
    #[test_case("mysite", "9lives", ValidationError::InvalidName("9lives".into()); "leading digit app")]
    #[test_case("mysite", "blog,mysite", ValidationError::AppNamedAfterProject("mysite".into()); "app shadows project")]
    #[test]
    fn descriptor_rejects_invalid_input(name: &str, apps: &str, expect: ValidationError) {
        use pretty_assertions::assert_eq;
        let result = ProjectDescriptor::new(name, split_apps(apps), Extras::default(), credentials());
        assert_eq!(result, Err(expect));
    }
}
