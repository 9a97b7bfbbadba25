// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Static file contents written into generated projects.

use std::path::Path;

/// URL configuration stub for a freshly generated application.
pub const APP_URLS: &str = "from django.urls import path\n\nurlpatterns = [\n]\n";

/// Abstract base model carrying SEO metadata and freshness timestamps.
pub const SEO_MODEL: &str = r#"from django.db import models


class SeoBaseModel(models.Model):
    """Shared SEO metadata and timestamps for content models."""

    meta_title = models.CharField(
        max_length=70,
        blank=True,
        help_text="Recommended: 50-60 characters. Overrides the HTML <title> tag.",
    )
    meta_description = models.CharField(
        max_length=160,
        blank=True,
        help_text="Recommended: 140-160 characters. Used for search result snippets.",
    )
    created_at = models.DateTimeField(auto_now_add=True)
    updated_at = models.DateTimeField(auto_now=True)

    class Meta:
        abstract = True
        ordering = ["-updated_at"]

    def get_meta_title(self, fallback: str | None = None) -> str:
        return self.meta_title or fallback or ""

    def get_meta_description(self, fallback: str | None = None) -> str:
        return self.meta_description or fallback or ""
"#;

/// Management shell script that creates the superuser only when missing.
///
/// Credentials are read from the environment of the shell process, so they
/// never appear on the command line.
pub const ENSURE_SUPERUSER: &str = "import os; \
from django.contrib.auth import get_user_model; \
User = get_user_model(); \
name = os.environ['DJANGO_SUPERUSER_USERNAME']; \
exists = User.objects.filter(username=name).exists(); \
exists or User.objects.create_superuser(name, os.environ['DJANGO_SUPERUSER_EMAIL'], os.environ['DJANGO_SUPERUSER_PASSWORD']); \
print('exists' if exists else 'created')";

/// Render `.gitignore` for a project using target environment directory.
pub fn gitignore(env_dir: impl AsRef<Path>) -> String {
    let env_dir = env_dir.as_ref().to_string_lossy().replace('\\', "/");
    let env_dir = env_dir.trim_end_matches('/');

    format!(
        "# Python\n\
         __pycache__/\n\
         *.py[cod]\n\
         *.sqlite3\n\
         *.log\n\
         \n\
         # Virtual Environment\n\
         {env_dir}/\n\
         \n\
         # Django\n\
         *.env\n\
         media/\n\
         staticfiles/\n\
         \n\
         # VS Code\n\
         .vscode/\n\
         \n\
         # OS\n\
         .DS_Store\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn gitignore_lists_environment_dir() {
        let result = gitignore("envs/site/");
        assert!(result.starts_with("# Python\n__pycache__/\n"));
        assert!(result.contains("\n# Virtual Environment\nenvs/site/\n"));
        assert_eq!(result.lines().last(), Some(".DS_Store"));
    }
}
