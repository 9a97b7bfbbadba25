// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Patches for a generated `settings.py`.

use crate::{
    document::Document,
    patch::{insert_after_anchor, register_in_block, Outcome, Position},
};

/// Register applications in `INSTALLED_APPS`.
pub fn register_apps(document: &mut Document, apps: &[String]) -> Outcome {
    register_in_block(document, "INSTALLED_APPS = [", apps, Position::End)
}

/// Configure static and media file locations.
///
/// Static settings go right after `STATIC_URL`, media settings are appended
/// to the end of the file. Each group is skipped when already configured.
pub fn configure_static_and_media(document: &mut Document) -> Vec<Outcome> {
    let static_files = insert_after_anchor(
        document,
        Some("STATIC_URL"),
        "STATIC_ROOT",
        [
            "STATIC_ROOT = BASE_DIR / 'staticfiles'",
            "STATICFILES_DIRS = [BASE_DIR / 'static']",
        ],
    );
    let media_files = insert_after_anchor(
        document,
        None,
        "MEDIA_ROOT",
        ["MEDIA_URL = '/media/'", "MEDIA_ROOT = BASE_DIR / 'media'"],
    );

    vec![static_files, media_files]
}

/// Serve compressed, cache-friendly static files through WhiteNoise.
///
/// Must run after [`configure_static_and_media`], because the storage block
/// is anchored on `STATICFILES_DIRS` to keep static settings together.
pub fn enable_compression(document: &mut Document) -> Vec<Outcome> {
    let middleware = register_in_block(
        document,
        "MIDDLEWARE = [",
        ["whitenoise.middleware.WhiteNoiseMiddleware"],
        Position::After("django.middleware.security.SecurityMiddleware"),
    );
    let max_age = insert_after_anchor(
        document,
        Some("STATICFILES_DIRS"),
        "WHITENOISE_MAX_AGE",
        ["WHITENOISE_MAX_AGE = 31536000"],
    );
    let storages = insert_after_anchor(
        document,
        Some("STATICFILES_DIRS"),
        "STORAGES",
        [
            "STORAGES = {",
            "    'default': {",
            "        'BACKEND': 'django.core.files.storage.FileSystemStorage',",
            "    },",
            "    'staticfiles': {",
            "        'BACKEND': 'whitenoise.storage.CompressedManifestStaticFilesStorage',",
            "    },",
            "}",
        ],
    );

    vec![middleware, storages, max_age]
}
