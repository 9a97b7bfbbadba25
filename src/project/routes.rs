// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Patches for a generated project `urls.py`.

use crate::{
    document::Document,
    patch::{append_block_if_absent, ensure_import, insert_after_line, Outcome},
};

/// Route each application's URL configuration under `<app>/`.
///
/// Routes are placed at the top of `urlpatterns`, in the order given.
pub fn register_app_routes(document: &mut Document, apps: &[String]) -> Vec<Outcome> {
    let import = ensure_import(document, "django.urls", "include");
    let routes = insert_after_line(
        document,
        "urlpatterns = [",
        apps.iter()
            .map(|app| format!("    path('{app}/', include('{app}.urls')),")),
        |document, line| match line.split_once("include(") {
            Some((_, rest)) => {
                let target = rest.split(')').next().unwrap_or(rest);
                document.contains(format!("include({target})"))
            }
            None => document.contains(line.trim()),
        },
    );

    vec![import, routes]
}

/// Serve media and static files in debug mode.
///
/// Skipped entirely if `static(` is already used anywhere in the file.
pub fn enable_static_serving(document: &mut Document) -> Vec<Outcome> {
    if document.contains("static(") {
        return vec![Outcome::AlreadyPresent];
    }

    let settings = ensure_import(document, "django.conf", "settings");
    let static_import = ensure_import(document, "django.conf.urls.static", "static");
    let block = append_block_if_absent(
        document,
        "static(",
        [
            "",
            "if settings.DEBUG:",
            "    urlpatterns += static(settings.MEDIA_URL, document_root=settings.MEDIA_ROOT)",
            "    urlpatterns += static(settings.STATIC_URL, document_root=settings.STATIC_ROOT)",
        ],
    );

    vec![settings, static_import, block]
}
