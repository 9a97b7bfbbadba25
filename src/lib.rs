// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Django project scaffolding and reset automation.
//!
//! Djinit turns a project name and a list of application names into a fully
//! wired Django project: a private virtual environment, generated project and
//! application skeletons, patched settings and URL configuration, asset
//! directories, an ignore file, a frozen requirements listing, a Git
//! repository with a first commit, applied migrations, and an administrator
//! account. It can also reset an existing project by throwing away its
//! environment, database, and generated migrations before rebuilding them.
//!
//! # Configuration Patching
//!
//! Generated configuration files are edited as plain text through anchor-based
//! insertion. Every patch is idempotent: applying it twice leaves the file
//! exactly as applying it once. A patch whose anchor cannot be found reports
//! [`patch::Outcome::AnchorMissing`] instead of failing, and the pipeline
//! carries on with a warning.
//!
//! # Credentials
//!
//! Administrator credentials are never accepted as command-line arguments,
//! and never written to logs. They travel to child processes through
//! environment variables wrapped in [`command::Secret`].

pub mod command;
pub mod config;
pub mod document;
pub mod environment;
pub mod patch;
pub mod path;
pub mod pipeline;
pub mod project;
pub mod vcs;
