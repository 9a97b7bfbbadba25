// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Version control for generated projects.
//!
//! New projects start life as a Git repository with everything that is not
//! ignored committed as the first commit. All of it is done through libgit2,
//! so a `git` binary is not required.

use git2::{IndexAddOption, Oid, Repository, Signature};
use std::path::Path;
use tracing::{info, instrument};

/// Initialize repository at target path, and commit all unignored files.
///
/// Reuses an existing repository if there is one. Uses the user's configured
/// identity, falling back to a djinit identity when none is configured.
///
/// # Errors
///
/// - Return [`VcsError::Git2`] if libgit2 operations fail.
#[instrument(skip(path, message), level = "debug")]
pub fn init_and_commit(path: impl AsRef<Path>, message: impl AsRef<str>) -> Result<Oid> {
    info!("initialize repository at {:?}", path.as_ref().display());
    let repo = Repository::init(path.as_ref())?;

    // INVARIANT: Stage everything while honoring ignore rules.
    let mut index = repo.index()?;
    index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
    index.write()?;
    let tree_oid = index.write_tree()?;
    let tree = repo.find_tree(tree_oid)?;

    let signature = match repo.signature() {
        Ok(signature) => signature,
        Err(_) => Signature::now("djinit", "djinit@localhost")?,
    };

    // INVARIANT: Always determine latest parent commits to append to.
    let mut parents = Vec::new();
    if let Some(parent) = repo.head().ok().and_then(|head| head.target()) {
        parents.push(repo.find_commit(parent)?);
    }
    let parents = parents.iter().collect::<Vec<_>>();

    let oid = repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        message.as_ref(),
        &tree,
        &parents,
    )?;
    info!("committed {oid}");

    Ok(oid)
}

/// Version control error types.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

/// Friendly result alias :3
type Result<T, E = VcsError> = std::result::Result<T, E>;
