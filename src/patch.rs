// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Text-anchor patching.
//!
//! Targeted edits to generated configuration files that never parse the
//! file's grammar. Insertion points are located through __anchor lines__,
//! i.e., lines whose trimmed content starts with a known setting name or
//! marker. Each operation reports an [`Outcome`] so that callers can tell an
//! applied patch apart from one that was already present, or one whose anchor
//! could not be found.
//!
//! # Idempotence
//!
//! Every operation checks whether its edit already exists before inserting
//! anything. Applying the same patch twice leaves the document exactly as it
//! was after the first application.

use crate::document::Document;

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Result of applying a single patch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Patch inserted or amended lines.
    Applied { inserted: usize },

    /// Document already contained the patch.
    AlreadyPresent,

    /// Anchor needed to place the patch was not found.
    AnchorMissing { anchor: String },
}

impl Outcome {
    fn anchor_missing(anchor: impl Into<String>) -> Self {
        Self::AnchorMissing {
            anchor: anchor.into(),
        }
    }

    /// Check if patch could not be placed.
    pub fn is_anchor_missing(&self) -> bool {
        matches!(self, Self::AnchorMissing { .. })
    }
}

impl Display for Outcome {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Applied { inserted } => write!(fmt, "applied ({inserted} line(s))"),
            Self::AlreadyPresent => fmt.write_str("already present"),
            Self::AnchorMissing { anchor } => write!(fmt, "anchor {anchor:?} not found"),
        }
    }
}

/// Where new entries go inside a bracketed list block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position<'a> {
    /// Right before the closing bracket.
    End,

    /// Right after the first block line containing target text.
    ///
    /// Falls back to [`Position::End`] when no such line exists.
    After(&'a str),
}

/// Format list entry the way framework generators do.
pub fn quoted_entry(entry: impl AsRef<str>) -> String {
    format!("    '{}',", entry.as_ref())
}

/// Check if line assigns to target setting key.
///
/// The trimmed line must start with `key`, directly followed by whitespace
/// or `=`. Thus, "STATIC_URL" does not match "STATIC_URLS = ...".
pub fn assigns(line: impl AsRef<str>, key: impl AsRef<str>) -> bool {
    let line = line.as_ref().trim_start();
    match line.strip_prefix(key.as_ref()) {
        Some(rest) => rest.starts_with(|c: char| c.is_whitespace() || c == '='),
        None => false,
    }
}

/// Register entries inside a bracketed list block.
///
/// Locates the first line starting with `open_marker`, and the first line
/// after it starting with `]`. Each entry missing from the block is inserted
/// as a quoted string line at `position`, in the order given. Entries are
/// matched ignoring quote style and trailing commas.
///
/// Returns [`Outcome::AnchorMissing`] if the block cannot be located, or if
/// the block opens and closes on the same line.
pub fn register_in_block(
    document: &mut Document,
    open_marker: &str,
    entries: impl IntoIterator<Item = impl AsRef<str>>,
    position: Position<'_>,
) -> Outcome {
    let Some(open) = document.position(|line| line.trim().starts_with(open_marker)) else {
        return Outcome::anchor_missing(open_marker);
    };

    // INVARIANT: Single line lists cannot be extended line by line.
    if document.lines()[open].contains(']') {
        return Outcome::anchor_missing(open_marker);
    }

    let Some(close) = document.lines()[open + 1..]
        .iter()
        .position(|line| line.trim().starts_with(']'))
        .map(|offset| open + 1 + offset)
    else {
        return Outcome::anchor_missing("]");
    };

    let block = &document.lines()[open + 1..close];
    let mut missing: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry.as_ref();
        let known = block.iter().any(|line| unquote(line) == entry)
            || missing.iter().any(|line| unquote(line) == entry);
        if !known {
            missing.push(quoted_entry(entry));
        }
    }

    if missing.is_empty() {
        return Outcome::AlreadyPresent;
    }

    let index = match position {
        Position::End => close,
        Position::After(needle) => block
            .iter()
            .position(|line| line.contains(needle))
            .map(|offset| open + 2 + offset)
            .unwrap_or(close),
    };

    let inserted = missing.len();
    document.insert_lines(index, missing);
    Outcome::Applied { inserted }
}

/// Insert setting lines after anchor setting if target setting is absent.
///
/// Does nothing if any line already assigns `target`. Otherwise inserts
/// `lines` directly after the first line assigning `anchor`. If there is no
/// anchor to use, the lines are appended to the end of the document behind a
/// blank separator line.
pub fn insert_after_anchor(
    document: &mut Document,
    anchor: Option<&str>,
    target: &str,
    lines: impl IntoIterator<Item = impl Into<String>>,
) -> Outcome {
    if document.position(|line| assigns(line, target)).is_some() {
        return Outcome::AlreadyPresent;
    }

    let lines = lines.into_iter().map(Into::into).collect::<Vec<String>>();
    let inserted = lines.len();
    let found = anchor.and_then(|anchor| document.position(|line| assigns(line, anchor)));
    match found {
        Some(index) => document.insert_lines(index + 1, lines),
        None => {
            if document.lines().last().is_some_and(|line| !line.trim().is_empty()) {
                document.push_lines([String::new()]);
            }
            document.push_lines(lines);
        }
    }

    Outcome::Applied { inserted }
}

/// Make sure `from <module> import <name>` is in effect.
///
/// Amends an existing `from <module> import ...` line when there is one.
/// Otherwise a new import line is placed after the last top-level import, or
/// at the very top of the document when there are no imports at all.
pub fn ensure_import(document: &mut Document, module: &str, name: &str) -> Outcome {
    let prefix = format!("from {module} import ");
    if let Some(index) = document.position(|line| line.starts_with(prefix.as_str())) {
        let line = document.lines()[index].clone();
        let (code, comment) = split_comment(&line[prefix.len()..]);
        let names = code.trim_end();
        if names.split(',').map(str::trim).any(|known| known == name) {
            return Outcome::AlreadyPresent;
        }

        // INVARIANT: Parenthesized multi-line imports are left alone.
        if names.starts_with('(') {
            return Outcome::anchor_missing(prefix.trim_end());
        }

        let gap = if comment.is_empty() { "" } else { &code[names.len()..] };
        document.replace_line(index, format!("{prefix}{names}, {name}{gap}{comment}"));
        return Outcome::Applied { inserted: 0 };
    }

    let index = document
        .lines()
        .iter()
        .rposition(|line| line.starts_with("from ") || line.starts_with("import "))
        .map(|index| index + 1)
        .unwrap_or(0);
    document.insert_lines(index, [format!("{prefix}{name}")]);

    Outcome::Applied { inserted: 1 }
}

/// Insert lines directly after the exact line `open_line`.
///
/// Lines for which `present` already holds on the document are skipped.
pub fn insert_after_line(
    document: &mut Document,
    open_line: &str,
    lines: impl IntoIterator<Item = impl Into<String>>,
    present: impl Fn(&Document, &str) -> bool,
) -> Outcome {
    let Some(open) = document.position(|line| line.trim() == open_line) else {
        return Outcome::anchor_missing(open_line);
    };

    let snapshot = &*document;
    let missing = lines
        .into_iter()
        .map(Into::into)
        .filter(|line: &String| !present(snapshot, line.as_str()))
        .collect::<Vec<_>>();
    if missing.is_empty() {
        return Outcome::AlreadyPresent;
    }

    let inserted = missing.len();
    document.insert_lines(open + 1, missing);
    Outcome::Applied { inserted }
}

/// Append block of lines unless some line already contains `marker`.
pub fn append_block_if_absent(
    document: &mut Document,
    marker: &str,
    block: impl IntoIterator<Item = impl Into<String>>,
) -> Outcome {
    if document.contains(marker) {
        return Outcome::AlreadyPresent;
    }

    let block = block.into_iter().map(Into::into).collect::<Vec<String>>();
    let inserted = block.len();
    document.push_lines(block);
    Outcome::Applied { inserted }
}

fn unquote(line: &str) -> &str {
    split_comment(line)
        .0
        .trim()
        .trim_end_matches(',')
        .trim_matches(|c| c == '\'' || c == '"')
}

/// Split line into code and trailing `#` comment.
///
/// A `#` inside a string literal does not start a comment.
fn split_comment(line: &str) -> (&str, &str) {
    let mut quote = None;
    for (index, c) in line.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(open), c) if c == open => quote = None,
            (None, '#') => return line.split_at(index),
            _ => {}
        }
    }

    (line, "")
}
