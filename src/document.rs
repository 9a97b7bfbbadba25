// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Line-oriented text documents.
//!
//! Framework generators produce plain text configuration files, e.g.,
//! `settings.py`, `urls.py`, etc. Djinit never parses their grammar. Instead,
//! a file is read once into a [`Document`], an ordered sequence of lines, every
//! patch is applied to that in-memory copy, and the result is written back
//! once.
//!
//! # Layout Preservation
//!
//! A document remembers the newline style of the file it came from, and
//! whether the file ended with a trailing newline. Rendering a document that
//! was never edited reproduces the original text byte for byte.
//!
//! # Atomic Writes
//!
//! Saving a document writes its contents into a hidden sibling file first,
//! and then renames that file over the original. Readers never observe a
//! partially written configuration file. Documents that were never changed
//! are not written at all.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{read_to_string, remove_file, rename, write},
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Text file as an ordered sequence of lines.
///
/// # Invariant
///
/// - Lines never contain newline characters.
/// - Document is only marked as changed when its lines actually change.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Document {
    path: Option<PathBuf>,
    lines: Vec<String>,
    newline: &'static str,
    trailing_newline: bool,
    changed: bool,
}

impl Document {
    /// Read document from file.
    ///
    /// # Errors
    ///
    /// - Return [`DocumentError::Read`] if file cannot be read, which includes
    ///   the file not existing.
    #[instrument(skip(path), level = "debug")]
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        debug!("read document {:?}", path.display());
        let content = read_to_string(&path).map_err(|err| DocumentError::Read {
            source: err,
            path: path.clone(),
        })?;

        let mut document = Self::from(content.as_str());
        document.path = Some(path);
        Ok(document)
    }

    /// Write document back to the file it was read from.
    ///
    /// Does nothing if the document was not changed, or never came from a
    /// file.
    ///
    /// # Errors
    ///
    /// - Return [`DocumentError::Write`] if file cannot be written.
    #[instrument(skip(self), level = "debug")]
    pub fn save(&mut self) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };

        if !self.changed {
            debug!("document {:?} unchanged, skip write", path.display());
            return Ok(());
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let staging = path.with_file_name(format!(".{file_name}.djinit"));

        debug!("write document {:?}", path.display());
        let written =
            write(&staging, self.to_string().as_bytes()).and_then(|_| rename(&staging, path));
        if let Err(err) = written {
            // INVARIANT: Staging file never outlives a failed save.
            if let Err(cleanup) = remove_file(&staging) {
                debug!("cannot remove {:?}: {cleanup}", staging.display());
            }

            return Err(DocumentError::Write {
                source: err,
                path: path.clone(),
            });
        }

        self.changed = false;
        Ok(())
    }

    /// Path the document was read from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current lines of document.
    pub fn lines(&self) -> &[String] {
        self.lines.as_slice()
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if document has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Check if document was changed since it was read or last saved.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Check if any line contains target text.
    pub fn contains(&self, needle: impl AsRef<str>) -> bool {
        self.lines.iter().any(|line| line.contains(needle.as_ref()))
    }

    /// Find index of first line matching predicate.
    pub fn position(&self, predicate: impl FnMut(&String) -> bool) -> Option<usize> {
        self.lines.iter().position(predicate)
    }

    /// Insert lines at target index, shifting everything after it down.
    ///
    /// # Panics
    ///
    /// - Will panic if `index` is greater than the number of lines.
    pub fn insert_lines(&mut self, index: usize, lines: impl IntoIterator<Item = impl Into<String>>) {
        let lines = lines.into_iter().map(Into::into).collect::<Vec<_>>();
        if lines.is_empty() {
            return;
        }

        self.lines.splice(index..index, lines);
        self.changed = true;
    }

    /// Append lines to the end of the document.
    pub fn push_lines(&mut self, lines: impl IntoIterator<Item = impl Into<String>>) {
        let index = self.lines.len();
        self.insert_lines(index, lines);
    }

    /// Replace line at target index.
    ///
    /// # Panics
    ///
    /// - Will panic if `index` is out of bounds.
    pub fn replace_line(&mut self, index: usize, line: impl Into<String>) {
        let line = line.into();
        if self.lines[index] != line {
            self.lines[index] = line;
            self.changed = true;
        }
    }
}

impl Display for Document {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let newline = if self.newline.is_empty() { "\n" } else { self.newline };
        fmt.write_str(self.lines.join(newline).as_str())?;
        if self.trailing_newline && !self.lines.is_empty() {
            fmt.write_str(newline)?;
        }

        Ok(())
    }
}

impl From<&str> for Document {
    fn from(content: &str) -> Self {
        let newline = if content.contains("\r\n") { "\r\n" } else { "\n" };

        Self {
            path: None,
            lines: content.lines().map(str::to_owned).collect(),
            newline,
            trailing_newline: content.is_empty() || content.ends_with('\n'),
            changed: false,
        }
    }
}

impl From<String> for Document {
    fn from(content: String) -> Self {
        Self::from(content.as_str())
    }
}

/// Document I/O error types.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Document cannot be read from file.
    #[error("failed to read document at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Document cannot be written to file.
    #[error("failed to write document at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = DocumentError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use simple_test_case::test_case;

    #[test_case("DEBUG = True\nALLOWED_HOSTS = []\n"; "trailing newline")]
    #[test_case("DEBUG = True\nALLOWED_HOSTS = []"; "no trailing newline")]
    #[test_case("DEBUG = True\r\nALLOWED_HOSTS = []\r\n"; "crlf")]
    #[test_case(""; "empty")]
    #[test]
    fn untouched_document_renders_verbatim(content: &str) {
        use pretty_assertions::assert_eq;
        let document = Document::from(content);
        assert_eq!(document.to_string(), content);
        assert!(!document.is_changed());
    }

    #[test]
    fn insert_lines_keeps_newline_style() {
        let mut document = Document::from("a\r\nc\r\n");
        document.insert_lines(1, ["b"]);
        assert_eq!(document.to_string(), "a\r\nb\r\nc\r\n");
        assert!(document.is_changed());
    }

    #[test]
    fn replace_line_with_same_text_is_not_a_change() {
        let mut document = Document::from("a\nb\n");
        document.replace_line(1, "b");
        assert!(!document.is_changed());

        document.replace_line(1, "B");
        assert!(document.is_changed());
        assert_eq!(document.to_string(), "a\nB\n");
    }

    #[sealed_test]
    fn open_and_save_round_trip_through_disk() -> anyhow::Result<()> {
        std::fs::write("settings.py", "DEBUG = True\n")?;

        let mut document = Document::open("settings.py")?;
        document.push_lines(["", "MEDIA_URL = '/media/'"]);
        document.save()?;

        let result = std::fs::read_to_string("settings.py")?;
        let expect = indoc! {"
            DEBUG = True

            MEDIA_URL = '/media/'
        "};
        assert_eq!(result, expect);
        assert!(!Path::new(".settings.py.djinit").exists());

        Ok(())
    }

    #[sealed_test]
    fn failed_save_cleans_up_staging_file() -> anyhow::Result<()> {
        std::fs::write("settings.py", "DEBUG = True\n")?;
        let mut document = Document::open("settings.py")?;
        document.push_lines(["DEBUG = False"]);

        // INVARIANT: Renaming a file over a non-empty directory always fails.
        std::fs::remove_file("settings.py")?;
        std::fs::create_dir_all("settings.py/keep")?;

        let result = document.save();
        assert!(matches!(result, Err(DocumentError::Write { .. })));
        assert!(!Path::new(".settings.py.djinit").exists());
        assert!(document.is_changed());

        Ok(())
    }

    #[sealed_test]
    fn open_missing_file_fails() {
        let result = Document::open("nowhere/settings.py");
        assert!(matches!(result, Err(DocumentError::Read { .. })));
    }
}
