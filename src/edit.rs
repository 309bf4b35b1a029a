use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Byte-span replacement with verification of the text being replaced.
///
/// Every rewrite the engine produces compiles down to this primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until applied"]
pub struct Edit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// What we expect to find before applying
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (for large spans)
    Hash(u64),
}

impl EditVerification {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Hash for text over 1KB, exact text otherwise.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Before-text verification failed at byte {byte_start}")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        found: String,
    },

    #[error("Invalid byte range: [{byte_start}, {byte_end}) in content of length {len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        len: usize,
    },

    #[error("Overlapping edits at bytes {first_end} and {second_start}")]
    Overlap {
        first_end: usize,
        second_start: usize,
    },

    #[error("Edit at [{byte_start}, {byte_end}) splits a UTF-8 character")]
    InvalidUtf8Edit { byte_start: usize, byte_end: usize },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Edit {
    /// Create an edit whose verification is derived from `expected_before`.
    pub fn new(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: &str,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(expected_before),
        }
    }

    /// Check the edit against `content` and return the text it replaces.
    fn validate<'a>(&self, content: &'a str) -> Result<&'a str, EditError> {
        if self.byte_start > self.byte_end || self.byte_end > content.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                len: content.len(),
            });
        }
        if !content.is_char_boundary(self.byte_start) || !content.is_char_boundary(self.byte_end) {
            return Err(EditError::InvalidUtf8Edit {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
            });
        }

        let current = &content[self.byte_start..self.byte_end];
        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                found: current.to_string(),
            });
        }
        Ok(current)
    }
}

/// Apply non-overlapping edits to `content` in one pass.
///
/// All edits are verified before anything is spliced; a single failure
/// leaves the content untouched.
pub fn apply_to_string(content: &str, mut edits: Vec<Edit>) -> Result<String, EditError> {
    edits.sort_by_key(|edit| (edit.byte_start, edit.byte_end));

    for edit in &edits {
        edit.validate(content)?;
    }
    for window in edits.windows(2) {
        let (first, second) = (&window[0], &window[1]);
        if first.byte_end > second.byte_start {
            return Err(EditError::Overlap {
                first_end: first.byte_end,
                second_start: second.byte_start,
            });
        }
    }

    let delta: isize = edits
        .iter()
        .map(|e| e.new_text.len() as isize - (e.byte_end - e.byte_start) as isize)
        .sum();
    let mut out = String::with_capacity((content.len() as isize + delta).max(0) as usize);
    let mut cursor = 0;
    for edit in &edits {
        out.push_str(&content[cursor..edit.byte_start]);
        out.push_str(&edit.new_text);
        cursor = edit.byte_end;
    }
    out.push_str(&content[cursor..]);
    Ok(out)
}

/// Atomic file write: tempfile + fsync + rename, then bump the mtime so
/// build tools notice the change.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    let io_err = |source| EditError::Io {
        path: path.to_path_buf(),
        source,
    };

    // Same directory keeps the rename on one filesystem
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    temp.write_all(content).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;

    // Keep the original permissions
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(temp.path(), meta.permissions()).map_err(io_err)?;
    }

    temp.persist(path).map_err(|e| io_err(e.error))?;
    filetime::set_file_mtime(path, filetime::FileTime::now()).map_err(io_err)?;
    Ok(())
}
