//! Batch processing of files on disk.

use crate::edit::{atomic_write, EditError};
use crate::engine::{Engine, EngineOutput, Outcome};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to rewrite {path}: {source}")]
    Edit {
        path: PathBuf,
        #[source]
        source: EditError,
    },
}

/// What happened to one file.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    /// Content before conversion.
    pub original: String,
    pub output: EngineOutput,
    /// Imports the rewritten file needs but does not declare.
    pub missing_imports: Vec<String>,
    /// Whether the new content was written to disk.
    pub written: bool,
}

impl FileOutcome {
    pub fn rewritten(&self) -> Option<&str> {
        match &self.output.outcome {
            Outcome::Rewritten(text) => Some(text),
            Outcome::Unchanged => None,
        }
    }
}

/// Convert one file. The file is written only when its content changed and
/// `dry_run` is off.
pub fn process_file(engine: &Engine, path: &Path, dry_run: bool) -> Result<FileOutcome, DriverError> {
    let original = fs::read_to_string(path).map_err(|source| DriverError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let output = engine.rewrite(&original).map_err(|source| DriverError::Edit {
        path: path.to_path_buf(),
        source,
    })?;

    let mut missing_imports = Vec::new();
    let mut written = false;
    if let Outcome::Rewritten(text) = &output.outcome {
        missing_imports = output
            .missing_imports(text)
            .into_iter()
            .map(str::to_string)
            .collect();
        for import in &missing_imports {
            tracing::warn!(path = %path.display(), import = %import, "rewritten file needs an import it does not declare");
        }

        if !dry_run {
            atomic_write(path, text.as_bytes()).map_err(|source| DriverError::Edit {
                path: path.to_path_buf(),
                source,
            })?;
            written = true;
        }
        tracing::info!(
            path = %path.display(),
            rewrites = output.rewrites.len(),
            dry_run,
            "converted"
        );
    }

    Ok(FileOutcome {
        path: path.to_path_buf(),
        original,
        output,
        missing_imports,
        written,
    })
}

/// Convert every path in parallel on the current rayon pool.
///
/// Duplicate paths are processed once; results come back in first-seen
/// input order. One file failing does not stop the others.
pub fn run_batch(
    engine: &Engine,
    paths: &[PathBuf],
    dry_run: bool,
) -> Vec<(PathBuf, Result<FileOutcome, DriverError>)> {
    let mut seen = HashSet::new();
    let unique: Vec<&PathBuf> = paths.iter().filter(|p| seen.insert(*p)).collect();

    unique
        .into_par_iter()
        .map(|path| (path.clone(), process_file(engine, path, dry_run)))
        .collect()
}

/// Read a newline-separated path list. Blank lines and `#` comments are
/// ignored; relative entries resolve against the current directory.
pub fn read_file_list(path: &Path) -> Result<Vec<PathBuf>, DriverError> {
    let contents = fs::read_to_string(path).map_err(|source| DriverError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_file_list(&contents))
}

fn parse_file_list(contents: &str) -> Vec<PathBuf> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect()
}
