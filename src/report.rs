//! Machine-readable batch report.

use crate::driver::{DriverError, FileOutcome};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    pub totals: Totals,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct Totals {
    pub changed: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub rewrites: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Changed,
    Unchanged,
    Failed,
}

#[derive(Debug, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rewrites: Vec<RewriteEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkipEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_imports: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RewriteEntry {
    pub line: usize,
    pub profile: String,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Serialize)]
pub struct SkipEntry {
    pub line: usize,
    pub profile: String,
    pub kind: &'static str,
    pub reason: String,
}

impl BatchReport {
    pub fn from_results(results: &[(PathBuf, Result<FileOutcome, DriverError>)]) -> Self {
        let mut totals = Totals::default();
        let files = results
            .iter()
            .map(|(path, result)| {
                let report = FileReport::new(path, result);
                match report.status {
                    FileStatus::Changed => totals.changed += 1,
                    FileStatus::Unchanged => totals.unchanged += 1,
                    FileStatus::Failed => totals.failed += 1,
                }
                totals.rewrites += report.rewrites.len();
                totals.skipped += report.skipped.len();
                report
            })
            .collect();
        Self { files, totals }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl FileReport {
    fn new(path: &Path, result: &Result<FileOutcome, DriverError>) -> Self {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                return Self {
                    path: path.to_path_buf(),
                    status: FileStatus::Failed,
                    rewrites: Vec::new(),
                    skipped: Vec::new(),
                    imports: Vec::new(),
                    missing_imports: Vec::new(),
                    error: Some(err.to_string()),
                }
            }
        };

        let output = &outcome.output;
        Self {
            path: path.to_path_buf(),
            status: if output.is_changed() {
                FileStatus::Changed
            } else {
                FileStatus::Unchanged
            },
            rewrites: output
                .rewrites
                .iter()
                .map(|r| RewriteEntry {
                    line: r.line,
                    profile: r.profile.clone(),
                    before: r.before.clone(),
                    after: r.after.clone(),
                })
                .collect(),
            skipped: output
                .skipped
                .iter()
                .map(|s| SkipEntry {
                    line: s.line,
                    profile: s.profile.clone(),
                    kind: s.error.kind(),
                    reason: s.error.to_string(),
                })
                .collect(),
            imports: output.imports.iter().cloned().collect(),
            missing_imports: outcome.missing_imports.clone(),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::builtin;
    use crate::driver::run_batch;
    use crate::engine::Engine;
    use std::fs;

    #[test]
    fn totals_and_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let changed = dir.path().join("a.go");
        let unchanged = dir.path().join("b.go");
        fs::write(&changed, "log.Info().Caller().Msg(\"x\")\nlog.Info().Msg(\"y\")\n").unwrap();
        fs::write(&unchanged, "package b\n").unwrap();
        let missing = dir.path().join("c.go");

        let engine = Engine::new(builtin::builtin_profiles()).unwrap();
        let results = run_batch(&engine, &[changed, unchanged, missing], true);
        let report = BatchReport::from_results(&results);

        assert_eq!(
            report.totals,
            Totals {
                changed: 1,
                unchanged: 1,
                failed: 1,
                rewrites: 1,
                skipped: 1,
            }
        );

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["files"][0]["status"], "changed");
        assert_eq!(json["files"][0]["skipped"][0]["kind"], "unrecognized-field");
        assert_eq!(json["files"][0]["rewrites"][0]["line"], 2);
        assert_eq!(json["files"][1]["status"], "unchanged");
        assert!(json["files"][1].get("rewrites").is_none());
        assert_eq!(json["files"][2]["status"], "failed");
    }
}
