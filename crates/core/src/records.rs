//! Record discovery.
//!
//! Loader runs read every `*.json` file directly inside the record directory. Records are
//! sorted by file name so that planning is deterministic, and each record's name (the file
//! stem) identifies it in output paths and diagnostics. A record is only read once one of
//! its units actually needs dispatching.

use crate::constants::RECORD_EXTENSION;
use crate::{SweepError, SweepResult};
use fhir::Bundle;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// A parsed record document and the name it is reported under.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub name: String,
    pub document: Value,
}

/// Lists record files in `dir`, sorted by file name.
///
/// # Errors
///
/// Returns `SweepError::RecordRead` if the directory cannot be read.
pub fn list_record_files(dir: &Path) -> SweepResult<Vec<PathBuf>> {
    let read_err = |source| SweepError::RecordRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Reads and parses one record file.
///
/// A record that is not a JSON object stops the run: malformed inputs would otherwise
/// produce a report that silently undercounts.
///
/// # Errors
///
/// Returns `SweepError::RecordRead` or `SweepError::RecordParse`.
pub fn load_record(path: &Path) -> SweepResult<Record> {
    let name = record_name(path);
    let text = fs::read_to_string(path).map_err(|source| SweepError::RecordRead {
        path: path.to_path_buf(),
        source,
    })?;
    let document = Bundle::parse(&text).map_err(|source| SweepError::RecordParse {
        name: name.clone(),
        source,
    })?;
    tracing::debug!("loaded record {name} from {}", path.display());
    Ok(Record { name, document })
}

/// Name a record file is reported under: its file stem.
pub fn record_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lists_only_json_files_sorted_by_name() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.json"), r#"{ "entry": [] }"#).unwrap();
        fs::write(dir.path().join("a.json"), r#"{ "entry": [] }"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let files = list_record_files(dir.path()).expect("list records");
        let names: Vec<_> = files.iter().map(|p| record_name(p)).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn loads_record_under_its_file_stem() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alice.json");
        fs::write(&path, r#"{ "resourceType": "Bundle", "entry": [] }"#).unwrap();

        let record = load_record(&path).expect("load record");
        assert_eq!(record.name, "alice");
        assert_eq!(record.document["resourceType"], "Bundle");
    }

    #[test]
    fn malformed_record_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();

        let err = load_record(&path).expect_err("bad record");
        match err {
            SweepError::RecordParse { name, .. } => assert_eq!(name, "bad"),
            other => panic!("expected RecordParse error, got {other:?}"),
        }
    }

    #[test]
    fn missing_directory_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let err = list_record_files(&dir.path().join("absent")).expect_err("no directory");
        assert!(matches!(err, SweepError::RecordRead { .. }));
    }
}
