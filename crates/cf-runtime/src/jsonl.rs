//! Tiny JSONL/JSON read-write helpers shared by the pipeline driver.
//!
//! An "artifact document" here is always `Vec<Value>`: a JSON artifact is
//! treated as a single-element vector so stamping and patch application
//! share one code path with JSONL artifacts.

use camino::Utf8Path;
use serde_json::Value;
use std::io;

/// Whether `path`'s extension marks it as single-document JSON rather than
/// line-delimited JSONL.
#[must_use]
pub fn is_json_document(path: &Utf8Path) -> bool {
    path.extension() == Some("json")
}

/// Read an artifact as a flat record list, regardless of its on-disk shape.
pub fn read_records(path: &Utf8Path) -> io::Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)?;
    if is_json_document(path) {
        let value: Value = serde_json::from_str(&content)?;
        Ok(vec![value])
    } else {
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(io::Error::from))
            .collect()
    }
}

/// Write a record list back out in the same shape `path`'s extension
/// implies: a single pretty JSON document for `.json`, one compact object
/// per line otherwise.
pub fn write_records(path: &Utf8Path, records: &[Value]) -> io::Result<()> {
    if is_json_document(path) {
        let value = records.first().cloned().unwrap_or(Value::Null);
        let json = serde_json::to_vec_pretty(&value)?;
        cf_utils::atomic_write::write_file_atomic(path, &json)
    } else {
        let mut out = String::new();
        for record in records {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        cf_utils::atomic_write::write_str_atomic(path, &out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn jsonl_round_trips_multiple_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("pages.jsonl")).unwrap();
        let records = vec![json!({"page": 1}), json!({"page": 2})];
        write_records(&path, &records).unwrap();
        let read_back = read_records(&path).unwrap();
        assert_eq!(read_back, records);
    }

    #[test]
    fn json_document_round_trips_single_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("gamebook.json")).unwrap();
        let records = vec![json!({"start_section": "1"})];
        write_records(&path, &records).unwrap();
        let read_back = read_records(&path).unwrap();
        assert_eq!(read_back, records);
    }
}
