//! Atomic file writes: temp file + fsync + rename.
//!
//! Every artifact, snapshot, and manifest entry this workspace writes goes
//! through here. A reader must never observe a half-written file, and a
//! crash mid-write must never corrupt the previous good copy.

use camino::Utf8Path;
use std::fs;
use std::io::{self, Write};

use tempfile::NamedTempFile;

/// Write `content` to `path` atomically, creating parent directories as
/// needed. Returns an error if the write or rename fails; the original file
/// at `path` (if any) is left untouched on failure.
pub fn write_file_atomic(path: &Utf8Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path.as_std_path())
        .map_err(|e| e.error)?;
    Ok(())
}

/// Write a `&str` atomically, normalizing CRLF to LF first so artifacts are
/// byte-stable across platforms (Testable Property 6 depends on this).
pub fn write_str_atomic(path: &Utf8Path, content: &str) -> io::Result<()> {
    let normalized = content.replace("\r\n", "\n");
    write_file_atomic(path, normalized.as_bytes())
}

/// Append a single line to a JSONL file. Appends are not individually
/// atomic (a crash mid-append can leave a truncated final line), but the
/// progress/manifest readers in this workspace tolerate and discard a
/// trailing partial line, so this is acceptable for append-only logs.
pub fn append_line(path: &Utf8Path, line: &str) -> io::Result<()> {
    use std::io::Write as _;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_std_path())?;
    file.write_all(line.as_bytes())?;
    if !line.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    file.sync_data()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn tmp_path(name: &str) -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
        (dir, path)
    }

    #[test]
    fn write_file_atomic_creates_parents_and_content() {
        let (_dir, path) = tmp_path("nested/deep/file.json");
        write_str_atomic(&path, "{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn write_str_atomic_normalizes_crlf() {
        let (_dir, path) = tmp_path("file.txt");
        write_str_atomic(&path, "a\r\nb\r\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn append_line_adds_trailing_newline_when_missing() {
        let (_dir, path) = tmp_path("events.jsonl");
        append_line(&path, "{\"a\":1}").unwrap();
        append_line(&path, "{\"a\":2}\n").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"a\":1}\n{\"a\":2}\n");
    }
}
