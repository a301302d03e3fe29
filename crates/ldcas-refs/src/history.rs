//! Pointer history: append and lazy read.
//!
//! A history file holds one JSON record per line, in save order. Appends are
//! a single `write_all` of a complete line to a file opened in append mode,
//! so a crash can leave at most one torn line at the end. Readers skip that
//! tail; the next append truncates it before writing.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ldcas_types::Cid;
use tracing::{debug, warn};

use crate::error::{RefError, RefResult};
use crate::types::HistoryEntry;

/// History file name inside a slug directory.
pub const HISTORY_FILE: &str = "_history.jsonl";

/// The ordered history of one named pointer.
///
/// Cheap to clone. Nothing is read until [`iter`](History::iter) is called,
/// and every call starts again from the first entry.
#[derive(Clone, Debug)]
pub struct History {
    source: Source,
}

#[derive(Clone, Debug)]
enum Source {
    File(PathBuf),
    Snapshot(Arc<[HistoryEntry]>),
}

impl History {
    /// History backed by a `.jsonl` file. A missing file reads as empty.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
        }
    }

    /// History over entries already in memory.
    pub fn from_entries(entries: impl Into<Arc<[HistoryEntry]>>) -> Self {
        Self {
            source: Source::Snapshot(entries.into()),
        }
    }

    /// Iterate from the oldest entry.
    pub fn iter(&self) -> RefResult<HistoryIter> {
        let inner = match &self.source {
            Source::Snapshot(entries) => Inner::Snapshot {
                entries: Arc::clone(entries),
                pos: 0,
            },
            Source::File(path) => match File::open(path) {
                Ok(file) => Inner::File {
                    reader: BufReader::new(file),
                    path: path.clone(),
                    line: 0,
                    buf: Vec::new(),
                },
                Err(e) if e.kind() == io::ErrorKind::NotFound => Inner::Done,
                Err(e) => return Err(e.into()),
            },
        };
        Ok(HistoryIter { inner })
    }

    /// Read every entry into a vector.
    pub fn entries(&self) -> RefResult<Vec<HistoryEntry>> {
        self.iter()?.collect()
    }

    /// Whether any entry mentions `cid`.
    pub fn contains(&self, cid: &Cid) -> RefResult<bool> {
        for entry in self.iter()? {
            if entry?.cid == *cid {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Iterator over history entries, oldest first.
pub struct HistoryIter {
    inner: Inner,
}

enum Inner {
    File {
        reader: BufReader<File>,
        path: PathBuf,
        line: usize,
        buf: Vec<u8>,
    },
    Snapshot {
        entries: Arc<[HistoryEntry]>,
        pos: usize,
    },
    Done,
}

impl Iterator for HistoryIter {
    type Item = RefResult<HistoryEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match &mut self.inner {
            Inner::Done => return None,
            Inner::Snapshot { entries, pos } => {
                let entry = entries.get(*pos).cloned();
                *pos += 1;
                return entry.map(Ok);
            }
            Inner::File {
                reader,
                path,
                line,
                buf,
            } => next_line(reader, path, line, buf),
        };
        if !matches!(item, Some(Ok(_))) {
            self.inner = Inner::Done;
        }
        item
    }
}

fn next_line(
    reader: &mut BufReader<File>,
    path: &Path,
    line: &mut usize,
    buf: &mut Vec<u8>,
) -> Option<RefResult<HistoryEntry>> {
    loop {
        buf.clear();
        match reader.read_until(b'\n', buf) {
            Ok(0) => return None,
            Ok(_) => {}
            Err(e) => return Some(Err(e.into())),
        }
        *line += 1;
        if buf.last() != Some(&b'\n') {
            debug!(path = %path.display(), line = *line, "ignoring torn history tail");
            return None;
        }
        let text = trim_line(buf);
        if text.is_empty() {
            continue;
        }
        return Some(serde_json::from_slice(text).map_err(|e| RefError::CorruptHistory {
            path: path.to_path_buf(),
            line: *line,
            reason: e.to_string(),
        }));
    }
}

fn trim_line(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

/// Append one entry as a complete line, first truncating any torn tail.
///
/// Returns the offset the new line starts at. Callers must hold the
/// pointer's lock.
pub(crate) fn append(path: &Path, entry: &HistoryEntry) -> RefResult<u64> {
    let mut line =
        serde_json::to_vec(entry).map_err(|e| RefError::Serialization(e.to_string()))?;
    line.push(b'\n');

    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)?;
    repair_tail(&mut file, path)?;
    let start = file.metadata()?.len();
    file.write_all(&line)?;
    file.sync_data()?;
    Ok(start)
}

/// Cut the log back to `len` bytes, undoing an [`append`] that started there.
///
/// Callers must hold the pointer's lock.
pub(crate) fn truncate(path: &Path, len: u64) -> RefResult<()> {
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(len)?;
    file.sync_data()?;
    Ok(())
}

/// Drop bytes after the last newline, left behind by an interrupted append.
fn repair_tail(file: &mut File, path: &Path) -> io::Result<()> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(());
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(());
    }

    let contents = fs::read(path)?;
    let keep = contents
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |pos| pos + 1);
    warn!(
        path = %path.display(),
        dropped = contents.len() - keep,
        "truncating torn history tail"
    );
    file.set_len(keep as u64)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldcas_crypto::CidHasher;
    use ldcas_types::Timestamp;

    fn cid(n: u32) -> Cid {
        CidHasher::default().cid(format!("[{n}]").as_bytes())
    }

    fn entry(n: u32) -> HistoryEntry {
        HistoryEntry::new(cid(n), Timestamp::from_millis(i64::from(n) * 1000).unwrap())
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::from_file(dir.path().join(HISTORY_FILE));
        assert!(history.entries().unwrap().is_empty());
    }

    #[test]
    fn append_then_read_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE);
        for n in 0..4 {
            append(&path, &entry(n)).unwrap();
        }
        let history = History::from_file(&path);
        assert_eq!(history.entries().unwrap(), (0..4).map(entry).collect::<Vec<_>>());
        assert!(fs::read(&path).unwrap().ends_with(b"\n"));
    }

    #[test]
    fn truncate_undoes_the_last_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE);
        assert_eq!(append(&path, &entry(1)).unwrap(), 0);
        let start = append(&path, &entry(2)).unwrap();
        assert!(start > 0);

        truncate(&path, start).unwrap();
        assert_eq!(History::from_file(&path).entries().unwrap(), vec![entry(1)]);
        assert_eq!(append(&path, &entry(3)).unwrap(), start);
    }

    #[test]
    fn iteration_is_restartable_and_lazy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE);
        append(&path, &entry(1)).unwrap();
        let history = History::from_file(&path);
        assert_eq!(history.iter().unwrap().count(), 1);

        append(&path, &entry(2)).unwrap();
        assert_eq!(history.iter().unwrap().count(), 2);
        assert_eq!(history.iter().unwrap().next().unwrap().unwrap(), entry(1));
    }

    #[test]
    fn torn_tail_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE);
        append(&path, &entry(1)).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"{"cid":"bagaa"#).unwrap();

        assert_eq!(History::from_file(&path).entries().unwrap(), vec![entry(1)]);
    }

    #[test]
    fn append_repairs_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE);
        append(&path, &entry(1)).unwrap();
        OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(br#"{"cid":"ba"#)
            .unwrap();

        append(&path, &entry(2)).unwrap();
        assert_eq!(
            History::from_file(&path).entries().unwrap(),
            vec![entry(1), entry(2)]
        );
    }

    #[test]
    fn torn_first_line_is_dropped_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE);
        fs::write(&path, b"{\"ci").unwrap();
        assert!(History::from_file(&path).entries().unwrap().is_empty());
        append(&path, &entry(3)).unwrap();
        assert_eq!(History::from_file(&path).entries().unwrap(), vec![entry(3)]);
    }

    #[test]
    fn corrupt_complete_line_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE);
        append(&path, &entry(1)).unwrap();
        OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"not json\n")
            .unwrap();

        let results: Vec<_> = History::from_file(&path).iter().unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[1],
            Err(RefError::CorruptHistory { line: 2, .. })
        ));
    }

    #[test]
    fn snapshot_history() {
        let history = History::from_entries(vec![entry(1), entry(2)]);
        assert_eq!(history.entries().unwrap().len(), 2);
        assert!(history.contains(&cid(2)).unwrap());
        assert!(!history.contains(&cid(3)).unwrap());
    }
}
