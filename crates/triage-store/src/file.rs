//! File-backed store
//!
//! Layout under the root directory:
//!
//! ```text
//! runs/<run_id>.jsonl      one JSON entry per line, in append order
//! reports/<report_id>.json one file per report, written once
//! ```
//!
//! Appends are serialized per run inside the process. Sharing a root between
//! writer processes is not supported. A line left unterminated by an
//! interrupted write is skipped on read and cut off before the next append.

use crate::error::StoreError;
use crate::store::{LogQuery, ReportQuery, ReportStore, RunLogStore};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use triage_core::{DiagnosticReport, LogRecord, ReportId, RunId, RunLogEntry};

const RUNS_DIR: &str = "runs";
const REPORTS_DIR: &str = "reports";

/// Next sequence number of a run, loaded lazily from disk
type RunCursor = Arc<Mutex<Option<u64>>>;

/// Durable store rooted at a directory
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    /// One cursor per run appended to or read through this handle; never evicted
    cursors: DashMap<RunId, RunCursor>,
    report_lock: Mutex<()>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        for dir in [root.join(RUNS_DIR), root.join(REPORTS_DIR)] {
            fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        }
        tracing::debug!(root = %root.display(), "opened file store");

        Ok(Self {
            root,
            cursors: DashMap::new(),
            report_lock: Mutex::new(()),
        })
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run_path(&self, run_id: &RunId) -> Result<PathBuf, StoreError> {
        let key = storage_key(run_id.as_str())?;
        Ok(self.root.join(RUNS_DIR).join(format!("{key}.jsonl")))
    }

    fn report_path(&self, id: &ReportId) -> PathBuf {
        self.root.join(REPORTS_DIR).join(format!("{id}.json"))
    }

    fn cursor(&self, run_id: &RunId) -> RunCursor {
        Arc::clone(self.cursors.entry(run_id.clone()).or_default().value())
    }
}

/// Validate an identifier for use as a file name
fn storage_key(id: &str) -> Result<&str, StoreError> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && id.len() <= 200
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(id)
    } else {
        Err(StoreError::InvalidIdentifier(id.to_string()))
    }
}

fn read_entries(path: &Path) -> Result<Vec<RunLogEntry>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    let terminated = content.is_empty() || content.ends_with('\n');
    let line_count = content.lines().count();

    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(entry) => entries.push(entry),
            Err(e) if !terminated && index + 1 == line_count => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unterminated trailing line");
            }
            Err(e) => {
                return Err(StoreError::Corrupt {
                    path: path.to_path_buf(),
                    line: index + 1,
                    message: e.to_string(),
                })
            }
        }
    }
    Ok(entries)
}

/// Cut an unterminated trailing line so the next append starts a fresh line
fn trim_torn_tail(path: &Path) -> Result<(), StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    if bytes.last().map_or(true, |b| *b == b'\n') {
        return Ok(());
    }

    let keep = bytes.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
    let file = OpenOptions::new().write(true).open(path).map_err(|e| StoreError::io(path, e))?;
    file.set_len(keep as u64).map_err(|e| StoreError::io(path, e))?;
    tracing::warn!(path = %path.display(), dropped = bytes.len() - keep, "trimmed unterminated trailing line");
    Ok(())
}

/// Write one whole line; on failure the file is cut back to its prior length
fn append_line(file: &mut File, line: &[u8]) -> io::Result<()> {
    let start = file.metadata()?.len();
    if let Err(e) = file.write_all(line) {
        if let Err(rollback) = file.set_len(start) {
            tracing::error!(error = %rollback, "could not roll back partial append");
        }
        return Err(e);
    }
    Ok(())
}

fn read_report(path: &Path) -> Result<DiagnosticReport, StoreError> {
    let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        line: e.line(),
        message: e.to_string(),
    })
}

impl RunLogStore for FileStore {
    fn append(&self, record: LogRecord) -> Result<RunLogEntry, StoreError> {
        let path = self.run_path(&record.run_id)?;
        let cursor = self.cursor(&record.run_id);
        let mut next = cursor.lock();

        let sequence = match *next {
            Some(sequence) => sequence,
            None => {
                trim_torn_tail(&path)?;
                read_entries(&path)?.last().map_or(0, |e| e.sequence + 1)
            }
        };
        let entry = record.into_entry(sequence, Utc::now());

        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;
        append_line(&mut file, &line).map_err(|e| StoreError::io(&path, e))?;

        *next = Some(sequence + 1);
        Ok(entry)
    }

    fn query_logs(&self, run_id: &RunId, query: &LogQuery) -> Result<Vec<RunLogEntry>, StoreError> {
        let path = self.run_path(run_id)?;
        let cursor = self.cursor(run_id);
        let _guard = cursor.lock();
        let entries = read_entries(&path)?;
        Ok(query.apply(&entries))
    }
}

impl ReportStore for FileStore {
    fn save_report(&self, report: &DiagnosticReport) -> Result<(), StoreError> {
        let path = self.report_path(&report.id);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(report)?;

        let _guard = self.report_lock.lock();
        if path.exists() {
            return Err(StoreError::ReportExists(report.id));
        }
        fs::write(&tmp, bytes).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StoreError::io(&path, e))?;

        tracing::debug!(report_id = %report.id, path = %path.display(), "saved report");
        Ok(())
    }

    fn get_report(&self, id: &ReportId) -> Result<Option<DiagnosticReport>, StoreError> {
        let path = self.report_path(id);
        if !path.exists() {
            return Ok(None);
        }
        read_report(&path).map(Some)
    }

    fn list_reports(&self, query: &ReportQuery) -> Result<Vec<DiagnosticReport>, StoreError> {
        let dir = self.root.join(REPORTS_DIR);
        let mut reports = Vec::new();
        for item in fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))? {
            let path = item.map_err(|e| StoreError::io(&dir, e))?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                reports.push(read_report(&path)?);
            }
        }
        Ok(query.apply(reports))
    }
}
