//! File ingestion loop
//!
//! Runs on a blocking thread: gzip decoding and line scanning are synchronous,
//! and a full category queue parks the thread until its worker catches up.

use flate2::read::MultiGzDecoder;
use glob::MatchOptions;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{error, info, info_span, warn};

use crate::device::{DeviceMap, DeviceType};
use crate::error::{LoadError, Result};
use crate::parser::{parse_raw_line, AppsInstalled};

// ============================================================================
// Routing
// ============================================================================

/// Dispatches records to the inbound queue of their category's worker
///
/// Dropping the router closes every inbound queue, which is the workers'
/// signal to drain and stop.
pub struct Router {
    queues: DeviceMap<mpsc::Sender<AppsInstalled>>,
}

impl Router {
    pub fn new(queues: DeviceMap<mpsc::Sender<AppsInstalled>>) -> Self {
        Self { queues }
    }

    /// Queue `record`, blocking while the target queue is full
    ///
    /// Must not be called from async context.
    pub fn route(&self, record: AppsInstalled, source: &Path) -> Result<()> {
        let device: DeviceType = match record.dev_type.parse() {
            Ok(device) => device,
            Err(_) => {
                return Err(LoadError::UnknownCategory {
                    dev_type: record.dev_type,
                    path: source.to_path_buf(),
                })
            },
        };

        self.queues[device]
            .blocking_send(record)
            .map_err(|_| LoadError::QueueClosed(device))
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Counts for one scanned file
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    /// Physical lines read, blank ones included
    pub lines: u64,
    pub records: u64,
    pub parse_errors: u64,
}

/// Totals for a whole ingestion pass
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub files: usize,
    pub records: u64,
    pub parse_errors: u64,
}

impl IngestReport {
    fn add(&mut self, file: &FileReport) {
        self.files += 1;
        self.records += file.records;
        self.parse_errors += file.parse_errors;
    }
}

// ============================================================================
// Ingestion
// ============================================================================

/// Input files for `pattern`, in lexical order
///
/// Names starting with `.` only match a pattern that spells the dot out, so
/// files renamed by [`dot_rename`] are not picked up again.
pub fn matching_files(pattern: &str) -> Result<Vec<PathBuf>> {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: true,
    };
    let entries = glob::glob_with(pattern, options).map_err(|source| LoadError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {},
            Err(e) => warn!(path = %e.path().display(), error = %e, "Skipping unreadable glob entry"),
        }
    }
    files.sort();
    Ok(files)
}

/// Scan every file matching `pattern` and route its records
///
/// Consumes the router so the inbound queues close however this returns.
pub fn ingest(pattern: &str, router: Router) -> Result<IngestReport> {
    let files = matching_files(pattern)?;
    if files.is_empty() {
        warn!(pattern, "No input files matched");
    }
    load_files(&files, &router)
}

/// Load `files` in order, marking each one processed once fully scanned
///
/// Stops at the first fatal error; that file and the rest keep their names.
pub fn load_files(files: &[PathBuf], router: &Router) -> Result<IngestReport> {
    let mut total = IngestReport::default();

    for path in files {
        let report = load_file(path, router)?;
        total.add(&report);

        match dot_rename(path) {
            Ok(renamed) => info!(file = %path.display(), renamed = %renamed.display(), "Marked as processed"),
            Err(e) => error!(file = %path.display(), error = %e, "Cannot rename processed file"),
        }
    }

    Ok(total)
}

/// Stream one gzip file through the parser into the router
pub fn load_file(path: &Path, router: &Router) -> Result<FileReport> {
    let span = info_span!("file", file = %path.display());
    let _enter = span.enter();
    info!("Processing {}", path.display());

    let file = File::open(path).map_err(|e| LoadError::file_read(path, e))?;
    let mut reader = BufReader::new(MultiGzDecoder::new(file));
    let mut report = FileReport {
        path: path.to_path_buf(),
        ..FileReport::default()
    };
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| LoadError::file_read(path, e))?;
        if read == 0 {
            break;
        }
        report.lines += 1;

        match parse_raw_line(&buf) {
            Ok(None) => {},
            Ok(Some(parsed)) => {
                for warning in &parsed.warnings {
                    warn!(line = report.lines, "{}", warning);
                }
                router.route(parsed.record, path)?;
                report.records += 1;
            },
            Err(e) => {
                report.parse_errors += 1;
                warn!(line = report.lines, error = %e, "Cannot parse line");
            },
        }
    }

    info!(
        lines = report.lines,
        records = report.records,
        parse_errors = report.parse_errors,
        "Finished file"
    );
    Ok(report)
}

/// Rename `path` in place to `.<name>`
pub fn dot_rename(path: &Path) -> std::io::Result<PathBuf> {
    let Some(name) = path.file_name() else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        ));
    };

    let mut dotted = std::ffi::OsString::from(".");
    dotted.push(name);
    let target = path.with_file_name(dotted);

    std::fs::rename(path, &target)?;
    Ok(target)
}
