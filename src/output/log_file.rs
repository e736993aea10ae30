//! Append-only results log.
//!
//! Each host with open ports adds one line, `<host>: Open Ports: <ports>`.
//! The file is created if absent and never truncated.

use crate::error::LogWriteError;
use crate::scanner::RunSummary;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug)]
pub struct ResultLog {
    path: PathBuf,
    failed: bool,
}

impl ResultLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            failed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the summary's log line, if it has one.
    pub fn append(&self, summary: &RunSummary) -> Result<(), LogWriteError> {
        let Some(line) = summary.log_line() else {
            return Ok(());
        };

        let to_error = |source| LogWriteError {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(to_error)?;
        writeln!(file, "{}", line).map_err(to_error)
    }

    /// Append, reporting only the first failure.
    ///
    /// Returns the error the first time one occurs; later calls are skipped.
    pub fn record(&mut self, summary: &RunSummary) -> Option<LogWriteError> {
        if self.failed {
            return None;
        }
        match self.append(summary) {
            Ok(()) => None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e.source, "disabling results log");
                self.failed = true;
                Some(e)
            }
        }
    }
}
