//! Output formatting module.
//!
//! Renders host summaries as plain text, JSON lines, or CSV, and appends
//! open ports to the results log.

mod csv_format;
mod json_format;
mod log_file;
mod plain;

pub use csv_format::print_csv;
pub use json_format::print_json;
pub use log_file::ResultLog;
pub use plain::{print_error, print_info, print_plain, print_scan_header, print_warning};

use crate::cli::OutputFormat;
use crate::scanner::RunSummary;
use std::io;

/// Prints summaries one at a time in a fixed format.
#[derive(Debug)]
pub struct SummaryPrinter {
    format: OutputFormat,
    printed: usize,
}

impl SummaryPrinter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format, printed: 0 }
    }

    pub fn print(&mut self, summary: &RunSummary) -> io::Result<()> {
        match self.format {
            OutputFormat::Plain => print_plain(summary)?,
            OutputFormat::Json => print_json(summary)?,
            OutputFormat::Csv => print_csv(summary, self.printed == 0)?,
        }
        self.printed += 1;
        Ok(())
    }

    /// Number of summaries printed so far.
    pub fn printed(&self) -> usize {
        self.printed
    }
}
