//! JSON output formatting.

use crate::scanner::RunSummary;
use std::io::{self, Write};

/// Print one summary as a single JSON line.
pub fn print_json(summary: &RunSummary) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer(&mut out, summary)?;
    writeln!(out)
}
