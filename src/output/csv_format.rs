//! CSV output formatting.

use crate::scanner::RunSummary;
use std::io::{self, Write};

const HEADER: [&str; 7] = [
    "host",
    "open_ports",
    "closed",
    "scanned",
    "expected",
    "elapsed_ms",
    "complete",
];

/// Print one summary as a CSV row, preceded by the header if asked.
pub fn print_csv(summary: &RunSummary, with_header: bool) -> io::Result<()> {
    let stdout = io::stdout();
    write_csv(stdout.lock(), summary, with_header)
}

pub(crate) fn write_csv<W: Write>(out: W, summary: &RunSummary, with_header: bool) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    if with_header {
        wtr.write_record(HEADER)?;
    }

    let open_ports = summary
        .open_ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(" ");

    wtr.write_record([
        summary.host.as_str(),
        &open_ports,
        &summary.closed.to_string(),
        &summary.scanned.to_string(),
        &summary.expected.to_string(),
        &summary.elapsed.as_millis().to_string(),
        &summary.complete.to_string(),
    ])?;

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Port;
    use chrono::Utc;
    use std::time::Duration;

    #[test]
    fn test_csv_row() {
        let summary = RunSummary {
            host: "h".to_string(),
            open_ports: vec![Port::new(22).unwrap(), Port::new(80).unwrap()],
            closed: 8,
            scanned: 10,
            expected: 10,
            elapsed: Duration::from_millis(42),
            complete: true,
            completed_at: Utc::now(),
            outcomes: Vec::new(),
        };

        let mut buf = Vec::new();
        write_csv(&mut buf, &summary, true).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(
            text,
            "host,open_ports,closed,scanned,expected,elapsed_ms,complete\nh,22 80,8,10,10,42,true\n"
        );
    }
}
