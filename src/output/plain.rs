//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::scanner::{PortState, RunSummary};
use console::{style, Style};
use std::io::{self, Write};
use std::time::Duration;

const RULE: &str = "───────────────────────────────────────────────────────────────";

/// Print one host summary in human-readable form.
pub fn print_plain(summary: &RunSummary) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_plain(&mut out, summary)
}

pub(crate) fn write_plain<W: Write>(out: &mut W, summary: &RunSummary) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{} {}", style("Scanning IP:").bold(), style(&summary.host).cyan())?;

    if summary.has_open_ports() {
        writeln!(
            out,
            "Open Ports: {}",
            style(summary.open_ports_list()).green()
        )?;
    } else {
        writeln!(out, "{}", style("No open ports found.").dim())?;
    }

    if !summary.outcomes.is_empty() {
        writeln!(out, "  {}", style(RULE).dim())?;
        writeln!(
            out,
            "  {:>6}  {:^8}  {}",
            style("PORT").bold(),
            style("STATE").bold(),
            style("REASON").bold()
        )?;
        writeln!(out, "  {}", style(RULE).dim())?;

        for outcome in &summary.outcomes {
            let state_style = match outcome.state {
                PortState::Open => Style::new().green().bold(),
                PortState::Closed => Style::new().red(),
            };
            writeln!(
                out,
                "  {:>6}  {:^8}  {}",
                outcome.port,
                state_style.apply_to(outcome.state.to_string()),
                style(outcome.reason.as_deref().unwrap_or("")).dim()
            )?;
        }

        writeln!(out, "  {}", style(RULE).dim())?;
    }

    write!(out, "Scan Duration: {}", format_duration(summary.elapsed))?;
    if !summary.complete {
        write!(
            out,
            " {}",
            style(format!(
                "(incomplete: {}/{} ports)",
                summary.scanned, summary.expected
            ))
            .yellow()
        )?;
    }
    writeln!(out)?;

    Ok(())
}

/// Print a scan header before scanning begins.
pub fn print_scan_header(hosts: usize, ports: &str, workers: usize) {
    eprintln!();
    eprintln!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("portsweep").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!(
        "{} Targets: {}",
        style("•").dim(),
        style(hosts).white().bold()
    );
    eprintln!("{} Ports: {}", style("•").dim(), style(ports).white().bold());
    eprintln!("{} Workers: {}", style("•").dim(), style(workers).yellow());
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    eprintln!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Format a duration as `1.23s` or `450ms`.
fn format_duration(d: Duration) -> String {
    if d >= Duration::from_secs(1) {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        format!("{}ms", d.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ScanOutcome;
    use crate::types::Port;
    use chrono::Utc;

    fn summary(open: &[u16]) -> RunSummary {
        RunSummary {
            host: "10.0.0.5".to_string(),
            open_ports: open.iter().map(|&p| Port::new(p).unwrap()).collect(),
            closed: 0,
            scanned: 3,
            expected: 3,
            elapsed: Duration::from_millis(1500),
            complete: true,
            completed_at: Utc::now(),
            outcomes: Vec::new(),
        }
    }

    fn render(summary: &RunSummary) -> String {
        console::set_colors_enabled(false);
        let mut buf = Vec::new();
        write_plain(&mut buf, summary).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(450)), "450ms");
        assert_eq!(format_duration(Duration::from_millis(1234)), "1.23s");
    }

    #[test]
    fn test_plain_with_open_ports() {
        let text = render(&summary(&[22, 80]));
        assert!(text.contains("Scanning IP: 10.0.0.5"));
        assert!(text.contains("Open Ports: 22, 80"));
        assert!(text.contains("Scan Duration: 1.50s"));
    }

    #[test]
    fn test_plain_without_open_ports() {
        let text = render(&summary(&[]));
        assert!(text.contains("No open ports found."));
    }

    #[test]
    fn test_plain_incomplete_and_outcomes() {
        let mut s = summary(&[]);
        s.complete = false;
        s.scanned = 1;
        s.outcomes = vec![ScanOutcome::closed(Port::new(9).unwrap(), "connection refused")];

        let text = render(&s);
        assert!(text.contains("incomplete: 1/3 ports"));
        assert!(text.contains("connection refused"));
    }
}
