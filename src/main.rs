use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use portsweep::cli::{Args, OutputFormat};
use portsweep::output::{self, ResultLog, SummaryPrinter};
use portsweep::scanner::{CancelController, Scanner};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "portsweep=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> anyhow::Result<()> {
    let settings = args.settings().context("failed to load settings")?;
    let config = args
        .scan_config(&settings)
        .context("invalid scan configuration")?;

    let plain = args.output == OutputFormat::Plain;
    let chatty = plain && !config.quiet;
    if chatty {
        output::print_scan_header(
            config.hosts.len(),
            &config.ports.to_string(),
            config.concurrency,
        );
    }

    let controller = CancelController::new();
    controller.cancel_on_interrupt();
    if let Some(deadline) = args.deadline {
        controller.cancel_after(deadline);
    }

    let progress = args
        .show_progress()
        .then(|| progress_bar(config.total_units() as u64));
    let mut scanner = Scanner::new(config);
    if let Some(pb) = &progress {
        scanner = scanner.with_progress(pb.clone());
    }

    let mut handle = scanner.start(controller.token())?;
    let total = handle.total_units() as u64;
    let stats = handle.stats();

    let mut printer = SummaryPrinter::new(args.output);
    let mut log = args.log_file(&settings).map(ResultLog::new);

    while let Some(summary) = handle.next().await {
        match &progress {
            Some(pb) => pb.suspend(|| printer.print(&summary))?,
            None => printer.print(&summary)?,
        }

        if let Some(log) = log.as_mut() {
            if let Some(e) = log.record(&summary) {
                output::print_warning(&e.to_string());
            }
        }
    }
    handle.join().await;
    controller.disarm();

    if let Some(reason) = controller.reason() {
        let snapshot = stats.snapshot();
        output::print_warning(&format!(
            "scan {}: {} of {} units were never dispatched",
            reason,
            total.saturating_sub(snapshot.dispatched),
            total
        ));
    }

    if chatty && printer.printed() == 0 {
        output::print_info("No hosts to report.");
    }
    if let (true, Some(log)) = (chatty, &log) {
        output::print_info(&format!("Results appended to {}", log.path().display()));
    }

    Ok(())
}

fn progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}
