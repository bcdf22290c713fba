//! fhistogram - multi-threaded bit histogram of file contents
//!
//! Entry point for the histogram tool.

use anyhow::{Context, Result};
use clap::Parser;
use console::Term;
use job_walker::config::HistogramArgs;
use job_walker::handler::HistogramHandler;
use job_walker::logging::setup_logging;
use job_walker::output::SharedOutput;
use job_walker::summary::print_summary;
use job_walker::walker::WalkCoordinator;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

fn main() -> ExitCode {
    let args = match HistogramArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fhistogram: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: HistogramArgs) -> Result<()> {
    let (config, merge_interval) = args.into_config().context("Invalid configuration")?;
    setup_logging(config.verbose);

    let output = Arc::new(SharedOutput::stdout());
    let handler = Arc::new(
        HistogramHandler::new(Arc::clone(&output), merge_interval)
            .with_redraw(Term::stdout().is_term()),
    );
    let coordinator = WalkCoordinator::new(config.clone(), handler.clone());

    // Setup signal handler for graceful shutdown
    let shutdown_flag = coordinator.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, finishing queued files...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let result = coordinator.run().context("Histogram failed")?;
    handler.finish().context("Failed to flush output")?;

    if config.show_stats {
        print_summary("fhistogram", &result);
    }

    if !result.completed {
        info!("Histogram was interrupted before completion");
    }

    Ok(())
}
