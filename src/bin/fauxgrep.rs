//! fauxgrep - multi-threaded recursive substring search
//!
//! Entry point for the search tool.

use anyhow::{Context, Result};
use clap::Parser;
use job_walker::config::GrepArgs;
use job_walker::handler::GrepHandler;
use job_walker::logging::setup_logging;
use job_walker::output::SharedOutput;
use job_walker::summary::print_summary;
use job_walker::walker::WalkCoordinator;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

fn main() -> ExitCode {
    let args = match GrepArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not errors
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
            eprintln!("fauxgrep: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: GrepArgs) -> Result<()> {
    let (config, needle) = args.into_config().context("Invalid configuration")?;
    setup_logging(config.verbose);

    let output = Arc::new(SharedOutput::stdout());
    let handler = Arc::new(GrepHandler::new(needle, Arc::clone(&output)));
    let coordinator = WalkCoordinator::new(config.clone(), handler);

    // Setup signal handler for graceful shutdown
    let shutdown_flag = coordinator.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, finishing queued files...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let result = coordinator.run().context("Search failed")?;
    output.flush().context("Failed to flush output")?;

    if config.show_stats {
        print_summary("fauxgrep", &result);
    }

    if !result.completed {
        info!("Search was interrupted before completion");
    }

    Ok(())
}
