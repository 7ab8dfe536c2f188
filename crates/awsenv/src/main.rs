//! awsenv CLI Application

// CLI binary needs to output to stderr - this is intentional
#![allow(clippy::print_stderr)]

use awsenv::cli::{Cli, EXIT_FAILURE, EXIT_OK, render_error};
use awsenv::commands;
use awsenv::tracing::{self, TracingConfig, TracingFormat};
use clap::Parser;

fn main() {
    // NOTE: Using eprintln! in panic hook is intentional - tracing infrastructure
    // may be corrupted during a panic, so we use the most reliable output method.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { EXIT_FAILURE } else { EXIT_OK });
        }
    };

    std::process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    let json = cli.json;
    let config = TracingConfig {
        format: if json { TracingFormat::Json } else { cli.log_format },
        level: cli.level.into(),
        filter: None,
    };
    if let Err(e) = tracing::init_tracing(config) {
        eprintln!("Failed to initialize tracing: {e}");
        return EXIT_FAILURE;
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            return EXIT_FAILURE;
        }
    };

    let prepared = rt.block_on(commands::prepare(cli.command));
    // No worker threads may outlive the exec below
    drop(rt);

    let err = match prepared {
        Ok(launch) => match launch.exec() {
            Ok(never) => match never {},
            Err(e) => e.into(),
        },
        Err(e) => e,
    };
    render_error(err, json);
    EXIT_FAILURE
}
