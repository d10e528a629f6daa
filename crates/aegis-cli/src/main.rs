#![forbid(unsafe_code)]

mod cli;
mod config_loader;
mod error;
mod suite_loader;

use clap::Parser;

use aegis_core::{Reporter, ReporterOptions, Runner};
use cli::Cli;
use error::CliError;

const EXIT_TEST_FAILURE: i32 = 1;
const EXIT_USAGE_ERROR: i32 = 2;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let exit_code = match run(&cli) {
        Ok(exit_code) => exit_code,
        Err(err) => {
            eprintln!("{err}");
            EXIT_USAGE_ERROR
        }
    };

    std::process::exit(exit_code);
}

fn init_logging(debug: bool) {
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(cli: &Cli) -> Result<i32, CliError> {
    let config = config_loader::load(&cli.config)?;
    let suites = suite_loader::load_all(&cli.tests)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to start async runtime");

    let read_timeout = cli.max_test_timeout_ms.map(std::time::Duration::from_millis);
    let outcome = runtime.block_on(async {
        let runner = Runner::new(read_timeout);
        runner.run(&config, &suites).await
    })?;

    let reporter = Reporter::new(ReporterOptions {
        verbose: cli.verbose,
        quiet: cli.quiet,
        json: cli.json,
        errors_only: cli.errors_only,
        syntax_only: cli.syntax_only,
        no_analysis: cli.no_analysis,
        group_errors: cli.group_errors,
        max_errors: cli.max_errors,
        timing: cli.timing,
    });

    let report = reporter.render(&outcome.suites, outcome.elapsed);
    print!("{report}");

    let summary = Reporter::summarize(&outcome.suites);
    Ok(if summary.failed == 0 { 0 } else { EXIT_TEST_FAILURE })
}
