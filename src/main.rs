//! curtail-redist entry point: config loading, overrides and batch run.

use std::process;

use clap::Parser;
use tracing::error;

use curtail_redist::cli::Cli;
use curtail_redist::config::RunConfig;
use curtail_redist::logging;
use curtail_redist::runner;

fn main() {
    let cli = Cli::parse();

    let mut config = match RunConfig::from_toml_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };
    if let Err(e) = cli.apply(&mut config) {
        eprintln!("{e}");
        process::exit(1);
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    logging::init(&config.run.log_level);

    let summary = match runner::run(&config) {
        Ok(summary) => summary,
        Err(err) => {
            error!("{err:#}");
            process::exit(1);
        }
    };

    for (resolution, report) in &summary.reports {
        println!("[{resolution}]\n{report}\n");
    }
    eprintln!(
        "{} resolution(s) ok, {} failed; manifest written to {}",
        summary.success,
        summary.failure,
        summary.manifest_path.display()
    );

    if summary.failure > 0 {
        process::exit(2);
    }
}
