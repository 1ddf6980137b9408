//! `boost-make-headers` CLI entrypoint.
//!
//! This binary regenerates a repository's vendored Boost headers for one
//! library: it fetches the requested release, builds it with Boost's own
//! tooling, installs the headers and applies local patches.

use boost_headers::cli::Cli;
use boost_headers::config::HeadersConfig;
use boost_headers::error::Result;
use boost_headers::output::{DryRunInfo, Reporter, success_message, write_line};
use boost_headers::pipeline::generate_headers;
use clap::Parser;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let config = HeadersConfig::from_cli_in_current_dir(cli)?;

    // Dry-run mode: show what would be done without side effects
    if cli.dry_run {
        write_line(stderr, DryRunInfo { config: &config }.display_text());
        return Ok(());
    }

    let mut reporter = Reporter::new(stderr, cli.verbose);
    let outcome = generate_headers(&config, &mut reporter)?;

    let report = outcome.patches.unwrap_or_default();
    reporter.info(success_message(&config.output_dir, &report));
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_line(stderr, err);
            1
        }
    }
}
