//! relation-discovery binary entry point.

mod cli;

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use relation_discovery::{DiscoveryReport, TracingProgress};
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn main() -> ExitCode {
    // Logs go to stderr so the report on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("relation_discovery=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let start = Instant::now();

    match execute(cli) {
        Ok(report) => {
            print_report(&report);
            println!("Computation took {}ms", start.elapsed().as_millis());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> relation_discovery::Result<DiscoveryReport> {
    let config = cli.into_config()?;
    tracing::info!(
        rank = config.params.rank,
        clusters = config.params.num_clusters,
        distance = %config.params.distance,
        "starting relation discovery"
    );
    relation_discovery::run(&config, Arc::new(TracingProgress))
}

fn print_report(report: &DiscoveryReport) {
    for cluster in &report.clusters {
        println!("-----{}------", cluster.index);
        for point in &cluster.closest {
            println!("\t{}", point);
        }
        println!("\n");
    }
}
