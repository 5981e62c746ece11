use std::process::ExitCode;

use clap::Parser;
use costwatch::cli::Cli;
use tracing::subscriber;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

// RUST_LOG, when set, takes precedence over the -v count. Targets show up
// from -vv, source locations and thread ids from -vvv.
fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));

    let detailed = cli.verbose >= 3;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(cli.verbose >= 2)
        .with_thread_ids(detailed)
        .with_file(detailed)
        .with_line_number(detailed)
        .compact()
        .finish();

    subscriber::set_global_default(subscriber)?;
    Ok(())
}
