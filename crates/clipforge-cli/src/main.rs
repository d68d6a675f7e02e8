//! CLI entry point.
//!
//! Logging goes to stderr so `--json` output on stdout stays parseable.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use clipforge_cli::{Cli, CliError, bootstrap, dispatch};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before parsing so CLIPFORGE_* variables are visible.
    dotenvy::dotenv().ok();

    let mut cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command.take() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let ctx = match bootstrap(&cli) {
        Ok(ctx) => ctx,
        Err(e) => exit_with(&e),
    };
    if let Err(e) = dispatch(&ctx, command).await {
        exit_with(&e);
    }
    Ok(())
}

fn exit_with(err: &CliError) -> ! {
    eprintln!("Error: {err}");
    std::process::exit(err.exit_code());
}
