//! shelfcache - inspect and maintain the offline cache of the store task app
//!
//! Parses the command line, installs logging, builds the cache stack and
//! prints each command's report as JSON on stdout.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use shelfcache::app::App;
use shelfcache::cli::Cli;
use shelfcache::config::CacheConfig;

/// Installs stderr logging; `RUST_LOG` wins over the verbosity flag
fn install_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = CacheConfig::from_cli(&cli)?;
    let app = App::new(&config)?;

    let report = app.run(cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    install_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
