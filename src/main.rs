use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use feedmerge::feed::{Fetcher, SourceListError};
use feedmerge::{run, Clock, Config, RunOptions, RunOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "feedmerge",
    version,
    about = "Merge RSS/Atom feeds into one RSS 2.0 file, newest first"
)]
struct Args {
    /// Text file with one feed URL per line (or an OPML subscription list)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Where to write the combined RSS 2.0 feed
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Keep only items published on or after this date: today, yesterday or YYYY-MM-DD
    #[arg(value_name = "ON_OR_AFTER")]
    on_or_after: Option<String>,

    /// TOML config file; built-in defaults are used when omitted
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Wrong argument count prints usage and exits with status 2
    let args = Args::parse();

    let config =
        Config::load_optional(args.config.as_deref()).context("Failed to load --config file")?;
    tracing::debug!(?config, "Using configuration");

    let fetcher = Fetcher::new(&config).context("Failed to create HTTP client")?;
    let options = RunOptions {
        input: args.input,
        output: args.output,
        on_or_after: args.on_or_after,
    };

    match run(&options, &fetcher, Clock::system()).await {
        Ok(RunOutcome::Written {
            items,
            skipped_sources,
        }) => {
            if skipped_sources > 0 {
                println!("Skipped {} feed(s) that could not be read", skipped_sources);
            }
            println!(
                "Aggregated {} items into {}",
                items,
                options.output.display()
            );
            Ok(())
        }
        Ok(RunOutcome::NoSources) => Ok(()),
        Err(e) => match e.downcast_ref::<SourceListError>() {
            Some(SourceListError::NotFound(path)) => {
                eprintln!("Error: File not found: {}", path.display());
                eprintln!("Create it with one feed URL per line and run again.");
                std::process::exit(1);
            }
            _ => Err(e),
        },
    }
}
