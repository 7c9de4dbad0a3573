//! BioKB CLI Entry Point
//!
//! Loads the corpus, runs one command and prints the result as JSON on
//! stdout. Logs go to stderr.

use biokb::{open_engine, run, Args};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "biokb=info,biokb_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let engine = match open_engine(&args).await {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    match run(&engine, &args.command, args.limit)
        .and_then(|value| Ok(serde_json::to_string_pretty(&value)?))
    {
        Ok(output) => println!("{output}"),
        Err(e) => {
            tracing::error!("Command failed: {}", e);
            std::process::exit(1);
        }
    }
}
