use anyhow::Result;
use clap::Parser;
use std::io;
use tracing_subscriber::EnvFilter;
use up42_vehicle_count::args::Args;
use up42_vehicle_count::config::RunConfig;
use up42_vehicle_count::run::run;
use up42_vehicle_count::up42::Client;

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "warn,up42_vehicle_count=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Bad coordinates or dates stop here, before any request is made
    let config = RunConfig::from_args(args)?;

    let client = Client::new(
        &config.settings.base_url,
        &config.project_id,
        &config.api_key,
        config.settings.token_timeout(),
    )?;

    let stdout = io::stdout();
    let _ = run(&client, &config, &mut stdout.lock()).await?;

    Ok(())
}
