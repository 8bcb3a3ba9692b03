use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_WORKFLOW_PREFIX: &str = "covid19_car_estimate_";

/// Estimate number of cars at given rectangles (latitude-longitude) on given timeframes
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Args {
    /// Project ID from UP42 Console
    #[arg(short, long = "project_id", env = "UP42_PROJECT_ID")]
    pub project_id: String,

    /// API Key from UP42 Console
    #[arg(short = 'k', long = "api_key", env = "UP42_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// List of latitude-longitude pairs, each representing 2 corners of a square.
    /// Sample: 37.327035,-121.941054:37.323451,-121.940485
    #[arg(short, long, num_args = 1.., required = true)]
    pub coordinates: Vec<String>,

    /// List of date pairs, each representing the start and end of a timeframe.
    /// Sample: 2019-12-01:2020-02-28
    #[arg(short, long, num_args = 1.., required = true)]
    pub timeframes: Vec<String>,

    /// Output more debug information
    #[arg(short, long)]
    pub verbose: bool,

    /// Disables saving of raw archives from UP42
    #[arg(long = "no_store")]
    pub no_store: bool,

    /// Workflow name prefix to be passed to UP42 console
    #[arg(long = "workflow_name_prefix", default_value = DEFAULT_WORKFLOW_PREFIX)]
    pub workflow_name_prefix: String,

    /// Keep workflow in UP42 project after script is done
    #[arg(long = "no_cleanup")]
    pub no_cleanup: bool,

    /// TOML file overriding API, polling and job parameters
    #[arg(long)]
    pub settings: Option<PathBuf>,
}
