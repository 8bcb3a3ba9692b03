use crate::args::Args;
use crate::input::{self, Polygon, TimeRange};
use crate::settings::Settings;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Everything one run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub project_id: String,
    pub api_key: String,
    pub polygons: Vec<Polygon>,
    pub time_ranges: Vec<TimeRange>,
    pub verbose: bool,
    pub store_artifacts: bool,
    pub workflow_name: String,
    pub output_dir: PathBuf,
    pub cleanup: bool,
    pub settings: Settings,
}

impl RunConfig {
    pub fn from_args(args: Args) -> Result<Self> {
        let polygons = input::parse_polygons(&args.coordinates)?;
        let time_ranges = input::parse_time_ranges(&args.timeframes)?;

        let settings = match &args.settings {
            Some(path) => Settings::read(path)
                .with_context(|| format!("Unable to read settings from {}", path.display()))?,
            None => Settings::default(),
        };

        Ok(Self {
            project_id: args.project_id,
            api_key: args.api_key,
            polygons,
            time_ranges,
            verbose: args.verbose,
            store_artifacts: !args.no_store,
            workflow_name: format!("{}{}", args.workflow_name_prefix, random_hex()),
            output_dir: PathBuf::from(format!("raw_job_{}", chrono::Utc::now().timestamp())),
            cleanup: !args.no_cleanup,
            settings,
        })
    }

    pub fn job_name(&self) -> String {
        format!("{}_job_{}", self.workflow_name, random_hex())
    }
}

/// 16 random lowercase hex characters.
pub fn random_hex() -> String {
    let mut hex = uuid::Uuid::new_v4().simple().to_string();
    hex.truncate(16);
    hex
}
