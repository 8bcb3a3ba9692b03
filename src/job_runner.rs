//! Runs the dry-run and real jobs for one polygon/time range pair and turns
//! the real job's output into a vehicle count.
use crate::artifacts::ArtifactStore;
use crate::config::RunConfig;
use crate::error::Up42Error;
use crate::input::{Polygon, TimeRange};
use crate::settings::Settings;
use crate::up42::models::JobStatus;
use crate::up42::Up42Ops;
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed,
    /// Polling gave up before the job reached a terminal state.
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DryRunVerdict {
    Proceed,
    ReportFailure,
}

/// Only a dry run that succeeded is worth paying for the real job.
pub fn dry_run_gate(outcome: JobOutcome) -> DryRunVerdict {
    match outcome {
        JobOutcome::Succeeded => DryRunVerdict::Proceed,
        JobOutcome::Failed | JobOutcome::TimedOut => DryRunVerdict::ReportFailure,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairResult {
    Count(usize),
    Unavailable,
}

impl fmt::Display for PairResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Unavailable => f.write_str("-"),
        }
    }
}

/// One polygon/time range pair, with its 1-based position in the input.
pub struct Pair<'a> {
    pub polygon_num: usize,
    pub interval_num: usize,
    pub polygon: &'a Polygon,
    pub time_range: &'a TimeRange,
}

pub fn job_params(settings: &Settings, polygon: &Polygon, time_range: &TimeRange) -> Value {
    let mut params = serde_json::Map::new();
    params.insert(settings.processing_block.clone(), json!({}));
    params.insert(
        settings.data_block.clone(),
        json!({
            "ids": null,
            "time": time_range.to_string(),
            "limit": settings.scene_limit,
            "intersects": polygon.to_geojson(),
            "zoom_level": settings.zoom_level,
            "time_series": null,
            "max_cloud_cover": settings.max_cloud_cover,
            "panchromatic_band": settings.panchromatic_band,
        }),
    );
    Value::Object(params)
}

/// Polls the job status until it is terminal or the attempts run out.
pub async fn await_job_completion(
    api: &impl Up42Ops,
    job_id: &str,
    settings: &Settings,
) -> Result<JobOutcome, Up42Error> {
    debug!("Awaiting completion of job {job_id}");
    for attempt in 1..=settings.max_poll_attempts {
        match api.get_job(job_id).await?.status() {
            JobStatus::Succeeded => return Ok(JobOutcome::Succeeded),
            JobStatus::Failed => return Ok(JobOutcome::Failed),
            JobStatus::Pending(status) => {
                debug!("Job {job_id} is {status} (attempt {attempt})");
            }
        }
        if attempt < settings.max_poll_attempts {
            tokio::time::sleep(settings.poll_interval()).await;
        }
    }
    Ok(JobOutcome::TimedOut)
}

async fn submit_and_wait(
    api: &impl Up42Ops,
    config: &RunConfig,
    workflow_id: &str,
    params: &Value,
    is_dry: bool,
) -> Result<(String, JobOutcome), Up42Error> {
    let job = api
        .run_job(workflow_id, &config.job_name(), is_dry, params)
        .await?;
    let outcome = await_job_completion(api, &job.id, &config.settings).await?;
    match outcome {
        JobOutcome::Succeeded => {}
        JobOutcome::Failed => debug!("Job {} failed", job.id),
        JobOutcome::TimedOut => warn!(
            "Job {} did not finish after {} status checks",
            job.id, config.settings.max_poll_attempts
        ),
    }
    Ok((job.id, outcome))
}

/// Number of detected vehicles in the first feature of a job output.
pub fn detection_count(output: &Value) -> Option<usize> {
    let details = output
        .get("features")?
        .get(0)?
        .get("properties")?
        .get("det_details")?
        .as_array()?;
    Some(details.len())
}

async fn log_dry_run_estimate(api: &impl Up42Ops, job_id: &str) {
    let output = match api.get_job_output(job_id).await {
        Ok(output) => output,
        Err(e) => {
            debug!("No dry run output for job {job_id}: {e}");
            return;
        }
    };
    let feature = output.get("features").and_then(|f| f.get(0));
    let acquisition_date = feature
        .and_then(|f| f.get("properties"))
        .and_then(|p| p.get("acquisitionDate"))
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let credits = feature
        .and_then(|f| f.get("estimatedCredits"))
        .map(Value::to_string)
        .unwrap_or_else(|| "unknown".to_string());
    debug!("Acquisition date: {acquisition_date}");
    debug!("Estimated credits: {credits}");
}

async fn try_estimate(
    api: &impl Up42Ops,
    config: &RunConfig,
    store: Option<&ArtifactStore>,
    workflow_id: &str,
    pair: &Pair<'_>,
) -> Result<PairResult, Up42Error> {
    let params = job_params(&config.settings, pair.polygon, pair.time_range);

    debug!("Running test query first");
    let (dry_job_id, dry_outcome) = submit_and_wait(api, config, workflow_id, &params, true).await?;
    if dry_run_gate(dry_outcome) == DryRunVerdict::ReportFailure {
        return Ok(PairResult::Unavailable);
    }
    if config.verbose {
        log_dry_run_estimate(api, &dry_job_id).await;
    }

    debug!("Now running actual job");
    let (job_id, outcome) = submit_and_wait(api, config, workflow_id, &params, false).await?;
    if outcome != JobOutcome::Succeeded {
        return Ok(PairResult::Unavailable);
    }

    let output = api.get_job_output(&job_id).await?;
    let count = detection_count(&output)
        .ok_or_else(|| Up42Error::Output(format!("job {job_id} has no detection details")))?;

    if let Some(store) = store {
        debug!("Storing job results");
        match store
            .persist_job(api, &job_id, pair.polygon_num, pair.interval_num)
            .await
        {
            Ok(saved) => debug!("Stored {saved} archives for job {job_id}"),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!("Unable to store results of job {job_id}: {e}"),
        }
    }

    Ok(PairResult::Count(count))
}

/// Estimates one pair. Job failures, timeouts and per-job API errors all
/// yield `PairResult::Unavailable`; only fatal errors are returned.
pub async fn estimate_pair(
    api: &impl Up42Ops,
    config: &RunConfig,
    store: Option<&ArtifactStore>,
    workflow_id: &str,
    pair: &Pair<'_>,
) -> Result<PairResult, Up42Error> {
    match try_estimate(api, config, store, workflow_id, pair).await {
        Err(e) if !e.is_fatal() => {
            warn!(
                "Polygon {} interval {} failed: {e}",
                pair.polygon_num, pair.interval_num
            );
            Ok(PairResult::Unavailable)
        }
        result => result,
    }
}
