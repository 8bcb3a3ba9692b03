use crate::artifacts::ArtifactStore;
use crate::config::RunConfig;
use crate::job_runner::{estimate_pair, Pair, PairResult};
use crate::up42::Up42Ops;
use crate::workflow;
use anyhow::{Context, Result};
use std::io::Write;
use tracing::{debug, info};

/// Creates the workflow, estimates every polygon/time range pair in input
/// order (polygon-major), writes one line per pair to `out`, then cleans up.
pub async fn run<W: Write>(
    api: &impl Up42Ops,
    config: &RunConfig,
    out: &mut W,
) -> Result<Vec<PairResult>> {
    info!("Creating workflow {}", config.workflow_name);
    let workflow_id = workflow::initialize_workflow(api, config)
        .await
        .context("Unable to set up workflow")?;
    debug!("Created workflow: {workflow_id}");

    let store = config
        .store_artifacts
        .then(|| ArtifactStore::new(&config.output_dir));

    let estimates = estimate_all(api, config, store.as_ref(), &workflow_id, out).await;

    if config.cleanup {
        workflow::cleanup(api, &workflow_id).await;
    } else {
        info!("Keeping workflow {workflow_id}");
    }

    estimates
}

async fn estimate_all<W: Write>(
    api: &impl Up42Ops,
    config: &RunConfig,
    store: Option<&ArtifactStore>,
    workflow_id: &str,
    out: &mut W,
) -> Result<Vec<PairResult>> {
    let mut results = Vec::with_capacity(config.polygons.len() * config.time_ranges.len());

    for (i, polygon) in config.polygons.iter().enumerate() {
        for (j, time_range) in config.time_ranges.iter().enumerate() {
            let pair = Pair {
                polygon_num: i + 1,
                interval_num: j + 1,
                polygon,
                time_range,
            };
            let result = estimate_pair(api, config, store, workflow_id, &pair).await?;
            writeln!(out, "Polygon {} interval {}: {result}", pair.polygon_num, pair.interval_num)?;
            out.flush()?;
            results.push(result);
        }
    }
    Ok(results)
}
