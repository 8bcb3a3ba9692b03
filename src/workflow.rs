use crate::config::RunConfig;
use crate::error::Up42Error;
use crate::settings::Settings;
use crate::up42::models::{Block, WorkflowTask};
use crate::up42::Up42Ops;
use tracing::{debug, info, warn};

const WORKFLOW_DESCRIPTION: &str = "Temp workflow for covid19 script";

/// Picks the imagery source block and the vehicle detection block, in that
/// order. The first catalog entry with a matching name wins.
pub fn find_target_blocks(catalog: &[Block], settings: &Settings) -> Result<Vec<Block>, Up42Error> {
    [&settings.data_block, &settings.processing_block]
        .into_iter()
        .map(|name| {
            catalog
                .iter()
                .find(|block| &block.name == name)
                .cloned()
                .ok_or_else(|| Up42Error::MissingBlock(name.clone()))
        })
        .collect()
}

/// Creates the run's workflow and wires source -> detection. Returns its id.
/// A workflow whose tasks could not be set is deleted again unless cleanup
/// is disabled.
pub async fn initialize_workflow(api: &impl Up42Ops, config: &RunConfig) -> Result<String, Up42Error> {
    let catalog = api.get_blocks().await?;
    let targets = find_target_blocks(&catalog, &config.settings)?;

    let workflow = api
        .create_workflow(&config.workflow_name, WORKFLOW_DESCRIPTION)
        .await?;
    debug!("Created workflow {} ({})", config.workflow_name, workflow.id);

    if let Err(e) = api
        .set_workflow_tasks(&workflow.id, &WorkflowTask::chain(&targets))
        .await
    {
        if config.cleanup {
            cleanup(api, &workflow.id).await;
        }
        return Err(e);
    }
    Ok(workflow.id)
}

/// Deletes the workflow. The estimates are already printed by the time this
/// runs, so a failure is only reported.
pub async fn cleanup(api: &impl Up42Ops, workflow_id: &str) {
    info!("Cleaning workflow {workflow_id} up");
    if let Err(e) = api.delete_workflow(workflow_id).await {
        warn!("Unable to delete workflow {workflow_id}: {e}");
    }
}
