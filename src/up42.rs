//! UP42 REST API: the operations the estimator needs, and the authenticated
//! reqwest client that performs them.
mod auth;
mod client;
pub mod models;

pub use auth::{BearerAuth, ClientCredentials, TokenSource};
pub use client::Client;

use crate::error::Up42Error;
use futures_util::stream::BoxStream;
use models::{Block, Job, Task, Workflow, WorkflowTask};
use serde_json::Value;

/// Archive body as it arrives over the wire.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, Up42Error>>;

pub trait Up42Ops {
    async fn get_blocks(&self) -> Result<Vec<Block>, Up42Error>;

    async fn create_workflow(&self, name: &str, description: &str) -> Result<Workflow, Up42Error>;

    async fn set_workflow_tasks(
        &self,
        workflow_id: &str,
        tasks: &[WorkflowTask],
    ) -> Result<(), Up42Error>;

    async fn delete_workflow(&self, workflow_id: &str) -> Result<(), Up42Error>;

    async fn run_job(
        &self,
        workflow_id: &str,
        name: &str,
        is_dry: bool,
        params: &Value,
    ) -> Result<Job, Up42Error>;

    async fn get_job(&self, job_id: &str) -> Result<Job, Up42Error>;

    /// The `data-json` output of a finished job, a GeoJSON feature collection.
    async fn get_job_output(&self, job_id: &str) -> Result<Value, Up42Error>;

    async fn get_job_tasks(&self, job_id: &str) -> Result<Vec<Task>, Up42Error>;

    async fn get_task_signed_url(&self, job_id: &str, task_id: &str) -> Result<String, Up42Error>;

    /// Fetches a signed download URL. Signed URLs carry their own credentials.
    async fn download(&self, url: &str) -> Result<ByteStream, Up42Error>;
}
