use serde::{Deserialize, Serialize};

/// Most endpoints wrap their payload in `{"data": ...}`.
#[derive(Deserialize, Debug)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Block {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Workflow {
    pub id: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTask {
    pub name: String,
    pub parent_name: Option<String>,
    pub block_id: String,
}

impl WorkflowTask {
    /// Links blocks into a linear chain, each one the parent of the next.
    pub fn chain(blocks: &[Block]) -> Vec<Self> {
        let mut tasks = Vec::with_capacity(blocks.len());
        let mut parent_name: Option<String> = None;
        for block in blocks {
            tasks.push(Self {
                name: block.name.clone(),
                parent_name: parent_name.take(),
                block_id: block.id.clone(),
            });
            parent_name = Some(block.name.clone());
        }
        tasks
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub status: String,
}

impl Job {
    pub fn status(&self) -> JobStatus {
        JobStatus::from(self.status.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    Failed,
    /// Any non-terminal state reported by the platform.
    Pending(String),
}

impl From<&str> for JobStatus {
    fn from(status: &str) -> Self {
        match status {
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            other => Self::Pending(other.to_string()),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Task {
    pub id: String,
}

#[derive(Deserialize, Debug)]
pub struct SignedUrl {
    pub url: String,
}

#[derive(Deserialize, Debug)]
pub struct AccessToken {
    pub access_token: String,
}
