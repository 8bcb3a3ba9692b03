//! Scripted in-memory stand-in for the UP42 API.
use crate::config::{random_hex, RunConfig};
use crate::error::Up42Error;
use crate::input;
use crate::settings::Settings;
use crate::up42::models::{Block, Job, Task, Workflow, WorkflowTask};
use crate::up42::{ByteStream, Up42Ops};
use futures_util::StreamExt;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetBlocks,
    CreateWorkflow(String),
    SetWorkflowTasks(String),
    DeleteWorkflow(String),
    RunJob { name: String, is_dry: bool },
    GetJob(String),
    GetJobOutput(String),
    GetTasks(String),
    SignedUrl(String),
    Download(String),
}

/// What the next submitted job will do: the statuses reported by successive
/// polls (the last one repeats), its output and its number of tasks.
#[derive(Debug, Clone)]
pub struct JobScript {
    statuses: Vec<String>,
    output: Value,
    tasks: usize,
}

impl JobScript {
    pub fn new(statuses: &[&str]) -> Self {
        Self {
            statuses: statuses.iter().map(|s| s.to_string()).collect(),
            output: json!({"type": "FeatureCollection", "features": []}),
            tasks: 0,
        }
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = output;
        self
    }

    pub fn with_tasks(mut self, tasks: usize) -> Self {
        self.tasks = tasks;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AuthFailure {
    Never,
    Always,
    AfterSetup,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    scripts: VecDeque<JobScript>,
    jobs: HashMap<String, (JobScript, usize)>,
    workflow_tasks: Vec<(String, Vec<WorkflowTask>)>,
    downloads: HashMap<String, Vec<u8>>,
    next_workflow: usize,
    next_job: usize,
}

pub struct FakeApi {
    blocks: Vec<Block>,
    fail_delete: bool,
    fail_chain: bool,
    broken_downloads: bool,
    auth_failure: AuthFailure,
    state: Mutex<State>,
}

impl FakeApi {
    pub fn new() -> Self {
        let settings = Settings::default();
        Self {
            blocks: vec![
                Block {
                    id: "block-other".to_string(),
                    name: "esa-s2-l2a-gtiff".to_string(),
                },
                Block {
                    id: "block-data".to_string(),
                    name: settings.data_block,
                },
                Block {
                    id: "block-detection".to_string(),
                    name: settings.processing_block,
                },
            ],
            fail_delete: false,
            fail_chain: false,
            broken_downloads: false,
            auth_failure: AuthFailure::Never,
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_blocks(mut self, blocks: Vec<Block>) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn with_jobs(self, scripts: Vec<JobScript>) -> Self {
        self.state.lock().unwrap().scripts.extend(scripts);
        self
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn failing_chain(mut self) -> Self {
        self.fail_chain = true;
        self
    }

    /// Downloads deliver half the archive, then fail.
    pub fn broken_downloads(mut self) -> Self {
        self.broken_downloads = true;
        self
    }

    pub fn failing_auth(mut self) -> Self {
        self.auth_failure = AuthFailure::Always;
        self
    }

    pub fn failing_auth_after_setup(mut self) -> Self {
        self.auth_failure = AuthFailure::AfterSetup;
        self
    }

    pub fn archive_bytes(job_id: &str, task_num: usize) -> Vec<u8> {
        format!("archive of {job_id} task {task_num}").into_bytes()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// `is_dry` of every submitted job, in submission order.
    pub fn submitted_jobs(&self) -> Vec<bool> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::RunJob { is_dry, .. } => Some(is_dry),
                _ => None,
            })
            .collect()
    }

    pub fn status_checks(&self, job_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .jobs
            .get(job_id)
            .map_or(0, |(_, checks)| *checks)
    }

    pub fn created_workflows(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateWorkflow(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn deleted_workflows(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::DeleteWorkflow(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn workflow_tasks(&self) -> Vec<(String, Vec<WorkflowTask>)> {
        self.state.lock().unwrap().workflow_tasks.clone()
    }

    fn record(&self, call: Call, setup: bool) -> Result<(), Up42Error> {
        self.state.lock().unwrap().calls.push(call);
        match self.auth_failure {
            AuthFailure::Always => Err(Up42Error::Auth("invalid_client".to_string())),
            AuthFailure::AfterSetup if !setup => {
                Err(Up42Error::Auth("invalid_client".to_string()))
            }
            _ => Ok(()),
        }
    }

    fn job(&self, job_id: &str) -> Result<JobScript, Up42Error> {
        self.state
            .lock()
            .unwrap()
            .jobs
            .get(job_id)
            .map(|(script, _)| script.clone())
            .ok_or_else(|| Up42Error::Output(format!("unknown job {job_id}")))
    }
}

impl Up42Ops for FakeApi {
    async fn get_blocks(&self) -> Result<Vec<Block>, Up42Error> {
        self.record(Call::GetBlocks, true)?;
        Ok(self.blocks.clone())
    }

    async fn create_workflow(&self, name: &str, _description: &str) -> Result<Workflow, Up42Error> {
        self.record(Call::CreateWorkflow(name.to_string()), true)?;
        let mut state = self.state.lock().unwrap();
        state.next_workflow += 1;
        Ok(Workflow {
            id: format!("workflow-{}", state.next_workflow),
        })
    }

    async fn set_workflow_tasks(
        &self,
        workflow_id: &str,
        tasks: &[WorkflowTask],
    ) -> Result<(), Up42Error> {
        self.record(Call::SetWorkflowTasks(workflow_id.to_string()), true)?;
        if self.fail_chain {
            return Err(Up42Error::Output(format!("workflow {workflow_id} rejected tasks")));
        }
        self.state
            .lock()
            .unwrap()
            .workflow_tasks
            .push((workflow_id.to_string(), tasks.to_vec()));
        Ok(())
    }

    async fn delete_workflow(&self, workflow_id: &str) -> Result<(), Up42Error> {
        self.record(Call::DeleteWorkflow(workflow_id.to_string()), true)?;
        if self.fail_delete {
            return Err(Up42Error::Output(format!("workflow {workflow_id} is locked")));
        }
        Ok(())
    }

    async fn run_job(
        &self,
        _workflow_id: &str,
        name: &str,
        is_dry: bool,
        _params: &Value,
    ) -> Result<Job, Up42Error> {
        self.record(
            Call::RunJob {
                name: name.to_string(),
                is_dry,
            },
            false,
        )?;
        let mut state = self.state.lock().unwrap();
        let script = state
            .scripts
            .pop_front()
            .expect("job submitted without a script");
        state.next_job += 1;
        let id = format!("job-{}", state.next_job);
        state.jobs.insert(id.clone(), (script, 0));
        Ok(Job {
            id,
            status: "SUBMITTED".to_string(),
        })
    }

    async fn get_job(&self, job_id: &str) -> Result<Job, Up42Error> {
        self.record(Call::GetJob(job_id.to_string()), false)?;
        let mut state = self.state.lock().unwrap();
        let (script, checks) = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| Up42Error::Output(format!("unknown job {job_id}")))?;
        let index = (*checks).min(script.statuses.len() - 1);
        *checks += 1;
        Ok(Job {
            id: job_id.to_string(),
            status: script.statuses[index].clone(),
        })
    }

    async fn get_job_output(&self, job_id: &str) -> Result<Value, Up42Error> {
        self.record(Call::GetJobOutput(job_id.to_string()), false)?;
        Ok(self.job(job_id)?.output)
    }

    async fn get_job_tasks(&self, job_id: &str) -> Result<Vec<Task>, Up42Error> {
        self.record(Call::GetTasks(job_id.to_string()), false)?;
        let script = self.job(job_id)?;
        Ok((1..=script.tasks)
            .map(|k| Task {
                id: format!("{job_id}-task-{k}"),
            })
            .collect())
    }

    async fn get_task_signed_url(&self, job_id: &str, task_id: &str) -> Result<String, Up42Error> {
        self.record(Call::SignedUrl(task_id.to_string()), false)?;
        let task_num: usize = task_id
            .rsplit('-')
            .next()
            .and_then(|k| k.parse().ok())
            .ok_or_else(|| Up42Error::Output(format!("unknown task {task_id}")))?;
        let url = format!("https://downloads.example.com/{task_id}.tar.gz?signature={}", random_hex());
        self.state
            .lock()
            .unwrap()
            .downloads
            .insert(url.clone(), Self::archive_bytes(job_id, task_num));
        Ok(url)
    }

    async fn download(&self, url: &str) -> Result<ByteStream, Up42Error> {
        self.record(Call::Download(url.to_string()), false)?;
        let bytes = self
            .state
            .lock()
            .unwrap()
            .downloads
            .get(url)
            .cloned()
            .ok_or_else(|| Up42Error::Output(format!("unknown url {url}")))?;
        let (head, tail) = bytes.split_at(bytes.len() / 2);
        let tail = if self.broken_downloads {
            Err(Up42Error::Output("connection reset".to_string()))
        } else {
            Ok(tail.to_vec())
        };
        let chunks: Vec<Result<Vec<u8>, Up42Error>> = vec![Ok(head.to_vec()), tail];
        Ok(futures_util::stream::iter(chunks).boxed())
    }
}

/// Job output with `n` detected vehicles.
pub fn detections(n: usize) -> Value {
    let details = (0..n)
        .map(|i| json!({"id": i, "class": "vehicle", "score": 0.9}))
        .collect::<Vec<_>>();
    json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "estimatedCredits": 12,
            "properties": {
                "acquisitionDate": "2020-01-15T18:50:12.5Z",
                "det_details": details,
            },
        }],
    })
}

pub fn test_config(polygons: &[&str], time_ranges: &[&str]) -> RunConfig {
    RunConfig {
        project_id: "project".to_string(),
        api_key: "key".to_string(),
        polygons: input::parse_polygons(polygons).unwrap(),
        time_ranges: input::parse_time_ranges(time_ranges).unwrap(),
        verbose: true,
        store_artifacts: true,
        workflow_name: format!("covid19_car_estimate_{}", random_hex()),
        output_dir: std::env::temp_dir().join(format!("raw_job_{}", random_hex())),
        cleanup: true,
        settings: Settings::default(),
    }
}
